//! Field-level validation of outbound lifecycle messages
//!
//! Schemas are `'static` tables so each strategy owns a read-only instance with
//! no lazy initialization.

use crate::error::{FieldViolation, SchemaError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Array,
    Hash,
    Bool,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::String, Value::String(_))
                | (FieldType::Array, Value::Array(_))
                | (FieldType::Hash, Value::Object(_))
                | (FieldType::Bool, Value::Bool(_))
        )
    }

    fn describe(self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Array => "an array",
            FieldType::Hash => "a hash",
            FieldType::Bool => "a boolean",
        }
    }
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a hash",
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

const fn required(name: &'static str, field_type: FieldType) -> Field {
    Field {
        name,
        field_type,
        required: true,
    }
}

const fn optional(name: &'static str, field_type: FieldType) -> Field {
    Field {
        name,
        field_type,
        required: false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [Field],
}

impl Schema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    /// Checks every field and reports all violations at once
    ///
    /// Optional fields may be absent or null. Keys not named by the schema are
    /// ignored.
    pub fn validate(&self, message: &Map<String, Value>) -> Result<(), SchemaError> {
        let violations: Vec<FieldViolation> = self
            .fields
            .iter()
            .filter_map(|field| {
                let value = message.get(field.name).unwrap_or(&Value::Null);
                if value.is_null() && !field.required {
                    return None;
                }
                if field.field_type.matches(value) {
                    return None;
                }
                Some(FieldViolation {
                    field: field.name.to_string(),
                    expected: field.field_type.describe().to_string(),
                    given: describe_value(value).to_string(),
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { violations })
        }
    }
}

pub const BUILDPACK_SCHEMA: Schema = Schema::new(&[
    required("app_bits_download_uri", FieldType::String),
    required("build_artifacts_cache_upload_uri", FieldType::String),
    required("droplet_upload_uri", FieldType::String),
    required("buildpacks", FieldType::Array),
    required("stack", FieldType::String),
    required("app_bits_checksum", FieldType::Hash),
    optional("build_artifacts_cache_download_uri", FieldType::String),
    optional("buildpack_cache_checksum", FieldType::String),
]);

pub const CNB_SCHEMA: Schema = Schema::new(&[
    required("app_bits_download_uri", FieldType::String),
    required("build_artifacts_cache_upload_uri", FieldType::String),
    required("droplet_upload_uri", FieldType::String),
    required("buildpacks", FieldType::Array),
    required("stack", FieldType::String),
    required("app_bits_checksum", FieldType::Hash),
    required("auto_detect", FieldType::Bool),
    optional("build_artifacts_cache_download_uri", FieldType::String),
    optional("buildpack_cache_checksum", FieldType::String),
    optional("credentials", FieldType::String),
]);

pub const DOCKER_SCHEMA: Schema = Schema::new(&[
    required("docker_image", FieldType::String),
    optional("docker_user", FieldType::String),
    optional("docker_password", FieldType::String),
]);
