//! Service bindings rendered as files mounted into the container
//!
//! Two mutually exclusive layouts exist. Per-binding mode writes one directory per
//! binding with one file per attribute (`<name>/<key>`). Blob mode writes the
//! whole `VCAP_SERVICES` document to a single `vcap_services` file. Both cap the
//! summed path and content bytes at [`MAX_ALLOWED_BYTESIZE`].

pub mod presenter;

use crate::error::{RecipeError, Result};
use crate::model::{ServiceBinding, Workload};
use crate::recipe::File;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const MAX_ALLOWED_BYTESIZE: usize = 1_000_000;
const NAME_PATTERN: &str = r"^[a-z0-9\-.]{1,253}$";
const SERVICES_BLOB_PATH: &str = "vcap_services";
const HYPHENATED_ATTRIBUTES: &[&str] = &[
    "binding_guid",
    "binding_name",
    "instance_guid",
    "instance_name",
    "syslog_drain_url",
    "volume_mounts",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceBindingFileset {
    PerBinding(Vec<File>),
    ServicesBlob(File),
}

impl ServiceBindingFileset {
    pub fn into_files(self) -> Vec<File> {
        match self {
            ServiceBindingFileset::PerBinding(files) => files,
            ServiceBindingFileset::ServicesBlob(file) => vec![file],
        }
    }
}

/// Builds a [`ServiceBindingFileset`]; holds the compiled name pattern
#[derive(Debug, Clone)]
pub struct ServiceBindingFilesBuilder {
    name_re: Regex,
}

impl Default for ServiceBindingFilesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBindingFilesBuilder {
    pub fn new() -> Self {
        Self {
            name_re: Regex::new(NAME_PATTERN).expect("valid regex"),
        }
    }

    /// Per-binding files win when both features are enabled; `None` when neither is
    pub fn build(&self, workload: &Workload) -> Result<Option<ServiceBindingFileset>> {
        let features = workload.features;
        if features.service_binding_k8s_enabled {
            self.build_per_binding(&workload.service_bindings)
                .map(|files| Some(ServiceBindingFileset::PerBinding(files)))
        } else if features.file_based_vcap_services_enabled {
            self.build_services_blob(&workload.service_bindings)
                .map(|file| Some(ServiceBindingFileset::ServicesBlob(file)))
        } else {
            Ok(None)
        }
    }

    pub fn build_per_binding(&self, bindings: &[ServiceBinding]) -> Result<Vec<File>> {
        let mut files = FileSet::default();
        let mut names = HashSet::new();

        for binding in bindings.iter().filter(|b| b.create_succeeded()) {
            let name = binding.display_name();
            if !self.valid_name(name) {
                return Err(RecipeError::IncompatibleBindings(format!(
                    "Invalid binding name: '{}'. Name must match /{}/",
                    name, NAME_PATTERN
                )));
            }
            if !names.insert(name.to_string()) {
                return Err(RecipeError::IncompatibleBindings(format!(
                    "Duplicate binding name: {}",
                    name
                )));
            }

            let mut label = Value::Null;
            let mut attributes = Vec::new();
            for (key, value) in presenter::present_binding(binding) {
                match key {
                    "credentials" => {
                        if let Value::Object(credentials) = value {
                            for (cred_key, cred_value) in credentials {
                                self.add_file(&mut files, name, &cred_key, &cred_value)?;
                            }
                        }
                    }
                    "label" => {
                        label = value.clone();
                        attributes.push((key, value));
                    }
                    _ => attributes.push((key, value)),
                }
            }

            for (key, value) in attributes {
                self.add_file(&mut files, name, &hyphenate(key), &value)?;
            }
            self.add_file(&mut files, name, "type", &label)?;
            self.add_file(&mut files, name, "provider", &label)?;
        }

        if files.total_bytes > MAX_ALLOWED_BYTESIZE {
            return Err(exceeds_limit(files.total_bytes));
        }

        debug!(
            files = files.files.len(),
            bytes = files.total_bytes,
            "built service binding files"
        );
        Ok(files.files)
    }

    pub fn build_services_blob(&self, bindings: &[ServiceBinding]) -> Result<File> {
        let file = File {
            path: SERVICES_BLOB_PATH.to_string(),
            content: presenter::vcap_services(bindings).to_string(),
        };

        let total = file.byte_size();
        if total > MAX_ALLOWED_BYTESIZE {
            return Err(exceeds_limit(total));
        }
        Ok(file)
    }

    fn valid_name(&self, name: &str) -> bool {
        self.name_re.is_match(name)
    }

    /// Skips null values and empty arrays or objects; strings are written verbatim,
    /// anything else as JSON
    fn add_file(&self, files: &mut FileSet, name: &str, key: &str, value: &Value) -> Result<()> {
        if !self.valid_name(key) {
            return Err(RecipeError::IncompatibleBindings(format!(
                "Invalid file name: {}",
                key
            )));
        }

        let content = match value {
            Value::Null => return Ok(()),
            Value::String(s) => s.clone(),
            Value::Array(items) if items.is_empty() => return Ok(()),
            Value::Object(map) if map.is_empty() => return Ok(()),
            other => other.to_string(),
        };

        files.insert(File {
            path: format!("{}/{}", name, key),
            content,
        });
        Ok(())
    }
}

/// Files keyed by path; a rewrite replaces the earlier file in place but both
/// writes count toward the byte total
#[derive(Default)]
struct FileSet {
    files: Vec<File>,
    positions: HashMap<String, usize>,
    total_bytes: usize,
}

impl FileSet {
    fn insert(&mut self, file: File) {
        self.total_bytes += file.byte_size();
        match self.positions.get(&file.path) {
            Some(&index) => self.files[index] = file,
            None => {
                self.positions.insert(file.path.clone(), self.files.len());
                self.files.push(file);
            }
        }
    }
}

fn hyphenate(key: &str) -> String {
    if HYPHENATED_ATTRIBUTES.contains(&key) {
        key.replace('_', "-")
    } else {
        key.to_string()
    }
}

fn exceeds_limit(total: usize) -> RecipeError {
    RecipeError::IncompatibleBindings(format!(
        "Bindings exceed the maximum allowed bytesize of {}: {}",
        MAX_ALLOWED_BYTESIZE, total
    ))
}
