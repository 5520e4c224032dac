//! Lifecycle strategies
//!
//! A lifecycle decides how a workload's filesystem is produced at staging time and
//! how its start command is launched at run time. The three lifecycles are a closed
//! set: [`LifecycleStrategy`] is selected from the tagged [`LifecycleData`] of a
//! context, and every dispatch is an exhaustive match.

pub mod buildpack;
pub mod cnb;
pub mod docker;
pub mod schema;

use crate::config::RecipeConfig;
use crate::error::{Artifact, FieldViolation, RecipeError, Result, SchemaError};
use crate::model::{
    AdminBuildpack, BuildpackInfo, ChecksumInfo, Droplet, LifecycleData, RunContext,
    StagingContext,
};
use crate::recipe::action::DownloadAction;
use crate::recipe::{
    Action, CachedDependency, EnvironmentVariable, ImageCredentials, ImageLayer, LayerType,
    MediaType,
};
use schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::error;

pub use buildpack::BuildpackLifecycle;
pub use cnb::CnbLifecycle;
pub use docker::DockerLifecycle;

pub(crate) const VCAP_USER: &str = "vcap";
pub(crate) const ROOT_USER: &str = "root";
pub(crate) const LIFECYCLE_DIR: &str = "/tmp/lifecycle";
pub(crate) const LAUNCHER_PATH: &str = "/tmp/lifecycle/launcher";
pub(crate) const BUILDER_PATH: &str = "/tmp/lifecycle/builder";
pub(crate) const APP_DIR: &str = "/tmp/app";
pub(crate) const CACHE_DIR: &str = "/tmp/cache";
pub(crate) const OUTPUT_CACHE_DIR: &str = "/tmp/output-cache";
pub(crate) const OUTPUT_DROPLET: &str = "/tmp/droplet";
pub(crate) const RESULT_FILE: &str = "/tmp/result.json";
pub(crate) const DROPLET_LAYER_DESTINATION: &str = "/home/vcap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleType {
    Buildpack,
    Docker,
    Cnb,
}

impl fmt::Display for LifecycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleType::Buildpack => write!(f, "buildpack"),
            LifecycleType::Docker => write!(f, "docker"),
            LifecycleType::Cnb => write!(f, "cnb"),
        }
    }
}

impl LifecycleData {
    pub fn lifecycle_type(&self) -> LifecycleType {
        match self {
            LifecycleData::Buildpack { .. } => LifecycleType::Buildpack,
            LifecycleData::Docker { .. } => LifecycleType::Docker,
            LifecycleData::Cnb { .. } => LifecycleType::Cnb,
        }
    }
}

/// Everything a lifecycle contributes to one recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePlan {
    pub action: Action,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub cached_dependencies: Vec<CachedDependency>,
    pub image_layers: Vec<ImageLayer>,
    pub image_credentials: Option<ImageCredentials>,
}

impl LifecyclePlan {
    fn new(action: Action) -> Self {
        Self {
            action,
            environment_variables: Vec::new(),
            cached_dependencies: Vec::new(),
            image_layers: Vec::new(),
            image_credentials: None,
        }
    }
}

/// Capabilities every lifecycle provides
pub trait LifecycleProtocol {
    fn lifecycle_type(&self) -> LifecycleType;

    /// Staging pipeline: fetch inputs, run the builder, upload the results
    fn build_staging_action(
        &self,
        config: &RecipeConfig,
        context: &StagingContext,
    ) -> Result<LifecyclePlan>;

    /// Root filesystem for staging (`droplet` is `None`) or for running `droplet`
    fn root_fs_identifier(&self, config: &RecipeConfig, droplet: Option<&Droplet>)
        -> Result<String>;

    /// Droplet delivery plus launcher invocation for a task or process
    fn task_action(
        &self,
        config: &RecipeConfig,
        context: &RunContext,
        droplet: &Droplet,
        command: &str,
    ) -> Result<LifecyclePlan>;
}

#[derive(Debug, Clone, Copy)]
pub enum LifecycleStrategy<'a> {
    Buildpack(BuildpackLifecycle<'a>),
    Docker(DockerLifecycle<'a>),
    Cnb(CnbLifecycle<'a>),
}

impl<'a> LifecycleStrategy<'a> {
    pub fn select(data: &'a LifecycleData) -> Self {
        match data {
            LifecycleData::Buildpack { stack, buildpacks } => {
                LifecycleStrategy::Buildpack(BuildpackLifecycle::new(stack, buildpacks))
            }
            LifecycleData::Docker { image, credentials } => LifecycleStrategy::Docker(
                DockerLifecycle::new(image.as_deref(), credentials.as_ref()),
            ),
            LifecycleData::Cnb {
                stack,
                buildpacks,
                credentials,
            } => LifecycleStrategy::Cnb(CnbLifecycle::new(
                stack,
                buildpacks,
                credentials.as_deref(),
            )),
        }
    }

    fn protocol(&self) -> &dyn LifecycleProtocol {
        match self {
            LifecycleStrategy::Buildpack(lifecycle) => lifecycle,
            LifecycleStrategy::Docker(lifecycle) => lifecycle,
            LifecycleStrategy::Cnb(lifecycle) => lifecycle,
        }
    }
}

impl LifecycleProtocol for LifecycleStrategy<'_> {
    fn lifecycle_type(&self) -> LifecycleType {
        self.protocol().lifecycle_type()
    }

    fn build_staging_action(
        &self,
        config: &RecipeConfig,
        context: &StagingContext,
    ) -> Result<LifecyclePlan> {
        self.protocol().build_staging_action(config, context)
    }

    fn root_fs_identifier(
        &self,
        config: &RecipeConfig,
        droplet: Option<&Droplet>,
    ) -> Result<String> {
        self.protocol().root_fs_identifier(config, droplet)
    }

    fn task_action(
        &self,
        config: &RecipeConfig,
        context: &RunContext,
        droplet: &Droplet,
        command: &str,
    ) -> Result<LifecyclePlan> {
        self.protocol().task_action(config, context, droplet, command)
    }
}

/// Buildpack reference sent to the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackEntry {
    pub name: String,
    pub key: String,
    pub url: String,
    #[serde(default)]
    pub skip_detect: bool,
}

impl BuildpackEntry {
    pub fn is_custom(&self) -> bool {
        self.name == "custom"
    }

    fn admin(buildpack: &AdminBuildpack, skip_detect: bool) -> Self {
        Self {
            name: buildpack.name.clone(),
            key: buildpack.key.clone(),
            url: buildpack.url.clone(),
            skip_detect,
        }
    }
}

/// Explicitly requested buildpacks skip detection; an empty request falls back to
/// `defaults` with detection enabled.
pub(crate) fn buildpack_entries(
    requested: &[BuildpackInfo],
    defaults: &[AdminBuildpack],
) -> Vec<BuildpackEntry> {
    if requested.is_empty() {
        return defaults
            .iter()
            .map(|bp| BuildpackEntry::admin(bp, false))
            .collect();
    }

    requested
        .iter()
        .map(|info| match info {
            BuildpackInfo::Custom { url } => BuildpackEntry {
                name: "custom".to_string(),
                key: url.clone(),
                url: url.clone(),
                skip_detect: true,
            },
            BuildpackInfo::Admin(bp) => BuildpackEntry::admin(bp, true),
        })
        .collect()
}

/// Validated staging message for the buildpack and cloud native lifecycles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingMessage {
    pub app_bits_download_uri: String,
    pub build_artifacts_cache_upload_uri: String,
    pub droplet_upload_uri: String,
    pub buildpacks: Vec<BuildpackEntry>,
    pub stack: String,
    pub app_bits_checksum: ChecksumInfo,
    #[serde(default)]
    pub build_artifacts_cache_download_uri: Option<String>,
    #[serde(default)]
    pub buildpack_cache_checksum: Option<String>,
    #[serde(default)]
    pub credentials: Option<String>,
    #[serde(default)]
    pub auto_detect: bool,
}

/// Raw message with unresolved URLs left as `null` so validation can name them
pub(crate) fn staging_message_fields(
    context: &StagingContext,
    stack: &str,
    buildpacks: &[BuildpackEntry],
) -> Map<String, Value> {
    let blobstore = &context.blobstore;
    let checksum = context.package.checksum.clone().unwrap_or(ChecksumInfo {
        algorithm: "sha256".to_string(),
        value: None,
    });

    let message = json!({
        "app_bits_download_uri": blobstore.package_download_url,
        "build_artifacts_cache_upload_uri": blobstore.buildpack_cache_upload_url,
        "droplet_upload_uri": blobstore.droplet_upload_url,
        "buildpacks": buildpacks,
        "stack": stack,
        "app_bits_checksum": checksum,
        "build_artifacts_cache_download_uri": blobstore.buildpack_cache_download_url,
        "buildpack_cache_checksum": blobstore.buildpack_cache_checksum,
    });

    match message {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Validates `message` against `schema`
///
/// A missing package URL is reported as a resolution failure even though it
/// also violates the schema, so callers retry instead of giving up.
pub(crate) fn validate_staging_message(
    schema: &Schema,
    message: Map<String, Value>,
    context: &StagingContext,
) -> Result<StagingMessage> {
    if let Err(err) = schema.validate(&message) {
        error!(
            staging_guid = %context.staging_guid,
            package_guid = %context.package.guid,
            error = %err,
            "lifecycle-data-schema-error"
        );
        if context.blobstore.package_download_url.is_none() {
            return Err(RecipeError::InvalidDownloadUri {
                artifact: Artifact::Package,
                guid: context.package.guid.clone(),
            });
        }
        return Err(err.into());
    }

    serde_json::from_value(Value::Object(message)).map_err(|e| {
        RecipeError::Schema(SchemaError {
            violations: vec![FieldViolation {
                field: "message".to_string(),
                expected: "a staging message".to_string(),
                given: e.to_string(),
            }],
        })
    })
}

pub(crate) fn bundle_uri(config: &RecipeConfig, bundle: &str) -> String {
    if bundle.contains("://") {
        bundle.to_string()
    } else {
        format!(
            "{}/v1/static/{}",
            config.file_server_url.trim_end_matches('/'),
            bundle
        )
    }
}

/// Attaches the lifecycle bundle as a cached dependency, or as a shared image
/// layer when declarative asset downloads are enabled.
pub(crate) fn attach_lifecycle_bundle(
    config: &RecipeConfig,
    plan: &mut LifecyclePlan,
    bundle_key: &str,
    cache_key: String,
    destination: &str,
) -> Result<()> {
    let bundle = config
        .lifecycle_bundle(bundle_key)
        .ok_or_else(|| RecipeError::NoCompilerDefined {
            key: bundle_key.to_string(),
        })?;
    let url = bundle_uri(config, bundle);

    if config.enable_declarative_asset_downloads {
        plan.image_layers.push(ImageLayer {
            name: cache_key,
            url,
            destination_path: destination.to_string(),
            layer_type: LayerType::Shared,
            media_type: MediaType::Tgz,
            digest_algorithm: None,
            digest_value: None,
        });
    } else {
        plan.cached_dependencies.push(CachedDependency {
            name: String::new(),
            from: url,
            to: destination.to_string(),
            cache_key,
            log_source: String::new(),
        });
    }
    Ok(())
}

/// Ways a droplet can reach the container before launch
pub(crate) enum DropletDelivery {
    Download(Action),
    Layer(ImageLayer),
}

pub(crate) fn deliver_droplet(config: &RecipeConfig, droplet: &Droplet) -> Result<DropletDelivery> {
    let url = droplet
        .download_url
        .clone()
        .ok_or_else(|| RecipeError::InvalidDownloadUri {
            artifact: Artifact::Droplet,
            guid: droplet.guid.clone(),
        })?;

    if config.enable_declarative_asset_downloads {
        if let Some(sha256) = &droplet.sha256_checksum {
            return Ok(DropletDelivery::Layer(ImageLayer {
                name: "droplet".to_string(),
                url,
                destination_path: DROPLET_LAYER_DESTINATION.to_string(),
                layer_type: LayerType::Exclusive,
                media_type: MediaType::Tgz,
                digest_algorithm: Some("SHA256".to_string()),
                digest_value: Some(sha256.clone()),
            }));
        }
    }

    Ok(DropletDelivery::Download(Action::Download(DownloadAction {
        artifact: "droplet".to_string(),
        from: url,
        to: ".".to_string(),
        cache_key: String::new(),
        user: VCAP_USER.to_string(),
        checksum_algorithm: droplet.sha256_checksum.as_ref().map(|_| "sha256".to_string()),
        checksum_value: droplet.sha256_checksum.clone(),
    })))
}

/// Droplet delivery followed by `run`, shared by the buildpack and cloud native
/// launchers
pub(crate) fn droplet_launch_plan(
    config: &RecipeConfig,
    droplet: &Droplet,
    run: Action,
) -> Result<LifecyclePlan> {
    match deliver_droplet(config, droplet)? {
        DropletDelivery::Download(download) => {
            Ok(LifecyclePlan::new(Action::serial(vec![download, run])))
        }
        DropletDelivery::Layer(layer) => {
            let mut plan = LifecyclePlan::new(run);
            plan.image_layers.push(layer);
            Ok(plan)
        }
    }
}
