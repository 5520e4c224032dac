//! Scheduler recipe structure and the builder that assembles it
//!
//! Field names, units and enumerations follow the scheduler's recipe schema; the
//! JSON produced by serializing a [`SchedulerRecipe`] is what gets submitted.

pub mod action;
pub mod builder;
pub mod egress;
pub mod metadata;
pub mod volume;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use action::{Action, EnvironmentVariable, ResourceLimits, RunAction};
pub use builder::RecipeBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRateLimit {
    /// `-1` means unlimited and is passed through as-is
    pub bytes_per_second: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDependency {
    pub name: String,
    pub from: String,
    pub to: String,
    pub cache_key: String,
    #[serde(default)]
    pub log_source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Tgz,
    Tar,
    Zip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayer {
    pub name: String,
    pub url: String,
    pub destination_path: String,
    pub layer_type: LayerType,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcmpInfo {
    #[serde(rename = "type")]
    pub icmp_type: i32,
    pub code: i32,
}

/// Outbound network rule, annotated with the security group it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRule {
    pub protocol: String,
    pub destinations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<PortRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icmp_info: Option<IcmpInfo>,
    #[serde(default)]
    pub log: bool,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateProperties {
    pub organizational_unit: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTagValue {
    #[serde(rename = "static")]
    pub static_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDevice {
    pub volume_id: String,
    /// Compact JSON object, or empty when the binding supplied no config
    pub mount_config: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub driver: String,
    pub container_dir: String,
    pub mode: String,
    pub shared: SharedDevice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub content: String,
}

impl File {
    pub fn byte_size(&self) -> usize {
        self.path.len() + self.content.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCredentials {
    pub username: String,
    pub password: String,
}

/// A complete, scheduler-ready description of one staging, task or process workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerRecipe {
    pub guid: String,
    pub log_guid: String,
    pub log_source: String,
    pub metrics_guid: String,
    pub root_fs: String,
    pub memory_mb: u64,
    pub disk_mb: u64,
    pub log_rate_limit: LogRateLimit,
    pub cpu_weight: u32,
    pub max_pids: i32,
    pub privileged: bool,
    pub action: Action,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub cached_dependencies: Vec<CachedDependency>,
    pub image_layers: Vec<ImageLayer>,
    pub egress_rules: Vec<EgressRule>,
    pub placement_tags: Vec<String>,
    pub certificate_properties: CertificateProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    pub network: Network,
    pub metric_tags: BTreeMap<String, MetricTagValue>,
    pub volume_mounts: Vec<VolumeMount>,
    pub volume_mounted_files: Vec<File>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_callback_url: Option<String>,
    pub trusted_system_certificates_path: String,
    pub result_file: String,
    pub legacy_download_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
}

impl SchedulerRecipe {
    pub fn metric_tag(&self, key: &str) -> Option<&str> {
        self.metric_tags.get(key).map(|v| v.static_value.as_str())
    }
}
