//! Resolved inputs to recipe compilation
//!
//! Everything here is already fetched and authorized by the caller: download URLs,
//! security groups and bindings arrive as plain values. A `None` URL means the
//! blobstore could not produce one.

pub mod binding;
pub mod security_group;

use crate::recipe::{EnvironmentVariable, ImageCredentials};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use binding::{
    LastOperation, OperationState, OperationType, ServiceBinding, ServiceInstance, VolumeDevice,
    VolumeMountDescriptor,
};
pub use security_group::{SecurityGroup, SecurityGroupRule, SecurityGroups};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub guid: String,
    pub name: String,
}

/// Feature flags that select how service bindings reach the container filesystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadFeatures {
    #[serde(default)]
    pub service_binding_k8s_enabled: bool,
    #[serde(default)]
    pub file_based_vcap_services_enabled: bool,
}

/// The application that owns a staging request, task or process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub guid: String,
    pub name: String,
    pub space: Space,
    pub organization: Organization,
    #[serde(default)]
    pub service_bindings: Vec<ServiceBinding>,
    #[serde(default)]
    pub features: WorkloadFeatures,
    #[serde(default)]
    pub revisions_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumInfo {
    #[serde(rename = "type")]
    pub algorithm: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub guid: String,
    #[serde(default)]
    pub checksum: Option<ChecksumInfo>,
}

/// An admin-installed buildpack with its resolved download URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBuildpack {
    pub name: String,
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildpackInfo {
    Custom { url: String },
    Admin(AdminBuildpack),
}

/// Lifecycle-specific request data; the tag selects the lifecycle strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum LifecycleData {
    Buildpack {
        stack: String,
        #[serde(default)]
        buildpacks: Vec<BuildpackInfo>,
    },
    Docker {
        #[serde(default)]
        image: Option<String>,
        #[serde(default)]
        credentials: Option<ImageCredentials>,
    },
    Cnb {
        stack: String,
        #[serde(default)]
        buildpacks: Vec<BuildpackInfo>,
        #[serde(default)]
        credentials: Option<String>,
    },
}

/// Blobstore URLs resolved for one staging request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingBlobstore {
    #[serde(default)]
    pub package_download_url: Option<String>,
    #[serde(default)]
    pub droplet_upload_url: Option<String>,
    #[serde(default)]
    pub buildpack_cache_download_url: Option<String>,
    #[serde(default)]
    pub buildpack_cache_upload_url: Option<String>,
    #[serde(default)]
    pub buildpack_cache_checksum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingContext {
    pub staging_guid: String,
    pub package: Package,
    pub lifecycle: LifecycleData,
    pub memory_mb: u64,
    pub disk_mb: u64,
    pub log_rate_limit_bytes_per_second: i64,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub isolation_segment: Option<String>,
    #[serde(default)]
    pub start_after_staging: bool,
    pub workload: Workload,
    #[serde(default)]
    pub blobstore: StagingBlobstore,
    /// Admin buildpacks offered when the request names none
    #[serde(default)]
    pub default_buildpacks: Vec<AdminBuildpack>,
    #[serde(default)]
    pub security_groups: SecurityGroups,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Droplet {
    pub guid: String,
    #[serde(default)]
    pub sha256_checksum: Option<String>,
    /// Start commands detected during staging, keyed by process type
    #[serde(default)]
    pub process_types: BTreeMap<String, String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub execution_metadata: String,
    #[serde(default)]
    pub docker_receipt_image: Option<String>,
    #[serde(default)]
    pub docker_receipt_credentials: Option<ImageCredentials>,
}

impl Droplet {
    pub fn detected_command(&self, process_type: &str) -> Option<&str> {
        self.process_types.get(process_type).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub guid: String,
    pub droplet: Droplet,
    /// Only process types whose command was explicitly recorded appear here
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunUnit {
    Task {
        name: String,
    },
    Process {
        #[serde(default)]
        ports: Vec<u32>,
        #[serde(default = "default_instances")]
        instances: u32,
    },
}

fn default_instances() -> u32 {
    1
}

fn default_process_type() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub guid: String,
    pub unit: RunUnit,
    #[serde(default = "default_process_type")]
    pub process_type: String,
    #[serde(default)]
    pub command: Option<String>,
    pub memory_mb: u64,
    pub disk_mb: u64,
    pub log_rate_limit_bytes_per_second: i64,
    pub lifecycle: LifecycleData,
    pub droplet: Droplet,
    #[serde(default)]
    pub revision: Option<Revision>,
    #[serde(default)]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub isolation_segment: Option<String>,
    pub workload: Workload,
    #[serde(default)]
    pub security_groups: SecurityGroups,
}

impl RunContext {
    /// `APP/TASK/<name>` for tasks, `APP/PROC/<TYPE>` for processes
    pub fn log_source(&self) -> String {
        match &self.unit {
            RunUnit::Task { name } => format!("APP/TASK/{}", name),
            RunUnit::Process { .. } => format!("APP/PROC/{}", self.process_type.to_uppercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_data_is_tagged_by_type() {
        let json = r#"{"type": "buildpack", "data": {"stack": "cflinuxfs4"}}"#;
        let data: LifecycleData = serde_json::from_str(json).unwrap();
        assert_eq!(
            data,
            LifecycleData::Buildpack {
                stack: "cflinuxfs4".to_string(),
                buildpacks: vec![],
            }
        );

        let cnb: LifecycleData =
            serde_json::from_str(r#"{"type": "cnb", "data": {"stack": "cflinuxfs4"}}"#).unwrap();
        assert!(matches!(cnb, LifecycleData::Cnb { .. }));
    }

    #[test]
    fn test_buildpack_info_kinds() {
        let infos: Vec<BuildpackInfo> = serde_json::from_str(
            r#"[
                {"kind": "custom", "url": "https://github.com/org/bp"},
                {"kind": "admin", "name": "ruby", "key": "ruby-key", "url": "http://bp/ruby"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            infos[0],
            BuildpackInfo::Custom {
                url: "https://github.com/org/bp".to_string()
            }
        );
        assert!(matches!(&infos[1], BuildpackInfo::Admin(bp) if bp.key == "ruby-key"));
    }

    #[test]
    fn test_run_unit_process_defaults() {
        let unit: RunUnit = serde_json::from_str(r#"{"kind": "process"}"#).unwrap();
        assert_eq!(
            unit,
            RunUnit::Process {
                ports: vec![],
                instances: 1
            }
        );
    }

    #[test]
    fn test_detected_command() {
        let mut droplet = Droplet {
            guid: "d".to_string(),
            sha256_checksum: None,
            process_types: BTreeMap::new(),
            download_url: None,
            execution_metadata: String::new(),
            docker_receipt_image: None,
            docker_receipt_credentials: None,
        };
        droplet
            .process_types
            .insert("web".to_string(), "bundle exec rackup".to_string());

        assert_eq!(droplet.detected_command("web"), Some("bundle exec rackup"));
        assert_eq!(droplet.detected_command("worker"), None);
    }
}
