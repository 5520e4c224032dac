#![allow(dead_code)]

use recipe_compiler::model::{
    AdminBuildpack, ChecksumInfo, Droplet, LifecycleData, Organization, Package, RunContext,
    RunUnit, SecurityGroup, SecurityGroupRule, SecurityGroups, ServiceBinding, ServiceInstance,
    Space, StagingBlobstore, StagingContext, Workload, WorkloadFeatures,
};
use recipe_compiler::recipe::EnvironmentVariable;
use recipe_compiler::RecipeConfig;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub fn get_recipe_compiler_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("recipe-compiler")
}

pub fn config() -> RecipeConfig {
    let mut config = RecipeConfig::default();
    config.lifecycle_bundles = BTreeMap::from([
        (
            "buildpack/cflinuxfs4".to_string(),
            "buildpack_app_lifecycle/buildpack_app_lifecycle.tgz".to_string(),
        ),
        (
            "cnb/cflinuxfs4".to_string(),
            "cnb_app_lifecycle/cnb_app_lifecycle.tgz".to_string(),
        ),
        (
            "docker".to_string(),
            "docker_app_lifecycle/docker_app_lifecycle.tgz".to_string(),
        ),
    ]);
    config
}

pub fn workload() -> Workload {
    Workload {
        guid: "app-guid".to_string(),
        name: "storefront".to_string(),
        space: Space {
            guid: "space-guid".to_string(),
            name: "production".to_string(),
        },
        organization: Organization {
            guid: "org-guid".to_string(),
            name: "retail".to_string(),
        },
        service_bindings: vec![],
        features: WorkloadFeatures::default(),
        revisions_enabled: false,
    }
}

pub fn buildpack_lifecycle() -> LifecycleData {
    LifecycleData::Buildpack {
        stack: "cflinuxfs4".to_string(),
        buildpacks: vec![],
    }
}

pub fn staging_context(lifecycle: LifecycleData) -> StagingContext {
    StagingContext {
        staging_guid: "build-guid".to_string(),
        package: Package {
            guid: "package-guid".to_string(),
            checksum: Some(ChecksumInfo {
                algorithm: "sha256".to_string(),
                value: Some("package-sha256".to_string()),
            }),
        },
        lifecycle,
        memory_mb: 1024,
        disk_mb: 4096,
        log_rate_limit_bytes_per_second: -1,
        environment_variables: vec![EnvironmentVariable::new("BP_DEBUG", "true")],
        isolation_segment: None,
        start_after_staging: true,
        workload: workload(),
        blobstore: StagingBlobstore {
            package_download_url: Some("https://blobstore.internal/packages/package-guid".to_string()),
            droplet_upload_url: Some("https://cc.internal/staging/droplets/upload".to_string()),
            buildpack_cache_download_url: Some("https://blobstore.internal/cache".to_string()),
            buildpack_cache_upload_url: Some("https://cc.internal/staging/cache/upload".to_string()),
            buildpack_cache_checksum: None,
        },
        default_buildpacks: vec![
            AdminBuildpack {
                name: "ruby_buildpack".to_string(),
                key: "ruby-buildpack-key".to_string(),
                url: "https://blobstore.internal/buildpacks/ruby".to_string(),
            },
            AdminBuildpack {
                name: "go_buildpack".to_string(),
                key: "go-buildpack-key".to_string(),
                url: "https://blobstore.internal/buildpacks/go".to_string(),
            },
        ],
        security_groups: SecurityGroups::default(),
    }
}

pub fn droplet() -> Droplet {
    Droplet {
        guid: "droplet-guid".to_string(),
        sha256_checksum: Some("droplet-sha256".to_string()),
        process_types: BTreeMap::from([
            ("web".to_string(), "bundle exec puma".to_string()),
            ("worker".to_string(), "bundle exec sidekiq".to_string()),
        ]),
        download_url: Some("https://blobstore.internal/droplets/droplet-guid".to_string()),
        execution_metadata: String::new(),
        docker_receipt_image: None,
        docker_receipt_credentials: None,
    }
}

pub fn run_context(unit: RunUnit, lifecycle: LifecycleData) -> RunContext {
    let command = match &unit {
        RunUnit::Task { .. } => Some("bin/rake db:migrate".to_string()),
        RunUnit::Process { .. } => None,
    };
    RunContext {
        guid: "run-guid".to_string(),
        unit,
        process_type: "web".to_string(),
        command,
        memory_mb: 2048,
        disk_mb: 2048,
        log_rate_limit_bytes_per_second: -1,
        lifecycle,
        droplet: droplet(),
        revision: None,
        environment_variables: vec![EnvironmentVariable::new("RAILS_ENV", "production")],
        isolation_segment: None,
        workload: workload(),
        security_groups: SecurityGroups::default(),
    }
}

pub fn web_process() -> RunUnit {
    RunUnit::Process {
        ports: vec![8080],
        instances: 2,
    }
}

pub fn tcp_rule(destination: &str, ports: &str) -> SecurityGroupRule {
    SecurityGroupRule {
        protocol: "tcp".to_string(),
        destination: destination.to_string(),
        ports: Some(ports.to_string()),
        icmp_type: None,
        code: None,
        log: false,
        description: None,
    }
}

pub fn group(guid: &str, rules: Vec<SecurityGroupRule>) -> SecurityGroup {
    SecurityGroup {
        guid: guid.to_string(),
        name: format!("{}-name", guid),
        rules,
    }
}

pub fn binding(guid: &str, name: Option<&str>, label: &str, credentials: Value) -> ServiceBinding {
    let credentials = match credentials {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    ServiceBinding {
        guid: guid.to_string(),
        name: name.map(String::from),
        service_instance: ServiceInstance {
            guid: format!("{}-instance", guid),
            name: format!("{}-instance-name", guid),
            label: label.to_string(),
            plan: Some("standard".to_string()),
            tags: vec![label.to_string()],
        },
        credentials,
        syslog_drain_url: None,
        volume_mounts: vec![],
        last_operation: None,
    }
}
