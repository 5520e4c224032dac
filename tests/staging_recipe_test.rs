//! Staging recipe integration tests
//!
//! Builds complete staging recipes for each lifecycle and checks the parts the
//! scheduler and the completion callback depend on.

mod support;

use recipe_compiler::error::ErrorKind;
use recipe_compiler::model::{AdminBuildpack, BuildpackInfo, LifecycleData};
use recipe_compiler::recipe::{EnvironmentVariable, ImageCredentials};
use recipe_compiler::{RecipeBuilder, RecipeError};
use serde_json::json;
use support::{binding, buildpack_lifecycle, config, group, staging_context, tcp_rule};

#[test]
fn test_limits_pass_through_unchanged() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.memory_mb = 6144;
    context.disk_mb = 8192;

    let recipe = builder.build_staging_recipe(&context).unwrap();

    assert_eq!(recipe.memory_mb, 6144);
    assert_eq!(recipe.disk_mb, 8192);
    assert_eq!(recipe.log_rate_limit.bytes_per_second, -1);

    let json = serde_json::to_value(&recipe).unwrap();
    assert_eq!(json["log_rate_limit"]["bytes_per_second"], -1);
}

#[test]
fn test_buildpack_staging_recipe() {
    let builder = RecipeBuilder::new(config());
    let recipe = builder
        .build_staging_recipe(&staging_context(buildpack_lifecycle()))
        .unwrap();

    assert_eq!(recipe.guid, "build-guid");
    assert_eq!(recipe.log_guid, "app-guid");
    assert_eq!(recipe.root_fs, "preloaded:cflinuxfs4");
    assert_eq!(recipe.max_pids, 1024);
    assert!(!recipe.privileged);
    assert_eq!(
        recipe.completion_callback_url.as_deref(),
        Some("https://cloud-controller-ng.service.cf.internal:9023/internal/v3/staging/build-guid/build_completed?start=true")
    );

    let timeout = recipe.action.as_timeout().unwrap();
    assert_eq!(timeout.timeout_ms, 900_000);

    let downloads = recipe.action.downloads();
    let artifacts: Vec<&str> = downloads.iter().map(|d| d.artifact.as_str()).collect();
    assert_eq!(
        artifacts,
        vec!["app package", "ruby_buildpack", "go_buildpack", "build artifacts cache"]
    );
    assert_eq!(downloads[0].checksum_value.as_deref(), Some("package-sha256"));
    assert!(downloads[1].to.starts_with("/tmp/buildpacks/"));
    assert_eq!(downloads[1].cache_key, "ruby-buildpack-key");
    assert!(downloads[3].checksum_value.is_none());

    let run = recipe.action.find_run().unwrap();
    assert_eq!(run.path, "/tmp/lifecycle/builder");
    assert!(run
        .args
        .contains(&"-buildpackOrder=ruby-buildpack-key,go-buildpack-key".to_string()));
    assert!(run.args.contains(&"-skipDetect=false".to_string()));
    assert_eq!(run.user, "vcap");
    assert_eq!(run.env, vec![EnvironmentVariable::new("BP_DEBUG", "true")]);

    assert_eq!(
        recipe.environment_variables,
        vec![EnvironmentVariable::new("CF_STACK", "cflinuxfs4")]
    );

    assert_eq!(recipe.cached_dependencies.len(), 1);
    assert_eq!(
        recipe.cached_dependencies[0].from,
        "http://file-server.service.cf.internal:8080/v1/static/buildpack_app_lifecycle/buildpack_app_lifecycle.tgz"
    );
    assert_eq!(recipe.cached_dependencies[0].to, "/tmp/lifecycle");
}

#[test]
fn test_custom_buildpack_skips_detect() {
    let builder = RecipeBuilder::new(config());
    let context = staging_context(LifecycleData::Buildpack {
        stack: "cflinuxfs4".to_string(),
        buildpacks: vec![BuildpackInfo::Custom {
            url: "https://github.com/example/custom-buildpack".to_string(),
        }],
    });

    let recipe = builder.build_staging_recipe(&context).unwrap();

    let run = recipe.action.find_run().unwrap();
    assert!(run.args.contains(&"-skipDetect=true".to_string()));
    assert!(run
        .args
        .contains(&"-buildpackOrder=https://github.com/example/custom-buildpack".to_string()));
    let artifacts: Vec<&str> = recipe
        .action
        .downloads()
        .iter()
        .map(|d| d.artifact.as_str())
        .collect();
    assert!(!artifacts.contains(&"custom"));
}

#[test]
fn test_requested_admin_buildpacks_skip_detect() {
    let builder = RecipeBuilder::new(config());
    let admin = |name: &str| {
        BuildpackInfo::Admin(AdminBuildpack {
            name: name.to_string(),
            key: format!("{}-key", name),
            url: format!("https://blobstore.internal/buildpacks/{}", name),
        })
    };
    let context = staging_context(LifecycleData::Buildpack {
        stack: "cflinuxfs4".to_string(),
        buildpacks: vec![admin("nodejs"), admin("staticfile")],
    });

    let recipe = builder.build_staging_recipe(&context).unwrap();

    let run = recipe.action.find_run().unwrap();
    assert!(run.args.contains(&"-skipDetect=true".to_string()));
    assert!(run
        .args
        .contains(&"-buildpackOrder=nodejs-key,staticfile-key".to_string()));

    let downloads = recipe.action.downloads();
    let artifacts: Vec<&str> = downloads.iter().map(|d| d.artifact.as_str()).collect();
    assert_eq!(
        artifacts,
        vec!["app package", "nodejs", "staticfile", "build artifacts cache"]
    );
    assert_eq!(downloads[1].from, "https://blobstore.internal/buildpacks/nodejs");
    assert_eq!(downloads[2].cache_key, "staticfile-key");
}

#[test]
fn test_missing_package_url_is_retryable() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.blobstore.package_download_url = None;

    let err = builder.build_staging_recipe(&context).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to get blobstore download url for package package-guid"
    );
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert!(err.is_retryable());
}

#[test]
fn test_missing_upload_url_is_schema_error() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.blobstore.droplet_upload_url = None;

    let err = builder.build_staging_recipe(&context).unwrap_err();

    match &err {
        RecipeError::Schema(schema) => assert!(schema.has_violation("droplet_upload_uri")),
        other => panic!("Expected schema error, got {:?}", other),
    }
    assert!(!err.is_retryable());
}

#[test]
fn test_unknown_stack_has_no_compiler() {
    let builder = RecipeBuilder::new(config());
    let context = staging_context(LifecycleData::Buildpack {
        stack: "windows".to_string(),
        buildpacks: vec![],
    });

    let err = builder.build_staging_recipe(&context).unwrap_err();
    assert!(matches!(err, RecipeError::NoCompilerDefined { ref key } if key == "buildpack/windows"));
}

#[test]
fn test_docker_staging_recipe() {
    let builder = RecipeBuilder::new(config());
    let context = staging_context(LifecycleData::Docker {
        image: Some("registry.example.com/team/api:1.4".to_string()),
        credentials: Some(ImageCredentials {
            username: "robot".to_string(),
            password: "s3cret".to_string(),
        }),
    });

    let recipe = builder.build_staging_recipe(&context).unwrap();

    assert_eq!(recipe.root_fs, "preloaded:cflinuxfs4");
    let run = recipe.action.find_run().unwrap();
    assert_eq!(run.path, "/tmp/docker_app_lifecycle/builder");
    assert!(run.args.contains(&"registry.example.com/team/api:1.4".to_string()));
    assert!(run.args.contains(&"-dockerUser".to_string()));
    assert!(recipe.action.downloads().is_empty());
}

#[test]
fn test_docker_staging_without_image_fails_validation() {
    let builder = RecipeBuilder::new(config());
    let context = staging_context(LifecycleData::Docker {
        image: None,
        credentials: None,
    });

    let err = builder.build_staging_recipe(&context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("docker_image"));
}

#[test]
fn test_cnb_staging_auto_detects_without_buildpacks() {
    let builder = RecipeBuilder::new(config());
    let context = staging_context(LifecycleData::Cnb {
        stack: "cflinuxfs4".to_string(),
        buildpacks: vec![],
        credentials: None,
    });

    let recipe = builder.build_staging_recipe(&context).unwrap();

    let run = recipe.action.find_run().unwrap();
    assert_eq!(run.user, "root");
    assert!(run.args.contains(&"--auto-detect".to_string()));
}

#[test]
fn test_staging_egress_uses_supplied_groups_in_order() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.security_groups.defaults = vec![
        group("dns", vec![tcp_rule("10.0.0.2", "53")]),
        group("public", vec![tcp_rule("0.0.0.0-9.255.255.255", "443")]),
    ];

    let recipe = builder.build_staging_recipe(&context).unwrap();

    let annotations: Vec<&str> = recipe
        .egress_rules
        .iter()
        .map(|r| r.annotations[0].as_str())
        .collect();
    assert_eq!(
        annotations,
        vec!["security_group_id:dns", "security_group_id:public"]
    );
}

#[test]
fn test_staging_metadata() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.isolation_segment = Some("dedicated".to_string());

    let recipe = builder.build_staging_recipe(&context).unwrap();

    assert_eq!(recipe.placement_tags, vec!["dedicated"]);
    assert_eq!(
        recipe.certificate_properties.organizational_unit,
        vec!["organization:org-guid", "space:space-guid", "app:app-guid"]
    );
    assert_eq!(recipe.metric_tags.len(), 7);
    assert_eq!(recipe.metric_tag("app_name"), Some("storefront"));
    assert_eq!(recipe.network.properties["container_workload"], "staging");
}

#[test]
fn test_per_binding_files_mounted_during_staging() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.workload.features.service_binding_k8s_enabled = true;
    context.workload.service_bindings = vec![binding(
        "b1",
        Some("orders-db"),
        "postgres",
        json!({"uri": "postgres://db.internal/orders", "port": 5432}),
    )];

    let recipe = builder.build_staging_recipe(&context).unwrap();

    let paths: Vec<&str> = recipe
        .volume_mounted_files
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(paths[0], "orders-db/uri");
    assert_eq!(paths[1], "orders-db/port");
    assert!(paths.contains(&"orders-db/type"));
    assert!(paths.contains(&"orders-db/provider"));
    assert!(paths.contains(&"orders-db/instance-guid"));
}

#[test]
fn test_duplicate_binding_names_reject_recipe() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.workload.features.service_binding_k8s_enabled = true;
    context.workload.service_bindings = vec![
        binding("b1", Some("cache"), "redis", json!({})),
        binding("b2", Some("cache"), "redis", json!({})),
    ];

    let err = builder.build_staging_recipe(&context).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert_eq!(err.to_string(), "Duplicate binding name: cache");
}

#[test]
fn test_oversized_staging_timeout_saturates() {
    let mut config = config();
    config.staging_timeout_secs = u64::MAX;
    let builder = RecipeBuilder::new(config);

    let recipe = builder
        .build_staging_recipe(&staging_context(buildpack_lifecycle()))
        .unwrap();

    assert_eq!(recipe.action.as_timeout().unwrap().timeout_ms, u64::MAX);
}

#[test]
fn test_staging_is_idempotent() {
    let builder = RecipeBuilder::new(config());
    let mut context = staging_context(buildpack_lifecycle());
    context.workload.features.file_based_vcap_services_enabled = true;
    context.workload.service_bindings = vec![binding("b1", None, "mysql", json!({"user": "app"}))];
    context.security_groups.space = vec![group("space", vec![tcp_rule("10.1.0.0/16", "3306")])];

    let first = serde_json::to_string(&builder.build_staging_recipe(&context).unwrap()).unwrap();
    let second = serde_json::to_string(&builder.build_staging_recipe(&context).unwrap()).unwrap();
    assert_eq!(first, second);
}
