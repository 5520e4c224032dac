use super::schema::BUILDPACK_SCHEMA;
use super::{
    attach_lifecycle_bundle, buildpack_entries, droplet_launch_plan, staging_message_fields,
    validate_staging_message, LifecyclePlan, LifecycleProtocol, LifecycleType, StagingMessage,
    APP_DIR, BUILDER_PATH, CACHE_DIR, LAUNCHER_PATH, LIFECYCLE_DIR, OUTPUT_CACHE_DIR,
    OUTPUT_DROPLET, RESULT_FILE, VCAP_USER,
};
use crate::config::RecipeConfig;
use crate::error::Result;
use crate::model::{BuildpackInfo, Droplet, RunContext, StagingContext};
use crate::recipe::action::{DownloadAction, UploadAction};
use crate::recipe::{Action, EnvironmentVariable, ResourceLimits, RunAction};

pub(crate) const STAGING_LOG_SOURCE: &str = "STG";
const BUILDPACKS_DIR: &str = "/tmp/buildpacks";

#[derive(Debug, Clone, Copy)]
pub struct BuildpackLifecycle<'a> {
    stack: &'a str,
    buildpacks: &'a [BuildpackInfo],
}

impl<'a> BuildpackLifecycle<'a> {
    pub fn new(stack: &'a str, buildpacks: &'a [BuildpackInfo]) -> Self {
        Self { stack, buildpacks }
    }

    fn bundle_key(&self) -> String {
        format!("buildpack/{}", self.stack)
    }

    fn cache_key(&self) -> String {
        format!("buildpack-{}-lifecycle", self.stack)
    }
}

/// Admin buildpacks are downloaded under the md5 of their key
pub(crate) fn buildpack_download_dir(key: &str) -> String {
    format!("{}/{:x}", BUILDPACKS_DIR, md5::compute(key.as_bytes()))
}

pub(crate) fn app_package_download(message: &StagingMessage, user: &str) -> Action {
    let checksum = &message.app_bits_checksum;
    Action::Download(DownloadAction {
        artifact: "app package".to_string(),
        from: message.app_bits_download_uri.clone(),
        to: APP_DIR.to_string(),
        cache_key: String::new(),
        user: user.to_string(),
        checksum_algorithm: checksum.value.as_ref().map(|_| checksum.algorithm.clone()),
        checksum_value: checksum.value.clone(),
    })
}

/// Restoring the cache is best effort
pub(crate) fn cache_download(message: &StagingMessage, user: &str) -> Option<Action> {
    let from = message.build_artifacts_cache_download_uri.clone()?;
    Some(Action::try_action(Action::Download(DownloadAction {
        artifact: "build artifacts cache".to_string(),
        from,
        to: CACHE_DIR.to_string(),
        cache_key: String::new(),
        user: user.to_string(),
        checksum_algorithm: message
            .buildpack_cache_checksum
            .as_ref()
            .map(|_| "sha256".to_string()),
        checksum_value: message.buildpack_cache_checksum.clone(),
    })))
}

pub(crate) fn staging_uploads(message: &StagingMessage, user: &str) -> Action {
    let uploads = Action::parallel(vec![
        Action::Upload(UploadAction {
            artifact: "droplet".to_string(),
            from: OUTPUT_DROPLET.to_string(),
            to: message.droplet_upload_uri.clone(),
            user: user.to_string(),
        }),
        Action::Upload(UploadAction {
            artifact: "build artifacts cache".to_string(),
            from: OUTPUT_CACHE_DIR.to_string(),
            to: message.build_artifacts_cache_upload_uri.clone(),
            user: user.to_string(),
        }),
    ]);
    Action::emit_progress(
        uploads,
        "Uploading droplet, build artifacts cache...",
        "Uploading complete",
        "Uploading failed",
    )
}

fn builder_args(config: &RecipeConfig, message: &StagingMessage) -> Vec<String> {
    let order: Vec<&str> = message.buildpacks.iter().map(|bp| bp.key.as_str()).collect();
    let skip_detect = message.buildpacks.iter().any(|bp| bp.skip_detect);

    vec![
        format!("-buildpackOrder={}", order.join(",")),
        format!("-skipCertVerify={}", config.skip_cert_verify),
        format!("-skipDetect={}", skip_detect),
        format!("-buildDir={}", APP_DIR),
        format!("-outputDroplet={}", OUTPUT_DROPLET),
        format!("-outputMetadata={}", RESULT_FILE),
        format!("-outputBuildArtifactsCache={}", OUTPUT_CACHE_DIR),
        format!("-buildpacksDir={}", BUILDPACKS_DIR),
        format!("-buildArtifactsCacheDir={}", CACHE_DIR),
    ]
}

impl LifecycleProtocol for BuildpackLifecycle<'_> {
    fn lifecycle_type(&self) -> LifecycleType {
        LifecycleType::Buildpack
    }

    fn build_staging_action(
        &self,
        config: &RecipeConfig,
        context: &StagingContext,
    ) -> Result<LifecyclePlan> {
        let entries = buildpack_entries(self.buildpacks, &context.default_buildpacks);
        let fields = staging_message_fields(context, self.stack, &entries);
        let message = validate_staging_message(&BUILDPACK_SCHEMA, fields, context)?;

        let mut downloads = vec![app_package_download(&message, VCAP_USER)];
        for entry in message.buildpacks.iter().filter(|bp| !bp.is_custom()) {
            downloads.push(Action::Download(DownloadAction {
                artifact: entry.name.clone(),
                from: entry.url.clone(),
                to: buildpack_download_dir(&entry.key),
                cache_key: entry.key.clone(),
                user: VCAP_USER.to_string(),
                checksum_algorithm: None,
                checksum_value: None,
            }));
        }
        downloads.extend(cache_download(&message, VCAP_USER));

        let stage = Action::Run(RunAction {
            path: BUILDER_PATH.to_string(),
            args: builder_args(config, &message),
            env: context.environment_variables.clone(),
            resource_limits: ResourceLimits {
                nofile: config.staging_nofile_limit,
            },
            user: VCAP_USER.to_string(),
            log_source: STAGING_LOG_SOURCE.to_string(),
            ..Default::default()
        });

        let action = Action::serial(vec![
            Action::parallel(downloads),
            Action::emit_progress(stage, "Staging...", "Staging complete", "Staging failed"),
            staging_uploads(&message, VCAP_USER),
        ]);

        let mut plan = LifecyclePlan::new(action);
        plan.environment_variables
            .push(EnvironmentVariable::new("CF_STACK", self.stack));
        attach_lifecycle_bundle(
            config,
            &mut plan,
            &self.bundle_key(),
            self.cache_key(),
            LIFECYCLE_DIR,
        )?;
        Ok(plan)
    }

    fn root_fs_identifier(&self, _config: &RecipeConfig, _droplet: Option<&Droplet>) -> Result<String> {
        Ok(format!("preloaded:{}", self.stack))
    }

    fn task_action(
        &self,
        config: &RecipeConfig,
        context: &RunContext,
        droplet: &Droplet,
        command: &str,
    ) -> Result<LifecyclePlan> {
        let run = Action::Run(RunAction {
            path: LAUNCHER_PATH.to_string(),
            args: vec![
                "app".to_string(),
                command.to_string(),
                droplet.execution_metadata.clone(),
            ],
            env: context.environment_variables.clone(),
            user: VCAP_USER.to_string(),
            log_source: context.log_source(),
            ..Default::default()
        });

        let mut plan = droplet_launch_plan(config, droplet, run)?;
        attach_lifecycle_bundle(
            config,
            &mut plan,
            &self.bundle_key(),
            self.cache_key(),
            LIFECYCLE_DIR,
        )?;
        Ok(plan)
    }
}
