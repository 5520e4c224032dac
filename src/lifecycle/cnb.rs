use super::buildpack::{app_package_download, cache_download, staging_uploads, STAGING_LOG_SOURCE};
use super::schema::CNB_SCHEMA;
use super::{
    attach_lifecycle_bundle, buildpack_entries, droplet_launch_plan, staging_message_fields,
    validate_staging_message, LifecyclePlan, LifecycleProtocol, LifecycleType, StagingMessage,
    BUILDER_PATH, LAUNCHER_PATH, LIFECYCLE_DIR, ROOT_USER, VCAP_USER,
};
use crate::config::RecipeConfig;
use crate::error::Result;
use crate::model::{BuildpackInfo, Droplet, RunContext, StagingContext};
use crate::recipe::{Action, EnvironmentVariable, ResourceLimits, RunAction};
use serde_json::Value;

const REGISTRY_CREDS_VAR: &str = "CNB_REGISTRY_CREDS";

/// Cloud native buildpacks lifecycle
#[derive(Debug, Clone, Copy)]
pub struct CnbLifecycle<'a> {
    stack: &'a str,
    buildpacks: &'a [BuildpackInfo],
    credentials: Option<&'a str>,
}

impl<'a> CnbLifecycle<'a> {
    pub fn new(
        stack: &'a str,
        buildpacks: &'a [BuildpackInfo],
        credentials: Option<&'a str>,
    ) -> Self {
        Self {
            stack,
            buildpacks,
            credentials,
        }
    }

    fn bundle_key(&self) -> String {
        format!("cnb/{}", self.stack)
    }

    fn cache_key(&self) -> String {
        format!("cnb-{}-lifecycle", self.stack)
    }

    /// The outbound message; an empty buildpack list turns on auto detection
    pub fn staging_message(&self, context: &StagingContext) -> Result<StagingMessage> {
        let entries = if self.buildpacks.is_empty() {
            Vec::new()
        } else {
            buildpack_entries(self.buildpacks, &[])
        };

        let mut fields = staging_message_fields(context, self.stack, &entries);
        fields.insert("auto_detect".to_string(), Value::Bool(entries.is_empty()));
        fields.insert(
            "credentials".to_string(),
            self.credentials
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null),
        );

        validate_staging_message(&CNB_SCHEMA, fields, context)
    }
}

fn builder_args(message: &StagingMessage) -> Vec<String> {
    let mut args = Vec::new();
    for buildpack in &message.buildpacks {
        args.push("--buildpack".to_string());
        args.push(buildpack.url.clone());
    }
    if message.auto_detect {
        args.push("--auto-detect".to_string());
    }
    args
}

impl LifecycleProtocol for CnbLifecycle<'_> {
    fn lifecycle_type(&self) -> LifecycleType {
        LifecycleType::Cnb
    }

    fn build_staging_action(
        &self,
        config: &RecipeConfig,
        context: &StagingContext,
    ) -> Result<LifecyclePlan> {
        let message = self.staging_message(context)?;

        let mut downloads = vec![app_package_download(&message, VCAP_USER)];
        downloads.extend(cache_download(&message, VCAP_USER));

        let mut env = context.environment_variables.clone();
        if let Some(credentials) = &message.credentials {
            env.push(EnvironmentVariable::new(REGISTRY_CREDS_VAR, credentials.as_str()));
        }

        let stage = Action::Run(RunAction {
            path: BUILDER_PATH.to_string(),
            args: builder_args(&message),
            env,
            resource_limits: ResourceLimits {
                nofile: config.staging_nofile_limit,
            },
            user: ROOT_USER.to_string(),
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
            args: vec!["--".to_string(), command.to_string()],
            env: context.environment_variables.clone(),
            user: ROOT_USER.to_string(),
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
