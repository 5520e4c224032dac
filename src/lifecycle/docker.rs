use super::buildpack::STAGING_LOG_SOURCE;
use super::schema::DOCKER_SCHEMA;
use super::{
    attach_lifecycle_bundle, LifecyclePlan, LifecycleProtocol, LifecycleType, LAUNCHER_PATH,
    LIFECYCLE_DIR, RESULT_FILE, ROOT_USER, VCAP_USER,
};
use crate::config::RecipeConfig;
use crate::error::{RecipeError, Result};
use crate::image::ImageReferenceParser;
use crate::model::{Droplet, RunContext, StagingContext};
use crate::recipe::{Action, ImageCredentials, ResourceLimits, RunAction};
use serde_json::{json, Value};
use tracing::error;

const BUNDLE_KEY: &str = "docker";
const CACHE_KEY: &str = "docker-lifecycle";
const STAGING_LIFECYCLE_DIR: &str = "/tmp/docker_app_lifecycle";
const STAGING_BUILDER_PATH: &str = "/tmp/docker_app_lifecycle/builder";

#[derive(Debug, Clone, Copy)]
pub struct DockerLifecycle<'a> {
    image: Option<&'a str>,
    credentials: Option<&'a ImageCredentials>,
}

#[derive(Debug)]
struct DockerStagingMessage {
    docker_image: String,
    docker_user: Option<String>,
    docker_password: Option<String>,
}

impl<'a> DockerLifecycle<'a> {
    pub fn new(image: Option<&'a str>, credentials: Option<&'a ImageCredentials>) -> Self {
        Self { image, credentials }
    }

    fn staging_message(&self, context: &StagingContext) -> Result<DockerStagingMessage> {
        let fields = match json!({
            "docker_image": self.image,
            "docker_user": self.credentials.map(|c| c.username.as_str()),
            "docker_password": self.credentials.map(|c| c.password.as_str()),
        }) {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        if let Err(err) = DOCKER_SCHEMA.validate(&fields) {
            error!(
                staging_guid = %context.staging_guid,
                error = %err,
                "lifecycle-data-schema-error"
            );
            return Err(err.into());
        }

        let image = self.image.unwrap_or_default().to_string();
        Ok(DockerStagingMessage {
            docker_image: image,
            docker_user: self.credentials.map(|c| c.username.clone()),
            docker_password: self.credentials.map(|c| c.password.clone()),
        })
    }

    fn run_image(&self, droplet: &Droplet) -> Result<&'a str> {
        self.image.ok_or_else(|| {
            RecipeError::InvalidImageReference(format!(
                "droplet {} has no docker image",
                droplet.guid
            ))
        })
    }

    /// The image recorded on the droplet wins over the one requested
    fn run_root_fs(&self, droplet: &Droplet) -> Result<String> {
        let parser = ImageReferenceParser::new();
        match droplet.docker_receipt_image.as_deref() {
            Some(image) => parser.normalize(image),
            None => parser.normalize(self.run_image(droplet)?),
        }
    }
}

fn builder_args(config: &RecipeConfig, message: &DockerStagingMessage) -> Vec<String> {
    let mut args = vec![
        "-outputMetadataJSONFilename".to_string(),
        RESULT_FILE.to_string(),
        "-dockerRef".to_string(),
        message.docker_image.clone(),
    ];

    if !config.insecure_docker_registries.is_empty() {
        args.push("-insecureDockerRegistries".to_string());
        args.push(config.insecure_docker_registries.join(","));
    }

    if let (Some(user), Some(password)) = (&message.docker_user, &message.docker_password) {
        args.push("-dockerUser".to_string());
        args.push(user.clone());
        args.push("-dockerPassword".to_string());
        args.push(password.clone());
    }

    args
}

impl LifecycleProtocol for DockerLifecycle<'_> {
    fn lifecycle_type(&self) -> LifecycleType {
        LifecycleType::Docker
    }

    fn build_staging_action(
        &self,
        config: &RecipeConfig,
        context: &StagingContext,
    ) -> Result<LifecyclePlan> {
        let message = self.staging_message(context)?;

        let stage = Action::Run(RunAction {
            path: STAGING_BUILDER_PATH.to_string(),
            args: builder_args(config, &message),
            env: context.environment_variables.clone(),
            resource_limits: ResourceLimits {
                nofile: config.staging_nofile_limit,
            },
            user: VCAP_USER.to_string(),
            log_source: STAGING_LOG_SOURCE.to_string(),
            ..Default::default()
        });
        let action = Action::emit_progress(stage, "Staging...", "Staging complete", "Staging failed");

        let mut plan = LifecyclePlan::new(action);
        attach_lifecycle_bundle(
            config,
            &mut plan,
            BUNDLE_KEY,
            CACHE_KEY.to_string(),
            STAGING_LIFECYCLE_DIR,
        )?;
        Ok(plan)
    }

    fn root_fs_identifier(&self, config: &RecipeConfig, droplet: Option<&Droplet>) -> Result<String> {
        match droplet {
            None => Ok(format!("preloaded:{}", config.docker_staging_stack)),
            Some(droplet) => self.run_root_fs(droplet),
        }
    }

    fn task_action(
        &self,
        config: &RecipeConfig,
        context: &RunContext,
        droplet: &Droplet,
        command: &str,
    ) -> Result<LifecyclePlan> {
        let metadata = if droplet.execution_metadata.is_empty() {
            "{}".to_string()
        } else {
            droplet.execution_metadata.clone()
        };
        let run = Action::Run(RunAction {
            path: LAUNCHER_PATH.to_string(),
            args: vec!["app".to_string(), command.to_string(), metadata],
            env: context.environment_variables.clone(),
            user: ROOT_USER.to_string(),
            log_source: context.log_source(),
            ..Default::default()
        });

        let mut plan = LifecyclePlan::new(run);
        plan.image_credentials = droplet
            .docker_receipt_credentials
            .clone()
            .or_else(|| self.credentials.cloned());
        attach_lifecycle_bundle(
            config,
            &mut plan,
            BUNDLE_KEY,
            CACHE_KEY.to_string(),
            LIFECYCLE_DIR,
        )?;
        Ok(plan)
    }
}
