//! Recipe assembly
//!
//! [`RecipeBuilder`] combines a lifecycle plan with limits, egress rules,
//! placement, identity metadata and service binding files. It holds no mutable
//! state and can be shared across threads.

use super::egress::egress_rules;
use super::metadata::{
    certificate_properties, cpu_weight, metric_tags, network, placement_tags, ContainerWorkload,
    STAGING_CPU_WEIGHT,
};
use super::volume::volume_mounts;
use super::{Action, Checksum, LogRateLimit, SchedulerRecipe};
use crate::bindings::ServiceBindingFilesBuilder;
use crate::config::RecipeConfig;
use crate::error::Result;
use crate::lifecycle::buildpack::STAGING_LOG_SOURCE;
use crate::lifecycle::{LifecycleProtocol, LifecycleStrategy, RESULT_FILE, VCAP_USER};
use crate::model::{Droplet, RunContext, RunUnit, StagingContext, Workload};
use crate::recipe::File;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RecipeBuilder {
    config: RecipeConfig,
    binding_files: ServiceBindingFilesBuilder,
}

impl RecipeBuilder {
    pub fn new(config: RecipeConfig) -> Self {
        Self {
            config,
            binding_files: ServiceBindingFilesBuilder::new(),
        }
    }

    pub fn config(&self) -> &RecipeConfig {
        &self.config
    }

    /// One-shot staging recipe; the lifecycle action runs under the staging timeout
    ///
    /// The container environment carries only what the lifecycle contributes.
    /// The caller's staging variables reach the builder process through its run
    /// action.
    pub fn build_staging_recipe(&self, context: &StagingContext) -> Result<SchedulerRecipe> {
        let strategy = LifecycleStrategy::select(&context.lifecycle);
        let plan = strategy.build_staging_action(&self.config, context)?;
        let root_fs = strategy.root_fs_identifier(&self.config, None)?;
        let workload = &context.workload;

        let callback = self.config.internal_url(&format!(
            "/internal/v3/staging/{}/build_completed?start={}",
            context.staging_guid, context.start_after_staging
        ));

        let recipe = SchedulerRecipe {
            guid: context.staging_guid.clone(),
            log_guid: workload.guid.clone(),
            log_source: STAGING_LOG_SOURCE.to_string(),
            metrics_guid: String::new(),
            root_fs,
            memory_mb: context.memory_mb,
            disk_mb: context.disk_mb,
            log_rate_limit: LogRateLimit {
                bytes_per_second: context.log_rate_limit_bytes_per_second,
            },
            cpu_weight: STAGING_CPU_WEIGHT,
            max_pids: self.config.pid_limit,
            privileged: self.config.use_privileged_containers_for_staging,
            action: Action::timeout(plan.action, self.config.staging_timeout_ms()),
            environment_variables: plan.environment_variables,
            cached_dependencies: plan.cached_dependencies,
            image_layers: plan.image_layers,
            egress_rules: egress_rules(&context.security_groups)?,
            placement_tags: placement_tags(context.isolation_segment.as_deref()),
            certificate_properties: certificate_properties(workload),
            checksum: None,
            network: network(workload, &[], ContainerWorkload::Staging),
            metric_tags: metric_tags(workload),
            volume_mounts: Vec::new(),
            volume_mounted_files: self.volume_mounted_files(workload)?,
            completion_callback_url: Some(callback),
            trusted_system_certificates_path: self.config.trusted_system_certificates_path.clone(),
            result_file: RESULT_FILE.to_string(),
            legacy_download_user: VCAP_USER.to_string(),
            image_username: plan.image_credentials.as_ref().map(|c| c.username.clone()),
            image_password: plan.image_credentials.map(|c| c.password),
            ports: Vec::new(),
            instances: None,
        };

        debug!(
            guid = %recipe.guid,
            lifecycle = %strategy.lifecycle_type(),
            egress_rules = recipe.egress_rules.len(),
            "built staging recipe"
        );
        Ok(recipe)
    }

    /// Task or long-running process recipe
    pub fn build_run_recipe(&self, context: &RunContext) -> Result<SchedulerRecipe> {
        let strategy = LifecycleStrategy::select(&context.lifecycle);
        let (droplet, command) = select_droplet_and_command(context);
        let plan = strategy.task_action(&self.config, context, droplet, &command)?;
        let root_fs = strategy.root_fs_identifier(&self.config, Some(droplet))?;
        let workload = &context.workload;

        let (ports, instances, kind, callback) = match &context.unit {
            RunUnit::Task { .. } => (
                Vec::new(),
                None,
                ContainerWorkload::Task,
                Some(
                    self.config
                        .internal_url(&format!("/internal/v4/tasks/{}/completed", context.guid)),
                ),
            ),
            RunUnit::Process { ports, instances } => {
                (ports.clone(), Some(*instances), ContainerWorkload::App, None)
            }
        };

        let mut environment_variables = context.environment_variables.clone();
        environment_variables.extend(plan.environment_variables);

        let recipe = SchedulerRecipe {
            guid: context.guid.clone(),
            log_guid: workload.guid.clone(),
            log_source: context.log_source(),
            metrics_guid: String::new(),
            root_fs,
            memory_mb: context.memory_mb,
            disk_mb: context.disk_mb,
            log_rate_limit: LogRateLimit {
                bytes_per_second: context.log_rate_limit_bytes_per_second,
            },
            cpu_weight: cpu_weight(context.memory_mb),
            max_pids: self.config.pid_limit,
            privileged: self.config.use_privileged_containers_for_running,
            action: plan.action,
            environment_variables,
            cached_dependencies: plan.cached_dependencies,
            image_layers: plan.image_layers,
            egress_rules: egress_rules(&context.security_groups)?,
            placement_tags: placement_tags(context.isolation_segment.as_deref()),
            certificate_properties: certificate_properties(workload),
            checksum: droplet_checksum(droplet),
            network: network(workload, &ports, kind),
            metric_tags: metric_tags(workload),
            volume_mounts: volume_mounts(&workload.service_bindings),
            volume_mounted_files: self.volume_mounted_files(workload)?,
            completion_callback_url: callback,
            trusted_system_certificates_path: self.config.trusted_system_certificates_path.clone(),
            result_file: String::new(),
            legacy_download_user: VCAP_USER.to_string(),
            image_username: plan.image_credentials.as_ref().map(|c| c.username.clone()),
            image_password: plan.image_credentials.map(|c| c.password),
            ports,
            instances,
        };

        debug!(
            guid = %recipe.guid,
            lifecycle = %strategy.lifecycle_type(),
            droplet = %droplet.guid,
            egress_rules = recipe.egress_rules.len(),
            "built run recipe"
        );
        Ok(recipe)
    }

    fn volume_mounted_files(&self, workload: &Workload) -> Result<Vec<File>> {
        Ok(self
            .binding_files
            .build(workload)?
            .map(|fileset| fileset.into_files())
            .unwrap_or_default())
    }
}

/// Picks the droplet to run and the command to run it with
///
/// With revisions enabled and a revision present, the revision's droplet is used
/// and the command comes from the revision's recorded command for the process
/// type, else the revision droplet's detected command. Otherwise the unit's own
/// droplet and command are used. A task's explicit command always wins.
pub fn select_droplet_and_command(context: &RunContext) -> (&Droplet, String) {
    let process_type = context.process_type.as_str();
    let task_command = match &context.unit {
        RunUnit::Task { .. } => context.command.clone(),
        RunUnit::Process { .. } => None,
    };

    if context.workload.revisions_enabled {
        if let Some(revision) = &context.revision {
            let command = task_command
                .or_else(|| revision.commands.get(process_type).cloned())
                .or_else(|| revision.droplet.detected_command(process_type).map(String::from))
                .unwrap_or_default();
            return (&revision.droplet, command);
        }
    }

    let command = context
        .command
        .clone()
        .or_else(|| context.droplet.detected_command(process_type).map(String::from))
        .unwrap_or_default();
    (&context.droplet, command)
}

fn droplet_checksum(droplet: &Droplet) -> Option<Checksum> {
    droplet.sha256_checksum.as_ref().map(|value| Checksum {
        algorithm: "sha256".to_string(),
        value: value.clone(),
    })
}
