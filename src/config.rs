//! Configuration for recipe compilation
//!
//! Settings come from a YAML document (usually the platform's cloud controller
//! configuration, trimmed to the keys below) with `RECIPE_*` environment
//! variables layered on top.
//!
//! # Environment Variables
//!
//! - `RECIPE_INTERNAL_SERVICE_HOSTNAME`: Callback host - default: "cloud-controller-ng.service.cf.internal"
//! - `RECIPE_TLS_PORT`: Callback TLS port - default: "9023"
//! - `RECIPE_STAGING_TIMEOUT`: Staging timeout in seconds - default: "900"
//! - `RECIPE_PID_LIMIT`: Per-container process id limit, 0 for unlimited - default: "1024"
//! - `RECIPE_PRIVILEGED_STAGING`: Run staging containers privileged - default: "false"
//! - `RECIPE_PRIVILEGED_RUNNING`: Run app containers privileged - default: "false"
//! - `RECIPE_FILE_SERVER_URL`: Lifecycle bundle file server
//! - `RECIPE_DECLARATIVE_ASSETS`: Emit image layers instead of downloads - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use recipe_compiler::RecipeConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RecipeConfig::from_file("config/recipe.yml")?;
//! config.apply_env_overrides();
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::Path;
use thiserror::Error;

const DEFAULT_INTERNAL_SERVICE_HOSTNAME: &str = "cloud-controller-ng.service.cf.internal";
const DEFAULT_TLS_PORT: u16 = 9023;
const DEFAULT_STAGING_TIMEOUT_SECS: u64 = 900;
const MAX_STAGING_TIMEOUT_SECS: u64 = 86_400;
const DEFAULT_PID_LIMIT: i32 = 1024;
const DEFAULT_FILE_SERVER_URL: &str = "http://file-server.service.cf.internal:8080";
const DEFAULT_DOCKER_STAGING_STACK: &str = "cflinuxfs4";
const DEFAULT_STAGING_NOFILE_LIMIT: u64 = 16384;
const DEFAULT_TRUSTED_CERTS_PATH: &str = "/etc/cf-system-certificates";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    ReadFailed { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Platform configuration consumed while assembling recipes
///
/// `lifecycle_bundles` maps `buildpack/<stack>`, `cnb/<stack>` and `docker` to
/// the bundle filename served by the file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    pub internal_service_hostname: String,
    pub tls_port: u16,
    pub staging_timeout_secs: u64,
    pub pid_limit: i32,
    pub use_privileged_containers_for_staging: bool,
    pub use_privileged_containers_for_running: bool,
    pub lifecycle_bundles: BTreeMap<String, String>,
    pub file_server_url: String,
    pub docker_staging_stack: String,
    pub skip_cert_verify: bool,
    pub insecure_docker_registries: Vec<String>,
    pub enable_declarative_asset_downloads: bool,
    pub staging_nofile_limit: Option<u64>,
    pub trusted_system_certificates_path: String,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            internal_service_hostname: DEFAULT_INTERNAL_SERVICE_HOSTNAME.to_string(),
            tls_port: DEFAULT_TLS_PORT,
            staging_timeout_secs: DEFAULT_STAGING_TIMEOUT_SECS,
            pid_limit: DEFAULT_PID_LIMIT,
            use_privileged_containers_for_staging: false,
            use_privileged_containers_for_running: false,
            lifecycle_bundles: BTreeMap::new(),
            file_server_url: DEFAULT_FILE_SERVER_URL.to_string(),
            docker_staging_stack: DEFAULT_DOCKER_STAGING_STACK.to_string(),
            skip_cert_verify: false,
            insecure_docker_registries: Vec::new(),
            enable_declarative_asset_downloads: false,
            staging_nofile_limit: Some(DEFAULT_STAGING_NOFILE_LIMIT),
            trusted_system_certificates_path: DEFAULT_TRUSTED_CERTS_PATH.to_string(),
        }
    }
}

impl RecipeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Overrides individual settings from `RECIPE_*` environment variables
    ///
    /// Unparseable values are ignored and the file value is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var("RECIPE_INTERNAL_SERVICE_HOSTNAME") {
            self.internal_service_hostname = host;
        }

        self.tls_port = env::var("RECIPE_TLS_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(self.tls_port);

        self.staging_timeout_secs = env::var("RECIPE_STAGING_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(self.staging_timeout_secs);

        self.pid_limit = env::var("RECIPE_PID_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(self.pid_limit);

        self.use_privileged_containers_for_staging = env::var("RECIPE_PRIVILEGED_STAGING")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(self.use_privileged_containers_for_staging);

        self.use_privileged_containers_for_running = env::var("RECIPE_PRIVILEGED_RUNNING")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(self.use_privileged_containers_for_running);

        if let Ok(url) = env::var("RECIPE_FILE_SERVER_URL") {
            self.file_server_url = url;
        }

        self.enable_declarative_asset_downloads = env::var("RECIPE_DECLARATIVE_ASSETS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(self.enable_declarative_asset_downloads);
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` naming the first offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Staging timeout must be at least 1 second".to_string(),
            ));
        }
        if self.staging_timeout_secs > MAX_STAGING_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(
                "Staging timeout cannot exceed 24 hours".to_string(),
            ));
        }

        if self.internal_service_hostname.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Internal service hostname must not be empty".to_string(),
            ));
        }

        if self.tls_port == 0 {
            return Err(ConfigError::ValidationFailed(
                "TLS port must be greater than 0".to_string(),
            ));
        }

        if self.pid_limit < 0 {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid pid limit: {}. Use 0 for unlimited",
                self.pid_limit
            )));
        }

        Ok(())
    }

    pub fn staging_timeout_ms(&self) -> u64 {
        self.staging_timeout_secs.saturating_mul(1000)
    }

    pub fn internal_url(&self, path: &str) -> String {
        format!(
            "https://{}:{}{}",
            self.internal_service_hostname, self.tls_port, path
        )
    }

    pub fn lifecycle_bundle(&self, key: &str) -> Option<&str> {
        self.lifecycle_bundles.get(key).map(String::as_str)
    }
}

impl fmt::Display for RecipeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recipe Configuration:")?;
        writeln!(
            f,
            "  Callback: {}:{}",
            self.internal_service_hostname, self.tls_port
        )?;
        writeln!(f, "  Staging Timeout: {}s", self.staging_timeout_secs)?;
        writeln!(f, "  Pid Limit: {}", self.pid_limit)?;
        writeln!(
            f,
            "  Privileged: staging={} running={}",
            self.use_privileged_containers_for_staging, self.use_privileged_containers_for_running
        )?;
        writeln!(f, "  Lifecycle Bundles: {}", self.lifecycle_bundles.len())?;
        writeln!(f, "  File Server: {}", self.file_server_url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_default_configuration_is_valid() {
        let config = RecipeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.staging_timeout_ms(), 900_000);
        assert_eq!(
            config.trusted_system_certificates_path,
            "/etc/cf-system-certificates"
        );
    }

    #[test]
    fn test_staging_timeout_ms_saturates() {
        let config = RecipeConfig {
            staging_timeout_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.staging_timeout_ms(), u64::MAX);
    }

    #[test]
    fn test_from_yaml_fills_missing_keys_with_defaults() {
        let yaml = r#"
internal_service_hostname: api.internal
tls_port: 8443
staging_timeout_secs: 90
lifecycle_bundles:
  buildpack/cflinuxfs4: buildpack_app_lifecycle.tgz
  docker: docker_app_lifecycle.tgz
"#;
        let config = RecipeConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.internal_service_hostname, "api.internal");
        assert_eq!(config.tls_port, 8443);
        assert_eq!(config.staging_timeout_ms(), 90_000);
        assert_eq!(config.pid_limit, DEFAULT_PID_LIMIT);
        assert_eq!(
            config.lifecycle_bundle("docker"),
            Some("docker_app_lifecycle.tgz")
        );
        assert_eq!(config.lifecycle_bundle("cnb/cflinuxfs4"), None);
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let result = RecipeConfig::from_yaml_str("tls_port: [not, a, port]");
        assert!(matches!(result, Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = RecipeConfig::from_file("/nonexistent/recipe.yml");
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    #[serial]
    fn test_environment_variable_overrides() {
        let _guards = vec![
            EnvGuard::set("RECIPE_INTERNAL_SERVICE_HOSTNAME", "cc.internal"),
            EnvGuard::set("RECIPE_TLS_PORT", "9443"),
            EnvGuard::set("RECIPE_STAGING_TIMEOUT", "120"),
            EnvGuard::set("RECIPE_PRIVILEGED_RUNNING", "true"),
            EnvGuard::set("RECIPE_PID_LIMIT", "not-a-number"),
        ];

        let mut config = RecipeConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.internal_service_hostname, "cc.internal");
        assert_eq!(config.tls_port, 9443);
        assert_eq!(config.staging_timeout_secs, 120);
        assert!(config.use_privileged_containers_for_running);
        assert!(!config.use_privileged_containers_for_staging);
        assert_eq!(config.pid_limit, DEFAULT_PID_LIMIT);
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = RecipeConfig {
            staging_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_excessive_timeout() {
        let config = RecipeConfig {
            staging_timeout_secs: MAX_STAGING_TIMEOUT_SECS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_hostname() {
        let config = RecipeConfig {
            internal_service_hostname: "  ".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hostname"));
    }

    #[test]
    fn test_validation_rejects_negative_pid_limit() {
        let config = RecipeConfig {
            pid_limit: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_internal_url() {
        let config = RecipeConfig {
            internal_service_hostname: "cc.internal".to_string(),
            tls_port: 9023,
            ..Default::default()
        };
        assert_eq!(
            config.internal_url("/internal/v4/tasks/t1/completed"),
            "https://cc.internal:9023/internal/v4/tasks/t1/completed"
        );
    }

    #[test]
    fn test_config_display() {
        let display = RecipeConfig::default().to_string();
        assert!(display.contains("Recipe Configuration:"));
        assert!(display.contains("Staging Timeout: 900s"));
    }
}
