//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Placeholder substituted with the backend service identifier.
pub const SERVICE_ID_PLACEHOLDER: &str = "{service_id}";
/// Placeholder substituted with the platform environment.
pub const ENVIRONMENT_PLACEHOLDER: &str = "{environment}";

const DEFAULT_TOKEN_URL: &str = "https://token.svc.{environment}.osaas.io/servicetoken";
const DEFAULT_API_URL_TEMPLATE: &str = "https://api-{service_id}.auto.{environment}.osaas.io";

/// Open Source Cloud configuration derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "OSC")]
pub struct OscConfig {
    /// Personal access token used to obtain per-service access tokens.
    pub personal_access_token: String,
    /// Platform environment (`prod`, `stage`, `dev`). Defaults to `prod`.
    #[ortho_config(default = "prod".to_owned())]
    pub environment: String,
    /// Overrides the service token endpoint.
    pub token_url: Option<String>,
    /// Overrides the instance API base URL. Must contain `{service_id}`.
    pub api_url_template: Option<String>,
    /// Timeout applied to every HTTP request, in seconds.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl OscConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to osc.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Builds a configuration from a token with every other field defaulted.
    #[must_use]
    pub fn with_token(personal_access_token: impl Into<String>) -> Self {
        Self {
            personal_access_token: personal_access_token.into(),
            environment: String::from("prod"),
            token_url: None,
            api_url_template: None,
            request_timeout_secs: 60,
        }
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("terraform-provider-osc")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values via environment variables or configuration
    /// files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when an override is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.personal_access_token,
            &FieldMetadata::new(
                "personal access token",
                "OSC_PERSONAL_ACCESS_TOKEN",
                "personal_access_token",
            ),
        )?;
        Self::require_field(
            &self.environment,
            &FieldMetadata::new("platform environment", "OSC_ENVIRONMENT", "environment"),
        )?;
        if let Some(template) = &self.api_url_template {
            if !template.contains(SERVICE_ID_PLACEHOLDER) {
                return Err(ConfigError::Invalid(format!(
                    "api_url_template must contain {SERVICE_ID_PLACEHOLDER}: {template}"
                )));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "request_timeout_secs must be greater than zero",
            )));
        }
        Ok(())
    }

    /// Service token endpoint for the configured environment.
    #[must_use]
    pub fn token_url(&self) -> String {
        self.token_url
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_URL)
            .replace(ENVIRONMENT_PLACEHOLDER, &self.environment)
    }

    /// Instance API base URL for `service_id`, without a trailing slash.
    #[must_use]
    pub fn api_base_url(&self, service_id: &str) -> String {
        self.api_url_template
            .as_deref()
            .unwrap_or(DEFAULT_API_URL_TEMPLATE)
            .replace(ENVIRONMENT_PLACEHOLDER, &self.environment)
            .replace(SERVICE_ID_PLACEHOLDER, service_id)
            .trim_end_matches('/')
            .to_owned()
    }

    /// Timeout applied to each HTTP request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configured value cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
