use crate::adapters::mistral::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate, SPREADSHEET_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub model: ModelConfig,
    pub retry: Option<RetryConfig>,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,

    /// Set from the command line, never read from the file.
    #[serde(skip)]
    pub input_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_key: String,
    pub endpoint: Option<String>,
    pub name: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<usize>,
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: Option<String>,
    pub bundle: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn with_input(mut self, input_path: impl Into<String>) -> Self {
        self.input_path = input_path.into();
        self
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input", &self.input_path)?;
        validation::validate_file_extension("input", &self.input_path, SPREADSHEET_EXTENSIONS)?;

        if self.model.api_key.trim().is_empty() || self.model.api_key.contains("${") {
            return Err(EtlError::MissingConfigError {
                field: "model.api_key".to_string(),
            });
        }
        validation::validate_url("model.endpoint", self.api_endpoint())?;
        validation::validate_non_empty_string("model.name", self.model_name())?;
        validation::validate_range("model.temperature", self.temperature(), 0.0, 1.5)?;
        validation::validate_positive_number("retry.max_attempts", self.max_attempts(), 1)?;

        if let Some(dir) = self.output_dir() {
            validation::validate_path("output.directory", dir)?;
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_dir(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.directory.as_deref())
    }

    fn api_endpoint(&self) -> &str {
        self.model.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    fn api_key(&self) -> &str {
        &self.model.api_key
    }

    fn model_name(&self) -> &str {
        self.model.name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    fn temperature(&self) -> f32 {
        self.model.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn max_attempts(&self) -> usize {
        self.retry
            .as_ref()
            .and_then(|r| r.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(
            self.retry
                .as_ref()
                .and_then(|r| r.base_delay_ms)
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),
        )
    }

    fn bundle_outputs(&self) -> bool {
        self.output.as_ref().and_then(|o| o.bundle).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
