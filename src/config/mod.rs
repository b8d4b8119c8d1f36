pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::adapters::mistral::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECONDS,
};
#[cfg(feature = "cli")]
use crate::core::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::{EtlError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate, SPREADSHEET_EXTENSIONS};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
#[derive(Clone, Parser)]
#[command(name = "pcb-extract")]
#[command(about = "Extract PCB characteristics from Excel specification sheets")]
pub struct CliConfig {
    /// Excel file (.xlsx or .xls) to parse
    pub input: String,

    /// Directory for the output files (defaults to the input's directory)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    #[arg(long, env = "MISTRAL_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    /// Attempts per model call when the provider is rate limiting
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    /// Base delay before retrying; doubles on every attempt
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    /// Also pack the three output files into a ZIP archive
    #[arg(long)]
    pub bundle: bool,

    /// Only extract and print the spreadsheet text, without calling the model
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("input", &self.input)
            .field("output_dir", &self.output_dir)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("api_endpoint", &self.api_endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("bundle", &self.bundle)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_dir(&self) -> Option<&str> {
        self.output_dir.as_deref()
    }

    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn bundle_outputs(&self) -> bool {
        self.bundle
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_file_extension("input", &self.input, SPREADSHEET_EXTENSIONS)?;
        if let Some(dir) = &self.output_dir {
            validation::validate_path("output_dir", dir)?;
        }

        if self.dry_run {
            return Ok(());
        }

        if self.api_key.trim().is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "api_key (--api-key or MISTRAL_API_KEY)".to_string(),
            });
        }
        validation::validate_url("api_endpoint", &self.api_endpoint)?;
        validation::validate_non_empty_string("model", &self.model)?;
        validation::validate_range("temperature", self.temperature, 0.0, 1.5)?;
        validation::validate_positive_number("timeout_seconds", self.timeout_seconds as usize, 1)?;
        validation::validate_positive_number("max_attempts", self.max_attempts, 1)?;
        Ok(())
    }
}
