use thiserror::Error;

/// Message shown to the user when the model provider is out of capacity.
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Сервис временно недоступен из-за высокого спроса. Пожалуйста, попробуйте позже или обновите API ключ.";

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Model API returned status {status}: {body}")]
    ModelApiError { status: u16, body: String },

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("XLSX write error: {0}")]
    XlsxWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("{msg}", msg = SERVICE_UNAVAILABLE_MESSAGE)]
    ServiceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Input,
    Output,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

/// True when an error text points at provider throttling or exhausted capacity.
pub fn is_rate_limit_message(message: &str) -> bool {
    message.contains("429") || message.to_lowercase().contains("capacity exceeded")
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::ApiError(_) | EtlError::ModelApiError { .. } | EtlError::ServiceUnavailable => {
                ErrorCategory::Network
            }
            EtlError::SpreadsheetError(_) => ErrorCategory::Input,
            EtlError::ZipError(_)
            | EtlError::XlsxWriteError(_)
            | EtlError::CsvError(_)
            | EtlError::IoError(_) => ErrorCategory::Output,
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        if self.is_rate_limited() {
            return ErrorSeverity::Medium;
        }
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Output => ErrorSeverity::Critical,
            ErrorCategory::Network | ErrorCategory::Input | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
        }
    }

    /// Whether this error means the model provider is throttling us.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            EtlError::ServiceUnavailable => true,
            EtlError::ModelApiError { status: 429, .. } => true,
            other => is_rate_limit_message(&other.to_string()),
        }
    }

    /// Rate-limit errors become [`EtlError::ServiceUnavailable`]; everything
    /// else is returned as is.
    pub fn into_user_facing(self) -> Self {
        if self.is_rate_limited() {
            EtlError::ServiceUnavailable
        } else {
            self
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if self.is_rate_limited() {
            return "Wait a few minutes and retry, or switch to a different API key";
        }
        match self {
            EtlError::MissingConfigError { .. } => {
                "Provide the missing setting via a flag, environment variable or config file"
            }
            EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::ConfigError { .. } => "Check the configuration values and try again",
            EtlError::ApiError(_) => "Check network connectivity and the API endpoint",
            EtlError::ModelApiError { status: 401, .. }
            | EtlError::ModelApiError { status: 403, .. } => "Check that the API key is valid",
            EtlError::ModelApiError { .. } => "Check the model name and API endpoint",
            EtlError::SpreadsheetError(_) => "Make sure the input is a readable .xlsx or .xls file",
            EtlError::IoError(_) => "Check file paths and permissions",
            EtlError::ZipError(_) | EtlError::XlsxWriteError(_) | EtlError::CsvError(_) => {
                "Check that the output directory is writable"
            }
            EtlError::SerializationError(_) | EtlError::ProcessingError { .. } => {
                "Run again with --verbose to inspect the model response"
            }
            EtlError::ServiceUnavailable => "Wait a few minutes and retry",
        }
    }

    /// Process exit code for the CLI front ends.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::ServiceUnavailable => SERVICE_UNAVAILABLE_MESSAGE.to_string(),
            EtlError::SpreadsheetError(e) => format!("Could not read the spreadsheet: {}", e),
            EtlError::MissingConfigError { field } => format!("Missing required setting: {}", field),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
