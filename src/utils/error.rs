use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Analysis error: {message}")]
    AnalysisError { message: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::UrlError(_) => ErrorCategory::Configuration,
            EtlError::SerializationError(_) | EtlError::AnalysisError { .. } => ErrorCategory::Data,
            EtlError::DatabaseError(_) | EtlError::StoreError { .. } => ErrorCategory::Storage,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and that the board is reachable",
            EtlError::HttpStatusError { status, .. } if *status == 429 => {
                "The server is rate limiting; raise pipeline.delay_seconds and retry later"
            }
            EtlError::HttpStatusError { .. } => "Verify source.listing_url still points at the board",
            EtlError::ConfigError { .. } | EtlError::ConfigValidationError { .. } => {
                "Fix the configuration file and run again"
            }
            EtlError::MissingConfigError { .. } => {
                "Add the missing value or export the environment variable it references"
            }
            EtlError::InvalidConfigValueError { .. } | EtlError::UrlError(_) => {
                "Correct the offending configuration value"
            }
            EtlError::SerializationError(_) | EtlError::AnalysisError { .. } => {
                "Inspect the analysis response; the model may have returned malformed JSON"
            }
            EtlError::DatabaseError(_) | EtlError::StoreError { .. } => {
                "Check store credentials and that the scholarships table exists"
            }
            EtlError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the source site: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Could not interpret analysis output: {}", self),
            ErrorCategory::Storage => format!("Could not access the scholarship store: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Exit code used by the binaries; low-severity failures still exit 0.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
