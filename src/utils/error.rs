use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("SSH/SFTP error: {0}")]
    SshError(#[from] ssh2::Error),

    #[error("Remote file not found: {path}")]
    RemoteFileNotFound { path: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No files matching '{pattern}' in {directory}")]
    NoMatchingFiles { pattern: String, directory: String },

    #[error("No CSV file found inside archive {archive}")]
    NoCsvInArchive { archive: String },

    #[error("Source CSV is missing column(s): {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("All values in 'Date' are empty after parsing")]
    EmptyDates,

    #[error(
        "Date range {min} to {max} is not fully within the last {lookback_days} days ({window_start}..{today})"
    )]
    StaleDateRange {
        min: NaiveDate,
        max: NaiveDate,
        lookback_days: u32,
        window_start: NaiveDate,
        today: NaiveDate,
    },

    #[error(
        "Latest file month ({file_month}) is not the current month ({current_month}) or previous month ({previous_month})"
    )]
    MonthOutOfRange {
        file_month: u32,
        current_month: u32,
        previous_month: u32,
    },

    #[error("Data contract breached: {failures} failure(s)")]
    ContractBreach { failures: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Background task failed: {0}")]
    TaskJoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Io,
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
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::SshError(_) | EtlError::RemoteFileNotFound { .. } => ErrorCategory::Network,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::NoCsvInArchive { .. }
            | EtlError::MissingColumns { .. }
            | EtlError::EmptyDates
            | EtlError::StaleDateRange { .. }
            | EtlError::MonthOutOfRange { .. }
            | EtlError::ContractBreach { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::NoMatchingFiles { .. } => ErrorCategory::Io,
            EtlError::TaskJoinError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 遠端檔案尚未產生，稍後重跑即可
            EtlError::RemoteFileNotFound { .. }
            | EtlError::SshError(_)
            | EtlError::StaleDateRange { .. }
            | EtlError::MonthOutOfRange { .. } => ErrorSeverity::Medium,
            EtlError::TaskJoinError(_) => ErrorSeverity::Critical,
            EtlError::IoError(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            EtlError::SshError(_) => true,
            EtlError::IoError(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::RemoteFileNotFound { .. } => {
                "The distributor may not have published today's export yet; rerun later or pass --as-of".to_string()
            }
            EtlError::SshError(_) => {
                "Check ftp_host, ftp_port, ftp_user and ftp_pass, and that the server is reachable".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the configuration file or the matching environment variable (.env is loaded at startup)".to_string()
            }
            EtlError::NoMatchingFiles { .. } => {
                "Run the download step first or check extract.raw_dir and extract.zip_pattern".to_string()
            }
            EtlError::NoCsvInArchive { .. } | EtlError::ZipError(_) => {
                "Inspect the downloaded archive; it may be truncated or have changed format".to_string()
            }
            EtlError::CsvError(_) | EtlError::MissingColumns { .. } => {
                "Check that the source CSV still has the expected column headers".to_string()
            }
            EtlError::EmptyDates => "Check the source 'Date' column and transform.date_formats".to_string(),
            EtlError::StaleDateRange { .. } | EtlError::MonthOutOfRange { .. } => {
                "The export holds old data; confirm with the distributor before loading it".to_string()
            }
            EtlError::ContractBreach { .. } => {
                "Review the failure report above, or set validation.strict = false to load anyway".to_string()
            }
            EtlError::IoError(_) => "Check that the paths exist and are writable".to_string(),
            _ => "Rerun with --verbose for more detail".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not fetch the daily export: {}", self),
            ErrorCategory::Data => format!("The daily export could not be processed: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::System => format!("Internal failure: {}", self),
        }
    }
}
