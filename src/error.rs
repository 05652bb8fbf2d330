use thiserror::Error;

#[derive(Error, Debug)]
pub enum BulkUnpackError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input path not found: {path}")]
    NotFound { path: String },

    #[error("Data integrity check failed: {message}")]
    DataIntegrity { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Worker failure: {message}")]
    Worker { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

impl BulkUnpackError {
    pub fn not_found(path: &std::path::Path) -> Self {
        BulkUnpackError::NotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        BulkUnpackError::Config {
            message: message.into(),
        }
    }

    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        BulkUnpackError::DataIntegrity {
            message: message.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for BulkUnpackError {
    fn user_message(&self) -> String {
        match self {
            BulkUnpackError::NotFound { path } => {
                format!("Input path does not exist: {}", path)
            }
            BulkUnpackError::DataIntegrity { message } => {
                format!("Dataset check failed: {}", message)
            }
            BulkUnpackError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            BulkUnpackError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            BulkUnpackError::Worker { message } => {
                format!("A worker thread failed: {}", message)
            }
            BulkUnpackError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            BulkUnpackError::NotFound { .. } => Some(
                "Check the input directory path. Archives must already be downloaded before they can be extracted.".to_string()
            ),
            BulkUnpackError::DataIntegrity { .. } => Some(
                "Make sure the directory contains archives with the expected suffix (see [scan] suffixes) and that they are not all on the ignore list.".to_string()
            ),
            BulkUnpackError::Config { .. } => Some(
                "Check your configuration file and flags. The worker count must be at least 1.".to_string()
            ),
            BulkUnpackError::InvalidPath { .. } => Some(
                "Pass a directory, not a file.".to_string()
            ),
            BulkUnpackError::Cancelled => Some(
                "Rerun the same command to continue; completed archives are extracted again and overwritten.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for BulkUnpackError {
    fn from(error: toml::de::Error) -> Self {
        BulkUnpackError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BulkUnpackError>;
