//! Error types for Gazette

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GazetteError>;

#[derive(Error, Debug)]
pub enum GazetteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GazetteError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            GazetteError::InvalidInput(_) => 3,
            GazetteError::Config(_) => 2,
            GazetteError::History(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed config: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History store operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
