use bigp_gp::GpError;
use thiserror::Error;

/// A result type for training runs
pub type Result<T> = std::result::Result<T, RunError>;

/// An error when configuring or executing a training run
#[derive(Error, Debug)]
pub enum RunError {
    /// When the run configuration is incomplete or invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// When GP building, training or evaluation fails
    #[error(transparent)]
    GpError(#[from] GpError),
    /// When reading data or writing run outputs fails
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// When a dataset file is not a valid npy file
    #[error("Npy read error: {0}")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    /// When run outputs cannot be serialized
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RunError {
    /// Name of the error kind, GP errors are reported with their own kind
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::ConfigurationError(_) => "ConfigurationError",
            RunError::GpError(err) => err.kind(),
            RunError::IoError(_) => "IoError",
            RunError::ReadNpyError(_) => "ReadNpyError",
            RunError::JsonError(_) => "JsonError",
        }
    }
}
