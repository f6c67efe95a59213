use core_drive::{DriveError, ErrorKind};
use provider_google_drive::GoogleDriveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] GoogleDriveError),

    #[error(transparent)]
    Drive(#[from] DriveError),
}

impl CoreError {
    /// Taxonomy kind, when the failure came from a Drive operation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CoreError::Drive(err) => err.kind(),
            _ => None,
        }
    }

    /// Process exit code for a command that failed with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Drive(err) => err.exit_code(),
            CoreError::Config(_) | CoreError::Provider(_) => ErrorKind::InvalidArgument.exit_code(),
            CoreError::InitializationFailed(_) => ErrorKind::Unknown.exit_code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
