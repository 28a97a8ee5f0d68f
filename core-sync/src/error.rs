use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Bookmark source unreachable at {location}: {reason}")]
    SourceUnreachable { location: String, reason: String },

    #[error("Malformed XBEL: {0}")]
    Parse(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Storage error: {0}")]
    Storage(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sync already in progress")]
    SyncInProgress,

    #[error("Invalid source URL: {0}")]
    InvalidSourceUrl(String),

    #[error("Invalid settings: {0}")]
    Config(String),

    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl From<quick_xml::Error> for SyncError {
    fn from(e: quick_xml::Error) -> Self {
        SyncError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
