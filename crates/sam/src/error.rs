use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("No segmentation model is loaded")]
    Unavailable,

    #[error("A segmentation request is already in flight")]
    Busy,

    #[error("No embedding for image '{0}'")]
    NotEmbedded(String),

    #[error("At least one point prompt is required")]
    NoPoints,

    #[error("Segmentation backend failed: {0}")]
    Backend(String),

    #[error("Segmentation task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid mask from backend: {0}")]
    Mask(#[from] mask::MaskError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OracleError>;
