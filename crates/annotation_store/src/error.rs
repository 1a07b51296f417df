use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Image '{0}' is being processed")]
    ImageBusy(String),

    #[error("Annotation store lock was poisoned")]
    Poisoned,

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] jwalk::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
