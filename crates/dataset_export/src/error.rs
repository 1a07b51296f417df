use thiserror::Error;

use crate::config::ExportFormat;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No images with {format} annotations to export")]
    NoAnnotatedImages { format: ExportFormat },

    /// Raised per image and recovered inside the pipeline.
    #[error("Source image not found: {0}")]
    SourceImageMissing(String),

    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to walk staging directory: {0}")]
    Walk(#[from] jwalk::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
