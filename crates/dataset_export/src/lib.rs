//! # Dataset Export
//!
//! Turns an annotation store and its image folder into a training archive.
//!
//! - **Detection**: images letterboxed into a square canvas, one normalized-box
//!   label file per image and a `data.yaml` manifest.
//! - **Segmentation**: images copied untouched, one polygon document per split
//!   and a `metadata.json`.
//!
//! Both share selection, the seeded train/val/test split and zip packaging. The
//! [`preview`] module renders what a single image will look like in the export.
//!
//! ```rust,no_run
//! use std::{collections::BTreeMap, path::Path};
//!
//! use dataset_export::{ExportConfig, Exporter};
//!
//! # fn main() -> dataset_export::Result<()> {
//! let records = BTreeMap::new();
//! let config = ExportConfig {
//!     seed: Some(42),
//!     ..ExportConfig::default()
//! };
//! let outcome = Exporter::new("/tmp/annokit-staging").export(&records, Path::new("images"), &config)?;
//! std::fs::write("dataset.zip", outcome.archive)?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod detection;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod preview;
pub mod segmentation;
pub mod split;

pub use archive::zip_directory;
pub use config::{
    DEFAULT_TARGET_SIZE, ExportConfig, ExportFormat, ImageFilters, ModelPreset, SplitName,
    SplitRatios,
};
pub use error::{ExportError, Result};
pub use filters::{apply_filters, letterbox_image, prepare_image};
pub use pipeline::{ExportOutcome, ExportReport, Exporter, select_images};
pub use preview::{PreviewOverlay, render_preview, render_preview_png};
pub use segmentation::{Metadata, SplitDocument};
pub use split::{DatasetSplit, seeded_split, split_dataset};
