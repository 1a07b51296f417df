//! Point-prompt segmentation.
//!
//! The model itself is hidden behind [`SegmentationOracle`]. [`OracleSession`]
//! adds the embedding cache and single-flight gate around it and turns
//! predicted masks into [`annokit_common::Segment`]s through the `mask`
//! pipeline.

pub mod error;
pub mod oracle;
pub mod process;
pub mod session;

pub use error::{OracleError, Result};
pub use oracle::{MaskPrediction, SegmentationOracle};
pub use process::{EmbeddingFile, ProcessOracle};
pub use session::OracleSession;
