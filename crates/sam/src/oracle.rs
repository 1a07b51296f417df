use std::path::Path;

use annokit_common::Point;
use mask::ProbabilityMask;

use crate::error::Result;

/// Mask returned for one set of point prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPrediction {
    pub mask: ProbabilityMask,
    /// Model confidence in `[0, 1]`.
    pub score: f64,
}

/// A promptable segmentation model.
///
/// Both calls are blocking and may be slow; [`crate::OracleSession`] moves
/// them off the async runtime. `predict` must return the same mask for the
/// same embedding and points.
pub trait SegmentationOracle: Send + Sync + 'static {
    /// Per-image state computed once and reused for every prompt on that image.
    type Embedding: Send + Sync + 'static;

    fn embed(&self, image_path: &Path) -> Result<Self::Embedding>;

    /// `points` are foreground clicks in original-image pixels.
    fn predict(&self, embedding: &Self::Embedding, points: &[Point]) -> Result<MaskPrediction>;
}
