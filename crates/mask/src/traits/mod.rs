use annokit_common::Point;

use crate::types::{BinaryMask, Contour, ProbabilityMask};

/// Turns raw oracle scores into a foreground/background grid.
pub trait MaskBinarizer: Send + Sync {
    fn binarize(&self, mask: &ProbabilityMask) -> BinaryMask;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract contours, in mask space, from a binary mask
    fn extract_contours(&self, mask: &BinaryMask) -> Vec<Contour>;
}

/// Trait for shape simplification algorithms
pub trait ShapeSimplifier: Send + Sync {
    /// Reduce the vertex count of an ordered contour
    fn simplify(&self, points: &[Point], tolerance: f64) -> Vec<Point>;
}
