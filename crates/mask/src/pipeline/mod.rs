pub mod builder;

use tracing::debug;

use crate::{
    algorithms::largest_contour,
    traits::{ContourExtractor, MaskBinarizer, ShapeSimplifier},
    types::{BinaryMask, MaskOutline, MaskTransform, ProbabilityMask},
};

/// Default Douglas-Peucker tolerance, in mask-space pixels.
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Mask to polygon: binarize, trace, keep the largest contour, simplify, rescale.
pub struct Pipeline {
    binarizer: Box<dyn MaskBinarizer>,
    contour_extractor: Box<dyn ContourExtractor>,
    simplifier: Box<dyn ShapeSimplifier>,
    tolerance: f64,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        binarizer: Box<dyn MaskBinarizer>,
        contour_extractor: Box<dyn ContourExtractor>,
        simplifier: Box<dyn ShapeSimplifier>,
        tolerance: f64,
    ) -> Self {
        Self {
            binarizer,
            contour_extractor,
            simplifier,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Outline the largest region of `mask`, mapped to original-image space.
    ///
    /// The polygon is empty when the mask has no region of traceable size.
    /// Rejecting outlines with fewer than 3 vertices is left to the caller.
    pub fn extract(&self, mask: &BinaryMask, transform: &MaskTransform) -> MaskOutline {
        let contours = self.contour_extractor.extract_contours(mask);
        let contours_found = contours.len();

        let Some(contour) = largest_contour(contours) else {
            debug!(
                width = mask.width(),
                height = mask.height(),
                "no contour found in mask"
            );
            return MaskOutline {
                polygon: Vec::new(),
                contours_found,
                traced_points: 0,
                mask_width: mask.width(),
                mask_height: mask.height(),
            };
        };

        let simplified = self.simplifier.simplify(&contour, self.tolerance);
        let polygon: Vec<_> = simplified.into_iter().map(|p| transform.apply(p)).collect();

        debug!(
            contours = contours_found,
            traced = contour.len(),
            vertices = polygon.len(),
            "mask outlined"
        );

        MaskOutline {
            polygon,
            contours_found,
            traced_points: contour.len(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        }
    }

    /// Binarize oracle scores first, then [`Pipeline::extract`].
    pub fn extract_from_probabilities(
        &self,
        mask: &ProbabilityMask,
        transform: &MaskTransform,
    ) -> MaskOutline {
        let binary = self.binarizer.binarize(mask);
        self.extract(&binary, transform)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: binarize, trace boundary, largest contour, simplify (tolerance {})",
            self.tolerance
        )
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        builder::PipelineBuilder::new().build()
    }
}
