use crate::{
    algorithms::{BoundaryTraceExtractor, DouglasPeuckerSimplifier, GeoSimplifier, ThresholdBinarizer},
    pipeline::{DEFAULT_TOLERANCE, Pipeline},
    traits::{ContourExtractor, MaskBinarizer, ShapeSimplifier},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    binarizer: Option<Box<dyn MaskBinarizer>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    simplifier: Option<Box<dyn ShapeSimplifier>>,
    tolerance: f64,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            binarizer: None,
            contour_extractor: None,
            simplifier: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: MaskBinarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: ShapeSimplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    pub fn with_threshold(self, threshold: f32) -> Self {
        self.set_binarizer(ThresholdBinarizer { threshold })
    }

    pub fn with_min_contour_points(self, min_points: usize) -> Self {
        self.set_contour_extractor(BoundaryTraceExtractor { min_points })
    }

    /// Douglas-Peucker tolerance in mask-space pixels
    pub fn with_simplification(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let binarizer = self
            .binarizer
            .unwrap_or_else(|| Box::new(ThresholdBinarizer::default()));
        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(BoundaryTraceExtractor::default()));
        let simplifier = self
            .simplifier
            .unwrap_or_else(|| Box::new(DouglasPeuckerSimplifier::default()));

        Pipeline::new(binarizer, contour_extractor, simplifier, self.tolerance)
    }

    /// Build a pipeline that simplifies with the geo crate's segment-distance RDP
    pub fn build_geo(tolerance: f64) -> Pipeline {
        Self::new()
            .set_simplifier(GeoSimplifier)
            .with_simplification(tolerance)
            .build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryMask, MaskTransform};

    #[test]
    fn test_defaults() {
        let pipeline = PipelineBuilder::new().build();
        assert_eq!(pipeline.tolerance(), DEFAULT_TOLERANCE);
        assert!(pipeline.info().contains("tolerance 2"));
    }

    #[test]
    fn test_min_points_override_keeps_small_blobs() {
        let mut mask = BinaryMask::new(10, 10);
        mask.fill_rect(2, 2, 4, 4);

        let strict = PipelineBuilder::new().build();
        assert!(strict.extract(&mask, &MaskTransform::identity()).polygon.is_empty());

        let lenient = PipelineBuilder::new()
            .with_min_contour_points(3)
            .with_simplification(0.5)
            .build();
        assert!(lenient.extract(&mask, &MaskTransform::identity()).is_valid());
    }

    #[test]
    fn test_geo_pipeline_outlines_rectangle() {
        let mut mask = BinaryMask::new(50, 50);
        mask.fill_rect(5, 5, 40, 30);
        let outline = PipelineBuilder::build_geo(1.0).extract(&mask, &MaskTransform::identity());
        assert!(outline.polygon.len() >= 4);
    }
}
