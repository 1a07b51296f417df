//! # Mask Outline Extraction
//!
//! Turns a segmentation mask into a single, minimal polygon.
//!
//! The [`Pipeline`] runs four stages, each behind a trait so it can be
//! swapped:
//!
//! - [`MaskBinarizer`]: oracle scores to a 0/1 grid
//! - [`ContourExtractor`]: boundary pixels to ordered walks
//! - [`ShapeSimplifier`]: vertex reduction of the largest walk
//! - [`MaskTransform`]: mask space back to original-image pixels
//!
//! ## Quick Start
//!
//! ```rust
//! use mask::{BinaryMask, MaskTransform, Pipeline};
//!
//! let mut mask = BinaryMask::new(64, 64);
//! mask.fill_rect(8, 8, 40, 30);
//!
//! let outline = Pipeline::default().extract(&mask, &MaskTransform::identity());
//! assert_eq!(outline.polygon.len(), 4);
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust
//! use mask::{Pipeline, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .set_binarizer(ThresholdBinarizer { threshold: 0.5 })
//!     .with_min_contour_points(20)
//!     .with_simplification(1.5)
//!     .build();
//! ```

pub mod algorithms;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use algorithms::*;
pub use error::{MaskError, Result};
pub use pipeline::{DEFAULT_TOLERANCE, Pipeline, builder::PipelineBuilder};
pub use traits::*;
pub use types::{BinaryMask, Contour, MaskOutline, MaskTransform, ProbabilityMask};
