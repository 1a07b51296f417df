//! # Annokit Common - Shared Types and Geometry
//!
//! The data model shared by every annokit crate, plus the letterbox geometry that
//! every coordinate transform between original-image space and a square export
//! canvas goes through.
//!
//! ## Example
//!
//! ```rust
//! use annokit_common::{BoundingBox, ImageSize, Letterbox, to_normalized_box};
//!
//! let letterbox = Letterbox::compute(1280, 720, 640);
//! assert_eq!(letterbox.new_width, 640);
//! assert_eq!(letterbox.offset_y, 140);
//!
//! let bbox = BoundingBox::new(0.0, 0.0, 1280.0, 720.0, "car");
//! let line = to_normalized_box(&bbox, ImageSize::new(1280, 720), 640, 0);
//! assert_eq!(line, "0 0.500000 0.500000 1.000000 0.562500");
//! ```

pub mod classes;
pub mod geometry;
pub mod types;

// Re-exports for convenience
pub use classes::{CLASS_COLORS, ClassList};
pub use geometry::{
    Letterbox, NormalizedBox, ViewTransform, polygon_area, polygon_bounds, to_normalized_box,
};
pub use types::{
    Annotation, AnnotationRef, BoundingBox, Bounds, ImageAnnotation, ImageSize, MIN_DRAG_SIZE,
    Point, Segment,
};
