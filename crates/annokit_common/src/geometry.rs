//! Letterbox geometry.
//!
//! [`Letterbox`] is the only place where the scale and padding between an
//! original image and a square export canvas are computed. Export, label
//! generation and the validation preview all go through it so that what is
//! drawn and what is written can never drift apart by a rounding step.

use geo::{Area, BoundingRect};
use geo_types::{Coord, LineString, Polygon};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, Bounds, ImageSize, Point};

/// Fit-within placement of an image inside a `target_size` square canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Letterbox {
    /// Uniform scale from original to target pixels.
    pub scale: f64,
    pub new_width: u32,
    pub new_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub target_size: u32,
}

impl Letterbox {
    /// Compute scale, scaled size and centring offsets.
    ///
    /// A zero-sized original has no meaningful scale; it yields a zero-area
    /// placement centred in the canvas.
    pub fn compute(orig_width: u32, orig_height: u32, target_size: u32) -> Self {
        if orig_width == 0 || orig_height == 0 {
            return Self {
                scale: 0.0,
                new_width: 0,
                new_height: 0,
                offset_x: target_size / 2,
                offset_y: target_size / 2,
                target_size,
            };
        }

        let target = target_size as f64;
        let scale = (target / orig_width as f64).min(target / orig_height as f64);
        let new_width = ((orig_width as f64 * scale).round() as u32).min(target_size);
        let new_height = ((orig_height as f64 * scale).round() as u32).min(target_size);
        let offset_x = ((target_size - new_width) as f64 / 2.0).round() as u32;
        let offset_y = ((target_size - new_height) as f64 / 2.0).round() as u32;

        Self {
            scale,
            new_width,
            new_height,
            offset_x,
            offset_y,
            target_size,
        }
    }

    pub fn for_size(size: ImageSize, target_size: u32) -> Self {
        Self::compute(size.width, size.height, target_size)
    }

    /// Original-image point to target-canvas point.
    pub fn to_target(&self, point: Point) -> Point {
        self.view_transform().to_screen(point)
    }

    /// Target-canvas point back to original-image space.
    pub fn to_original(&self, point: Point) -> Point {
        self.view_transform().to_image(point)
    }

    /// The letterbox as a plain scale + origin affine map.
    pub fn view_transform(&self) -> ViewTransform {
        ViewTransform::new(
            self.scale,
            Point::new(self.offset_x as f64, self.offset_y as f64),
        )
    }

    /// Centre/size of `bbox` as fractions of the target canvas, each clamped to `[0, 1]`.
    pub fn normalize_box(&self, bbox: &BoundingBox) -> NormalizedBox {
        let target = self.target_size as f64;
        let center = self.to_target(bbox.center());

        NormalizedBox {
            cx: clamp_unit(center.x / target),
            cy: clamp_unit(center.y / target),
            width: clamp_unit(bbox.width * self.scale / target),
            height: clamp_unit(bbox.height * self.scale / target),
        }
    }
}

/// A box as normalized centre + size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    /// `"<class> <cx> <cy> <w> <h>"` with six decimals.
    pub fn to_label_line(&self, class_id: usize) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            class_id, self.cx, self.cy, self.width, self.height
        )
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Detection label line for one box drawn on an image of `original_size`.
pub fn to_normalized_box(
    bbox: &BoundingBox,
    original_size: ImageSize,
    target_size: u32,
    class_id: usize,
) -> String {
    Letterbox::for_size(original_size, target_size)
        .normalize_box(bbox)
        .to_label_line(class_id)
}

/// Uniform scale + origin map between a rendering surface and image space.
///
/// The caller owns the parameters (zoom level, pan position); nothing here
/// derives them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewTransform {
    pub scale: f64,
    pub origin: Point,
}

impl ViewTransform {
    pub fn new(scale: f64, origin: Point) -> Self {
        Self { scale, origin }
    }

    pub fn identity() -> Self {
        Self::new(1.0, Point::default())
    }

    pub fn to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.origin.x,
            point.y * self.scale + self.origin.y,
        )
    }

    pub fn to_image(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.origin.x) / self.scale,
            (point.y - self.origin.y) / self.scale,
        )
    }
}

fn to_line_string(points: &[Point]) -> LineString<f64> {
    points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
}

/// Shoelace area of the closed polygon through `points`.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    Polygon::new(to_line_string(points), vec![]).unsigned_area()
}

/// Axis-aligned bounds over all points; zero bounds when empty.
pub fn polygon_bounds(points: &[Point]) -> Bounds {
    to_line_string(points)
        .bounding_rect()
        .map(|rect| Bounds::new(rect.min().x, rect.min().y, rect.width(), rect.height()))
        .unwrap_or_default()
}
