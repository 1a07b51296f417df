use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::{ViewTransform, polygon_area, polygon_bounds};

/// Smallest drag, in screen pixels along either axis, that commits a box.
pub const MIN_DRAG_SIZE: f64 = 5.0;

/// 2D point with floating-point coordinates.
///
/// The coordinate space (original image, letterboxed target, mask, screen) is
/// never stored; it is fixed by whoever holds the point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` until the owning image has been loaded once.
    pub fn is_unset(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle defined by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `[x, y, width, height]`, the layout used by segmentation label files.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A labelled box in original-image pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            label: label.into(),
        }
    }

    /// Build a box from a pointer drag on a rendering surface.
    ///
    /// The drag corners may come in any order. Returns `None` when the drag
    /// is smaller than [`MIN_DRAG_SIZE`] screen pixels along either axis.
    pub fn from_drag(
        start: Point,
        end: Point,
        view: &ViewTransform,
        label: impl Into<String>,
    ) -> Option<Self> {
        let screen_width = (end.x - start.x).abs();
        let screen_height = (end.y - start.y).abs();
        if screen_width < MIN_DRAG_SIZE || screen_height < MIN_DRAG_SIZE {
            return None;
        }

        let top_left = view.to_image(Point::new(start.x.min(end.x), start.y.min(end.y)));
        Some(Self::new(
            top_left.x,
            top_left.y,
            screen_width / view.scale,
            screen_height / view.scale,
            label,
        ))
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// A polygon produced from a segmentation mask, in original-image pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub label: String,
    pub polygon: Vec<Point>,
    /// Point prompts that produced the mask.
    #[serde(default)]
    pub click_points: Vec<Point>,
    /// Oracle confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
}

impl Segment {
    /// Create a segment with a fresh id, or `None` for fewer than 3 points.
    ///
    /// Bounds and area are derived from `polygon` itself so they always agree
    /// with what a consumer would recompute from the stored points.
    pub fn new(
        label: impl Into<String>,
        polygon: Vec<Point>,
        click_points: Vec<Point>,
        score: Option<f64>,
    ) -> Option<Self> {
        if polygon.len() < 3 {
            return None;
        }

        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            bounds: Some(polygon_bounds(&polygon)),
            area: Some(polygon_area(&polygon)),
            polygon,
            click_points,
            score,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Stored bounds, falling back to the polygon's own bounds.
    pub fn resolved_bounds(&self) -> Bounds {
        self.bounds.unwrap_or_else(|| polygon_bounds(&self.polygon))
    }

    /// Stored area, falling back to the shoelace area of the polygon.
    pub fn resolved_area(&self) -> f64 {
        self.area.unwrap_or_else(|| polygon_area(&self.polygon))
    }

    pub fn confidence(&self) -> f64 {
        self.score.unwrap_or(1.0)
    }

    /// Copy with a new id and timestamp.
    pub fn duplicate(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            ..self.clone()
        }
    }
}

/// An owned annotation of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    BoundingBox(BoundingBox),
    Polygon(Segment),
}

impl Annotation {
    pub fn label(&self) -> &str {
        match self {
            Annotation::BoundingBox(bbox) => &bbox.label,
            Annotation::Polygon(segment) => &segment.label,
        }
    }
}

/// Borrowed view over one annotation of an [`ImageAnnotation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationRef<'a> {
    BoundingBox(&'a BoundingBox),
    Polygon(&'a Segment),
}

impl<'a> AnnotationRef<'a> {
    pub fn label(&self) -> &'a str {
        match self {
            AnnotationRef::BoundingBox(bbox) => &bbox.label,
            AnnotationRef::Polygon(segment) => &segment.label,
        }
    }
}

/// Every annotation drawn on one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotation {
    /// Set once, when the image is first loaded.
    #[serde(default)]
    pub original_size: ImageSize,
    #[serde(default)]
    pub boxes: Vec<BoundingBox>,
    #[serde(default)]
    pub polygons: Vec<Segment>,
}

impl ImageAnnotation {
    /// Boxes first, then polygons, each in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = AnnotationRef<'_>> {
        self.boxes
            .iter()
            .map(AnnotationRef::BoundingBox)
            .chain(self.polygons.iter().map(AnnotationRef::Polygon))
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.boxes.len() + self.polygons.len()
    }
}
