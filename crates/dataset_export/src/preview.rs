//! Validation preview: the exported image with every annotation drawn where
//! the written labels say it is.

use std::{fmt::Write as _, io::Cursor, path::Path};

use annokit_common::{ClassList, ImageAnnotation, ImageSize, Letterbox, Point, ViewTransform};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};

use crate::{
    config::{ExportConfig, ExportFormat},
    error::Result,
    filters::prepare_image,
};

const STROKE_WIDTH: u32 = 2;
const FONT_SIZE: u32 = 14;

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Rect {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    Polygon { points: Vec<(i64, i64)> },
}

impl OverlayShape {
    /// Top-left corner, where the label is anchored.
    fn anchor(&self) -> (i64, i64) {
        match self {
            OverlayShape::Rect { x, y, .. } => (*x, *y),
            OverlayShape::Polygon { points } => (
                points.iter().map(|p| p.0).min().unwrap_or(0),
                points.iter().map(|p| p.1).min().unwrap_or(0),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub shape: OverlayShape,
    pub label: String,
    pub color: [u8; 3],
}

/// Annotations in output-canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOverlay {
    pub width: u32,
    pub height: u32,
    pub items: Vec<OverlayItem>,
}

fn round_point(transform: &ViewTransform, point: Point) -> (i64, i64) {
    let p = transform.to_screen(point);
    (p.x.round() as i64, p.y.round() as i64)
}

impl PreviewOverlay {
    /// Place every annotation with the transform export uses for `config.format`.
    ///
    /// Detection letterboxes into the target square; segmentation keeps the
    /// original pixels.
    pub fn build(record: &ImageAnnotation, image_size: ImageSize, config: &ExportConfig) -> Self {
        let classes = ClassList::from_names(&config.class_list);
        let (width, height, transform) = match config.format {
            ExportFormat::Detection => {
                let letterbox = Letterbox::for_size(image_size, config.resolved_target_size());
                (letterbox.target_size, letterbox.target_size, letterbox.view_transform())
            }
            ExportFormat::Segmentation => {
                (image_size.width, image_size.height, ViewTransform::identity())
            }
        };

        let boxes = record.boxes.iter().map(|bbox| OverlayItem {
            shape: OverlayShape::Rect {
                x: (bbox.x * transform.scale + transform.origin.x).round() as i64,
                y: (bbox.y * transform.scale + transform.origin.y).round() as i64,
                width: (bbox.width * transform.scale).round() as i64,
                height: (bbox.height * transform.scale).round() as i64,
            },
            label: bbox.label.clone(),
            color: classes.color_for(&bbox.label),
        });
        let polygons = record.polygons.iter().map(|segment| OverlayItem {
            shape: OverlayShape::Polygon {
                points: segment
                    .polygon
                    .iter()
                    .map(|&p| round_point(&transform, p))
                    .collect(),
            },
            label: segment.label.clone(),
            color: classes.color_for(&segment.label),
        });

        Self {
            width,
            height,
            items: boxes.chain(polygons).collect(),
        }
    }

    /// Standalone SVG document of the overlay.
    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n",
            self.width, self.height
        );
        for item in &self.items {
            let [r, g, b] = item.color;
            let stroke = format!("#{r:02x}{g:02x}{b:02x}");
            let _ = match &item.shape {
                OverlayShape::Rect { x, y, width, height } => writeln!(
                    svg,
                    "  <rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{STROKE_WIDTH}\"/>"
                ),
                OverlayShape::Polygon { points } => {
                    let points = points
                        .iter()
                        .map(|(x, y)| format!("{x},{y}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    writeln!(
                        svg,
                        "  <polygon points=\"{points}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{STROKE_WIDTH}\"/>"
                    )
                }
            };
            let (x, y) = item.shape.anchor();
            let _ = writeln!(
                svg,
                "  <text x=\"{x}\" y=\"{}\" fill=\"{stroke}\" font-size=\"{FONT_SIZE}\" font-family=\"Arial\">{}</text>",
                y - 5,
                sanitize_label(&item.label)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Stroke every shape onto `canvas`.
    pub fn draw(&self, canvas: &mut RgbImage) {
        for item in &self.items {
            let color = Rgb(item.color);
            match &item.shape {
                OverlayShape::Rect { x, y, width, height } => {
                    for inset in 0..STROKE_WIDTH as i64 {
                        let (w, h) = (width - 2 * inset, height - 2 * inset);
                        if w <= 0 || h <= 0 {
                            break;
                        }
                        let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
                            .of_size(w as u32, h as u32);
                        draw_hollow_rect_mut(canvas, rect, color);
                    }
                }
                OverlayShape::Polygon { points } => {
                    if points.len() < 2 {
                        continue;
                    }
                    let closing = points.iter().zip(points.iter().cycle().skip(1));
                    for (start, end) in closing {
                        draw_line_segment_mut(
                            canvas,
                            (start.0 as f32, start.1 as f32),
                            (end.0 as f32, end.1 as f32),
                            color,
                        );
                    }
                }
            }
        }
    }
}

/// Labels go into markup verbatim, minus the characters that could break it.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '&' | '\'' | '"'))
        .collect()
}

/// The image exactly as export writes it, with the overlay drawn on top.
pub fn render_preview(
    source: &Path,
    record: &ImageAnnotation,
    config: &ExportConfig,
) -> Result<(RgbImage, PreviewOverlay)> {
    config.validate()?;
    let image = image::open(source)?;
    let size = if record.original_size.is_unset() {
        ImageSize::new(image.width(), image.height())
    } else {
        record.original_size
    };

    let mut canvas = match config.format {
        ExportFormat::Detection => {
            prepare_image(&image, &config.filters, config.resolved_target_size()).0
        }
        ExportFormat::Segmentation => image.to_rgb8(),
    };
    let overlay = PreviewOverlay::build(record, size, config);
    overlay.draw(&mut canvas);
    Ok((canvas, overlay))
}

/// [`render_preview`] encoded as PNG.
pub fn render_preview_png(
    source: &Path,
    record: &ImageAnnotation,
    config: &ExportConfig,
) -> Result<Vec<u8>> {
    let (canvas, _) = render_preview(source, record, config)?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use annokit_common::{BoundingBox, Segment};

    use super::*;

    fn record() -> ImageAnnotation {
        ImageAnnotation {
            original_size: ImageSize::new(1280, 720),
            boxes: vec![BoundingBox::new(100.0, 100.0, 200.0, 100.0, "<cat>")],
            polygons: vec![
                Segment::new(
                    "dog",
                    vec![
                        Point::new(0.0, 0.0),
                        Point::new(100.0, 0.0),
                        Point::new(100.0, 50.0),
                    ],
                    vec![],
                    None,
                )
                .unwrap(),
            ],
        }
    }

    #[test]
    fn test_detection_overlay_uses_letterbox() {
        let overlay = PreviewOverlay::build(&record(), ImageSize::new(1280, 720), &ExportConfig::default());

        assert_eq!((overlay.width, overlay.height), (640, 640));
        assert_eq!(
            overlay.items[0].shape,
            OverlayShape::Rect {
                x: 50,
                y: 190,
                width: 100,
                height: 50
            }
        );
        assert_eq!(
            overlay.items[1].shape,
            OverlayShape::Polygon {
                points: vec![(0, 140), (50, 140), (50, 165)]
            }
        );
    }

    #[test]
    fn test_segmentation_overlay_keeps_original_pixels() {
        let config = ExportConfig {
            format: ExportFormat::Segmentation,
            ..ExportConfig::default()
        };
        let overlay = PreviewOverlay::build(&record(), ImageSize::new(1280, 720), &config);

        assert_eq!((overlay.width, overlay.height), (1280, 720));
        assert_eq!(
            overlay.items[0].shape,
            OverlayShape::Rect {
                x: 100,
                y: 100,
                width: 200,
                height: 100
            }
        );
    }

    #[test]
    fn test_svg_strips_markup_from_labels() {
        let overlay = PreviewOverlay::build(&record(), ImageSize::new(1280, 720), &ExportConfig::default());
        let svg = overlay.to_svg();

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"640\" height=\"640\">"));
        assert!(svg.contains("<rect x=\"50\" y=\"190\" width=\"100\" height=\"50\""));
        assert!(svg.contains("<text x=\"50\" y=\"185\""));
        assert!(svg.contains(">cat</text>"));
        assert!(svg.contains("<polygon points=\"0,140 50,140 50,165\""));
        assert_eq!(sanitize_label("a&b'\"<c>"), "abc");
    }

    #[test]
    fn test_draw_strokes_rect_edges() {
        let overlay = PreviewOverlay {
            width: 20,
            height: 20,
            items: vec![OverlayItem {
                shape: OverlayShape::Rect {
                    x: 2,
                    y: 2,
                    width: 10,
                    height: 10,
                },
                label: "a".into(),
                color: [0, 255, 0],
            }],
        };
        let mut canvas = RgbImage::new(20, 20);
        overlay.draw(&mut canvas);

        assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(3, 3), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(6, 6), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(11, 11), &Rgb([0, 255, 0]));
    }
}
