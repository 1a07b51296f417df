use annokit_common::{ImageSize, Letterbox, Point};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{MaskError, Result};

/// An ordered run of boundary pixels, in mask space.
pub type Contour = Vec<Point>;

fn check_len(width: u32, height: u32, actual: usize) -> Result<()> {
    let expected = width as usize * height as usize;
    if expected != actual {
        return Err(MaskError::DimensionMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Raw per-pixel scores as returned by a segmentation oracle (row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ProbabilityMask {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        check_len(width, height, values.len())?;
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }
}

/// Foreground/background grid, row-major, one byte per pixel holding 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap raw bytes; any non-zero byte is foreground.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_len(width, height, data.len())?;
        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Foreground where the grey value is strictly above `threshold`.
    pub fn from_gray(image: &GrayImage, threshold: u8) -> Self {
        let data = image.pixels().map(|p| u8::from(p[0] > threshold)).collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    /// Load a mask image from file, thresholding its luma channel.
    pub fn open(path: impl AsRef<std::path::Path>, threshold: u8) -> Result<Self> {
        let image = image::open(path)?.to_luma8();
        Ok(Self::from_gray(&image, threshold))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Foreground test that treats everything outside the grid as background.
    pub fn is_foreground(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[self.index(x as u32, y as u32)] == 1
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.data[idx] = u8::from(foreground);
        }
    }

    /// Mark every pixel of the inclusive rectangle as foreground.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, true);
            }
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == 1).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.contains(&1)
    }

    /// A foreground pixel on the grid edge or with a 4-connected background neighbour.
    pub fn is_boundary(&self, x: i64, y: i64) -> bool {
        if !self.is_foreground(x, y) {
            return false;
        }
        x == 0
            || y == 0
            || x == self.width as i64 - 1
            || y == self.height as i64 - 1
            || !self.is_foreground(x - 1, y)
            || !self.is_foreground(x + 1, y)
            || !self.is_foreground(x, y - 1)
            || !self.is_foreground(x, y + 1)
    }
}

/// Affine map from mask space to original-image space, `p * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl MaskTransform {
    pub fn identity() -> Self {
        Self::scaled(1.0, 1.0)
    }

    pub fn scaled(scale_x: f64, scale_y: f64) -> Self {
        Self {
            scale_x,
            scale_y,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Stretch a mask covering the whole image onto the original size.
    pub fn from_sizes(mask: ImageSize, original: ImageSize) -> Self {
        if mask.is_unset() {
            return Self::identity();
        }
        Self::scaled(
            original.width as f64 / mask.width as f64,
            original.height as f64 / mask.height as f64,
        )
    }

    /// Undo a letterbox: the mask lives on the square target canvas.
    pub fn from_letterbox(letterbox: &Letterbox) -> Self {
        if letterbox.scale == 0.0 {
            return Self::identity();
        }
        let inverse = 1.0 / letterbox.scale;
        Self {
            scale_x: inverse,
            scale_y: inverse,
            offset_x: -(letterbox.offset_x as f64) * inverse,
            offset_y: -(letterbox.offset_y as f64) * inverse,
        }
    }

    /// Map and round to the nearest whole pixel.
    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            (point.x * self.scale_x + self.offset_x).round(),
            (point.y * self.scale_y + self.offset_y).round(),
        )
    }
}

impl Default for MaskTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Result of running a mask through the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskOutline {
    /// Simplified polygon in original-image space; empty when nothing was found.
    pub polygon: Vec<Point>,
    /// Contours that survived the minimum-length filter.
    pub contours_found: usize,
    /// Length of the chosen contour before simplification.
    pub traced_points: usize,
    pub mask_width: u32,
    pub mask_height: u32,
}

impl MaskOutline {
    /// At least three vertices, i.e. usable as a segment.
    pub fn is_valid(&self) -> bool {
        self.polygon.len() >= 3
    }
}
