use annokit_common::Letterbox;
use image::{
    DynamicImage, Rgb, RgbImage,
    imageops::{self, FilterType},
};
use imageproc::filter::gaussian_blur_f32;

use crate::config::ImageFilters;

fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Apply the pre-resize adjustments in a fixed order: brightness and
/// saturation, exposure, grayscale, blur.
pub fn apply_filters(image: &DynamicImage, filters: &ImageFilters) -> RgbImage {
    let mut rgb = image.to_rgb8();
    if filters.is_identity() {
        return rgb;
    }

    let modulate = filters.brightness != 1.0 || filters.saturation != 1.0;
    let expose = filters.exposure != 1.0;

    if modulate || expose || filters.grayscale {
        for pixel in rgb.pixels_mut() {
            let [mut r, mut g, mut b] = pixel.0.map(f32::from);

            if modulate {
                let gray = luma(r, g, b);
                r = (gray + (r - gray) * filters.saturation) * filters.brightness;
                g = (gray + (g - gray) * filters.saturation) * filters.brightness;
                b = (gray + (b - gray) * filters.saturation) * filters.brightness;
            }
            if expose {
                r *= filters.exposure;
                g *= filters.exposure;
                b *= filters.exposure;
            }
            if filters.grayscale {
                let gray = luma(r, g, b);
                (r, g, b) = (gray, gray, gray);
            }

            *pixel = Rgb([to_u8(r), to_u8(g), to_u8(b)]);
        }
    }

    if filters.blur > 0.0 {
        rgb = gaussian_blur_f32(&rgb, filters.blur);
    }
    rgb
}

/// Scale into the letterbox placement and pad the rest of the square with black.
pub fn letterbox_image(image: &RgbImage, letterbox: &Letterbox) -> RgbImage {
    let size = letterbox.target_size;
    let mut canvas = RgbImage::new(size, size);
    if letterbox.new_width == 0 || letterbox.new_height == 0 {
        return canvas;
    }

    let resized = imageops::resize(
        image,
        letterbox.new_width,
        letterbox.new_height,
        FilterType::Lanczos3,
    );
    imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.offset_x as i64,
        letterbox.offset_y as i64,
    );
    canvas
}

/// Filters then letterbox, exactly as detection export writes images.
pub fn prepare_image(image: &DynamicImage, filters: &ImageFilters, target_size: u32) -> (RgbImage, Letterbox) {
    let letterbox = Letterbox::compute(image.width(), image.height(), target_size);
    let filtered = apply_filters(image, filters);
    (letterbox_image(&filtered, &letterbox), letterbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_identity_filters_keep_pixels() {
        let image = solid(4, 4, [10, 200, 30]);
        let out = apply_filters(&image, &ImageFilters::default());
        assert_eq!(out.get_pixel(0, 0), &Rgb([10, 200, 30]));
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let filters = ImageFilters {
            grayscale: true,
            ..ImageFilters::default()
        };
        let out = apply_filters(&solid(2, 2, [255, 0, 0]), &filters);
        let Rgb([r, g, b]) = *out.get_pixel(1, 1);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 54);
    }

    #[test]
    fn test_brightness_and_exposure_scale() {
        let filters = ImageFilters {
            brightness: 0.5,
            exposure: 2.0,
            ..ImageFilters::default()
        };
        let out = apply_filters(&solid(1, 1, [100, 100, 100]), &filters);
        assert_eq!(out.get_pixel(0, 0), &Rgb([100, 100, 100]));

        let bright = ImageFilters {
            exposure: 3.0,
            ..ImageFilters::default()
        };
        let out = apply_filters(&solid(1, 1, [100, 50, 0]), &bright);
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 150, 0]));
    }

    #[test]
    fn test_zero_saturation_removes_colour() {
        let filters = ImageFilters {
            saturation: 0.0,
            ..ImageFilters::default()
        };
        let out = apply_filters(&solid(1, 1, [0, 0, 255]), &filters);
        let Rgb([r, g, b]) = *out.get_pixel(0, 0);
        assert_eq!((r, g), (g, b));
    }

    #[test]
    fn test_letterbox_pads_with_black() {
        let image = solid(200, 100, [255, 255, 255]);
        let (out, letterbox) = prepare_image(&image, &ImageFilters::default(), 64);

        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!((letterbox.new_width, letterbox.new_height), (64, 32));
        assert_eq!(letterbox.offset_y, 16);
        assert_eq!(out.get_pixel(32, 2), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(32, 32), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(32, 62), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let filters = ImageFilters {
            blur: 1.5,
            ..ImageFilters::default()
        };
        let out = apply_filters(&solid(9, 7, [40, 40, 40]), &filters);
        assert_eq!(out.dimensions(), (9, 7));
    }
}
