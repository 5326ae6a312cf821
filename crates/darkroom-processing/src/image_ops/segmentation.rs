use crate::error::TransformError;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Color distance below which a pixel counts as background.
const BACKGROUND_TOLERANCE: f32 = 32.0;
/// Width of the linear alpha ramp above the tolerance. Pixels further than
/// `BACKGROUND_TOLERANCE + FEATHER_BAND` from the background color keep full
/// opacity.
const FEATHER_BAND: f32 = 24.0;
/// Border colors are bucketed to this many levels per channel when voting
/// for the dominant background color.
const QUANT_LEVELS: u32 = 16;

/// Foreground/background segmentation.
///
/// The background color is estimated from the image border: border pixels
/// vote in a quantized color histogram and the winning bucket's mean becomes
/// the background estimate. Every pixel's alpha is then derived from its
/// distance to that color. Fully arithmetic and input-driven, so output is
/// deterministic for a given input.
pub struct BackgroundRemoval;

impl BackgroundRemoval {
    pub fn apply(img: DynamicImage) -> Result<DynamicImage, TransformError> {
        let (width, height) = img.dimensions();
        if width < 3 || height < 3 {
            return Err(TransformError::Operation {
                operation: "remove_background",
                reason: format!("image {}x{} too small to segment", width, height),
            });
        }

        let rgba = img.to_rgba8();
        let background = Self::estimate_background(&rgba);

        let mut out = RgbaImage::new(width, height);
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *pixel;
            let distance = Self::color_distance([r, g, b], background);

            let alpha = if distance <= BACKGROUND_TOLERANCE {
                0.0
            } else if distance >= BACKGROUND_TOLERANCE + FEATHER_BAND {
                1.0
            } else {
                (distance - BACKGROUND_TOLERANCE) / FEATHER_BAND
            };

            let new_a = (a as f32 * alpha).round() as u8;
            out.put_pixel(x, y, Rgba([r, g, b, new_a]));
        }

        Ok(DynamicImage::ImageRgba8(out))
    }

    /// Dominant border color: quantized histogram vote, then the mean of the
    /// winning bucket's members.
    fn estimate_background(rgba: &RgbaImage) -> [u8; 3] {
        let (width, height) = rgba.dimensions();
        let step = 256 / QUANT_LEVELS;

        let mut counts: std::collections::HashMap<(u32, u32, u32), (u64, u64, u64, u64)> =
            std::collections::HashMap::new();

        let mut tally = |pixel: &Rgba<u8>| {
            let Rgba([r, g, b, _]) = *pixel;
            let bucket = (r as u32 / step, g as u32 / step, b as u32 / step);
            let entry = counts.entry(bucket).or_insert((0, 0, 0, 0));
            entry.0 += 1;
            entry.1 += r as u64;
            entry.2 += g as u64;
            entry.3 += b as u64;
        };

        for x in 0..width {
            tally(rgba.get_pixel(x, 0));
            tally(rgba.get_pixel(x, height - 1));
        }
        for y in 1..height - 1 {
            tally(rgba.get_pixel(0, y));
            tally(rgba.get_pixel(width - 1, y));
        }

        // Ties broken by bucket key so the estimate does not depend on
        // HashMap iteration order.
        match counts
            .into_iter()
            .max_by_key(|(bucket, (count, _, _, _))| (*count, std::cmp::Reverse(*bucket)))
        {
            Some((_, (count, r_sum, g_sum, b_sum))) => [
                (r_sum / count) as u8,
                (g_sum / count) as u8,
                (b_sum / count) as u8,
            ],
            // Unreachable: the caller guarantees a border exists.
            None => [255, 255, 255],
        }
    }

    fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
        let dr = a[0] as f32 - b[0] as f32;
        let dg = a[1] as f32 - b[1] as f32;
        let db = a[2] as f32 - b[2] as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}
