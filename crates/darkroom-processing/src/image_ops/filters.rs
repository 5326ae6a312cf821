use image::DynamicImage;

/// Pixel-level filters: grayscale and blur.
pub struct ImageFilters;

impl ImageFilters {
    /// Deterministic luminance conversion.
    pub fn apply_grayscale(img: DynamicImage) -> DynamicImage {
        img.grayscale()
    }

    /// Gaussian blur. The validated radius maps directly onto the blur sigma,
    /// so a larger radius always means stronger smoothing.
    pub fn apply_blur(img: DynamicImage, radius: u32) -> DynamicImage {
        img.blur(radius as f32)
    }
}
