use darkroom_core::operations::ResizeMode;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Resolve the target dimensions for validated resize parameters.
    ///
    /// In `MaintainAspectRatio` mode the given width wins: when both
    /// dimensions are supplied the height is recomputed from the source
    /// ratio, silently replacing the caller's value. With only a height
    /// given, the width is recomputed instead. `Free` mode uses both values
    /// as-is (validation guarantees both are present).
    pub fn resolve_dimensions(
        orig_width: u32,
        orig_height: u32,
        width: Option<u32>,
        height: Option<u32>,
        mode: ResizeMode,
    ) -> (u32, u32) {
        match mode {
            ResizeMode::Free => (
                width.unwrap_or(orig_width),
                height.unwrap_or(orig_height),
            ),
            ResizeMode::MaintainAspectRatio => match (width, height) {
                (Some(w), _) => {
                    let aspect_ratio = orig_height as f32 / orig_width as f32;
                    let h = (w as f32 * aspect_ratio).round() as u32;
                    (w, h.max(1))
                }
                (None, Some(h)) => {
                    let aspect_ratio = orig_width as f32 / orig_height as f32;
                    let w = (h as f32 * aspect_ratio).round() as u32;
                    (w.max(1), h)
                }
                (None, None) => (orig_width, orig_height),
            },
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Apply validated resize parameters.
    pub fn apply_resize(
        img: &DynamicImage,
        width: Option<u32>,
        height: Option<u32>,
        mode: ResizeMode,
    ) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            Self::resolve_dimensions(orig_width, orig_height, width, height, mode);

        if (target_width, target_height) == (orig_width, orig_height) {
            return img.clone();
        }

        let filter = Self::select_filter(orig_width, orig_height, target_width, target_height);
        img.resize_exact(target_width, target_height, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_resolve_free_uses_both() {
        let (w, h) = ImageResize::resolve_dimensions(100, 100, Some(50), Some(75), ResizeMode::Free);
        assert_eq!((w, h), (50, 75));
    }

    #[test]
    fn test_resolve_maintain_width_wins() {
        // 3000x2000 source, caller asks for 800x9999 maintaining aspect ratio:
        // the mismatched height is replaced by 800 * 2/3 = 533.
        let (w, h) = ImageResize::resolve_dimensions(
            3000,
            2000,
            Some(800),
            Some(9999),
            ResizeMode::MaintainAspectRatio,
        );
        assert_eq!(w, 800);
        assert_eq!(h, 533);
    }

    #[test]
    fn test_resolve_maintain_width_only() {
        let (w, h) = ImageResize::resolve_dimensions(
            3000,
            2000,
            Some(800),
            None,
            ResizeMode::MaintainAspectRatio,
        );
        assert_eq!((w, h), (800, 533));
    }

    #[test]
    fn test_resolve_maintain_height_only() {
        let (w, h) = ImageResize::resolve_dimensions(
            100,
            50,
            None,
            Some(100),
            ResizeMode::MaintainAspectRatio,
        );
        assert_eq!((w, h), (200, 100));
    }

    #[test]
    fn test_resolve_never_returns_zero() {
        // Extreme downscale of a wide strip must clamp the height to 1.
        let (_, h) = ImageResize::resolve_dimensions(
            5000,
            2,
            Some(10),
            None,
            ResizeMode::MaintainAspectRatio,
        );
        assert!(h >= 1);
    }

    #[test]
    fn test_apply_resize_exact() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255])));
        let resized = ImageResize::apply_resize(&img, Some(40), Some(30), ResizeMode::Free);
        assert_eq!(resized.dimensions(), (40, 30));
    }

    #[test]
    fn test_apply_resize_noop_when_same_size() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([1, 2, 3, 255])));
        let resized = ImageResize::apply_resize(&img, Some(64), Some(64), ResizeMode::Free);
        assert_eq!(resized.to_rgba8().as_raw(), img.to_rgba8().as_raw());
    }

    #[test]
    fn test_filter_selection_by_ratio() {
        use image::imageops::FilterType;
        assert_eq!(
            ImageResize::select_filter(1000, 1000, 100, 100),
            FilterType::Triangle
        );
        assert_eq!(
            ImageResize::select_filter(160, 160, 100, 100),
            FilterType::CatmullRom
        );
        assert_eq!(
            ImageResize::select_filter(100, 100, 100, 100),
            FilterType::Lanczos3
        );
    }
}
