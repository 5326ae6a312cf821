//! Transform pipeline - ordered execution of an operation set.
//!
//! Operations execute in the order given, each consuming the previous
//! operation's output. Any single failure aborts the whole set; partial
//! results are never returned. Encoding uses fixed settings so repeated runs
//! over the same input are byte-identical.

use bytes::Bytes;
use darkroom_core::operations::{OperationSet, OperationSpec};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::TransformError;
use crate::image_ops::filters::ImageFilters;
use crate::image_ops::resize::ImageResize;
use crate::image_ops::rotation::ImageRotation;
use crate::image_ops::segmentation::BackgroundRemoval;

/// Metadata about one executed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOperation {
    pub operation: &'static str,
    /// Canonical form, e.g. `blur(radius=5)`.
    pub detail: String,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub bytes: Bytes,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
    pub applied: Vec<AppliedOperation>,
}

pub struct TransformPipeline;

impl TransformPipeline {
    /// Apply a validated operation set to raw image bytes.
    pub fn apply(data: &[u8], ops: &OperationSet) -> Result<TransformOutput, TransformError> {
        let source_format = image::guess_format(data).map_err(|e| TransformError::Decode {
            reason: format!("unrecognized image format: {}", e),
        })?;

        let mut img = image::load_from_memory(data).map_err(|e| TransformError::Decode {
            reason: e.to_string(),
        })?;

        let mut applied = Vec::with_capacity(ops.len());
        for op in ops.iter() {
            img = Self::apply_one(img, op)?;
            applied.push(AppliedOperation {
                operation: op.name(),
                detail: op.canonical(),
            });
        }

        // Format is preserved unless an operation requires transparency:
        // background removal forces an alpha-capable container.
        let output_format = if ops.requires_alpha() {
            ImageFormat::Png
        } else {
            source_format
        };

        let (width, height) = img.dimensions();
        let bytes = Self::encode(img, output_format)?;

        Ok(TransformOutput {
            bytes,
            content_type: format_content_type(output_format).to_string(),
            width,
            height,
            applied,
        })
    }

    fn apply_one(
        img: DynamicImage,
        op: &OperationSpec,
    ) -> Result<DynamicImage, TransformError> {
        tracing::debug!(operation = op.name(), "Applying operation");
        match op {
            OperationSpec::Grayscale => Ok(ImageFilters::apply_grayscale(img)),
            OperationSpec::Blur { radius } => Ok(ImageFilters::apply_blur(img, *radius)),
            OperationSpec::Rotate { angle } => Ok(ImageRotation::rotate(img, *angle)),
            OperationSpec::Resize {
                width,
                height,
                mode,
            } => Ok(ImageResize::apply_resize(&img, *width, *height, *mode)),
            OperationSpec::RemoveBackground => BackgroundRemoval::apply(img),
        }
    }

    fn encode(img: DynamicImage, format: ImageFormat) -> Result<Bytes, TransformError> {
        // JPEG has no alpha channel; flatten before encoding.
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            _ => img,
        };

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|e| TransformError::Encode {
                format: format_content_type(format),
                reason: e.to_string(),
            })?;

        Ok(Bytes::from(buffer))
    }
}

/// Content type for an output format.
pub fn format_content_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkroom_core::operations::{OperationSet, OperationSpec, ResizeMode, RotationAngle};
    use image::{Rgba, RgbaImage};

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 100, 255])
        }));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                width,
                height,
                Rgba([180, 90, 45, 255]),
            ))
            .to_rgb8(),
        );
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn ops(specs: Vec<OperationSpec>) -> OperationSet {
        OperationSet::new(specs).unwrap()
    }

    #[test]
    fn test_output_is_deterministic() {
        let data = png_fixture(40, 30);
        let set = ops(vec![
            OperationSpec::Grayscale,
            OperationSpec::Blur { radius: 3 },
        ]);
        let a = TransformPipeline::apply(&data, &set).unwrap();
        let b = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_rotate_90_swaps_output_dimensions() {
        let data = png_fixture(80, 60);
        let set = ops(vec![OperationSpec::Rotate {
            angle: RotationAngle::Deg90,
        }]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!((out.width, out.height), (60, 80));
    }

    #[test]
    fn test_resize_maintain_aspect_ratio_recomputes_height() {
        // 300x200 source, width 80 requested: height becomes 53.
        let data = png_fixture(300, 200);
        let set = ops(vec![OperationSpec::Resize {
            width: Some(80),
            height: None,
            mode: ResizeMode::MaintainAspectRatio,
        }]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!((out.width, out.height), (80, 53));
    }

    #[test]
    fn test_operations_execute_in_order() {
        // Resize then rotate: final dimensions are the resize target swapped.
        let data = png_fixture(100, 100);
        let set = ops(vec![
            OperationSpec::Resize {
                width: Some(50),
                height: Some(20),
                mode: ResizeMode::Free,
            },
            OperationSpec::Rotate {
                angle: RotationAngle::Deg90,
            },
        ]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!((out.width, out.height), (20, 50));
        assert_eq!(out.applied.len(), 2);
        assert_eq!(out.applied[0].operation, "resize");
        assert_eq!(out.applied[1].operation, "rotate");
    }

    #[test]
    fn test_format_preserved_without_alpha_ops() {
        let data = jpeg_fixture(32, 32);
        let set = ops(vec![OperationSpec::Grayscale]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!(out.content_type, "image/jpeg");
    }

    #[test]
    fn test_remove_background_forces_png() {
        let data = jpeg_fixture(32, 32);
        let set = ops(vec![OperationSpec::RemoveBackground]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!(out.content_type, "image/png");
        // The output really decodes as PNG
        assert_eq!(
            image::guess_format(&out.bytes).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_corrupt_input_reports_decode_failure() {
        let set = ops(vec![OperationSpec::Grayscale]);
        let err = TransformPipeline::apply(b"definitely not an image", &set).unwrap_err();
        assert_eq!(err.operation_name(), "decode");
    }

    #[test]
    fn test_truncated_image_aborts_whole_set() {
        let mut data = png_fixture(40, 40);
        data.truncate(data.len() / 2);
        let set = ops(vec![
            OperationSpec::Grayscale,
            OperationSpec::Blur { radius: 2 },
        ]);
        assert!(TransformPipeline::apply(&data, &set).is_err());
    }

    #[test]
    fn test_applied_metadata_carries_canonical_detail() {
        let data = png_fixture(20, 20);
        let set = ops(vec![OperationSpec::Blur { radius: 7 }]);
        let out = TransformPipeline::apply(&data, &set).unwrap();
        assert_eq!(out.applied[0].detail, "blur(radius=7)");
    }
}
