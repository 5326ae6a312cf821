use darkroom_core::operations::RotationAngle;
use image::DynamicImage;

/// Quarter-turn rotations.
pub struct ImageRotation;

impl ImageRotation {
    /// Rotate clockwise by the given quarter turn. 90 and 270 degree
    /// rotations swap the output dimensions.
    pub fn rotate(img: DynamicImage, angle: RotationAngle) -> DynamicImage {
        match angle {
            RotationAngle::Deg90 => img.rotate90(),
            RotationAngle::Deg180 => img.rotate180(),
            RotationAngle::Deg270 => img.rotate270(),
        }
    }
}
