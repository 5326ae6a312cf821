//! Wire-format transformation document.
//!
//! Callers describe the requested operations with a structured document:
//!
//! ```json
//! {
//!   "grayscale": true,
//!   "blur": {"apply": true, "radius": 5},
//!   "rotate": {"apply": true, "angle": 90},
//!   "resize": {"apply": true, "width": 800, "height": 0, "type": "maintain_aspect_ratio"},
//!   "remove_background": false
//! }
//! ```
//!
//! The document is converted into a validated [`OperationSet`] before it
//! reaches the fingerprint engine or the transform pipeline. The document's
//! field order fixes the execution order: grayscale, blur, rotate, resize,
//! remove_background. A zero width or height means "unspecified".

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::operations::{OperationSet, OperationSpec, ResizeMode, RotationAngle};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BlurRequest {
    #[serde(default)]
    pub apply: bool,
    #[serde(default)]
    pub radius: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RotateRequest {
    #[serde(default)]
    pub apply: bool,
    #[serde(default)]
    pub angle: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResizeRequest {
    #[serde(default)]
    pub apply: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(rename = "type", default)]
    pub mode: ResizeMode,
}

/// The full transformation document as accepted on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransformDocument {
    #[serde(default)]
    pub grayscale: bool,
    #[serde(default)]
    pub blur: Option<BlurRequest>,
    #[serde(default)]
    pub rotate: Option<RotateRequest>,
    #[serde(default)]
    pub resize: Option<ResizeRequest>,
    #[serde(default)]
    pub remove_background: bool,
}

impl TransformDocument {
    /// Convert into a validated operation set.
    ///
    /// Sub-documents with `apply: false` (or absent) contribute nothing;
    /// their parameters are not inspected. Rejects documents that request no
    /// operation at all, and any out-of-range parameter.
    pub fn into_operation_set(self) -> Result<OperationSet, AppError> {
        let mut ops = Vec::new();

        if self.grayscale {
            ops.push(OperationSpec::Grayscale);
        }

        if let Some(blur) = self.blur {
            if blur.apply {
                ops.push(OperationSpec::Blur {
                    radius: blur.radius,
                });
            }
        }

        if let Some(rotate) = self.rotate {
            if rotate.apply {
                let angle =
                    RotationAngle::try_from(rotate.angle).map_err(AppError::InvalidInput)?;
                ops.push(OperationSpec::Rotate { angle });
            }
        }

        if let Some(resize) = self.resize {
            if resize.apply {
                ops.push(OperationSpec::Resize {
                    width: (resize.width > 0).then_some(resize.width),
                    height: (resize.height > 0).then_some(resize.height),
                    mode: resize.mode,
                });
            }
        }

        if self.remove_background {
            ops.push(OperationSpec::RemoveBackground);
        }

        OperationSet::new(ops)
    }
}
