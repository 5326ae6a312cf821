//! Typed transformation operations.
//!
//! The loosely-typed transformation document accepted on the wire is converted
//! into an [`OperationSet`] at the boundary (see `transform_request`). From
//! that point on, every parameter has already been range-validated and the
//! operation order is fixed, so the fingerprint engine and the transform
//! pipeline never see malformed input.

use serde::{Deserialize, Serialize};

use crate::constants::{BLUR_RADIUS_MAX, BLUR_RADIUS_MIN, RESIZE_DIM_MAX, RESIZE_DIM_MIN};
use crate::error::AppError;

/// Resize behavior when both target dimensions are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Preserve the source aspect ratio. When both dimensions are given the
    /// width wins and the height is recomputed from the source ratio.
    MaintainAspectRatio,
    /// Resize to exactly the requested dimensions.
    Free,
}

impl Default for ResizeMode {
    fn default() -> Self {
        ResizeMode::MaintainAspectRatio
    }
}

/// Rotation is constrained to quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RotationAngle {
    Deg90,
    Deg180,
    Deg270,
}

impl RotationAngle {
    pub fn degrees(self) -> u16 {
        match self {
            RotationAngle::Deg90 => 90,
            RotationAngle::Deg180 => 180,
            RotationAngle::Deg270 => 270,
        }
    }

    /// 90 and 270 degree rotations swap output dimensions.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, RotationAngle::Deg90 | RotationAngle::Deg270)
    }
}

impl TryFrom<u16> for RotationAngle {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            90 => Ok(RotationAngle::Deg90),
            180 => Ok(RotationAngle::Deg180),
            270 => Ok(RotationAngle::Deg270),
            other => Err(format!(
                "Invalid rotation angle {}: must be one of 90, 180, 270",
                other
            )),
        }
    }
}

impl From<RotationAngle> for u16 {
    fn from(angle: RotationAngle) -> u16 {
        angle.degrees()
    }
}

/// A single named transformation with its validated parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationSpec {
    Grayscale,
    Blur {
        radius: u32,
    },
    Rotate {
        angle: RotationAngle,
    },
    Resize {
        width: Option<u32>,
        height: Option<u32>,
        mode: ResizeMode,
    },
    RemoveBackground,
}

impl OperationSpec {
    pub fn name(&self) -> &'static str {
        match self {
            OperationSpec::Grayscale => "grayscale",
            OperationSpec::Blur { .. } => "blur",
            OperationSpec::Rotate { .. } => "rotate",
            OperationSpec::Resize { .. } => "resize",
            OperationSpec::RemoveBackground => "remove_background",
        }
    }

    /// Range-check parameters. Called from `OperationSet::new`, so an
    /// `OperationSet` that exists is always valid.
    fn validate(&self) -> Result<(), AppError> {
        match self {
            OperationSpec::Grayscale | OperationSpec::RemoveBackground => Ok(()),
            OperationSpec::Rotate { .. } => Ok(()),
            OperationSpec::Blur { radius } => {
                if !(BLUR_RADIUS_MIN..=BLUR_RADIUS_MAX).contains(radius) {
                    return Err(AppError::InvalidInput(format!(
                        "Blur radius {} out of range [{}, {}]",
                        radius, BLUR_RADIUS_MIN, BLUR_RADIUS_MAX
                    )));
                }
                Ok(())
            }
            OperationSpec::Resize {
                width,
                height,
                mode,
            } => {
                for (label, dim) in [("width", width), ("height", height)] {
                    if let Some(value) = dim {
                        if !(RESIZE_DIM_MIN..=RESIZE_DIM_MAX).contains(value) {
                            return Err(AppError::InvalidInput(format!(
                                "Resize {} {} out of range [{}, {}]",
                                label, value, RESIZE_DIM_MIN, RESIZE_DIM_MAX
                            )));
                        }
                    }
                }
                match mode {
                    ResizeMode::MaintainAspectRatio => {
                        if width.is_none() && height.is_none() {
                            return Err(AppError::InvalidInput(
                                "Resize requires at least one target dimension".to_string(),
                            ));
                        }
                    }
                    ResizeMode::Free => {
                        if width.is_none() || height.is_none() {
                            return Err(AppError::InvalidInput(
                                "Free resize requires both width and height".to_string(),
                            ));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Parameters as (key, value) pairs, sorted by key. This is the canonical
    /// representation: two specs with the same semantics always produce the
    /// same pair list regardless of how the caller spelled them.
    fn canonical_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = match self {
            OperationSpec::Grayscale | OperationSpec::RemoveBackground => Vec::new(),
            OperationSpec::Blur { radius } => vec![("radius", radius.to_string())],
            OperationSpec::Rotate { angle } => vec![("angle", angle.degrees().to_string())],
            OperationSpec::Resize {
                width,
                height,
                mode,
            } => {
                let mut p = vec![(
                    "mode",
                    match mode {
                        ResizeMode::MaintainAspectRatio => "maintain_aspect_ratio".to_string(),
                        ResizeMode::Free => "free".to_string(),
                    },
                )];
                if let Some(w) = width {
                    p.push(("width", w.to_string()));
                }
                if let Some(h) = height {
                    p.push(("height", h.to_string()));
                }
                p
            }
        };
        params.sort_by_key(|(k, _)| *k);
        params
    }

    /// Canonical form of one operation: `name(key=value,key=value)`.
    pub fn canonical(&self) -> String {
        let params = self.canonical_params();
        if params.is_empty() {
            return self.name().to_string();
        }
        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.name(), joined)
    }
}

/// An ordered, validated sequence of operations.
///
/// Ordering is significant: operations are not commutative, and two sets that
/// differ only in order fingerprint differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<OperationSpec>", into = "Vec<OperationSpec>")]
pub struct OperationSet {
    ops: Vec<OperationSpec>,
}

impl OperationSet {
    pub fn new(ops: Vec<OperationSpec>) -> Result<Self, AppError> {
        if ops.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one transformation must be requested".to_string(),
            ));
        }
        for op in &ops {
            op.validate()?;
        }
        Ok(OperationSet { ops })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OperationSpec> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Canonical form of the whole set: per-operation canonical forms joined
    /// with `|` in execution order.
    pub fn canonical(&self) -> String {
        self.ops
            .iter()
            .map(OperationSpec::canonical)
            .collect::<Vec<_>>()
            .join("|")
    }

    /// JSON representation stored alongside ledger entries.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.ops).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, AppError> {
        let ops: Vec<OperationSpec> = serde_json::from_value(value.clone())?;
        OperationSet::new(ops)
    }

    /// Whether any operation forces an alpha-capable output format.
    pub fn requires_alpha(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, OperationSpec::RemoveBackground))
    }
}

impl TryFrom<Vec<OperationSpec>> for OperationSet {
    type Error = AppError;

    fn try_from(ops: Vec<OperationSpec>) -> Result<Self, Self::Error> {
        OperationSet::new(ops)
    }
}

impl From<OperationSet> for Vec<OperationSpec> {
    fn from(set: OperationSet) -> Vec<OperationSpec> {
        set.ops
    }
}
