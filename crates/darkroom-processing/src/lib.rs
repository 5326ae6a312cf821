//! Transform engine for the darkroom service.
//!
//! Decodes image bytes, applies a validated [`OperationSet`] in order, and
//! re-encodes with deterministic settings: the same (bytes, operations) pair
//! always produces byte-identical output. Also hosts intake validation and
//! the perceptual hash used to identify near-duplicate sources.
//!
//! [`OperationSet`]: darkroom_core::operations::OperationSet

pub mod error;
pub mod image_ops;
pub mod pipeline;
pub mod validator;

pub use error::TransformError;
pub use pipeline::{AppliedOperation, TransformOutput, TransformPipeline};
pub use validator::{ImageProbe, MediaValidator, ValidationError};
