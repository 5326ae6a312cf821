use darkroom_core::AppError;

/// Transform pipeline errors.
///
/// A failure in any single operation aborts the whole operation set; the
/// error names the operation that failed so callers can tell a corrupt input
/// apart from an unsupported request.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Failed to decode image: {reason}")]
    Decode { reason: String },

    #[error("Operation '{operation}' failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },

    #[error("Failed to encode {format} output: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },
}

impl TransformError {
    /// Name of the pipeline stage that failed.
    pub fn operation_name(&self) -> &'static str {
        match self {
            TransformError::Decode { .. } => "decode",
            TransformError::Operation { operation, .. } => operation,
            TransformError::Encode { .. } => "encode",
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        AppError::Transform {
            operation: err.operation_name().to_string(),
            message: match &err {
                TransformError::Decode { reason } => reason.clone(),
                TransformError::Operation { reason, .. } => reason.clone(),
                TransformError::Encode { reason, .. } => reason.clone(),
            },
        }
    }
}
