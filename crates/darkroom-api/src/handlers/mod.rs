pub mod health;
pub mod transform;
pub mod transform_url;
pub mod upload;
pub mod versions;

use axum::extract::Multipart;
use bytes::Bytes;
use darkroom_core::transform_request::TransformDocument;
use darkroom_core::AppError;

/// One uploaded image part.
pub struct ImagePart {
    pub data: Bytes,
    pub filename: Option<String>,
}

/// Fields read from a transform multipart request.
pub struct TransformParts {
    pub image: ImagePart,
    pub transformations: Option<TransformDocument>,
}

/// Drain a multipart stream, keeping the `image` part and, when present, the
/// `transformations` JSON document. Unknown parts are ignored.
pub async fn read_multipart(multipart: &mut Multipart) -> Result<TransformParts, AppError> {
    let mut image: Option<ImagePart> = None;
    let mut transformations: Option<TransformDocument> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart request: {}", e)))?
    {
        match field.name() {
            Some("image") => {
                let filename = field.file_name().map(|name| name.to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read image part: {}", e))
                })?;
                image = Some(ImagePart { data, filename });
            }
            Some("transformations") => {
                let text = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read transformations part: {}", e))
                })?;
                let document: TransformDocument = serde_json::from_str(&text).map_err(|e| {
                    AppError::InvalidInput(format!("Invalid transformations document: {}", e))
                })?;
                transformations = Some(document);
            }
            _ => {}
        }
    }

    let image = image
        .ok_or_else(|| AppError::InvalidInput("No image part in the request".to_string()))?;

    Ok(TransformParts {
        image,
        transformations,
    })
}
