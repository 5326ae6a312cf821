use std::path::Path;

/// Intake validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid image data: {0}")]
    InvalidImageData(String),
}

/// Image intake validator
///
/// Validates size, extension, and declared content type against the
/// configured allowlists, without coupling to storage details.
pub struct MediaValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate that the actual bytes match an allowed format. Declared
    /// content types and extensions are easy to spoof; the magic bytes are
    /// the authority.
    pub fn validate_sniffed_format(&self, data: &[u8]) -> Result<String, ValidationError> {
        let sniffed = ImageProbe::sniff_content_type(data)?;
        self.validate_content_type(&sniffed)?;
        Ok(sniffed)
    }
}

/// Decode-level checks on raw bytes.
pub struct ImageProbe;

impl ImageProbe {
    /// Content type derived from the magic bytes.
    pub fn sniff_content_type(data: &[u8]) -> Result<String, ValidationError> {
        let format = image::guess_format(data)
            .map_err(|e| ValidationError::InvalidImageData(e.to_string()))?;
        Ok(crate::pipeline::format_content_type(format).to_string())
    }

    /// Confirm the bytes decode and return (width, height).
    pub fn dimensions(data: &[u8]) -> Result<(u32, u32), ValidationError> {
        image::ImageReader::new(std::io::Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ValidationError::InvalidImageData(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ValidationError::InvalidImageData(e.to_string()))
    }

    /// Full decode plus perceptual hash, for intake metadata.
    /// Returns ((width, height), dhash hex).
    pub fn probe(data: &[u8]) -> Result<((u32, u32), String), ValidationError> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| ValidationError::InvalidImageData(e.to_string()))?;
        let dimensions = image::GenericImageView::dimensions(&decoded);
        let perceptual_hash = crate::image_ops::phash::dhash_hex(&decoded);
        Ok((dimensions, perceptual_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn test_validator() -> MediaValidator {
        MediaValidator::new(
            1024 * 1024, // 1MB
            vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            vec!["image/jpeg".to_string(), "image/png".to_string()],
        )
    }

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_validate_file_size_ok() {
        let validator = test_validator();
        assert!(validator.validate_file_size(512 * 1024).is_ok());
    }

    #[test]
    fn test_validate_file_size_too_large() {
        let validator = test_validator();
        assert!(validator.validate_file_size(2 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_validate_file_size_empty() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_validate_extension_ok() {
        let validator = test_validator();
        assert!(validator.validate_extension("test.jpg").is_ok());
        assert!(validator.validate_extension("test.PNG").is_ok()); // case insensitive
    }

    #[test]
    fn test_validate_extension_invalid() {
        let validator = test_validator();
        assert!(validator.validate_extension("test.bmp").is_err());
        assert!(validator.validate_extension("noextension").is_err());
    }

    #[test]
    fn test_validate_content_type() {
        let validator = test_validator();
        assert!(validator.validate_content_type("image/jpeg").is_ok());
        assert!(validator.validate_content_type("IMAGE/PNG").is_ok()); // case insensitive
        assert!(validator.validate_content_type("image/webp").is_err());
    }

    #[test]
    fn test_sniffed_format_beats_declared_type() {
        // PNG bytes pass even though a caller might declare them as JPEG
        let validator = test_validator();
        assert_eq!(
            validator.validate_sniffed_format(&png_bytes()).unwrap(),
            "image/png"
        );
        assert!(validator.validate_sniffed_format(b"plain text").is_err());
    }

    #[test]
    fn test_probe_dimensions() {
        assert_eq!(ImageProbe::dimensions(&png_bytes()).unwrap(), (8, 8));
        assert!(ImageProbe::dimensions(b"garbage").is_err());
    }
}
