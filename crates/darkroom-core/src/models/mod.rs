pub mod source;
pub mod version;

pub use source::{ImageSource, NewSourceImage, SourceImage, SourceImageResponse};
pub use version::{NewProcessedVersion, ProcessedVersion, ProcessedVersionResponse};
