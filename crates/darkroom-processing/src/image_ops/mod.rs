//! Individual image operations, one module per concern.

pub mod filters;
pub mod phash;
pub mod resize;
pub mod rotation;
pub mod segmentation;
