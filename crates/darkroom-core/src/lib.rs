//! Core types for the darkroom image processing service.
//!
//! This crate owns the data model (source images, operation sets, processed
//! versions), the fingerprint engine, the unified `AppError` type, and the
//! environment-driven configuration. It performs no I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod operations;
pub mod transform_request;

pub use config::{AuthFallbackMode, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use fingerprint::{content_hash, Fingerprint};
