//! Error types for the Dreamright library.
//!
//! This crate provides the foundation error types used throughout the Dreamright
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use dreamright_error::{DreamrightResult, ConfigError};
//!
//! fn load_settings() -> DreamrightResult<String> {
//!     Err(ConfigError::new("missing model name"))?
//! }
//!
//! match load_settings() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod json;
mod storage;
mod gemini;
mod project;
mod generation;
mod error;

pub use config::ConfigError;
pub use json::JsonError;
pub use storage::{StorageError, StorageErrorKind};
pub use gemini::{GeminiError, GeminiErrorKind, RetryableError};
pub use project::{ProjectError, ProjectErrorKind};
pub use generation::{GenerationError, GenerationErrorKind, MissingDependency};
pub use error::{DreamrightError, DreamrightErrorKind, DreamrightResult};
