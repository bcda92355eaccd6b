//! Common types and utilities shared across knotenalarm crates.
//!
//! This crate defines the error taxonomy and the observability helpers used
//! throughout the workspace. It stays dependency-light so every crate can
//! depend on it.
//!
//! # Overview
//!
//! - [`KnotenError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use knoten_common::{KnotenError, Result};
//!
//! fn fetch() -> Result<()> {
//!     Err(KnotenError::Fetch("status 500".into()))
//! }
//!
//! let err = fetch().unwrap_err();
//! assert_eq!(err.to_string(), "Fetch error: status 500");
//! assert_eq!(err.kind(), "fetch");
//! ```
pub mod observability;

/// Error types used across the knotenalarm system.
///
/// None of these are recovered locally: every variant aborts the current
/// run and is surfaced to the operator.
#[derive(thiserror::Error, Debug)]
pub enum KnotenError {
    /// Non-success HTTP status or transport failure.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Response body was not JSON of the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The social feed rejected or failed to accept a post.
    #[error("Post error: {0}")]
    Post(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KnotenError {
    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            KnotenError::Fetch(_) => "fetch",
            KnotenError::Decode(_) => "decode",
            KnotenError::Post(_) => "post",
            KnotenError::Config(_) => "config",
        }
    }
}

/// Convenient alias for results that use [`KnotenError`].
pub type Result<T> = std::result::Result<T, KnotenError>;
