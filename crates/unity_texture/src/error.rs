//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`unity_bundle::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bundle(#[from] unity_bundle::error::Error),

    /// No decoder is registered for the texture's pixel format
    #[error("Unsupported pixel format {0}")]
    UnsupportedPixelFormat(i32),

    /// A field a texture needs is absent from the decoded object
    #[error("Texture field {0} is missing")]
    MissingField(&'static str),

    /// A texture field holds a value of the wrong kind or range
    #[error("Texture field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The pixel data is shorter than its format and dimensions require
    #[error("Image data holds {actual} bytes, {expected} are required")]
    TruncatedImage { expected: usize, actual: usize },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
