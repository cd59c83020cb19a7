//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`lz4_flex::block::DecompressError`]
    #[error(transparent)]
    Decompression(#[from] lz4_flex::block::DecompressError),

    /// A read went past the end of the buffer
    #[error("read of {needed} bytes at position {position} is out of bounds (length {len})")]
    OutOfBounds {
        /// Cursor position at the time of the read
        position: usize,
        /// Number of bytes requested
        needed: usize,
        /// Total length of the buffer
        len: usize,
    },

    /// The container starts with a signature this library does not know
    #[error("unknown container signature {0:?}")]
    #[diagnostic(help("supported signatures are \"UnityFS\" and \"UnityRaw\""))]
    UnknownContainerSignature(String),

    /// The serialized file uses a format revision that is not implemented
    #[error("serialized file format version {0} is not implemented")]
    UnsupportedFormatVersion(u32),

    /// A header field repeated in the extended header disagrees with its first copy
    #[error("header field {field} is {header} but the extended header says {extended}")]
    HeaderInconsistency {
        /// Name of the duplicated field
        field: &'static str,
        /// Value from the 32-bit header
        header: u64,
        /// Value from the extended 64-bit header
        extended: u64,
    },

    /// A 64-bit size or offset does not fit in the host's address space
    #[error("value {0} exceeds the addressable range")]
    IntegerOverflow(u64),

    /// The type tree describes a layout the decoder does not handle
    #[error("unimplemented schema case: {0}")]
    UnimplementedSchemaCase(String),

    /// The class of an object carries no type tree, so the object cannot be decoded
    #[error("no type tree available for class {class_id}")]
    MissingTypeTree {
        /// Class id of the object's class entry
        class_id: i32,
    },

    /// No object with this path id exists in the serialized file
    #[error("no object with path id {0}")]
    ObjectNotFound(i64),

    /// A child node or value the decoder relies on is absent
    #[error("missing field {0}")]
    MissingField(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

/// Convert a 64-bit size or offset read from a file into a buffer index.
///
/// Anything larger than `isize::MAX` can never index a slice, so it is rejected even on
/// 64-bit hosts.
pub fn checked_usize(value: u64) -> Result<usize> {
    if value > isize::MAX as u64 {
        return Err(Error::IntegerOverflow(value));
    }
    usize::try_from(value).map_err(|_| Error::IntegerOverflow(value))
}

/// Signed variant of [`checked_usize`]; negative values are also rejected.
pub fn checked_usize_signed(value: i64) -> Result<usize> {
    u64::try_from(value)
        .map_err(|_| Error::IntegerOverflow(value as u64))
        .and_then(checked_usize)
}
