//! Block compression handling.

use std::borrow::Cow;

use tracing::{instrument, warn};

use crate::error::Result;

/// Mask selecting the compression method bits of a block or header flags word
pub const COMPRESSION_MASK: u32 = 0x3f;

/// Identifies the storage format used to compress a block inside a container
///
/// Only the low six bits of a flags word select the method; the remaining bits carry
/// unrelated block properties.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// LZ4 block format
    Lz4,

    /// LZ4 block format written by the high-compression encoder
    Lz4Hc,

    /// Any method this library does not decode; the data is passed through untouched
    Other(u32),
}

impl From<u32> for CompressionMethod {
    fn from(value: u32) -> Self {
        match value & COMPRESSION_MASK {
            0 => CompressionMethod::None,
            2 => CompressionMethod::Lz4,
            3 => CompressionMethod::Lz4Hc,
            other => CompressionMethod::Other(other),
        }
    }
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        CompressionMethod::from(value as u32)
    }
}

/// Decompress one block into a buffer of exactly `uncompressed_size` bytes.
///
/// Raw blocks are borrowed as they are. Unknown methods are logged and passed through
/// uncompressed rather than failing, since they only appear in archives this library
/// was never built for.
#[instrument(skip(data), fields(len = data.len()))]
pub fn decompress(
    data: &[u8],
    uncompressed_size: usize,
    method: CompressionMethod,
) -> Result<Cow<'_, [u8]>> {
    match method {
        CompressionMethod::None => Ok(Cow::Borrowed(data)),
        CompressionMethod::Lz4 | CompressionMethod::Lz4Hc => {
            let mut out = vec![0u8; uncompressed_size];
            let written = lz4_flex::block::decompress_into(data, &mut out)?;
            if written != uncompressed_size {
                warn!(written, uncompressed_size, "lz4 block decompressed short");
            }
            Ok(Cow::Owned(out))
        }
        CompressionMethod::Other(flag) => {
            warn!("unknown compression flag {flag:#x}, passing block through uncompressed");
            Ok(Cow::Borrowed(data))
        }
    }
}
