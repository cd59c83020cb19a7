//! Endian-aware sequential reading over immutable byte buffers.
//!

use std::{
    fmt,
    io::{self, Read, Seek, SeekFrom},
    ops::{Deref, Range},
    sync::Arc,
};

use binrw::Endian;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// A cheaply clonable view into a shared, immutable byte buffer.
///
/// The decompressed payload of a container is allocated once; serialized files, object
/// bytes and streaming blobs are all views into it that keep it alive.
#[derive(Clone, Default)]
pub struct ByteView {
    buf: Arc<[u8]>,
    range: Range<usize>,
}

impl ByteView {
    /// Wrap a whole buffer.
    pub fn new(buf: impl Into<Arc<[u8]>>) -> Self {
        let buf = buf.into();
        let range = 0..buf.len();
        Self { buf, range }
    }

    /// A sub-view, with `range` relative to this view.
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::OutOfBounds {
                position: range.start,
                needed: range.end.saturating_sub(range.start),
                len: self.len(),
            });
        }
        Ok(Self {
            buf: self.buf.clone(),
            range: self.range.start + range.start..self.range.start + range.end,
        })
    }

    /// The bytes of this view.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.range.clone()]
    }

    /// Range of this view inside the backing buffer.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

impl Deref for ByteView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ByteView({:?}, {} bytes)", self.range, self.len())
    }
}

macro_rules! read_endian {
    ($(#[$doc:meta] $name:ident -> $ty:ty, $size:literal, $read:ident;)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.read_bytes($size)?;
                Ok(match self.endian {
                    Endian::Big => BigEndian::$read(bytes),
                    Endian::Little => LittleEndian::$read(bytes),
                })
            }
        )*
    };
}

/// Sequential reader over a byte slice with a mutable byte order.
///
/// Every read advances the position; nothing looks back implicitly. Reads that need more
/// bytes than remain fail with [`Error::OutOfBounds`] and leave the position unchanged.
///
/// ```
/// use binrw::Endian;
/// use unity_bundle::cursor::ByteCursor;
///
/// let data = [0x00, 0x00, 0x00, 0x16, 0x16, 0x00];
/// let mut cursor = ByteCursor::new(&data, Endian::Big);
/// assert_eq!(cursor.read_u32().unwrap(), 22);
///
/// cursor.set_endian(Endian::Little);
/// assert_eq!(cursor.read_u16().unwrap(), 22);
/// assert!(cursor.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at position 0.
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            position: 0,
            endian,
        }
    }

    /// Current position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes left between the position and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Whether the position has reached the end of the buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Byte order used for multi-byte reads.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order for subsequent reads.
    #[inline]
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Jump to an absolute position. Seeking past the end is allowed; the next read fails.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the position by `count` bytes.
    #[inline]
    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Round the position up to the next multiple of `size`.
    #[inline]
    pub fn align(&mut self, size: usize) {
        if size > 1 {
            self.position = self.position.div_ceil(size) * size;
        }
    }

    /// Fail with [`Error::OutOfBounds`] unless `count` more bytes can be read.
    pub fn ensure(&self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(Error::OutOfBounds {
                position: self.position,
                needed: count,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// A new cursor over `range` of the underlying data, sharing this cursor's byte order.
    pub fn sub_cursor(&self, range: Range<usize>) -> Result<ByteCursor<'a>> {
        match self.data.get(range.clone()) {
            Some(data) => Ok(ByteCursor::new(data, self.endian)),
            None => Err(Error::OutOfBounds {
                position: range.start,
                needed: range.len(),
                len: self.data.len(),
            }),
        }
    }

    /// Read a fixed number of bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read one byte as a boolean (non-zero = true).
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_u8().map(|b| b != 0)
    }

    read_endian! {
        /// Read a u16 in the current byte order.
        read_u16 -> u16, 2, read_u16;
        /// Read an i16 in the current byte order.
        read_i16 -> i16, 2, read_i16;
        /// Read a u32 in the current byte order.
        read_u32 -> u32, 4, read_u32;
        /// Read an i32 in the current byte order.
        read_i32 -> i32, 4, read_i32;
        /// Read a u64 in the current byte order.
        read_u64 -> u64, 8, read_u64;
        /// Read an i64 in the current byte order.
        read_i64 -> i64, 8, read_i64;
        /// Read an IEEE single in the current byte order.
        read_f32 -> f32, 4, read_f32;
        /// Read an IEEE double in the current byte order.
        read_f64 -> f64, 8, read_f64;
    }

    /// Read a zero-terminated UTF-8 string; the terminator is consumed.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.position.min(self.data.len())..];
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(Error::OutOfBounds {
                position: self.position,
                needed: rest.len() + 1,
                len: self.data.len(),
            });
        };
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.position += end + 1;
        Ok(text)
    }

    /// Read a string stored in exactly `count` bytes.
    pub fn read_string(&mut self, count: usize) -> Result<String> {
        self.read_bytes(count)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Read a 16-byte GUID or hash.
    pub fn read_guid(&mut self) -> Result<[u8; 16]> {
        self.read_array::<16>()
    }
}

impl Read for ByteCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.position.min(self.data.len());
        let count = buf.len().min(self.data.len() - start);
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        self.position += count;
        Ok(count)
    }
}

impl Seek for ByteCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => (self.data.len() as u64).checked_add_signed(delta),
            SeekFrom::Current(delta) => (self.position as u64).checked_add_signed(delta),
        };
        let target = target
            .and_then(|t| usize::try_from(t).ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid seek"))?;
        self.position = target;
        Ok(target as u64)
    }
}
