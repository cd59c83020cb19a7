//! Texture descriptions extracted from decoded objects.

use bon::Builder;
use derive_more::derive::{Display, From};
use unity_bundle::{ByteView, Endian, ObjectValue, Value, ValueNode};

use crate::{
    decoder::TextureDecoder,
    error::{Error, Result},
    image::RgbaImage,
};

/// A pixel format code as stored in `m_TextureFormat`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct TextureFormat(pub i32);

impl TextureFormat {
    pub const RGB24: Self = Self(3);
    pub const RGBA32: Self = Self(4);
    pub const RGB565: Self = Self(7);
    pub const RGBA4444: Self = Self(13);
    pub const ETC1: Self = Self(34);
    pub const ETC2_RGBA8: Self = Self(47);
}

/// Everything a pixel decoder needs to know about one texture
///
/// ```
/// use unity_texture::{Texture2D, TextureFormat};
///
/// let texture = Texture2D::builder()
///     .width(1)
///     .height(1)
///     .format(TextureFormat::RGB24)
///     .data(vec![0x10, 0x20, 0x30].into())
///     .build();
///
/// assert_eq!(texture.decode().unwrap().pixels, vec![0x10, 0x20, 0x30, 0xff]);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Texture2D {
    /// Object name, empty when the object has none
    #[builder(default, into)]
    pub name: String,

    pub width: u32,

    pub height: u32,

    #[builder(into)]
    pub format: TextureFormat,

    /// Byte order of 16-bit pixel formats
    #[builder(default = Endian::Little)]
    pub endian: Endian,

    /// Encoded pixels, either inline or resolved from a streaming blob
    pub data: ByteView,
}

impl Texture2D {
    /// Extract a texture from an annotated `Texture2D` object.
    ///
    /// Pixel words are read in the byte order the `image data` field was decoded with.
    pub fn from_object(object: &ObjectValue) -> Result<Self> {
        let endian = object
            .get("image data")
            .map_or(object.endian, |field| field.endian);

        Self::from_value(&object.value, endian)
    }

    /// Extract a texture from any decoded `Texture2D` value.
    ///
    /// When the inline `image data` is empty the pixels come from `m_StreamData`, which
    /// must already be resolved to bytes.
    pub fn from_value<N: ValueNode>(value: &Value<N>, endian: Endian) -> Result<Self> {
        let field = |name: &'static str| {
            value
                .get(name)
                .map(ValueNode::value)
                .ok_or(Error::MissingField(name))
        };
        let integer = |name: &'static str| -> Result<i64> {
            field(name)?.as_i64().ok_or_else(|| Error::InvalidField {
                field: name,
                reason: "not an integer".into(),
            })
        };
        let dimension = |name: &'static str| -> Result<u32> {
            let n = integer(name)?;
            u32::try_from(n).map_err(|_| Error::InvalidField {
                field: name,
                reason: format!("{n} is not a valid dimension"),
            })
        };

        let format = integer("m_TextureFormat")?;
        let format = i32::try_from(format).map_err(|_| Error::InvalidField {
            field: "m_TextureFormat",
            reason: format!("{format} is out of range"),
        })?;

        let inline = field("image data")?
            .as_byte_view()
            .ok_or_else(|| Error::InvalidField {
                field: "image data",
                reason: "not a byte buffer".into(),
            })?;
        let data = if inline.is_empty() {
            value
                .get("m_StreamData")
                .and_then(|n| n.value().as_byte_view())
                .unwrap_or(inline)
                .clone()
        } else {
            inline.clone()
        };

        let name = value
            .get("m_Name")
            .and_then(|n| n.value().as_str())
            .unwrap_or_default();

        Ok(Self::builder()
            .name(name)
            .width(dimension("m_Width")?)
            .height(dimension("m_Height")?)
            .format(format)
            .endian(endian)
            .data(data)
            .build())
    }

    /// Decode the pixels with the built-in decoders.
    pub fn decode(&self) -> Result<RgbaImage> {
        TextureDecoder::default().decode(self)
    }

    /// The leading pixel data of a format with `bytes_per_pixel` bytes per pixel.
    pub(crate) fn pixel_data(&self, bytes_per_pixel: u64) -> Result<&[u8]> {
        let len = u64::from(self.width)
            .saturating_mul(u64::from(self.height))
            .saturating_mul(bytes_per_pixel);
        self.bytes(len)
    }

    /// The first `len` bytes of the pixel data.
    pub(crate) fn bytes(&self, len: u64) -> Result<&[u8]> {
        usize::try_from(len)
            .ok()
            .and_then(|len| self.data.get(..len))
            .ok_or(Error::TruncatedImage {
                expected: usize::try_from(len).unwrap_or(usize::MAX),
                actual: self.data.len(),
            })
    }
}
