//! Pixel format dispatch.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    etc1, etc2,
    image::RgbaImage,
    rgb,
    texture::{Texture2D, TextureFormat},
};

/// Decodes the pixels of one texture format into [`RgbaImage`]
///
/// Any `Fn(&Texture2D) -> Result<RgbaImage>` is a decoder.
pub trait PixelDecoder: Send + Sync {
    fn decode(&self, texture: &Texture2D) -> Result<RgbaImage>;
}

impl<F> PixelDecoder for F
where
    F: Fn(&Texture2D) -> Result<RgbaImage> + Send + Sync,
{
    fn decode(&self, texture: &Texture2D) -> Result<RgbaImage> {
        self(texture)
    }
}

/// Pixel decoders keyed by format
///
/// The default registry knows RGB24, RGBA32, RGB565, RGBA4444, ETC1 and ETC2 RGBA8.
/// Formats without a decoder fail with [`Error::UnsupportedPixelFormat`].
pub struct TextureDecoder {
    decoders: HashMap<TextureFormat, Box<dyn PixelDecoder>>,
}

impl TextureDecoder {
    /// A registry without any decoders.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register `decoder` for `format`, returning the decoder it replaces.
    pub fn register(
        &mut self,
        format: impl Into<TextureFormat>,
        decoder: impl PixelDecoder + 'static,
    ) -> Option<Box<dyn PixelDecoder>> {
        self.decoders.insert(format.into(), Box::new(decoder))
    }

    /// Whether a decoder is registered for `format`.
    pub fn supports(&self, format: impl Into<TextureFormat>) -> bool {
        self.decoders.contains_key(&format.into())
    }

    /// Decode `texture` with the decoder registered for its format.
    #[instrument(skip_all, fields(name = %texture.name, format = %texture.format))]
    pub fn decode(&self, texture: &Texture2D) -> Result<RgbaImage> {
        let decoder = self
            .decoders
            .get(&texture.format)
            .ok_or(Error::UnsupportedPixelFormat(texture.format.0))?;

        let image = decoder.decode(texture)?;
        debug!(
            width = image.width,
            height = image.height,
            "decoded texture"
        );

        Ok(image)
    }
}

impl Default for TextureDecoder {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(TextureFormat::RGB24, rgb::decode_rgb24);
        registry.register(TextureFormat::RGBA32, rgb::decode_rgba32);
        registry.register(TextureFormat::RGB565, rgb::decode_rgb565);
        registry.register(TextureFormat::RGBA4444, rgb::decode_rgba4444);
        registry.register(TextureFormat::ETC1, etc1::decode);
        registry.register(TextureFormat::ETC2_RGBA8, etc2::decode_rgba8);
        registry
    }
}

impl fmt::Debug for TextureDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats = self.decoders.keys().collect::<Vec<_>>();
        formats.sort();
        f.debug_struct("TextureDecoder")
            .field("formats", &formats)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::decoder::TextureDecoder;
    use crate::error::{Error, Result};
    use crate::image::RgbaImage;
    use crate::texture::{Texture2D, TextureFormat};

    fn texture(format: i32, data: Vec<u8>) -> Texture2D {
        Texture2D::builder()
            .width(1)
            .height(1)
            .format(format)
            .data(data.into())
            .build()
    }

    #[test]
    fn unregistered_format_is_unsupported() {
        let result = TextureDecoder::default().decode(&texture(10, vec![0; 8]));

        assert!(matches!(result, Err(Error::UnsupportedPixelFormat(10))));
    }

    #[test]
    fn registered_decoder_replaces_builtin() -> Result<()> {
        let mut registry = TextureDecoder::default();
        let previous = registry.register(TextureFormat::RGB24, |t: &Texture2D| -> Result<RgbaImage> {
            Ok(RgbaImage::new(t.width, t.height, vec![1, 2, 3, 4]))
        });

        assert!(previous.is_some());
        assert_eq!(
            registry.decode(&texture(3, vec![9, 9, 9]))?.pixels,
            vec![1, 2, 3, 4]
        );

        Ok(())
    }

    #[test]
    fn empty_registry_supports_nothing() {
        let registry = TextureDecoder::empty();

        assert!(!registry.supports(TextureFormat::RGBA32));
        assert!(TextureDecoder::default().supports(47));
    }
}
