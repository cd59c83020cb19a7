//! Uncompressed pixel formats.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use unity_bundle::Endian;

use crate::{error::Result, image::RgbaImage, texture::Texture2D};

/// Three bytes per pixel, made opaque.
pub fn decode_rgb24(texture: &Texture2D) -> Result<RgbaImage> {
    let data = texture.pixel_data(3)?;

    let pixels = data
        .chunks_exact(3)
        .flat_map(|p| [p[0], p[1], p[2], 0xff])
        .collect();

    Ok(RgbaImage::new(texture.width, texture.height, pixels))
}

/// Already four bytes per pixel; trailing mip levels are left out.
pub fn decode_rgba32(texture: &Texture2D) -> Result<RgbaImage> {
    let data = texture.pixel_data(4)?;

    Ok(RgbaImage::new(texture.width, texture.height, data.to_vec()))
}

/// 5-6-5 bit words, made opaque.
pub fn decode_rgb565(texture: &Texture2D) -> Result<RgbaImage> {
    decode_words(texture, |c| {
        [
            ((c & 0xf800) >> 8) as u8,
            ((c & 0x07e0) >> 3) as u8,
            ((c & 0x001f) << 3) as u8,
            0xff,
        ]
    })
}

/// 4-4-4-4 bit words.
pub fn decode_rgba4444(texture: &Texture2D) -> Result<RgbaImage> {
    decode_words(texture, |c| {
        [
            ((c & 0xf000) >> 8) as u8,
            ((c & 0x0f00) >> 4) as u8,
            (c & 0x00f0) as u8,
            ((c & 0x000f) << 4) as u8,
        ]
    })
}

fn decode_words(texture: &Texture2D, pixel: impl Fn(u16) -> [u8; 4]) -> Result<RgbaImage> {
    let data = texture.pixel_data(2)?;

    let read: fn(&[u8]) -> u16 = match texture.endian {
        Endian::Big => BigEndian::read_u16,
        Endian::Little => LittleEndian::read_u16,
    };
    let pixels = data
        .chunks_exact(2)
        .flat_map(|word| pixel(read(word)))
        .collect();

    Ok(RgbaImage::new(texture.width, texture.height, pixels))
}
