//! This library decodes the pixels of `Texture2D` objects unpacked by
//! [`unity_bundle`] into plain RGBA images.
//!
//! # Texture Format Documentation
//!
//! A decoded `Texture2D` object carries the fields a decoder needs:
//!
//! | Field             | Description                                                    |
//! |-------------------|----------------------------------------------------------------|
//! | `m_Name`          | Object name                                                    |
//! | `m_Width`         | Width in pixels                                                |
//! | `m_Height`        | Height in pixels                                               |
//! | `m_TextureFormat` | Pixel format code, see below                                   |
//! | `image data`      | Encoded pixels, empty when they live in a streaming blob       |
//! | `m_StreamData`    | Offset, size and path of the pixels in a streaming blob        |
//!
//! ## Pixel Formats
//!
//! | Code | Format     | Layout                                                         |
//! |------|------------|----------------------------------------------------------------|
//! | 3    | RGB24      | 3 bytes per pixel                                              |
//! | 4    | RGBA32     | 4 bytes per pixel                                              |
//! | 7    | RGB565     | one 16-bit word per pixel in the file's byte order             |
//! | 13   | RGBA4444   | one 16-bit word per pixel in the file's byte order             |
//! | 34   | ETC1       | 8 bytes per 4x4 block, see [`etc1`]                            |
//! | 47   | ETC2 RGBA8 | 16 bytes per 4x4 block, see [`etc2`]                           |
//!
//! Every decoder produces four bytes per pixel in `R G B A` order. Rows keep the engine's
//! order, which stores the bottom row first. Other formats can be plugged in through
//! [`TextureDecoder::register`].
//!

pub mod decoder;
pub mod error;
pub mod etc1;
pub mod etc2;
pub mod image;
pub mod rgb;
pub mod texture;

pub use decoder::{PixelDecoder, TextureDecoder};
pub use image::RgbaImage;
pub use texture::{Texture2D, TextureFormat};
