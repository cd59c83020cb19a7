//! ETC1 block compression.
//!
//! Each 4x4 block is one big-endian 64-bit word:
//!
//! | Bits  | Individual mode            | Differential mode                  |
//! |-------|----------------------------|------------------------------------|
//! | 63-40 | two 4-bit colors, RGB      | 5-bit color and 3-bit signed delta |
//! | 39-37 | modifier table, first half | modifier table, first half         |
//! | 36-34 | modifier table, other half | modifier table, other half         |
//! | 33    | `0`                        | `1`                                |
//! | 32    | flip                       | flip                               |
//! | 31-16 | per-pixel modifier sign    | per-pixel modifier sign            |
//! | 15-0  | per-pixel modifier index   | per-pixel modifier index           |
//!
//! Pixels are numbered down columns: pixel `i` sits at `x = i / 4`, `y = i % 4`. Without
//! flip the halves are the left and right 2x4 columns, with flip the top and bottom rows.

use byteorder::{BigEndian, ByteOrder};

use crate::{error::Result, image::RgbaImage, texture::Texture2D};

/// Modifier pairs selected by a half's table index
pub(crate) const MODIFIERS: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

/// Half of each column-ordered pixel, without and with flip
#[rustfmt::skip]
pub(crate) const HALVES: [[usize; 16]; 2] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1],
];

/// Decode an ETC1 texture.
///
/// The result covers whole blocks, so its size is rounded up to multiples of 4.
pub fn decode(texture: &Texture2D) -> Result<RgbaImage> {
    decode_blocks(texture, 8, true, |block| {
        decode_block(BigEndian::read_u64(block))
    })
}

/// Decode one block into row-major pixels.
pub fn decode_block(block: u64) -> [[u8; 4]; 16] {
    let tables = [(block >> 37 & 7) as usize, (block >> 34 & 7) as usize];
    let halves = &HALVES[(block >> 32 & 1) as usize];

    let colors = if block >> 33 & 1 == 0 {
        let nibble = |shift: u32| {
            let n = (block >> shift & 0xf) as i32;
            n << 4 | n
        };
        [
            [nibble(60), nibble(52), nibble(44)],
            [nibble(56), nibble(48), nibble(40)],
        ]
    } else {
        let base = |shift: u32| (block >> shift & 0x1f) as i32;
        let delta = |shift: u32| {
            let d = (block >> shift & 7) as i32;
            (d & 3) - (d & 4)
        };
        let expand = |c: i32| {
            let c = c & 0x1f;
            c << 3 | c >> 2
        };
        let (r, g, b) = (base(59), base(51), base(43));
        [
            [expand(r), expand(g), expand(b)],
            [
                expand(r + delta(56)),
                expand(g + delta(48)),
                expand(b + delta(40)),
            ],
        ]
    };

    let mut pixels = [[0, 0, 0, 0xff]; 16];
    for (i, &half) in halves.iter().enumerate() {
        let modifier = MODIFIERS[tables[half]][(block >> i & 1) as usize];
        let modifier = if block >> (i + 16) & 1 != 0 {
            -modifier
        } else {
            modifier
        };
        pixels[i % 4 * 4 + i / 4] = shade(colors[half], modifier);
    }

    pixels
}

/// Opaque pixel of `color` with `modifier` added to every channel.
pub(crate) fn shade(color: [i32; 3], modifier: i32) -> [u8; 4] {
    [
        clamp(color[0] + modifier),
        clamp(color[1] + modifier),
        clamp(color[2] + modifier),
        0xff,
    ]
}

pub(crate) fn clamp(value: i32) -> u8 {
    value.clamp(0, 0xff) as u8
}

/// Decode a texture of 4x4 blocks of `block_size` bytes each, laid out row by row.
///
/// With `padded` the image covers every block; otherwise blocks are clipped to the
/// texture's width and height.
pub(crate) fn decode_blocks(
    texture: &Texture2D,
    block_size: usize,
    padded: bool,
    decode_block: impl Fn(&[u8]) -> [[u8; 4]; 16],
) -> Result<RgbaImage> {
    let blocks_x = texture.width.div_ceil(4);
    let blocks_y = texture.height.div_ceil(4);
    let data = texture.bytes(
        u64::from(blocks_x)
            .saturating_mul(u64::from(blocks_y))
            .saturating_mul(block_size as u64),
    )?;

    let (width, height) = if padded {
        (blocks_x * 4, blocks_y * 4)
    } else {
        (texture.width, texture.height)
    };
    let (w, h) = (width as usize, height as usize);

    let mut pixels = vec![0; w * h * 4];
    for (index, block) in data.chunks_exact(block_size).enumerate() {
        let left = index % blocks_x as usize * 4;
        let top = index / blocks_x as usize * 4;

        for (i, color) in decode_block(block).iter().enumerate() {
            let (x, y) = (left + i % 4, top + i / 4);
            if x < w && y < h {
                let at = (y * w + x) * 4;
                pixels[at..at + 4].copy_from_slice(color);
            }
        }
    }

    Ok(RgbaImage::new(width, height, pixels))
}
