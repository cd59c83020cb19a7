//! ETC2 RGBA8 block compression.
//!
//! Every 16-byte block holds an 8-byte alpha block followed by an 8-byte color block. Color
//! blocks extend ETC1: a differential block whose red, green or blue sum overflows switches
//! to the T, H or planar mode respectively.

use byteorder::{BigEndian, ByteOrder};

use crate::{
    error::Result,
    etc1::{clamp, decode_blocks, shade, HALVES, MODIFIERS},
    image::RgbaImage,
    texture::Texture2D,
};

/// Row-major position of each column-ordered pixel
const WRITE_ORDER: [usize; 16] = [0, 4, 8, 12, 1, 5, 9, 13, 2, 6, 10, 14, 3, 7, 11, 15];

/// Row-major position of each alpha index, lowest bits first
const ALPHA_ORDER: [usize; 16] = [15, 11, 7, 3, 14, 10, 6, 2, 13, 9, 5, 1, 12, 8, 4, 0];

/// Paint distances of the T and H modes
const DISTANCES: [i32; 8] = [3, 6, 11, 16, 23, 32, 41, 64];

#[rustfmt::skip]
const ALPHA_MODIFIERS: [[i32; 8]; 16] = [
    [-3, -6, -9, -15, 2, 5, 8, 14],
    [-3, -7, -10, -13, 2, 6, 9, 12],
    [-2, -5, -8, -13, 1, 4, 7, 12],
    [-2, -4, -6, -13, 1, 3, 5, 12],
    [-3, -6, -8, -12, 2, 5, 7, 11],
    [-3, -7, -9, -11, 2, 6, 8, 10],
    [-4, -7, -8, -11, 3, 6, 7, 10],
    [-3, -5, -8, -11, 2, 4, 7, 10],
    [-2, -6, -8, -10, 1, 5, 7, 9],
    [-2, -5, -8, -10, 1, 4, 7, 9],
    [-2, -4, -8, -10, 1, 3, 7, 9],
    [-2, -5, -7, -10, 1, 4, 6, 9],
    [-3, -4, -7, -10, 2, 3, 6, 9],
    [-1, -2, -3, -10, 0, 1, 2, 9],
    [-4, -6, -8, -9, 3, 5, 7, 8],
    [-3, -5, -7, -9, 2, 4, 6, 8],
];

/// Decode an ETC2 RGBA8 texture, clipped to its width and height.
pub fn decode_rgba8(texture: &Texture2D) -> Result<RgbaImage> {
    decode_blocks(texture, 16, false, |block| {
        let mut pixels = decode_color(&block[8..16]);
        decode_alpha(&block[..8], &mut pixels);
        pixels
    })
}

/// Decode an 8-byte color block into opaque row-major pixels.
pub fn decode_color(block: &[u8]) -> [[u8; 4]; 16] {
    let d: [i32; 8] = std::array::from_fn(|i| i32::from(block[i]));
    let j = d[6] << 8 | d[7];
    let k = d[4] << 8 | d[5];
    let mut pixels = [[0, 0, 0, 0xff]; 16];

    if d[3] & 2 == 0 {
        let colors = [
            [
                d[0] & 0xf0 | d[0] >> 4,
                d[1] & 0xf0 | d[1] >> 4,
                d[2] & 0xf0 | d[2] >> 4,
            ],
            [
                (d[0] & 0x0f | d[0] << 4) & 0xff,
                (d[1] & 0x0f | d[1] << 4) & 0xff,
                (d[2] & 0x0f | d[2] << 4) & 0xff,
            ],
        ];
        paint_halves(&mut pixels, colors, d[3], j, k);
        return pixels;
    }

    let base = |c: i32| c & 0xf8;
    let delta = |c: i32| (c << 3 & 0x18) - (c << 3 & 0x20);
    let (r, g, b) = (base(d[0]), base(d[1]), base(d[2]));
    let (dr, dg, db) = (delta(d[0]), delta(d[1]), delta(d[2]));
    let overflows = |c: i32| !(0..=0xff).contains(&c);

    if overflows(r + dr) {
        let c0 = [
            d[0] << 3 & 0xc0 | d[0] << 4 & 0x30 | d[0] >> 1 & 0x0c | d[0] & 3,
            d[1] & 0xf0 | d[1] >> 4,
            (d[1] & 0x0f | d[1] << 4) & 0xff,
        ];
        let c1 = [
            d[2] & 0xf0 | d[2] >> 4,
            (d[2] & 0x0f | d[2] << 4) & 0xff,
            d[3] & 0xf0 | d[3] >> 4,
        ];
        let distance = DISTANCES[(d[3] >> 1 & 6 | d[3] & 1) as usize];
        let paints = [
            shade(c0, 0),
            shade(c1, distance),
            shade(c1, 0),
            shade(c1, -distance),
        ];
        paint_indexed(&mut pixels, &paints, j, k);
    } else if overflows(g + dg) {
        let c0 = {
            let g = d[0] << 5 & 0xe0 | d[1] & 0x10;
            let b = d[1] & 8 | d[1] << 1 & 6 | d[2] >> 7;
            [d[0] << 1 & 0xf0 | d[0] >> 3 & 0x0f, g | g >> 4, b | b << 4]
        };
        let c1 = {
            let g = d[2] << 5 & 0xe0 | d[3] >> 3 & 0x10;
            [
                d[2] << 1 & 0xf0 | d[2] >> 3 & 0x0f,
                g | g >> 4,
                d[3] << 1 & 0xf0 | d[3] >> 3 & 0x0f,
            ]
        };
        let mut index = d[3] & 4 | d[3] << 1 & 2;
        if c0 >= c1 {
            index += 1;
        }
        let distance = DISTANCES[index as usize];
        let paints = [
            shade(c0, distance),
            shade(c0, -distance),
            shade(c1, distance),
            shade(c1, -distance),
        ];
        paint_indexed(&mut pixels, &paints, j, k);
    } else if overflows(b + db) {
        let c0 = {
            let b = d[1] << 7 & 0x80 | d[2] << 2 & 0x60 | d[2] << 3 & 0x18 | d[3] >> 5 & 4;
            [
                d[0] << 1 & 0xfc | d[0] >> 5 & 3,
                d[0] << 7 & 0x80 | d[1] & 0x7e | d[0] & 1,
                b | b >> 6,
            ]
        };
        let c1 = {
            let b = d[4] << 7 & 0x80 | d[5] >> 1 & 0x7c;
            [
                d[3] << 1 & 0xf8 | d[3] << 2 & 4 | d[3] >> 5 & 3,
                d[4] & 0xfe | d[4] >> 7,
                b | b >> 6,
            ]
        };
        let c2 = [
            d[5] << 5 & 0xe0 | d[6] >> 3 & 0x1c | d[5] >> 1 & 3,
            d[6] << 3 & 0xf8 | d[7] >> 5 & 6 | d[6] >> 4 & 1,
            (d[7] << 2 | d[7] >> 4 & 3) & 0xff,
        ];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            let (x, y) = ((i % 4) as i32, (i / 4) as i32);
            let channel =
                |n: usize| clamp((x * (c1[n] - c0[n]) + y * (c2[n] - c0[n]) + 4 * c0[n] + 2) >> 2);
            *pixel = [channel(0), channel(1), channel(2), 0xff];
        }
    } else {
        let colors = [
            [r | r >> 5, g | g >> 5, b | b >> 5],
            [
                (r + dr) | (r + dr) >> 5,
                (g + dg) | (g + dg) >> 5,
                (b + db) | (b + db) >> 5,
            ],
        ];
        paint_halves(&mut pixels, colors, d[3], j, k);
    }

    pixels
}

/// Fill the alpha channel of `pixels` from an 8-byte alpha block.
pub fn decode_alpha(block: &[u8], pixels: &mut [[u8; 4]; 16]) {
    let base = i32::from(block[0]);
    if block[1] & 0xf0 == 0 {
        for pixel in pixels.iter_mut() {
            pixel[3] = block[0];
        }
        return;
    }

    let multiplier = i32::from(block[1] >> 4);
    let table = &ALPHA_MODIFIERS[(block[1] & 0x0f) as usize];
    let mut indices = BigEndian::read_u64(block);
    for &i in &ALPHA_ORDER {
        pixels[i][3] = clamp(base + multiplier * table[(indices & 7) as usize]);
        indices >>= 3;
    }
}

/// Individual and differential modes: each half has a base color and a modifier table.
fn paint_halves(pixels: &mut [[u8; 4]; 16], colors: [[i32; 3]; 2], flags: i32, j: i32, k: i32) {
    let tables = [(flags >> 5) as usize, (flags >> 2 & 7) as usize];
    let halves = &HALVES[(flags & 1) as usize];

    for (i, &half) in halves.iter().enumerate() {
        let modifier = MODIFIERS[tables[half]][(j >> i & 1) as usize];
        let modifier = if k >> i & 1 != 0 { -modifier } else { modifier };
        pixels[WRITE_ORDER[i]] = shade(colors[half], modifier);
    }
}

/// T and H modes: each pixel picks one of four paint colors.
fn paint_indexed(pixels: &mut [[u8; 4]; 16], paints: &[[u8; 4]; 4], j: i32, k: i32) {
    for (i, &at) in WRITE_ORDER.iter().enumerate() {
        let index = (k >> i << 1 & 2) | (j >> i & 1);
        pixels[at] = paints[index as usize];
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::etc2::{decode_alpha, decode_color, decode_rgba8};
    use crate::texture::{Texture2D, TextureFormat};

    fn texture(width: u32, height: u32, data: &[u8]) -> Texture2D {
        Texture2D::builder()
            .width(width)
            .height(height)
            .format(TextureFormat::ETC2_RGBA8)
            .data(data.to_vec().into())
            .build()
    }

    #[test]
    fn flat_alpha_and_individual_color() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let image = decode_rgba8(&texture(4, 4, &input))?;

        assert_eq!(image.pixels, [0x02, 0x02, 0x02, 0x80].repeat(16));

        Ok(())
    }

    #[test]
    fn modulated_alpha() {
        // multiplier 1 on table 0; the first pixel's index is 4 (+2), the rest 0 (-3)
        #[rustfmt::skip]
        let block = [0x64, 0x10, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut pixels = [[0; 4]; 16];

        decode_alpha(&block, &mut pixels);

        assert_eq!(pixels[0][3], 102);
        assert!(pixels[1..].iter().all(|p| p[3] == 97));
    }

    #[test]
    fn t_mode() {
        // red overflows; c0 black, c1 0x88 with distance 3; only the first pixel is painted
        #[rustfmt::skip]
        let block = [0x04, 0x00, 0x88, 0x82, 0x00, 0x01, 0x00, 0x01];

        let pixels = decode_color(&block);

        assert_eq!(pixels[0], [0x85, 0x85, 0x85, 0xff]);
        assert!(pixels[1..].iter().all(|p| *p == [0x00, 0x00, 0x00, 0xff]));
    }

    #[test]
    fn h_mode_orders_base_colors() {
        // green overflows; both colors black, so the distance index moves up by one
        #[rustfmt::skip]
        let block = [0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0xff, 0xff];

        let pixels = decode_color(&block);

        // paint 1: c0 minus distance 6
        assert!(pixels.iter().all(|p| *p == [0x00, 0x00, 0x00, 0xff]));

        // paint 0: c0 plus distance 6
        #[rustfmt::skip]
        let block = [0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];
        let pixels = decode_color(&block);
        assert!(pixels.iter().all(|p| *p == [0x06, 0x06, 0x06, 0xff]));
    }

    #[test]
    fn planar_gradient() {
        // blue overflows; only the vertical color has blue, so rows grow bluer
        #[rustfmt::skip]
        let block = [0x00, 0x00, 0x04, 0x02, 0x00, 0x00, 0x00, 0x3f];

        let pixels = decode_color(&block);

        for (i, pixel) in pixels.iter().enumerate() {
            let blue = [0x00, 0x40, 0x80, 0xbf][i / 4];
            assert_eq!(*pixel, [0x00, 0x00, blue, 0xff], "pixel {i}");
        }
    }

    #[test]
    fn output_is_clipped() -> Result<()> {
        let mut input = vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        input.extend([0x00; 8]);

        let image = decode_rgba8(&texture(2, 3, &input))?;

        assert_eq!((image.width, image.height), (2, 3));
        assert_eq!(image.pixels.len(), 2 * 3 * 4);

        Ok(())
    }

    #[test]
    fn missing_blocks_are_truncated() {
        let result = decode_rgba8(&texture(8, 4, &[0; 16]));

        assert!(matches!(
            result,
            Err(Error::TruncatedImage {
                expected: 32,
                actual: 16
            })
        ));
    }
}
