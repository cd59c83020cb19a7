use derive_more::derive::{Constructor, Deref};

/// A decoded image, four bytes per pixel in `R G B A` order, rows stored in the order the
/// engine keeps them (bottom row first)
#[derive(Debug, Clone, PartialEq, Eq, Constructor, Deref)]
pub struct RgbaImage {
    /// Final width, which block formats round up to whole blocks
    pub width: u32,

    /// Final height, which block formats round up to whole blocks
    pub height: u32,

    #[deref]
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// The four channels of the pixel at `x`, `y`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * 4;
        let pixel = self.pixels.get(start..start + 4)?;
        Some([pixel[0], pixel[1], pixel[2], pixel[3]])
    }

    /// Consume the image, returning its pixel bytes.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}
