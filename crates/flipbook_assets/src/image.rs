use anyhow::{ensure, Result};
use flipbook_geometry::{Rect, Size};
use rgb::RGBA8;

/// A decoded sprite sheet, stored as straight-alpha RGBA8 rows from top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetImage {
    size: Size,
    pixels: Vec<RGBA8>,
}

impl SheetImage {
    pub fn new(size: Size, pixels: Vec<RGBA8>) -> Result<Self> {
        ensure!(
            pixels.len() == size.area(),
            "{}x{} image requires {} pixels, got {}",
            size.w,
            size.h,
            size.area(),
            pixels.len()
        );

        Ok(Self { size, pixels })
    }

    /// An image of the given size where every pixel is produced by `f(x, y)`.
    pub fn from_fn(size: Size, mut f: impl FnMut(u32, u32) -> RGBA8) -> Self {
        let pixels = (0..size.h)
            .flat_map(|y| (0..size.w).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();

        Self { size, pixels }
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    #[inline]
    pub fn pixels(&self) -> &[RGBA8] {
        &self.pixels
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<RGBA8> {
        if x >= self.size.w || y >= self.size.h {
            return None;
        }

        self.pixels
            .get(y as usize * self.size.w as usize + x as usize)
            .copied()
    }
}

pub fn decode_png(png: &[u8]) -> Result<SheetImage> {
    let image = lodepng::decode32(png)?;
    let size = Size::new(image.width as u32, image.height as u32);

    SheetImage::new(size, image.buffer)
}

pub fn encode_png(pixels: &[RGBA8], size: Size) -> Result<Vec<u8>> {
    ensure!(pixels.len() == size.area(), "pixel buffer does not match {size:?}");

    Ok(lodepng::encode32(pixels, size.w as usize, size.h as usize)?)
}
