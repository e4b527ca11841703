use std::{fs, path::Path};

use anyhow::{Context, Result};
use flipbook_assets::{encode_png, SheetImage};
use flipbook_geometry::{Rect, Size};
use rgb::RGBA8;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("source {src:?} lies outside of the {sheet:?} sheet")]
    SourceOutOfBounds { src: Rect, sheet: Size },
    #[error("sheet image has no pixels")]
    EmptySheet,
    #[error("{0}")]
    Backend(String),
}

/// A 2D drawing target. Sizes are in destination pixels, independent of
/// the pixel size of the frames blitted onto it.
pub trait Surface {
    fn size(&self) -> Size;

    /// Clears the whole surface.
    fn clear(&mut self);

    /// Copies `src` of `image` into the top-left `dst` region of the surface, scaling it to fit.
    fn blit_scaled(&mut self, image: &SheetImage, src: Rect, dst: Size) -> Result<(), RenderError>;
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn size(&self) -> Size {
        (**self).size()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn blit_scaled(&mut self, image: &SheetImage, src: Rect, dst: Size) -> Result<(), RenderError> {
        (**self).blit_scaled(image, src, dst)
    }
}

/// A CPU surface holding straight-alpha RGBA8 pixels. Blits use nearest neighbour sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    size: Size,
    pixels: Vec<RGBA8>,
}

impl PixelSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![RGBA8::default(); size.area()],
        }
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

        Some(self.pixels[y as usize * self.size.w as usize + x as usize])
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == RGBA8::default())
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.pixels, self.size)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_png()?)
            .with_context(|| format!("unable to write {}", path.display()))
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self) {
        self.pixels.fill(RGBA8::default());
    }

    fn blit_scaled(&mut self, image: &SheetImage, src: Rect, dst: Size) -> Result<(), RenderError> {
        if image.size().is_empty() {
            return Err(RenderError::EmptySheet);
        }
        if src.size().is_empty() || !image.bounds().contains(&src) {
            return Err(RenderError::SourceOutOfBounds {
                src,
                sheet: image.size(),
            });
        }

        // Anything scaled past the surface edge is clipped
        let w = dst.w.min(self.size.w);
        let h = dst.h.min(self.size.h);

        for y in 0..h {
            let sy = src.y + (y as u64 * src.h as u64 / dst.h as u64) as u32;
            let row = y as usize * self.size.w as usize;

            for x in 0..w {
                let sx = src.x + (x as u64 * src.w as u64 / dst.w as u64) as u32;
                if let Some(pixel) = image.pixel(sx, sy) {
                    self.pixels[row + x as usize] = pixel;
                }
            }
        }

        Ok(())
    }
}
