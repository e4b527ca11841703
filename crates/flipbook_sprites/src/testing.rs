use std::{cell::RefCell, rc::Rc};

use flipbook_assets::{
    encode_png, AnimationClip, MemoryImageLoader, SheetImage, SpriteSheetMetadata,
};
use flipbook_geometry::{Rect, Size};
use flipbook_surface::{RenderError, Surface};
use rgb::RGBA8;

/// 4x4 grid of 32px cells, every cell filled with a color encoding its index.
pub fn sheet_image() -> SheetImage {
    SheetImage::from_fn(Size::new(128, 128), |x, y| {
        RGBA8::new((y / 32 * 4 + x / 32) as u8, 0, 0, 255)
    })
}

pub fn jump_and_walk() -> SpriteSheetMetadata {
    SpriteSheetMetadata::new(Size::new(32, 32), 4, 16)
        .with_clip("walk", AnimationClip::new(0, 3, 8.))
        .with_clip("jump", AnimationClip::new(12, 15, 10.))
}

pub fn memory_loader() -> MemoryImageLoader {
    let image = sheet_image();
    let png = encode_png(image.pixels(), image.size()).unwrap();
    MemoryImageLoader::default().with("sheet.png", png)
}

#[derive(Default)]
struct Record {
    clears: usize,
    blits: Vec<(Rect, Size)>,
    failing: bool,
}

/// A surface that only remembers what was done to it. Clones share the record.
#[derive(Clone)]
pub struct RecordingSurface {
    size: Size,
    record: Rc<RefCell<Record>>,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            record: Default::default(),
        }
    }

    pub fn clears(&self) -> usize {
        self.record.borrow().clears
    }

    pub fn blits(&self) -> Vec<(Rect, Size)> {
        self.record.borrow().blits.clone()
    }

    pub fn sources(&self) -> Vec<Rect> {
        self.record.borrow().blits.iter().map(|(src, _)| *src).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.record.borrow_mut().failing = failing;
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn clear(&mut self) {
        self.record.borrow_mut().clears += 1;
    }

    fn blit_scaled(&mut self, _: &SheetImage, src: Rect, dst: Size) -> Result<(), RenderError> {
        let mut record = self.record.borrow_mut();
        if record.failing {
            return Err(RenderError::Backend("surface lost".into()));
        }

        record.blits.push((src, dst));
        Ok(())
    }
}
