use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Size of an image or a surface in pixels.
#[derive(Constructor, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    #[inline]
    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl From<(u32, u32)> for Size {
    fn from((w, h): (u32, u32)) -> Self {
        Self { w, h }
    }
}

impl From<[u32; 2]> for Size {
    fn from([w, h]: [u32; 2]) -> Self {
        Self { w, h }
    }
}

/// A pixel-aligned rectangle defined by its top-left corner and size.
#[derive(Constructor, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    #[inline]
    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.w, size.h)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }

    /// True if `other` lies fully inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}
