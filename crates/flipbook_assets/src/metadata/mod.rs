use flipbook_core::frame_duration;
use flipbook_geometry::{Rect, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod file;

pub use file::{MetadataError, MetadataFormat};

/// A named, contiguous range of frames in a sheet, played at its own rate.
/// `start` and `end` are inclusive absolute indexes into the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub start: u32,
    pub end: u32,
    pub fps: f32,
}

impl AnimationClip {
    pub fn new(start: u32, end: u32, fps: f32) -> Self {
        Self { start, end, fps }
    }

    /// Number of frames in the clip. A reversed range still has a single frame,
    /// a range spanning every `u32` saturates at `u32::MAX`.
    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    /// Duration of one frame in milliseconds.
    #[inline]
    pub fn frame_duration(&self) -> f64 {
        frame_duration(self.fps)
    }

    #[inline]
    pub fn is_last_frame(&self, frame: u32) -> bool {
        self.frame_count() <= frame.saturating_add(1)
    }
}

/// Layout of a sprite sheet: a grid of equally sized cells, read left to right,
/// top to bottom, plus the clips defined on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSheetMetadata {
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: u32,
    /// Addressable cells, may be less than a full grid if the last row is partial.
    pub total_frames: u32,
    #[serde(default)]
    pub animations: IndexMap<String, AnimationClip>,
}

/// An inconsistency found in sprite sheet metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataIssue {
    #[error("frame size {0}x{1} has a zero dimension")]
    EmptyFrame(u32, u32),
    #[error("sheet has no columns")]
    NoColumns,
    #[error("sheet has no frames")]
    NoFrames,
    #[error("clip `{clip}` starts at frame {start} which is after its end {end}")]
    ReversedClip { clip: String, start: u32, end: u32 },
    #[error("clip `{clip}` ends at frame {end}, but the sheet only has {total} frames")]
    ClipOutsideSheet { clip: String, end: u32, total: u32 },
    #[error("clip `{clip}` has an unusable rate of {fps} fps")]
    InvalidFps { clip: String, fps: f32 },
}

impl SpriteSheetMetadata {
    pub fn new(frame_size: Size, columns: u32, total_frames: u32) -> Self {
        Self {
            frame_width: frame_size.w,
            frame_height: frame_size.h,
            columns,
            total_frames,
            animations: IndexMap::new(),
        }
    }

    pub fn with_clip(mut self, name: impl Into<String>, clip: AnimationClip) -> Self {
        self.animations.insert(name.into(), clip);
        self
    }

    #[inline]
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.animations.get(name)
    }

    #[inline]
    pub fn frame_size(&self) -> Size {
        Size::new(self.frame_width, self.frame_height)
    }

    pub fn rows(&self) -> u32 {
        self.total_frames.div_ceil(self.columns.max(1))
    }

    /// Clamps an absolute frame index into `[0, total_frames - 1]`.
    #[inline]
    pub fn clamp_index(&self, index: u32) -> u32 {
        index.min(self.total_frames.saturating_sub(1))
    }

    /// Sheet-space source rectangle of an absolute frame index. The index is
    /// clamped first, so the result never addresses a cell past the last frame.
    pub fn frame_rect(&self, index: u32) -> Rect {
        let index = self.clamp_index(index);
        let columns = self.columns.max(1);

        Rect::new(
            (index % columns).saturating_mul(self.frame_width),
            (index / columns).saturating_mul(self.frame_height),
            self.frame_width,
            self.frame_height,
        )
    }

    /// Collects every inconsistency in the metadata. Playback tolerates all of these.
    pub fn validate(&self) -> Vec<MetadataIssue> {
        let mut issues = Vec::new();

        if self.frame_width == 0 || self.frame_height == 0 {
            issues.push(MetadataIssue::EmptyFrame(self.frame_width, self.frame_height));
        }
        if self.columns == 0 {
            issues.push(MetadataIssue::NoColumns);
        }
        if self.total_frames == 0 {
            issues.push(MetadataIssue::NoFrames);
        }

        for (name, clip) in &self.animations {
            if clip.start > clip.end {
                issues.push(MetadataIssue::ReversedClip {
                    clip: name.clone(),
                    start: clip.start,
                    end: clip.end,
                });
            }
            if clip.end >= self.total_frames {
                issues.push(MetadataIssue::ClipOutsideSheet {
                    clip: name.clone(),
                    end: clip.end,
                    total: self.total_frames,
                });
            }
            if !clip.fps.is_finite() || clip.fps <= 0. {
                issues.push(MetadataIssue::InvalidFps {
                    clip: name.clone(),
                    fps: clip.fps,
                });
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    fn sheet() -> SpriteSheetMetadata {
        SpriteSheetMetadata::new(Size::new(32, 32), 4, 16)
            .with_clip("walk", AnimationClip::new(0, 3, 8.))
            .with_clip("jump", AnimationClip::new(12, 15, 10.))
    }

    #[test]
    fn test_clip_derived_values() {
        let walk = *sheet().clip("walk").unwrap();
        assert_eq!(walk.frame_count(), 4);
        assert!(approx_eq!(f64, walk.frame_duration(), 125.));
        assert!(walk.is_last_frame(3));
        assert!(!walk.is_last_frame(2));

        let reversed = AnimationClip::new(5, 2, 1.);
        assert_eq!(reversed.frame_count(), 1);
    }

    #[test]
    fn test_full_range_clip_saturates() {
        let endless = AnimationClip::new(0, u32::MAX, 10.);
        assert_eq!(endless.frame_count(), u32::MAX);
        assert!(endless.is_last_frame(u32::MAX - 1));
        assert!(endless.is_last_frame(u32::MAX));
        assert!(!endless.is_last_frame(5));
    }

    #[test]
    fn test_frame_rect_walks_the_grid() {
        let sheet = sheet();
        assert_eq!(sheet.frame_rect(0), Rect::new(0, 0, 32, 32));
        assert_eq!(sheet.frame_rect(3), Rect::new(96, 0, 32, 32));
        assert_eq!(sheet.frame_rect(4), Rect::new(0, 32, 32, 32));
        assert_eq!(sheet.frame_rect(14), Rect::new(64, 96, 32, 32));
    }

    #[test]
    fn test_frame_rect_is_clamped() {
        let sheet = sheet();
        assert_eq!(sheet.clamp_index(20), 15);
        assert_eq!(sheet.frame_rect(20), sheet.frame_rect(15));
        assert_eq!(sheet.frame_rect(u32::MAX), Rect::new(96, 96, 32, 32));
    }

    #[test]
    fn test_degenerate_sheet_does_not_panic() {
        let sheet = SpriteSheetMetadata::new(Size::new(8, 8), 0, 0);
        assert_eq!(sheet.frame_rect(7), Rect::new(0, 0, 8, 8));
        assert_eq!(sheet.rows(), 0);
    }

    #[test]
    fn test_partial_last_row() {
        let sheet = SpriteSheetMetadata::new(Size::new(16, 16), 4, 10);
        assert_eq!(sheet.rows(), 3);
        assert_eq!(sheet.frame_rect(9), Rect::new(16, 32, 16, 16));
    }

    #[test]
    fn test_validate() {
        assert!(sheet().validate().is_empty());

        let broken = SpriteSheetMetadata::new(Size::new(32, 0), 0, 16)
            .with_clip("far", AnimationClip::new(12, 20, 10.))
            .with_clip("back", AnimationClip::new(3, 1, 0.));

        assert_eq!(
            broken.validate(),
            vec![
                MetadataIssue::EmptyFrame(32, 0),
                MetadataIssue::NoColumns,
                MetadataIssue::ClipOutsideSheet {
                    clip: "far".into(),
                    end: 20,
                    total: 16
                },
                MetadataIssue::ReversedClip {
                    clip: "back".into(),
                    start: 3,
                    end: 1
                },
                MetadataIssue::InvalidFps {
                    clip: "back".into(),
                    fps: 0.
                },
            ]
        );
    }
}
