//! Sprite-sheet animation playback.
//!
//! This crate only re-exports the workspace members so applications can depend on a single crate.

pub use flipbook_assets as assets;
pub use flipbook_core as timing;
pub use flipbook_geometry as geometry;
pub use flipbook_scheduler as scheduler;
pub use flipbook_sprites as sprites;
pub use flipbook_surface as surface;
