pub mod image;
pub mod loader;
pub mod metadata;

pub use image::{decode_png, encode_png, SheetImage};
pub use loader::{
    FileImageLoader, ImageLoader, LoadError, MemoryImageLoader, PendingImage, Resolver,
    SheetSource,
};
pub use metadata::{AnimationClip, MetadataIssue, SpriteSheetMetadata};
