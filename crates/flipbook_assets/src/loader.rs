use std::{
    borrow::Cow,
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread,
};

use derive_more::{Deref, Display};
use thiserror::Error;

use crate::image::{decode_png, SheetImage};

/// Reference to a sprite sheet image, a path or a name known to a loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display)]
#[deref(forward)]
pub struct SheetSource(pub Cow<'static, str>);

impl SheetSource {
    pub fn new(source: impl Into<Cow<'static, str>>) -> Self {
        Self(source.into())
    }
}

impl From<&'static str> for SheetSource {
    fn from(source: &'static str) -> Self {
        Self::new(source)
    }
}

impl From<String> for SheetSource {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unable to read {sheet}: {reason}")]
    Io { sheet: SheetSource, reason: String },
    #[error("unable to decode {sheet}: {reason}")]
    Decode { sheet: SheetSource, reason: String },
    #[error("no image registered as {0}")]
    NotFound(SheetSource),
    #[error("image loader went away before resolving")]
    Disconnected,
}

pub type LoadResult = Result<Arc<SheetImage>, LoadError>;

/// The receiving half of an image load that may still be in flight.
///
/// Polling never blocks: the owner checks it once per frame until it resolves.
pub struct PendingImage(Receiver<LoadResult>);

/// The sending half of a [`PendingImage`].
pub struct Resolver(Sender<LoadResult>);

impl Resolver {
    pub fn resolve(self, result: Result<SheetImage, LoadError>) {
        // The receiver may be gone already, in which case nobody cares about the result
        let _ = self.0.send(result.map(Arc::new));
    }
}

impl PendingImage {
    pub fn channel() -> (Resolver, PendingImage) {
        let (sender, receiver) = mpsc::channel();
        (Resolver(sender), PendingImage(receiver))
    }

    /// A load that has already finished.
    pub fn resolved(result: Result<SheetImage, LoadError>) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(result);
        pending
    }

    /// Runs `load` on a worker thread.
    pub fn spawn<F>(load: F) -> Self
    where
        F: FnOnce() -> Result<SheetImage, LoadError> + Send + 'static,
    {
        let (resolver, pending) = Self::channel();
        thread::spawn(move || resolver.resolve(load()));
        pending
    }

    /// Returns `None` while the load is in flight.
    pub fn poll(&self) -> Option<LoadResult> {
        match self.0.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoadError::Disconnected)),
        }
    }
}

/// Resolves sheet references into decoded images.
pub trait ImageLoader {
    fn load(&self, source: &SheetSource) -> PendingImage;
}

impl<F: Fn(&SheetSource) -> PendingImage> ImageLoader for F {
    fn load(&self, source: &SheetSource) -> PendingImage {
        self(source)
    }
}

/// Loads PNG sheets from the file system on a worker thread.
/// Sources are resolved relative to `root`.
#[derive(Debug, Clone, Default)]
pub struct FileImageLoader {
    pub root: PathBuf,
}

impl FileImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageLoader for FileImageLoader {
    fn load(&self, source: &SheetSource) -> PendingImage {
        let path = self.root.join(&**source);
        let sheet = source.clone();

        log::debug!("Loading sprite sheet {}", path.display());

        PendingImage::spawn(move || {
            let bytes = fs::read(&path).map_err(|e| LoadError::Io {
                sheet: sheet.clone(),
                reason: e.to_string(),
            })?;

            decode_png(&bytes).map_err(|e| LoadError::Decode {
                sheet,
                reason: e.to_string(),
            })
        })
    }
}

/// Serves PNG sheets embedded in the binary or generated at runtime.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageLoader {
    images: HashMap<SheetSource, Arc<[u8]>>,
}

impl MemoryImageLoader {
    pub fn insert(&mut self, source: impl Into<SheetSource>, png: impl Into<Arc<[u8]>>) {
        self.images.insert(source.into(), png.into());
    }

    pub fn with(mut self, source: impl Into<SheetSource>, png: impl Into<Arc<[u8]>>) -> Self {
        self.insert(source, png);
        self
    }
}

impl ImageLoader for MemoryImageLoader {
    fn load(&self, source: &SheetSource) -> PendingImage {
        let result = match self.images.get(source) {
            Some(png) => decode_png(png).map_err(|e| LoadError::Decode {
                sheet: source.clone(),
                reason: e.to_string(),
            }),
            None => Err(LoadError::NotFound(source.clone())),
        };

        PendingImage::resolved(result)
    }
}
