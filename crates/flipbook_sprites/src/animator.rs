use std::sync::Arc;

use flipbook_assets::{
    AnimationClip, ImageLoader, LoadError, PendingImage, SheetImage, SheetSource,
    SpriteSheetMetadata,
};
use flipbook_core::Timestamp;
use flipbook_geometry::{Rect, Size};
use flipbook_surface::{RenderError, Surface};
use derive_more::Display;
use smart_default::SmartDefault;
use thiserror::Error;

use crate::session::PlaybackSession;

#[derive(SmartDefault, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatorSettings {
    /// Destination size in display pixels, frames are scaled to fit it.
    #[default(Size::new(64, 64))]
    pub output_size: Size,
    #[default(true)]
    pub looping: bool,
    pub paused: bool,
}

/// Everything that can go wrong during playback. None of these are returned
/// to the caller, they are logged and kept as [`Animator::last_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimatorError {
    #[error("sprite sheet {sheet} failed to load: {reason}")]
    ResourceLoad { sheet: SheetSource, reason: LoadError },
    #[error("animation `{0}` is not defined in the sprite sheet metadata")]
    UnknownAnimation(String),
    #[error("unable to draw frame: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    /// The sheet image is still loading.
    Unloaded,
    /// The sheet image failed to load, nothing will ever be drawn for this source.
    Failed,
    /// Loaded, but no frame of the requested clip was drawn yet.
    Idle,
    Playing,
    Paused,
    /// A non-looping clip reached its last frame.
    Completed,
    Disposed,
}

/// Whether the animator wants another tick on the next display refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    NextFrame,
    Stop,
    /// A non-looping clip just reached its last frame. No further ticks are needed.
    Completed,
}

/// The frame chosen by the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelection {
    /// Index relative to the start of the clip
    pub frame: u32,
    /// `clip.start + frame`, before clamping
    pub absolute: u32,
    /// `absolute` clamped into the sheet
    pub clamped: u32,
    /// Source rectangle on the sheet
    pub source: Rect,
}

enum Sheet {
    Loading(PendingImage),
    Loaded(Arc<SheetImage>),
    Failed,
}

/// Plays named clips of a sprite sheet onto a surface.
///
/// The animator is driven from outside: the host calls [`Animator::tick`] once
/// per display refresh for as long as it returns [`Schedule::NextFrame`].
/// Every failure is contained in here, the worst a caller can observe is a
/// blank or a stale surface.
pub struct Animator<L: ImageLoader> {
    loader: L,
    source: SheetSource,
    sheet: Sheet,
    metadata: SpriteSheetMetadata,
    settings: AnimatorSettings,
    requested: String,
    session: Option<PlaybackSession>,
    selection: Option<FrameSelection>,
    on_complete: Option<Box<dyn FnMut()>>,
    last_error: Option<AnimatorError>,
    disposed: bool,
}

impl<L: ImageLoader> Animator<L> {
    /// Creates an animator and immediately starts loading the sheet.
    pub fn new(
        loader: L,
        source: impl Into<SheetSource>,
        metadata: SpriteSheetMetadata,
        clip: impl Into<String>,
        settings: AnimatorSettings,
    ) -> Self {
        let source = source.into();
        let sheet = Sheet::Loading(loader.load(&source));

        Self {
            loader,
            source,
            sheet,
            metadata,
            settings,
            requested: clip.into(),
            session: None,
            selection: None,
            on_complete: None,
            last_error: None,
            disposed: false,
        }
    }

    /// Called once every time a non-looping clip reaches its last frame.
    pub fn with_on_complete(mut self, on_complete: impl FnMut() + 'static) -> Self {
        self.set_on_complete(on_complete);
        self
    }

    pub fn set_on_complete(&mut self, on_complete: impl FnMut() + 'static) {
        self.on_complete = Some(Box::new(on_complete));
    }

    #[inline]
    pub fn source(&self) -> &SheetSource {
        &self.source
    }

    #[inline]
    pub fn metadata(&self) -> &SpriteSheetMetadata {
        &self.metadata
    }

    #[inline]
    pub fn settings(&self) -> &AnimatorSettings {
        &self.settings
    }

    /// The clip that will be played on the next tick.
    #[inline]
    pub fn requested_clip(&self) -> &str {
        &self.requested
    }

    #[inline]
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Frame index relative to the start of the current clip.
    #[inline]
    pub fn frame(&self) -> Option<u32> {
        self.session.as_ref().map(PlaybackSession::frame)
    }

    /// The frame drawn by the last successful tick.
    #[inline]
    pub fn selection(&self) -> Option<FrameSelection> {
        self.selection
    }

    #[inline]
    pub fn last_error(&self) -> Option<&AnimatorError> {
        self.last_error.as_ref()
    }

    pub fn state(&self) -> AnimatorState {
        if self.disposed {
            return AnimatorState::Disposed;
        }

        match &self.sheet {
            Sheet::Loading(_) => AnimatorState::Unloaded,
            Sheet::Failed => AnimatorState::Failed,
            Sheet::Loaded(_) => match &self.session {
                Some(session) if session.clip() == self.requested => {
                    if session.is_completed() && !self.settings.looping {
                        AnimatorState::Completed
                    } else if self.settings.paused {
                        AnimatorState::Paused
                    } else {
                        AnimatorState::Playing
                    }
                }
                _ if self.settings.paused => AnimatorState::Paused,
                _ => AnimatorState::Idle,
            },
        }
    }

    /// True while another tick can change what is drawn.
    pub fn wants_frames(&self) -> bool {
        !self.settings.paused
            && !self.waits_on_unknown_clip()
            && matches!(
                self.state(),
                AnimatorState::Unloaded | AnimatorState::Idle | AnimatorState::Playing
            )
    }

    fn waits_on_unknown_clip(&self) -> bool {
        matches!(
            &self.last_error,
            Some(AnimatorError::UnknownAnimation(name)) if *name == self.requested
        )
    }

    /// Requests a different clip. Playback of a new clip starts from its first
    /// frame on the next tick. Requesting the current clip changes nothing.
    pub fn set_clip(&mut self, clip: impl Into<String>) {
        let clip = clip.into();
        if clip != self.requested {
            log::debug!("Switching animation {} -> {clip}", self.requested);
            self.requested = clip;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.settings.paused == paused {
            return;
        }

        self.settings.paused = paused;
        if !paused {
            if let Some(session) = &mut self.session {
                session.rebase();
            }
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        if self.settings.looping == looping {
            return;
        }

        self.settings.looping = looping;
        if let Some(session) = &mut self.session {
            if looping && session.is_completed() {
                session.restart();
            }
        }
    }

    pub fn set_output_size(&mut self, output_size: Size) {
        self.settings.output_size = output_size;
    }

    /// Replaces the sheet layout. The current clip starts over, since its bounds may have moved.
    pub fn set_metadata(&mut self, metadata: SpriteSheetMetadata) {
        self.metadata = metadata;
        self.session = None;
        self.forget_unknown_clip();
    }

    /// Points the animator at a different sheet image. Loading starts right
    /// away, and nothing is drawn until it finishes.
    ///
    /// A sheet is loaded once per change of source: setting the current source
    /// is a no-op, but going back to an earlier source loads it again.
    pub fn set_source(&mut self, source: impl Into<SheetSource>) {
        let source = source.into();
        if source == self.source || self.disposed {
            return;
        }

        log::debug!("Switching sprite sheet {} -> {source}", self.source);
        self.sheet = Sheet::Loading(self.loader.load(&source));
        self.source = source;
        self.session = None;
        self.selection = None;
    }

    /// Drops playback state and the completion callback. The animator never draws again.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        log::trace!("Disposing animator of {}", self.source);
        self.disposed = true;
        self.session = None;
        self.on_complete = None;
        self.sheet = Sheet::Failed;
    }

    /// Runs one display refresh worth of playback and draws the result onto `surface`.
    /// Fires the completion callback when this tick returns [`Schedule::Completed`].
    pub fn tick<S: Surface + ?Sized>(&mut self, now: Timestamp, surface: &mut S) -> Schedule {
        let schedule = self.step(now, surface);
        if schedule == Schedule::Completed {
            if let Some(on_complete) = &mut self.on_complete {
                on_complete();
            }
        }

        schedule
    }

    /// Lends the completion callback out, so it can run while the animator is not borrowed.
    pub(crate) fn take_on_complete(&mut self) -> Option<Box<dyn FnMut()>> {
        self.on_complete.take()
    }

    /// Puts a lent callback back, unless it was replaced or the animator got disposed meanwhile.
    pub(crate) fn restore_on_complete(&mut self, on_complete: Box<dyn FnMut()>) {
        if !self.disposed && self.on_complete.is_none() {
            self.on_complete = Some(on_complete);
        }
    }

    /// [`Animator::tick`] without firing the completion callback.
    pub(crate) fn step<S: Surface + ?Sized>(
        &mut self,
        now: Timestamp,
        surface: &mut S,
    ) -> Schedule {
        if self.disposed {
            return Schedule::Stop;
        }

        let image = self.poll_sheet();
        if self.settings.paused {
            return Schedule::Stop;
        }

        let Some(image) = image else {
            return match self.sheet {
                Sheet::Loading(_) => Schedule::NextFrame,
                _ => Schedule::Stop,
            };
        };

        let Some(clip) = self.metadata.clip(&self.requested).copied() else {
            self.report_unknown_clip();
            return Schedule::Stop;
        };
        self.forget_unknown_clip();

        if self
            .session
            .as_ref()
            .is_some_and(|s| s.clip() != self.requested)
        {
            self.session = None;
        }

        let requested = &self.requested;
        let session = self
            .session
            .get_or_insert_with(|| PlaybackSession::new(requested.clone()));

        if session.is_completed() && !self.settings.looping {
            return Schedule::Stop;
        }

        let completed = session.advance(now, &clip, self.settings.looping);
        let frame = session.frame();

        let selection = self.select(&clip, frame);
        self.draw(surface, &image, selection);

        if completed {
            log::debug!("Animation {} completed", self.requested);
            return Schedule::Completed;
        }

        Schedule::NextFrame
    }

    fn poll_sheet(&mut self) -> Option<Arc<SheetImage>> {
        if let Sheet::Loading(pending) = &self.sheet {
            match pending.poll()? {
                Ok(image) => {
                    log::debug!("Loaded sprite sheet {}", self.source);
                    self.sheet = Sheet::Loaded(image);
                }
                Err(reason) => {
                    self.report(AnimatorError::ResourceLoad {
                        sheet: self.source.clone(),
                        reason,
                    });
                    self.sheet = Sheet::Failed;
                }
            }
        }

        match &self.sheet {
            Sheet::Loaded(image) => Some(image.clone()),
            _ => None,
        }
    }

    fn select(&self, clip: &AnimationClip, frame: u32) -> FrameSelection {
        let absolute = clip.start.saturating_add(frame);
        let clamped = self.metadata.clamp_index(absolute);

        FrameSelection {
            frame,
            absolute,
            clamped,
            source: self.metadata.frame_rect(clamped),
        }
    }

    fn draw<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        image: &SheetImage,
        selection: FrameSelection,
    ) {
        surface.clear();

        match surface.blit_scaled(image, selection.source, self.settings.output_size) {
            Ok(()) => self.selection = Some(selection),
            Err(e) => self.report(e.into()),
        }
    }

    fn report_unknown_clip(&mut self) {
        // Once per requested name, the loop stops until the clip changes anyway
        if !self.waits_on_unknown_clip() {
            self.report(AnimatorError::UnknownAnimation(self.requested.clone()));
        }
    }

    fn forget_unknown_clip(&mut self) {
        if matches!(self.last_error, Some(AnimatorError::UnknownAnimation(_))) {
            self.last_error = None;
        }
    }

    fn report(&mut self, error: AnimatorError) {
        log::error!("{error}");
        self.last_error = Some(error);
    }
}
