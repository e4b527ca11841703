use flipbook_assets::AnimationClip;
use flipbook_core::Timestamp;

/// Playback position within one clip-run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    clip: String,
    frame: u32,
    /// `None` until the first tick of a run, and again after a resume.
    last_advance: Option<Timestamp>,
    completed: bool,
}

impl PlaybackSession {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            frame: 0,
            last_advance: None,
            completed: false,
        }
    }

    #[inline]
    pub fn clip(&self) -> &str {
        &self.clip
    }

    /// Frame index relative to the start of the clip.
    #[inline]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Makes the next tick behave like the first one: it shows the current
    /// frame and only sets the timing baseline.
    pub fn rebase(&mut self) {
        self.last_advance = None;
    }

    pub fn restart(&mut self) {
        self.completed = false;
        self.rebase();
    }

    /// Moves the session forward to `now`. Advances at most one frame no matter
    /// how much time passed. Returns true exactly once per run, on the tick a
    /// non-looping clip lands on its last frame.
    pub fn advance(&mut self, now: Timestamp, clip: &AnimationClip, looping: bool) -> bool {
        let frame_count = clip.frame_count();

        match self.last_advance {
            None => self.last_advance = Some(now),
            Some(last) if now.since(last) >= clip.frame_duration() => {
                self.last_advance = Some(now);
                self.frame += 1;
            }
            Some(_) => {}
        }

        if self.frame >= frame_count {
            self.frame = match looping {
                true => 0,
                false => frame_count - 1,
            };
        }

        if looping || self.completed || !clip.is_last_frame(self.frame) {
            return false;
        }

        self.completed = true;
        true
    }
}
