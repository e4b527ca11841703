use std::time::Instant;

use derive_more::{Deref, Display, From};

/// Time on the display-refresh clock in milliseconds, as handed to frame callbacks.
#[derive(Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deref, From, Display)]
#[display(fmt = "{}ms", _0)]
pub struct Timestamp(pub f64);

impl Timestamp {
    #[inline]
    pub fn millis(self) -> f64 {
        self.0
    }

    /// Milliseconds passed since `earlier`. A clock that went backwards yields zero.
    #[inline]
    pub fn since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0).max(0.)
    }

    #[inline]
    pub fn offset(self, millis: f64) -> Timestamp {
        Timestamp(self.0 + millis)
    }
}

/// Duration of a single frame in milliseconds for a given rate.
///
/// A rate that is zero, negative or not finite never produces a frame, so the
/// resulting duration is infinite.
#[inline]
pub fn frame_duration(fps: f32) -> f64 {
    if fps.is_finite() && fps > 0. {
        1000. / fps as f64
    } else {
        f64::INFINITY
    }
}

/// Current frame number. Will be reset to 0 on overflow.
#[derive(Default, Clone, Copy, Deref, Debug, PartialEq, Eq)]
pub struct Frame(pub u64);

impl Frame {
    #[inline]
    pub fn next(self) -> Frame {
        Frame(self.0.wrapping_add(1))
    }
}

/// Source of display-refresh timestamps.
pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// Wall clock measured from the moment it was created.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Timestamp {
        Timestamp(self.start.elapsed().as_secs_f64() * 1000.)
    }
}

/// A synthetic clock emulating a display that refreshes at a fixed rate.
/// Each call to `now` returns the next refresh, starting at zero.
#[derive(Debug, Clone)]
pub struct SteppedClock {
    next: Timestamp,
    step: f64,
}

impl SteppedClock {
    pub fn new(refresh_rate: f32) -> Self {
        Self::with_step(frame_duration(refresh_rate))
    }

    pub fn with_step(step: f64) -> Self {
        Self {
            next: Timestamp::default(),
            step,
        }
    }
}

impl Clock for SteppedClock {
    fn now(&mut self) -> Timestamp {
        let now = self.next;
        self.next = now.offset(self.step);
        now
    }
}
