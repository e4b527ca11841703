pub mod animator;
pub mod player;
mod session;

pub use animator::{
    Animator, AnimatorError, AnimatorSettings, AnimatorState, FrameSelection, Schedule,
};
pub use player::SpritePlayer;
pub use session::PlaybackSession;

#[cfg(test)]
pub(crate) mod testing;
