use std::{
    cell::{Ref, RefCell},
    rc::{Rc, Weak},
};

use flipbook_assets::{ImageLoader, SheetSource, SpriteSheetMetadata};
use flipbook_geometry::Size;
use flipbook_scheduler::{FrameHandle, FrameScheduler};
use flipbook_surface::Surface;

use crate::animator::{Animator, Schedule};

struct Mounted<L: ImageLoader, S> {
    animator: Animator<L>,
    surface: S,
    /// The tick waiting for the next display refresh, if any
    pending: Option<FrameHandle>,
}

/// An [`Animator`] mounted on a [`FrameScheduler`] together with the surface it draws on.
///
/// The player keeps at most one tick scheduled. Every change that could affect
/// playback cancels the pending tick before scheduling a fresh one, so a player
/// never runs two render loops. Dropping the player disposes it.
///
/// The completion callback runs after the player is released, so it may change
/// the player, e.g. switch to the next clip.
pub struct SpritePlayer<L: ImageLoader + 'static, S: Surface + 'static> {
    scheduler: Rc<FrameScheduler>,
    mounted: Rc<RefCell<Mounted<L, S>>>,
}

impl<L: ImageLoader + 'static, S: Surface + 'static> SpritePlayer<L, S> {
    pub fn mount(scheduler: Rc<FrameScheduler>, animator: Animator<L>, surface: S) -> Self {
        let player = Self {
            scheduler,
            mounted: Rc::new(RefCell::new(Mounted {
                animator,
                surface,
                pending: None,
            })),
        };

        player.reschedule();
        player
    }

    pub fn animator(&self) -> Ref<'_, Animator<L>> {
        Ref::map(self.mounted.borrow(), |m| &m.animator)
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.mounted.borrow().surface)
    }

    /// True if a tick is waiting for the next display refresh.
    pub fn is_scheduled(&self) -> bool {
        self.mounted
            .borrow()
            .pending
            .is_some_and(|handle| self.scheduler.is_pending(handle))
    }

    pub fn set_clip(&self, clip: impl Into<String>) {
        self.update(|animator| animator.set_clip(clip));
    }

    pub fn set_paused(&self, paused: bool) {
        self.update(|animator| animator.set_paused(paused));
    }

    pub fn set_looping(&self, looping: bool) {
        self.update(|animator| animator.set_looping(looping));
    }

    pub fn set_output_size(&self, output_size: Size) {
        self.update(|animator| animator.set_output_size(output_size));
    }

    pub fn set_metadata(&self, metadata: SpriteSheetMetadata) {
        self.update(|animator| animator.set_metadata(metadata));
    }

    pub fn set_source(&self, source: impl Into<SheetSource>) {
        self.update(|animator| animator.set_source(source));
    }

    /// Cancels the pending tick and disposes the animator. Nothing is drawn
    /// and no callback fires afterwards.
    pub fn dispose(&self) {
        let mut mounted = self.mounted.borrow_mut();
        if let Some(handle) = mounted.pending.take() {
            self.scheduler.cancel(handle);
        }
        mounted.animator.dispose();
    }

    fn update(&self, f: impl FnOnce(&mut Animator<L>)) {
        f(&mut self.mounted.borrow_mut().animator);
        self.reschedule();
    }

    fn reschedule(&self) {
        reschedule(&self.scheduler, &self.mounted);
    }
}

impl<L: ImageLoader + 'static, S: Surface + 'static> Drop for SpritePlayer<L, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn reschedule<L: ImageLoader + 'static, S: Surface + 'static>(
    scheduler: &Rc<FrameScheduler>,
    mounted: &Rc<RefCell<Mounted<L, S>>>,
) {
    let wants_frames = {
        let mut mounted = mounted.borrow_mut();
        if let Some(handle) = mounted.pending.take() {
            scheduler.cancel(handle);
        }
        mounted.animator.wants_frames()
    };

    if wants_frames {
        schedule(scheduler, mounted);
    }
}

fn schedule<L: ImageLoader + 'static, S: Surface + 'static>(
    scheduler: &Rc<FrameScheduler>,
    mounted: &Rc<RefCell<Mounted<L, S>>>,
) {
    let weak_scheduler: Weak<FrameScheduler> = Rc::downgrade(scheduler);
    let weak_mounted = Rc::downgrade(mounted);

    let handle = scheduler.request_frame(move |now| {
        let (Some(scheduler), Some(mounted)) = (weak_scheduler.upgrade(), weak_mounted.upgrade())
        else {
            return;
        };

        let (next, on_complete) = {
            let mut mounted = mounted.borrow_mut();
            mounted.pending = None;

            let Mounted {
                animator, surface, ..
            } = &mut *mounted;
            let next = animator.step(now, surface);
            let on_complete = match next {
                Schedule::Completed => animator.take_on_complete(),
                _ => None,
            };
            (next, on_complete)
        };

        match next {
            Schedule::NextFrame => schedule(&scheduler, &mounted),
            Schedule::Stop => {}
            Schedule::Completed => {
                if let Some(mut on_complete) = on_complete {
                    on_complete();
                    mounted.borrow_mut().animator.restore_on_complete(on_complete);
                }
                // The callback may have changed what should play next
                reschedule(&scheduler, &mounted);
            }
        }
    });

    mounted.borrow_mut().pending = Some(handle);
}
