use std::{cell::RefCell, collections::VecDeque};

use derive_more::Display;
use flipbook_core::{Clock, Frame, Timestamp};

/// Identifies a requested frame callback, can be used to cancel it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display(fmt = "#{}", _0)]
pub struct FrameHandle(u64);

type Callback = Box<dyn FnOnce(Timestamp)>;

#[derive(Default)]
struct Queue {
    next_handle: u64,
    frame: Frame,
    /// Callbacks of the frame that is currently running
    current: VecDeque<(FrameHandle, Callback)>,
    /// Callbacks requested for the next frame
    next: Vec<(FrameHandle, Callback)>,
}

/// A display-refresh driven callback queue.
///
/// Callbacks are requested for the next frame and run once, in request order,
/// when the host calls [`FrameScheduler::run_frame`] on a display refresh.
/// Anything requested while a frame is running goes to the following frame,
/// so a callback re-requesting itself runs once per refresh.
///
/// The scheduler is single-threaded. It is meant to be shared as an `Rc`, and
/// callbacks are free to request or cancel frames while it runs them.
#[derive(Default)]
pub struct FrameScheduler {
    queue: RefCell<Queue>,
}

impl FrameScheduler {
    pub fn request_frame(&self, callback: impl FnOnce(Timestamp) + 'static) -> FrameHandle {
        let mut queue = self.queue.borrow_mut();
        let handle = FrameHandle(queue.next_handle);
        queue.next_handle += 1;
        queue.next.push((handle, Box::new(callback)));
        handle
    }

    /// Cancels a callback that has not run yet. Returns false if there was nothing to cancel.
    pub fn cancel(&self, handle: FrameHandle) -> bool {
        let mut queue = self.queue.borrow_mut();

        if let Some(index) = queue.next.iter().position(|(h, _)| *h == handle) {
            queue.next.remove(index);
            return true;
        }

        if let Some(index) = queue.current.iter().position(|(h, _)| *h == handle) {
            queue.current.remove(index);
            return true;
        }

        false
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        let queue = self.queue.borrow();
        queue.next.iter().any(|(h, _)| *h == handle)
            || queue.current.iter().any(|(h, _)| *h == handle)
    }

    /// Number of callbacks waiting for a frame.
    pub fn pending(&self) -> usize {
        let queue = self.queue.borrow();
        queue.next.len() + queue.current.len()
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> Frame {
        self.queue.borrow().frame
    }

    /// Runs every callback requested before this call. Returns how many ran.
    pub fn run_frame(&self, now: Timestamp) -> usize {
        {
            let mut queue = self.queue.borrow_mut();
            let Queue { current, next, .. } = &mut *queue;
            current.extend(next.drain(..));
            queue.frame = queue.frame.next();
        }

        let mut ran = 0;
        loop {
            // The queue must not stay borrowed while a callback runs
            let next = self.queue.borrow_mut().current.pop_front();
            let Some((_, callback)) = next else {
                break;
            };

            callback(now);
            ran += 1;
        }

        log::trace!("Frame {} at {now} ran {ran} callbacks", *self.frame());
        ran
    }

    /// Keeps running frames on `clock` until nothing is pending or `max_frames` frames ran.
    /// Returns the number of frames run.
    pub fn run_until_idle(&self, clock: &mut impl Clock, max_frames: u64) -> u64 {
        let mut frames = 0;
        while frames < max_frames && self.pending() > 0 {
            self.run_frame(clock.now());
            frames += 1;
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use flipbook_core::SteppedClock;

    use super::*;

    fn recorder() -> Rc<RefCell<Vec<(&'static str, f64)>>> {
        Default::default()
    }

    #[test]
    fn test_runs_in_request_order() {
        let scheduler = FrameScheduler::default();
        let log = recorder();

        for name in ["a", "b", "c"] {
            let log = log.clone();
            scheduler.request_frame(move |now| log.borrow_mut().push((name, *now)));
        }

        assert_eq!(scheduler.run_frame(Timestamp(16.)), 3);
        assert_eq!(*log.borrow(), vec![("a", 16.), ("b", 16.), ("c", 16.)]);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.frame(), Frame(1));
    }

    #[test]
    fn test_cancel() {
        let scheduler = FrameScheduler::default();
        let log = recorder();

        let handle = scheduler.request_frame({
            let log = log.clone();
            move |now| log.borrow_mut().push(("cancelled", *now))
        });

        assert!(scheduler.is_pending(handle));
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.is_pending(handle));
        assert!(!scheduler.cancel(handle));

        assert_eq!(scheduler.run_frame(Timestamp(0.)), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_rerequest_runs_on_next_frame() {
        let scheduler = Rc::new(FrameScheduler::default());
        let log = recorder();

        fn tick(scheduler: Rc<FrameScheduler>, log: Rc<RefCell<Vec<(&'static str, f64)>>>) {
            scheduler.clone().request_frame(move |now| {
                log.borrow_mut().push(("tick", *now));
                tick(scheduler, log);
            });
        }

        tick(scheduler.clone(), log.clone());

        assert_eq!(scheduler.run_frame(Timestamp(0.)), 1);
        assert_eq!(scheduler.run_frame(Timestamp(16.)), 1);
        assert_eq!(*log.borrow(), vec![("tick", 0.), ("tick", 16.)]);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_callback_cancels_later_callback_of_same_frame() {
        let scheduler = Rc::new(FrameScheduler::default());
        let log = recorder();

        let victim: Rc<RefCell<Option<FrameHandle>>> = Default::default();

        scheduler.request_frame({
            let scheduler = scheduler.clone();
            let victim = victim.clone();
            move |_| {
                let handle = victim.borrow_mut().take().unwrap();
                assert!(scheduler.cancel(handle));
            }
        });

        let handle = scheduler.request_frame({
            let log = log.clone();
            move |now| log.borrow_mut().push(("victim", *now))
        });
        *victim.borrow_mut() = Some(handle);

        assert_eq!(scheduler.run_frame(Timestamp(0.)), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_run_until_idle() {
        let scheduler = Rc::new(FrameScheduler::default());
        let remaining = Rc::new(RefCell::new(3));

        fn countdown(scheduler: Rc<FrameScheduler>, remaining: Rc<RefCell<i32>>) {
            scheduler.clone().request_frame(move |_| {
                *remaining.borrow_mut() -= 1;
                if *remaining.borrow() > 0 {
                    countdown(scheduler, remaining);
                }
            });
        }

        countdown(scheduler.clone(), remaining.clone());

        let mut clock = SteppedClock::new(60.);
        assert_eq!(scheduler.run_until_idle(&mut clock, 100), 3);
        assert_eq!(*remaining.borrow(), 0);

        // Bounded when something keeps re-requesting forever
        *remaining.borrow_mut() = i32::MAX;
        countdown(scheduler.clone(), remaining.clone());
        assert_eq!(scheduler.run_until_idle(&mut clock, 5), 5);
    }
}
