//! Frame hosts: the primitive the scheduler uses to run work on the next
//! display frame.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::FrameError;

/// Work to run on a future frame.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifies one outstanding frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(raw: u64) -> Self {
        FrameHandle(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The host's frame-scheduling primitive.
///
/// Hosts with a real vsync signal may ignore `delay` and fire on the next
/// frame. Timer-based hosts wait `delay` before firing.
///
/// `request_frame` must not run `callback` before it returns.
pub trait FrameHost {
    fn request_frame(
        &self,
        delay: Duration,
        callback: FrameCallback,
    ) -> Result<FrameHandle, FrameError>;

    /// Cancel a request. Unknown or already-fired handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

struct QueuedFrame {
    delay: Duration,
    callback: FrameCallback,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    queued: BTreeMap<FrameHandle, QueuedFrame>,
    requested: usize,
    cancelled: usize,
}

/// A frame host driven by explicit [`tick`](ManualFrames::tick) calls.
///
/// Useful for headless hosts that pump frames themselves, and for tests.
#[derive(Default)]
pub struct ManualFrames {
    state: RefCell<ManualState>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback queued before this call, in request order.
    /// Callbacks requested while ticking wait for the next tick.
    ///
    /// Returns how many callbacks ran.
    pub fn tick(&self) -> usize {
        let due = std::mem::take(&mut self.state.borrow_mut().queued);
        let count = due.len();
        for (_, frame) in due {
            (frame.callback)();
        }
        count
    }

    /// Number of callbacks waiting for the next tick.
    pub fn queued(&self) -> usize {
        self.state.borrow().queued.len()
    }

    /// Delay of the most recently requested frame still queued.
    pub fn last_delay(&self) -> Option<Duration> {
        self.state
            .borrow()
            .queued
            .values()
            .next_back()
            .map(|frame| frame.delay)
    }

    /// Total number of frames ever requested.
    pub fn requested(&self) -> usize {
        self.state.borrow().requested
    }

    /// Total number of queued frames cancelled before running.
    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl FrameHost for ManualFrames {
    fn request_frame(
        &self,
        delay: Duration,
        callback: FrameCallback,
    ) -> Result<FrameHandle, FrameError> {
        let mut state = self.state.borrow_mut();
        let handle = FrameHandle(state.next_id);
        state.next_id += 1;
        state.requested += 1;
        state.queued.insert(handle, QueuedFrame { delay, callback });
        Ok(handle)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        if state.queued.remove(&handle).is_some() {
            state.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_tick_runs_in_request_order() {
        let frames = ManualFrames::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            frames
                .request_frame(Duration::ZERO, Box::new(move || order.borrow_mut().push(n)))
                .unwrap();
        }

        assert_eq!(frames.tick(), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(frames.queued(), 0);
    }

    #[test]
    fn test_cancel_prevents_callback() {
        let frames = ManualFrames::new();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();

        let handle = frames
            .request_frame(Duration::from_millis(16), Box::new(move || flag.set(true)))
            .unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::from_millis(16)));

        frames.cancel_frame(handle);
        frames.cancel_frame(handle);

        assert_eq!(frames.tick(), 0);
        assert!(!ran.get());
        assert_eq!(frames.cancelled(), 1);
    }

    #[test]
    fn test_requests_during_tick_wait() {
        let frames = Rc::new(ManualFrames::new());
        let inner = frames.clone();
        frames
            .request_frame(
                Duration::ZERO,
                Box::new(move || {
                    inner.request_frame(Duration::ZERO, Box::new(|| {})).unwrap();
                }),
            )
            .unwrap();

        assert_eq!(frames.tick(), 1);
        assert_eq!(frames.queued(), 1);
        assert_eq!(frames.requested(), 2);
    }
}
