//! Fixed-delay frame host on top of a calloop event loop.
//!
//! Used when the environment has no vsync primitive. Each request becomes a
//! one-shot calloop timer, so the scheduler's ~16ms pacing is honored.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};

use super::error::FrameError;
use super::frames::{FrameCallback, FrameHandle, FrameHost};

pub struct CalloopFrames<D: 'static> {
    handle: LoopHandle<'static, D>,
    tokens: Rc<RefCell<HashMap<FrameHandle, RegistrationToken>>>,
    next_id: Cell<u64>,
}

impl<D: 'static> CalloopFrames<D> {
    pub fn new(handle: LoopHandle<'static, D>) -> Self {
        Self {
            handle,
            tokens: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(0),
        }
    }

    /// Number of timers still armed.
    pub fn armed(&self) -> usize {
        self.tokens.borrow().len()
    }
}

impl<D: 'static> FrameHost for CalloopFrames<D> {
    fn request_frame(
        &self,
        delay: Duration,
        callback: FrameCallback,
    ) -> Result<FrameHandle, FrameError> {
        let frame = FrameHandle::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        let tokens = self.tokens.clone();
        let mut callback = Some(callback);
        let token = self
            .handle
            .insert_source(Timer::from_duration(delay), move |_, _, _| {
                tokens.borrow_mut().remove(&frame);
                if let Some(callback) = callback.take() {
                    callback();
                }
                TimeoutAction::Drop
            })
            .map_err(|err| FrameError::Host(err.error.to_string()))?;

        self.tokens.borrow_mut().insert(frame, token);
        log::trace!("armed frame timer {:?} in {:?}", frame, delay);
        Ok(frame)
    }

    fn cancel_frame(&self, frame: FrameHandle) {
        let token = self.tokens.borrow_mut().remove(&frame);
        if let Some(token) = token {
            self.handle.remove(token);
            log::trace!("cancelled frame timer {:?}", frame);
        }
    }
}
