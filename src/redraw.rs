//! Redraw triggers for code that updates synchronously, such as store
//! observers, and must not redraw before the instance is ready.
//!
//! Call [`Redraw::ready`] once the target has been created. Calls made
//! before that are dropped. [`Redraw::lock`] and `ready` can also bracket a
//! host update to skip redundant requests.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::{FrameHost, Instance};

/// Something that can be asked to redraw.
pub trait RedrawTarget {
    fn redraw(&self);
}

impl RedrawTarget for Instance {
    fn redraw(&self) {
        if let Err(err) = self.request_redraw() {
            log::warn!("redraw of instance {:?} failed: {}", self.id(), err);
        }
    }
}

impl<F> RedrawTarget for F
where
    F: Fn(),
{
    fn redraw(&self) {
        self()
    }
}

#[derive(Clone)]
pub struct Redraw {
    ready: Rc<Cell<bool>>,
    target: Rc<dyn RedrawTarget>,
}

impl Redraw {
    pub fn new(target: impl RedrawTarget + 'static) -> Self {
        Self {
            ready: Rc::new(Cell::new(false)),
            target: Rc::new(target),
        }
    }

    /// Redraw through a global host redraw, deferred to the next frame so
    /// it never runs inside the update that triggered it.
    pub fn deferred<H>(frames: Rc<H>, redraw: impl Fn() + 'static) -> Self
    where
        H: FrameHost + 'static,
    {
        let redraw = Rc::new(redraw);
        Self::new(move || {
            let redraw = redraw.clone();
            if let Err(err) = frames.request_frame(Duration::ZERO, Box::new(move || redraw())) {
                log::warn!("could not defer global redraw: {}", err);
            }
        })
    }

    pub fn ready(&self) {
        self.ready.set(true);
    }

    pub fn lock(&self) {
        self.ready.set(false);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    pub fn call(&self) {
        if self.ready.get() {
            self.target.redraw();
        }
    }
}

pub fn create_redraw(target: impl RedrawTarget + 'static) -> Redraw {
    Redraw::new(target)
}
