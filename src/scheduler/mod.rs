//! Per-frame redraw batching for self-sufficient instances.
//!
//! A [`Scheduler`] owns the pending set, the one outstanding batch frame and
//! the render lock. Instances ask it for redraws; it coalesces them into at
//! most one render per instance per frame.
//!
//! # Example
//!
//! ```ignore
//! let frames = Rc::new(ManualFrames::new());
//! let scheduler = Scheduler::new(frames.clone(), Rc::new(MyRenderer));
//! let counter = scheduler.mount(DomHandle::new(1), Component::new(|| Ok(text("hi"))));
//!
//! counter.request_redraw()?;
//! counter.request_redraw()?; // coalesced
//! frames.tick();             // one render
//! ```

pub mod clock;
mod error;
pub mod frames;
mod instance;
mod pending;
pub mod timer;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::vnode::Vnode;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FrameError, RedrawError, RenderError, ViewError};
pub use frames::{FrameCallback, FrameHandle, FrameHost, ManualFrames};
pub use instance::{Component, Instance, InstanceFlags, InstanceId, InstanceState, ViewResult};
pub use timer::CalloopFrames;

use pending::PendingSet;

/// Opaque handle to the host node an instance renders into.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DomHandle(u64);

impl DomHandle {
    pub fn new(raw: u64) -> Self {
        DomHandle(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The host's render primitive.
pub trait Renderer {
    fn render_into(&self, dom: DomHandle, tree: &Vnode);
}

/// A render that failed during a batch, reported after the batch is done.
#[derive(Debug)]
pub struct RenderFailure {
    pub instance: InstanceId,
    pub error: RenderError,
}

pub type ErrorSink = Rc<dyn Fn(&RenderFailure)>;

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Target spacing between batches. 16ms approximates 60 Hz.
    pub frame_interval: Duration,
    /// Shorten the next delay by the time elapsed since the last batch, so
    /// the cadence does not drift.
    pub compensate_drift: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            compensate_drift: true,
        }
    }
}

pub struct SchedulerBuilder {
    config: SchedulerConfig,
    frames: Rc<dyn FrameHost>,
    renderer: Rc<dyn Renderer>,
    clock: Rc<dyn Clock>,
    error_sink: ErrorSink,
}

impl SchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.config.frame_interval = interval;
        self
    }

    pub fn compensate_drift(mut self, compensate: bool) -> Self {
        self.config.compensate_drift = compensate;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: Rc<C>) -> Self {
        self.clock = clock;
        self
    }

    /// Where batch render failures go. Defaults to `log::error!`.
    pub fn error_sink(mut self, sink: impl Fn(&RenderFailure) + 'static) -> Self {
        self.error_sink = Rc::new(sink);
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            inner: Rc::new(SchedulerInner {
                config: self.config,
                frames: self.frames,
                renderer: self.renderer,
                clock: self.clock,
                error_sink: self.error_sink,
                locked: Cell::new(false),
                state: RefCell::new(SchedulerState::default()),
            }),
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    pending: PendingSet,
    /// Armed iff `pending` is non-empty
    frame: Option<FrameHandle>,
    last_flush: Option<Instant>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    frames: Rc<dyn FrameHost>,
    renderer: Rc<dyn Renderer>,
    clock: Rc<dyn Clock>,
    error_sink: ErrorSink,
    locked: Cell<bool>,
    state: RefCell<SchedulerState>,
}

/// Held while a render is in progress. Released on drop, including unwinds.
pub(crate) struct LockGuard<'a> {
    locked: &'a Cell<bool>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.locked.set(false);
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn builder<F, R>(frames: Rc<F>, renderer: Rc<R>) -> SchedulerBuilder
    where
        F: FrameHost + 'static,
        R: Renderer + 'static,
    {
        SchedulerBuilder {
            config: SchedulerConfig::default(),
            frames,
            renderer,
            clock: Rc::new(SystemClock),
            error_sink: Rc::new(|failure: &RenderFailure| {
                log::error!(
                    "render of instance {:?} failed: {}",
                    failure.instance,
                    failure.error
                );
            }),
        }
    }

    pub fn new<F, R>(frames: Rc<F>, renderer: Rc<R>) -> Self
    where
        F: FrameHost + 'static,
        R: Renderer + 'static,
    {
        Self::builder(frames, renderer).build()
    }

    pub fn with_config<F, R>(config: SchedulerConfig, frames: Rc<F>, renderer: Rc<R>) -> Self
    where
        F: FrameHost + 'static,
        R: Renderer + 'static,
    {
        Self::builder(frames, renderer).config(config).build()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Attach a component to a host node.
    pub fn mount(&self, dom: DomHandle, component: Component) -> Instance {
        let instance = Instance::new(self.clone(), dom, component);
        log::debug!("mounted instance {:?} on {:?}", instance.id(), dom);
        instance
    }

    /// `true` while a batch or synchronous render is running.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.get()
    }

    pub fn is_pending(&self, instance: &Instance) -> bool {
        self.inner.state.borrow().pending.contains(instance.id())
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state.borrow().pending.len()
    }

    pub fn has_scheduled_frame(&self) -> bool {
        self.inner.state.borrow().frame.is_some()
    }

    pub(crate) fn lock(&self) -> Option<LockGuard<'_>> {
        if self.inner.locked.replace(true) {
            return None;
        }
        Some(LockGuard {
            locked: &self.inner.locked,
        })
    }

    pub(crate) fn schedule(&self, instance: &Instance) -> Result<(), RedrawError> {
        if !instance.is_mounted() {
            log::trace!(
                "ignoring redraw request for unmounted instance {:?}",
                instance.id()
            );
            return Ok(());
        }

        let mut state = self.inner.state.borrow_mut();
        if !state.pending.insert(instance.id(), instance.downgrade()) {
            return Ok(());
        }
        if state.frame.is_none()
            && let Err(err) = self.arm(&mut state)
        {
            state.pending.remove(instance.id());
            return Err(err.into());
        }
        Ok(())
    }

    pub(crate) fn render_sync(&self, instance: &Instance) -> Result<(), RedrawError> {
        if !instance.is_mounted() {
            return Err(RedrawError::NotMounted);
        }
        let _lock = self.lock().ok_or(RedrawError::Locked)?;
        self.forget(instance.id());
        instance.render(&*self.inner.renderer)?;
        Ok(())
    }

    /// Drop pending membership, cancelling the batch frame if nothing else
    /// is waiting.
    ///
    /// The state is never borrowed across a view call or an instance drop:
    /// the pending set holds only `Weak` refs and frame callbacks hold no
    /// instances. So the borrow here always succeeds, including from
    /// `Drop for InstanceInner`.
    pub(crate) fn forget(&self, id: InstanceId) {
        let Ok(mut state) = self.inner.state.try_borrow_mut() else {
            debug_assert!(false, "scheduler state borrowed while dropping {:?}", id);
            log::error!("scheduler busy, could not drop instance {:?}", id);
            return;
        };
        if state.pending.remove(id)
            && state.pending.is_empty()
            && let Some(frame) = state.frame.take()
        {
            self.inner.frames.cancel_frame(frame);
            log::trace!("cancelled batch frame {:?}", frame);
        }
    }

    fn arm(&self, state: &mut SchedulerState) -> Result<(), FrameError> {
        let delay = self.next_delay(state.last_flush);
        let scheduler = Rc::downgrade(&self.inner);
        let frame = self.inner.frames.request_frame(
            delay,
            Box::new(move || {
                if let Some(inner) = scheduler.upgrade() {
                    Scheduler { inner }.flush_batch();
                }
            }),
        )?;
        log::trace!("armed batch frame {:?} in {:?}", frame, delay);
        state.frame = Some(frame);
        Ok(())
    }

    fn next_delay(&self, last_flush: Option<Instant>) -> Duration {
        let interval = self.inner.config.frame_interval;
        if !self.inner.config.compensate_drift {
            return interval;
        }
        match last_flush {
            Some(last) => {
                interval.saturating_sub(self.inner.clock.now().saturating_duration_since(last))
            }
            None => Duration::ZERO,
        }
    }

    fn flush_batch(&self) {
        let Some(lock) = self.lock() else {
            // Fired from inside a render that pumps the event loop
            log::debug!("batch frame fired while locked, deferring");
            let mut state = self.inner.state.borrow_mut();
            state.frame = None;
            if !state.pending.is_empty()
                && let Err(err) = self.arm(&mut state)
            {
                log::error!("could not re-arm batch frame: {}", err);
            }
            return;
        };

        let batch = {
            let mut state = self.inner.state.borrow_mut();
            state.frame = None;
            state.pending.drain()
        };

        let mut rendered = 0;
        let mut failures = Vec::new();
        for instance in batch
            .into_iter()
            .filter_map(|weak| weak.upgrade())
            .map(Instance::from_inner)
        {
            if !instance.is_mounted() {
                continue;
            }
            rendered += 1;
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| instance.render(&*self.inner.renderer)));
            let result = outcome
                .unwrap_or_else(|payload| Err(RenderError::Panicked(panic_message(&*payload))));
            if let Err(error) = result {
                failures.push(RenderFailure {
                    instance: instance.id(),
                    error,
                });
            }
        }
        drop(lock);

        self.inner.state.borrow_mut().last_flush = Some(self.inner.clock.now());
        log::trace!(
            "flushed batch: {} rendered, {} failed",
            rendered,
            failures.len()
        );
        self.report(failures);
    }

    /// Hand failures to the error sink on a later frame, outside the batch.
    fn report(&self, failures: Vec<RenderFailure>) {
        if failures.is_empty() {
            return;
        }

        let queued = Rc::new(RefCell::new(failures));
        let sink = self.inner.error_sink.clone();
        let deliver = {
            let queued = queued.clone();
            let sink = sink.clone();
            move || {
                for failure in queued.take() {
                    sink(&failure);
                }
            }
        };

        if let Err(err) = self
            .inner
            .frames
            .request_frame(Duration::ZERO, Box::new(deliver))
        {
            log::warn!("could not defer render failures: {}", err);
            for failure in queued.take() {
                sink(&failure);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::text;

    struct NullRenderer;

    impl Renderer for NullRenderer {
        fn render_into(&self, _dom: DomHandle, _tree: &Vnode) {}
    }

    fn setup(clock: Rc<ManualClock>) -> (Rc<ManualFrames>, Scheduler) {
        let frames = Rc::new(ManualFrames::new());
        let scheduler = Scheduler::builder(frames.clone(), Rc::new(NullRenderer))
            .clock(clock)
            .build();
        (frames, scheduler)
    }

    fn mount(scheduler: &Scheduler) -> Instance {
        scheduler.mount(DomHandle::new(1), Component::new(|| Ok(text("x"))))
    }

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert!(config.compensate_drift);
    }

    #[test]
    fn test_first_frame_is_immediate() {
        let (frames, scheduler) = setup(Rc::new(ManualClock::new()));
        let instance = mount(&scheduler);

        instance.request_redraw().unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_delay_compensates_for_elapsed_time() {
        let clock = Rc::new(ManualClock::new());
        let (frames, scheduler) = setup(clock.clone());
        let instance = mount(&scheduler);

        instance.request_redraw().unwrap();
        frames.tick();

        clock.advance(Duration::from_millis(6));
        instance.request_redraw().unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::from_millis(10)));
        frames.tick();

        clock.advance(Duration::from_millis(40));
        instance.request_redraw().unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_fixed_delay_without_compensation() {
        let frames = Rc::new(ManualFrames::new());
        let scheduler = Scheduler::builder(frames.clone(), Rc::new(NullRenderer))
            .frame_interval(Duration::from_millis(33))
            .compensate_drift(false)
            .build();
        let instance = mount(&scheduler);

        instance.request_redraw().unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::from_millis(33)));
    }

    #[test]
    fn test_with_config() {
        let frames = Rc::new(ManualFrames::new());
        let config = SchedulerConfig {
            frame_interval: Duration::from_millis(40),
            compensate_drift: false,
        };
        let scheduler = Scheduler::with_config(config, frames.clone(), Rc::new(NullRenderer));
        assert_eq!(scheduler.config().frame_interval, Duration::from_millis(40));
        assert!(!scheduler.config().compensate_drift);

        let instance = mount(&scheduler);
        instance.request_redraw().unwrap();
        assert_eq!(frames.last_delay(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_lock_is_exclusive() {
        let (_frames, scheduler) = setup(Rc::new(ManualClock::new()));
        let guard = scheduler.lock();
        assert!(guard.is_some());
        assert!(scheduler.is_locked());
        assert!(scheduler.lock().is_none());
        assert!(scheduler.is_locked());
        drop(guard);
        assert!(!scheduler.is_locked());
    }

    #[test]
    fn test_dropping_last_handle_purges_pending() {
        let (frames, scheduler) = setup(Rc::new(ManualClock::new()));
        let instance = mount(&scheduler);
        instance.request_redraw().unwrap();
        assert!(scheduler.has_scheduled_frame());

        drop(instance);

        assert_eq!(scheduler.pending_len(), 0);
        assert!(!scheduler.has_scheduled_frame());
        assert_eq!(frames.cancelled(), 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
