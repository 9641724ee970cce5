use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use super::error::{RedrawError, RenderError, ViewError};
use super::{DomHandle, Renderer, Scheduler};
use crate::event::{EventListener, Handler};
use crate::vnode::{Attrs, Vnode, censor, h, validate_subtree};

/// Identity of a mounted instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct InstanceId(u64);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

impl InstanceId {
    pub fn next() -> Self {
        InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InstanceFlags: u8 {
        /// The view callback is running
        const RENDERING = 0b01;
        /// Torn down; never schedulable again
        const DETACHED  = 0b10;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Unmounted,
    Idle,
    Pending,
    Rendering,
}

pub type ViewResult = Result<Vnode, ViewError>;

/// What an instance renders, plus its optional update hooks.
pub struct Component {
    tag: String,
    attrs: Attrs,
    view: Box<dyn FnMut() -> ViewResult>,
    before_update: Option<Box<dyn FnMut() -> bool>>,
    on_update: Option<Box<dyn FnMut()>>,
}

impl Component {
    pub fn new(view: impl FnMut() -> ViewResult + 'static) -> Self {
        Self {
            tag: "div".to_string(),
            attrs: Attrs::new(),
            view: Box::new(view),
            before_update: None,
            on_update: None,
        }
    }

    /// Tag of the wrapper element the host renders around the view.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Attributes of the wrapper element. Lifecycle attributes are dropped.
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Called before each scheduled render; returning `false` skips it.
    pub fn on_before_update(mut self, f: impl FnMut() -> bool + 'static) -> Self {
        self.before_update = Some(Box::new(f));
        self
    }

    /// Called after each successful scheduled render.
    pub fn on_update(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }
}

pub(crate) struct InstanceInner {
    id: InstanceId,
    scheduler: Scheduler,
    dom: Cell<Option<DomHandle>>,
    flags: Cell<InstanceFlags>,
    component: RefCell<Component>,
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        self.scheduler.forget(self.id);
    }
}

/// A component whose redraws are batched by its [`Scheduler`] instead of
/// the host's global redraw.
///
/// Clones share the same instance. The instance is torn down by
/// [`unmount`](Instance::unmount) or when the last handle is dropped.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

struct RenderingGuard<'a> {
    flags: &'a Cell<InstanceFlags>,
}

impl<'a> RenderingGuard<'a> {
    fn enter(flags: &'a Cell<InstanceFlags>) -> Self {
        flags.set(flags.get() | InstanceFlags::RENDERING);
        Self { flags }
    }
}

impl Drop for RenderingGuard<'_> {
    fn drop(&mut self) {
        self.flags
            .set(self.flags.get().difference(InstanceFlags::RENDERING));
    }
}

impl Instance {
    pub(crate) fn new(scheduler: Scheduler, dom: DomHandle, component: Component) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                id: InstanceId::next(),
                scheduler,
                dom: Cell::new(Some(dom)),
                flags: Cell::new(InstanceFlags::empty()),
                component: RefCell::new(component),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<InstanceInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// The host handle this instance renders into, `None` once unmounted.
    pub fn dom(&self) -> Option<DomHandle> {
        self.inner.dom.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.dom.get().is_some()
    }

    pub fn flags(&self) -> InstanceFlags {
        self.inner.flags.get()
    }

    pub fn is_rendering(&self) -> bool {
        self.flags().contains(InstanceFlags::RENDERING)
    }

    pub fn state(&self) -> InstanceState {
        if !self.is_mounted() {
            InstanceState::Unmounted
        } else if self.is_rendering() {
            InstanceState::Rendering
        } else if self.inner.scheduler.is_pending(self) {
            InstanceState::Pending
        } else {
            InstanceState::Idle
        }
    }

    /// Ask for a redraw on the next frame. Repeated requests before the
    /// frame coalesce into one render. Unmounted instances are ignored.
    pub fn request_redraw(&self) -> Result<(), RedrawError> {
        self.inner.scheduler.schedule(self)
    }

    /// Render right now, bypassing the batch.
    ///
    /// Fails with [`RedrawError::Locked`] while any render is in progress,
    /// including when called from a view callback. A failed render is not
    /// re-queued.
    pub fn redraw_sync(&self) -> Result<(), RedrawError> {
        self.inner.scheduler.render_sync(self)
    }

    /// Whether [`redraw_sync`](Instance::redraw_sync) would be accepted now.
    pub fn is_safe(&self) -> bool {
        self.is_mounted() && !self.inner.scheduler.is_locked()
    }

    /// Wrap an event listener so that handling an event requests a redraw
    /// of this instance, unless the listener cleared `event.redraw`.
    pub fn link(&self, listener: impl EventListener + 'static) -> Handler {
        let instance = self.downgrade();
        Handler::new(move |event| {
            listener.handle_event(event);
            if !event.redraw {
                return;
            }
            event.redraw = false;
            if let Some(inner) = instance.upgrade() {
                let instance = Instance::from_inner(inner);
                if let Err(err) = instance.request_redraw() {
                    log::warn!(
                        "redraw after {:?} on instance {:?} failed: {}",
                        event.name,
                        instance.id(),
                        err
                    );
                }
            }
        })
    }

    /// Detach from the host. Drops any pending redraw; later requests are
    /// ignored and [`redraw_sync`](Instance::redraw_sync) fails.
    pub fn unmount(&self) {
        let was_mounted = self.inner.dom.take().is_some();
        self.inner
            .flags
            .set(self.flags() | InstanceFlags::DETACHED);
        self.inner.scheduler.forget(self.id());
        if was_mounted {
            log::debug!("unmounted instance {:?}", self.id());
        }
    }

    /// Build the wrapper element for a redraw driven by the host itself.
    ///
    /// The host's render supersedes any batched redraw, so pending
    /// membership is dropped.
    pub fn view(&self) -> Result<Vnode, RedrawError> {
        if !self.is_mounted() {
            return Err(RedrawError::NotMounted);
        }
        let scheduler = &self.inner.scheduler;
        let _lock = scheduler.lock().ok_or(RedrawError::Locked)?;
        scheduler.forget(self.id());

        let _rendering = RenderingGuard::enter(&self.inner.flags);
        let mut component = self.inner.component.borrow_mut();
        let children = (component.view)().map_err(RenderError::View)?;
        validate_subtree(&children).map_err(RenderError::from)?;

        let attrs = censor(&component.attrs, &[]).into_owned();
        Ok(h(component.tag.clone()).attrs(attrs).child(children).into())
    }

    /// Run the update hooks and view, then hand the tree to the renderer.
    /// Callers hold the scheduler lock.
    pub(crate) fn render(&self, renderer: &dyn Renderer) -> Result<(), RenderError> {
        let Some(dom) = self.dom() else {
            return Ok(());
        };

        let _rendering = RenderingGuard::enter(&self.inner.flags);
        let mut guard = self.inner.component.borrow_mut();
        let component = &mut *guard;

        if let Some(before_update) = component.before_update.as_mut()
            && !before_update()
        {
            log::trace!("instance {:?} skipped its update", self.id());
            return Ok(());
        }

        let tree = (component.view)().map_err(RenderError::View)?;
        validate_subtree(&tree)?;

        // Unmounted by its own view callback
        if !self.is_mounted() {
            return Ok(());
        }
        renderer.render_into(dom, &tree);

        if let Some(on_update) = component.on_update.as_mut() {
            on_update();
        }
        Ok(())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id())
            .field("dom", &self.dom())
            .field("flags", &self.flags())
            .finish()
    }
}
