pub mod event;
pub mod redraw;
pub mod scheduler;
pub mod store;
pub mod vnode;

pub mod prelude {
    pub use crate::event::{Event, EventListener, Handler};
    pub use crate::redraw::{Redraw, RedrawTarget, create_redraw};
    pub use crate::scheduler::{
        CalloopFrames, Component, DomHandle, FrameHost, Instance, InstanceState, ManualFrames,
        RedrawError, RenderError, RenderFailure, Renderer, Scheduler, SchedulerConfig, ViewResult,
    };
    pub use crate::store::{Store, create_store};
    pub use crate::vnode::{
        AttrValue, Attrs, Case, Element, Fragment, Key, Vnode, censor, cond, each, fragment, h,
        link, match_value, text, when,
    };
}
