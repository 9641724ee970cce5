use std::fmt;
use std::rc::Rc;

use crate::scheduler::DomHandle;

/// An event delivered by the host to a handler attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub name: String,
    pub current_target: Option<DomHandle>,
    /// Set to `false` to suppress the redraw that normally follows the event.
    pub redraw: bool,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_target: None,
            redraw: true,
        }
    }

    pub fn with_target(mut self, target: DomHandle) -> Self {
        self.current_target = Some(target);
        self
    }
}

/// Object form of an event callback.
pub trait EventListener {
    fn handle_event(&self, event: &mut Event);
}

impl<F> EventListener for F
where
    F: Fn(&mut Event),
{
    fn handle_event(&self, event: &mut Event) {
        self(event)
    }
}

/// A shareable event handler, stored in attributes as
/// [`AttrValue::Handler`](crate::vnode::AttrValue::Handler).
///
/// Two handlers are equal when they are the same allocation.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&mut Event)>);

impl Handler {
    pub fn new(f: impl Fn(&mut Event) + 'static) -> Self {
        Handler(Rc::new(f))
    }

    pub fn from_listener(listener: impl EventListener + 'static) -> Self {
        Handler::new(move |event| listener.handle_event(event))
    }

    pub fn call(&self, event: &mut Event) {
        (self.0)(event)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&Rc::as_ptr(&self.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        hits: Rc<Cell<u32>>,
    }

    impl EventListener for Counter {
        fn handle_event(&self, event: &mut Event) {
            self.hits.set(self.hits.get() + 1);
            event.redraw = false;
        }
    }

    #[test]
    fn test_events_redraw_by_default() {
        assert!(Event::new("click").redraw);
    }

    #[test]
    fn test_listener_object_form() {
        let hits = Rc::new(Cell::new(0));
        let handler = Handler::from_listener(Counter { hits: hits.clone() });

        let mut event = Event::new("input");
        handler.call(&mut event);

        assert_eq!(hits.get(), 1);
        assert!(!event.redraw);
    }

    #[test]
    fn test_handler_identity() {
        let a = Handler::new(|_| {});
        let b = Handler::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
