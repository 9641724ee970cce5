//! A plain get/set cell with an optional change observer.
//!
//! While the observer runs it is detached from the store, so an observer
//! that writes back to its own store updates the value without being called
//! again.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type ChangeCallback<T> = Box<dyn FnMut(&T, &T)>;

struct StoreInner<T> {
    value: RefCell<T>,
    on_change: Cell<Option<ChangeCallback<T>>>,
}

/// Shared value cell. Clones refer to the same value.
pub struct Store<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Puts the observer back when the notification ends, even by panic,
/// unless the observer installed a replacement while it ran.
struct Reattach<'a, T> {
    slot: &'a Cell<Option<ChangeCallback<T>>>,
    callback: Option<ChangeCallback<T>>,
}

impl<T> Drop for Reattach<'_, T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            let replacement = self.slot.take();
            self.slot.set(replacement.or(Some(callback)));
        }
    }
}

impl<T> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(value),
                on_change: Cell::new(None),
            }),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the observer. It is called with `(next, previous)` after
    /// every `set`. Calling this from inside the running observer takes
    /// effect from the next `set`.
    pub fn observe(&self, on_change: impl FnMut(&T, &T) + 'static) {
        self.inner.on_change.set(Some(Box::new(on_change)));
    }
}

impl<T: Clone> Store<T> {
    pub fn observed(value: T, on_change: impl FnMut(&T, &T) + 'static) -> Self {
        let store = Self::new(value);
        store.observe(on_change);
        store
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn set(&self, value: T) {
        let previous = self.inner.value.replace(value);
        let Some(callback) = self.inner.on_change.take() else {
            return;
        };

        let mut reattach = Reattach {
            slot: &self.inner.on_change,
            callback: Some(callback),
        };
        let next = self.get();
        if let Some(callback) = reattach.callback.as_mut() {
            callback(&next, &previous);
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }
}

pub fn create_store<T>(value: T) -> Store<T> {
    Store::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_get_and_set() {
        let store = create_store(1);
        store.set(2);
        assert_eq!(store.get(), 2);
        store.update(|v| *v += 3);
        assert_eq!(store.get(), 5);
    }

    #[test]
    fn test_clones_share_value() {
        let a = create_store(String::from("a"));
        let b = a.clone();
        b.set("b".into());
        assert_eq!(a.with(|s| s.len()), 1);
        assert_eq!(a.get(), "b");
    }

    #[test]
    fn test_observer_sees_next_and_previous() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let store = Store::observed(1, move |next: &i32, prev: &i32| {
            log.borrow_mut().push((*next, *prev))
        });

        store.set(2);
        store.set(3);

        assert_eq!(*seen.borrow(), vec![(2, 1), (3, 2)]);
    }

    #[test]
    fn test_reentrant_set_does_not_notify() {
        let store = create_store(1);
        let calls = Rc::new(Cell::new(0));

        let (inner, counter) = (store.clone(), calls.clone());
        store.observe(move |next, _| {
            counter.set(counter.get() + 1);
            inner.set(*next * 10);
        });

        store.set(2);
        assert_eq!(store.get(), 20);
        assert_eq!(calls.get(), 1);

        store.set(3);
        assert_eq!(store.get(), 30);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_observer_replaced_from_inside_itself() {
        let store = create_store(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (inner, log) = (store.clone(), seen.clone());
        store.observe(move |next, _| {
            log.borrow_mut().push(("first", *next));
            let log = log.clone();
            inner.observe(move |next, _| log.borrow_mut().push(("second", *next)));
        });

        store.set(1);
        store.set(2);
        store.set(3);

        assert_eq!(
            *seen.borrow(),
            vec![("first", 1), ("second", 2), ("second", 3)]
        );
    }

    #[test]
    fn test_observer_survives_panic() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let store = Store::observed(0, move |next: &i32, _: &i32| {
            counter.set(counter.get() + 1);
            if *next < 0 {
                panic!("negative");
            }
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| store.set(-1)));
        assert!(result.is_err());
        assert_eq!(store.get(), -1);

        store.set(4);
        assert_eq!(calls.get(), 2);
    }
}
