#![forbid(unsafe_code)]

//! Change watchers attached to every view.
//!
//! Views do not know who observes them. A layout, an accordion or a session
//! subscribes a callback and keeps the returned [`Watch`] guard alive for as
//! long as it wants notifications. The view only holds weak references, so
//! observers never form ownership cycles with what they observe.
//!
//! # Invariants
//!
//! 1. Callbacks are invoked in subscription order.
//! 2. No borrow of the subscriber list is held while callbacks run, so a
//!    callback may subscribe, drop guards, or trigger further notifications.
//! 3. Dead subscribers (dropped guards) are pruned lazily on `notify`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::view::{Change, View};

type WatchFn = dyn Fn(&View, &Change);

/// Weak subscriber list of one view.
#[derive(Default)]
pub struct Watchers {
    subscribers: RefCell<Vec<Weak<WatchFn>>>,
}

impl Watchers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. It stays registered while the returned guard
    /// lives.
    pub fn subscribe(&self, callback: impl Fn(&View, &Change) + 'static) -> Watch {
        let strong: Rc<WatchFn> = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Watch { _guard: strong }
    }

    /// Invoke every live callback with `view` and `change`.
    pub fn notify(&self, view: &View, change: &Change) {
        let callbacks: Vec<Rc<WatchFn>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &callbacks {
            callback(view, change);
        }
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }
}

impl fmt::Debug for Watchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchers")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

/// RAII guard for a watcher callback. Dropping it unsubscribes.
pub struct Watch {
    _guard: Rc<WatchFn>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").finish_non_exhaustive()
    }
}
