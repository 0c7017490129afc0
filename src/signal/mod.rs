//! Synchronous notification channels.
//!
//! A [`Channel`] is an ordered list of subscribers. Emitting a value calls
//! every subscriber in subscription order on the caller's stack, before
//! `emit` returns. There is no buffering: subscribers only see values
//! emitted while they are subscribed.
//!
//! Dispatch works on a snapshot of the subscriber list, so a callback may
//! subscribe, unsubscribe, or trigger further emissions on the same channel
//! without invalidating the emission in progress.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Subscribers<T> {
    entries: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
    closed: Cell<bool>,
}

/// Broadcast channel with synchronous, in-order dispatch.
pub struct Channel<T> {
    inner: Rc<Subscribers<T>>,
}

impl<T: 'static> Channel<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Subscribers {
                entries: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                closed: Cell::new(false),
            }),
        }
    }

    /// Register `callback` for every future emission.
    ///
    /// Subscribing to a closed channel returns an inert subscription and
    /// the callback is dropped immediately.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        if self.inner.closed.get() {
            return Subscription::inert();
        }
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .entries
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let weak: Weak<Subscribers<T>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.entries.borrow_mut().retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Deliver `value` to every current subscriber.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .inner
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }

    /// Drop every subscriber and refuse new ones.
    pub fn close(&self) {
        self.inner.closed.set(true);
        let dropped = std::mem::take(&mut *self.inner.entries.borrow_mut());
        drop(dropped);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }
}

impl<T: 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.inner.entries.borrow().len())
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}

/// Handle to one registered callback.
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "dropping a Subscription keeps the callback registered; keep it to unsubscribe later"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn inert() -> Self {
        Self { cancel: None }
    }

    /// Remove the callback from its channel. A no-op if the channel has
    /// been closed or dropped.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether this subscription was accepted by an open channel.
    pub fn is_live(&self) -> bool {
        self.cancel.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("live", &self.is_live())
            .finish()
    }
}
