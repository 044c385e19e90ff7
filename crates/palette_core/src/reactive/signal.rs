//! Single-threaded publish/subscribe signal.
//!
//! A `Signal<T>` owns its listener table. `subscribe` returns a
//! `Subscription` handle; dropping or cancelling the handle removes the
//! listener. Handles only hold a weak reference, so a signal never outlives
//! its owner because of an unreleased subscriber.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Unique identifier for a subscription within one signal.
pub type SubscriptionId = u64;

type Listener<T> = Rc<dyn Fn(&T)>;

struct Listeners<T> {
    next_id: Cell<SubscriptionId>,
    entries: RefCell<BTreeMap<SubscriptionId, Listener<T>>>,
}

trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
    fn is_attached(&self, id: SubscriptionId) -> bool;
}

impl<T> Detach for Listeners<T> {
    fn detach(&self, id: SubscriptionId) -> bool {
        self.entries.borrow_mut().remove(&id).is_some()
    }

    fn is_attached(&self, id: SubscriptionId) -> bool {
        self.entries.borrow().contains_key(&id)
    }
}

/// Synchronous event source delivering `&T` to every live listener.
pub struct Signal<T: 'static> {
    listeners: Rc<Listeners<T>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(Listeners {
                next_id: Cell::new(1),
                entries: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Registers `listener`; it stays registered until the handle is dropped.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners
            .entries
            .borrow_mut()
            .insert(id, Rc::new(listener));

        let source: Weak<dyn Detach> = Rc::downgrade(&self.listeners) as Weak<dyn Detach>;
        Subscription {
            id,
            source: Some(source),
        }
    }

    /// Delivers `value` to listeners in subscription order.
    ///
    /// Listeners may subscribe or cancel from inside the callback. Listeners
    /// added during an emission first hear the next one; listeners cancelled
    /// during an emission are skipped for the rest of it.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(SubscriptionId, Listener<T>)> = self
            .listeners
            .entries
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            if self.listeners.is_attached(id) {
                listener(value);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.entries.borrow().len()
    }
}

/// Handle keeping one listener registered.
pub struct Subscription {
    id: SubscriptionId,
    source: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether the listener is still registered with a live signal.
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|source| source.is_attached(self.id))
    }

    /// Removes the listener now. Same as dropping the handle.
    pub fn cancel(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Signal;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_listeners_in_subscription_order() {
        let signal = Signal::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first_seen = Rc::clone(&seen);
        let _first = signal.subscribe(move |value| first_seen.borrow_mut().push(("first", *value)));
        let second_seen = Rc::clone(&seen);
        let _second =
            signal.subscribe(move |value| second_seen.borrow_mut().push(("second", *value)));

        signal.emit(&7);

        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let signal = Signal::<()>::new();
        let count = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&count);
        let subscription = signal.subscribe(move |_| *counter.borrow_mut() += 1);
        signal.emit(&());
        assert!(subscription.is_active());

        drop(subscription);
        signal.emit(&());

        assert_eq!(*count.borrow(), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn cancel_from_inside_emission_skips_later_listener() {
        let signal = Signal::<()>::new();
        let count = Rc::new(RefCell::new(0));
        let victim = Rc::new(RefCell::new(None));

        let victim_slot = Rc::clone(&victim);
        let _canceller = signal.subscribe(move |_| {
            if let Some(subscription) = victim_slot.borrow_mut().take() {
                drop::<super::Subscription>(subscription);
            }
        });
        let counter = Rc::clone(&count);
        *victim.borrow_mut() = Some(signal.subscribe(move |_| *counter.borrow_mut() += 1));

        signal.emit(&());

        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn subscription_outliving_signal_is_inactive() {
        let signal = Signal::<()>::new();
        let subscription = signal.subscribe(|_| {});
        drop(signal);

        assert!(!subscription.is_active());
        subscription.cancel();
    }
}
