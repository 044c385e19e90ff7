//! Standing query that keeps a sorted snapshot of committed records.
//!
//! # Responsibility
//! - Load the initial snapshot once, synchronously.
//! - Refetch after every store notification that touches the query's entity.
//! - Tell its owner right before the snapshot is replaced (`will_change`)
//!   and right after (`did_change`).
//!
//! # Invariants
//! - `current_results` never reflects uncommitted changes.
//! - During `will_change` listeners still see the previous snapshot.
//! - A failed refetch keeps the previous snapshot and raises no signal.
//! - A commit made from inside `will_change` wins: its snapshot is installed
//!   and the outer, older snapshot is dropped.

use crate::model::color_item::ColorItem;
use crate::query::fetch::FetchRequest;
use crate::reactive::change_set::CommitNotification;
use crate::reactive::signal::{Signal, Subscription};
use crate::store::{Store, StoreError, StoreResult};
use log::{debug, error};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct LiveQueryShared {
    store: Store,
    request: FetchRequest,
    results: RefCell<Rc<[ColorItem]>>,
    generation: Cell<u64>,
    will_change: Signal<()>,
    did_change: Signal<()>,
}

impl LiveQueryShared {
    fn on_store_change(&self, notification: &CommitNotification) {
        if !notification.touches(self.request.entity) {
            return;
        }

        let refreshed = match self.store.fetch(&self.request) {
            Ok(items) => items,
            Err(err) => {
                error!(
                    "event=live_query_refresh module=live_query status=error entity={} error={}",
                    self.request.entity, err
                );
                return;
            }
        };

        let generation = self.generation.get();
        self.will_change.emit(&());
        if self.generation.get() != generation {
            debug!(
                "event=live_query_refresh module=live_query status=skip reason=superseded entity={}",
                self.request.entity
            );
            return;
        }

        let count = refreshed.len();
        *self.results.borrow_mut() = refreshed.into();
        self.generation.set(generation.wrapping_add(1));
        debug!(
            "event=live_query_refresh module=live_query status=ok entity={} count={}",
            self.request.entity, count
        );
        self.did_change.emit(&());
    }
}

/// Auto-refreshing, sorted view over one store context.
pub struct LiveQuery {
    shared: Rc<LiveQueryShared>,
    store_subscription: Option<Subscription>,
}

impl LiveQuery {
    /// Binds a query to `store`. Call `perform_fetch` before reading results.
    pub fn new(store: &Store, request: FetchRequest) -> Self {
        Self {
            shared: Rc::new(LiveQueryShared {
                store: store.clone(),
                request,
                results: RefCell::new(Rc::from(Vec::new())),
                generation: Cell::new(0),
                will_change: Signal::new(),
                did_change: Signal::new(),
            }),
            store_subscription: None,
        }
    }

    /// Loads the initial snapshot and starts following store notifications.
    ///
    /// # Errors
    /// - `StoreError::InvalidState` when called a second time.
    /// - Fetch errors from the store; the query then stays unsubscribed.
    pub fn perform_fetch(&mut self) -> StoreResult<()> {
        if self.store_subscription.is_some() {
            return Err(StoreError::InvalidState("live query already fetched"));
        }

        let initial = self.shared.store.fetch(&self.shared.request)?;
        debug!(
            "event=live_query_fetch module=live_query status=ok entity={} count={}",
            self.shared.request.entity,
            initial.len()
        );
        *self.shared.results.borrow_mut() = initial.into();

        let weak: Weak<LiveQueryShared> = Rc::downgrade(&self.shared);
        self.store_subscription = Some(self.shared.store.subscribe(move |notification| {
            if let Some(shared) = weak.upgrade() {
                shared.on_store_change(notification);
            }
        }));
        Ok(())
    }

    /// Whether `perform_fetch` has succeeded.
    pub fn is_fetched(&self) -> bool {
        self.store_subscription.is_some()
    }

    /// Last computed snapshot; empty before `perform_fetch`.
    pub fn current_results(&self) -> Rc<[ColorItem]> {
        Rc::clone(&self.shared.results.borrow())
    }

    pub fn len(&self) -> usize {
        self.shared.results.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.results.borrow().is_empty()
    }

    pub fn fetch_request(&self) -> &FetchRequest {
        &self.shared.request
    }

    /// Runs `listener` right before the snapshot is replaced.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn on_will_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.shared.will_change.subscribe(move |_| listener())
    }

    /// Runs `listener` right after the snapshot is replaced.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn on_did_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.shared.did_change.subscribe(move |_| listener())
    }
}
