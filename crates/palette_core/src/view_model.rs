//! View-model for the color list screen.
//!
//! # Responsibility
//! - Own the live color query (ascending by hex) and the current selection.
//! - Turn every query change and selection change into one payload-free
//!   `object_will_change` event for the rendering layer.
//! - Derive a `ChangeSet` from each store notification for diagnostics.
//!
//! # Invariants
//! - Only the live query and selection assignment raise `object_will_change`;
//!   the diagnostic change-set path never does.
//! - `object_will_change` fires before the new state is visible, like the
//!   query's own `will_change`; renderers re-read state after the triggering
//!   call returns.
//! - A failed `add_random_color` leaves no new record behind.
//! - Selection is not cleared when the selected record is deleted.

use crate::model::color::random_hex;
use crate::model::color_item::ColorItem;
use crate::query::fetch::{FetchRequest, SortDescriptor, SortKey};
use crate::query::live_query::LiveQuery;
use crate::reactive::change_set::{derive_change_set, ChangeSet};
use crate::reactive::signal::{Signal, Subscription};
use crate::store::{Store, StoreError, StoreResult};
use log::{debug, error, info};
use std::cell::RefCell;
use std::rc::Rc;

/// Lifecycle of a view-model; construction either reaches `Ready` or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewModelState {
    Ready,
}

/// Backing state of the color list screen.
pub struct ContentViewModel {
    store: Store,
    colors: LiveQuery,
    selected_color_item: Option<ColorItem>,
    object_will_change: Signal<()>,
    last_changes: Rc<RefCell<Option<ChangeSet>>>,
    _colors_subscription: Subscription,
    _changes_subscription: Subscription,
}

impl ContentViewModel {
    /// Fetches the color list from `store` and starts observing it.
    pub fn new(store: &Store) -> StoreResult<Self> {
        let mut colors = LiveQuery::new(
            store,
            FetchRequest::color_items().sorted_by(SortDescriptor::ascending(SortKey::Hex)),
        );
        colors.perform_fetch()?;

        let object_will_change = Signal::new();
        let relay = object_will_change.clone();
        let colors_subscription = colors.on_will_change(move || relay.emit(&()));

        let last_changes = Rc::new(RefCell::new(None));
        let slot = Rc::downgrade(&last_changes);
        let changes_subscription = store.subscribe(move |notification| {
            let Some(changes) = derive_change_set(notification, ColorItem::ENTITY) else {
                return;
            };
            debug!(
                "event=context_changes module=view_model status=ok inserted={} updated={} deleted={}",
                changes.inserted().len(),
                changes.updated().len(),
                changes.deleted().len()
            );
            if let Some(slot) = slot.upgrade() {
                *slot.borrow_mut() = Some(changes);
            }
        });

        info!(
            "event=view_model_ready module=view_model status=ok colors={}",
            colors.len()
        );

        Ok(Self {
            store: store.clone(),
            colors,
            selected_color_item: None,
            object_will_change,
            last_changes,
            _colors_subscription: colors_subscription,
            _changes_subscription: changes_subscription,
        })
    }

    pub fn state(&self) -> ViewModelState {
        ViewModelState::Ready
    }

    /// Store context the view-model reads from; rows read `hex` through it.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Committed colors, ascending by hex, ties in insertion order.
    pub fn colors(&self) -> Rc<[ColorItem]> {
        self.colors.current_results()
    }

    pub fn selected_color_item(&self) -> Option<ColorItem> {
        self.selected_color_item
    }

    /// Replaces the selection and raises `object_will_change`.
    ///
    /// No validation beyond what the caller already did.
    pub fn set_selected_color_item(&mut self, item: Option<ColorItem>) {
        self.object_will_change.emit(&());
        self.selected_color_item = item;
    }

    /// Subscribes the rendering layer to the coarse change event.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn on_object_will_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.object_will_change.subscribe(move |_| listener())
    }

    /// Most recent change set for `ColorItem`, if any commit touched one.
    pub fn last_changes(&self) -> Option<ChangeSet> {
        self.last_changes.borrow().clone()
    }

    /// Creates a color with a random hex code and commits it.
    ///
    /// # Errors
    /// - `StoreError::Commit` with the commit's own error; the new record is
    ///   discarded so it never shows up in `colors()`.
    pub fn add_random_color(&self) -> StoreResult<ColorItem> {
        let item = self.store.create_record();
        self.store.set_hex(&item, random_hex())?;

        if let Err(err) = self.store.commit_if_dirty() {
            error!(
                "event=add_random_color module=view_model status=error object_id={} error={}",
                item.id(),
                err
            );
            if let Err(discard_err) = self.store.delete(&item) {
                error!(
                    "event=add_random_color module=view_model status=error object_id={} error_code=discard_failed error={}",
                    item.id(),
                    discard_err
                );
            }
            return Err(StoreError::Commit(err));
        }

        debug!(
            "event=add_random_color module=view_model status=ok object_id={}",
            item.id()
        );
        Ok(item)
    }

    /// Gives the selected color a new random hex and commits it.
    ///
    /// Returns the new hex, or `None` when nothing is selected.
    pub fn randomise_selected(&self) -> StoreResult<Option<String>> {
        let Some(item) = self.selected_color_item else {
            return Ok(None);
        };
        let hex = random_hex();
        self.store.set_hex(&item, hex.clone())?;
        self.store.commit_if_dirty()?;
        Ok(Some(hex))
    }
}
