//! Store context: durable color records plus a pending-change buffer.
//!
//! # Responsibility
//! - Hand out record handles and buffer attribute writes and deletions.
//! - Commit the buffer atomically and publish one `CommitNotification`
//!   per successful commit on the context's own event bus.
//! - Offer per-record attribute observation in place of implicit KVO.
//!
//! # Invariants
//! - Fetches and counts only ever see committed rows.
//! - `commit_if_dirty` with an empty buffer does nothing and notifies nobody.
//! - A failed commit writes nothing and leaves the buffer as it was.
//! - A store is confined to one thread (`Rc`/`RefCell` inside, not `Send`).
//!
//! # Listeners
//! Listeners registered with `subscribe`/`observe_hex` are owned by the
//! store's bus. A listener that captures a strong `Store` clone keeps the
//! store alive; capture weak handles or plain shared state instead.

mod error;
mod options;
mod pending;

pub use error::{CommitError, StoreError, StoreResult};
pub use options::{StoreLocation, StoreOptions};

use crate::db::schema::ensure_schema;
use crate::db::{open_db_in_memory_with_timeout, open_db_with_timeout};
use crate::model::color_item::{validate_hex, ColorItem, ContextId, ObjectId};
use crate::query::fetch::FetchRequest;
use crate::reactive::change_set::CommitNotification;
use crate::reactive::signal::{Signal, Subscription};
use crate::repo::color_repo::{ColorItemRepository, SqliteColorItemRepository};
use log::{debug, error, info, warn};
use pending::{PendingChanges, PendingState};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

/// Where a record currently lives from this context's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Residence {
    PendingInsert,
    Durable,
    PendingDelete,
}

struct StoreInner {
    context: ContextId,
    conn: RefCell<Connection>,
    pending: RefCell<PendingChanges>,
    did_change: Signal<CommitNotification>,
    hex_observers: RefCell<HashMap<Uuid, Signal<Option<String>>>>,
}

/// Handle to one store context. Clones share the same context.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("context", &self.inner.context)
            .field("has_changes", &self.has_changes())
            .finish()
    }
}

impl Store {
    /// Opens a store according to `options`.
    pub fn open(options: &StoreOptions) -> StoreResult<Self> {
        let conn = match &options.location {
            StoreLocation::InMemory => open_db_in_memory_with_timeout(options.busy_timeout())?,
            StoreLocation::File(path) => open_db_with_timeout(path, options.busy_timeout())?,
        };
        Ok(Self::with_bootstrapped(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreOptions::in_memory())
    }

    pub fn open_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(&StoreOptions::file(path.as_ref()))
    }

    /// Wraps an existing connection, creating the schema when missing.
    pub fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        ensure_schema(&mut conn).map_err(StoreError::Db)?;
        Ok(Self::with_bootstrapped(conn))
    }

    fn with_bootstrapped(conn: Connection) -> Self {
        let context = ContextId::next();
        debug!("event=store_open module=store status=ok context={context:?}");
        Self {
            inner: Rc::new(StoreInner {
                context,
                conn: RefCell::new(conn),
                pending: RefCell::new(PendingChanges::default()),
                did_change: Signal::new(),
                hex_observers: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn context(&self) -> ContextId {
        self.inner.context
    }

    /// Allocates a new, uncommitted color record in this context.
    ///
    /// The record has no `hex` yet and is invisible to fetches until a
    /// commit succeeds.
    pub fn create_record(&self) -> ColorItem {
        let item = ColorItem::new(Uuid::new_v4(), self.inner.context);
        self.inner.pending.borrow_mut().insert(item.uuid());
        debug!(
            "event=record_create module=store status=ok object_id={}",
            item.id()
        );
        item
    }

    /// Current `hex` of `item`: the pending value if any, else the committed one.
    pub fn hex(&self, item: &ColorItem) -> StoreResult<Option<String>> {
        self.resolve(item)?;
        self.current_hex(item.uuid())
    }

    /// Assigns `hex` to `item`; persisted on the next commit.
    ///
    /// Validation happens at commit time, not here.
    pub fn set_hex(&self, item: &ColorItem, hex: impl Into<String>) -> StoreResult<()> {
        if self.resolve(item)? == Residence::PendingDelete {
            return Err(StoreError::InvalidReference(item.id()));
        }
        self.inner
            .pending
            .borrow_mut()
            .set_hex(item.uuid(), hex.into());
        self.notify_hex_observers(&[item.uuid()]);
        Ok(())
    }

    /// Marks `item` for removal on the next commit.
    ///
    /// A record that was never committed is simply forgotten. Deleting a
    /// record already marked for deletion is a no-op.
    pub fn delete(&self, item: &ColorItem) -> StoreResult<()> {
        match self.resolve(item)? {
            Residence::PendingDelete => Ok(()),
            Residence::PendingInsert | Residence::Durable => {
                let forgotten = self.inner.pending.borrow_mut().delete(item.uuid());
                debug!(
                    "event=record_delete module=store status=ok object_id={} uncommitted={}",
                    item.id(),
                    forgotten
                );
                Ok(())
            }
        }
    }

    /// Returns whether `item` is live in this context (pending or committed,
    /// and not marked for deletion).
    pub fn contains(&self, item: &ColorItem) -> bool {
        matches!(
            self.resolve(item),
            Ok(Residence::PendingInsert | Residence::Durable)
        )
    }

    /// Dirty flag: whether any change awaits commit.
    pub fn has_changes(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    /// Commits pending changes, if any, in one transaction.
    ///
    /// On success the buffer is cleared and subscribers receive exactly one
    /// notification before this returns. On failure nothing is written,
    /// nobody is notified and the buffer is kept for the caller to fix or
    /// `rollback`.
    pub fn commit_if_dirty(&self) -> Result<(), CommitError> {
        if !self.has_changes() {
            debug!("event=store_commit module=store status=skip reason=clean");
            return Ok(());
        }

        let started_at = Instant::now();
        let write_result = {
            let pending = self.inner.pending.borrow();
            let mut conn = self.inner.conn.borrow_mut();
            write_pending(&mut conn, &pending).map(|()| pending.to_notification())
        };

        let notification = match write_result {
            Ok(notification) => notification,
            Err(err) => {
                let error_code = match &err {
                    CommitError::Validation(_) => "validation_failed",
                    CommitError::Persistence(_) => "persistence_failed",
                };
                error!(
                    "event=store_commit module=store status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    error_code,
                    err
                );
                return Err(err);
            }
        };

        self.inner.pending.borrow_mut().clear();
        self.prune_hex_observers(&notification);
        info!(
            "event=store_commit module=store status=ok inserted={} updated={} deleted={} duration_ms={}",
            notification.inserted.len(),
            notification.updated.len(),
            notification.deleted.len(),
            started_at.elapsed().as_millis()
        );
        self.inner.did_change.emit(&notification);
        Ok(())
    }

    /// Discards every pending change without notifying commit subscribers.
    pub fn rollback(&self) {
        let touched = {
            let mut pending = self.inner.pending.borrow_mut();
            let touched = pending.touched();
            pending.clear();
            touched
        };
        info!(
            "event=store_rollback module=store status=ok discarded={}",
            touched.len()
        );
        self.notify_hex_observers(&touched);
    }

    /// Drops pending changes to one committed record and publishes it as
    /// refreshed.
    pub fn refresh(&self, item: &ColorItem) -> StoreResult<()> {
        if self.resolve(item)? == Residence::PendingInsert {
            return Err(StoreError::InvalidState(
                "cannot refresh a record that was never committed",
            ));
        }
        let discarded = self.inner.pending.borrow_mut().discard(item.uuid());
        debug!(
            "event=record_refresh module=store status=ok object_id={} discarded={}",
            item.id(),
            discarded
        );

        let notification = CommitNotification {
            refreshed: BTreeSet::from([item.id()]),
            ..CommitNotification::default()
        };
        self.notify_hex_observers(&[item.uuid()]);
        self.inner.did_change.emit(&notification);
        Ok(())
    }

    /// Loads committed records matching `request`, in request order.
    pub fn fetch(&self, request: &FetchRequest) -> StoreResult<Vec<ColorItem>> {
        if request.entity != ColorItem::ENTITY {
            return Ok(Vec::new());
        }
        let conn = self.inner.conn.borrow();
        let ids = SqliteColorItemRepository::new(&conn).list(request)?;
        Ok(ids
            .into_iter()
            .map(|uuid| ColorItem::new(uuid, self.inner.context))
            .collect())
    }

    /// Number of committed color records.
    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.inner.conn.borrow();
        Ok(SqliteColorItemRepository::new(&conn).count()?)
    }

    /// Subscribes to commit (and refresh) notifications of this context.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CommitNotification) + 'static,
    {
        self.inner.did_change.subscribe(listener)
    }

    /// Number of live commit-notification subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.did_change.listener_count()
    }

    /// Observes `hex` of one record.
    ///
    /// `listener` runs once immediately with the current value, then after
    /// every `set_hex`, `rollback` or `refresh` touching the record.
    pub fn observe_hex<F>(&self, item: &ColorItem, listener: F) -> StoreResult<Subscription>
    where
        F: Fn(&Option<String>) + 'static,
    {
        let current = self.hex(item)?;
        let signal = self
            .inner
            .hex_observers
            .borrow_mut()
            .entry(item.uuid())
            .or_default()
            .clone();
        listener(&current);
        Ok(signal.subscribe(listener))
    }

    fn resolve(&self, item: &ColorItem) -> StoreResult<Residence> {
        if item.context() != self.inner.context {
            return Err(StoreError::InvalidReference(item.id()));
        }
        match self.inner.pending.borrow().state(item.uuid()) {
            Some(PendingState::Inserted(_)) => return Ok(Residence::PendingInsert),
            Some(PendingState::Deleted) => return Ok(Residence::PendingDelete),
            Some(PendingState::Updated(_)) => return Ok(Residence::Durable),
            None => {}
        }
        let conn = self.inner.conn.borrow();
        match SqliteColorItemRepository::new(&conn).get_hex(item.uuid())? {
            Some(_) => Ok(Residence::Durable),
            None => Err(StoreError::InvalidReference(item.id())),
        }
    }

    fn current_hex(&self, uuid: Uuid) -> StoreResult<Option<String>> {
        match self.inner.pending.borrow().state(uuid) {
            Some(PendingState::Inserted(hex)) => return Ok(hex.map(str::to_string)),
            Some(PendingState::Updated(hex)) => return Ok(Some(hex.to_string())),
            Some(PendingState::Deleted) | None => {}
        }
        let conn = self.inner.conn.borrow();
        Ok(SqliteColorItemRepository::new(&conn).get_hex(uuid)?)
    }

    /// Forgets observer slots of deleted records and slots nobody listens to.
    fn prune_hex_observers(&self, notification: &CommitNotification) {
        self.inner.hex_observers.borrow_mut().retain(|uuid, signal| {
            signal.listener_count() > 0
                && !notification
                    .deleted
                    .contains(&ObjectId::new(ColorItem::ENTITY, *uuid))
        });
    }

    fn notify_hex_observers(&self, uuids: &[Uuid]) {
        for uuid in uuids {
            let signal = {
                let mut observers = self.inner.hex_observers.borrow_mut();
                let Some(signal) = observers.get(uuid).cloned() else {
                    continue;
                };
                if signal.listener_count() == 0 {
                    observers.remove(uuid);
                    continue;
                }
                signal
            };
            match self.current_hex(*uuid) {
                Ok(value) => signal.emit(&value),
                Err(err) => warn!(
                    "event=hex_observe module=store status=error object_id={} error={}",
                    ObjectId::new(ColorItem::ENTITY, *uuid),
                    err
                ),
            }
        }
    }
}

fn write_pending(conn: &mut Connection, pending: &PendingChanges) -> Result<(), CommitError> {
    let id = |uuid: Uuid| ObjectId::new(ColorItem::ENTITY, uuid);

    // Validate everything first so a bad record never opens a transaction.
    for (uuid, hex) in pending.inserted() {
        validate_hex(id(uuid), hex)?;
    }
    for (uuid, hex) in pending.updated() {
        validate_hex(id(uuid), Some(hex))?;
    }

    let tx = conn.transaction()?;
    {
        let repo = SqliteColorItemRepository::new(&tx);
        for uuid in pending.deleted() {
            repo.delete(uuid)?;
        }
        for (uuid, hex) in pending.updated() {
            repo.update_hex(uuid, hex)?;
        }
        for (uuid, hex) in pending.inserted() {
            repo.insert(uuid, validate_hex(id(uuid), hex)?)?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CommitError, Store, StoreError, StoreOptions};
    use crate::model::color_item::ColorItemValidationError;
    use crate::query::fetch::FetchRequest;
    use crate::reactive::change_set::CommitNotification;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(store: &Store) -> (Rc<RefCell<Vec<CommitNotification>>>, super::Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription = store.subscribe(move |notification| {
            sink.borrow_mut().push(notification.clone());
        });
        (seen, subscription)
    }

    #[test]
    fn created_record_is_pending_until_commit() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "#123456").unwrap();

        assert!(store.has_changes());
        assert!(store.contains(&item));
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.fetch(&FetchRequest::color_items()).unwrap().is_empty());

        store.commit_if_dirty().unwrap();

        assert!(!store.has_changes());
        assert_eq!(store.fetch(&FetchRequest::color_items()).unwrap(), vec![item]);
        assert_eq!(store.hex(&item).unwrap().as_deref(), Some("#123456"));
    }

    #[test]
    fn clean_commit_is_silent() {
        let store = Store::open_in_memory().unwrap();
        let (seen, _subscription) = recorder(&store);

        store.commit_if_dirty().unwrap();
        store.commit_if_dirty().unwrap();

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn commit_publishes_one_notification_with_all_identities() {
        let store = Store::open_in_memory().unwrap();
        let kept = store.create_record();
        store.set_hex(&kept, "#000001").unwrap();
        let doomed = store.create_record();
        store.set_hex(&doomed, "#000002").unwrap();
        store.commit_if_dirty().unwrap();

        let (seen, _subscription) = recorder(&store);
        let added = store.create_record();
        store.set_hex(&added, "#000003").unwrap();
        store.set_hex(&kept, "#0000FF").unwrap();
        store.delete(&doomed).unwrap();
        store.commit_if_dirty().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].inserted.contains(&added.id()));
        assert!(seen[0].updated.contains(&kept.id()));
        assert!(seen[0].deleted.contains(&doomed.id()));
        assert!(seen[0].refreshed.is_empty());
    }

    #[test]
    fn missing_hex_fails_commit_without_writing_anything() {
        let store = Store::open_in_memory().unwrap();
        let valid = store.create_record();
        store.set_hex(&valid, "#ABCDEF").unwrap();
        let invalid = store.create_record();
        let (seen, _subscription) = recorder(&store);

        let err = store.commit_if_dirty().unwrap_err();

        assert!(matches!(
            err,
            CommitError::Validation(ColorItemValidationError::MissingHex(id)) if id == invalid.id()
        ));
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.has_changes());
        assert!(seen.borrow().is_empty());

        store.delete(&invalid).unwrap();
        store.commit_if_dirty().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn malformed_hex_fails_commit() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "red").unwrap();

        assert!(matches!(
            store.commit_if_dirty(),
            Err(CommitError::Validation(ColorItemValidationError::MalformedHex { .. }))
        ));
    }

    #[test]
    fn foreign_record_is_an_invalid_reference() {
        let store = Store::open_in_memory().unwrap();
        let other = Store::open_in_memory().unwrap();
        let foreign = other.create_record();

        assert!(matches!(
            store.delete(&foreign),
            Err(StoreError::InvalidReference(id)) if id == foreign.id()
        ));
        assert!(matches!(
            store.set_hex(&foreign, "#000000"),
            Err(StoreError::InvalidReference(_))
        ));
        assert!(!store.contains(&foreign));
    }

    #[test]
    fn deleted_record_becomes_invalid_after_commit() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "#111111").unwrap();
        store.commit_if_dirty().unwrap();

        store.delete(&item).unwrap();
        store.delete(&item).unwrap();
        assert!(matches!(
            store.set_hex(&item, "#222222"),
            Err(StoreError::InvalidReference(_))
        ));
        store.commit_if_dirty().unwrap();

        assert!(matches!(store.hex(&item), Err(StoreError::InvalidReference(_))));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn deleting_uncommitted_record_leaves_store_clean() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.delete(&item).unwrap();

        assert!(!store.has_changes());
        assert!(!store.contains(&item));
    }

    #[test]
    fn rollback_discards_pending_changes() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "#333333").unwrap();
        store.commit_if_dirty().unwrap();

        store.set_hex(&item, "#444444").unwrap();
        let uncommitted = store.create_record();
        store.rollback();

        assert!(!store.has_changes());
        assert_eq!(store.hex(&item).unwrap().as_deref(), Some("#333333"));
        assert!(!store.contains(&uncommitted));
    }

    #[test]
    fn refresh_discards_update_and_publishes_refreshed() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "#555555").unwrap();
        store.commit_if_dirty().unwrap();
        store.set_hex(&item, "#666666").unwrap();
        let (seen, _subscription) = recorder(&store);

        store.refresh(&item).unwrap();

        assert_eq!(store.hex(&item).unwrap().as_deref(), Some("#555555"));
        assert!(!store.has_changes());
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].refreshed.contains(&item.id()));
    }

    #[test]
    fn refresh_of_uncommitted_record_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();

        assert!(matches!(
            store.refresh(&item),
            Err(StoreError::InvalidState(_))
        ));
    }

    #[test]
    fn observe_hex_fires_immediately_and_on_change() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let subscription = store
            .observe_hex(&item, move |hex| sink.borrow_mut().push(hex.clone()))
            .unwrap();
        store.set_hex(&item, "#777777").unwrap();
        drop(subscription);
        store.set_hex(&item, "#888888").unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![None, Some("#777777".to_string())]
        );
    }

    #[test]
    fn listener_may_read_committed_state_during_delivery() {
        let store = Store::open_in_memory().unwrap();
        let reader = store.clone();
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        let _subscription = store.subscribe(move |_| {
            sink.borrow_mut().push(reader.count().unwrap());
        });

        let item = store.create_record();
        store.set_hex(&item, "#999999").unwrap();
        store.commit_if_dirty().unwrap();

        assert_eq!(*counts.borrow(), vec![1]);
    }

    #[test]
    fn committed_delete_forgets_hex_observers() {
        let store = Store::open_in_memory().unwrap();
        let item = store.create_record();
        store.set_hex(&item, "#121212").unwrap();
        store.commit_if_dirty().unwrap();
        let _subscription = store.observe_hex(&item, |_| {}).unwrap();
        assert_eq!(store.inner.hex_observers.borrow().len(), 1);

        store.delete(&item).unwrap();
        store.commit_if_dirty().unwrap();

        assert!(store.inner.hex_observers.borrow().is_empty());
    }

    #[test]
    fn commit_drops_observer_slots_without_listeners() {
        let store = Store::open_in_memory().unwrap();
        let kept = store.create_record();
        let released = store.create_record();
        store.set_hex(&kept, "#131313").unwrap();
        store.set_hex(&released, "#141414").unwrap();
        let _kept_subscription = store.observe_hex(&kept, |_| {}).unwrap();
        drop(store.observe_hex(&released, |_| {}).unwrap());

        store.commit_if_dirty().unwrap();

        let observers = store.inner.hex_observers.borrow();
        assert_eq!(observers.len(), 1);
        assert!(observers.contains_key(&kept.uuid()));
    }

    #[test]
    fn in_memory_store_applies_configured_busy_timeout() {
        let options = StoreOptions {
            busy_timeout_ms: 250,
            ..StoreOptions::in_memory()
        };
        let store = Store::open(&options).unwrap();

        let timeout_ms: i64 = store
            .inner
            .conn
            .borrow()
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout_ms, 250);
    }
}
