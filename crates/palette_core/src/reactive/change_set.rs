//! Commit notifications and per-kind change sets.
//!
//! A `CommitNotification` lists every identity a unit of work touched,
//! across all entity kinds. A `ChangeSet` is the view of one notification
//! restricted to a single kind, with refreshed objects folded into
//! `updated`. A notification with nothing relevant for the kind yields no
//! `ChangeSet` at all.

use crate::model::color_item::{EntityName, ObjectId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Identities touched by one successful commit (or one refresh).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitNotification {
    pub inserted: BTreeSet<ObjectId>,
    pub updated: BTreeSet<ObjectId>,
    pub deleted: BTreeSet<ObjectId>,
    pub refreshed: BTreeSet<ObjectId>,
}

impl CommitNotification {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.refreshed.is_empty()
    }

    /// Returns whether any identity in this notification is of `entity`.
    pub fn touches(&self, entity: EntityName) -> bool {
        self.all_ids().any(|id| id.is_kind(entity))
    }

    /// Iterates every identity in the notification, possibly with repeats.
    pub fn all_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.inserted
            .iter()
            .chain(self.updated.iter())
            .chain(self.deleted.iter())
            .chain(self.refreshed.iter())
    }
}

/// Inserted, updated and deleted identities of one entity kind.
///
/// The three sets are disjoint and never all empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    entity: EntityName,
    inserted: BTreeSet<ObjectId>,
    deleted: BTreeSet<ObjectId>,
    updated: BTreeSet<ObjectId>,
}

impl ChangeSet {
    /// Restricts `notification` to `entity`.
    ///
    /// Returns `None` when nothing of that kind was inserted, updated,
    /// refreshed or deleted.
    pub fn from_notification(notification: &CommitNotification, entity: EntityName) -> Option<Self> {
        let of_kind = |ids: &BTreeSet<ObjectId>| -> BTreeSet<ObjectId> {
            ids.iter().filter(|id| id.is_kind(entity)).copied().collect()
        };

        let inserted = of_kind(&notification.inserted);
        let deleted = of_kind(&notification.deleted);
        let updated: BTreeSet<ObjectId> = of_kind(&notification.updated)
            .into_iter()
            .chain(of_kind(&notification.refreshed))
            .filter(|id| !inserted.contains(id) && !deleted.contains(id))
            .collect();

        if inserted.is_empty() && deleted.is_empty() && updated.is_empty() {
            return None;
        }

        Some(Self {
            entity,
            inserted,
            deleted,
            updated,
        })
    }

    pub fn entity(&self) -> EntityName {
        self.entity
    }

    pub fn inserted(&self) -> &BTreeSet<ObjectId> {
        &self.inserted
    }

    pub fn deleted(&self) -> &BTreeSet<ObjectId> {
        &self.deleted
    }

    /// Updated and refreshed identities.
    pub fn updated(&self) -> &BTreeSet<ObjectId> {
        &self.updated
    }

    /// Total number of identities across the three sets.
    pub fn touched_count(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len()
    }
}

/// Free-function form of `ChangeSet::from_notification`.
pub fn derive_change_set(notification: &CommitNotification, entity: EntityName) -> Option<ChangeSet> {
    ChangeSet::from_notification(notification, entity)
}

#[cfg(test)]
mod tests {
    use super::{derive_change_set, ChangeSet, CommitNotification};
    use crate::model::color_item::{EntityName, ObjectId};
    use uuid::Uuid;

    const COLOR: EntityName = EntityName::new("ColorItem");
    const SWATCH: EntityName = EntityName::new("Swatch");

    fn id(entity: EntityName) -> ObjectId {
        ObjectId::new(entity, Uuid::new_v4())
    }

    #[test]
    fn empty_notification_derives_nothing() {
        let notification = CommitNotification::default();
        assert!(notification.is_empty());
        assert!(derive_change_set(&notification, COLOR).is_none());
    }

    #[test]
    fn notification_for_other_kind_derives_nothing() {
        let mut notification = CommitNotification::default();
        notification.inserted.insert(id(SWATCH));
        notification.refreshed.insert(id(SWATCH));

        assert!(notification.touches(SWATCH));
        assert!(!notification.touches(COLOR));
        assert!(derive_change_set(&notification, COLOR).is_none());
    }

    #[test]
    fn filters_each_set_to_requested_kind() {
        let color_inserted = id(COLOR);
        let color_deleted = id(COLOR);
        let mut notification = CommitNotification::default();
        notification.inserted.extend([color_inserted, id(SWATCH)]);
        notification.deleted.extend([color_deleted, id(SWATCH)]);

        let changes = ChangeSet::from_notification(&notification, COLOR).unwrap();

        assert_eq!(changes.entity(), COLOR);
        assert_eq!(changes.inserted().iter().collect::<Vec<_>>(), vec![&color_inserted]);
        assert_eq!(changes.deleted().iter().collect::<Vec<_>>(), vec![&color_deleted]);
        assert!(changes.updated().is_empty());
        assert_eq!(changes.touched_count(), 2);
    }

    #[test]
    fn updated_absorbs_refreshed_without_duplicates() {
        let both = id(COLOR);
        let only_updated = id(COLOR);
        let only_refreshed = id(COLOR);
        let mut notification = CommitNotification::default();
        notification.updated.extend([both, only_updated]);
        notification.refreshed.extend([both, only_refreshed]);

        let changes = derive_change_set(&notification, COLOR).unwrap();

        assert_eq!(changes.updated().len(), 3);
        assert!(changes.updated().contains(&both));
        assert!(changes.updated().contains(&only_updated));
        assert!(changes.updated().contains(&only_refreshed));
        assert!(changes.inserted().is_empty());
        assert!(changes.deleted().is_empty());
    }

    #[test]
    fn refreshed_only_notification_is_a_change() {
        let refreshed = id(COLOR);
        let mut notification = CommitNotification::default();
        notification.refreshed.insert(refreshed);

        let changes = derive_change_set(&notification, COLOR).unwrap();
        assert!(changes.updated().contains(&refreshed));
    }

    #[test]
    fn change_set_serializes_identities_by_kind() {
        let inserted = id(COLOR);
        let mut notification = CommitNotification::default();
        notification.inserted.insert(inserted);

        let changes = derive_change_set(&notification, COLOR).unwrap();
        let json = serde_json::to_value(&changes).unwrap();

        assert_eq!(json["entity"], "ColorItem");
        assert_eq!(json["inserted"][0]["uuid"], inserted.uuid.to_string());
        assert_eq!(json["updated"].as_array().unwrap().len(), 0);
    }
}
