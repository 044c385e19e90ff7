//! In-memory buffer of uncommitted changes for one store context.
//!
//! # Invariants
//! - An identity is in at most one of inserted/updated/deleted.
//! - Inserts keep creation order so commits assign `seq` in that order.
//! - Deleting a pending insert forgets it entirely.

use crate::model::color_item::{ColorItem, ObjectId};
use crate::reactive::change_set::CommitNotification;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// What the buffer knows about one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingState<'a> {
    Inserted(Option<&'a str>),
    Updated(&'a str),
    Deleted,
}

#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    inserted: Vec<(Uuid, Option<String>)>,
    updated: BTreeMap<Uuid, String>,
    deleted: BTreeSet<Uuid>,
}

impl PendingChanges {
    pub(crate) fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub(crate) fn state(&self, uuid: Uuid) -> Option<PendingState<'_>> {
        if let Some((_, hex)) = self.inserted.iter().find(|(id, _)| *id == uuid) {
            return Some(PendingState::Inserted(hex.as_deref()));
        }
        if let Some(hex) = self.updated.get(&uuid) {
            return Some(PendingState::Updated(hex.as_str()));
        }
        if self.deleted.contains(&uuid) {
            return Some(PendingState::Deleted);
        }
        None
    }

    pub(crate) fn insert(&mut self, uuid: Uuid) {
        self.inserted.push((uuid, None));
    }

    /// Records a new `hex` for `uuid`; pending inserts stay inserts.
    pub(crate) fn set_hex(&mut self, uuid: Uuid, hex: String) {
        if let Some((_, slot)) = self.inserted.iter_mut().find(|(id, _)| *id == uuid) {
            *slot = Some(hex);
            return;
        }
        self.updated.insert(uuid, hex);
    }

    /// Marks `uuid` for deletion. Returns `true` when it was only a pending
    /// insert and has been dropped from the buffer instead.
    pub(crate) fn delete(&mut self, uuid: Uuid) -> bool {
        if let Some(position) = self.inserted.iter().position(|(id, _)| *id == uuid) {
            self.inserted.remove(position);
            return true;
        }
        self.updated.remove(&uuid);
        self.deleted.insert(uuid);
        false
    }

    /// Forgets any pending update or delete of a durable record.
    pub(crate) fn discard(&mut self, uuid: Uuid) -> bool {
        let had_update = self.updated.remove(&uuid).is_some();
        let had_delete = self.deleted.remove(&uuid);
        had_update || had_delete
    }

    pub(crate) fn inserted(&self) -> impl Iterator<Item = (Uuid, Option<&str>)> + '_ {
        self.inserted.iter().map(|(uuid, hex)| (*uuid, hex.as_deref()))
    }

    pub(crate) fn updated(&self) -> impl Iterator<Item = (Uuid, &str)> + '_ {
        self.updated.iter().map(|(uuid, hex)| (*uuid, hex.as_str()))
    }

    pub(crate) fn deleted(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.deleted.iter().copied()
    }

    /// Every identity the buffer mentions.
    pub(crate) fn touched(&self) -> Vec<Uuid> {
        self.inserted
            .iter()
            .map(|(uuid, _)| *uuid)
            .chain(self.updated.keys().copied())
            .chain(self.deleted.iter().copied())
            .collect()
    }

    /// Describes the buffer as the notification a successful commit emits.
    pub(crate) fn to_notification(&self) -> CommitNotification {
        let id = |uuid: Uuid| ObjectId::new(ColorItem::ENTITY, uuid);
        CommitNotification {
            inserted: self.inserted.iter().map(|(uuid, _)| id(*uuid)).collect(),
            updated: self.updated.keys().map(|uuid| id(*uuid)).collect(),
            deleted: self.deleted.iter().map(|uuid| id(*uuid)).collect(),
            refreshed: BTreeSet::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.inserted.clear();
        self.updated.clear();
        self.deleted.clear();
    }
}
