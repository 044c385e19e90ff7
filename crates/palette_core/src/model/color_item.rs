//! Record identity and the `ColorItem` record handle.
//!
//! # Responsibility
//! - Name entity kinds so change notifications can be filtered by kind.
//! - Tie every record handle to the store context that created it.
//!
//! # Invariants
//! - `ObjectId` is stable for a record's whole lifetime, committed or not.
//! - A `ColorItem` handle is only meaningful to the context in `context()`.

use crate::model::color::is_valid_hex;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Name of a persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityName(&'static str);

impl EntityName {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Display for EntityName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Store-assigned identity of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ObjectId {
    pub entity: EntityName,
    pub uuid: Uuid,
}

impl ObjectId {
    pub fn new(entity: EntityName, uuid: Uuid) -> Self {
        Self { entity, uuid }
    }

    /// Returns whether this identity belongs to `entity`.
    pub fn is_kind(&self, entity: EntityName) -> bool {
        self.entity == entity
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.entity, self.uuid)
    }
}

/// Identity of one store context; record handles remember theirs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to one color record owned by a store context.
///
/// Attribute values live in the store; read them with `Store::hex` and
/// write them with `Store::set_hex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColorItem {
    id: ObjectId,
    context: ContextId,
}

impl ColorItem {
    /// Entity kind of every `ColorItem`.
    pub const ENTITY: EntityName = EntityName::new("ColorItem");

    pub(crate) fn new(uuid: Uuid, context: ContextId) -> Self {
        Self {
            id: ObjectId::new(Self::ENTITY, uuid),
            context,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.id.uuid
    }

    pub fn context(&self) -> ContextId {
        self.context
    }
}

/// Record-level validation failure raised at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorItemValidationError {
    /// The required `hex` attribute was never assigned.
    MissingHex(ObjectId),
    /// `hex` is set but is not `#` followed by six hex digits.
    MalformedHex { id: ObjectId, value: String },
}

impl Display for ColorItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHex(id) => write!(f, "required attribute `hex` is missing on {id}"),
            Self::MalformedHex { id, value } => {
                write!(f, "attribute `hex` on {id} is malformed: `{value}`")
            }
        }
    }
}

impl Error for ColorItemValidationError {}

/// Checks that `hex` is present and well-formed for record `id`.
pub fn validate_hex(id: ObjectId, hex: Option<&str>) -> Result<&str, ColorItemValidationError> {
    match hex {
        None => Err(ColorItemValidationError::MissingHex(id)),
        Some(value) if !is_valid_hex(value) => Err(ColorItemValidationError::MalformedHex {
            id,
            value: value.to_string(),
        }),
        Some(value) => Ok(value),
    }
}
