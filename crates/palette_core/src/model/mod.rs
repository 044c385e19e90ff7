//! Domain model for persisted color records.
//!
//! # Responsibility
//! - Define record identity (`ObjectId`) and entity kinds (`EntityName`).
//! - Define the `ColorItem` record handle and its validation rules.
//! - Provide hex color generation and fallible parsing.
//!
//! # Invariants
//! - Identities are assigned by the store and never reused.
//! - A `ColorItem` must carry a well-formed hex before it can be committed.

pub mod color;
pub mod color_item;
