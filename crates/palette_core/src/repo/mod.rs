//! SQL access to durable color records.
//!
//! # Responsibility
//! - Keep SQL text inside one module behind a repository trait.
//! - Translate rows into identities and attribute values.
//!
//! # Invariants
//! - The repository never validates or buffers; the store does that before
//!   calling in, inside its commit transaction.
//! - Read paths reject malformed persisted identities instead of masking them.

pub mod color_repo;
