//! Fetch requests and standing (live) queries over the store.
//!
//! # Responsibility
//! - Describe which records to load and in what order (`FetchRequest`).
//! - Keep a sorted snapshot in sync with committed store contents
//!   (`LiveQuery`).
//!
//! # Invariants
//! - Results reflect committed state only; pending changes are invisible.
//! - Equal sort keys tie-break by insertion order, ascending.

pub mod fetch;
pub mod live_query;
