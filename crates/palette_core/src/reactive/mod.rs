//! Change propagation primitives.
//!
//! # Responsibility
//! - Provide an explicit publish/subscribe `Signal` with cancellable handles.
//! - Describe what one commit touched (`CommitNotification`) and derive the
//!   per-kind view of it (`ChangeSet`).
//!
//! # Invariants
//! - Delivery is synchronous, on the emitting thread, in subscription order.
//! - A cancelled subscription never observes a later emission.

pub mod change_set;
pub mod signal;
