//! Core of the palette demo: a persisted color store, a live query over it
//! and the view-model a rendering layer observes.
//!
//! Everything here is single-threaded by construction: one store context,
//! its queries and its view-models live on the thread that created them.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod reactive;
pub mod repo;
pub mod store;
pub mod view_model;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::color::{is_valid_hex, random_hex, HexParseError, Rgb};
pub use model::color_item::{ColorItem, ColorItemValidationError, ContextId, EntityName, ObjectId};
pub use query::fetch::{FetchRequest, SortDescriptor, SortKey};
pub use query::live_query::LiveQuery;
pub use reactive::change_set::{derive_change_set, ChangeSet, CommitNotification};
pub use reactive::signal::{Signal, Subscription, SubscriptionId};
pub use repo::color_repo::{ColorItemRepository, RepoError, RepoResult, SqliteColorItemRepository};
pub use store::{CommitError, Store, StoreError, StoreLocation, StoreOptions, StoreResult};
pub use view_model::{ContentViewModel, ViewModelState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
