//! Store capability
//!
//! The store is the persistence engine behind every resource adapter. The JSON:API layer
//! never inspects records beyond the [`Entity`] reflection hooks; everything else goes
//! through [`Store`].
//!
//! # Overview
//!
//! - [`Entity`]: id access and column reflection for filtering and sorting
//! - [`Store`]: find, fetch, count, insert, update and remove
//! - [`Query`], [`FilterCondition`], [`Ordering`]: the query value handed to the store
//! - [`StoreError`]: structured failures, converted into the crate error at the adapter
//! - [`MemoryStore`]: in-memory implementation (feature `memory-store`)
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_service::store::{Query, Store, StoreResult};
//!
//! struct ArticleStore { pool: PgPool }
//!
//! impl Store<Article> for ArticleStore {
//!     async fn find(&self, id: &str) -> StoreResult<Option<Article>> {
//!         sqlx::query_as!(Article, "SELECT * FROM articles WHERE id = $1", id)
//!             .fetch_optional(&self.pool)
//!             .await
//!             .map_err(|e| StoreError::backend(StoreOperation::Find, e.to_string()))
//!     }
//!     // ... other methods
//! }
//! ```

mod error;
#[cfg(feature = "memory-store")]
mod memory;
mod query;

use std::future::Future;

pub use error::{StoreError, StoreErrorKind, StoreOperation};
#[cfg(feature = "memory-store")]
pub use memory::MemoryStore;
pub use query::{
    escape_like, FilterCondition, FilterOperator, FilterValue, OrderDirection, Ordering, Query,
};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A persisted record
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier, `None` until the store assigns one
    fn id(&self) -> Option<&str>;

    /// Assign the identifier
    fn set_id(&mut self, id: String);

    /// Value of a column, used to evaluate filter conditions and orderings
    ///
    /// Returning `None` treats the column as null.
    fn column(&self, name: &str) -> Option<FilterValue>;
}

/// Persistence capability for one record type
///
/// `fetch` and `count` receive the same [`Query`]; `count` ignores the window. An
/// implementation must evaluate conditions identically in both so that counting and
/// listing never disagree.
///
/// `insert` and `update` persist the record together with its relationship linkage in
/// a single step; a failed call must leave no partial record behind.
pub trait Store<R: Entity>: Send + Sync + 'static {
    /// Find a record by id; absence is not an error
    fn find(&self, id: &str) -> impl Future<Output = StoreResult<Option<R>>> + Send;

    /// Records matching the query, ordered and windowed
    fn fetch(&self, query: &Query) -> impl Future<Output = StoreResult<Vec<R>>> + Send;

    /// Number of records matching the query's conditions
    fn count(&self, query: &Query) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Persist a new record, assigning an id when it has none
    fn insert(&self, record: R) -> impl Future<Output = StoreResult<R>> + Send;

    /// Persist changes to an existing record
    ///
    /// Fails with [`StoreErrorKind::NotFound`] if the record does not exist.
    fn update(&self, record: R) -> impl Future<Output = StoreResult<R>> + Send;

    /// Remove a record; returns `false` if it did not exist
    fn remove(&self, id: &str) -> impl Future<Output = StoreResult<bool>> + Send;
}
