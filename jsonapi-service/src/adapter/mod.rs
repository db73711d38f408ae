//! Resource adapters
//!
//! An adapter translates JSON:API operations into store operations for one resource type.
//!
//! - [`Schema`]: explicit field-mapping table (attributes, relationships, columns)
//! - [`ResourceDefinition`]: per-resource hooks (instantiate, filter, default sort, validate)
//! - [`ResourceAdapter`]: typed CRUD and query pipeline over a [`Store`](crate::store::Store)
//! - [`Adapter`]: type-erased interface the controller dispatches through
//! - [`AdapterRegistry`]: adapters keyed by name, resolved from resource configuration

mod definition;
mod registry;
mod resource;
mod schema;

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

pub use definition::{Predicates, ResourceDefinition};
pub use registry::AdapterRegistry;
pub use resource::ResourceAdapter;
pub use schema::{column_name, Cardinality, Schema};

use crate::classifier::RelationshipMutation;
use crate::config::UnknownMembers;
use crate::document::{RelationshipData, ResourceObject, ResourceParts};
use crate::error::{Error, Result};
use crate::pagination::PageWindow;
use crate::query::EncodingParameters;

/// Opaque record handle passed between the controller and an adapter
pub struct Record(Box<dyn Any + Send + Sync>);

impl Record {
    /// Wrap a typed record
    pub fn new<R: Any + Send + Sync>(record: R) -> Self {
        Self(Box::new(record))
    }

    /// Unwrap into the typed record
    pub fn downcast<R: Any>(self) -> Result<R> {
        self.0
            .downcast::<R>()
            .map(|record| *record)
            .map_err(|_| record_mismatch::<R>())
    }

    /// Borrow the typed record
    pub fn downcast_ref<R: Any>(&self) -> Result<&R> {
        self.0.downcast_ref::<R>().ok_or_else(record_mismatch::<R>)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Record(..)")
    }
}

fn record_mismatch<R>() -> Error {
    Error::unhandled(
        "RecordTypeMismatch",
        format!("record is not a `{}`", std::any::type_name::<R>()),
    )
}

/// Type-erased adapter interface
///
/// Implemented by [`ResourceAdapter`] for every definition and store; custom adapters may
/// implement it directly.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Related resource type of a relationship, `None` if it is not declared
    fn relationship_type(&self, name: &str) -> Option<String>;

    /// Declared relationships as `(name, related type)`
    fn relationships(&self) -> Vec<(String, String)>;

    /// Records matching the request's filter and sort, restricted to `window`
    async fn query(
        &self,
        params: &EncodingParameters,
        window: Option<PageWindow>,
    ) -> Result<Vec<Record>>;

    /// Number of records matching the request's filter
    async fn count(&self, params: &EncodingParameters) -> Result<u64>;

    /// Look up a record; absence is not an error
    async fn find(&self, id: &str) -> Result<Option<Record>>;

    /// Look up a record that must exist, failing with `NotFound`
    async fn read(&self, id: &str) -> Result<Record>;

    /// Create a record from an inbound resource object
    async fn create(&self, resource: &ResourceObject, policy: UnknownMembers) -> Result<Record>;

    /// Apply the members present in `resource` to `record`
    async fn update(
        &self,
        record: Record,
        resource: &ResourceObject,
        policy: UnknownMembers,
    ) -> Result<Record>;

    /// Remove a record
    async fn delete(&self, record: Record) -> Result<()>;

    /// Linkage of a relationship, `NotFound` if it is not declared
    fn relationship(&self, record: &Record, name: &str) -> Result<RelationshipData>;

    /// Change relationship linkage and persist the record
    async fn update_relationship(
        &self,
        record: Record,
        name: &str,
        data: RelationshipData,
        mutation: RelationshipMutation,
    ) -> Result<Record>;

    /// Reflect a record into its JSON:API members
    fn resource(&self, resource_type: &str, record: &Record) -> Result<ResourceParts>;
}
