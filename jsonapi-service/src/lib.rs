//! # jsonapi-service
//!
//! Server-side [JSON:API](https://jsonapi.org) resource layer for axum services.
//!
//! ## Features
//!
//! - **Request classification**: method + path shape select exactly one operation
//! - **Query parameters**: `include`, `fields`, `sort`, `page` and `filter` parsed into typed values
//! - **Resource adapters**: explicit field-mapping tables over any [`Store`](store::Store)
//! - **Pagination**: offset/limit windows with `first`/`prev`/`next`/`last` links and meta
//! - **Compound documents**: nested `include` paths and sparse fieldsets
//! - **Error documents**: every failure becomes a `{"errors": [...]}` envelope
//! - **Server**: tower-http middleware stack, request ids, graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use jsonapi_service::prelude::*;
//!
//! #[derive(Clone, Default)]
//! struct Article {
//!     id: Option<String>,
//!     title: String,
//! }
//!
//! impl Entity for Article {
//!     fn id(&self) -> Option<&str> {
//!         self.id.as_deref()
//!     }
//!
//!     fn set_id(&mut self, id: String) {
//!         self.id = Some(id);
//!     }
//!
//!     fn column(&self, name: &str) -> Option<FilterValue> {
//!         (name == "title").then(|| self.title.clone().into())
//!     }
//! }
//!
//! struct Articles;
//!
//! impl ResourceDefinition for Articles {
//!     type Record = Article;
//!
//!     fn schema(&self) -> Schema<Article> {
//!         Schema::new().attribute("title", |a: &Article| a.title.clone(), |a, v| a.title = v)
//!     }
//!
//!     fn instantiate(&self) -> Article {
//!         Article::default()
//!     }
//!
//!     fn filter(&self, predicates: &mut Predicates<'_, Article>, filters: &BTreeMap<String, String>) -> Result<()> {
//!         predicates.equal_all(filters)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?
//!         .with_resource("articles", ResourceConfig::allow_all());
//!     init_tracing(&config)?;
//!
//!     let registry = AdapterRegistry::new()
//!         .register("articles", ResourceAdapter::new(Articles, MemoryStore::new("articles")));
//!     let controller = JsonApiController::new(Arc::new(config.clone()), registry)?;
//!
//!     Server::new(config).serve(router(controller)).await
//! }
//! ```

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod document;
pub mod encoder;
pub mod error;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod router;
pub mod server;
pub mod store;
pub mod translator;

#[cfg(all(test, feature = "memory-store"))]
mod test_support;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{
        Adapter, AdapterRegistry, Cardinality, Predicates, Record, ResourceAdapter,
        ResourceDefinition, Schema,
    };
    pub use crate::classifier::{AllowedMethod, Operation, RelationshipMutation};
    pub use crate::config::{
        Config, EndpointConfig, PaginationConfig, ResourceConfig, UnknownMembers,
    };
    pub use crate::controller::{ApiRequest, ApiResponse, JsonApiController};
    pub use crate::document::{RelationshipData, ResourceIdentifier, ResourceObject, MEDIA_TYPE};
    pub use crate::encoder::{Encoder, JsonEncoder};
    pub use crate::error::{Error, FieldError, Result};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::PageWindow;
    pub use crate::query::{EncodingParameters, QueryParameterParser, SortParam};
    pub use crate::router::router;
    pub use crate::server::Server;
    #[cfg(feature = "memory-store")]
    pub use crate::store::MemoryStore;
    pub use crate::store::{
        Entity, FilterCondition, FilterOperator, FilterValue, OrderDirection, Ordering, Query,
        Store, StoreError, StoreErrorKind, StoreResult,
    };

    // Re-export commonly used external types
    pub use axum::{routing::get, Router};
    pub use tokio;
}
