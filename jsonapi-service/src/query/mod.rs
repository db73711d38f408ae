//! JSON:API query parameters
//!
//! Raw query strings are first decoded into a [`ParamValue`] tree by
//! [`parse_query_string`], then validated and typed by [`QueryParameterParser`].
//! The resulting [`EncodingParameters`] is built once per request and never mutated.

mod parser;
mod raw;

use std::collections::BTreeMap;

pub use parser::{QueryParameterParser, RECOGNIZED_PARAMETERS};
pub use raw::{parse_query_string, ParamValue, RawParams};

/// A single sort criterion; `field` never carries the `+`/`-` sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortParam {
    /// Field name as requested
    pub field: String,
    /// Sort direction
    pub ascending: bool,
}

impl SortParam {
    /// Create a sort criterion
    pub fn new(field: impl Into<String>, ascending: bool) -> Self {
        Self {
            field: field.into(),
            ascending,
        }
    }
}

/// Typed query parameters of a single request
///
/// `None` means the parameter was absent. For `include_paths` this means "no restriction",
/// which is distinct from an explicit empty list; for a type in `field_sets`, an empty list
/// means "no fields".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingParameters {
    /// Relationship paths to include, dot-separated
    pub include_paths: Option<Vec<String>>,
    /// Sparse fieldsets keyed by resource type
    pub field_sets: Option<BTreeMap<String, Vec<String>>>,
    /// Sort criteria in priority order
    pub sort: Option<Vec<SortParam>>,
    /// Pagination parameters
    pub page: Option<BTreeMap<String, String>>,
    /// Filter parameters
    pub filter: Option<BTreeMap<String, String>>,
    /// Parameters outside of the JSON:API set, as received
    pub unrecognized: Option<BTreeMap<String, ParamValue>>,
}

impl EncodingParameters {
    /// Sparse fieldset for a resource type, if the client restricted it
    pub fn fields_for(&self, resource_type: &str) -> Option<&[String]> {
        self.field_sets
            .as_ref()
            .and_then(|sets| sets.get(resource_type))
            .map(Vec::as_slice)
    }

    /// First unrecognized parameter name, if any
    pub fn first_unrecognized(&self) -> Option<&str> {
        self.unrecognized
            .as_ref()
            .and_then(|params| params.keys().next())
            .map(String::as_str)
    }
}
