//! Outbound success documents

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::request::RelationshipData;
use crate::pagination::PageMeta;

/// Reflection of a record produced by its adapter, before encoding
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceParts {
    /// Resource type
    pub resource_type: String,
    /// Resource identifier
    pub id: String,
    /// Attribute values by member name
    pub attributes: Map<String, Value>,
    /// Relationship linkage by member name
    pub relationships: BTreeMap<String, RelationshipData>,
}

/// Links object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Links {
    /// Link to the current document or member
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link to the related resource(s) of a relationship
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    /// First page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    /// Previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Last page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl Links {
    /// Links object with only `self`
    pub fn with_self(url: impl Into<String>) -> Self {
        Self {
            self_link: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Relationship member of an encoded resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedRelationship {
    /// Relationship and related links
    pub links: Links,
    /// Linkage
    pub data: RelationshipData,
}

/// Resource object as emitted in `data` or `included`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedResource {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource identifier
    pub id: String,
    /// Attributes after sparse fieldset filtering
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    /// Relationships after sparse fieldset filtering
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, EncodedRelationship>,
    /// Resource links
    pub links: Links,
}

/// Primary data of a success document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// Single resource or `null`
    One(Option<Box<EncodedResource>>),
    /// Resource collection
    Many(Vec<EncodedResource>),
    /// Relationship linkage
    Linkage(RelationshipData),
}

/// Top-level success document
///
/// Never carries `errors`; failures are rendered by the translator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Primary data
    pub data: PrimaryData,
    /// Compound document members
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<EncodedResource>,
    /// Top-level links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// Top-level meta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl Document {
    /// Document with the given primary data and nothing else
    pub fn new(data: PrimaryData) -> Self {
        Self {
            data,
            included: Vec::new(),
            links: None,
            meta: None,
        }
    }

    /// Set compound members
    pub fn with_included(mut self, included: Vec<EncodedResource>) -> Self {
        self.included = included;
        self
    }

    /// Set top-level links
    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    /// Set top-level meta
    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}
