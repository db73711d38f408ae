//! Document encoding
//!
//! The [`Encoder`] decides how reflected records become resource objects (links, sparse
//! fieldsets) and how documents become bytes. [`JsonEncoder`] is the `serde_json` default.

use std::collections::BTreeMap;

use serde_json::Map;

use crate::document::{
    Document, EncodedRelationship, EncodedResource, Links, ResourceParts,
};
use crate::error::Result;
use crate::translator::{error_body, ErrorDocument};

/// Turns records into resource objects and documents into bytes
pub trait Encoder: Send + Sync {
    /// Encode one resource, restricted to `fields` when the client requested a sparse fieldset
    fn resource(&self, parts: ResourceParts, fields: Option<&[String]>) -> EncodedResource;

    /// Serialize a success document
    fn document(&self, document: &Document) -> Result<Vec<u8>>;

    /// Serialize an error document
    fn errors(&self, document: &ErrorDocument) -> Vec<u8>;
}

/// Default JSON:API encoder
///
/// # Example
///
/// ```rust
/// use jsonapi_service::encoder::JsonEncoder;
///
/// let encoder = JsonEncoder::new("https://example.com/api/v1");
/// assert_eq!(encoder.self_link("articles", "1"), "https://example.com/api/v1/articles/1");
/// ```
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    url_prefix: String,
    pretty: bool,
}

impl JsonEncoder {
    /// Encoder emitting links under `url_prefix`
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            pretty: false,
        }
    }

    /// Emit indented JSON
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Link to a collection
    pub fn collection_link(&self, resource_type: &str) -> String {
        format!("{}/{}", self.url_prefix, resource_type)
    }

    /// Link to a single resource
    pub fn self_link(&self, resource_type: &str, id: &str) -> String {
        format!("{}/{}/{}", self.url_prefix, resource_type, id)
    }

    /// Relationship linkage and related links of a resource
    pub fn relationship_links(&self, resource_type: &str, id: &str, name: &str) -> Links {
        let base = self.self_link(resource_type, id);
        Links {
            self_link: Some(format!("{}/relationships/{}", base, name)),
            related: Some(format!("{}/{}", base, name)),
            ..Links::default()
        }
    }
}

impl Encoder for JsonEncoder {
    fn resource(&self, parts: ResourceParts, fields: Option<&[String]>) -> EncodedResource {
        let selected = |name: &str| fields.is_none_or(|fields| fields.iter().any(|f| f == name));

        let attributes: Map<_, _> = parts
            .attributes
            .into_iter()
            .filter(|(name, _)| selected(name.as_str()))
            .collect();

        let relationships: BTreeMap<_, _> = parts
            .relationships
            .into_iter()
            .filter(|(name, _)| selected(name.as_str()))
            .map(|(name, data)| {
                let links = self.relationship_links(&parts.resource_type, &parts.id, &name);
                (name, EncodedRelationship { links, data })
            })
            .collect();

        EncodedResource {
            links: Links::with_self(self.self_link(&parts.resource_type, &parts.id)),
            resource_type: parts.resource_type,
            id: parts.id,
            attributes,
            relationships,
        }
    }

    fn document(&self, document: &Document) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        Ok(bytes)
    }

    fn errors(&self, document: &ErrorDocument) -> Vec<u8> {
        error_body(document, self.pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{PrimaryData, RelationshipData, ResourceIdentifier};
    use serde_json::{json, Value};

    fn parts() -> ResourceParts {
        let mut relationships = BTreeMap::new();
        relationships.insert(
            "author".to_string(),
            RelationshipData::ToOne(Some(ResourceIdentifier::new("people", "9"))),
        );
        relationships.insert("tags".to_string(), RelationshipData::ToMany(vec![]));

        ResourceParts {
            resource_type: "articles".to_string(),
            id: "1".to_string(),
            attributes: json!({"title": "Hello", "body": "World"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            relationships,
        }
    }

    #[test]
    fn test_resource_links() {
        let encoder = JsonEncoder::new("/api/v1/");
        let resource = encoder.resource(parts(), None);

        assert_eq!(resource.links.self_link.as_deref(), Some("/api/v1/articles/1"));
        let author = &resource.relationships["author"];
        assert_eq!(
            author.links.self_link.as_deref(),
            Some("/api/v1/articles/1/relationships/author")
        );
        assert_eq!(author.links.related.as_deref(), Some("/api/v1/articles/1/author"));
        assert_eq!(encoder.collection_link("articles"), "/api/v1/articles");
    }

    #[test]
    fn test_sparse_fieldset() {
        let encoder = JsonEncoder::new("/api/v1");
        let fields = vec!["title".to_string(), "author".to_string()];
        let resource = encoder.resource(parts(), Some(fields.as_slice()));

        assert_eq!(resource.attributes.keys().collect::<Vec<_>>(), vec!["title"]);
        assert_eq!(resource.relationships.keys().collect::<Vec<_>>(), vec!["author"]);

        let resource = encoder.resource(parts(), Some(&[][..]));
        let json = serde_json::to_value(&resource).expect("json");
        assert_eq!(json.get("attributes"), None);
        assert_eq!(json.get("relationships"), None);
    }

    #[test]
    fn test_document_bytes() {
        let encoder = JsonEncoder::new("/api/v1");
        let document = Document::new(PrimaryData::One(None));
        let bytes = encoder.document(&document).expect("encodes");
        assert_eq!(serde_json::from_slice::<Value>(&bytes).expect("json"), json!({"data": null}));

        let pretty = encoder.pretty(true).document(&document).expect("encodes");
        assert!(String::from_utf8_lossy(&pretty).contains('\n'));
    }
}
