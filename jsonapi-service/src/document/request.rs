//! Inbound request documents

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// `{type, id}` pair identifying a single resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource identifier
    pub id: String,
}

impl ResourceIdentifier {
    /// Create an identifier
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Relationship linkage: a to-one reference (possibly `null`) or an ordered to-many list
///
/// # Example
///
/// ```rust
/// use jsonapi_service::document::RelationshipData;
///
/// let to_one: RelationshipData = serde_json::from_str(r#"{"type":"people","id":"9"}"#).unwrap();
/// assert!(to_one.is_to_one());
///
/// let empty: RelationshipData = serde_json::from_str("null").unwrap();
/// assert_eq!(empty, RelationshipData::ToOne(None));
///
/// let to_many: RelationshipData = serde_json::from_str("[]").unwrap();
/// assert_eq!(to_many, RelationshipData::ToMany(vec![]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// Ordered list of identifiers
    ToMany(Vec<ResourceIdentifier>),
    /// Single identifier or `null`
    ToOne(Option<ResourceIdentifier>),
}

impl RelationshipData {
    /// Whether this is a to-one linkage
    pub fn is_to_one(&self) -> bool {
        matches!(self, Self::ToOne(_))
    }

    /// Identifiers in linkage order
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Self::ToMany(ids) => ids.iter().collect(),
            Self::ToOne(id) => id.iter().collect(),
        }
    }
}

/// Relationship member of an inbound resource object
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationshipObject {
    /// Linkage to write
    pub data: RelationshipData,
}

/// Inbound resource object
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceObject {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Identifier; absent on create unless the client generates ids
    #[serde(default)]
    pub id: Option<String>,
    /// Attribute values by member name
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Relationship linkage by member name
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipObject>,
}

#[derive(Deserialize)]
struct ResourceDocument {
    data: ResourceObject,
}

#[derive(Deserialize)]
struct RelationshipDocument {
    data: RelationshipData,
}

/// Parse a `{"data": {resource object}}` request body
pub fn parse_resource_document(body: &[u8]) -> Result<ResourceObject> {
    parse_body::<ResourceDocument>(body).map(|document| document.data)
}

/// Parse a `{"data": linkage}` request body
pub fn parse_relationship_document(body: &[u8]) -> Result<RelationshipData> {
    parse_body::<RelationshipDocument>(body).map(|document| document.data)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MalformedBody("request body is empty".to_string()));
    }

    serde_json::from_slice(body).map_err(|err| {
        if err.is_syntax() || err.is_eof() {
            Error::MalformedBody(format!("request body is not valid JSON: {}", err))
        } else {
            Error::MalformedBody(format!("request body is not a valid JSON:API document: {}", err))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_document() {
        let body = br#"{
            "data": {
                "type": "articles",
                "attributes": {"title": "Rails is Omakase", "words": 120},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "tags": {"data": [{"type": "tags", "id": "1"}, {"type": "tags", "id": "2"}]},
                    "editor": {"data": null}
                }
            }
        }"#;

        let resource = parse_resource_document(body).expect("parses");
        assert_eq!(resource.resource_type, "articles");
        assert_eq!(resource.id, None);
        assert_eq!(resource.attributes.get("words"), Some(&Value::from(120)));
        assert_eq!(
            resource.relationships["author"].data,
            RelationshipData::ToOne(Some(ResourceIdentifier::new("people", "9")))
        );
        assert_eq!(resource.relationships["tags"].data.identifiers().len(), 2);
        assert_eq!(resource.relationships["editor"].data, RelationshipData::ToOne(None));
    }

    #[test]
    fn test_parse_resource_document_minimal() {
        let resource = parse_resource_document(br#"{"data":{"type":"articles","id":"1"}}"#)
            .expect("parses");
        assert_eq!(resource.id.as_deref(), Some("1"));
        assert!(resource.attributes.is_empty());
        assert!(resource.relationships.is_empty());
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = parse_resource_document(b"{\"data\":").unwrap_err();
        assert!(matches!(err, Error::MalformedBody(ref m) if m.contains("not valid JSON")));
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        assert!(matches!(
            parse_resource_document(b"  "),
            Err(Error::MalformedBody(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_document() {
        let err = parse_resource_document(br#"{"data":{"attributes":{}}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedBody(ref m) if m.contains("JSON:API")));

        let err = parse_resource_document(br#"{"data":{"type":"articles","id":7}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[test]
    fn test_parse_relationship_document() {
        let data = parse_relationship_document(br#"{"data":[{"type":"tags","id":"3"}]}"#)
            .expect("parses");
        assert_eq!(data, RelationshipData::ToMany(vec![ResourceIdentifier::new("tags", "3")]));

        let data = parse_relationship_document(br#"{"data":null}"#).expect("parses");
        assert_eq!(data, RelationshipData::ToOne(None));

        assert!(parse_relationship_document(br#"{"data":"x"}"#).is_err());
    }

    #[test]
    fn test_relationship_data_serializes_as_linkage() {
        let data = RelationshipData::ToOne(Some(ResourceIdentifier::new("people", "9")));
        assert_eq!(
            serde_json::to_value(&data).expect("serializes"),
            serde_json::json!({"type": "people", "id": "9"})
        );
        assert_eq!(
            serde_json::to_value(RelationshipData::ToOne(None)).expect("serializes"),
            Value::Null
        );
    }
}
