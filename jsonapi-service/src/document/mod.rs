//! JSON:API document shapes
//!
//! - [`request`]: inbound resource objects and relationship linkage parsed from request bodies
//! - [`response`]: outbound success documents, encoded resources and links

pub mod request;
pub mod response;

pub use request::{
    parse_relationship_document, parse_resource_document, RelationshipData, RelationshipObject,
    ResourceIdentifier, ResourceObject,
};
pub use response::{
    Document, EncodedRelationship, EncodedResource, Links, PrimaryData, ResourceParts,
};

/// The JSON:API media type
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Whether a request `Content-Type` is acceptable for a JSON:API body
///
/// The JSON:API media type without parameters and plain `application/json` are accepted.
/// An absent header is tolerated.
pub fn is_acceptable_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };

    let mut parts = content_type.split(';').map(str::trim);
    let essence = parts.next().unwrap_or_default().to_ascii_lowercase();
    let has_params = parts.any(|p| !p.is_empty());

    match essence.as_str() {
        MEDIA_TYPE => !has_params,
        "application/json" => true,
        _ => false,
    }
}
