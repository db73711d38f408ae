//! Request classification
//!
//! Maps an HTTP method and a resource path to exactly one [`Operation`]. The path below the
//! endpoint prefix takes one of four shapes:
//!
//! | Path | Target |
//! |---|---|
//! | `/{type}` | collection |
//! | `/{type}/{id}` | single resource |
//! | `/{type}/{id}/{relationship}` | related resource(s) |
//! | `/{type}/{id}/relationships/{relationship}` | relationship linkage |
//!
//! Any other shape is `NotFound`; a known shape with a method that selects no operation is
//! `MethodNotAllowed`.

use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path segment introducing a relationship linkage URL
const RELATIONSHIPS_SEGMENT: &str = "relationships";

/// Relationship part of a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipSegment {
    /// `/{type}/{id}/{name}`: the related resource(s)
    Related(String),
    /// `/{type}/{id}/relationships/{name}`: the linkage object
    Linkage(String),
}

impl RelationshipSegment {
    /// Relationship name
    pub fn name(&self) -> &str {
        match self {
            Self::Related(name) | Self::Linkage(name) => name,
        }
    }
}

/// Parsed request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Resource type
    pub resource_type: String,
    /// Resource identifier
    pub id: Option<String>,
    /// Relationship segment
    pub relationship: Option<RelationshipSegment>,
}

impl RequestTarget {
    /// Parse a path relative to the endpoint prefix, e.g. `articles/1/relationships/author`
    ///
    /// # Example
    ///
    /// ```rust
    /// use jsonapi_service::classifier::{RelationshipSegment, RequestTarget};
    ///
    /// let target = RequestTarget::parse("/articles/1/relationships/author").unwrap();
    /// assert_eq!(target.resource_type, "articles");
    /// assert_eq!(target.id.as_deref(), Some("1"));
    /// assert_eq!(
    ///     target.relationship,
    ///     Some(RelationshipSegment::Linkage("author".to_string()))
    /// );
    /// ```
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| segment.to_string())
            })
            .collect();

        let not_found = || Error::NotFound(format!("no resource at `/{}`", path.trim_start_matches('/')));

        let (resource_type, id, relationship) = match segments.as_slice() {
            [resource_type] => (resource_type, None, None),
            [resource_type, id] => (resource_type, Some(id), None),
            [_, _, name] if name == RELATIONSHIPS_SEGMENT => return Err(not_found()),
            [resource_type, id, name] => (
                resource_type,
                Some(id),
                Some(RelationshipSegment::Related(name.clone())),
            ),
            [resource_type, id, marker, name] if marker == RELATIONSHIPS_SEGMENT => (
                resource_type,
                Some(id),
                Some(RelationshipSegment::Linkage(name.clone())),
            ),
            _ => return Err(not_found()),
        };

        Ok(Self {
            resource_type: resource_type.clone(),
            id: id.cloned(),
            relationship,
        })
    }

    /// Relationship name, if the path has one
    pub fn relationship_name(&self) -> Option<&str> {
        self.relationship.as_ref().map(RelationshipSegment::name)
    }
}

/// Operation selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fetch a collection
    List,
    /// Create a resource
    Create,
    /// Fetch a single resource
    Read,
    /// Update a resource
    Update,
    /// Delete a resource
    Delete,
    /// Fetch the resource(s) a relationship points to
    ReadRelated,
    /// Fetch relationship linkage
    ReadRelationship,
    /// Replace, extend or shrink relationship linkage
    UpdateRelationship,
    /// CORS preflight
    Options,
}

impl Operation {
    /// Allow-list entry gating this operation; `Options` is never gated
    pub const fn required_permission(self) -> Option<AllowedMethod> {
        match self {
            Self::List => Some(AllowedMethod::List),
            Self::Create => Some(AllowedMethod::Create),
            Self::Read | Self::ReadRelated | Self::ReadRelationship => Some(AllowedMethod::Read),
            Self::Update | Self::UpdateRelationship => Some(AllowedMethod::Update),
            Self::Delete => Some(AllowedMethod::Delete),
            Self::Options => None,
        }
    }

    /// Whether the target record must be fetched before the operation runs
    pub const fn requires_record(self) -> bool {
        matches!(
            self,
            Self::Read
                | Self::Update
                | Self::Delete
                | Self::ReadRelated
                | Self::ReadRelationship
                | Self::UpdateRelationship
        )
    }

    /// Whether the operation reads a request body
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::UpdateRelationship)
    }

    /// Name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ReadRelated => "read_related",
            Self::ReadRelationship => "read_relationship",
            Self::UpdateRelationship => "update_relationship",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow-list entries in resource configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowedMethod {
    /// `GET /{type}`
    List,
    /// `POST /{type}`
    Create,
    /// `GET /{type}/{id}` and relationship reads
    Read,
    /// `PATCH /{type}/{id}` and relationship writes
    Update,
    /// `DELETE /{type}/{id}`
    Delete,
}

impl AllowedMethod {
    /// Every allow-list entry
    pub const ALL: [AllowedMethod; 5] = [
        AllowedMethod::List,
        AllowedMethod::Create,
        AllowedMethod::Read,
        AllowedMethod::Update,
        AllowedMethod::Delete,
    ];
}

impl fmt::Display for AllowedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// How a relationship write changes existing linkage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipMutation {
    /// `PATCH`/`PUT`: replace the linkage
    Replace,
    /// `POST`: add members to a to-many relationship
    Add,
    /// `DELETE`: remove members from a to-many relationship
    Remove,
}

impl RelationshipMutation {
    /// Mutation selected by a relationship write method
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::PATCH | Method::PUT => Some(Self::Replace),
            Method::POST => Some(Self::Add),
            Method::DELETE => Some(Self::Remove),
            _ => None,
        }
    }
}

fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn is_update(method: &Method) -> bool {
    *method == Method::PATCH || *method == Method::PUT
}

/// Select the operation for a method and target; first matching rule wins
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use jsonapi_service::classifier::{classify, Operation, RequestTarget};
///
/// let target = RequestTarget::parse("articles/1/author").unwrap();
/// assert_eq!(classify(&Method::GET, &target).unwrap(), Operation::ReadRelated);
/// ```
pub fn classify(method: &Method, target: &RequestTarget) -> Result<Operation> {
    if *method == Method::OPTIONS {
        return Ok(Operation::Options);
    }

    let operation = match (&target.id, &target.relationship) {
        (None, _) if is_read(method) => Some(Operation::List),
        (None, _) if *method == Method::POST => Some(Operation::Create),
        (Some(_), None) if is_read(method) => Some(Operation::Read),
        (Some(_), None) if is_update(method) => Some(Operation::Update),
        (Some(_), None) if *method == Method::DELETE => Some(Operation::Delete),
        (Some(_), Some(RelationshipSegment::Related(_))) if is_read(method) => {
            Some(Operation::ReadRelated)
        }
        (Some(_), Some(RelationshipSegment::Linkage(_))) if is_read(method) => {
            Some(Operation::ReadRelationship)
        }
        (Some(_), Some(RelationshipSegment::Linkage(_)))
            if RelationshipMutation::from_method(method).is_some() =>
        {
            Some(Operation::UpdateRelationship)
        }
        _ => None,
    };

    operation.ok_or_else(|| {
        Error::MethodNotAllowed(format!(
            "{} is not supported on this {} URL",
            method,
            target_kind(target)
        ))
    })
}

fn target_kind(target: &RequestTarget) -> &'static str {
    match (&target.id, &target.relationship) {
        (None, _) => "collection",
        (Some(_), None) => "resource",
        (Some(_), Some(RelationshipSegment::Related(_))) => "related resource",
        (Some(_), Some(RelationshipSegment::Linkage(_))) => "relationship",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_path(method: Method, path: &str) -> Result<Operation> {
        classify(&method, &RequestTarget::parse(path)?)
    }

    #[test]
    fn test_parse_shapes() {
        let target = RequestTarget::parse("articles").expect("collection");
        assert_eq!(target.id, None);
        assert_eq!(target.relationship, None);

        let target = RequestTarget::parse("/articles/1/").expect("resource");
        assert_eq!(target.id.as_deref(), Some("1"));

        let target = RequestTarget::parse("articles/1/author").expect("related");
        assert_eq!(target.relationship, Some(RelationshipSegment::Related("author".into())));
        assert_eq!(target.relationship_name(), Some("author"));

        let target = RequestTarget::parse("articles/1/relationships/tags").expect("linkage");
        assert_eq!(target.relationship, Some(RelationshipSegment::Linkage("tags".into())));
    }

    #[test]
    fn test_parse_decodes_segments() {
        let target = RequestTarget::parse("articles/a%20b").expect("resource");
        assert_eq!(target.id.as_deref(), Some("a b"));
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        for path in ["", "/", "articles/1/relationships", "articles/1/author/extra", "a/b/c/d/e"] {
            assert!(
                matches!(RequestTarget::parse(path), Err(Error::NotFound(_))),
                "expected NotFound for `{}`",
                path
            );
        }
    }

    #[test]
    fn test_classification_table() {
        let cases = [
            (Method::OPTIONS, "articles", Operation::Options),
            (Method::OPTIONS, "articles/1/relationships/tags", Operation::Options),
            (Method::GET, "articles", Operation::List),
            (Method::HEAD, "articles", Operation::List),
            (Method::POST, "articles", Operation::Create),
            (Method::GET, "articles/1", Operation::Read),
            (Method::PATCH, "articles/1", Operation::Update),
            (Method::PUT, "articles/1", Operation::Update),
            (Method::DELETE, "articles/1", Operation::Delete),
            (Method::GET, "articles/1/author", Operation::ReadRelated),
            (Method::GET, "articles/1/relationships/author", Operation::ReadRelationship),
            (Method::PATCH, "articles/1/relationships/tags", Operation::UpdateRelationship),
            (Method::POST, "articles/1/relationships/tags", Operation::UpdateRelationship),
            (Method::DELETE, "articles/1/relationships/tags", Operation::UpdateRelationship),
        ];

        for (method, path, expected) in cases {
            assert_eq!(
                classify_path(method.clone(), path).expect("classifies"),
                expected,
                "{} {}",
                method,
                path
            );
        }
    }

    #[test]
    fn test_unsupported_methods() {
        let cases = [
            (Method::DELETE, "articles"),
            (Method::PATCH, "articles"),
            (Method::POST, "articles/1"),
            (Method::POST, "articles/1/author"),
            (Method::DELETE, "articles/1/author"),
            (Method::TRACE, "articles/1/relationships/tags"),
        ];

        for (method, path) in cases {
            assert!(
                matches!(classify_path(method.clone(), path), Err(Error::MethodNotAllowed(_))),
                "expected MethodNotAllowed for {} {}",
                method,
                path
            );
        }
    }

    #[test]
    fn test_operation_permissions() {
        assert_eq!(Operation::List.required_permission(), Some(AllowedMethod::List));
        assert_eq!(Operation::ReadRelated.required_permission(), Some(AllowedMethod::Read));
        assert_eq!(
            Operation::UpdateRelationship.required_permission(),
            Some(AllowedMethod::Update)
        );
        assert_eq!(Operation::Options.required_permission(), None);
    }

    #[test]
    fn test_operations_requiring_record() {
        assert!(!Operation::List.requires_record());
        assert!(!Operation::Create.requires_record());
        assert!(!Operation::Options.requires_record());
        assert!(Operation::Delete.requires_record());
        assert!(Operation::ReadRelationship.requires_record());
        assert!(Operation::UpdateRelationship.requires_record());
    }

    #[test]
    fn test_relationship_mutation_from_method() {
        assert_eq!(
            RelationshipMutation::from_method(&Method::PATCH),
            Some(RelationshipMutation::Replace)
        );
        assert_eq!(RelationshipMutation::from_method(&Method::POST), Some(RelationshipMutation::Add));
        assert_eq!(
            RelationshipMutation::from_method(&Method::DELETE),
            Some(RelationshipMutation::Remove)
        );
        assert_eq!(RelationshipMutation::from_method(&Method::GET), None);
    }

    #[test]
    fn test_allowed_method_serde() {
        let methods: Vec<AllowedMethod> =
            serde_json::from_str(r#"["list","create","read","update","delete"]"#).expect("parses");
        assert_eq!(methods, AllowedMethod::ALL.to_vec());
        assert!(serde_json::from_str::<AllowedMethod>(r#""patch""#).is_err());
    }
}
