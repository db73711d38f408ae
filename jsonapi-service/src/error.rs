//! Error taxonomy for the JSON:API pipeline
//!
//! Every step of request processing returns [`Result`]. Failures are values, never
//! control flow: the controller's terminal error state hands them to the
//! [`translator`](crate::translator), which renders the `{"errors": [...]}` envelope.

use std::fmt;

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// A single attribute-level validation failure
///
/// `pointer` is a JSON pointer into the request document, e.g. `/data/attributes/title`.
///
/// # Example
///
/// ```rust
/// use jsonapi_service::error::FieldError;
///
/// let error = FieldError::attribute("author.name", "must not be blank");
/// assert_eq!(error.pointer, "/data/attributes/name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// JSON pointer to the offending member
    pub pointer: String,
    /// Human-readable validation message
    pub detail: String,
}

impl FieldError {
    /// Error on an attribute; only the last segment of a dotted property path is kept
    pub fn attribute(path: &str, detail: impl Into<String>) -> Self {
        let name = path.rsplit('.').next().unwrap_or(path);
        Self {
            pointer: format!("/data/attributes/{}", name),
            detail: detail.into(),
        }
    }

    /// Error on a relationship member
    pub fn relationship(name: &str, detail: impl Into<String>) -> Self {
        Self {
            pointer: format!("/data/relationships/{}", name),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer, self.detail)
    }
}

/// Failure taxonomy
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown resource type, missing record or missing relationship name
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not in the resource's allow-list
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Method and path shape do not select any operation
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Query parameter shape violation
    #[error("Malformed query parameter `{parameter}`: {message}")]
    MalformedQuery {
        /// Offending parameter, e.g. `sort` or `page`
        parameter: String,
        /// What is wrong with it
        message: String,
    },

    /// Request body is not JSON or not a valid JSON:API document
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Request body declared a media type other than JSON:API
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Attribute-level validation, one entry per offending member
    #[error("Validation failed: {} error(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),

    /// Filter or sort field that maps to no attribute
    #[error("Unknown field `{field}` in `{parameter}`")]
    UnknownField {
        /// Requested field name
        field: String,
        /// Query parameter it came from
        parameter: String,
    },

    /// Store-level uniqueness or concurrency violation, or a document/URL mismatch
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing adapter or resource registration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration loading error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any uncategorized failure from the Store or Encoder
    #[error("Unhandled {kind}: {message}")]
    Unhandled {
        /// Short failure kind, used in the public error title
        kind: String,
        /// Internal message, logged but never rendered
        message: String,
    },
}

impl Error {
    /// Shape error on a recognized query parameter
    pub fn malformed_query(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedQuery {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Unknown filter/sort field
    pub fn unknown_field(field: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            parameter: parameter.into(),
        }
    }

    /// Uncategorized failure
    pub fn unhandled(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unhandled {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Whether this failure maps to a 5xx response
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Config(_) | Self::Io(_) | Self::Unhandled { .. }
        )
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::unhandled("serde_json::Error", err.to_string())
    }
}
