//! Store error types
//!
//! # Example
//!
//! ```rust
//! use jsonapi_service::store::{StoreError, StoreErrorKind};
//!
//! let error = StoreError::already_exists("articles", "1");
//! assert_eq!(error.kind, StoreErrorKind::AlreadyExists);
//! assert_eq!(
//!     error.to_string(),
//!     "Store already_exists error during insert: Entity already exists [articles: 1]"
//! );
//! ```

use std::fmt;

use crate::error::{Error, FieldError};

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Finding a single record by id
    Find,
    /// Fetching records matching a query
    Fetch,
    /// Counting records matching a query
    Count,
    /// Inserting a new record
    Insert,
    /// Persisting changes to an existing record
    Update,
    /// Removing a record
    Remove,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Fetch => write!(f, "fetch"),
            Self::Count => write!(f, "count"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Record was not found
    NotFound,
    /// Record already exists (duplicate key)
    AlreadyExists,
    /// Constraint violation
    ConstraintViolation,
    /// Validation failed inside the store
    ValidationFailed,
    /// Failed to reach the backend
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Backend error
    Backend,
    /// Serialization or deserialization error
    Serialization,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Backend => write!(f, "backend"),
            Self::Serialization => write!(f, "serialization"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The entity kind involved (e.g. "articles")
    pub entity_type: Option<String>,
    /// The id of the record involved
    pub entity_id: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// "Not found" error with entity context
    pub fn not_found(
        operation: StoreOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(operation, StoreErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
    }

    /// "Already exists" error with entity context
    pub fn already_exists(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            StoreOperation::Insert,
            StoreErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Constraint violation
    pub fn constraint_violation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConstraintViolation, message)
    }

    /// Backend failure
    pub fn backend(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Backend, message)
    }

    /// Attach entity context
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Whether retrying the operation could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::ConnectionFailed | StoreErrorKind::Timeout
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;

        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(id)) => write!(f, " [{}: {}]", entity_type, id),
            (Some(entity_type), None) => write!(f, " [{}]", entity_type),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::NotFound => Error::NotFound(match (&err.entity_type, &err.entity_id) {
                (Some(entity_type), Some(id)) => format!("{} `{}` does not exist", entity_type, id),
                _ => err.message,
            }),
            StoreErrorKind::AlreadyExists | StoreErrorKind::ConstraintViolation => {
                Error::Conflict(err.message)
            }
            StoreErrorKind::ValidationFailed => {
                Error::ValidationFailed(vec![FieldError {
                    pointer: "/data".to_string(),
                    detail: err.message,
                }])
            }
            _ => Error::unhandled("StoreError", err.to_string()),
        }
    }
}
