//! Error translation
//!
//! Maps every [`Error`] to one or more JSON:API error objects. A validation failure yields
//! one object per offending member; everything else yields exactly one. Server-side
//! failures never expose their internal message.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::document::MEDIA_TYPE;
use crate::error::Error;

/// Generic detail for 5xx responses
const INTERNAL_DETAIL: &str = "An internal error occurred";

/// Location of the problem in the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSource {
    /// JSON pointer into the request document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Query parameter that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// JSON:API error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// HTTP status code as a string
    pub status: String,
    /// Short summary, fixed per error kind
    pub title: String,
    /// Explanation specific to this occurrence
    pub detail: String,
    /// Offending request member
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: status.as_u16().to_string(),
            title: title.into(),
            detail: detail.into(),
            source: None,
        }
    }

    fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
            parameter: None,
        });
        self
    }

    fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: None,
            parameter: Some(parameter.into()),
        });
        self
    }
}

/// Top-level error document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDocument {
    /// Error objects, primary error first
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    /// Status of the primary error; 500 for an empty document
    pub fn status_code(&self) -> StatusCode {
        self.errors
            .first()
            .and_then(|error| error.status.parse::<u16>().ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&Error> for ErrorDocument {
    fn from(error: &Error) -> Self {
        Self {
            errors: translate(error),
        }
    }
}

/// Map a failure to its error objects
///
/// # Example
///
/// ```rust
/// use jsonapi_service::error::{Error, FieldError};
/// use jsonapi_service::translator::translate;
///
/// let errors = translate(&Error::ValidationFailed(vec![
///     FieldError::attribute("title", "must not be blank"),
///     FieldError::attribute("body", "must not be blank"),
/// ]));
///
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors[0].status, "422");
/// ```
pub fn translate(error: &Error) -> Vec<ErrorObject> {
    match error {
        Error::ValidationFailed(fields) if !fields.is_empty() => fields
            .iter()
            .map(|field| {
                ErrorObject::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Unprocessable entity",
                    field.detail.clone(),
                )
                .with_pointer(field.pointer.clone())
            })
            .collect(),
        Error::ValidationFailed(_) => vec![ErrorObject::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Unprocessable entity",
            "The resource failed validation",
        )
        .with_pointer("/data")],
        other => vec![single(other)],
    }
}

fn single(error: &Error) -> ErrorObject {
    match error {
        Error::NotFound(detail) => ErrorObject::new(StatusCode::NOT_FOUND, "Not found", detail),
        Error::Forbidden(detail) => ErrorObject::new(StatusCode::FORBIDDEN, "Forbidden", detail),
        Error::MethodNotAllowed(detail) => {
            ErrorObject::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", detail)
        }
        Error::MalformedQuery { parameter, message } => {
            ErrorObject::new(StatusCode::BAD_REQUEST, "Malformed query parameter", message)
                .with_parameter(parameter.clone())
        }
        Error::UnknownField { field, parameter } => ErrorObject::new(
            StatusCode::BAD_REQUEST,
            "Unknown field",
            format!("`{}` is not a known field", field),
        )
        .with_parameter(parameter.clone()),
        Error::MalformedBody(detail) => {
            ErrorObject::new(StatusCode::BAD_REQUEST, "Malformed request body", detail)
                .with_pointer("/data")
        }
        Error::UnsupportedMediaType(detail) => ErrorObject::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type",
            detail,
        ),
        Error::Conflict(detail) => ErrorObject::new(StatusCode::CONFLICT, "Conflict", detail),
        Error::ValidationFailed(_) => ErrorObject::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Unprocessable entity",
            "The resource failed validation",
        ),
        Error::Configuration(_) | Error::Config(_) => ErrorObject::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration error",
            INTERNAL_DETAIL,
        ),
        Error::Io(_) => ErrorObject::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unhandled exception of `std::io::Error`",
            INTERNAL_DETAIL,
        ),
        Error::Unhandled { kind, .. } => ErrorObject::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled exception of `{}`", kind),
            INTERNAL_DETAIL,
        ),
    }
}

/// Serialize an error document; falls back to a fixed body if serialization fails
pub(crate) fn error_body(document: &ErrorDocument, pretty: bool) -> Vec<u8> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(document)
    } else {
        serde_json::to_vec(document)
    };

    encoded.unwrap_or_else(|err| {
        tracing::error!("Failed to serialize error document: {}", err);
        br#"{"errors":[{"status":"500","title":"Unhandled exception","detail":"An internal error occurred"}]}"#
            .to_vec()
    })
}

/// Log a failure at the level its status calls for
pub(crate) fn log_error(error: &Error, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "Request failed: {}", error);
    } else {
        tracing::warn!(status = status.as_u16(), "Request rejected: {}", error);
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let document = ErrorDocument::from(&self);
        let status = document.status_code();
        log_error(&self, status);

        let mut response = (status, error_body(&document, false)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldError;
    use serde_json::{json, Value};

    #[test]
    fn test_validation_errors_are_aggregated() {
        let errors = translate(&Error::ValidationFailed(vec![
            FieldError::attribute("author.name", "must not be blank"),
            FieldError::relationship("tags", "expected an array"),
        ]));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].title, "Unprocessable entity");
        assert_eq!(errors[0].detail, "must not be blank");
        assert_eq!(
            errors[0].source.as_ref().and_then(|s| s.pointer.as_deref()),
            Some("/data/attributes/name")
        );
        assert_eq!(
            errors[1].source.as_ref().and_then(|s| s.pointer.as_deref()),
            Some("/data/relationships/tags")
        );
    }

    #[test]
    fn test_status_per_kind() {
        let cases = [
            (Error::NotFound("x".into()), "404"),
            (Error::Forbidden("x".into()), "403"),
            (Error::MethodNotAllowed("x".into()), "405"),
            (Error::malformed_query("page", "x"), "400"),
            (Error::unknown_field("colour", "sort"), "400"),
            (Error::MalformedBody("x".into()), "400"),
            (Error::UnsupportedMediaType("x".into()), "415"),
            (Error::Conflict("x".into()), "409"),
            (Error::Configuration("x".into()), "500"),
            (Error::unhandled("StoreError", "x"), "500"),
        ];

        for (error, status) in cases {
            assert_eq!(translate(&error)[0].status, status, "{:?}", error);
        }
    }

    #[test]
    fn test_query_errors_point_at_parameter() {
        let errors = translate(&Error::malformed_query("page", "must be an object"));
        let source = errors[0].source.clone().expect("source");
        assert_eq!(source.parameter.as_deref(), Some("page"));
        assert_eq!(source.pointer, None);
    }

    #[test]
    fn test_unhandled_hides_internal_message() {
        let errors = translate(&Error::unhandled("StoreError", "connection refused at 10.0.0.3"));
        assert_eq!(errors[0].title, "Unhandled exception of `StoreError`");
        assert_eq!(errors[0].detail, INTERNAL_DETAIL);

        let errors = translate(&Error::Configuration("no adapter `articles`".into()));
        assert!(!errors[0].detail.contains("articles"));
    }

    #[test]
    fn test_document_status_code() {
        let document = ErrorDocument::from(&Error::Conflict("id mismatch".into()));
        assert_eq!(document.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorDocument { errors: vec![] }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_envelope() {
        let response = Error::NotFound("resource `1` does not exist".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some(MEDIA_TYPE)
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            json,
            json!({"errors": [{"status": "404", "title": "Not found", "detail": "resource `1` does not exist"}]})
        );
    }
}
