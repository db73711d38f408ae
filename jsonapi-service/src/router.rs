//! axum integration
//!
//! Mounts a [`JsonApiController`] under the endpoint's mount path. Everything below the
//! mount path is handed to the controller as-is; anything outside it gets a JSON:API
//! `404` document.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use crate::controller::{ApiRequest, ApiResponse, JsonApiController};
use crate::error::Error;

#[derive(Clone)]
struct RouterState {
    controller: Arc<JsonApiController>,
    mount_path: Arc<str>,
}

/// Router serving the controller's endpoint
///
/// # Example
///
/// ```rust,ignore
/// let controller = JsonApiController::new(Arc::new(config.clone()), registry)?;
/// Server::new(config).serve(router(controller)).await?;
/// ```
pub fn router(controller: JsonApiController) -> Router {
    let mount_path = controller.mount_path();
    let route = format!("{}/{{*path}}", mount_path);

    let state = RouterState {
        controller: Arc::new(controller),
        mount_path: Arc::from(mount_path),
    };

    Router::new()
        .route(&route, any(dispatch))
        .fallback(not_found)
        .with_state(state)
}

async fn dispatch(
    State(state): State<RouterState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    let path = uri
        .path()
        .strip_prefix(state.mount_path.as_ref())
        .unwrap_or_else(|| uri.path())
        .to_string();

    let request = ApiRequest {
        method,
        path,
        query: uri.query().map(str::to_string),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    };

    state.controller.handle(request).await
}

async fn not_found(uri: Uri) -> Response {
    Error::NotFound(format!("no resource at `{}`", uri.path())).into_response()
}
