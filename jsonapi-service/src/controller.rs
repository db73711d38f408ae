//! Request orchestration
//!
//! [`JsonApiController`] drives one request through a fixed sequence of steps:
//!
//! 1. parse the path and look up the resource type
//! 2. classify the operation and check it against the resource's allow-list
//! 3. parse query parameters and the request body
//! 4. fetch the target record when the operation needs one
//! 5. execute through the resource's adapter
//! 6. encode the success document
//!
//! Any step may fail; the failure is translated into an error document instead. Every
//! response carries the JSON:API media type and the configured extra headers.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{field, Instrument};

use crate::adapter::{Adapter, AdapterRegistry, Record};
use crate::classifier::{
    classify, AllowedMethod, Operation, RelationshipMutation, RelationshipSegment, RequestTarget,
};
use crate::config::{Config, ResourceConfig};
use crate::document::{
    is_acceptable_content_type, parse_relationship_document, parse_resource_document, Document,
    EncodedResource, Links, PrimaryData, RelationshipData, ResourceObject, ResourceParts,
    MEDIA_TYPE,
};
use crate::encoder::{Encoder, JsonEncoder};
use crate::error::{Error, Result};
use crate::pagination::{PageUrl, PageWindow};
use crate::query::{parse_query_string, EncodingParameters, QueryParameterParser};
use crate::translator::{log_error, ErrorDocument};

const PREFLIGHT_MAX_AGE: &str = "3600";
const PREFLIGHT_ALLOW_HEADERS: &str =
    "Content-Type, Access-Control-Allow-Headers, Authorization, X-Requested-With";

/// Transport-independent request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path below the endpoint mount path, e.g. `/articles/1`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    /// `Content-Type` header
    pub content_type: Option<String>,
    /// Request body
    pub body: Bytes,
}

impl ApiRequest {
    /// Request without a body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Set the query string
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set a JSON:API body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(MEDIA_TYPE.to_string());
        self.body = body.into();
        self
    }
}

/// Transport-independent response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Encoded body; empty for `204`
    pub body: Vec<u8>,
}

impl ApiResponse {
    fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, Vec::new())
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Request body after parsing
enum Payload {
    Empty,
    Resource(ResourceObject),
    Linkage(RelationshipData),
}

/// Include paths as a tree of relationship names
#[derive(Debug, Default)]
struct IncludeTree {
    children: BTreeMap<String, IncludeTree>,
}

impl IncludeTree {
    fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// JSON:API request orchestrator
///
/// # Example
///
/// ```rust,ignore
/// let config = Arc::new(Config::load()?);
/// let registry = AdapterRegistry::new()
///     .register("articles", ResourceAdapter::new(Articles, MemoryStore::new("articles")));
///
/// let controller = JsonApiController::new(config, registry)?;
/// let response = controller.handle(ApiRequest::new(Method::GET, "/articles")).await;
/// ```
pub struct JsonApiController {
    config: Arc<Config>,
    registry: Arc<AdapterRegistry>,
    encoder: Arc<dyn Encoder>,
    parser: QueryParameterParser,
    url_prefix: String,
    extra_headers: HeaderMap,
}

impl JsonApiController {
    /// Build a controller; fails if a configured resource has no adapter
    pub fn new(config: Arc<Config>, registry: AdapterRegistry) -> Result<Self> {
        registry.validate(&config.endpoint)?;

        let url_prefix = config.endpoint.url_prefix();
        let encoder = JsonEncoder::new(url_prefix.clone()).pretty(config.response.pretty_print);
        let extra_headers = configured_headers(&config);

        Ok(Self {
            config,
            registry: Arc::new(registry),
            encoder: Arc::new(encoder),
            parser: QueryParameterParser,
            url_prefix,
            extra_headers,
        })
    }

    /// Replace the default encoder
    pub fn with_encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Configuration the controller was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Route prefix the controller serves, e.g. `/api/v1`
    pub fn mount_path(&self) -> String {
        self.config.endpoint.mount_path()
    }

    /// Process one request; never fails, errors become error documents
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let span = tracing::info_span!(
            "jsonapi_request",
            method = %request.method,
            path = %request.path,
            resource_type = field::Empty,
            operation = field::Empty,
        );

        let result = self.dispatch(&request).instrument(span.clone()).await;
        let mut response = match result {
            Ok(response) => response,
            Err(error) => span.in_scope(|| self.error_response(&error)),
        };

        response
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        for (name, value) in &self.extra_headers {
            response.headers.insert(name.clone(), value.clone());
        }
        response
    }

    fn error_response(&self, error: &Error) -> ApiResponse {
        let document = ErrorDocument::from(error);
        let status = document.status_code();
        log_error(error, status);
        ApiResponse::new(status, self.encoder.errors(&document))
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let target = RequestTarget::parse(&request.path)?;
        let span = tracing::Span::current();
        span.record("resource_type", target.resource_type.as_str());

        let resource = self.resource_config(&target.resource_type)?;
        let adapter = self.registry.resolve(&target.resource_type, resource)?;

        let operation = classify(&request.method, &target)?;
        span.record("operation", operation.as_str());

        if let Some(required) = operation.required_permission() {
            if !resource.allows(required) {
                return Err(Error::Forbidden(format!(
                    "`{}` is not allowed on resource type `{}`",
                    operation, target.resource_type
                )));
            }
        }

        if operation == Operation::Options {
            return Ok(preflight(resource));
        }

        let raw = parse_query_string(request.query.as_deref().unwrap_or_default());
        let params = self.parser.parse(&raw)?;
        if self.config.endpoint.strict_query_parameters {
            if let Some(name) = params.first_unrecognized() {
                return Err(Error::malformed_query(
                    name,
                    format!("`{}` is not a supported query parameter", name),
                ));
            }
        }

        // Type whose resources make up the primary data; include paths are relative to it
        let primary_type = match &target.relationship {
            Some(segment) => {
                let name = segment.name();
                let related_type = adapter
                    .relationship_type(name)
                    .filter(|_| resource.exposes(name))
                    .ok_or_else(|| {
                        Error::NotFound(format!(
                            "relationship `{}` does not exist on `{}`",
                            name, target.resource_type
                        ))
                    })?;
                if matches!(segment, RelationshipSegment::Related(_)) {
                    self.resource_config(&related_type)?;
                }
                related_type
            }
            None => target.resource_type.clone(),
        };

        let includes = match (&params.include_paths, operation) {
            (
                Some(paths),
                Operation::List
                | Operation::Create
                | Operation::Read
                | Operation::Update
                | Operation::ReadRelated,
            ) => self.include_tree(&primary_type, paths)?,
            _ => IncludeTree::default(),
        };

        let payload = if operation.has_body() {
            self.parse_body(request, operation, &target, resource)?
        } else {
            Payload::Empty
        };

        let record = if operation.requires_record() {
            let id = target.id.as_deref().unwrap_or_default();
            let record = adapter.find(id).await?.ok_or_else(|| {
                Error::NotFound(format!(
                    "resource `{}` of type `{}` does not exist",
                    id, target.resource_type
                ))
            })?;
            Some(record)
        } else {
            None
        };

        let context = Context {
            request,
            target: &target,
            resource,
            adapter: adapter.as_ref(),
            params: &params,
            includes: &includes,
        };

        match (operation, record, payload) {
            (Operation::List, _, _) => self.list(&context).await,
            (Operation::Create, _, Payload::Resource(body)) => self.create(&context, &body).await,
            (Operation::Read, Some(record), _) => self.show(&context, record, StatusCode::OK).await,
            (Operation::Update, Some(record), Payload::Resource(body)) => {
                let record = adapter
                    .update(record, &body, resource.unknown_attributes)
                    .await?;
                self.show(&context, record, StatusCode::OK).await
            }
            (Operation::Delete, Some(record), _) => {
                adapter.delete(record).await?;
                Ok(ApiResponse::no_content())
            }
            (Operation::ReadRelated, Some(record), _) => {
                self.related(&context, &record, &primary_type).await
            }
            (Operation::ReadRelationship, Some(record), _) => self.linkage(&context, &record),
            (Operation::UpdateRelationship, Some(record), Payload::Linkage(data)) => {
                let mutation = RelationshipMutation::from_method(&request.method).ok_or_else(|| {
                    Error::MethodNotAllowed(format!(
                        "{} cannot modify a relationship",
                        request.method
                    ))
                })?;
                let name = target.relationship_name().unwrap_or_default();
                adapter
                    .update_relationship(record, name, data, mutation)
                    .await?;
                Ok(ApiResponse::no_content())
            }
            (operation, _, _) => Err(Error::unhandled(
                "DispatchError",
                format!("no handler for operation `{}`", operation),
            )),
        }
    }

    fn resource_config(&self, resource_type: &str) -> Result<&ResourceConfig> {
        self.config.endpoint.resource(resource_type).ok_or_else(|| {
            Error::NotFound(format!("resource type `{}` does not exist", resource_type))
        })
    }

    fn adapter_for(&self, resource_type: &str) -> Result<Arc<dyn Adapter>> {
        let resource = self.resource_config(resource_type)?;
        self.registry.resolve(resource_type, resource)
    }

    fn parse_body(
        &self,
        request: &ApiRequest,
        operation: Operation,
        target: &RequestTarget,
        resource: &ResourceConfig,
    ) -> Result<Payload> {
        if !is_acceptable_content_type(request.content_type.as_deref()) {
            return Err(Error::UnsupportedMediaType(format!(
                "expected `{}`, got `{}`",
                MEDIA_TYPE,
                request.content_type.as_deref().unwrap_or_default()
            )));
        }

        if operation == Operation::UpdateRelationship {
            return parse_relationship_document(&request.body).map(Payload::Linkage);
        }

        let body = parse_resource_document(&request.body)?;
        if body.resource_type != target.resource_type {
            return Err(Error::Conflict(format!(
                "resource type `{}` does not match endpoint `{}`",
                body.resource_type, target.resource_type
            )));
        }

        match operation {
            Operation::Create if body.id.is_some() && !resource.client_generated_ids => {
                Err(Error::Forbidden(format!(
                    "client-generated ids are not supported for `{}`",
                    target.resource_type
                )))
            }
            Operation::Update => match (&body.id, &target.id) {
                (None, _) => Err(Error::MalformedBody(
                    "resource object must have an `id`".to_string(),
                )),
                (Some(id), Some(expected)) if id != expected => Err(Error::Conflict(format!(
                    "resource id `{}` does not match endpoint id `{}`",
                    id, expected
                ))),
                _ => Ok(Payload::Resource(body)),
            },
            _ => Ok(Payload::Resource(body)),
        }
    }

    /// Validate include paths against declared relationships
    fn include_tree(&self, resource_type: &str, paths: &[String]) -> Result<IncludeTree> {
        let mut tree = IncludeTree::default();

        for path in paths {
            let mut node = &mut tree;
            let mut current_type = resource_type.to_string();

            for name in path.split('.') {
                let related_type = self
                    .adapter_for(&current_type)
                    .ok()
                    .and_then(|adapter| adapter.relationship_type(name))
                    .filter(|related| self.config.endpoint.resource(related).is_some())
                    .ok_or_else(|| {
                        Error::malformed_query(
                            "include",
                            format!("`{}` cannot be included from `{}`", path, resource_type),
                        )
                    })?;

                node = node.children.entry(name.to_string()).or_default();
                current_type = related_type;
            }
        }

        Ok(tree)
    }

    async fn list(&self, context: &Context<'_>) -> Result<ApiResponse> {
        let resource_type = &context.target.resource_type;
        let window =
            PageWindow::from_params(context.params.page.as_ref(), &self.config.endpoint.pagination);

        let total = context.adapter.count(context.params).await?;
        let records = context.adapter.query(context.params, Some(window)).await?;
        let size = records.len();

        let parts = records
            .iter()
            .map(|record| context.adapter.resource(resource_type, record))
            .collect::<Result<Vec<_>>>()?;
        let (data, included) = self.encode(parts, context).await?;

        let url = PageUrl::new(
            format!("{}/{}", self.url_prefix, resource_type),
            context.request.query.as_deref(),
        );
        tracing::debug!(total, size, offset = window.offset, limit = window.limit, "Listed resources");

        let document = Document::new(PrimaryData::Many(data))
            .with_included(included)
            .with_links(window.links(total, &url))
            .with_meta(window.meta(total, size));
        self.respond(StatusCode::OK, &document)
    }

    async fn create(&self, context: &Context<'_>, body: &ResourceObject) -> Result<ApiResponse> {
        let record = context
            .adapter
            .create(body, context.resource.unknown_attributes)
            .await?;
        self.show(context, record, StatusCode::CREATED).await
    }

    /// Single-resource response for read, update and create
    async fn show(
        &self,
        context: &Context<'_>,
        record: Record,
        status: StatusCode,
    ) -> Result<ApiResponse> {
        let parts = context
            .adapter
            .resource(&context.target.resource_type, &record)?;
        let (mut data, included) = self.encode(vec![parts], context).await?;
        let resource = data.pop().map(Box::new);
        let self_link = resource
            .as_ref()
            .and_then(|resource| resource.links.self_link.clone());

        let mut document = Document::new(PrimaryData::One(resource)).with_included(included);
        if let Some(link) = &self_link {
            document = document.with_links(Links::with_self(link.clone()));
        }

        let mut response = self.respond(status, &document)?;
        if status == StatusCode::CREATED {
            if let Some(value) = self_link.and_then(|link| HeaderValue::from_str(&link).ok()) {
                response.headers.insert(header::LOCATION, value);
            }
        }
        Ok(response)
    }

    async fn related(
        &self,
        context: &Context<'_>,
        record: &Record,
        related_type: &str,
    ) -> Result<ApiResponse> {
        let name = context.target.relationship_name().unwrap_or_default();
        let linkage = context.adapter.relationship(record, name)?;
        let related = self.adapter_for(related_type)?;

        let mut parts = Vec::new();
        for identifier in linkage.identifiers() {
            match related.find(&identifier.id).await? {
                Some(record) => parts.push(related.resource(&identifier.resource_type, &record)?),
                None => tracing::warn!(
                    related_type = %identifier.resource_type,
                    id = %identifier.id,
                    "Relationship points at a missing resource"
                ),
            }
        }

        let (mut data, included) = self.encode(parts, context).await?;
        let data = if linkage.is_to_one() {
            PrimaryData::One(data.pop().map(Box::new))
        } else {
            PrimaryData::Many(data)
        };

        let links = self.relationship_links(context.target, name);
        let document = Document::new(data)
            .with_included(included)
            .with_links(Links::with_self(links.related.unwrap_or_default()));
        self.respond(StatusCode::OK, &document)
    }

    fn linkage(&self, context: &Context<'_>, record: &Record) -> Result<ApiResponse> {
        let name = context.target.relationship_name().unwrap_or_default();
        let linkage = context.adapter.relationship(record, name)?;

        let document = Document::new(PrimaryData::Linkage(linkage))
            .with_links(self.relationship_links(context.target, name));
        self.respond(StatusCode::OK, &document)
    }

    fn relationship_links(&self, target: &RequestTarget, name: &str) -> Links {
        let base = format!(
            "{}/{}/{}",
            self.url_prefix,
            target.resource_type,
            target.id.as_deref().unwrap_or_default()
        );
        Links {
            self_link: Some(format!("{}/relationships/{}", base, name)),
            related: Some(format!("{}/{}", base, name)),
            ..Links::default()
        }
    }

    /// Encode primary resources and resolve their compound members
    async fn encode(
        &self,
        primaries: Vec<ResourceParts>,
        context: &Context<'_>,
    ) -> Result<(Vec<EncodedResource>, Vec<EncodedResource>)> {
        let mut seen: HashSet<(String, String)> = primaries
            .iter()
            .map(|parts| (parts.resource_type.clone(), parts.id.clone()))
            .collect();

        let mut worklist = Vec::new();
        if !context.includes.is_empty() {
            worklist.extend(primaries.iter().cloned().map(|parts| (parts, context.includes)));
        }

        let data = primaries
            .into_iter()
            .map(|parts| {
                let fields = context.params.fields_for(&parts.resource_type);
                self.encoder.resource(parts, fields)
            })
            .collect();

        let mut included = Vec::new();
        while let Some((parts, tree)) = worklist.pop() {
            for (name, subtree) in &tree.children {
                let Some(linkage) = parts.relationships.get(name) else {
                    continue;
                };

                for identifier in linkage.identifiers() {
                    let key = (identifier.resource_type.clone(), identifier.id.clone());
                    let first_visit = seen.insert(key);
                    if !first_visit && subtree.is_empty() {
                        continue;
                    }

                    let adapter = self.adapter_for(&identifier.resource_type)?;
                    let Some(record) = adapter.find(&identifier.id).await? else {
                        continue;
                    };
                    let related = adapter.resource(&identifier.resource_type, &record)?;

                    if !subtree.is_empty() {
                        worklist.push((related.clone(), subtree));
                    }
                    if first_visit {
                        let fields = context.params.fields_for(&related.resource_type);
                        included.push(self.encoder.resource(related, fields));
                    }
                }
            }
        }

        Ok((data, included))
    }

    fn respond(&self, status: StatusCode, document: &Document) -> Result<ApiResponse> {
        Ok(ApiResponse::new(status, self.encoder.document(document)?))
    }
}

/// Values shared by the operation handlers of one request
struct Context<'a> {
    request: &'a ApiRequest,
    target: &'a RequestTarget,
    resource: &'a ResourceConfig,
    adapter: &'a dyn Adapter,
    params: &'a EncodingParameters,
    includes: &'a IncludeTree,
}

/// CORS preflight answer derived from the allow-list
fn preflight(resource: &ResourceConfig) -> ApiResponse {
    let mut methods: Vec<&str> = Vec::new();
    for (allowed, method) in [
        (AllowedMethod::List, "GET"),
        (AllowedMethod::Read, "GET"),
        (AllowedMethod::Create, "POST"),
        (AllowedMethod::Update, "PATCH"),
        (AllowedMethod::Delete, "DELETE"),
    ] {
        if resource.allows(allowed) && !methods.contains(&method) {
            methods.push(method);
        }
    }
    methods.push("OPTIONS");

    let mut response = ApiResponse::no_content();
    let headers = &mut response.headers;
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(&methods.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(PREFLIGHT_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );
    response
}

fn configured_headers(config: &Config) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Ignoring invalid response header"),
        }
    }
    headers
}
