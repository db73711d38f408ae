//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: JSONAPI_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/jsonapi-service/{service_name}/config.toml
//! 4. System directory: /etc/jsonapi-service/{service_name}/config.toml
//! 5. Default values
//!
//! The loaded [`Config`] is immutable for the lifetime of the process. It is wrapped in an
//! `Arc` and handed to the controller explicitly rather than reached through global state.
//!
//! # Example
//!
//! ```toml
//! [service]
//! name = "blog-api"
//! port = 8080
//!
//! [endpoint]
//! base_url = "api"
//! version = "v1"
//!
//! [endpoint.resources.articles]
//! allowed_methods = ["list", "read", "create", "update", "delete"]
//!
//! [endpoint.resources.people]
//! adapter = "authors"
//! allowed_methods = ["list", "read"]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::classifier::AllowedMethod;
use crate::error::{Error, Result};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "JSONAPI_";

/// Directory prefix used for XDG and system config lookup
const CONFIG_DIR_PREFIX: &str = "jsonapi-service";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Response rendering configuration
    #[serde(default)]
    pub response: ResponseConfig,

    /// JSON:API endpoint and resource configuration
    #[serde(default)]
    pub endpoint: EndpointConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable compression
    #[serde(default = "default_true")]
    pub compression: bool,

    /// CORS mode: `controller` (OPTIONS answered by the JSON:API controller),
    /// `permissive`, `restrictive` or `disabled`
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            cors_mode: default_cors_mode(),
        }
    }
}

/// Response rendering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Extra headers added to every JSON:API response
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Emit indented JSON bodies
    #[serde(default)]
    pub pretty_print: bool,
}

/// Endpoint configuration: URL layout, pagination and resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// First path segment of the API, e.g. `api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Version path segment, e.g. `v1`
    #[serde(default = "default_version")]
    pub version: String,

    /// Absolute origin used in links, e.g. `https://example.com`
    #[serde(default)]
    pub public_url: Option<String>,

    /// Reject query parameters outside of the JSON:API set
    #[serde(default)]
    pub strict_query_parameters: bool,

    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Resource types served by this endpoint, keyed by type name
    #[serde(default)]
    pub resources: HashMap<String, ResourceConfig>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_version(),
            public_url: None,
            strict_query_parameters: false,
            pagination: PaginationConfig::default(),
            resources: HashMap::new(),
        }
    }
}

impl EndpointConfig {
    /// Route prefix the controller is mounted under, e.g. `/api/v1`
    pub fn mount_path(&self) -> String {
        let mut path = String::new();
        for segment in [self.base_url.as_str(), self.version.as_str()] {
            let segment = segment.trim_matches('/');
            if !segment.is_empty() {
                path.push('/');
                path.push_str(segment);
            }
        }
        path
    }

    /// Prefix for every generated link, e.g. `https://example.com/api/v1`
    pub fn url_prefix(&self) -> String {
        let origin = self
            .public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_default();
        format!("{}{}", origin, self.mount_path())
    }

    /// Look up a resource type
    pub fn resource(&self, resource_type: &str) -> Option<&ResourceConfig> {
        self.resources.get(resource_type)
    }
}

/// Pagination defaults for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the request does not specify one
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,

    /// Upper bound for a requested page size
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

/// How attributes and relationships without a mapping are treated on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownMembers {
    /// Each unknown member is reported as a validation error
    #[default]
    Reject,
    /// Unknown members are dropped
    Ignore,
}

/// Per-resource configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Adapter registry key; defaults to the resource type
    #[serde(default)]
    pub adapter: Option<String>,

    /// Operations this resource allows
    #[serde(default)]
    pub allowed_methods: Vec<AllowedMethod>,

    /// Policy for attributes and relationships without a mapping
    #[serde(default)]
    pub unknown_attributes: UnknownMembers,

    /// Accept a client-supplied `id` on create
    #[serde(default)]
    pub client_generated_ids: bool,

    /// Relationships reachable through related and relationship URLs; empty means all
    #[serde(default)]
    pub related: Vec<String>,
}

impl ResourceConfig {
    /// Resource allowing every operation
    pub fn allow_all() -> Self {
        Self {
            allowed_methods: AllowedMethod::ALL.to_vec(),
            ..Self::default()
        }
    }

    /// Registry key of the adapter serving this resource
    pub fn adapter_name<'a>(&'a self, resource_type: &'a str) -> &'a str {
        self.adapter.as_deref().unwrap_or(resource_type)
    }

    /// Whether `method` is in the allow-list
    pub fn allows(&self, method: AllowedMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    /// Whether a relationship may be reached through related and relationship URLs
    pub fn exposes(&self, relationship: &str) -> bool {
        self.related.is_empty() || self.related.iter().any(|name| name == relationship)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "controller".to_string()
}

fn default_base_url() -> String {
    "api".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_page_limit() -> u64 {
    crate::pagination::DEFAULT_LIMIT
}

fn default_max_page_limit() -> u64 {
    crate::pagination::MAX_LIMIT
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_DIR_PREFIX.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::named(service_name)));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment.merge(Self::env_provider()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file, bypassing directory discovery
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Self::env_provider())
            .extract()?;

        Ok(config)
    }

    fn env_provider() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Candidate config file paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR_PREFIX)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Default configuration with the given service name
    pub fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }

    /// Add or replace a resource type
    pub fn with_resource(mut self, resource_type: impl Into<String>, resource: ResourceConfig) -> Self {
        self.endpoint.resources.insert(resource_type.into(), resource);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: CONFIG_DIR_PREFIX.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            response: ResponseConfig::default(),
            endpoint: EndpointConfig::default(),
        }
    }
}
