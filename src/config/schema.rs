//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router
//! and its demo server. All types derive Serde traits for deserialization
//! from TOML route tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Methods accepted by the HTTP preset.
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Root configuration: router settings, server, observability, route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Router behaviour (delimiter, methods, cache).
    pub router: RouterConfig,

    /// Demo HTTP server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route table.
    pub routes: Vec<RouteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::http(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Router behaviour.
///
/// `Default` is the bare router; fields missing from a config file fall back
/// to the HTTP preset instead.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouterConfig {
    /// Segment delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Method used when registration or resolution names none.
    #[serde(default = "default_http_method")]
    pub default_method: String,

    /// If non-empty, registration rejects any other method.
    #[serde(default = "default_http_methods")]
    pub allowed_methods: Vec<String>,

    /// Resolution cache entries; zero disables caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Compile the matcher at finalization.
    #[serde(default = "default_compile")]
    pub compile: bool,
}

fn default_delimiter() -> char {
    '/'
}

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_http_methods() -> Vec<String> {
    HTTP_METHODS.iter().map(|m| m.to_string()).collect()
}

fn default_cache_capacity() -> usize {
    128
}

fn default_compile() -> bool {
    true
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            default_method: "BASE".to_string(),
            allowed_methods: Vec::new(),
            cache_capacity: default_cache_capacity(),
            compile: default_compile(),
        }
    }
}

impl RouterConfig {
    /// HTTP preset: `GET` default, standard method allow-list.
    pub fn http() -> Self {
        Self {
            default_method: default_http_method(),
            allowed_methods: default_http_methods(),
            ..Self::default()
        }
    }
}

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One entry of the route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route pattern, e.g. `/users/<id:int>`.
    pub path: String,

    /// Methods served; empty means the router's default method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Optional alias.
    #[serde(default)]
    pub name: Option<String>,

    /// Payload returned by the demo server for this route.
    #[serde(default)]
    pub response: String,

    /// Extra per-parameter constraints.
    #[serde(default)]
    pub requirements: BTreeMap<String, RequirementConfig>,

    /// Handlers for specific instances of the pattern.
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

/// Per-parameter constraint as written in the route table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RequirementConfig {
    /// Full-match regular expression.
    Pattern(String),
    /// Allowed raw values.
    OneOf(Vec<String>),
}

/// Handler bound to one concrete path of a dynamic route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OverrideConfig {
    /// Concrete path, e.g. `/users/1`.
    pub path: String,

    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub response: String,
}
