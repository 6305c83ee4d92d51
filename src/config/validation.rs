//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every route pattern parses and its requirements are usable
//! - Check methods against the router's allow-list
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RoutingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{RequirementConfig, RoutingConfig};
use crate::routing::pattern::Pattern;
use crate::routing::Requirement;

/// Upper bound on the resolution cache.
pub const MAX_CACHE_CAPACITY: usize = 1_000_000;

/// A single semantic problem in a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route `{path}` must start with `{delimiter}`")]
    MissingDelimiter { path: String, delimiter: char },

    #[error("route `{path}`: {reason}")]
    InvalidPattern { path: String, reason: String },

    #[error("route `{path}` uses method `{method}` outside the allow-list")]
    MethodNotAllowed { path: String, method: String },

    #[error("route `{path}` has a requirement for unknown parameter `{param}`")]
    UnknownParameter { path: String, param: String },

    #[error("route `{path}` has an invalid requirement for `{param}`: {reason}")]
    InvalidRequirement {
        path: String,
        param: String,
        reason: String,
    },

    #[error("route name `{name}` is used more than once")]
    DuplicateName { name: String },

    #[error("router default method must not be empty")]
    EmptyDefaultMethod,

    #[error("cache capacity {capacity} exceeds {max}")]
    CacheTooLarge { capacity: usize, max: usize },

    #[error("invalid {field} `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// Validate a route table, collecting every problem.
pub fn validate_config(config: &RoutingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let router = &config.router;

    if router.default_method.trim().is_empty() {
        errors.push(ValidationError::EmptyDefaultMethod);
    }
    if router.cache_capacity > MAX_CACHE_CAPACITY {
        errors.push(ValidationError::CacheTooLarge {
            capacity: router.cache_capacity,
            max: MAX_CACHE_CAPACITY,
        });
    }

    let check_methods = |path: &str, methods: &[String], errors: &mut Vec<ValidationError>| {
        if router.allowed_methods.is_empty() {
            return;
        }
        let requested: Vec<&String> = if methods.is_empty() {
            vec![&router.default_method]
        } else {
            methods.iter().collect()
        };
        for method in requested {
            if !router.allowed_methods.contains(method) {
                errors.push(ValidationError::MethodNotAllowed {
                    path: path.to_string(),
                    method: method.clone(),
                });
            }
        }
    };

    let mut names = HashSet::new();
    for route in &config.routes {
        if !route.path.starts_with(router.delimiter) {
            errors.push(ValidationError::MissingDelimiter {
                path: route.path.clone(),
                delimiter: router.delimiter,
            });
        }

        check_methods(&route.path, &route.methods, &mut errors);

        match Pattern::parse(&route.path, router.delimiter) {
            Ok(pattern) => {
                for (param, requirement) in &route.requirements {
                    if !pattern.has_param(param) {
                        errors.push(ValidationError::UnknownParameter {
                            path: route.path.clone(),
                            param: param.clone(),
                        });
                    }
                    if let RequirementConfig::Pattern(expr) = requirement {
                        if let Err(err) = Requirement::pattern(expr) {
                            errors.push(ValidationError::InvalidRequirement {
                                path: route.path.clone(),
                                param: param.clone(),
                                reason: err.to_string(),
                            });
                        }
                    }
                }
            }
            Err(err) => errors.push(ValidationError::InvalidPattern {
                path: route.path.clone(),
                reason: err.to_string(),
            }),
        }

        for instance in &route.overrides {
            if !instance.path.starts_with(router.delimiter) {
                errors.push(ValidationError::MissingDelimiter {
                    path: instance.path.clone(),
                    delimiter: router.delimiter,
                });
            }
            check_methods(&instance.path, &instance.methods, &mut errors);
        }

        if let Some(name) = &route.name {
            if !names.insert(name.as_str()) {
                errors.push(ValidationError::DuplicateName { name: name.clone() });
            }
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
