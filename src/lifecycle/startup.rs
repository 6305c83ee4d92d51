//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging and the optional metrics endpoint
//! - Turn a validated route table into a finalized router
//!
//! # Design Decisions
//! - Fail fast: any route that cannot be registered aborts startup
//! - The same builder serves startup and hot reload

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ObservabilityConfig, RequirementConfig, RoutingConfig};
use crate::observability::{init_logging, metrics};
use crate::routing::registry::RouteRegistry;
use crate::routing::{CompiledRouter, Requirement, RouteOptions, RouterError, RouterResult};

/// What the demo server answers for a matched route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Pattern as written in the route table.
    pub route: String,
    pub name: Option<String>,
    pub response: String,
}

/// Router over the table's endpoints.
pub type EndpointRouter = CompiledRouter<Arc<Endpoint>>;

pub fn init_observability(config: &ObservabilityConfig) {
    init_logging(&config.log_level);

    if config.metrics_enabled {
        match config.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}

/// Register every route and override of `config` and finalize.
pub fn build_router(config: &RoutingConfig) -> RouterResult<EndpointRouter> {
    let mut registry = RouteRegistry::new(config.router.clone());

    for route in &config.routes {
        let mut options = RouteOptions::new().methods(route.methods.clone());
        if let Some(name) = &route.name {
            options = options.name(name.clone());
        }
        for (param, requirement) in &route.requirements {
            let requirement = match requirement {
                RequirementConfig::Pattern(expr) => Requirement::pattern(expr)
                    .map_err(|e| RouterError::invalid_pattern(&route.path, e.to_string()))?,
                RequirementConfig::OneOf(values) => Requirement::one_of(values.iter().cloned()),
            };
            options = options.requirement(param.clone(), requirement);
        }

        let endpoint = |response: &str| {
            Arc::new(Endpoint {
                route: route.path.clone(),
                name: route.name.clone(),
                response: response.to_string(),
            })
        };

        registry.add(&route.path, endpoint(&route.response), options)?;
        for instance in &route.overrides {
            registry.add_override(
                &route.path,
                &instance.path,
                endpoint(&instance.response),
                instance.methods.clone(),
            )?;
        }
    }

    Ok(registry.finalize(config.router.compile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::routing::ParamValue;

    const TABLE: &str = r#"
        [[routes]]
        path = "/users/<id:int>"
        methods = ["GET", "PUT"]
        name = "user"
        response = "user detail"

        [[routes.overrides]]
        path = "/users/007"
        methods = ["GET"]
        response = "agent"

        [[routes]]
        path = "/export/<fmt>"
        response = "export"
        requirements.fmt = { one_of = ["json", "csv"] }

        [[routes]]
        path = "/health"
        response = "ok"
    "#;

    #[test]
    fn test_build_router_from_table() {
        let config = parse_config(TABLE).unwrap();
        let router = build_router(&config).unwrap();
        assert_eq!(router.routes().len(), 3);
        assert!(router.is_compiled());

        let res = router.resolve("/users/42", Some("PUT")).unwrap();
        assert_eq!(res.handler.response, "user detail");
        assert_eq!(res.params.get("id"), Some(&ParamValue::Int(42)));

        let res = router.resolve("/users/7", Some("GET")).unwrap();
        assert_eq!(res.handler.response, "agent");
        let res = router.resolve("/users/7", Some("PUT")).unwrap();
        assert_eq!(res.handler.response, "user detail");

        assert!(router.resolve("/export/json", None).is_ok());
        assert_eq!(router.resolve("/export/xml", None).unwrap_err().kind(), "not_found");
        assert_eq!(router.resolve("/health", None).unwrap().handler.response, "ok");
        assert_eq!(router.route_by_name("user").map(|r| r.path()), Some("users/<id:int>"));
    }

    #[test]
    fn test_bad_override_aborts() {
        let config = parse_config(
            r#"
            [[routes]]
            path = "/users/<id:int>"

            [[routes.overrides]]
            path = "/users/abc"
            "#,
        )
        .unwrap();
        assert_eq!(build_router(&config).unwrap_err().kind(), "invalid_pattern");
    }
}
