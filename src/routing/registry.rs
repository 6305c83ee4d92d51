//! Route registration.
//!
//! # Responsibilities
//! - Normalize and validate method sets against the router's allow-list
//! - Split routes into the static table and the dynamic table
//! - Merge repeated registrations of one pattern into a single route
//! - Build the decision tree and procedure at finalization
//!
//! # Design Decisions
//! - Finalization consumes the registry; there is no way to register into a
//!   finalized router short of building a new one
//! - Names live in their own index rather than sharing the dynamic table

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::observability::metrics;
use crate::routing::cache::ResolutionCache;
use crate::routing::codec;
use crate::routing::error::{RouterError, RouterResult};
use crate::routing::matcher::{Procedure, StaticTable};
use crate::routing::pattern::Pattern;
use crate::routing::route::{Methods, Route, RouteId, RouteOptions};
use crate::routing::router::CompiledRouter;
use crate::routing::tree::DecisionTree;

/// Mutable build-phase view of a router.
pub struct RouteRegistry<H> {
    config: RouterConfig,
    routes: Vec<Route<H>>,
    static_routes: HashMap<String, RouteId>,
    dynamic_routes: HashMap<String, RouteId>,
    names: HashMap<String, RouteId>,
}

impl<H> RouteRegistry<H> {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            static_routes: HashMap::new(),
            dynamic_routes: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Register `handler` for `path` under every requested method.
    pub fn add(&mut self, path: &str, handler: H, options: RouteOptions) -> RouterResult<RouteId>
    where
        H: Clone,
    {
        let methods = check_methods(&self.config, &options.methods)?;
        let pattern = Pattern::parse(path, self.config.delimiter)?;

        for param in options.requirements.keys() {
            if !pattern.has_param(param) {
                return Err(RouterError::invalid_pattern(
                    path,
                    format!("requirement names unknown parameter `{param}`"),
                ));
            }
        }

        let table = if pattern.is_static() {
            &self.static_routes
        } else {
            &self.dynamic_routes
        };
        let id = match table.get(pattern.key()).copied() {
            Some(id) => {
                let route = &self.routes[id.0];
                if !options.requirements.is_empty() && route.requirements() != &options.requirements {
                    tracing::warn!(
                        route = %id,
                        path = %route.path(),
                        "Requirements ignored for an already registered pattern"
                    );
                }
                id
            }
            None => {
                let id = RouteId(self.routes.len());
                let key = pattern.key().to_string();
                let is_static = pattern.is_static();
                self.routes
                    .push(Route::new(id, pattern, options.name.clone(), options.requirements));
                if is_static {
                    self.static_routes.insert(key, id);
                } else {
                    self.dynamic_routes.insert(key, id);
                }
                id
            }
        };

        if let Some(name) = options.name {
            if let Some(previous) = self.names.insert(name.clone(), id) {
                if previous != id {
                    tracing::warn!(name = %name, previous = %previous, route = %id, "Route name reassigned");
                }
            }
        }

        let route = &mut self.routes[id.0];
        for method in &methods {
            route.add_handler(method, handler.clone());
        }

        tracing::debug!(route = %id, path = %route.path(), methods = ?methods, "Route registered");
        Ok(id)
    }

    /// Register `handler` for one concrete instance of a registered pattern.
    pub fn add_override(
        &mut self,
        pattern: &str,
        concrete: &str,
        handler: H,
        methods: impl Into<Methods>,
    ) -> RouterResult<RouteId>
    where
        H: Clone,
    {
        let methods: Methods = methods.into();
        let methods = check_methods(&self.config, &methods)?;
        let parsed = Pattern::parse(pattern, self.config.delimiter)?;
        let table = if parsed.is_static() {
            &self.static_routes
        } else {
            &self.dynamic_routes
        };
        let id = table
            .get(parsed.key())
            .copied()
            .ok_or_else(|| RouterError::invalid_pattern(pattern, "pattern is not registered"))?;

        let route = &mut self.routes[id.0];
        let canonical =
            codec::canonicalize(route, concrete).map_err(|err| RouterError::invalid_pattern(pattern, err.to_string()))?;
        for method in &methods {
            route.add_override(method, canonical.clone(), handler.clone());
        }

        tracing::debug!(route = %id, canonical = %canonical, "Override registered");
        Ok(id)
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Route<H>> {
        self.names.get(name).map(|id| &self.routes[id.0])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build the decision procedure and freeze every route.
    ///
    /// With `compile` false the procedure is rendered for inspection only.
    pub fn finalize(self, compile: bool) -> CompiledRouter<H>
    where
        H: Clone,
    {
        let RouteRegistry {
            config,
            mut routes,
            static_routes,
            dynamic_routes,
            names,
        } = self;

        for route in &mut routes {
            route.finalize_params();
        }

        let mut dynamic: Vec<RouteId> = dynamic_routes.values().copied().collect();
        dynamic.sort();

        let mut tree = DecisionTree::generate(dynamic.iter().map(|id| (*id, routes[id.0].pattern())));
        tree.finalize();

        let labels = dynamic
            .iter()
            .map(|id| (*id, routes[id.0].path().to_string()))
            .collect();
        let mut procedure = Procedure::render(!static_routes.is_empty(), &tree, labels);
        procedure.optimize();
        let matcher = compile.then(|| procedure.compile());

        tracing::info!(
            routes = routes.len(),
            static_routes = static_routes.len(),
            dynamic_routes = dynamic.len(),
            groups = tree.group_count(),
            depth = tree.depth(),
            compiled = compile,
            "Router finalized"
        );
        metrics::record_route_count(static_routes.len(), dynamic.len());

        let statics: StaticTable = static_routes;
        CompiledRouter::new(
            ResolutionCache::new(config.cache_capacity),
            config,
            routes.into_iter().map(Arc::new).collect(),
            statics,
            names,
            procedure,
            matcher,
        )
    }
}

/// Default method when none is given; every method must be allowed.
pub(crate) fn check_methods(config: &RouterConfig, methods: &Methods) -> RouterResult<Vec<String>> {
    let methods: Vec<String> = if methods.is_empty() {
        vec![config.default_method.clone()]
    } else {
        methods.iter().map(str::to_string).collect()
    };
    if !config.allowed_methods.is_empty() {
        if let Some(method) = methods.iter().find(|m| !config.allowed_methods.contains(m)) {
            return Err(RouterError::InvalidMethod { method: method.clone() });
        }
    }
    Ok(methods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::params::Requirement;

    fn registry() -> RouteRegistry<&'static str> {
        RouteRegistry::new(RouterConfig::http())
    }

    #[test]
    fn test_add_splits_static_and_dynamic() {
        let mut registry = registry();
        let a = registry.add("/users/profile", "profile", RouteOptions::new()).unwrap();
        let b = registry.add("/users/<id:int>", "user", RouteOptions::new()).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.static_routes.get("users/profile"), Some(&a));
        assert_eq!(registry.dynamic_routes.get("users/<id:int>"), Some(&b));
    }

    #[test]
    fn test_add_merges_same_pattern() {
        let mut registry = registry();
        let a = registry.add("/items/<slug>", "get", RouteOptions::new()).unwrap();
        let b = registry
            .add("items/<slug>/", "post", RouteOptions::new().methods("POST"))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.routes[0].methods(), vec!["GET", "POST"]);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = registry();
        registry.add("/a", "first", RouteOptions::new()).unwrap();
        registry.add("/a", "second", RouteOptions::new()).unwrap();
        assert_eq!(registry.routes[0].handler("a", "GET"), Some(&"second"));
    }

    #[test]
    fn test_invalid_method() {
        let mut registry = registry();
        let err = registry
            .add("/a", "x", RouteOptions::new().methods(["GET", "BREW"]))
            .unwrap_err();
        assert_eq!(err, RouterError::InvalidMethod { method: "BREW".into() });
        assert!(registry.is_empty());

        let mut bare = RouteRegistry::new(RouterConfig::default());
        bare.add("/a", "x", RouteOptions::new().methods("BREW")).unwrap();
        assert_eq!(bare.routes[0].methods(), vec!["BREW"]);
    }

    #[test]
    fn test_default_method() {
        let mut bare = RouteRegistry::new(RouterConfig::default());
        bare.add("/a", "x", RouteOptions::new()).unwrap();
        assert_eq!(bare.routes[0].methods(), vec!["BASE"]);
    }

    #[test]
    fn test_unknown_requirement_rejected() {
        let mut registry = registry();
        let err = registry
            .add(
                "/users/<id:int>",
                "x",
                RouteOptions::new().requirement("uid", Requirement::one_of(["1"])),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_pattern");
    }

    #[test]
    fn test_names() {
        let mut registry = registry();
        registry.add("/a", "a", RouteOptions::new().name("home")).unwrap();
        registry.add("/b/<x>", "b", RouteOptions::new().name("thing")).unwrap();
        assert_eq!(registry.route_by_name("home").map(|r| r.path()), Some("a"));
        assert_eq!(registry.route_by_name("thing").map(|r| r.path()), Some("b/<x>"));
        assert!(registry.route_by_name("missing").is_none());

        registry.add("/c", "c", RouteOptions::new().name("home")).unwrap();
        assert_eq!(registry.route_by_name("home").map(|r| r.path()), Some("c"));
    }

    #[test]
    fn test_add_override() {
        let mut registry = registry();
        registry.add("/users/<id:int>", "user", RouteOptions::new()).unwrap();
        registry
            .add_override("/users/<id:int>", "/users/007", "root", "GET")
            .unwrap();
        assert_eq!(registry.routes[0].handler("users/7", "GET"), Some(&"root"));
        assert_eq!(registry.routes[0].handler("users/8", "GET"), Some(&"user"));

        let err = registry
            .add_override("/users/<id:int>", "/users/abc", "x", "GET")
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_pattern");

        let err = registry.add_override("/nope/<id>", "/nope/1", "x", "GET").unwrap_err();
        assert_eq!(err.kind(), "invalid_pattern");
    }

    #[test]
    fn test_finalize_builds_procedure() {
        let mut registry = registry();
        registry.add("/health", "h", RouteOptions::new()).unwrap();
        registry.add("/users/<id:int>", "u", RouteOptions::new()).unwrap();
        let router = registry.finalize(false);
        assert!(router.procedure().is_fast_fail());
        assert!(router.procedure().to_string().contains("return route#1  # users/<id:int>"));
        assert_eq!(router.routes().len(), 2);
    }
}
