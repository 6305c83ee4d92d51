//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Hold the frozen route tables and the compiled matcher
//! - Resolve a path and optional method to route, handler and parameters
//! - Memoize successful resolutions in a bounded LRU cache
//! - Distinguish "no route" from "route without this method"
//!
//! # Design Decisions
//! - Immutable after construction apart from the cache (thread-safe readers)
//! - Only successful resolutions are cached; misses are recomputed
//! - Parameter conversion failures are reported as a plain miss

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::observability::metrics;
use crate::routing::cache::{CacheKey, ResolutionCache};
use crate::routing::codec;
use crate::routing::error::{RouterError, RouterResult};
use crate::routing::matcher::{Matcher, Procedure, Segments, StaticTable};
use crate::routing::params::Params;
use crate::routing::registry::{self, RouteRegistry};
use crate::routing::route::{Methods, Route, RouteId, RouteOptions};

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution<H> {
    pub route: Arc<Route<H>>,
    pub handler: H,
    /// Positional arguments; holds the method when one was requested.
    pub args: Vec<String>,
    pub params: Params,
    /// Path rebuilt from the typed parameters, with leading delimiter.
    pub canonical_path: String,
}

/// Finalized router: route tables, procedure and (optionally) matcher.
pub struct CompiledRouter<H> {
    config: RouterConfig,
    routes: Vec<Arc<Route<H>>>,
    static_routes: StaticTable,
    names: HashMap<String, RouteId>,
    procedure: Procedure,
    matcher: Option<Matcher>,
    cache: ResolutionCache<Resolution<H>>,
}

impl<H: Clone> CompiledRouter<H> {
    /// Resolve `path`; `None` for method means the router's default method.
    pub fn resolve(&self, path: &str, method: Option<&str>) -> RouterResult<Resolution<H>> {
        let matcher = self.matcher.as_ref().ok_or(RouterError::NotReady)?;

        let key = CacheKey::new(path, method);
        if let Some(hit) = self.cache.get(&key) {
            metrics::record_cache_hit();
            metrics::record_resolution("matched");
            return Ok(hit);
        }
        if self.cache.capacity() > 0 {
            metrics::record_cache_miss();
        }

        let result = self.lookup(matcher, path, method);
        match &result {
            Ok(resolution) => {
                metrics::record_resolution("matched");
                if let Some(evicted) = self.cache.insert(key, resolution.clone()) {
                    metrics::record_cache_eviction();
                    tracing::trace!(path = %evicted.path, "Evicted cached resolution");
                }
            }
            Err(err) => metrics::record_resolution(err.kind()),
        }
        result
    }

    fn lookup(&self, matcher: &Matcher, path: &str, method: Option<&str>) -> RouterResult<Resolution<H>> {
        let delimiter = self.config.delimiter;
        let stripped = path
            .strip_prefix(delimiter)
            .ok_or_else(|| RouterError::not_found(path))?;
        let segments = Segments::split(stripped, delimiter);

        let (id, basket) = matcher
            .find(&segments, &self.static_routes)
            .ok_or_else(|| RouterError::not_found(path))?;
        let route = &self.routes[id.0];

        let (params, canonical) = if route.is_static() {
            (Params::new(), route.path().to_string())
        } else {
            codec::parse(route, &basket).map_err(|err| {
                tracing::debug!(path = %path, route = %id, error = %err, "Parameter conversion failed");
                RouterError::not_found(path)
            })?
        };

        let method_key = method.unwrap_or(&self.config.default_method);
        let handler = route
            .handler(&canonical, method_key)
            .cloned()
            .ok_or_else(|| RouterError::MethodNotAllowed {
                method: method_key.to_string(),
                path: path.to_string(),
                allowed: route.allowed_methods(&canonical),
            })?;

        Ok(Resolution {
            route: Arc::clone(route),
            handler,
            args: method.map(|m| vec![m.to_string()]).unwrap_or_default(),
            params,
            canonical_path: format!("{delimiter}{canonical}"),
        })
    }
}

impl<H> fmt::Debug for CompiledRouter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRouter")
            .field("delimiter", &self.config.delimiter)
            .field("routes", &self.routes.len())
            .field("static_routes", &self.static_routes.len())
            .field("names", &self.names.len())
            .field("compiled", &self.matcher.is_some())
            .field("cache_capacity", &self.cache.capacity())
            .finish()
    }
}

impl<H> CompiledRouter<H> {
    pub(crate) fn new(
        cache: ResolutionCache<Resolution<H>>,
        config: RouterConfig,
        routes: Vec<Arc<Route<H>>>,
        static_routes: StaticTable,
        names: HashMap<String, RouteId>,
        procedure: Procedure,
        matcher: Option<Matcher>,
    ) -> Self {
        Self {
            config,
            routes,
            static_routes,
            names,
            procedure,
            matcher,
            cache,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The rendered decision procedure.
    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    /// False when finalized with `compile = false`.
    pub fn is_compiled(&self) -> bool {
        self.matcher.is_some()
    }

    pub fn routes(&self) -> &[Arc<Route<H>>] {
        &self.routes
    }

    pub fn route(&self, id: RouteId) -> Option<&Arc<Route<H>>> {
        self.routes.get(id.0)
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Arc<Route<H>>> {
        self.names.get(name).and_then(|id| self.routes.get(id.0))
    }

    pub fn cache(&self) -> &ResolutionCache<Resolution<H>> {
        &self.cache
    }
}

enum State<H> {
    Building(RouteRegistry<H>),
    Finalized(CompiledRouter<H>),
}

/// Router with a one-shot build phase.
///
/// Routes are added, then `finalize` freezes them; afterwards only
/// resolution is possible.
pub struct Router<H> {
    config: RouterConfig,
    state: State<H>,
}

impl<H: Clone> Router<H> {
    /// Bare router: `BASE` default method, any method allowed.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            state: State::Building(RouteRegistry::new(config.clone())),
            config,
        }
    }

    pub fn add(&mut self, path: &str, handler: H, options: RouteOptions) -> RouterResult<RouteId> {
        match &mut self.state {
            State::Building(registry) => registry.add(path, handler, options),
            State::Finalized(_) => {
                registry::check_methods(&self.config, &options.methods)?;
                Err(RouterError::AlreadyFinalized)
            }
        }
    }

    pub fn add_override(
        &mut self,
        pattern: &str,
        concrete: &str,
        handler: H,
        methods: impl Into<Methods>,
    ) -> RouterResult<RouteId> {
        match &mut self.state {
            State::Building(registry) => registry.add_override(pattern, concrete, handler, methods),
            State::Finalized(_) => {
                let methods: Methods = methods.into();
                registry::check_methods(&self.config, &methods)?;
                Err(RouterError::AlreadyFinalized)
            }
        }
    }

    /// Freeze the routes and build the matcher.
    pub fn finalize(&mut self, compile: bool) -> RouterResult<()> {
        let registry = match &mut self.state {
            State::Building(registry) => {
                std::mem::replace(registry, RouteRegistry::new(self.config.clone()))
            }
            State::Finalized(_) => return Err(RouterError::AlreadyFinalized),
        };
        self.state = State::Finalized(registry.finalize(compile));
        Ok(())
    }

    pub fn resolve(&self, path: &str, method: Option<&str>) -> RouterResult<Resolution<H>> {
        match &self.state {
            State::Building(_) => Err(RouterError::NotReady),
            State::Finalized(compiled) => compiled.resolve(path, method),
        }
    }
}

impl<H> Router<H> {
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn route_by_name(&self, name: &str) -> Option<&Route<H>> {
        match &self.state {
            State::Building(registry) => registry.route_by_name(name),
            State::Finalized(compiled) => compiled.route_by_name(name).map(|route| &**route),
        }
    }

    /// The rendered procedure, once finalized.
    pub fn procedure(&self) -> Option<&Procedure> {
        self.compiled().map(CompiledRouter::procedure)
    }

    pub fn compiled(&self) -> Option<&CompiledRouter<H>> {
        match &self.state {
            State::Building(_) => None,
            State::Finalized(compiled) => Some(compiled),
        }
    }

    pub fn into_compiled(self) -> Option<CompiledRouter<H>> {
        match self.state {
            State::Building(_) => None,
            State::Finalized(compiled) => Some(compiled),
        }
    }
}

impl<H: Clone> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::params::ParamValue;

    fn http_router() -> Router<&'static str> {
        Router::with_config(RouterConfig::http())
    }

    #[test]
    fn test_compiled_router_debug() {
        let mut router = http_router();
        router.add("/a", "a", RouteOptions::new()).unwrap();
        router.add("/b/<x>", "b", RouteOptions::new()).unwrap();
        router.finalize(true).unwrap();

        let text = format!("{:?}", router.compiled().unwrap());
        assert!(text.contains("routes: 2"));
        assert!(text.contains("static_routes: 1"));
        assert!(text.contains("compiled: true"));
    }

    #[test]
    fn test_resolve_static_and_dynamic() {
        let mut router = http_router();
        router.add("/users/<id:int>", "user", RouteOptions::new()).unwrap();
        router.add("/users/profile", "profile", RouteOptions::new()).unwrap();
        router.finalize(true).unwrap();

        let res = router.resolve("/users/profile", None).unwrap();
        assert_eq!(res.handler, "profile");
        assert!(res.params.is_empty());
        assert!(res.args.is_empty());

        let res = router.resolve("/users/42", Some("GET")).unwrap();
        assert_eq!(res.handler, "user");
        assert_eq!(res.params.get("id"), Some(&ParamValue::Int(42)));
        assert_eq!(res.args, vec!["GET"]);
        assert_eq!(res.canonical_path, "/users/42");

        let err = router.resolve("/users/abc", None).unwrap_err();
        assert_eq!(err, RouterError::RouteNotFound { path: "/users/abc".into() });
    }

    #[test]
    fn test_method_not_allowed() {
        let mut router = http_router();
        router.add("/items/<slug>", "item", RouteOptions::new().methods("GET")).unwrap();
        router.finalize(true).unwrap();

        match router.resolve("/items/x", Some("POST")).unwrap_err() {
            RouterError::MethodNotAllowed { method, allowed, .. } => {
                assert_eq!(method, "POST");
                assert_eq!(allowed, vec!["GET"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut router = http_router();
        assert_eq!(router.resolve("/", None).unwrap_err(), RouterError::NotReady);
        router.add("/", "root", RouteOptions::new()).unwrap();
        router.finalize(true).unwrap();
        assert!(router.is_finalized());

        assert_eq!(
            router.add("/late", "x", RouteOptions::new()).unwrap_err(),
            RouterError::AlreadyFinalized
        );
        assert_eq!(
            router
                .add("/late", "x", RouteOptions::new().methods("BREW"))
                .unwrap_err(),
            RouterError::InvalidMethod { method: "BREW".into() }
        );
        assert_eq!(router.finalize(true).unwrap_err(), RouterError::AlreadyFinalized);
        assert_eq!(router.resolve("/", None).unwrap().handler, "root");
    }

    #[test]
    fn test_uncompiled_router_is_not_ready() {
        let mut router = http_router();
        router.add("/a/<x>", "a", RouteOptions::new()).unwrap();
        router.finalize(false).unwrap();
        assert_eq!(router.resolve("/a/1", None).unwrap_err(), RouterError::NotReady);
        assert!(router.procedure().is_some_and(Procedure::is_fast_fail));
    }

    #[test]
    fn test_missing_leading_delimiter() {
        let mut router = http_router();
        router.add("/a", "a", RouteOptions::new()).unwrap();
        router.finalize(true).unwrap();
        assert_eq!(router.resolve("a", None).unwrap_err().kind(), "not_found");
    }

    #[test]
    fn test_successful_resolutions_are_cached() {
        let mut router = http_router();
        router.add("/a/<x:int>", "a", RouteOptions::new()).unwrap();
        router.finalize(true).unwrap();
        let compiled = router.compiled().unwrap();

        compiled.resolve("/a/1", None).unwrap();
        assert!(compiled.resolve("/a/b", None).is_err());
        assert!(compiled.cache().contains(&CacheKey::new("/a/1", None)));
        assert!(!compiled.cache().contains(&CacheKey::new("/a/b", None)));
    }
}
