//! A registered route: pattern, handler tables and parameter schema.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::routing::params::{ParamDescriptor, Requirement};
use crate::routing::pattern::Pattern;

/// Stable index of a route inside its router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(pub usize);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route#{}", self.0)
    }
}

/// Method set requested at registration.
///
/// A single method converts into a one-element set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Methods(Vec<String>);

impl Methods {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Methods {
    fn from(method: &str) -> Self {
        Methods(vec![method.to_string()])
    }
}

impl From<String> for Methods {
    fn from(method: String) -> Self {
        Methods(vec![method])
    }
}

impl From<Vec<String>> for Methods {
    fn from(methods: Vec<String>) -> Self {
        Methods(methods)
    }
}

impl From<Vec<&str>> for Methods {
    fn from(methods: Vec<&str>) -> Self {
        Methods(methods.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Methods {
    fn from(methods: &[&str]) -> Self {
        Methods(methods.iter().map(|m| m.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Methods {
    fn from(methods: [&str; N]) -> Self {
        Methods(methods.iter().map(|m| m.to_string()).collect())
    }
}

/// Optional registration arguments.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub(crate) methods: Methods,
    pub(crate) name: Option<String>,
    pub(crate) requirements: HashMap<String, Requirement>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn methods(mut self, methods: impl Into<Methods>) -> Self {
        self.methods = methods.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn requirement(mut self, param: impl Into<String>, requirement: Requirement) -> Self {
        self.requirements.insert(param.into(), requirement);
        self
    }
}

/// A route and everything needed to serve it.
pub struct Route<H> {
    id: RouteId,
    pattern: Pattern,
    name: Option<String>,
    requirements: HashMap<String, Requirement>,
    /// Coarse table: method -> handler.
    handlers: HashMap<String, H>,
    /// Per-instance table: (method, canonical path) -> handler.
    overrides: HashMap<(String, String), H>,
    params: Vec<ParamDescriptor>,
}

impl<H> Route<H> {
    pub(crate) fn new(
        id: RouteId,
        pattern: Pattern,
        name: Option<String>,
        requirements: HashMap<String, Requirement>,
    ) -> Self {
        Self {
            id,
            pattern,
            name,
            requirements,
            handlers: HashMap::new(),
            overrides: HashMap::new(),
            params: Vec::new(),
        }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Normalized pattern, delimiters stripped.
    pub fn path(&self) -> &str {
        self.pattern.key()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.pattern.is_static()
    }

    pub fn requirements(&self) -> &HashMap<String, Requirement> {
        &self.requirements
    }

    /// Finalized parameter schema; empty until finalization.
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Methods with a handler, sorted.
    pub fn methods(&self) -> Vec<String> {
        let methods: BTreeSet<&String> = self
            .handlers
            .keys()
            .chain(self.overrides.keys().map(|(method, _)| method))
            .collect();
        methods.into_iter().cloned().collect()
    }

    /// Methods that resolve for one instance: the method table plus the
    /// overrides registered for `canonical`.
    pub fn allowed_methods(&self, canonical: &str) -> Vec<String> {
        let methods: BTreeSet<&String> = self
            .handlers
            .keys()
            .chain(
                self.overrides
                    .keys()
                    .filter(|(_, path)| path == canonical)
                    .map(|(method, _)| method),
            )
            .collect();
        methods.into_iter().cloned().collect()
    }

    /// Last registration for a method wins.
    pub(crate) fn add_handler(&mut self, method: &str, handler: H) {
        self.handlers.insert(method.to_string(), handler);
    }

    pub(crate) fn add_override(&mut self, method: &str, canonical: String, handler: H) {
        self.overrides.insert((method.to_string(), canonical), handler);
    }

    /// Instance override first, then the method table.
    pub fn handler(&self, canonical: &str, method: &str) -> Option<&H> {
        if !self.overrides.is_empty() {
            if let Some(handler) = self.overrides.get(&(method.to_string(), canonical.to_string())) {
                return Some(handler);
            }
        }
        self.handlers.get(method)
    }

    /// Schema derived from the pattern and requirements.
    pub(crate) fn describe_params(&self) -> Vec<ParamDescriptor> {
        self.pattern
            .params()
            .map(|(index, name, kind)| ParamDescriptor {
                name: name.to_string(),
                kind: kind.clone(),
                index,
                requirement: self.requirements.get(name).cloned(),
            })
            .collect()
    }

    pub(crate) fn finalize_params(&mut self) {
        self.params = self.describe_params();
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("path", &self.path())
            .field("name", &self.name)
            .field("static", &self.is_static())
            .field("methods", &self.methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> Route<&'static str> {
        Route::new(RouteId(0), Pattern::parse(path, '/').unwrap(), None, HashMap::new())
    }

    #[test]
    fn test_methods_conversion() {
        let methods: Methods = "GET".into();
        assert_eq!(methods.iter().collect::<Vec<_>>(), vec!["GET"]);

        let methods: Methods = ["GET", "POST"].into();
        assert_eq!(methods.iter().count(), 2);
        assert!(Methods::default().is_empty());
    }

    #[test]
    fn test_handler_tables() {
        let mut route = route("/users/<id:int>");
        route.add_handler("GET", "get");
        route.add_handler("POST", "post");
        route.add_handler("GET", "get-v2");
        route.add_override("GET", "users/1".into(), "admin");

        assert_eq!(route.handler("users/5", "GET"), Some(&"get-v2"));
        assert_eq!(route.handler("users/1", "GET"), Some(&"admin"));
        assert_eq!(route.handler("users/1", "POST"), Some(&"post"));
        assert_eq!(route.handler("users/1", "DELETE"), None);
        assert_eq!(route.methods(), vec!["GET".to_string(), "POST".to_string()]);
    }

    #[test]
    fn test_allowed_methods_per_instance() {
        let mut route = route("/u/<id:int>");
        route.add_handler("GET", "get");
        route.add_override("DELETE", "u/7".into(), "delete");

        assert_eq!(route.allowed_methods("u/8"), vec!["GET".to_string()]);
        assert_eq!(
            route.allowed_methods("u/7"),
            vec!["DELETE".to_string(), "GET".to_string()]
        );
        assert_eq!(route.methods(), vec!["DELETE".to_string(), "GET".to_string()]);
    }

    #[test]
    fn test_finalize_params() {
        let mut route = route("/a/<x:int>/b/<y>");
        assert!(route.params().is_empty());
        route.finalize_params();

        let schema: Vec<_> = route.params().iter().map(|p| (p.name.as_str(), p.index)).collect();
        assert_eq!(schema, vec![("x", 1), ("y", 3)]);
    }
}
