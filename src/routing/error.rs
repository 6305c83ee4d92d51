//! Router error taxonomy.

use thiserror::Error;

/// Errors raised by registration, finalization and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Registration asked for a method outside the router's allow-list.
    #[error("Method `{method}` is not allowed by this router")]
    InvalidMethod { method: String },

    /// Registration attempted after the router was finalized.
    #[error("Router is already finalized")]
    AlreadyFinalized,

    /// The route pattern could not be parsed.
    #[error("Invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// No route matched, or a typed parameter failed conversion.
    #[error("No route matches `{path}`")]
    RouteNotFound { path: String },

    /// A route matched but has no handler for the requested method.
    #[error("Method `{method}` not allowed for `{path}`")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },

    /// Resolution attempted before an executable matcher exists.
    #[error("Router has not been finalized with a compiled matcher")]
    NotReady,
}

impl RouterError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        Self::RouteNotFound {
            path: path.to_string(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::InvalidMethod { .. } => "invalid_method",
            RouterError::AlreadyFinalized => "already_finalized",
            RouterError::InvalidPattern { .. } => "invalid_pattern",
            RouterError::RouteNotFound { .. } => "not_found",
            RouterError::MethodNotAllowed { .. } => "method_not_allowed",
            RouterError::NotReady => "not_ready",
        }
    }
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RouterError::not_found("/users/abc");
        assert_eq!(err.to_string(), "No route matches `/users/abc`");
        assert_eq!(err.kind(), "not_found");

        let err = RouterError::MethodNotAllowed {
            method: "POST".into(),
            path: "/items/x".into(),
            allowed: vec!["GET".into()],
        };
        assert_eq!(err.to_string(), "Method `POST` not allowed for `/items/x`");
    }
}
