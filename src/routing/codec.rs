//! Parameter codec: raw captures to typed parameters and canonical path.

use thiserror::Error;

use crate::routing::matcher::{Basket, Segments};
use crate::routing::params::{ParamDescriptor, Params};
use crate::routing::pattern::{Pattern, Segment};
use crate::routing::route::Route;

/// Conversion failure for a captured parameter.
///
/// Resolution reports these as a plain routing miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterTypeError {
    #[error("Parameter `{name}` was not captured")]
    Missing { name: String },

    #[error("Parameter `{name}` expects {expected}, got `{raw}`")]
    Mismatch {
        name: String,
        expected: String,
        raw: String,
    },

    #[error("Parameter `{name}` does not satisfy its requirement: `{raw}`")]
    Requirement { name: String, raw: String },

    #[error("`{path}` is not an instance of the pattern")]
    NotAnInstance { path: String },
}

/// Convert a route's basket into typed params and the canonical path
/// (without the leading delimiter).
pub fn parse<H>(route: &Route<H>, basket: &Basket<'_>) -> Result<(Params, String), ParameterTypeError> {
    parse_with(route.pattern(), route.params(), |index| basket.get(index))
}

/// Canonical form of a concrete path that instantiates `route`.
pub(crate) fn canonicalize<H>(route: &Route<H>, concrete: &str) -> Result<String, ParameterTypeError> {
    let pattern = route.pattern();
    let stripped = concrete.trim_matches(pattern.delimiter());
    let not_an_instance = || ParameterTypeError::NotAnInstance {
        path: concrete.to_string(),
    };

    if pattern.is_static() {
        return if stripped == pattern.key() {
            Ok(stripped.to_string())
        } else {
            Err(not_an_instance())
        };
    }

    let segments = Segments::split(stripped, pattern.delimiter());
    let wildcard = pattern.wildcard_at();
    let shape_ok = match wildcard {
        Some(fixed) => segments.len() > fixed,
        None => segments.len() == pattern.len(),
    };
    let literals_ok = pattern
        .segments()
        .iter()
        .enumerate()
        .all(|(index, segment)| match segment {
            Segment::Literal(text) => segments.get(index) == Some(text.as_str()),
            Segment::Param { .. } => true,
        });
    if !shape_ok || !literals_ok {
        return Err(not_an_instance());
    }

    let descriptors = route.describe_params();
    let (_, canonical) = parse_with(pattern, &descriptors, |index| {
        if Some(index) == wildcard {
            segments.rest(index)
        } else {
            segments.get(index)
        }
    })?;
    Ok(canonical)
}

fn parse_with<'a, F>(
    pattern: &Pattern,
    descriptors: &[ParamDescriptor],
    lookup: F,
) -> Result<(Params, String), ParameterTypeError>
where
    F: Fn(usize) -> Option<&'a str>,
{
    let mut params = Params::new();
    for descriptor in descriptors {
        let raw = lookup(descriptor.index).ok_or_else(|| ParameterTypeError::Missing {
            name: descriptor.name.clone(),
        })?;
        let value = descriptor
            .kind
            .convert(raw)
            .ok_or_else(|| ParameterTypeError::Mismatch {
                name: descriptor.name.clone(),
                expected: descriptor.kind.tag().to_string(),
                raw: raw.to_string(),
            })?;
        if let Some(requirement) = &descriptor.requirement {
            if !requirement.check(raw) {
                return Err(ParameterTypeError::Requirement {
                    name: descriptor.name.clone(),
                    raw: raw.to_string(),
                });
            }
        }
        params.insert(descriptor.name.clone(), value);
    }

    let mut canonical = String::new();
    for (position, segment) in pattern.segments().iter().enumerate() {
        if position > 0 {
            canonical.push(pattern.delimiter());
        }
        match segment {
            Segment::Literal(text) => canonical.push_str(text),
            Segment::Param { name, .. } => {
                if let Some(value) = params.get(name) {
                    canonical.push_str(&value.to_string());
                }
            }
        }
    }

    Ok((params, canonical))
}
