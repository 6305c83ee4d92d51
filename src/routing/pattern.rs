//! Route pattern parsing.
//!
//! A pattern is a delimiter-separated list of segments. A segment is either a
//! literal or a whole placeholder `<name>` / `<name:type>`. Any `<` in the
//! pattern makes it dynamic.

use std::collections::HashSet;

use crate::routing::error::{RouterError, RouterResult};
use crate::routing::params::ParamKind;

/// One parsed segment of a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Param { name: String, kind: ParamKind },
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// A normalized route pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Pattern with leading and trailing delimiters stripped.
    path: String,
    delimiter: char,
    segments: Vec<Segment>,
    is_static: bool,
}

impl Pattern {
    /// Parse a pattern as passed to registration.
    pub fn parse(raw: &str, delimiter: char) -> RouterResult<Self> {
        let path = raw.trim_matches(delimiter).to_string();
        let is_static = !raw.contains('<');

        if is_static {
            let segments = path
                .split(delimiter)
                .map(|part| Segment::Literal(part.to_string()))
                .collect();
            return Ok(Self {
                path,
                delimiter,
                segments,
                is_static,
            });
        }

        let mut segments = Vec::new();
        let mut names = HashSet::new();
        let parts: Vec<&str> = path.split(delimiter).collect();
        for (position, part) in parts.iter().enumerate() {
            let segment = parse_segment(raw, part)?;
            if let Segment::Param { name, kind } = &segment {
                if !names.insert(name.clone()) {
                    return Err(RouterError::invalid_pattern(
                        raw,
                        format!("duplicate parameter `{name}`"),
                    ));
                }
                if kind.is_wildcard() && position + 1 != parts.len() {
                    return Err(RouterError::invalid_pattern(
                        raw,
                        format!("path parameter `{name}` must be the last segment"),
                    ));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            path,
            delimiter,
            segments,
            is_static,
        })
    }

    /// Identity key: the parts joined by the delimiter.
    pub fn key(&self) -> &str {
        &self.path
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of fixed segments before a trailing wildcard, if there is one.
    pub fn wildcard_at(&self) -> Option<usize> {
        match self.segments.last() {
            Some(Segment::Param { kind, .. }) if kind.is_wildcard() => Some(self.segments.len() - 1),
            _ => None,
        }
    }

    /// Placeholders in positional order.
    pub fn params(&self) -> impl Iterator<Item = (usize, &str, &ParamKind)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| match segment {
                Segment::Param { name, kind } => Some((index, name.as_str(), kind)),
                Segment::Literal(_) => None,
            })
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params().any(|(_, n, _)| n == name)
    }
}

fn parse_segment(raw: &str, part: &str) -> RouterResult<Segment> {
    let inner = match part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
        Some(inner) => inner,
        None if part.contains('<') || part.contains('>') => {
            return Err(RouterError::invalid_pattern(
                raw,
                format!("segment `{part}` mixes literal text and a placeholder"),
            ));
        }
        None => return Ok(Segment::Literal(part.to_string())),
    };

    if inner.contains('<') || inner.contains('>') {
        return Err(RouterError::invalid_pattern(
            raw,
            format!("malformed placeholder `{part}`"),
        ));
    }

    let (name, tag) = inner.split_once(':').unwrap_or((inner, "str"));
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(RouterError::invalid_pattern(
            raw,
            format!("invalid parameter name `{name}`"),
        ));
    }

    let kind = ParamKind::from_tag(tag).map_err(|e| {
        RouterError::invalid_pattern(raw, format!("bad expression for `{name}`: {e}"))
    })?;

    Ok(Segment::Param {
        name: name.to_string(),
        kind,
    })
}
