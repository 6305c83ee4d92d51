//! Parameter types, typed values and per-parameter requirements.
//!
//! # Responsibilities
//! - Name the placeholder types a pattern can declare
//! - Cheap syntactic guards used by the decision tree
//! - Full conversion of captured text into typed values
//!
//! # Design Decisions
//! - Built-in guards are hand-written scans, no regex on the hot path
//! - Guards are syntactic only; calendar checks and integer overflow are
//!   left to conversion, whose failures surface as a routing miss
//! - Unknown type tags are custom regular expressions over the whole segment

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Type tag of a dynamic segment.
#[derive(Debug, Clone)]
pub enum ParamKind {
    /// Any non-empty segment.
    Str,
    /// Signed decimal integer.
    Int,
    /// Signed decimal number with optional fraction.
    Float,
    /// ASCII letters only.
    Alpha,
    /// Lowercase words joined by single hyphens.
    Slug,
    /// Hyphenated UUID.
    Uuid,
    /// `YYYY-MM-DD` date.
    Ymd,
    /// Every remaining segment of the path.
    Path,
    /// User supplied expression matched against the whole segment.
    Custom { source: String, regex: Regex },
}

impl ParamKind {
    /// Resolve a type tag as written inside a placeholder.
    pub fn from_tag(tag: &str) -> Result<Self, regex::Error> {
        let kind = match tag {
            "" | "str" | "string" => ParamKind::Str,
            "int" => ParamKind::Int,
            "float" => ParamKind::Float,
            "alpha" => ParamKind::Alpha,
            "slug" => ParamKind::Slug,
            "uuid" => ParamKind::Uuid,
            "ymd" => ParamKind::Ymd,
            "path" => ParamKind::Path,
            source => ParamKind::Custom {
                source: source.to_string(),
                regex: anchored(source)?,
            },
        };
        Ok(kind)
    }

    /// Tag as it would be written in a pattern.
    pub fn tag(&self) -> &str {
        match self {
            ParamKind::Str => "str",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Alpha => "alpha",
            ParamKind::Slug => "slug",
            ParamKind::Uuid => "uuid",
            ParamKind::Ymd => "ymd",
            ParamKind::Path => "path",
            ParamKind::Custom { source, .. } => source,
        }
    }

    /// Sibling ordering weight; higher is tried first.
    pub fn specificity(&self) -> u8 {
        match self {
            ParamKind::Custom { .. } => 9,
            ParamKind::Uuid => 8,
            ParamKind::Ymd => 7,
            ParamKind::Int => 6,
            ParamKind::Float => 5,
            ParamKind::Alpha => 4,
            ParamKind::Slug => 3,
            ParamKind::Str => 2,
            ParamKind::Path => 1,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ParamKind::Path)
    }

    /// Syntactic check of a single segment.
    ///
    /// For `Path` the argument is the first remaining segment.
    pub fn accepts(&self, segment: &str) -> bool {
        match self {
            ParamKind::Str | ParamKind::Path => !segment.is_empty(),
            ParamKind::Int => is_integer(segment),
            ParamKind::Float => is_decimal(segment),
            ParamKind::Alpha => {
                !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphabetic())
            }
            ParamKind::Slug => is_slug(segment),
            ParamKind::Uuid => is_hyphenated_uuid(segment),
            ParamKind::Ymd => is_ymd_shape(segment),
            ParamKind::Custom { regex, .. } => regex.is_match(segment),
        }
    }

    /// Convert captured text into a typed value.
    pub fn convert(&self, raw: &str) -> Option<ParamValue> {
        if !self.accepts(raw) {
            return None;
        }
        let value = match self {
            ParamKind::Str | ParamKind::Alpha | ParamKind::Slug | ParamKind::Custom { .. } => {
                ParamValue::Str(raw.to_string())
            }
            ParamKind::Int => ParamValue::Int(raw.parse().ok()?),
            ParamKind::Float => ParamValue::Float(raw.parse().ok().filter(|x: &f64| x.is_finite())?),
            ParamKind::Uuid => ParamValue::Uuid(Uuid::parse_str(raw).ok()?),
            ParamKind::Ymd => ParamValue::Date(Ymd::parse(raw)?),
            ParamKind::Path => ParamValue::Path(raw.to_string()),
        };
        Some(value)
    }
}

impl PartialEq for ParamKind {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag() && self.specificity() == other.specificity()
    }
}

impl Eq for ParamKind {}

impl Hash for ParamKind {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.specificity().hash(state);
        self.tag().hash(state);
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn anchored(expr: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{expr})$"))
}

fn digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_integer(s: &str) -> bool {
    digits(s.strip_prefix('-').unwrap_or(s))
}

fn is_decimal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => digits(whole) && digits(fraction),
        None => digits(unsigned),
    }
}

fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s.split('-')
            .all(|word| !word.is_empty() && word.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
}

fn is_hyphenated_uuid(s: &str) -> bool {
    s.len() == 36
        && s.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => b.is_ascii_hexdigit(),
        })
}

fn is_ymd_shape(s: &str) -> bool {
    s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Calendar date captured by a `ymd` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ymd {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Ymd {
    /// Parse and calendar-validate `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_ymd_shape(raw) {
            return None;
        }
        let year: u16 = raw[0..4].parse().ok()?;
        let month: u8 = raw[5..7].parse().ok()?;
        let day: u8 = raw[8..10].parse().ok()?;
        if day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        _ => 0,
    }
}

impl fmt::Display for Ymd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Serialize for Ymd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Date(Ymd),
    Path(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) | ParamValue::Path(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ParamValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Ymd> {
        match self {
            ParamValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// Canonical text form, used to rebuild the canonical path.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) | ParamValue::Path(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            ParamValue::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Typed parameters of a resolved route, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Extra constraint on a parameter beyond its declared type.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Full match against a regular expression.
    Pattern(Regex),
    /// Raw text must be one of the listed values.
    OneOf(Vec<String>),
}

impl Requirement {
    pub fn pattern(expr: &str) -> Result<Self, regex::Error> {
        Ok(Requirement::Pattern(anchored(expr)?))
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn check(&self, raw: &str) -> bool {
        match self {
            Requirement::Pattern(regex) => regex.is_match(raw),
            Requirement::OneOf(values) => values.iter().any(|v| v == raw),
        }
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Requirement::Pattern(a), Requirement::Pattern(b)) => a.as_str() == b.as_str(),
            (Requirement::OneOf(a), Requirement::OneOf(b)) => a == b,
            _ => false,
        }
    }
}

/// Finalized schema entry for one placeholder.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    /// Segment position feeding this parameter.
    pub index: usize,
    pub requirement: Option<Requirement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tags() {
        assert_eq!(ParamKind::from_tag("").unwrap(), ParamKind::Str);
        assert_eq!(ParamKind::from_tag("int").unwrap(), ParamKind::Int);
        assert_eq!(ParamKind::from_tag("path").unwrap(), ParamKind::Path);
        assert!(ParamKind::from_tag("path").unwrap().is_wildcard());

        let custom = ParamKind::from_tag(r"\d{4}").unwrap();
        assert_eq!(custom.tag(), r"\d{4}");
        assert!(ParamKind::from_tag("(unclosed").is_err());
    }

    #[test]
    fn test_guards() {
        assert!(ParamKind::Int.accepts("42"));
        assert!(ParamKind::Int.accepts("-7"));
        assert!(!ParamKind::Int.accepts("4a"));
        assert!(!ParamKind::Int.accepts("-"));

        assert!(ParamKind::Float.accepts("1.5"));
        assert!(ParamKind::Float.accepts("3"));
        assert!(!ParamKind::Float.accepts("1."));

        assert!(ParamKind::Alpha.accepts("Hello"));
        assert!(!ParamKind::Alpha.accepts("h3llo"));

        assert!(ParamKind::Slug.accepts("hello-world-2"));
        assert!(!ParamKind::Slug.accepts("Hello"));
        assert!(!ParamKind::Slug.accepts("a--b"));
        assert!(!ParamKind::Slug.accepts("-a"));

        assert!(ParamKind::Uuid.accepts("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(!ParamKind::Uuid.accepts("67e5504410b1426f9247bb680e5fe0c8"));

        assert!(ParamKind::Ymd.accepts("2024-02-30"));
        assert!(!ParamKind::Ymd.accepts("2024-2-3"));

        let year = ParamKind::from_tag(r"\d{4}").unwrap();
        assert!(year.accepts("1999"));
        assert!(!year.accepts("19999"));
    }

    #[test]
    fn test_conversion() {
        assert_eq!(ParamKind::Int.convert("007"), Some(ParamValue::Int(7)));
        assert_eq!(ParamKind::Int.convert("99999999999999999999"), None);
        assert_eq!(ParamKind::Float.convert("1.50"), Some(ParamValue::Float(1.5)));
        let huge = "9".repeat(400);
        assert!(ParamKind::Float.accepts(&huge));
        assert_eq!(ParamKind::Float.convert(&huge), None);
        assert_eq!(ParamKind::Str.convert(""), None);

        // Shape passes the guard, the calendar does not.
        assert!(ParamKind::Ymd.accepts("2023-02-29"));
        assert_eq!(ParamKind::Ymd.convert("2023-02-29"), None);
        assert_eq!(
            ParamKind::Ymd.convert("2024-02-29"),
            Some(ParamValue::Date(Ymd { year: 2024, month: 2, day: 29 }))
        );
    }

    #[test]
    fn test_value_accessors() {
        let date = Ymd { year: 2024, month: 2, day: 29 };
        assert_eq!(ParamValue::Str("a".into()).as_str(), Some("a"));
        assert_eq!(ParamValue::Path("a/b".into()).as_str(), Some("a/b"));
        assert_eq!(ParamValue::Int(3).as_int(), Some(3));
        assert_eq!(ParamValue::Float(0.5).as_float(), Some(0.5));
        assert_eq!(ParamValue::Date(date).as_date(), Some(date));

        assert_eq!(ParamValue::Int(3).as_str(), None);
        assert_eq!(ParamValue::Str("3".into()).as_int(), None);
        assert_eq!(ParamValue::Int(3).as_float(), None);
        assert_eq!(ParamValue::Int(3).as_uuid(), None);
        assert_eq!(ParamValue::Str("2024-02-29".into()).as_date(), None);
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(ParamValue::Int(7).to_string(), "7");
        assert_eq!(ParamValue::Float(1.5).to_string(), "1.5");
        let id = ParamKind::Uuid
            .convert("67E55044-10B1-426F-9247-BB680E5FE0C8")
            .unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(
            ParamValue::Date(Ymd { year: 2020, month: 1, day: 5 }).to_string(),
            "2020-01-05"
        );
    }

    #[test]
    fn test_requirements() {
        let req = Requirement::pattern("[0-9]{1,3}").unwrap();
        assert!(req.check("123"));
        assert!(!req.check("1234"));

        let req = Requirement::one_of(["json", "xml"]);
        assert!(req.check("xml"));
        assert!(!req.check("yaml"));
    }

    #[test]
    fn test_params_serialize() {
        let mut params = Params::new();
        params.insert("id", ParamValue::Int(42));
        params.insert("day", ParamValue::Date(Ymd { year: 2021, month: 3, day: 4 }));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"day":"2021-03-04","id":42}"#);
    }
}
