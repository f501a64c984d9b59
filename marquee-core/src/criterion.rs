//! Criterion inputs: one filterable field's modifier plus its value(s).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How a criterion's value is compared against the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionModifier {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    IsNull,
    NotNull,
    IncludesAll,
    Includes,
    Excludes,
    MatchesRegex,
    NotMatchesRegex,
    Between,
    NotBetween,
}

const ALL_MODIFIERS: &[CriterionModifier] = &[
    CriterionModifier::Equals,
    CriterionModifier::NotEquals,
    CriterionModifier::GreaterThan,
    CriterionModifier::LessThan,
    CriterionModifier::IsNull,
    CriterionModifier::NotNull,
    CriterionModifier::IncludesAll,
    CriterionModifier::Includes,
    CriterionModifier::Excludes,
    CriterionModifier::MatchesRegex,
    CriterionModifier::NotMatchesRegex,
    CriterionModifier::Between,
    CriterionModifier::NotBetween,
];

impl CriterionModifier {
    /// Wire name, as used in filter files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::IsNull => "IS_NULL",
            Self::NotNull => "NOT_NULL",
            Self::IncludesAll => "INCLUDES_ALL",
            Self::Includes => "INCLUDES",
            Self::Excludes => "EXCLUDES",
            Self::MatchesRegex => "MATCHES_REGEX",
            Self::NotMatchesRegex => "NOT_MATCHES_REGEX",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT_BETWEEN",
        }
    }

    pub fn all() -> &'static [CriterionModifier] {
        ALL_MODIFIERS
    }
}

impl std::fmt::Display for CriterionModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known modifier name.
#[derive(Debug, Clone)]
pub struct ModifierParseError(pub String);

impl std::fmt::Display for ModifierParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown criterion modifier: '{}'", self.0)
    }
}

impl std::error::Error for ModifierParseError {}

impl std::str::FromStr for CriterionModifier {
    type Err = ModifierParseError;

    /// Case-insensitive; dashes and underscores are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        ALL_MODIFIERS
            .iter()
            .copied()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ModifierParseError(s.to_string()))
    }
}

// ── Scalar Criteria ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringCriterion {
    #[serde(default)]
    pub value: String,
    pub modifier: CriterionModifier,
}

impl StringCriterion {
    pub fn new(modifier: CriterionModifier, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            modifier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntCriterion {
    #[serde(default)]
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<i64>,
    pub modifier: CriterionModifier,
}

impl IntCriterion {
    pub fn new(modifier: CriterionModifier, value: i64) -> Self {
        Self {
            value,
            value2: None,
            modifier,
        }
    }

    pub fn between(low: i64, high: i64) -> Self {
        Self {
            value: low,
            value2: Some(high),
            modifier: CriterionModifier::Between,
        }
    }
}

/// Calendar date criterion; values are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCriterion {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    pub modifier: CriterionModifier,
}

impl DateCriterion {
    pub fn new(modifier: CriterionModifier, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value2: None,
            modifier,
        }
    }

    /// Parsed and normalised bounds. Null checks need no value.
    pub fn bounds(&self) -> Result<(String, Option<String>), ValidationError> {
        normalise_bounds(self.modifier, &self.value, self.value2.as_deref(), |v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok()
        })
    }
}

/// Point-in-time criterion for `created_at` / `updated_at` style columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampCriterion {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
    pub modifier: CriterionModifier,
}

impl TimestampCriterion {
    pub fn new(modifier: CriterionModifier, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            value2: None,
            modifier,
        }
    }

    /// Bounds normalised to `YYYY-MM-DD HH:MM:SS`, the stored format.
    pub fn bounds(&self) -> Result<(String, Option<String>), ValidationError> {
        normalise_bounds(self.modifier, &self.value, self.value2.as_deref(), |v| {
            parse_timestamp(v).map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        })
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Some(t);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn normalise_bounds(
    modifier: CriterionModifier,
    value: &str,
    value2: Option<&str>,
    parse: impl Fn(&str) -> Option<String>,
) -> Result<(String, Option<String>), ValidationError> {
    if matches!(
        modifier,
        CriterionModifier::IsNull | CriterionModifier::NotNull
    ) {
        return Ok((String::new(), None));
    }
    let low = parse(value).ok_or_else(|| ValidationError::InvalidDate(value.to_string()))?;
    let high = match value2 {
        Some(v) if !v.trim().is_empty() => {
            Some(parse(v).ok_or_else(|| ValidationError::InvalidDate(v.to_string()))?)
        }
        _ => None,
    };
    Ok((low, high))
}

/// Criterion over a closed set of values, such as performer gender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumCriterion<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub modifier: CriterionModifier,
}

impl<T> EnumCriterion<T> {
    pub fn new(modifier: CriterionModifier, value: Vec<T>) -> Self {
        Self { value, modifier }
    }
}

// ── Relation Criteria ───────────────────────────────────────────────────────

/// Match against a many-valued relation by related id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiCriterion {
    #[serde(default)]
    pub value: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<i64>,
    pub modifier: CriterionModifier,
}

impl MultiCriterion {
    pub fn new(modifier: CriterionModifier, value: Vec<i64>) -> Self {
        Self {
            value,
            excludes: Vec::new(),
            modifier,
        }
    }
}

/// How far a hierarchical criterion walks from the ids it was given.
///
/// Serialized as an integer: `-1` is unlimited, `0` means exactly the
/// given ids, `n` follows up to `n` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Depth {
    Unbounded,
    Levels(u32),
}

impl Depth {
    pub const EXACT: Depth = Depth::Levels(0);

    /// True when no traversal happens at all.
    pub fn is_exact(&self) -> bool {
        *self == Self::EXACT
    }

    /// Whether another hop is allowed after `hops` edges have been followed.
    pub fn allows(&self, hops: u32) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Levels(n) => hops < *n,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::EXACT
    }
}

impl TryFrom<i32> for Depth {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Unbounded),
            n if n >= 0 => Ok(Self::Levels(n as u32)),
            n => Err(ValidationError::InvalidDepth(n)),
        }
    }
}

impl From<Depth> for i32 {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Unbounded => -1,
            Depth::Levels(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

/// Relation criterion over a tree (tags, studios, groups), with a depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchicalMultiCriterion {
    #[serde(default)]
    pub value: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<i64>,
    pub modifier: CriterionModifier,
    #[serde(default)]
    pub depth: Depth,
}

impl HierarchicalMultiCriterion {
    pub fn new(modifier: CriterionModifier, value: Vec<i64>, depth: Depth) -> Self {
        Self {
            value,
            excludes: Vec::new(),
            modifier,
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_names_round_trip() {
        for &modifier in CriterionModifier::all() {
            let parsed: CriterionModifier = modifier.as_str().parse().unwrap();
            assert_eq!(parsed, modifier);
        }
    }

    #[test]
    fn modifier_parse_is_forgiving() {
        let parsed: CriterionModifier = "includes-all".parse().unwrap();
        assert_eq!(parsed, CriterionModifier::IncludesAll);
        assert!("contains".parse::<CriterionModifier>().is_err());
    }

    #[test]
    fn depth_from_integer() {
        assert_eq!(Depth::try_from(-1).unwrap(), Depth::Unbounded);
        assert_eq!(Depth::try_from(0).unwrap(), Depth::EXACT);
        assert_eq!(Depth::try_from(3).unwrap(), Depth::Levels(3));
        assert_eq!(
            Depth::try_from(-2).unwrap_err(),
            ValidationError::InvalidDepth(-2)
        );
    }

    #[test]
    fn depth_allows_hops() {
        assert!(!Depth::EXACT.allows(0));
        assert!(Depth::Levels(2).allows(1));
        assert!(!Depth::Levels(2).allows(2));
        assert!(Depth::Unbounded.allows(1_000));
    }

    #[test]
    fn date_bounds_are_validated() {
        let c = DateCriterion::new(CriterionModifier::GreaterThan, "2021-3-7");
        assert_eq!(c.bounds().unwrap(), ("2021-03-07".to_string(), None));

        let bad = DateCriterion::new(CriterionModifier::Equals, "yesterday");
        assert_eq!(
            bad.bounds().unwrap_err(),
            ValidationError::InvalidDate("yesterday".to_string())
        );

        let null = DateCriterion::new(CriterionModifier::IsNull, "");
        assert!(null.bounds().is_ok());
    }

    #[test]
    fn timestamp_accepts_several_formats() {
        let cases = [
            ("2024-05-01T10:20:30Z", "2024-05-01 10:20:30"),
            ("2024-05-01 10:20", "2024-05-01 10:20:00"),
            ("2024-05-01", "2024-05-01 00:00:00"),
        ];
        for (input, expected) in cases {
            let c = TimestampCriterion::new(CriterionModifier::LessThan, input);
            assert_eq!(c.bounds().unwrap().0, expected, "input {input}");
        }
    }
}
