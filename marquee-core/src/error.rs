use thiserror::Error;

use crate::criterion::CriterionModifier;
use crate::filter::Combinator;

/// Problems with a filter or find request, detected before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// More than one of `and`, `or`, `not` set on the same filter level
    #[error("{first} and {second} sub-filters cannot be combined on one level")]
    IllegalCombination {
        first: Combinator,
        second: Combinator,
    },

    /// A combinator was attached to a clause set that already has one
    #[error("{existing} sub-filter already attached, {rejected} rejected")]
    CombinatorAlreadySet {
        existing: Combinator,
        rejected: Combinator,
    },

    /// Regular expression failed to compile
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// Modifier not meaningful for this kind of criterion
    #[error("modifier {modifier} is not supported for {criterion} criteria")]
    UnsupportedModifier {
        criterion: &'static str,
        modifier: CriterionModifier,
    },

    /// BETWEEN / NOT BETWEEN without `value2`
    #[error("modifier {0} requires value2")]
    MissingUpperBound(CriterionModifier),

    /// Hierarchy depth below -1
    #[error("invalid depth {0}: use -1 for unlimited or a non-negative level count")]
    InvalidDepth(i32),

    /// Date or timestamp that could not be parsed
    #[error("invalid date '{0}'")]
    InvalidDate(String),

    /// Sort key outside the entity's allowed list
    #[error("invalid sort '{0}'")]
    InvalidSort(String),

    /// Page whose offset does not fit in a 64-bit integer
    #[error("page {page} of {per_page} rows is out of range")]
    InvalidPage { page: i64, per_page: i64 },

    /// `is_missing` names a field the entity does not know about
    #[error("unknown is_missing field '{0}'")]
    UnknownMissingField(String),
}

impl ValidationError {
    pub fn unsupported(criterion: &'static str, modifier: CriterionModifier) -> Self {
        Self::UnsupportedModifier {
            criterion,
            modifier,
        }
    }

    pub fn invalid_regex(pattern: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidRegex {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }
}
