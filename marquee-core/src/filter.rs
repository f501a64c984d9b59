//! Per-entity filter descriptions.
//!
//! Every filter level may carry at most one of `and`, `or`, `not`, each a
//! nested filter of the same shape. All other fields are independent
//! criteria that are ANDed together.

use serde::{Deserialize, Serialize};

use crate::criterion::{
    DateCriterion, EnumCriterion, HierarchicalMultiCriterion, IntCriterion, MultiCriterion,
    StringCriterion, TimestampCriterion,
};
use crate::error::ValidationError;
use crate::models::Gender;

/// Relationship between a filter level and its nested sub-filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
    Not,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access to a filter's `and` / `or` / `not` slots.
pub trait SubFilters: Sized {
    fn and_filter(&self) -> Option<&Self>;
    fn or_filter(&self) -> Option<&Self>;
    fn not_filter(&self) -> Option<&Self>;

    /// The single sub-filter, if any. Call [`validate_combination`] first;
    /// with several set this returns the first in and/or/not order.
    ///
    /// [`validate_combination`]: SubFilters::validate_combination
    fn sub_filter(&self) -> Option<(Combinator, &Self)> {
        self.present().into_iter().next()
    }

    /// Reject levels with more than one sub-filter, recursing into the one
    /// that is set.
    fn validate_combination(&self) -> Result<(), ValidationError> {
        match self.present().as_slice() {
            [] => Ok(()),
            [(_, sub)] => sub.validate_combination(),
            [(first, _), (second, _), ..] => Err(ValidationError::IllegalCombination {
                first: *first,
                second: *second,
            }),
        }
    }

    #[doc(hidden)]
    fn present(&self) -> Vec<(Combinator, &Self)> {
        [
            (Combinator::And, self.and_filter()),
            (Combinator::Or, self.or_filter()),
            (Combinator::Not, self.not_filter()),
        ]
        .into_iter()
        .filter_map(|(op, f)| f.map(|f| (op, f)))
        .collect()
    }
}

// ── Scenes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneFilter {
    pub and: Option<Box<SceneFilter>>,
    pub or: Option<Box<SceneFilter>>,
    pub not: Option<Box<SceneFilter>>,

    pub id: Option<IntCriterion>,
    pub title: Option<StringCriterion>,
    pub code: Option<StringCriterion>,
    pub details: Option<StringCriterion>,
    pub director: Option<StringCriterion>,
    pub rating: Option<IntCriterion>,
    pub organized: Option<bool>,
    pub date: Option<DateCriterion>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    /// `folder/basename` of any of the scene's files.
    pub path: Option<StringCriterion>,
    /// Duration in whole seconds of any of the scene's files.
    pub duration: Option<IntCriterion>,
    /// Shorter side in pixels of any of the scene's files.
    pub resolution: Option<IntCriterion>,
    pub file_count: Option<IntCriterion>,

    pub studios: Option<HierarchicalMultiCriterion>,
    pub tags: Option<HierarchicalMultiCriterion>,
    pub groups: Option<HierarchicalMultiCriterion>,
    pub performers: Option<MultiCriterion>,
    pub galleries: Option<MultiCriterion>,
    /// Tags attached to any of the scene's performers.
    pub performer_tags: Option<HierarchicalMultiCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub performer_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub studios_filter: Option<Box<StudioFilter>>,
    pub tags_filter: Option<Box<TagFilter>>,
    pub performers_filter: Option<Box<PerformerFilter>>,
}

// ── Images ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageFilter {
    pub and: Option<Box<ImageFilter>>,
    pub or: Option<Box<ImageFilter>>,
    pub not: Option<Box<ImageFilter>>,

    pub id: Option<IntCriterion>,
    pub title: Option<StringCriterion>,
    pub rating: Option<IntCriterion>,
    pub organized: Option<bool>,
    pub date: Option<DateCriterion>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    pub studios: Option<HierarchicalMultiCriterion>,
    pub tags: Option<HierarchicalMultiCriterion>,
    pub performers: Option<MultiCriterion>,
    pub galleries: Option<MultiCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub performer_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub studios_filter: Option<Box<StudioFilter>>,
    pub tags_filter: Option<Box<TagFilter>>,
    pub galleries_filter: Option<Box<GalleryFilter>>,
}

// ── Galleries ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryFilter {
    pub and: Option<Box<GalleryFilter>>,
    pub or: Option<Box<GalleryFilter>>,
    pub not: Option<Box<GalleryFilter>>,

    pub id: Option<IntCriterion>,
    pub title: Option<StringCriterion>,
    pub details: Option<StringCriterion>,
    pub rating: Option<IntCriterion>,
    pub organized: Option<bool>,
    pub date: Option<DateCriterion>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    pub studios: Option<HierarchicalMultiCriterion>,
    pub tags: Option<HierarchicalMultiCriterion>,
    pub performers: Option<MultiCriterion>,
    pub scenes: Option<MultiCriterion>,
    pub image_count: Option<IntCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub performer_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub studios_filter: Option<Box<StudioFilter>>,
    pub tags_filter: Option<Box<TagFilter>>,
    pub scenes_filter: Option<Box<SceneFilter>>,
}

// ── Performers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformerFilter {
    pub and: Option<Box<PerformerFilter>>,
    pub or: Option<Box<PerformerFilter>>,
    pub not: Option<Box<PerformerFilter>>,

    pub id: Option<IntCriterion>,
    pub name: Option<StringCriterion>,
    pub disambiguation: Option<StringCriterion>,
    pub details: Option<StringCriterion>,
    pub aliases: Option<StringCriterion>,
    pub gender: Option<EnumCriterion<Gender>>,
    pub birthdate: Option<DateCriterion>,
    pub favorite: Option<bool>,
    pub rating: Option<IntCriterion>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    pub tags: Option<HierarchicalMultiCriterion>,
    /// Studios of the scenes the performer appears in.
    pub studios: Option<HierarchicalMultiCriterion>,
    pub scene_count: Option<IntCriterion>,
    pub image_count: Option<IntCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub tags_filter: Option<Box<TagFilter>>,
}

// ── Studios ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioFilter {
    pub and: Option<Box<StudioFilter>>,
    pub or: Option<Box<StudioFilter>>,
    pub not: Option<Box<StudioFilter>>,

    pub id: Option<IntCriterion>,
    pub name: Option<StringCriterion>,
    pub details: Option<StringCriterion>,
    pub url: Option<StringCriterion>,
    pub aliases: Option<StringCriterion>,
    pub rating: Option<IntCriterion>,
    pub favorite: Option<bool>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    /// Direct parent studio.
    pub parents: Option<MultiCriterion>,
    pub tags: Option<HierarchicalMultiCriterion>,
    pub child_count: Option<IntCriterion>,
    pub scene_count: Option<IntCriterion>,
    pub image_count: Option<IntCriterion>,
    pub gallery_count: Option<IntCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub tags_filter: Option<Box<TagFilter>>,
}

// ── Tags ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagFilter {
    pub and: Option<Box<TagFilter>>,
    pub or: Option<Box<TagFilter>>,
    pub not: Option<Box<TagFilter>>,

    pub id: Option<IntCriterion>,
    pub name: Option<StringCriterion>,
    pub description: Option<StringCriterion>,
    pub aliases: Option<StringCriterion>,
    pub favorite: Option<bool>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    /// Tags sitting below the given tags.
    pub parents: Option<HierarchicalMultiCriterion>,
    /// Tags sitting above the given tags.
    pub children: Option<HierarchicalMultiCriterion>,
    pub parent_count: Option<IntCriterion>,
    pub child_count: Option<IntCriterion>,
    pub scene_count: Option<IntCriterion>,
    pub image_count: Option<IntCriterion>,
    pub gallery_count: Option<IntCriterion>,
    pub performer_count: Option<IntCriterion>,
    pub studio_count: Option<IntCriterion>,
    pub is_missing: Option<String>,
}

// ── Groups ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupFilter {
    pub and: Option<Box<GroupFilter>>,
    pub or: Option<Box<GroupFilter>>,
    pub not: Option<Box<GroupFilter>>,

    pub id: Option<IntCriterion>,
    pub name: Option<StringCriterion>,
    pub director: Option<StringCriterion>,
    pub synopsis: Option<StringCriterion>,
    pub rating: Option<IntCriterion>,
    /// Seconds.
    pub duration: Option<IntCriterion>,
    pub date: Option<DateCriterion>,
    pub created_at: Option<TimestampCriterion>,
    pub updated_at: Option<TimestampCriterion>,

    pub studios: Option<HierarchicalMultiCriterion>,
    pub tags: Option<HierarchicalMultiCriterion>,
    /// Performers appearing in any of the group's scenes.
    pub performers: Option<MultiCriterion>,
    /// Groups that (transitively) contain this group.
    pub containing_groups: Option<HierarchicalMultiCriterion>,
    /// Groups (transitively) contained by this group.
    pub sub_groups: Option<HierarchicalMultiCriterion>,
    pub containing_group_count: Option<IntCriterion>,
    pub sub_group_count: Option<IntCriterion>,
    pub scene_count: Option<IntCriterion>,
    pub tag_count: Option<IntCriterion>,
    pub is_missing: Option<String>,

    pub studios_filter: Option<Box<StudioFilter>>,
    pub tags_filter: Option<Box<TagFilter>>,
}

impl SubFilters for SceneFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for ImageFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for GalleryFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for PerformerFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for StudioFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for TagFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}

impl SubFilters for GroupFilter {
    fn and_filter(&self) -> Option<&Self> {
        self.and.as_deref()
    }
    fn or_filter(&self) -> Option<&Self> {
        self.or.as_deref()
    }
    fn not_filter(&self) -> Option<&Self> {
        self.not.as_deref()
    }
}
