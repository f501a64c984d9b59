//! Core types for marquee.
//!
//! The filter DSL that describes a query over the media library (criteria,
//! modifiers, per-entity filters, find options), the hydrated entity
//! models, and the validation errors raised on bad input. Nothing here
//! touches a database.

pub mod criterion;
pub mod entity;
pub mod error;
pub mod filter;
pub mod find;
pub mod models;

pub use criterion::{
    CriterionModifier, DateCriterion, Depth, EnumCriterion, HierarchicalMultiCriterion,
    IntCriterion, ModifierParseError, MultiCriterion, StringCriterion, TimestampCriterion,
};
pub use entity::{EntityKind, EntityParseError};
pub use error::ValidationError;
pub use filter::{
    Combinator, GalleryFilter, GroupFilter, ImageFilter, PerformerFilter, SceneFilter,
    StudioFilter, SubFilters, TagFilter,
};
pub use find::{FindFilter, PER_PAGE_ALL, SortDirection};
pub use models::{Gallery, Gender, Group, Image, Performer, Scene, Studio, Tag};
