//! Query configuration: placeholder style, collation and identifiers.
//!
//! One [`QueryConfig`] is built per process (or per test) and passed by
//! reference to everything that renders SQL. Nothing in this crate keeps
//! global dialect or table-name state.

use serde::{Deserialize, Serialize};

use crate::functions::NATURAL_COLLATION;

/// How positional parameters are written in the final statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    Question,
    /// `?1`, `?2`, ...
    Numbered,
    /// `$1`, `$2`, ...
    Dollar,
}

/// A junction (or alias) table linking an owning row to related values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub table: String,
    /// Column holding the owning entity's id.
    pub owner: String,
    /// Column holding the related id or value.
    pub target: String,
}

impl Junction {
    pub fn new(table: &str, owner: &str, target: &str) -> Self {
        Self {
            table: table.to_string(),
            owner: owner.to_string(),
            target: target.to_string(),
        }
    }

    /// The same table seen from the other side.
    pub fn reversed(&self) -> Self {
        Self {
            table: self.table.clone(),
            owner: self.target.clone(),
            target: self.owner.clone(),
        }
    }

    /// `table.column` for the target column.
    pub fn target_column(&self) -> String {
        format!("{}.{}", self.table, self.target)
    }
}

/// Parent/child edges of a tree-shaped entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRelation {
    pub table: String,
    pub parent: String,
    pub child: String,
}

impl HierarchyRelation {
    pub fn new(table: &str, parent: &str, child: &str) -> Self {
        Self {
            table: table.to_string(),
            parent: parent.to_string(),
            child: child.to_string(),
        }
    }

    /// Rows keyed by parent: one per child.
    pub fn children_of(&self) -> Junction {
        Junction::new(&self.table, &self.parent, &self.child)
    }

    /// Rows keyed by child: one per parent.
    pub fn parents_of(&self) -> Junction {
        Junction::new(&self.table, &self.child, &self.parent)
    }
}

/// Table and relation names the filters and readers refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifiers {
    pub scenes: String,
    pub images: String,
    pub galleries: String,
    pub performers: String,
    pub studios: String,
    pub tags: String,
    pub groups: String,

    pub scenes_tags: Junction,
    pub scenes_performers: Junction,
    pub scenes_groups: Junction,
    pub scenes_galleries: Junction,
    /// Video files owned by a scene.
    pub scene_files: Junction,
    pub images_tags: Junction,
    pub images_performers: Junction,
    pub galleries_images: Junction,
    pub galleries_tags: Junction,
    pub galleries_performers: Junction,
    pub performers_tags: Junction,
    pub studios_tags: Junction,
    pub groups_tags: Junction,

    pub tag_aliases: Junction,
    pub studio_aliases: Junction,
    pub performer_aliases: Junction,

    pub tag_hierarchy: HierarchyRelation,
    pub studio_hierarchy: HierarchyRelation,
    pub group_hierarchy: HierarchyRelation,
}

impl Default for Identifiers {
    fn default() -> Self {
        Self {
            scenes: "scenes".into(),
            images: "images".into(),
            galleries: "galleries".into(),
            performers: "performers".into(),
            studios: "studios".into(),
            tags: "tags".into(),
            groups: "groups".into(),

            scenes_tags: Junction::new("scenes_tags", "scene_id", "tag_id"),
            scenes_performers: Junction::new("scenes_performers", "scene_id", "performer_id"),
            scenes_groups: Junction::new("scenes_groups", "scene_id", "group_id"),
            scenes_galleries: Junction::new("scenes_galleries", "scene_id", "gallery_id"),
            scene_files: Junction::new("scene_files", "scene_id", "id"),
            images_tags: Junction::new("images_tags", "image_id", "tag_id"),
            images_performers: Junction::new("images_performers", "image_id", "performer_id"),
            galleries_images: Junction::new("galleries_images", "gallery_id", "image_id"),
            galleries_tags: Junction::new("galleries_tags", "gallery_id", "tag_id"),
            galleries_performers: Junction::new(
                "galleries_performers",
                "gallery_id",
                "performer_id",
            ),
            performers_tags: Junction::new("performers_tags", "performer_id", "tag_id"),
            studios_tags: Junction::new("studios_tags", "studio_id", "tag_id"),
            groups_tags: Junction::new("groups_tags", "group_id", "tag_id"),

            tag_aliases: Junction::new("tag_aliases", "tag_id", "alias"),
            studio_aliases: Junction::new("studio_aliases", "studio_id", "alias"),
            performer_aliases: Junction::new("performer_aliases", "performer_id", "alias"),

            tag_hierarchy: HierarchyRelation::new("tags_relations", "parent_id", "child_id"),
            studio_hierarchy: HierarchyRelation::new("studios", "parent_id", "id"),
            group_hierarchy: HierarchyRelation::new("groups_relations", "containing_id", "sub_id"),
        }
    }
}

/// Everything SQL rendering needs to know about the target database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub placeholder: PlaceholderStyle,
    /// Collation used for name-like sort columns.
    pub natural_collation: String,
    /// Page size when a find filter does not give one.
    pub default_per_page: i64,
    pub identifiers: Identifiers,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            placeholder: PlaceholderStyle::default(),
            natural_collation: NATURAL_COLLATION.to_string(),
            default_per_page: 25,
            identifiers: Identifiers::default(),
        }
    }
}
