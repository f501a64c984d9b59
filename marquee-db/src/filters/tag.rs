use marquee_core::{EntityKind, FindFilter, Tag, TagFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, alias_search_column, is_missing, missing_relation, missing_text, query_ids,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, QueryConfig};
use crate::criterion::{self, FilterContext};
use crate::error::QueryError;
use crate::hierarchy::Direction;
use crate::queries::find_tags;
use crate::query::SortOptions;

impl EntityFilter for TagFilter {
    const ENTITY: EntityKind = EntityKind::Tag;

    fn table(ids: &Identifiers) -> &str {
        &ids.tags
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.tags.as_str();
        let col = |name: &str| format!("{t}.{name}");
        let hierarchy = &ids.tag_hierarchy;

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.name {
            criterion::string(f, &col("name"), c);
        }
        if let Some(c) = &self.description {
            criterion::string(f, &col("description"), c);
        }
        if let Some(c) = &self.aliases {
            criterion::string_list(f, t, &ids.tag_aliases, c);
        }
        if let Some(favorite) = self.favorite {
            criterion::boolean(f, &col("favorite"), favorite);
        }
        if let Some(c) = &self.created_at {
            criterion::timestamp(f, &col("created_at"), c);
        }
        if let Some(c) = &self.updated_at {
            criterion::timestamp(f, &col("updated_at"), c);
        }

        if let Some(c) = &self.parents {
            criterion::membership(ctx, f, &col("id"), hierarchy, Direction::Descendants, c);
        }
        if let Some(c) = &self.children {
            criterion::membership(ctx, f, &col("id"), hierarchy, Direction::Ancestors, c);
        }
        if let Some(c) = &self.parent_count {
            criterion::relation_count(f, t, &hierarchy.parents_of(), c);
        }
        if let Some(c) = &self.child_count {
            criterion::relation_count(f, t, &hierarchy.children_of(), c);
        }
        if let Some(c) = &self.scene_count {
            criterion::relation_count(f, t, &ids.scenes_tags.reversed(), c);
        }
        if let Some(c) = &self.image_count {
            criterion::relation_count(f, t, &ids.images_tags.reversed(), c);
        }
        if let Some(c) = &self.gallery_count {
            criterion::relation_count(f, t, &ids.galleries_tags.reversed(), c);
        }
        if let Some(c) = &self.performer_count {
            criterion::relation_count(f, t, &ids.performers_tags.reversed(), c);
        }
        if let Some(c) = &self.studio_count {
            criterion::relation_count(f, t, &ids.studios_tags.reversed(), c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("description", missing_text(&col("description"))),
                ("aliases", missing_relation(t, &ids.tag_aliases)),
                ("parents", missing_relation(t, &hierarchy.parents_of())),
                ("children", missing_relation(t, &hierarchy.children_of())),
            ];
            is_missing(f, field, &options);
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.tags.as_str();
        let hierarchy = &ids.tag_hierarchy;
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("name", format!("{t}.name"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("parent_count", t, &hierarchy.parents_of())
            .count("child_count", t, &hierarchy.children_of())
            .count("scene_count", t, &ids.scenes_tags.reversed())
            .count("image_count", t, &ids.images_tags.reversed())
            .count("gallery_count", t, &ids.galleries_tags.reversed())
            .count("performer_count", t, &ids.performers_tags.reversed())
            .count("studio_count", t, &ids.studios_tags.reversed())
            .random()
    }

    fn default_sort() -> &'static str {
        "name"
    }

    fn search_columns(ids: &Identifiers, f: &mut ClauseSet) -> Vec<String> {
        let t = ids.tags.as_str();
        vec![
            format!("{t}.name"),
            alias_search_column(t, &ids.tag_aliases, f),
        ]
    }
}

pub fn query_tags(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&TagFilter>,
    find: &FindFilter,
) -> Result<(Vec<Tag>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_tags(conn, &result.ids)?, result.count))
}
