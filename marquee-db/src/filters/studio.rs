use marquee_core::{EntityKind, FindFilter, Studio, StudioFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, alias_search_column, is_missing, missing_relation, missing_text, missing_value,
    query_ids, related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, Junction, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::queries::find_studios;
use crate::query::SortOptions;

/// Rows of `table` pointing at a studio through `studio_id`.
fn owned_by_studio(table: &str) -> Junction {
    Junction::new(table, "studio_id", "id")
}

impl EntityFilter for StudioFilter {
    const ENTITY: EntityKind = EntityKind::Studio;

    fn table(ids: &Identifiers) -> &str {
        &ids.studios
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.studios.as_str();
        let col = |name: &str| format!("{t}.{name}");

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.name {
            criterion::string(f, &col("name"), c);
        }
        if let Some(c) = &self.details {
            criterion::string(f, &col("details"), c);
        }
        if let Some(c) = &self.url {
            criterion::string(f, &col("url"), c);
        }
        if let Some(c) = &self.aliases {
            criterion::string_list(f, t, &ids.studio_aliases, c);
        }
        if let Some(c) = &self.rating {
            criterion::int(f, &col("rating"), c);
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
            let parent = format!("{t}.{}", ids.studio_hierarchy.parent);
            criterion::multi(f, &RelationTarget::column(parent), c);
        }
        if let Some(c) = &self.tags {
            let target = RelationTarget::junction(t, &ids.studios_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.child_count {
            criterion::relation_count(f, t, &ids.studio_hierarchy.children_of(), c);
        }
        if let Some(c) = &self.scene_count {
            criterion::relation_count(f, t, &owned_by_studio(&ids.scenes), c);
        }
        if let Some(c) = &self.image_count {
            criterion::relation_count(f, t, &owned_by_studio(&ids.images), c);
        }
        if let Some(c) = &self.gallery_count {
            criterion::relation_count(f, t, &owned_by_studio(&ids.galleries), c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.studios_tags, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("details", missing_text(&col("details"))),
                ("url", missing_text(&col("url"))),
                ("rating", missing_value(&col("rating"))),
                ("parent", missing_value(&col(&ids.studio_hierarchy.parent))),
                ("aliases", missing_relation(t, &ids.studio_aliases)),
                ("tags", missing_relation(t, &ids.studios_tags)),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.studios_tags, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.studios.as_str();
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("name", format!("{t}.name"))
            .column("rating", format!("{t}.rating"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("child_count", t, &ids.studio_hierarchy.children_of())
            .count("scene_count", t, &owned_by_studio(&ids.scenes))
            .count("image_count", t, &owned_by_studio(&ids.images))
            .count("gallery_count", t, &owned_by_studio(&ids.galleries))
            .count("tag_count", t, &ids.studios_tags)
            .random()
    }

    fn default_sort() -> &'static str {
        "name"
    }

    fn search_columns(ids: &Identifiers, f: &mut ClauseSet) -> Vec<String> {
        let t = ids.studios.as_str();
        vec![
            format!("{t}.name"),
            alias_search_column(t, &ids.studio_aliases, f),
        ]
    }
}

pub fn query_studios(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&StudioFilter>,
    find: &FindFilter,
) -> Result<(Vec<Studio>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_studios(conn, &result.ids)?, result.count))
}
