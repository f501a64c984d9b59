use marquee_core::{EntityKind, FindFilter, Gallery, GalleryFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, is_missing, missing_relation, missing_text, missing_value, query_ids, related,
    related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::queries::find_galleries;
use crate::query::SortOptions;

impl EntityFilter for GalleryFilter {
    const ENTITY: EntityKind = EntityKind::Gallery;

    fn table(ids: &Identifiers) -> &str {
        &ids.galleries
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.galleries.as_str();
        let col = |name: &str| format!("{t}.{name}");
        let scenes = ids.scenes_galleries.reversed();

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.title {
            criterion::string(f, &col("title"), c);
        }
        if let Some(c) = &self.details {
            criterion::string(f, &col("details"), c);
        }
        if let Some(c) = &self.rating {
            criterion::int(f, &col("rating"), c);
        }
        if let Some(organized) = self.organized {
            criterion::boolean(f, &col("organized"), organized);
        }
        if let Some(c) = &self.date {
            criterion::date(f, &col("date"), c);
        }
        if let Some(c) = &self.created_at {
            criterion::timestamp(f, &col("created_at"), c);
        }
        if let Some(c) = &self.updated_at {
            criterion::timestamp(f, &col("updated_at"), c);
        }

        if let Some(c) = &self.studios {
            let target = RelationTarget::column(col("studio_id"));
            criterion::hierarchical(ctx, f, &target, &ids.studio_hierarchy, c);
        }
        if let Some(c) = &self.tags {
            let target = RelationTarget::junction(t, &ids.galleries_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.performers {
            criterion::multi(f, &RelationTarget::junction(t, &ids.galleries_performers), c);
        }
        if let Some(c) = &self.scenes {
            criterion::multi(f, &RelationTarget::junction(t, &scenes), c);
        }
        if let Some(c) = &self.image_count {
            criterion::relation_count(f, t, &ids.galleries_images, c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.galleries_tags, c);
        }
        if let Some(c) = &self.performer_count {
            criterion::relation_count(f, t, &ids.galleries_performers, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("title", missing_text(&col("title"))),
                ("details", missing_text(&col("details"))),
                ("date", missing_value(&col("date"))),
                ("rating", missing_value(&col("rating"))),
                ("studio", missing_value(&col("studio_id"))),
                ("tags", missing_relation(t, &ids.galleries_tags)),
                ("performers", missing_relation(t, &ids.galleries_performers)),
                ("scenes", missing_relation(t, &scenes)),
                ("images", missing_relation(t, &ids.galleries_images)),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.studios_filter {
            related(ctx, f, &col("studio_id"), sub.as_ref());
        }
        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.galleries_tags, sub.as_ref());
        }
        if let Some(sub) = &self.scenes_filter {
            related_through(ctx, f, t, &scenes, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.galleries.as_str();
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("title", format!("{t}.title"))
            .column("date", format!("{t}.date"))
            .column("rating", format!("{t}.rating"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("image_count", t, &ids.galleries_images)
            .count("tag_count", t, &ids.galleries_tags)
            .count("performer_count", t, &ids.galleries_performers)
            .random()
    }

    fn default_sort() -> &'static str {
        "title"
    }

    fn search_columns(ids: &Identifiers, _f: &mut ClauseSet) -> Vec<String> {
        let t = &ids.galleries;
        vec![format!("{t}.title"), format!("{t}.details")]
    }
}

pub fn query_galleries(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&GalleryFilter>,
    find: &FindFilter,
) -> Result<(Vec<Gallery>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_galleries(conn, &result.ids)?, result.count))
}
