use marquee_core::{EntityKind, FindFilter, Image, ImageFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, is_missing, missing_relation, missing_text, missing_value, query_ids, related,
    related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::queries::find_images;
use crate::query::SortOptions;

impl EntityFilter for ImageFilter {
    const ENTITY: EntityKind = EntityKind::Image;

    fn table(ids: &Identifiers) -> &str {
        &ids.images
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.images.as_str();
        let col = |name: &str| format!("{t}.{name}");
        // Galleries own images, so the image side is the junction's target.
        let galleries = ids.galleries_images.reversed();

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.title {
            criterion::string(f, &col("title"), c);
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
            let target = RelationTarget::junction(t, &ids.images_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.performers {
            criterion::multi(f, &RelationTarget::junction(t, &ids.images_performers), c);
        }
        if let Some(c) = &self.galleries {
            criterion::multi(f, &RelationTarget::junction(t, &galleries), c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.images_tags, c);
        }
        if let Some(c) = &self.performer_count {
            criterion::relation_count(f, t, &ids.images_performers, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("title", missing_text(&col("title"))),
                ("date", missing_value(&col("date"))),
                ("rating", missing_value(&col("rating"))),
                ("studio", missing_value(&col("studio_id"))),
                ("tags", missing_relation(t, &ids.images_tags)),
                ("performers", missing_relation(t, &ids.images_performers)),
                ("galleries", missing_relation(t, &galleries)),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.studios_filter {
            related(ctx, f, &col("studio_id"), sub.as_ref());
        }
        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.images_tags, sub.as_ref());
        }
        if let Some(sub) = &self.galleries_filter {
            related_through(ctx, f, t, &galleries, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.images.as_str();
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("title", format!("{t}.title"))
            .column("date", format!("{t}.date"))
            .column("rating", format!("{t}.rating"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("tag_count", t, &ids.images_tags)
            .count("performer_count", t, &ids.images_performers)
            .random()
    }

    fn default_sort() -> &'static str {
        "title"
    }

    fn search_columns(ids: &Identifiers, _f: &mut ClauseSet) -> Vec<String> {
        vec![format!("{}.title", ids.images)]
    }
}

pub fn query_images(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&ImageFilter>,
    find: &FindFilter,
) -> Result<(Vec<Image>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_images(conn, &result.ids)?, result.count))
}
