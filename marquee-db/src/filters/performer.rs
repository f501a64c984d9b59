use marquee_core::{EntityKind, FindFilter, Performer, PerformerFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, alias_search_column, is_missing, missing_relation, missing_text, missing_value,
    path_through, query_ids, related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, Junction, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::queries::find_performers;
use crate::query::SortOptions;

impl EntityFilter for PerformerFilter {
    const ENTITY: EntityKind = EntityKind::Performer;

    fn table(ids: &Identifiers) -> &str {
        &ids.performers
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.performers.as_str();
        let col = |name: &str| format!("{t}.{name}");

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.name {
            criterion::string(f, &col("name"), c);
        }
        if let Some(c) = &self.disambiguation {
            criterion::string(f, &col("disambiguation"), c);
        }
        if let Some(c) = &self.details {
            criterion::string(f, &col("details"), c);
        }
        if let Some(c) = &self.aliases {
            criterion::string_list(f, t, &ids.performer_aliases, c);
        }
        if let Some(c) = &self.gender {
            criterion::enumeration(f, &col("gender"), c);
        }
        if let Some(c) = &self.birthdate {
            criterion::date(f, &col("birthdate"), c);
        }
        if let Some(favorite) = self.favorite {
            criterion::boolean(f, &col("favorite"), favorite);
        }
        if let Some(c) = &self.rating {
            criterion::int(f, &col("rating"), c);
        }
        if let Some(c) = &self.created_at {
            criterion::timestamp(f, &col("created_at"), c);
        }
        if let Some(c) = &self.updated_at {
            criterion::timestamp(f, &col("updated_at"), c);
        }

        if let Some(c) = &self.tags {
            let target = RelationTarget::junction(t, &ids.performers_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.studios {
            let target = path_through(
                t,
                &ids.scenes_performers.reversed(),
                &Junction::new(&ids.scenes, "id", "studio_id"),
            );
            criterion::hierarchical(ctx, f, &target, &ids.studio_hierarchy, c);
        }
        if let Some(c) = &self.scene_count {
            criterion::relation_count(f, t, &ids.scenes_performers.reversed(), c);
        }
        if let Some(c) = &self.image_count {
            criterion::relation_count(f, t, &ids.images_performers.reversed(), c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.performers_tags, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("disambiguation", missing_text(&col("disambiguation"))),
                ("details", missing_text(&col("details"))),
                ("gender", missing_value(&col("gender"))),
                ("birthdate", missing_value(&col("birthdate"))),
                ("rating", missing_value(&col("rating"))),
                ("aliases", missing_relation(t, &ids.performer_aliases)),
                ("tags", missing_relation(t, &ids.performers_tags)),
                ("scenes", missing_relation(t, &ids.scenes_performers.reversed())),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.performers_tags, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.performers.as_str();
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("name", format!("{t}.name"))
            .column("birthdate", format!("{t}.birthdate"))
            .column("rating", format!("{t}.rating"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("scene_count", t, &ids.scenes_performers.reversed())
            .count("image_count", t, &ids.images_performers.reversed())
            .count("tag_count", t, &ids.performers_tags)
            .random()
    }

    fn default_sort() -> &'static str {
        "name"
    }

    fn search_columns(ids: &Identifiers, f: &mut ClauseSet) -> Vec<String> {
        let t = ids.performers.as_str();
        vec![
            format!("{t}.name"),
            format!("{t}.disambiguation"),
            alias_search_column(t, &ids.performer_aliases, f),
        ]
    }
}

pub fn query_performers(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&PerformerFilter>,
    find: &FindFilter,
) -> Result<(Vec<Performer>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_performers(conn, &result.ids)?, result.count))
}
