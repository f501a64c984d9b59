use marquee_core::{EntityKind, FindFilter, Group, GroupFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, is_missing, missing_relation, missing_text, missing_value, path_through,
    query_ids, related, related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::hierarchy::Direction;
use crate::queries::find_groups;
use crate::query::SortOptions;

impl EntityFilter for GroupFilter {
    const ENTITY: EntityKind = EntityKind::Group;

    fn table(ids: &Identifiers) -> &str {
        &ids.groups
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.groups.as_str();
        let col = |name: &str| format!("{t}.{name}");
        let hierarchy = &ids.group_hierarchy;

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.name {
            criterion::string(f, &col("name"), c);
        }
        if let Some(c) = &self.director {
            criterion::string(f, &col("director"), c);
        }
        if let Some(c) = &self.synopsis {
            criterion::string(f, &col("description"), c);
        }
        if let Some(c) = &self.rating {
            criterion::int(f, &col("rating"), c);
        }
        if let Some(c) = &self.duration {
            criterion::int(f, &col("duration"), c);
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
            let target = RelationTarget::junction(t, &ids.groups_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.performers {
            let target = path_through(t, &ids.scenes_groups.reversed(), &ids.scenes_performers);
            criterion::multi(f, &target, c);
        }
        if let Some(c) = &self.containing_groups {
            criterion::membership(ctx, f, &col("id"), hierarchy, Direction::Descendants, c);
        }
        if let Some(c) = &self.sub_groups {
            criterion::membership(ctx, f, &col("id"), hierarchy, Direction::Ancestors, c);
        }
        if let Some(c) = &self.containing_group_count {
            criterion::relation_count(f, t, &hierarchy.parents_of(), c);
        }
        if let Some(c) = &self.sub_group_count {
            criterion::relation_count(f, t, &hierarchy.children_of(), c);
        }
        if let Some(c) = &self.scene_count {
            criterion::relation_count(f, t, &ids.scenes_groups.reversed(), c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.groups_tags, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("director", missing_text(&col("director"))),
                ("synopsis", missing_text(&col("description"))),
                ("date", missing_value(&col("date"))),
                ("rating", missing_value(&col("rating"))),
                ("duration", missing_value(&col("duration"))),
                ("studio", missing_value(&col("studio_id"))),
                ("tags", missing_relation(t, &ids.groups_tags)),
                ("scenes", missing_relation(t, &ids.scenes_groups.reversed())),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.studios_filter {
            related(ctx, f, &col("studio_id"), sub.as_ref());
        }
        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.groups_tags, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.groups.as_str();
        let hierarchy = &ids.group_hierarchy;
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("name", format!("{t}.name"))
            .column("date", format!("{t}.date"))
            .column("rating", format!("{t}.rating"))
            .column("duration", format!("{t}.duration"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("sub_group_count", t, &hierarchy.children_of())
            .count("scene_count", t, &ids.scenes_groups.reversed())
            .count("tag_count", t, &ids.groups_tags)
            .random()
    }

    fn default_sort() -> &'static str {
        "name"
    }

    fn search_columns(ids: &Identifiers, _f: &mut ClauseSet) -> Vec<String> {
        let t = &ids.groups;
        vec![format!("{t}.name"), format!("{t}.director")]
    }
}

pub fn query_groups(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&GroupFilter>,
    find: &FindFilter,
) -> Result<(Vec<Group>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_groups(conn, &result.ids)?, result.count))
}
