use marquee_core::{EntityKind, FindFilter, Scene, SceneFilter};
use rusqlite::Connection;

use super::{
    EntityFilter, is_missing, missing_relation, missing_text, missing_value, path_through,
    query_ids, related, related_through,
};
use crate::clause::ClauseSet;
use crate::config::{Identifiers, QueryConfig};
use crate::criterion::{self, FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::queries::find_scenes;
use crate::query::SortOptions;

impl EntityFilter for SceneFilter {
    const ENTITY: EntityKind = EntityKind::Scene;

    fn table(ids: &Identifiers) -> &str {
        &ids.scenes
    }

    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet) {
        let ids = ctx.ids();
        let t = ids.scenes.as_str();
        let col = |name: &str| format!("{t}.{name}");

        if let Some(c) = &self.id {
            criterion::int(f, &col("id"), c);
        }
        if let Some(c) = &self.title {
            criterion::string(f, &col("title"), c);
        }
        if let Some(c) = &self.code {
            criterion::string(f, &col("code"), c);
        }
        if let Some(c) = &self.details {
            criterion::string(f, &col("details"), c);
        }
        if let Some(c) = &self.director {
            criterion::string(f, &col("director"), c);
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

        let files = &ids.scene_files;
        let file_col = |name: &str| format!("{}.{name}", files.table);
        if self.path.is_some() || self.duration.is_some() || self.resolution.is_some() {
            f.add_left_join(
                &files.table,
                "",
                format!("{} = {t}.id", file_col(&files.owner)),
            );
        }
        if let Some(c) = &self.path {
            criterion::file_path(f, &file_col("folder"), &file_col("basename"), c);
        }
        if let Some(c) = &self.duration {
            let seconds = format!("CAST(ROUND({}) AS INTEGER)", file_col("duration"));
            criterion::int(f, &seconds, c);
        }
        if let Some(c) = &self.resolution {
            let side = format!("MIN({}, {})", file_col("width"), file_col("height"));
            criterion::int(f, &side, c);
        }
        if let Some(c) = &self.file_count {
            criterion::relation_count(f, t, files, c);
        }

        if let Some(c) = &self.studios {
            let target = RelationTarget::column(col("studio_id"));
            criterion::hierarchical(ctx, f, &target, &ids.studio_hierarchy, c);
        }
        if let Some(c) = &self.tags {
            let target = RelationTarget::junction(t, &ids.scenes_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.groups {
            let target = RelationTarget::junction(t, &ids.scenes_groups);
            criterion::hierarchical(ctx, f, &target, &ids.group_hierarchy, c);
        }
        if let Some(c) = &self.performers {
            criterion::multi(f, &RelationTarget::junction(t, &ids.scenes_performers), c);
        }
        if let Some(c) = &self.galleries {
            criterion::multi(f, &RelationTarget::junction(t, &ids.scenes_galleries), c);
        }
        if let Some(c) = &self.performer_tags {
            let target = path_through(t, &ids.scenes_performers, &ids.performers_tags);
            criterion::hierarchical(ctx, f, &target, &ids.tag_hierarchy, c);
        }
        if let Some(c) = &self.tag_count {
            criterion::relation_count(f, t, &ids.scenes_tags, c);
        }
        if let Some(c) = &self.performer_count {
            criterion::relation_count(f, t, &ids.scenes_performers, c);
        }

        if let Some(field) = &self.is_missing {
            let options = [
                ("title", missing_text(&col("title"))),
                ("code", missing_text(&col("code"))),
                ("details", missing_text(&col("details"))),
                ("director", missing_text(&col("director"))),
                ("date", missing_value(&col("date"))),
                ("rating", missing_value(&col("rating"))),
                ("studio", missing_value(&col("studio_id"))),
                ("tags", missing_relation(t, &ids.scenes_tags)),
                ("performers", missing_relation(t, &ids.scenes_performers)),
                ("groups", missing_relation(t, &ids.scenes_groups)),
                ("galleries", missing_relation(t, &ids.scenes_galleries)),
                ("files", missing_relation(t, &ids.scene_files)),
            ];
            is_missing(f, field, &options);
        }

        if let Some(sub) = &self.studios_filter {
            related(ctx, f, &col("studio_id"), sub.as_ref());
        }
        if let Some(sub) = &self.tags_filter {
            related_through(ctx, f, t, &ids.scenes_tags, sub.as_ref());
        }
        if let Some(sub) = &self.performers_filter {
            related_through(ctx, f, t, &ids.scenes_performers, sub.as_ref());
        }
    }

    fn sort_options(ids: &Identifiers) -> SortOptions {
        let t = ids.scenes.as_str();
        SortOptions::new()
            .column("id", format!("{t}.id"))
            .natural("title", format!("{t}.title"))
            .natural("code", format!("{t}.code"))
            .column("date", format!("{t}.date"))
            .column("rating", format!("{t}.rating"))
            .column("created_at", format!("{t}.created_at"))
            .column("updated_at", format!("{t}.updated_at"))
            .count("tag_count", t, &ids.scenes_tags)
            .count("performer_count", t, &ids.scenes_performers)
            .count("file_count", t, &ids.scene_files)
            .expr(
                "duration",
                format!(
                    "(SELECT MAX(sf.duration) FROM {} sf WHERE sf.{} = {t}.id)",
                    ids.scene_files.table, ids.scene_files.owner
                ),
            )
            .random()
    }

    fn default_sort() -> &'static str {
        "title"
    }

    fn search_columns(ids: &Identifiers, _f: &mut ClauseSet) -> Vec<String> {
        let t = &ids.scenes;
        vec![
            format!("{t}.title"),
            format!("{t}.details"),
            format!("{t}.code"),
        ]
    }
}

/// Filtered, sorted page of scenes plus the total match count.
pub fn query_scenes(
    conn: &Connection,
    config: &QueryConfig,
    filter: Option<&SceneFilter>,
    find: &FindFilter,
) -> Result<(Vec<Scene>, i64), QueryError> {
    let result = query_ids(conn, config, filter, find)?;
    Ok((find_scenes(conn, &result.ids)?, result.count))
}
