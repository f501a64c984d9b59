use marquee_core::{
    EntityKind, FindFilter, Gallery, GalleryFilter, Group, GroupFilter, Image, ImageFilter,
    Performer, PerformerFilter, Scene, SceneFilter, Studio, StudioFilter, Tag, TagFilter,
};
use marquee_db::{EntityFilter, QueryConfig, QueryError};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Library, QueryArgs, load_filter};
use crate::error::CliError;

/// How results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Output {
    /// One line per entity.
    Table,
    /// `{"count": n, "items": [...]}` on stdout.
    Json,
    /// Ids only, one per line.
    Ids,
}

type Reader<F, T> =
    fn(&Connection, &QueryConfig, Option<&F>, &FindFilter) -> Result<(Vec<T>, i64), QueryError>;

/// One-line description of a hydrated entity.
pub(crate) trait Listed {
    fn id(&self) -> i64;
    fn label(&self) -> String;
}

fn or_untitled(title: &Option<String>) -> String {
    title.clone().unwrap_or_else(|| "(untitled)".to_string())
}

impl Listed for Scene {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        match &self.date {
            Some(date) => format!("{} [{date}]", or_untitled(&self.title)),
            None => or_untitled(&self.title),
        }
    }
}

impl Listed for Image {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        or_untitled(&self.title)
    }
}

impl Listed for Gallery {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        or_untitled(&self.title)
    }
}

impl Listed for Performer {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        match &self.disambiguation {
            Some(d) if !d.is_empty() => format!("{} ({d})", self.name),
            _ => self.name.clone(),
        }
    }
}

impl Listed for Studio {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Listed for Tag {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Listed for Group {
    fn id(&self) -> i64 {
        self.id
    }
    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Run a filtered query for `entity` and print the page.
pub(crate) fn run_query(
    lib: &Library,
    entity: EntityKind,
    args: &QueryArgs,
    output: Output,
) -> Result<(), CliError> {
    match entity {
        EntityKind::Scene => list::<SceneFilter, Scene>(lib, args, output, marquee_db::query_scenes),
        EntityKind::Image => list::<ImageFilter, Image>(lib, args, output, marquee_db::query_images),
        EntityKind::Gallery => {
            list::<GalleryFilter, Gallery>(lib, args, output, marquee_db::query_galleries)
        }
        EntityKind::Performer => {
            list::<PerformerFilter, Performer>(lib, args, output, marquee_db::query_performers)
        }
        EntityKind::Studio => {
            list::<StudioFilter, Studio>(lib, args, output, marquee_db::query_studios)
        }
        EntityKind::Tag => list::<TagFilter, Tag>(lib, args, output, marquee_db::query_tags),
        EntityKind::Group => list::<GroupFilter, Group>(lib, args, output, marquee_db::query_groups),
    }
}

fn list<F, T>(
    lib: &Library,
    args: &QueryArgs,
    output: Output,
    reader: Reader<F, T>,
) -> Result<(), CliError>
where
    F: EntityFilter + DeserializeOwned,
    T: Listed + Serialize,
{
    let filter: Option<F> = load_filter(args.filter.as_deref())?;
    let find = args.find_filter();

    if output == Output::Ids {
        let result = marquee_db::query_ids(&lib.conn, &lib.config, filter.as_ref(), &find)?;
        for id in result.ids {
            println!("{id}");
        }
        return Ok(());
    }

    let (items, count) = reader(&lib.conn, &lib.config, filter.as_ref(), &find)?;
    match output {
        Output::Json => {
            let body = serde_json::json!({ "count": count, "items": items });
            let text = serde_json::to_string_pretty(&body)
                .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
            println!("{text}");
        }
        _ => print_table(F::ENTITY, &items, count, &find, lib.config.default_per_page),
    }
    Ok(())
}

fn print_table<T: Listed>(
    entity: EntityKind,
    items: &[T],
    count: i64,
    find: &FindFilter,
    default_per_page: i64,
) {
    if items.is_empty() {
        log::info!(
            "{}",
            format!("No {} matched.", entity.plural()).if_supports_color(Stdout, |t| t.dimmed())
        );
        if count > 0 {
            log::info!("  {count} match(es) in total; page {} is past the end.", find.page());
        }
        return;
    }

    let width = items.iter().map(|i| i.id().to_string().len()).max().unwrap_or(1);
    for item in items {
        let id = format!("{:>width$}", item.id());
        log::info!(
            "  {}  {}",
            id.if_supports_color(Stdout, |t| t.dimmed()),
            item.label(),
        );
    }
    log::info!("");

    let summary = match find.page_size(default_per_page) {
        Some(_) => format!(
            "{} of {count} {} (page {})",
            items.len(),
            entity.plural(),
            find.page()
        ),
        None => format!("{count} {}", entity.plural()),
    };
    log::info!("{}", summary.if_supports_color(Stdout, |t| t.bold()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_label_shows_date() {
        let scene = Scene {
            id: 7,
            title: Some("Morning Swim".into()),
            code: None,
            details: None,
            director: None,
            date: Some("2024-01-05".into()),
            rating: None,
            organized: false,
            studio_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(scene.label(), "Morning Swim [2024-01-05]");
    }

    #[test]
    fn untitled_image() {
        let image = Image {
            id: 1,
            title: None,
            date: None,
            rating: None,
            organized: false,
            studio_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(image.label(), "(untitled)");
    }
}
