use marquee_core::{
    EntityKind, GalleryFilter, GroupFilter, ImageFilter, PerformerFilter, SceneFilter,
    StudioFilter, TagFilter,
};
use marquee_db::{EntityFilter, QueryPlan};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use rusqlite::types::Value;
use serde::de::DeserializeOwned;

use super::{Library, QueryArgs, load_filter};
use crate::error::CliError;

/// Print the count and ids statements a query would run, with their
/// arguments. Hierarchy lookups still run; the statements themselves
/// do not.
pub(crate) fn run_explain(
    lib: &Library,
    entity: EntityKind,
    args: &QueryArgs,
) -> Result<(), CliError> {
    let plan = match entity {
        EntityKind::Scene => plan::<SceneFilter>(lib, args)?,
        EntityKind::Image => plan::<ImageFilter>(lib, args)?,
        EntityKind::Gallery => plan::<GalleryFilter>(lib, args)?,
        EntityKind::Performer => plan::<PerformerFilter>(lib, args)?,
        EntityKind::Studio => plan::<StudioFilter>(lib, args)?,
        EntityKind::Tag => plan::<TagFilter>(lib, args)?,
        EntityKind::Group => plan::<GroupFilter>(lib, args)?,
    };

    print_statement("Count", &plan.count_sql(), &plan.args());
    log::info!("");
    print_statement("Ids", &plan.ids_sql(), &plan.ids_args());
    Ok(())
}

fn plan<F: EntityFilter + DeserializeOwned>(
    lib: &Library,
    args: &QueryArgs,
) -> Result<QueryPlan, CliError> {
    let filter: Option<F> = load_filter(args.filter.as_deref())?;
    let plan = marquee_db::plan(&lib.conn, &lib.config, filter.as_ref(), &args.find_filter())?;
    Ok(plan)
}

fn print_statement(title: &str, sql: &str, args: &[Value]) {
    log::info!("{}", title.if_supports_color(Stdout, |t| t.bold()));
    log::info!("  {sql}");
    if !args.is_empty() {
        let rendered: Vec<String> = args.iter().map(render_value).collect();
        log::info!(
            "  {} {}",
            "args:".if_supports_color(Stdout, |t| t.dimmed()),
            rendered.join(", ")
        );
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => format!("'{}'", t.replace('\'', "''")),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
