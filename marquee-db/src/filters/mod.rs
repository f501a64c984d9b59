//! Entity filters: the mapping from each entity's filter fields to
//! criterion handlers, plus the readers built on it.
//!
//! Every reader follows the same shape: validate the filter's and/or/not
//! structure, build one [`ClauseSet`] per filter level, add the search
//! clause for `q`, plan against the entity's sort keys, run the count and
//! ids statements, and hydrate the ids.

mod gallery;
mod group;
mod image;
mod performer;
mod scene;
mod studio;
mod tag;

pub use gallery::query_galleries;
pub use group::query_groups;
pub use image::query_images;
pub use performer::query_performers;
pub use scene::query_scenes;
pub use studio::query_studios;
pub use tag::query_tags;

use marquee_core::{EntityKind, FindFilter, SubFilters, ValidationError};
use rusqlite::types::Value;

use crate::clause::ClauseSet;
use crate::config::{Identifiers, Junction, QueryConfig};
use crate::criterion::{FilterContext, RelationTarget};
use crate::error::QueryError;
use crate::executor::Executor;
use crate::query::{QueryExecutor, QueryPlan, QueryResult, SortOptions};
use crate::search;

/// A filter type for one entity.
pub trait EntityFilter: SubFilters {
    const ENTITY: EntityKind;

    /// Table the entity lives in.
    fn table(ids: &Identifiers) -> &str;

    /// Add the clauses for this level's own fields. Sub-filters are
    /// handled by [`build_filter`].
    fn apply(&self, ctx: &FilterContext<'_>, f: &mut ClauseSet);

    fn sort_options(ids: &Identifiers) -> SortOptions;

    fn default_sort() -> &'static str;

    /// Columns `q` is matched against. Adds any joins they need to `f`.
    fn search_columns(ids: &Identifiers, f: &mut ClauseSet) -> Vec<String>;
}

/// Build the clause set for `filter` and, recursively, its sub-filter.
pub fn build_filter<F: EntityFilter>(ctx: &FilterContext<'_>, filter: &F) -> ClauseSet {
    let mut f = ClauseSet::new();
    if let Some((op, sub)) = filter.sub_filter() {
        f.attach(op, build_filter(ctx, sub));
    }
    filter.apply(ctx, &mut f);
    f
}

/// Stands in for the database while a filter is checked. Every lookup
/// comes back empty, so hierarchies resolve to their roots alone.
struct NoLookups;

impl Executor for NoLookups {
    fn query_ids(&self, _sql: &str, _args: &[Value]) -> Result<Vec<i64>, QueryError> {
        Ok(Vec::new())
    }

    fn query_scalar(&self, _sql: &str, _args: &[Value]) -> Result<i64, QueryError> {
        Ok(0)
    }

    fn query_pairs(&self, _sql: &str, _args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError> {
        Ok(Vec::new())
    }
}

/// Reject a request that cannot be planned, without touching the database.
fn validate<F: EntityFilter>(
    config: &QueryConfig,
    filter: Option<&F>,
    find: &FindFilter,
) -> Result<(), QueryError> {
    let ids = &config.identifiers;
    if let Some(filter) = filter {
        filter.validate_combination()?;
        let offline = FilterContext::new(config, &NoLookups);
        if let Some(e) = build_filter(&offline, filter).take_error() {
            return Err(e);
        }
    }
    let sort = find.sort_or(F::default_sort());
    if !F::sort_options(ids).contains(sort) {
        return Err(ValidationError::InvalidSort(sort.to_string()).into());
    }
    QueryExecutor::new(config, F::table(ids)).window(find)?;
    Ok(())
}

/// Validate and build `filter`, add the search clause for `find.q`, and
/// plan the statements. An invalid request fails before any SQL runs;
/// otherwise nothing is executed except hierarchy lookups.
pub fn plan<F: EntityFilter>(
    executor: &dyn Executor,
    config: &QueryConfig,
    filter: Option<&F>,
    find: &FindFilter,
) -> Result<QueryPlan, QueryError> {
    validate(config, filter, find)?;

    log::debug!("planning {} query", F::ENTITY);
    let ctx = FilterContext::new(config, executor);
    let ids = &config.identifiers;
    let mut root = ClauseSet::new();
    if let Some(q) = find.query_text() {
        let columns = F::search_columns(ids, &mut root);
        search::apply(&mut root, q, &columns);
    }
    if let Some(filter) = filter {
        root.and(build_filter(&ctx, filter));
    }

    QueryExecutor::new(config, F::table(ids)).plan(
        root,
        &F::sort_options(ids),
        F::default_sort(),
        find,
    )
}

/// Ordered ids of the requested page plus the total count.
pub fn query_ids<F: EntityFilter>(
    executor: &dyn Executor,
    config: &QueryConfig,
    filter: Option<&F>,
    find: &FindFilter,
) -> Result<QueryResult, QueryError> {
    let plan = plan(executor, config, filter, find)?;
    QueryExecutor::new(config, F::table(&config.identifiers)).execute(executor, &plan)
}

// ── Related Filters ─────────────────────────────────────────────────────────

/// `SELECT R.id ...` for a related entity's filter, or `None` when the
/// filter adds nothing. Errors are recorded on `f`.
fn related_subquery<R: EntityFilter>(
    ctx: &FilterContext<'_>,
    f: &mut ClauseSet,
    filter: &R,
) -> Option<(String, Vec<Value>)> {
    if f.error().is_some() {
        return None;
    }
    if let Err(e) = filter.validate_combination() {
        f.set_error(e.into());
        return None;
    }
    let mut built = build_filter(ctx, filter);
    if let Some(e) = built.take_error() {
        f.set_error(e);
        return None;
    }
    if built.is_empty() {
        return None;
    }
    match QueryExecutor::new(ctx.config, R::table(ctx.ids())).subquery(built) {
        Ok(plan) => Some((plan.subquery_sql(), plan.args())),
        Err(e) => {
            f.set_error(e);
            None
        }
    }
}

/// `column IN (SELECT R.id ...)`.
pub fn related<R: EntityFilter>(
    ctx: &FilterContext<'_>,
    f: &mut ClauseSet,
    column: &str,
    filter: &R,
) {
    if let Some((sql, args)) = related_subquery(ctx, f, filter) {
        f.add_where(format!("{column} IN ({sql})"), args);
    }
}

/// `primary.id IN (SELECT owner FROM junction WHERE target IN (SELECT R.id ...))`.
pub fn related_through<R: EntityFilter>(
    ctx: &FilterContext<'_>,
    f: &mut ClauseSet,
    primary: &str,
    junction: &Junction,
    filter: &R,
) {
    if let Some((sql, args)) = related_subquery(ctx, f, filter) {
        f.add_where(
            format!(
                "{primary}.id IN (SELECT {owner} FROM {table} WHERE {target} IN ({sql}))",
                owner = junction.owner,
                table = junction.table,
                target = junction.target,
            ),
            args,
        );
    }
}

// ── Shared Pieces ───────────────────────────────────────────────────────────

/// Relation two junction hops away: rows of `primary` whose `first`
/// targets own a `second` row. `first.target` joins to `second.owner`.
pub(crate) fn path_through(
    primary: &str,
    first: &Junction,
    second: &Junction,
) -> RelationTarget<'static> {
    RelationTarget::path(
        format!("{primary}.id"),
        format!(
            "SELECT a.{} FROM {} a INNER JOIN {} b ON b.{} = a.{}",
            first.owner, first.table, second.table, second.owner, first.target
        ),
        format!("b.{}", second.target),
    )
}

/// Join an alias table for search and return its value column.
pub(crate) fn alias_search_column(primary: &str, aliases: &Junction, f: &mut ClauseSet) -> String {
    f.add_left_join(
        &aliases.table,
        "",
        format!("{}.{} = {primary}.id", aliases.table, aliases.owner),
    );
    aliases.target_column()
}

/// Predicate for a blank text column.
pub(crate) fn missing_text(column: &str) -> String {
    format!("({column} IS NULL OR TRIM({column}) = '')")
}

pub(crate) fn missing_value(column: &str) -> String {
    format!("{column} IS NULL")
}

/// Predicate for a row owning no junction rows.
pub(crate) fn missing_relation(primary: &str, junction: &Junction) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM {} m WHERE m.{} = {primary}.id)",
        junction.table, junction.owner
    )
}

/// Add the predicate for an `is_missing` field name, or record an error
/// when the entity has no such field.
pub(crate) fn is_missing(f: &mut ClauseSet, field: &str, options: &[(&str, String)]) {
    let wanted = field.trim();
    match options.iter().find(|(name, _)| *name == wanted) {
        Some((_, predicate)) => f.add_where(predicate.clone(), vec![]),
        None => f.set_error(ValidationError::UnknownMissingField(field.to_string()).into()),
    }
}
