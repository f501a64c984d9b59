//! Criterion handlers: one typed criterion in, [`ClauseSet`] mutations out.
//!
//! Handlers never return errors. Bad input (an uncompilable regex, a
//! modifier the criterion family does not support, a failed hierarchy
//! lookup) is recorded on the clause set and surfaces when the query is
//! planned, before any statement runs.

use marquee_core::CriterionModifier as Modifier;
use marquee_core::{
    DateCriterion, Depth, EnumCriterion, HierarchicalMultiCriterion, IntCriterion, MultiCriterion,
    StringCriterion, TimestampCriterion, ValidationError,
};
use regex::Regex;
use rusqlite::types::Value;

use crate::clause::{ClauseSet, id_args, placeholders};
use crate::config::{HierarchyRelation, Identifiers, Junction, QueryConfig};
use crate::error::QueryError;
use crate::executor::Executor;
use crate::hierarchy::{Closure, Direction, HierarchyResolver, SqlEdges};

/// What a handler may consult while building: configuration, and the
/// executor used for hierarchy lookups.
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    pub config: &'a QueryConfig,
    pub executor: &'a dyn Executor,
}

impl<'a> FilterContext<'a> {
    pub fn new(config: &'a QueryConfig, executor: &'a dyn Executor) -> Self {
        Self { config, executor }
    }

    pub fn ids(&self) -> &'a Identifiers {
        &self.config.identifiers
    }

    /// Roots plus everything within `depth` hops.
    pub fn closure(
        &self,
        relation: &HierarchyRelation,
        direction: Direction,
        roots: &[i64],
        depth: Depth,
    ) -> Result<Closure, QueryError> {
        if depth.is_exact() {
            return Ok(Closure::exact(roots));
        }
        let edges = SqlEdges::new(self.executor, relation, self.config.placeholder);
        HierarchyResolver::new(&edges).resolve(direction, roots, depth)
    }

    /// Everything 1 to `depth + 1` hops from the roots.
    pub fn strict_closure(
        &self,
        relation: &HierarchyRelation,
        direction: Direction,
        roots: &[i64],
        depth: Depth,
    ) -> Result<Closure, QueryError> {
        let edges = SqlEdges::new(self.executor, relation, self.config.placeholder);
        HierarchyResolver::new(&edges).strict_closure(direction, roots, depth)
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn unsupported(f: &mut ClauseSet, family: &'static str, modifier: Modifier) {
    f.set_error(ValidationError::unsupported(family, modifier).into());
}

// ── Strings ─────────────────────────────────────────────────────────────────

/// Split an Includes/Excludes value into search words. A value wrapped in
/// double quotes is a single phrase.
pub fn tokenize(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let phrase = trimmed[1..trimmed.len() - 1].trim();
        if phrase.is_empty() {
            return Vec::new();
        }
        return vec![phrase.to_string()];
    }
    trimmed.split_whitespace().map(str::to_string).collect()
}

pub fn string(f: &mut ClauseSet, column: &str, c: &StringCriterion) {
    let value = c.value.as_str();
    match c.modifier {
        Modifier::Equals => f.add_where(format!("{column} LIKE ?"), vec![text(value)]),
        Modifier::NotEquals => f.add_where(format!("{column} NOT LIKE ?"), vec![text(value)]),
        Modifier::Includes => like_words(f, column, value, false),
        Modifier::Excludes => like_words(f, column, value, true),
        Modifier::MatchesRegex | Modifier::NotMatchesRegex => {
            if let Err(e) = Regex::new(value) {
                f.set_error(ValidationError::invalid_regex(value, e).into());
                return;
            }
            let sql = if c.modifier == Modifier::MatchesRegex {
                format!("({column} IS NOT NULL AND {column} regexp ?)")
            } else {
                format!("({column} IS NULL OR {column} NOT regexp ?)")
            };
            f.add_where(sql, vec![text(value)]);
        }
        Modifier::IsNull => f.add_where(
            format!("({column} IS NULL OR TRIM({column}) = '')"),
            vec![],
        ),
        Modifier::NotNull => f.add_where(
            format!("({column} IS NOT NULL AND TRIM({column}) != '')"),
            vec![],
        ),
        Modifier::GreaterThan => f.add_where(format!("{column} > ?"), vec![text(value)]),
        Modifier::LessThan => f.add_where(format!("{column} < ?"), vec![text(value)]),
        other => unsupported(f, "string", other),
    }
}

fn like_words(f: &mut ClauseSet, column: &str, value: &str, negate: bool) {
    let words = tokenize(value);
    if words.is_empty() {
        return;
    }
    let (test, glue) = if negate {
        ("NOT LIKE", " AND ")
    } else {
        ("LIKE", " OR ")
    };
    let parts: Vec<String> = words.iter().map(|_| format!("{column} {test} ?")).collect();
    let args = words.iter().map(|w| Value::Text(format!("%{w}%"))).collect();
    f.add_where(format!("({})", parts.join(glue)), args);
}

/// String criterion against an alias-style table joined on the owner id.
pub fn string_list(f: &mut ClauseSet, primary: &str, junction: &Junction, c: &StringCriterion) {
    f.add_left_join(
        &junction.table,
        "",
        format!("{}.{} = {primary}.id", junction.table, junction.owner),
    );
    string(f, &junction.target_column(), c);
}

/// String criterion against a file path split over folder and basename
/// columns. Both halves are matched as one `folder/basename` string.
pub fn file_path(f: &mut ClauseSet, folder: &str, basename: &str, c: &StringCriterion) {
    let joined = format!("({folder} || '/' || {basename})");
    match c.modifier {
        Modifier::IsNull => f.add_where(
            format!("({basename} IS NULL OR TRIM({basename}) = '')"),
            vec![],
        ),
        Modifier::NotNull => f.add_where(
            format!("({basename} IS NOT NULL AND TRIM({basename}) != '')"),
            vec![],
        ),
        Modifier::Equals
        | Modifier::NotEquals
        | Modifier::Includes
        | Modifier::Excludes
        | Modifier::MatchesRegex
        | Modifier::NotMatchesRegex => string(f, &joined, c),
        other => unsupported(f, "path", other),
    }
}

// ── Numbers and dates ───────────────────────────────────────────────────────

fn numeric(
    f: &mut ClauseSet,
    expr: &str,
    family: &'static str,
    modifier: Modifier,
    low: Value,
    high: Option<Value>,
) {
    let (sql, args) = match modifier {
        Modifier::Equals => (format!("{expr} = ?"), vec![low]),
        Modifier::NotEquals => (format!("{expr} != ?"), vec![low]),
        Modifier::GreaterThan => (format!("{expr} > ?"), vec![low]),
        Modifier::LessThan => (format!("{expr} < ?"), vec![low]),
        Modifier::Between | Modifier::NotBetween => {
            let Some(high) = high else {
                f.set_error(ValidationError::MissingUpperBound(modifier).into());
                return;
            };
            let op = if modifier == Modifier::Between {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            (format!("{expr} {op} ? AND ?"), vec![low, high])
        }
        Modifier::IsNull => (format!("{expr} IS NULL"), vec![]),
        Modifier::NotNull => (format!("{expr} IS NOT NULL"), vec![]),
        other => return unsupported(f, family, other),
    };
    f.add_where(sql, args);
}

pub fn int(f: &mut ClauseSet, column: &str, c: &IntCriterion) {
    numeric(
        f,
        column,
        "int",
        c.modifier,
        Value::Integer(c.value),
        c.value2.map(Value::Integer),
    );
}

pub fn date(f: &mut ClauseSet, column: &str, c: &DateCriterion) {
    match c.bounds() {
        Ok((low, high)) => numeric(
            f,
            column,
            "date",
            c.modifier,
            Value::Text(low),
            high.map(Value::Text),
        ),
        Err(e) => f.set_error(e.into()),
    }
}

pub fn timestamp(f: &mut ClauseSet, column: &str, c: &TimestampCriterion) {
    match c.bounds() {
        Ok((low, high)) => numeric(
            f,
            column,
            "timestamp",
            c.modifier,
            Value::Text(low),
            high.map(Value::Text),
        ),
        Err(e) => f.set_error(e.into()),
    }
}

/// `(SELECT COUNT(*) FROM junction s WHERE s.owner = primary.id)`
pub fn count_expr(primary: &str, junction: &Junction) -> String {
    format!(
        "(SELECT COUNT(*) FROM {} s WHERE s.{} = {primary}.id)",
        junction.table, junction.owner
    )
}

/// Numeric criterion on the number of junction rows owned by each row.
pub fn relation_count(f: &mut ClauseSet, primary: &str, junction: &Junction, c: &IntCriterion) {
    numeric(
        f,
        &count_expr(primary, junction),
        "count",
        c.modifier,
        Value::Integer(c.value),
        c.value2.map(Value::Integer),
    );
}

// ── Flags and enums ─────────────────────────────────────────────────────────

pub fn boolean(f: &mut ClauseSet, column: &str, value: bool) {
    f.add_where(format!("{column} = ?"), vec![Value::Integer(value as i64)]);
}

pub fn enumeration<T: AsRef<str>>(f: &mut ClauseSet, column: &str, c: &EnumCriterion<T>) {
    let values: Vec<Value> = c.value.iter().map(|v| text(v.as_ref())).collect();
    match c.modifier {
        Modifier::Equals | Modifier::Includes if !values.is_empty() => f.add_where(
            format!("{column} IN ({})", placeholders(values.len())),
            values,
        ),
        Modifier::NotEquals | Modifier::Excludes if !values.is_empty() => f.add_where(
            format!(
                "({column} IS NULL OR {column} NOT IN ({}))",
                placeholders(values.len())
            ),
            values,
        ),
        Modifier::Equals | Modifier::Includes | Modifier::NotEquals | Modifier::Excludes => {}
        Modifier::IsNull => f.add_where(format!("{column} IS NULL"), vec![]),
        Modifier::NotNull => f.add_where(format!("{column} IS NOT NULL"), vec![]),
        other => unsupported(f, "enum", other),
    }
}

// ── Relations ───────────────────────────────────────────────────────────────

/// Where a relation criterion finds the related ids of a row.
#[derive(Debug, Clone)]
pub enum RelationTarget<'a> {
    /// Rows of a junction table, joined on `junction.owner = primary.id`.
    Junction {
        primary: &'a str,
        junction: &'a Junction,
    },
    /// A single-valued column, such as `scenes.studio_id`.
    Column(String),
    /// `id_column IN (select WHERE target IN (...))`, for relations that
    /// are two hops away. `select` has no WHERE clause of its own.
    Path {
        id_column: String,
        select: String,
        target: String,
    },
}

impl<'a> RelationTarget<'a> {
    pub fn junction(primary: &'a str, junction: &'a Junction) -> Self {
        Self::Junction { primary, junction }
    }

    pub fn column(column: impl Into<String>) -> Self {
        Self::Column(column.into())
    }

    pub fn path(
        id_column: impl Into<String>,
        select: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::Path {
            id_column: id_column.into(),
            select: select.into(),
            target: target.into(),
        }
    }

    fn join(&self, f: &mut ClauseSet) {
        if let Self::Junction { primary, junction } = self {
            f.add_left_join(
                &junction.table,
                "",
                format!("{}.{} = {primary}.id", junction.table, junction.owner),
            );
        }
    }

    /// Predicate that holds when the row relates to any of `ids`. Joins
    /// the junction when one is needed.
    fn matching(&self, f: &mut ClauseSet, ids: &[i64]) -> (String, Vec<Value>) {
        self.join(f);
        match self {
            Self::Junction { junction, .. } => in_list(&junction.target_column(), ids),
            Self::Column(column) => in_list(column, ids),
            Self::Path {
                id_column,
                select,
                target,
            } => {
                let (cond, args) = in_list(target, ids);
                (format!("{id_column} IN ({select} WHERE {cond})"), args)
            }
        }
    }
}

/// `expr IN (?, ...)`; an empty list matches nothing.
fn in_list(expr: &str, ids: &[i64]) -> (String, Vec<Value>) {
    if ids.is_empty() {
        return ("1 = 0".to_string(), Vec::new());
    }
    (
        format!("{expr} IN ({})", placeholders(ids.len())),
        id_args(ids),
    )
}

fn includes(f: &mut ClauseSet, target: &RelationTarget<'_>, values: &Closure) {
    let (sql, args) = target.matching(f, &values.ids());
    f.add_where(sql, args);
}

/// A match is required under every root of `values`.
fn includes_all(f: &mut ClauseSet, target: &RelationTarget<'_>, values: &Closure) {
    let roots = values.roots().count() as i64;
    match target {
        RelationTarget::Junction { junction, .. } => {
            includes(f, target, values);
            let column = junction.target_column();
            if values.is_trivial() {
                f.add_having(
                    format!("COUNT(DISTINCT {column}) >= ?"),
                    vec![Value::Integer(roots)],
                );
            } else {
                let mut parts = Vec::new();
                let mut args = Vec::new();
                for (_, ids) in values.iter() {
                    let ids: Vec<i64> = ids.iter().copied().collect();
                    let (cond, cond_args) = in_list(&column, &ids);
                    parts.push(format!("COUNT(CASE WHEN {cond} THEN 1 END) > 0"));
                    args.extend(cond_args);
                }
                f.add_having(parts.join(" AND "), args);
            }
        }
        RelationTarget::Column(column) if values.is_trivial() => {
            includes(f, target, values);
            f.add_having(
                format!("COUNT(DISTINCT {column}) >= ?"),
                vec![Value::Integer(roots)],
            );
        }
        _ => {
            for (_, ids) in values.iter() {
                let ids: Vec<i64> = ids.iter().copied().collect();
                let (sql, args) = target.matching(f, &ids);
                f.add_where(sql, args);
            }
        }
    }
}

fn exclude(f: &mut ClauseSet, target: &RelationTarget<'_>, ids: &[i64]) {
    if ids.is_empty() {
        return;
    }
    let list = placeholders(ids.len());
    let sql = match target {
        RelationTarget::Junction { primary, junction } => format!(
            "NOT EXISTS (SELECT 1 FROM {} AS ex WHERE ex.{} = {primary}.id AND ex.{} IN ({list}))",
            junction.table, junction.owner, junction.target
        ),
        RelationTarget::Column(column) => {
            format!("({column} IS NULL OR {column} NOT IN ({list}))")
        }
        RelationTarget::Path {
            id_column,
            select,
            target,
        } => format!("{id_column} NOT IN ({select} WHERE {target} IN ({list}))"),
    };
    f.add_where(sql, id_args(ids));
}

fn presence(f: &mut ClauseSet, target: &RelationTarget<'_>, is_null: bool) {
    let not = if is_null { "" } else { "NOT " };
    target.join(f);
    let sql = match target {
        RelationTarget::Junction { junction, .. } => {
            format!("{} IS {not}NULL", junction.target_column())
        }
        RelationTarget::Column(column) => format!("{column} IS {not}NULL"),
        RelationTarget::Path {
            id_column, select, ..
        } => {
            let negate = if is_null { "NOT " } else { "" };
            format!("{id_column} {negate}IN ({select})")
        }
    };
    f.add_where(sql, vec![]);
}

fn apply_closure(
    f: &mut ClauseSet,
    target: &RelationTarget<'_>,
    modifier: Modifier,
    values: &Closure,
) {
    match modifier {
        Modifier::Includes => includes(f, target, values),
        Modifier::IncludesAll => includes_all(f, target, values),
        Modifier::Excludes => exclude(f, target, &values.ids()),
        _ => {}
    }
}

/// Relation criterion by related id.
pub fn multi(f: &mut ClauseSet, target: &RelationTarget<'_>, c: &MultiCriterion) {
    let values = Closure::exact(&c.value);
    match c.modifier {
        Modifier::Includes | Modifier::IncludesAll | Modifier::Excludes => {
            if !c.value.is_empty() {
                apply_closure(f, target, c.modifier, &values);
            }
        }
        Modifier::Equals if c.value.is_empty() => presence(f, target, true),
        Modifier::Equals => match target {
            RelationTarget::Junction { primary, junction } => {
                includes_all(f, target, &values);
                f.add_where(
                    format!("{} = ?", count_expr(primary, junction)),
                    vec![Value::Integer(values.roots().count() as i64)],
                );
            }
            RelationTarget::Column(_) => includes_all(f, target, &values),
            RelationTarget::Path { .. } => return unsupported(f, "multi", c.modifier),
        },
        Modifier::IsNull => presence(f, target, true),
        Modifier::NotNull => presence(f, target, false),
        other => return unsupported(f, "multi", other),
    }
    exclude(f, target, &c.excludes);
}

/// Relation criterion whose ids expand to their descendants in
/// `relation`, up to the criterion's depth.
pub fn hierarchical(
    ctx: &FilterContext<'_>,
    f: &mut ClauseSet,
    target: &RelationTarget<'_>,
    relation: &HierarchyRelation,
    c: &HierarchicalMultiCriterion,
) {
    if f.error().is_some() {
        return;
    }
    match c.modifier {
        Modifier::IsNull => presence(f, target, true),
        Modifier::NotNull => presence(f, target, false),
        Modifier::Includes | Modifier::IncludesAll | Modifier::Excludes => {
            if !c.value.is_empty() {
                match ctx.closure(relation, Direction::Descendants, &c.value, c.depth) {
                    Ok(values) => apply_closure(f, target, c.modifier, &values),
                    Err(e) => return f.set_error(e),
                }
            }
        }
        other => return unsupported(f, "hierarchical", other),
    }
    if !c.excludes.is_empty() {
        match ctx.closure(relation, Direction::Descendants, &c.excludes, c.depth) {
            Ok(excluded) => exclude(f, target, &excluded.ids()),
            Err(e) => f.set_error(e),
        }
    }
}

/// Criterion on a row's own place in a hierarchy.
///
/// With [`Direction::Descendants`] the row must sit below one of the given
/// ids (tag `parents`, group `containing_groups`); with
/// [`Direction::Ancestors`] above one. The ids themselves only match when
/// a cycle puts them below (or above) themselves.
pub fn membership(
    ctx: &FilterContext<'_>,
    f: &mut ClauseSet,
    id_column: &str,
    relation: &HierarchyRelation,
    direction: Direction,
    c: &HierarchicalMultiCriterion,
) {
    if f.error().is_some() {
        return;
    }
    let target = RelationTarget::column(id_column);
    match c.modifier {
        Modifier::IsNull | Modifier::NotNull => {
            let (own, other) = match direction {
                Direction::Descendants => (&relation.child, &relation.parent),
                Direction::Ancestors => (&relation.parent, &relation.child),
            };
            let exists = format!(
                "EXISTS (SELECT 1 FROM {} r WHERE r.{own} = {id_column} AND r.{other} IS NOT NULL)",
                relation.table
            );
            let sql = if c.modifier == Modifier::IsNull {
                format!("NOT {exists}")
            } else {
                exists
            };
            f.add_where(sql, vec![]);
        }
        Modifier::Includes | Modifier::IncludesAll | Modifier::Excludes => {
            if !c.value.is_empty() {
                match ctx.strict_closure(relation, direction, &c.value, c.depth) {
                    Ok(values) => apply_closure(f, &target, c.modifier, &values),
                    Err(e) => return f.set_error(e),
                }
            }
        }
        other => return unsupported(f, "hierarchy", other),
    }
    if !c.excludes.is_empty() {
        match ctx.strict_closure(relation, direction, &c.excludes, c.depth) {
            Ok(excluded) => exclude(f, &target, &excluded.ids()),
            Err(e) => f.set_error(e),
        }
    }
}
