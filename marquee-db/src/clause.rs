//! Predicate accumulation: clauses, joins and the nestable clause set.
//!
//! A [`ClauseSet`] collects the WHERE and HAVING fragments for one level of
//! a filter, the joins those fragments need, and optionally one nested
//! set attached with AND, OR or NOT. SQL text is produced once, at the end,
//! by [`ClauseSet::where_sql`] / [`ClauseSet::having_sql`]; values stay in
//! the argument lists and are never written into the SQL.

use marquee_core::{Combinator, ValidationError};
use rusqlite::types::Value;

use crate::error::QueryError;

/// One predicate fragment with its positional (`?`) arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Clause {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Combine clauses with `op` (`AND` / `OR`), parenthesising each one.
    /// Returns `None` for an empty input.
    pub fn join(clauses: Vec<Clause>, op: &str) -> Option<Clause> {
        match clauses.len() {
            0 => None,
            1 => clauses.into_iter().next(),
            _ => {
                let mut parts = Vec::with_capacity(clauses.len());
                let mut args = Vec::new();
                for clause in clauses {
                    parts.push(format!("({})", clause.sql));
                    args.extend(clause.args);
                }
                Some(Clause::new(parts.join(&format!(" {op} ")), args))
            }
        }
    }
}

/// `?, ?, ?` for `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Bindable values for a list of ids.
pub fn id_args(ids: &[i64]) -> Vec<Value> {
    ids.iter().map(|&id| Value::Integer(id)).collect()
}

// ── Joins ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Left => "LEFT JOIN",
            Self::Inner => "INNER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    /// Empty when the table is referenced by its own name.
    pub alias: String,
    pub on: String,
    pub kind: JoinKind,
}

impl Join {
    pub fn left(table: impl Into<String>, alias: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            on: on.into(),
            kind: JoinKind::Left,
        }
    }

    pub fn inner(table: impl Into<String>, alias: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Inner,
            ..Self::left(table, alias, on)
        }
    }

    /// The name other SQL uses to refer to this join: alias, else table.
    pub fn identity(&self) -> &str {
        if self.alias.is_empty() {
            &self.table
        } else {
            &self.alias
        }
    }

    pub fn to_sql(&self) -> String {
        if self.alias.is_empty() || self.alias == self.table {
            format!("{} {} ON {}", self.kind.keyword(), self.table, self.on)
        } else {
            format!(
                "{} {} AS {} ON {}",
                self.kind.keyword(),
                self.table,
                self.alias,
                self.on
            )
        }
    }
}

/// Joins in insertion order, unique by [`Join::identity`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Joins(Vec<Join>);

impl Joins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.0.iter().any(|j| j.identity() == identity)
    }

    /// Add `join` unless one with the same identity is present.
    pub fn add(&mut self, join: Join) -> bool {
        if self.contains(join.identity()) {
            return false;
        }
        self.0.push(join);
        true
    }

    pub fn extend(&mut self, other: Joins) {
        for join in other.0 {
            self.add(join);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Join> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rendered joins, each preceded by a space; empty when there are none.
    pub fn to_sql(&self) -> String {
        self.0.iter().map(|j| format!(" {}", j.to_sql())).collect()
    }
}

impl<'a> IntoIterator for &'a Joins {
    type Item = &'a Join;
    type IntoIter = std::slice::Iter<'a, Join>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Clause Set ──────────────────────────────────────────────────────────────

/// Predicates, joins and an optional nested set for one filter level.
///
/// Built in a single pass and consumed when the query is planned. Errors
/// raised while building (bad regex, bad modifier, a failed hierarchy
/// lookup) are recorded with [`set_error`](Self::set_error) and checked
/// before any SQL runs.
#[derive(Debug, Default)]
pub struct ClauseSet {
    where_clauses: Vec<Clause>,
    having_clauses: Vec<Clause>,
    joins: Joins,
    sub: Option<(Combinator, Box<ClauseSet>)>,
    error: Option<QueryError>,
}

impl ClauseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_where(&mut self, sql: impl Into<String>, args: Vec<Value>) {
        let sql = sql.into();
        if !sql.is_empty() {
            self.where_clauses.push(Clause::new(sql, args));
        }
    }

    pub fn add_having(&mut self, sql: impl Into<String>, args: Vec<Value>) {
        let sql = sql.into();
        if !sql.is_empty() {
            self.having_clauses.push(Clause::new(sql, args));
        }
    }

    pub fn add_where_clause(&mut self, clause: Clause) {
        self.add_where(clause.sql, clause.args);
    }

    pub fn add_having_clause(&mut self, clause: Clause) {
        self.add_having(clause.sql, clause.args);
    }

    /// Add a `LEFT JOIN` unless its identity is already reachable from
    /// this set (including nested sets).
    pub fn add_left_join(&mut self, table: &str, alias: &str, on: impl Into<String>) {
        self.add_join(Join::left(table, alias, on));
    }

    pub fn add_inner_join(&mut self, table: &str, alias: &str, on: impl Into<String>) {
        self.add_join(Join::inner(table, alias, on));
    }

    pub fn add_join(&mut self, join: Join) {
        if !self.has_join(join.identity()) {
            self.joins.add(join);
        }
    }

    /// Whether a join with this identity exists here or down the chain.
    pub fn has_join(&self, identity: &str) -> bool {
        self.joins.contains(identity)
            || self
                .sub
                .as_ref()
                .is_some_and(|(_, child)| child.has_join(identity))
    }

    pub fn and(&mut self, other: ClauseSet) {
        self.attach(Combinator::And, other);
    }

    pub fn or(&mut self, other: ClauseSet) {
        self.attach(Combinator::Or, other);
    }

    pub fn not(&mut self, other: ClauseSet) {
        self.attach(Combinator::Not, other);
    }

    /// Attach `other` as the nested set. Only the first attachment takes
    /// effect; later ones are dropped and recorded as a validation error.
    pub fn attach(&mut self, op: Combinator, other: ClauseSet) {
        if let Some((existing, _)) = &self.sub {
            let existing = *existing;
            log::warn!("{existing} sub-filter already attached, ignoring {op}");
            self.set_error(
                ValidationError::CombinatorAlreadySet {
                    existing,
                    rejected: op,
                }
                .into(),
            );
            return;
        }
        self.sub = Some((op, Box::new(other)));
    }

    pub fn combinator(&self) -> Option<Combinator> {
        self.sub.as_ref().map(|(op, _)| *op)
    }

    pub fn where_sql(&self) -> (String, Vec<Value>) {
        self.render(|s| &s.where_clauses)
    }

    pub fn having_sql(&self) -> (String, Vec<Value>) {
        self.render(|s| &s.having_clauses)
    }

    fn render(&self, pick: fn(&ClauseSet) -> &Vec<Clause>) -> (String, Vec<Value>) {
        let clauses = pick(self);
        let mut args: Vec<Value> = clauses.iter().flat_map(|c| c.args.iter().cloned()).collect();
        let own = match clauses.as_slice() {
            [] => String::new(),
            [only] => format!("({})", only.sql),
            many => {
                let parts: Vec<String> = many.iter().map(|c| format!("({})", c.sql)).collect();
                format!("({})", parts.join(" AND "))
            }
        };

        let Some((op, child)) = &self.sub else {
            return (own, args);
        };
        let (child_sql, child_args) = child.render(pick);
        if child_sql.is_empty() {
            return (own, args);
        }
        args.extend(child_args);

        let sub = format!("({child_sql})");
        let sql = if own.is_empty() {
            match op {
                Combinator::Not => format!("NOT {sub}"),
                Combinator::And | Combinator::Or => sub,
            }
        } else {
            let word = match op {
                Combinator::And => "AND",
                Combinator::Or => "OR",
                Combinator::Not => "AND NOT",
            };
            format!("{own} {word} {sub}")
        };
        (sql, args)
    }

    /// Joins from this set and every nested set, first occurrence wins.
    pub fn all_joins(&self) -> Joins {
        let mut joins = self.joins.clone();
        if let Some((_, child)) = &self.sub {
            joins.extend(child.all_joins());
        }
        joins
    }

    /// Record an error. The first one recorded on a set is kept.
    pub fn set_error(&mut self, error: QueryError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// This set's error, else the first one down the chain.
    pub fn error(&self) -> Option<&QueryError> {
        self.error
            .as_ref()
            .or_else(|| self.sub.as_ref().and_then(|(_, child)| child.error()))
    }

    /// Remove and return the error [`error`](Self::error) would report.
    pub fn take_error(&mut self) -> Option<QueryError> {
        if self.error.is_some() {
            return self.error.take();
        }
        self.sub.as_mut().and_then(|(_, child)| child.take_error())
    }

    /// Nothing to render: no clauses, joins or nested set.
    pub fn is_empty(&self) -> bool {
        self.where_clauses.is_empty()
            && self.having_clauses.is_empty()
            && self.joins.is_empty()
            && self.sub.as_ref().is_none_or(|(_, child)| child.is_empty())
    }
}
