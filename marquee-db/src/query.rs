//! Statement assembly and the count-then-ids protocol.
//!
//! A [`QueryPlan`] is the final shape of one entity query: the grouped
//! body shared by both statements, the sort, and the page window. The
//! count statement wraps the body in a subquery so rows multiplied by
//! joins are counted once per entity.

use marquee_core::{FindFilter, SortDirection, ValidationError};
use rusqlite::types::Value;

use crate::clause::{ClauseSet, Joins};
use crate::config::{Junction, PlaceholderStyle, QueryConfig};
use crate::criterion::count_expr;
use crate::error::QueryError;
use crate::executor::{Executor, rebind};

// ── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum SortKind {
    Column(String),
    Natural(String),
    Expr(String),
    Random,
}

/// The sort keys an entity accepts, and what each one orders by.
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    keys: Vec<(String, SortKind)>,
}

impl SortOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, key: &str, column: impl Into<String>) -> Self {
        self.keys
            .push((key.to_string(), SortKind::Column(column.into())));
        self
    }

    /// Ordered with the configured natural collation.
    pub fn natural(mut self, key: &str, column: impl Into<String>) -> Self {
        self.keys
            .push((key.to_string(), SortKind::Natural(column.into())));
        self
    }

    /// Ordered by the number of junction rows owned by each row.
    pub fn count(mut self, key: &str, primary: &str, junction: &Junction) -> Self {
        self.keys.push((
            key.to_string(),
            SortKind::Expr(count_expr(primary, junction)),
        ));
        self
    }

    /// Ordered by an arbitrary SQL expression over the row.
    pub fn expr(mut self, key: &str, sql: impl Into<String>) -> Self {
        self.keys.push((key.to_string(), SortKind::Expr(sql.into())));
        self
    }

    pub fn random(mut self) -> Self {
        self.keys.push(("random".to_string(), SortKind::Random));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().any(|k| k == key)
    }

    /// The ORDER BY body for `key`, with `id_column` as the tie-breaker.
    pub fn order_by(
        &self,
        key: &str,
        direction: SortDirection,
        collation: &str,
        id_column: &str,
    ) -> Result<String, ValidationError> {
        let Some((_, kind)) = self.keys.iter().find(|(k, _)| k == key) else {
            return Err(ValidationError::InvalidSort(key.to_string()));
        };
        let dir = direction.as_sql();
        let primary = match kind {
            SortKind::Column(c) => format!("{c} {dir}"),
            SortKind::Natural(c) => format!("{c} COLLATE {collation} {dir}"),
            SortKind::Expr(e) => format!("{e} {dir}"),
            SortKind::Random => return Ok("RANDOM()".to_string()),
        };
        if matches!(kind, SortKind::Column(c) if c == id_column) {
            return Ok(primary);
        }
        Ok(format!("{primary}, {id_column} ASC"))
    }
}

// ── Plan ────────────────────────────────────────────────────────────────────

/// A fully assembled entity query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub table: String,
    pub joins: Joins,
    pub where_sql: String,
    pub where_args: Vec<Value>,
    pub having_sql: String,
    pub having_args: Vec<Value>,
    /// Empty for embedded subqueries.
    pub order_by: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub placeholder: PlaceholderStyle,
}

impl QueryPlan {
    pub fn id_column(&self) -> String {
        format!("{}.id", self.table)
    }

    fn body(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            self.id_column(),
            self.table,
            self.joins.to_sql()
        );
        if !self.where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_sql);
        }
        sql.push_str(" GROUP BY ");
        sql.push_str(&self.id_column());
        if !self.having_sql.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having_sql);
        }
        sql
    }

    /// WHERE arguments, then HAVING arguments.
    pub fn args(&self) -> Vec<Value> {
        let mut args = self.where_args.clone();
        args.extend(self.having_args.iter().cloned());
        args
    }

    /// `SELECT T.id ...` with `?` placeholders, for embedding in another
    /// statement. Takes [`args`](Self::args).
    pub fn subquery_sql(&self) -> String {
        self.body()
    }

    pub fn count_sql(&self) -> String {
        rebind(
            &format!("SELECT COUNT(*) FROM ({}) AS temp", self.body()),
            self.placeholder,
        )
    }

    pub fn ids_sql(&self) -> String {
        let mut sql = self.body();
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by);
        }
        if self.limit.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
        }
        rebind(&sql, self.placeholder)
    }

    /// [`args`](Self::args) plus the page window.
    pub fn ids_args(&self) -> Vec<Value> {
        let mut args = self.args();
        if let Some(limit) = self.limit {
            args.push(Value::Integer(limit));
            args.push(Value::Integer(self.offset.unwrap_or(0)));
        }
        args
    }
}

/// Ordered ids of one page plus the total across all pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub ids: Vec<i64>,
    pub count: i64,
}

// ── Executor ────────────────────────────────────────────────────────────────

/// Plans and runs entity queries against one table.
pub struct QueryExecutor<'a> {
    config: &'a QueryConfig,
    table: &'a str,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(config: &'a QueryConfig, table: &'a str) -> Self {
        Self { config, table }
    }

    /// Turn a built clause set into a plan. Any error recorded while the
    /// set was built is returned here, before a statement exists.
    pub fn plan(
        &self,
        mut filter: ClauseSet,
        sort: &SortOptions,
        default_sort: &str,
        find: &FindFilter,
    ) -> Result<QueryPlan, QueryError> {
        if let Some(err) = filter.take_error() {
            return Err(err);
        }

        let id_column = format!("{}.id", self.table);
        let order_by = sort.order_by(
            find.sort_or(default_sort),
            find.direction(),
            &self.config.natural_collation,
            &id_column,
        )?;
        let (limit, offset) = self.window(find)?;

        let plan = self.assemble(&filter, order_by, limit, offset);
        log::debug!(
            "planned {} query: {} join(s), page {:?} offset {:?}",
            self.table,
            plan.joins.len(),
            limit,
            offset
        );
        Ok(plan)
    }

    /// LIMIT and OFFSET for the requested page, or neither when the
    /// request is unpaginated.
    pub fn window(
        &self,
        find: &FindFilter,
    ) -> Result<(Option<i64>, Option<i64>), ValidationError> {
        let Some(per_page) = find.page_size(self.config.default_per_page) else {
            return Ok((None, None));
        };
        let page = find.page();
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or(ValidationError::InvalidPage { page, per_page })?;
        Ok((Some(per_page), Some(offset)))
    }

    /// Plan for embedding: no sort, no page window.
    pub fn subquery(&self, mut filter: ClauseSet) -> Result<QueryPlan, QueryError> {
        if let Some(err) = filter.take_error() {
            return Err(err);
        }
        Ok(self.assemble(&filter, String::new(), None, None))
    }

    fn assemble(
        &self,
        filter: &ClauseSet,
        order_by: String,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> QueryPlan {
        let (where_sql, where_args) = filter.where_sql();
        let (having_sql, having_args) = filter.having_sql();
        QueryPlan {
            table: self.table.to_string(),
            joins: filter.all_joins(),
            where_sql,
            where_args,
            having_sql,
            having_args,
            order_by,
            limit,
            offset,
            placeholder: self.config.placeholder,
        }
    }

    /// Run the count statement, then the ids statement.
    ///
    /// Cancellation is checked before, between and after the two; a
    /// cancelled run returns [`QueryError::Cancelled`] and nothing else.
    pub fn execute(
        &self,
        executor: &dyn Executor,
        plan: &QueryPlan,
    ) -> Result<QueryResult, QueryError> {
        let cancelled = || {
            if executor.is_cancelled() {
                Err(QueryError::Cancelled)
            } else {
                Ok(())
            }
        };

        cancelled()?;
        let count = executor.query_scalar(&plan.count_sql(), &plan.args())?;
        cancelled()?;
        let ids = executor.query_ids(&plan.ids_sql(), &plan.ids_args())?;
        cancelled()?;

        log::debug!("{}: {} of {count} id(s)", self.table, ids.len());
        Ok(QueryResult { ids, count })
    }

    /// [`plan`](Self::plan) then [`execute`](Self::execute).
    pub fn query(
        &self,
        executor: &dyn Executor,
        filter: ClauseSet,
        sort: &SortOptions,
        default_sort: &str,
        find: &FindFilter,
    ) -> Result<QueryResult, QueryError> {
        let plan = self.plan(filter, sort, default_sort, find)?;
        self.execute(executor, &plan)
    }
}
