use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use marquee_core::{
    CriterionModifier, Depth, FindFilter, HierarchicalMultiCriterion, IntCriterion,
    MultiCriterion, SceneFilter, SortDirection, StringCriterion, TagFilter, ValidationError,
};
use marquee_db::criterion::{int, multi, string};
use marquee_db::*;
use rusqlite::Connection;
use rusqlite::types::Value;

fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    register_functions(&conn).unwrap();
    conn.execute_batch(
        "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT, size INTEGER);
         CREATE TABLE widget_tags (widget_id INTEGER NOT NULL, tag_id INTEGER NOT NULL);
         INSERT INTO widgets VALUES (1, 'red apple', 10);
         INSERT INTO widgets VALUES (2, 'apple red', 20);
         INSERT INTO widgets VALUES (3, 'item 10', NULL);
         INSERT INTO widgets VALUES (4, 'item 2', 5);
         INSERT INTO widget_tags VALUES (1, 100);
         INSERT INTO widget_tags VALUES (1, 101);
         INSERT INTO widget_tags VALUES (2, 101);",
    )
    .unwrap();
    conn
}

fn tags() -> Junction {
    Junction::new("widget_tags", "widget_id", "tag_id")
}

fn sorts() -> SortOptions {
    SortOptions::new()
        .column("id", "widgets.id")
        .natural("name", "widgets.name")
        .column("size", "widgets.size")
        .count("tag_count", "widgets", &tags())
}

fn by_id() -> FindFilter {
    FindFilter::new().with_sort("id", SortDirection::Asc)
}

fn run(executor: &dyn Executor, f: ClauseSet, find: &FindFilter) -> Result<QueryResult, QueryError> {
    let config = QueryConfig::default();
    QueryExecutor::new(&config, "widgets").query(executor, f, &sorts(), "id", find)
}

fn tag_filter(modifier: CriterionModifier, value: Vec<i64>) -> ClauseSet {
    let junction = tags();
    let mut f = ClauseSet::new();
    multi(
        &mut f,
        &RelationTarget::junction("widgets", &junction),
        &MultiCriterion::new(modifier, value),
    );
    f
}

/// Counts statements on their way to the connection.
struct Counting<'a> {
    conn: &'a Connection,
    statements: Cell<usize>,
}

impl<'a> Counting<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            statements: Cell::new(0),
        }
    }
}

impl Executor for Counting<'_> {
    fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<i64>, QueryError> {
        self.statements.set(self.statements.get() + 1);
        self.conn.query_ids(sql, args)
    }

    fn query_scalar(&self, sql: &str, args: &[Value]) -> Result<i64, QueryError> {
        self.statements.set(self.statements.get() + 1);
        self.conn.query_scalar(sql, args)
    }

    fn query_pairs(&self, sql: &str, args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError> {
        self.statements.set(self.statements.get() + 1);
        self.conn.query_pairs(sql, args)
    }
}

// ── Relations ───────────────────────────────────────────────────────────────

#[test]
fn includes_single_tag() {
    let conn = setup_db();
    let result = run(&conn, tag_filter(CriterionModifier::Includes, vec![100]), &by_id()).unwrap();
    assert_eq!(result.ids, vec![1]);
    assert_eq!(result.count, 1);
}

#[test]
fn joined_rows_are_counted_once() {
    let conn = setup_db();
    let result = run(
        &conn,
        tag_filter(CriterionModifier::Includes, vec![100, 101]),
        &by_id(),
    )
    .unwrap();
    assert_eq!(result.ids, vec![1, 2]);
    assert_eq!(result.count, 2);
}

#[test]
fn includes_all_needs_every_tag() {
    let conn = setup_db();
    let result = run(
        &conn,
        tag_filter(CriterionModifier::IncludesAll, vec![100, 101]),
        &by_id(),
    )
    .unwrap();
    assert_eq!(result.ids, vec![1]);
    assert_eq!(result.count, 1);
}

#[test]
fn excludes_keeps_untagged_rows() {
    let conn = setup_db();
    let result = run(&conn, tag_filter(CriterionModifier::Excludes, vec![100]), &by_id()).unwrap();
    assert_eq!(result.ids, vec![2, 3, 4]);
}

#[test]
fn equals_is_the_exact_set() {
    let conn = setup_db();
    let result = run(&conn, tag_filter(CriterionModifier::Equals, vec![101]), &by_id()).unwrap();
    assert_eq!(result.ids, vec![2]);
}

#[test]
fn is_null_finds_untagged_rows() {
    let conn = setup_db();
    let result = run(&conn, tag_filter(CriterionModifier::IsNull, vec![]), &by_id()).unwrap();
    assert_eq!(result.ids, vec![3, 4]);
}

#[test]
fn empty_includes_matches_everything() {
    let conn = setup_db();
    let result = run(&conn, tag_filter(CriterionModifier::Includes, vec![]), &by_id()).unwrap();
    assert_eq!(result.count, 4);
}

// ── Strings ─────────────────────────────────────────────────────────────────

#[test]
fn quoted_value_is_one_phrase() {
    let conn = setup_db();

    let mut words = ClauseSet::new();
    string(
        &mut words,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::Includes, "red apple"),
    );
    assert_eq!(run(&conn, words, &by_id()).unwrap().ids, vec![1, 2]);

    let mut phrase = ClauseSet::new();
    string(
        &mut phrase,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::Includes, "\"red apple\""),
    );
    assert_eq!(run(&conn, phrase, &by_id()).unwrap().ids, vec![1]);
}

#[test]
fn regex_matches_through_registered_function() {
    let conn = setup_db();
    let mut f = ClauseSet::new();
    string(
        &mut f,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::MatchesRegex, r"^item \d$"),
    );
    assert_eq!(run(&conn, f, &by_id()).unwrap().ids, vec![4]);
}

#[test]
fn bad_regex_fails_before_any_statement() {
    let conn = setup_db();
    let counting = Counting::new(&conn);
    let mut f = ClauseSet::new();
    string(
        &mut f,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::MatchesRegex, "(["),
    );

    let err = run(&counting, f, &by_id()).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidRegex { .. })
    ));
    assert_eq!(counting.statements.get(), 0);
}

// ── Combinators ─────────────────────────────────────────────────────────────

#[test]
fn or_combines_levels() {
    let conn = setup_db();
    let mut root = ClauseSet::new();
    string(
        &mut root,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::Equals, "red apple"),
    );
    let mut other = ClauseSet::new();
    int(
        &mut other,
        "widgets.size",
        &IntCriterion::new(CriterionModifier::GreaterThan, 15),
    );
    root.or(other);

    let result = run(&conn, root, &by_id()).unwrap();
    assert_eq!(result.ids, vec![1, 2]);
}

#[test]
fn not_alone_negates_the_child() {
    let conn = setup_db();
    let mut child = ClauseSet::new();
    string(
        &mut child,
        "widgets.name",
        &StringCriterion::new(CriterionModifier::Includes, "red"),
    );
    let mut root = ClauseSet::new();
    root.not(child);

    let result = run(&conn, root, &by_id()).unwrap();
    assert_eq!(result.ids, vec![3, 4]);
}

#[test]
fn second_combinator_is_rejected() {
    let conn = setup_db();
    let mut root = ClauseSet::new();
    root.and(tag_filter(CriterionModifier::Includes, vec![101]));
    root.or(tag_filter(CriterionModifier::Includes, vec![100]));

    let err = run(&conn, root, &by_id()).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::CombinatorAlreadySet { .. })
    ));
}

// ── Sorting and paging ──────────────────────────────────────────────────────

#[test]
fn natural_sort_orders_numbers() {
    let conn = setup_db();
    let find = FindFilter::new().with_sort("name", SortDirection::Asc);
    let result = run(&conn, ClauseSet::new(), &find).unwrap();
    assert_eq!(result.ids, vec![2, 4, 3, 1]);
}

#[test]
fn second_page_with_total() {
    let conn = setup_db();
    let find = FindFilter::new()
        .with_sort("name", SortDirection::Asc)
        .with_page(2, 2);
    let result = run(&conn, ClauseSet::new(), &find).unwrap();
    assert_eq!(result.ids, vec![3, 1]);
    assert_eq!(result.count, 4);
}

#[test]
fn page_past_the_end_is_empty() {
    let conn = setup_db();
    let find = by_id().with_page(5, 2);
    let result = run(&conn, ClauseSet::new(), &find).unwrap();
    assert!(result.ids.is_empty());
    assert_eq!(result.count, 4);
}

#[test]
fn count_sort_ties_break_on_id() {
    let conn = setup_db();
    let find = FindFilter::new().with_sort("tag_count", SortDirection::Desc);
    let result = run(&conn, ClauseSet::new(), &find).unwrap();
    assert_eq!(result.ids, vec![1, 2, 3, 4]);
}

#[test]
fn unknown_sort_is_rejected() {
    let conn = setup_db();
    let find = FindFilter::new().with_sort("name; DROP TABLE widgets", SortDirection::Asc);
    let err = run(&conn, ClauseSet::new(), &find).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidSort { .. })
    ));
}

#[test]
fn numbered_placeholders_run_unchanged() {
    let conn = setup_db();
    let config = QueryConfig {
        placeholder: PlaceholderStyle::Numbered,
        ..QueryConfig::default()
    };
    let plan = QueryExecutor::new(&config, "widgets")
        .plan(
            tag_filter(CriterionModifier::Includes, vec![100, 101]),
            &sorts(),
            "id",
            &by_id(),
        )
        .unwrap();
    assert!(plan.ids_sql().contains("?1"));
    assert!(!plan.ids_sql().contains("? "));

    let result = QueryExecutor::new(&config, "widgets")
        .execute(&conn, &plan)
        .unwrap();
    assert_eq!(result.ids, vec![1, 2]);
}

// ── Cancellation ────────────────────────────────────────────────────────────

#[test]
fn cancelled_query_returns_nothing() {
    let conn = setup_db();
    let flag = Arc::new(AtomicBool::new(true));
    let executor = Cancellable::new(&conn, flag);
    let err = run(&executor, ClauseSet::new(), &by_id()).unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));
}

/// Raises the cancel flag as soon as the count statement has run.
struct CancelAfterCount<'a> {
    conn: &'a Connection,
    flag: Arc<AtomicBool>,
    ids_calls: Cell<usize>,
}

impl Executor for CancelAfterCount<'_> {
    fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<i64>, QueryError> {
        self.ids_calls.set(self.ids_calls.get() + 1);
        self.conn.query_ids(sql, args)
    }

    fn query_scalar(&self, sql: &str, args: &[Value]) -> Result<i64, QueryError> {
        let count = self.conn.query_scalar(sql, args);
        self.flag.store(true, Ordering::SeqCst);
        count
    }

    fn query_pairs(&self, sql: &str, args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError> {
        self.conn.query_pairs(sql, args)
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[test]
fn cancel_between_count_and_ids_skips_ids() {
    let conn = setup_db();
    let executor = CancelAfterCount {
        conn: &conn,
        flag: Arc::new(AtomicBool::new(false)),
        ids_calls: Cell::new(0),
    };
    let err = run(&executor, ClauseSet::new(), &by_id()).unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));
    assert_eq!(executor.ids_calls.get(), 0);
}

// ── Validation before execution ─────────────────────────────────────────────

#[test]
fn bad_regex_skips_hierarchy_lookups() {
    let conn = open_memory().unwrap();
    let counting = Counting::new(&conn);
    let filter = SceneFilter {
        title: Some(StringCriterion::new(CriterionModifier::MatchesRegex, "(")),
        tags: Some(HierarchicalMultiCriterion::new(
            CriterionModifier::Includes,
            vec![1],
            Depth::Unbounded,
        )),
        ..Default::default()
    };
    let err = query_ids(&counting, &QueryConfig::default(), Some(&filter), &by_id()).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidRegex { .. })
    ));
    assert_eq!(counting.statements.get(), 0);
}

#[test]
fn late_field_error_skips_hierarchy_lookups() {
    // `is_missing` is applied after the tag hierarchy on the same level.
    let conn = open_memory().unwrap();
    let counting = Counting::new(&conn);
    let filter = SceneFilter {
        tags: Some(HierarchicalMultiCriterion::new(
            CriterionModifier::Includes,
            vec![1],
            Depth::Unbounded,
        )),
        tags_filter: Some(Box::new(TagFilter {
            parents: Some(HierarchicalMultiCriterion::new(
                CriterionModifier::Includes,
                vec![1],
                Depth::Unbounded,
            )),
            ..Default::default()
        })),
        is_missing: Some("colour".into()),
        ..Default::default()
    };
    let err = query_ids(&counting, &QueryConfig::default(), Some(&filter), &by_id()).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::UnknownMissingField("colour".into()))
    );
    assert_eq!(counting.statements.get(), 0);
}

#[test]
fn bad_sort_and_page_skip_hierarchy_lookups() {
    let conn = open_memory().unwrap();
    let counting = Counting::new(&conn);
    let filter = SceneFilter {
        tags: Some(HierarchicalMultiCriterion::new(
            CriterionModifier::Includes,
            vec![1],
            Depth::Unbounded,
        )),
        ..Default::default()
    };
    let config = QueryConfig::default();

    let find = FindFilter::new().with_sort("colour", SortDirection::Asc);
    let err = query_ids(&counting, &config, Some(&filter), &find).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::InvalidSort("colour".into()))
    );

    let find = FindFilter::new().with_page(i64::MAX, 25);
    let err = query_ids(&counting, &config, Some(&filter), &find).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::InvalidPage { .. })
    ));
    assert_eq!(counting.statements.get(), 0);
}
