//! SQL functions and collations the generated queries rely on.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

/// Case-insensitive natural ordering ("item 2" sorts before "item 10").
pub const NATURAL_COLLATION: &str = "NATURAL_CI";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Register `regexp(pattern, text)` and the natural collation on `conn`.
///
/// SQLite rewrites `x REGEXP y` as `regexp(y, x)`. A NULL or blob
/// subject yields NULL. The compiled pattern is kept as auxiliary data
/// on the statement, so it is built once per statement rather than once
/// per row.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let re: Arc<Regex> = ctx.get_or_create_aux(0, |pattern| -> Result<_, BoxError> {
                Ok(Regex::new(pattern.as_str()?)?)
            })?;
            let subject = match ctx.get_raw(1) {
                ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
                ValueRef::Integer(i) => i.to_string(),
                ValueRef::Real(r) => r.to_string(),
                ValueRef::Null | ValueRef::Blob(_) => return Ok(None),
            };
            Ok(Some(re.is_match(&subject)))
        },
    )?;
    conn.create_collation(NATURAL_COLLATION, natural_cmp)?;
    Ok(())
}

/// Compare two strings case-insensitively, treating digit runs as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let l = digit_run(&mut left);
                let r = digit_run(&mut right);
                let (l, r) = (l.trim_start_matches('0'), r.trim_start_matches('0'));
                let ord = l.len().cmp(&r.len()).then_with(|| l.cmp(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn digit_run(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_order() {
        let mut names = vec!["Item 10", "item 2", "Item 1", "apple", "item 02b"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["apple", "Item 1", "item 2", "item 02b", "Item 10"]);
    }

    #[test]
    fn case_is_ignored() {
        assert_eq!(natural_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("ab", "abc"), Ordering::Less);
    }

    #[test]
    fn regexp_function() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        let matched: Option<bool> = conn
            .query_row("SELECT 'Sunset Beach' REGEXP '^Sun.*h$'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(matched, Some(true));
        let null: Option<bool> = conn
            .query_row("SELECT NULL REGEXP 'x'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(null, None);
        assert!(conn
            .query_row("SELECT 'a' REGEXP '('", [], |r| r.get::<_, Option<bool>>(0))
            .is_err());
    }

    #[test]
    fn regexp_over_many_rows() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT);
             INSERT INTO t VALUES (1, 'item 1'), (2, 'other'), (3, 'item 33'), (4, NULL), (5, 7);",
        )
        .unwrap();
        let mut stmt = conn
            .prepare("SELECT id FROM t WHERE name REGEXP ? ORDER BY id")
            .unwrap();
        let ids: Vec<i64> = stmt
            .query_map([r"^item \d+$"], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 3]);

        let numbers: Vec<i64> = stmt
            .query_map([r"^\d$"], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(numbers, vec![5]);

        let bad = conn
            .prepare("SELECT id FROM t WHERE name REGEXP '('")
            .unwrap()
            .query_map([], |r| r.get::<_, i64>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>();
        assert!(bad.is_err());
    }

    #[test]
    fn collation_is_registered() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (name TEXT);
             INSERT INTO t VALUES ('disc 10'), ('Disc 9'), ('disc 1');",
        )
        .unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM t ORDER BY name COLLATE NATURAL_CI")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["disc 1", "Disc 9", "disc 10"]);
    }
}
