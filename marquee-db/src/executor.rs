//! The statement-running seam between the engine and a database session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::config::PlaceholderStyle;
use crate::error::QueryError;

/// Runs parameterised statements on behalf of the engine.
///
/// The engine never opens connections or transactions itself; callers
/// pass whatever session the statements should run in.
pub trait Executor {
    /// First column of every row, as ids.
    fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<i64>, QueryError>;

    /// First column of the single result row.
    fn query_scalar(&self, sql: &str, args: &[Value]) -> Result<i64, QueryError>;

    /// First two columns of every row.
    fn query_pairs(&self, sql: &str, args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError>;

    /// Checked by the engine between round trips.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Executor for Connection {
    fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<i64>, QueryError> {
        log::trace!("{sql} {args:?}");
        let run = || -> rusqlite::Result<Vec<i64>> {
            let mut stmt = self.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get(0))?;
            rows.collect()
        };
        run().map_err(|e| QueryError::execution(sql, args, e))
    }

    fn query_scalar(&self, sql: &str, args: &[Value]) -> Result<i64, QueryError> {
        log::trace!("{sql} {args:?}");
        self.query_row(sql, params_from_iter(args.iter()), |row| row.get(0))
            .map_err(|e| QueryError::execution(sql, args, e))
    }

    fn query_pairs(&self, sql: &str, args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError> {
        log::trace!("{sql} {args:?}");
        let run = || -> rusqlite::Result<Vec<(i64, i64)>> {
            let mut stmt = self.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        };
        run().map_err(|e| QueryError::execution(sql, args, e))
    }
}

/// Wraps an executor with a cancel flag shared with the caller.
///
/// Once the flag is set every further statement fails with
/// [`QueryError::Cancelled`] and the engine abandons the operation.
pub struct Cancellable<'a, E: Executor + ?Sized> {
    inner: &'a E,
    flag: Arc<AtomicBool>,
}

impl<'a, E: Executor + ?Sized> Cancellable<'a, E> {
    pub fn new(inner: &'a E, flag: Arc<AtomicBool>) -> Self {
        Self { inner, flag }
    }

    fn check(&self) -> Result<(), QueryError> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl<E: Executor + ?Sized> Executor for Cancellable<'_, E> {
    fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<i64>, QueryError> {
        self.check()?;
        self.inner.query_ids(sql, args)
    }

    fn query_scalar(&self, sql: &str, args: &[Value]) -> Result<i64, QueryError> {
        self.check()?;
        self.inner.query_scalar(sql, args)
    }

    fn query_pairs(&self, sql: &str, args: &[Value]) -> Result<Vec<(i64, i64)>, QueryError> {
        self.check()?;
        self.inner.query_pairs(sql, args)
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.inner.is_cancelled()
    }
}

/// Rewrite `?` placeholders for `style`, skipping quoted text.
pub fn rebind(sql: &str, style: PlaceholderStyle) -> String {
    let prefix = match style {
        PlaceholderStyle::Question => return sql.to_string(),
        PlaceholderStyle::Numbered => '?',
        PlaceholderStyle::Dollar => '$',
    };

    let mut out = String::with_capacity(sql.len() + 16);
    let mut quote: Option<char> = None;
    let mut n = 0;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            (None, '?') => {
                n += 1;
                out.push(prefix);
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}
