//! SQL logging hooks.
//!
//! Every statement a [`Db`](crate::Db) runs is handed to its [`SqlLogger`]
//! after execution, with bound values substituted into the text. This
//! includes the `BEGIN`/`COMMIT`/`ROLLBACK`/`SAVEPOINT` statements issued by
//! the transaction stack.
//!
//! # Example
//!
//! ```rust,ignore
//! use fluentdb::monitor::{StderrLogger, from_fn};
//!
//! let db = fluentdb::instance("root@tcp(127.0.0.1:3306)/app").await?;
//! db.set_logger(StderrLogger::new().max_sql_length(120));
//!
//! // or any closure
//! db.set_logger(from_fn(|sql| println!("{sql}")));
//! ```

mod loggers;

#[cfg(feature = "tracing")]
mod tracing_hook;


pub use loggers::{CompositeLogger, FnLogger, NoopLogger, StderrLogger, from_fn};

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingSqlLogger;

use std::sync::Arc;

/// Receives the text of every executed statement.
pub trait SqlLogger: Send + Sync {
    /// Called once per statement, after it ran (whether or not it succeeded).
    fn log(&self, sql: &str);
}

impl<L: SqlLogger + ?Sized> SqlLogger for Arc<L> {
    fn log(&self, sql: &str) {
        (**self).log(sql);
    }
}

impl<L: SqlLogger + ?Sized> SqlLogger for Box<L> {
    fn log(&self, sql: &str) {
        (**self).log(sql);
    }
}

/// Coarse statement classification, used for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// BEGIN / COMMIT / ROLLBACK / SAVEPOINT / RELEASE
    Transaction,
    Other,
}

impl StatementKind {
    /// Classify a statement by its leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        let is = |kw: &str| keyword.eq_ignore_ascii_case(kw);

        if is("SELECT") || is("SHOW") {
            StatementKind::Select
        } else if is("INSERT") || is("REPLACE") {
            StatementKind::Insert
        } else if is("UPDATE") {
            StatementKind::Update
        } else if is("DELETE") {
            StatementKind::Delete
        } else if is("BEGIN")
            || is("COMMIT")
            || is("ROLLBACK")
            || is("SAVEPOINT")
            || is("RELEASE")
            || is("START")
        {
            StatementKind::Transaction
        } else {
            StatementKind::Other
        }
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn truncate_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}
