//! Statement dispatch, transaction control and SQL logging.

use crate::driver::{Driver, DriverConnection, ExecResult};
use crate::error::{DbError, DbResult};
use crate::lifecycle::{Connection, with_deadline};
use crate::monitor::SqlLogger;
use crate::render::Statement;
use crate::row::Record;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Where executed statements go: the handle's last-SQL slot and its logger.
pub(crate) struct LogSink {
    logger: RwLock<Arc<dyn SqlLogger>>,
    last_sql: Mutex<String>,
}

impl LogSink {
    pub(crate) fn new(logger: Arc<dyn SqlLogger>) -> Self {
        Self {
            logger: RwLock::new(logger),
            last_sql: Mutex::new(String::new()),
        }
    }

    pub(crate) fn set_logger(&self, logger: Arc<dyn SqlLogger>) {
        *self.logger.write().unwrap_or_else(PoisonError::into_inner) = logger;
    }

    pub(crate) fn last_sql(&self) -> String {
        self.last_sql
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, stmt: &Statement) {
        let sql = stmt.to_debug_sql();
        let logger = Arc::clone(&self.logger.read().unwrap_or_else(PoisonError::into_inner));
        logger.log(&sql);
        *self.last_sql.lock().unwrap_or_else(PoisonError::into_inner) = sql;
    }
}

/// Runs statements on one connection, inside whatever transaction scope is current.
pub(crate) struct Executor<'a, D: Driver> {
    conn: &'a mut Connection<D>,
    sink: &'a LogSink,
}

impl<'a, D: Driver> Executor<'a, D> {
    pub(crate) fn new(conn: &'a mut Connection<D>, sink: &'a LogSink) -> Self {
        Self { conn, sink }
    }

    /// Run a row-returning statement.
    pub(crate) async fn query(&mut self, stmt: &Statement) -> DbResult<Vec<Record>> {
        let deadline = self.conn.config().query_timeout;
        let conn = &mut *self.conn;
        let mut reached = false;
        let result = with_deadline(deadline, async {
            let live = conn.ensure_live().await?;
            reached = true;
            let rows = live.query(&stmt.sql, &stmt.params).await?;
            conn.touch();
            Ok(rows)
        })
        .await;
        self.settle(stmt, reached, &result);
        result
    }

    /// Run a statement that returns no rows.
    pub(crate) async fn exec(&mut self, stmt: &Statement) -> DbResult<ExecResult> {
        let deadline = self.conn.config().query_timeout;
        let conn = &mut *self.conn;
        let mut reached = false;
        let result = with_deadline(deadline, async {
            let live = conn.ensure_live().await?;
            reached = true;
            let done = live.execute(&stmt.sql, &stmt.params).await?;
            conn.touch();
            Ok(done)
        })
        .await;
        self.settle(stmt, reached, &result);
        result
    }

    /// Log a statement that reached the driver; drop a connection whose
    /// statement was interrupted by the deadline.
    fn settle<T>(&mut self, stmt: &Statement, reached: bool, result: &DbResult<T>) {
        if matches!(result, Err(DbError::Timeout(_))) {
            self.conn.discard();
        }
        if reached {
            self.sink.record(stmt);
        }
    }

    /// First row only; an empty [`Record`] when nothing matched.
    pub(crate) async fn query_one(&mut self, stmt: &Statement) -> DbResult<Record> {
        Ok(self.query(stmt).await?.into_iter().next().unwrap_or_default())
    }

    /// First column of the first row as an integer; `0` when there is no row.
    pub(crate) async fn scalar_i64(&mut self, stmt: &Statement) -> DbResult<i64> {
        let rows = self.query(stmt).await?;
        let Some(row) = rows.first() else {
            return Ok(0);
        };
        match row.iter().next() {
            Some((column, value)) => value
                .trim()
                .parse::<i64>()
                .map_err(|e| DbError::decode(column, e.to_string())),
            None => Ok(0),
        }
    }

    /// Open a transaction scope; returns the new depth.
    pub(crate) async fn begin(&mut self) -> DbResult<usize> {
        let (scope, sql) = self.conn.transactions.prepare_begin();
        self.exec(&Statement::raw(sql)).await?;
        self.conn.transactions.push(scope);
        Ok(self.conn.transactions.depth())
    }

    /// Commit the current scope; returns the remaining depth.
    pub(crate) async fn commit(&mut self) -> DbResult<usize> {
        let statements = self.conn.transactions.prepare_commit()?;
        self.finish(statements).await
    }

    /// Roll back the current scope; returns the remaining depth.
    pub(crate) async fn rollback(&mut self) -> DbResult<usize> {
        let statements = self.conn.transactions.prepare_rollback()?;
        self.finish(statements).await
    }

    async fn finish(&mut self, statements: Vec<String>) -> DbResult<usize> {
        for sql in statements {
            self.exec(&Statement::raw(sql)).await?;
        }
        self.conn.transactions.pop();
        Ok(self.conn.transactions.depth())
    }
}
