//! The database handle: fluent clause builder plus terminal operations.
//!
//! A [`Db`] owns one physical connection (through the lifecycle layer), one
//! transaction stack and one clause accumulator. Chain methods take `&self`
//! and return `&Self`, so a shared `Arc<Db>` can be used directly:
//!
//! ```rust,ignore
//! let db = fluentdb::instance("root:pw@tcp(127.0.0.1:3306)/app").await?;
//!
//! let adults = db
//!     .from_as("user", "u")
//!     .and_where("u.age", ">", 18)
//!     .order("u.id", Direction::Desc)
//!     .limit(5)
//!     .select()
//!     .await?;
//! ```
//!
//! Every terminal call takes the accumulated clauses and leaves a cleared
//! accumulator behind, whether or not the statement succeeded. Two tasks
//! chaining on the same handle at the same time mix their clauses; callers
//! sharing a handle must serialise chain-then-terminal sequences.

use crate::condition::{Condition, Connector};
use crate::config::DbConfig;
use crate::driver::{Driver, ExecResult};
use crate::dsn::ConnectOptions;
use crate::error::DbResult;
use crate::executor::{Executor, LogSink};
use crate::lifecycle::Connection;
use crate::monitor::SqlLogger;
use crate::render::{self, InsertRow, Statement};
use crate::row::Record;
use crate::state::QueryState;
use crate::table::{Direction, JoinType, Order, TableRef};
use crate::value::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "mysql")]
use crate::driver::mysql::MySqlDriver;


/// A handle on a MySQL connection, backed by `sqlx`.
#[cfg(feature = "mysql")]
pub type MySqlDb = Db<MySqlDriver>;

fn default_logger() -> Arc<dyn SqlLogger> {
    #[cfg(feature = "tracing")]
    {
        Arc::new(crate::monitor::TracingSqlLogger::default())
    }
    #[cfg(not(feature = "tracing"))]
    {
        Arc::new(crate::monitor::NoopLogger)
    }
}

/// Fluent statement builder bound to one connection.
pub struct Db<D: Driver> {
    dsn: String,
    state: Mutex<QueryState>,
    conn: tokio::sync::Mutex<Connection<D>>,
    sink: LogSink,
}

impl<D: Driver> fmt::Debug for Db<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("options", &ConnectOptions::parse(&self.dsn).ok())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "mysql")]
impl Db<MySqlDriver> {
    /// Connect to MySQL with default configuration.
    pub async fn connect(dsn: &str) -> DbResult<Self> {
        Self::connect_with(MySqlDriver, dsn, DbConfig::default()).await
    }

    /// Connect to MySQL with an explicit configuration.
    pub async fn connect_config(dsn: &str, config: DbConfig) -> DbResult<Self> {
        Self::connect_with(MySqlDriver, dsn, config).await
    }
}

impl<D: Driver> Db<D> {
    /// Connect through `driver`.
    ///
    /// Opens the connection, pings it and reads the server idle timeout.
    pub async fn connect_with(driver: D, dsn: &str, config: DbConfig) -> DbResult<Self> {
        let options = ConnectOptions::parse(dsn)?;
        let conn = Connection::open(driver, options, config).await?;
        Ok(Self {
            dsn: dsn.to_string(),
            state: Mutex::new(QueryState::new()),
            conn: tokio::sync::Mutex::new(conn),
            sink: LogSink::new(default_logger()),
        })
    }

    /// The connection string this handle was opened with.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Replace the SQL logger (builder form).
    pub fn with_logger(self, logger: impl SqlLogger + 'static) -> Self {
        self.sink.set_logger(Arc::new(logger));
        self
    }

    /// Replace the SQL logger.
    pub fn set_logger(&self, logger: impl SqlLogger + 'static) {
        self.sink.set_logger(Arc::new(logger));
    }

    pub(crate) fn set_logger_arc(&self, logger: Arc<dyn SqlLogger>) {
        self.sink.set_logger(logger);
    }

    /// The last executed statement with its values substituted.
    ///
    /// Survives [`clear`](Self::clear); empty until something ran.
    pub fn last_sql(&self) -> String {
        self.sink.last_sql()
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_state(&self, f: impl FnOnce(&mut QueryState)) -> &Self {
        f(&mut self.state());
        self
    }

    fn take_state(&self) -> QueryState {
        self.state().take()
    }

    // ==================== Clauses ====================

    /// Set the SELECT field list; emitted verbatim.
    pub fn field(&self, fields: impl Into<String>) -> &Self {
        let fields = fields.into();
        self.update_state(|s| s.fields = fields)
    }

    /// Add `AND field op ?`.
    pub fn and_where(&self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> &Self {
        let cond = Condition::compare(field, op, value);
        self.update_state(|s| s.wheres.push(cond))
    }

    /// Add `OR field op ?`.
    pub fn or_where(&self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> &Self {
        let cond = Condition::compare(field, op, value).or();
        self.update_state(|s| s.wheres.push(cond))
    }

    /// Add a literal `AND <sql>` predicate. Nothing is escaped.
    pub fn and_where_raw(&self, sql: impl Into<String>) -> &Self {
        let cond = Condition::raw(sql);
        self.update_state(|s| s.wheres.push(cond))
    }

    /// Add a literal `OR <sql>` predicate. Nothing is escaped.
    pub fn or_where_raw(&self, sql: impl Into<String>) -> &Self {
        let cond = Condition::raw(sql).or();
        self.update_state(|s| s.wheres.push(cond))
    }

    pub fn having(&self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> &Self {
        let cond = Condition::compare(field, op, value);
        self.update_state(|s| s.havings.push(cond))
    }

    pub fn or_having(&self, field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> &Self {
        let cond = Condition::compare(field, op, value).with_connector(Connector::Or);
        self.update_state(|s| s.havings.push(cond))
    }

    pub fn having_raw(&self, sql: impl Into<String>) -> &Self {
        let cond = Condition::raw(sql);
        self.update_state(|s| s.havings.push(cond))
    }

    pub fn or_having_raw(&self, sql: impl Into<String>) -> &Self {
        let cond = Condition::raw(sql).or();
        self.update_state(|s| s.havings.push(cond))
    }

    /// Add a root table. Several roots render comma-separated.
    pub fn from(&self, table: impl Into<String>) -> &Self {
        let table = TableRef::root(table, None);
        self.update_state(|s| s.tables.push(table))
    }

    /// Add a root table with an alias.
    pub fn from_as(&self, table: impl Into<String>, alias: impl Into<String>) -> &Self {
        let table = TableRef::root(table, Some(alias.into()));
        self.update_state(|s| s.tables.push(table))
    }

    /// Add `<type> JOIN table ON <on>`; `on` is emitted verbatim.
    pub fn join(&self, join_type: JoinType, table: impl Into<String>, on: impl Into<String>) -> &Self {
        let table = TableRef::join(table, None, on, join_type);
        self.update_state(|s| s.tables.push(table))
    }

    /// Add `<type> JOIN table alias ON <on>`.
    pub fn join_as(
        &self,
        join_type: JoinType,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: impl Into<String>,
    ) -> &Self {
        let table = TableRef::join(table, Some(alias.into()), on, join_type);
        self.update_state(|s| s.tables.push(table))
    }

    pub fn inner_join(&self, table: impl Into<String>, on: impl Into<String>) -> &Self {
        self.join(JoinType::Inner, table, on)
    }

    pub fn left_join(&self, table: impl Into<String>, on: impl Into<String>) -> &Self {
        self.join(JoinType::Left, table, on)
    }

    pub fn right_join(&self, table: impl Into<String>, on: impl Into<String>) -> &Self {
        self.join(JoinType::Right, table, on)
    }

    /// Set LIMIT; `0` removes it.
    pub fn limit(&self, limit: u64) -> &Self {
        self.update_state(|s| s.limit = (limit > 0).then_some(limit))
    }

    /// Set OFFSET; `0` removes it.
    pub fn offset(&self, offset: u64) -> &Self {
        self.update_state(|s| s.offset = (offset > 0).then_some(offset))
    }

    pub fn order(&self, field: impl Into<String>, direction: Direction) -> &Self {
        let key = Order::new(field, Some(direction));
        self.update_state(|s| s.orders.push(key))
    }

    /// Add a GROUP BY key.
    pub fn group(&self, field: impl Into<String>) -> &Self {
        let key = Order::new(field, None);
        self.update_state(|s| s.groups.push(key))
    }

    /// Add a GROUP BY key with an explicit direction (MySQL 5.x only).
    pub fn group_dir(&self, field: impl Into<String>, direction: Direction) -> &Self {
        let key = Order::new(field, Some(direction));
        self.update_state(|s| s.groups.push(key))
    }

    /// Append `WITH ROLLUP` to GROUP BY (ignored without one).
    pub fn rollup(&self) -> &Self {
        self.update_state(|s| s.rollup = true)
    }

    /// Drop every accumulated clause. [`last_sql`](Self::last_sql) is kept.
    pub fn clear(&self) -> &Self {
        self.update_state(QueryState::clear)
    }

    /// Render the pending SELECT without running or clearing it.
    pub fn preview_select(&self) -> DbResult<Statement> {
        render::select(&self.state())
    }

    // ==================== Terminals ====================

    async fn run_query(&self, stmt: &Statement) -> DbResult<Vec<Record>> {
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).query(stmt).await
    }

    async fn run_exec(&self, stmt: &Statement) -> DbResult<ExecResult> {
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).exec(stmt).await
    }

    /// First matching row (`LIMIT 1`); an empty [`Record`] when none matched.
    pub async fn find(&self) -> DbResult<Record> {
        let mut state = self.take_state();
        state.limit = Some(1);
        let stmt = render::select(&state)?;
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).query_one(&stmt).await
    }

    /// All matching rows in result order.
    pub async fn select(&self) -> DbResult<Vec<Record>> {
        let stmt = render::select(&self.take_state())?;
        self.run_query(&stmt).await
    }

    /// `COUNT(*)` over the pending tables and predicates.
    pub async fn count(&self) -> DbResult<i64> {
        let stmt = render::count(&self.take_state(), None)?;
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).scalar_i64(&stmt).await
    }

    /// `COUNT(field)`; NULLs in `field` are not counted.
    pub async fn count_field(&self, field: &str) -> DbResult<i64> {
        let stmt = render::count(&self.take_state(), Some(field))?;
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).scalar_i64(&stmt).await
    }

    /// Multi-row insert into the first root table; returns the last insert id.
    pub async fn insert<S: AsRef<str>>(&self, fields: &[S], rows: &[InsertRow]) -> DbResult<u64> {
        let stmt = render::insert(&self.take_state(), fields, rows)?;
        Ok(self.run_exec(&stmt).await?.last_insert_id)
    }

    /// `INSERT INTO <table> <select_sql>`; returns the last insert id.
    pub async fn insert_select(&self, select_sql: &str) -> DbResult<u64> {
        let stmt = render::insert_select(&self.take_state(), select_sql)?;
        Ok(self.run_exec(&stmt).await?.last_insert_id)
    }

    /// `UPDATE ... SET` in pair order; returns affected rows.
    pub async fn update<K, V, I>(&self, assignments: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let assignments: Vec<(String, Value)> = assignments
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let stmt = render::update(&self.take_state(), &assignments)?;
        Ok(self.run_exec(&stmt).await?.rows_affected)
    }

    /// `DELETE FROM ... [WHERE]`; returns affected rows.
    pub async fn delete(&self) -> DbResult<u64> {
        let stmt = render::delete(&self.take_state())?;
        Ok(self.run_exec(&stmt).await?.rows_affected)
    }

    /// Run caller-written SQL that returns no rows.
    ///
    /// The number of `?` markers must match `params`.
    pub async fn exec(&self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        let stmt = Statement::with_params(sql, params.to_vec());
        stmt.check_arity()?;
        self.run_exec(&stmt).await
    }

    /// Run caller-written SQL that returns rows.
    pub async fn query_raw(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        let stmt = Statement::with_params(sql, params.to_vec());
        stmt.check_arity()?;
        self.run_query(&stmt).await
    }

    // ==================== Transactions ====================

    /// Open a transaction scope; nested calls open savepoints.
    ///
    /// Returns the new depth.
    pub async fn begin(&self) -> DbResult<usize> {
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).begin().await
    }

    /// Commit the current scope and return to the enclosing one.
    ///
    /// Fails with a transaction-state error when no scope is open. Returns the
    /// remaining depth.
    pub async fn commit(&self) -> DbResult<usize> {
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).commit().await
    }

    /// Roll back the current scope and return to the enclosing one.
    pub async fn rollback(&self) -> DbResult<usize> {
        let mut conn = self.conn.lock().await;
        Executor::new(&mut conn, &self.sink).rollback().await
    }

    /// Number of open transaction scopes.
    pub async fn transaction_depth(&self) -> usize {
        self.conn.lock().await.transactions.depth()
    }

    pub async fn in_transaction(&self) -> bool {
        self.transaction_depth().await > 0
    }

    /// Close the physical connection; open scopes are abandoned.
    ///
    /// The handle stays usable: the next operation reconnects.
    pub async fn close(&self) -> DbResult<()> {
        self.conn.lock().await.close().await
    }
}

/// Run `body` inside a transaction scope on `db`.
///
/// Commits on `Ok`, rolls back on `Err`. Nested use opens savepoints. The
/// body must evaluate to `fluentdb::DbResult<T>`.
///
/// ```rust,ignore
/// fluentdb::transaction!(db, {
///     db.from("account").and_where("id", "=", 1).update([("balance", 90)]).await?;
///     db.from("account").and_where("id", "=", 2).update([("balance", 110)]).await?;
///     Ok(())
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($db:expr, $body:block) => {{
        let __fluentdb_db = &$db;
        __fluentdb_db.begin().await?;
        let __fluentdb_result = async { $body }.await;
        match __fluentdb_result {
            Ok(value) => {
                __fluentdb_db.commit().await?;
                Ok(value)
            }
            Err(error) => match __fluentdb_db.rollback().await {
                Ok(_) => Err(error),
                Err(rollback_err) => Err($crate::DbError::TransactionState(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
