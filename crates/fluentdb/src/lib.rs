//! # fluentdb
//!
//! A fluent MySQL statement builder with a self-healing connection.
//!
//! ## Features
//!
//! - **Fluent clauses**: chain `from`/`and_where`/`group`/`order`/... on a shared handle
//! - **Fixed clause order**: rendering is independent of call order
//! - **Positional binding**: every value becomes a `?` parameter, never inlined
//! - **Idle-timeout aware**: the server's `wait_timeout` is read once and expired
//!   connections are replaced before use
//! - **Nested transactions**: `begin` inside a transaction opens a savepoint
//! - **SQL logging**: every statement, with values substituted, goes to a [`SqlLogger`]
//!
//! ## Example
//!
//! ```ignore
//! use fluentdb::{Direction, Value};
//!
//! let db = fluentdb::instance("root:pw@tcp(127.0.0.1:3306)/shop").await?;
//!
//! // SELECT * FROM `user` `u` WHERE `u`.`age` > ? ORDER BY `u`.`id` DESC LIMIT 5
//! let rows = db
//!     .from_as("user", "u")
//!     .and_where("u.age", ">", 18)
//!     .order("u.id", Direction::Desc)
//!     .limit(5)
//!     .select()
//!     .await?;
//!
//! db.begin().await?;
//! db.from("user").and_where("id", "=", 7).update([("age", 31)]).await?;
//! db.commit().await?;
//!
//! println!("{}", db.last_sql());
//! ```

pub mod condition;
pub mod config;
pub mod db;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod monitor;
pub mod quote;
pub mod registry;
pub mod render;
pub mod row;
pub mod state;
pub mod table;
pub mod transaction;
pub mod value;

mod executor;
mod lifecycle;

pub use condition::{Condition, Connector, Predicate};
pub use config::DbConfig;
pub use db::Db;
pub use driver::{Driver, DriverConnection, ExecResult};
pub use dsn::{Address, ConnectOptions};
pub use error::{DbError, DbResult};
pub use monitor::{CompositeLogger, FnLogger, NoopLogger, SqlLogger, StatementKind, StderrLogger};
pub use registry::Registry;
pub use render::{InsertRow, Statement};
pub use row::Record;
pub use state::QueryState;
pub use table::{Direction, JoinType, Order, TableRef};
pub use transaction::{Scope, TransactionStack};
pub use value::Value;

#[cfg(feature = "tracing")]
pub use monitor::TracingSqlLogger;

#[cfg(feature = "mysql")]
pub use db::MySqlDb;

#[cfg(feature = "mysql")]
pub use driver::mysql::MySqlDriver;

#[cfg(feature = "mysql")]
pub use registry::{global, instance};
