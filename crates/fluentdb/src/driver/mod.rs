//! The seam between the handle and a physical database connection.
//!
//! [`Driver`] opens connections; [`DriverConnection`] runs text + `?`
//! parameters against one of them and hands back already-decoded
//! [`Record`]s. The MySQL implementation lives in [`mysql`]; anything else
//! that speaks MySQL's `?` placeholder syntax can plug in here.

use crate::dsn::ConnectOptions;
use crate::error::DbResult;
use crate::row::Record;
use crate::value::Value;
use std::future::Future;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(test)]
pub(crate) mod fake;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Opens physical connections.
pub trait Driver: Clone + Send + Sync + 'static {
    type Conn: DriverConnection;

    /// Open a new physical connection.
    fn connect(&self, options: &ConnectOptions) -> impl Future<Output = DbResult<Self::Conn>> + Send;
}

/// One physical connection.
pub trait DriverConnection: Send + 'static {
    /// Round-trip to the server to confirm the connection is usable.
    fn ping(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Run a row-returning statement.
    ///
    /// Each row is decoded into a [`Record`]; SQL NULL columns are omitted.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<Vec<Record>>> + Send;

    /// Run a statement that does not return rows.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbResult<ExecResult>> + Send;

    /// Close the connection gracefully.
    fn close(self) -> impl Future<Output = DbResult<()>> + Send;
}
