//! In-memory driver for unit tests.

use super::{Driver, DriverConnection, ExecResult};
use crate::dsn::ConnectOptions;
use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    /// SQL text of every query/execute, in call order (wait_timeout lookups excluded).
    pub executed: Vec<String>,
    pub params: Vec<Vec<Value>>,
    pub connects: usize,
    pub pings: usize,
    pub closes: usize,
    pub timeout_lookups: usize,
    pub fail_connect: bool,
    pub fail_ping: bool,
    /// Reported `wait_timeout`; `None` returns no rows.
    pub wait_timeout: Option<String>,
    pub rows: VecDeque<Vec<Record>>,
    pub exec_results: VecDeque<ExecResult>,
    pub fail_next: Option<String>,
    pub delay: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::with_wait_timeout("28800")
    }

    pub fn with_wait_timeout(value: &str) -> Self {
        let driver = Self::default();
        driver.state().wait_timeout = Some(value.to_string());
        driver
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_rows(&self, rows: Vec<Record>) {
        self.state().rows.push_back(rows);
    }

    pub fn push_exec(&self, rows_affected: u64, last_insert_id: u64) {
        self.state().exec_results.push_back(ExecResult {
            rows_affected,
            last_insert_id,
        });
    }

    pub fn fail_next(&self, message: &str) {
        self.state().fail_next = Some(message.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }
}

#[derive(Debug)]
pub(crate) struct FakeConn {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConn {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, sql: &str, params: &[Value]) -> DbResult<()> {
        let mut state = self.state();
        state.executed.push(sql.to_string());
        state.params.push(params.to_vec());
        match state.fail_next.take() {
            Some(message) => Err(DbError::backend(message)),
            None => Ok(()),
        }
    }
}

impl Driver for FakeDriver {
    type Conn = FakeConn;

    async fn connect(&self, _options: &ConnectOptions) -> DbResult<FakeConn> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(DbError::connection("connection refused"));
        }
        state.connects += 1;
        Ok(FakeConn {
            state: Arc::clone(&self.state),
        })
    }
}

impl DriverConnection for FakeConn {
    async fn ping(&mut self) -> DbResult<()> {
        let mut state = self.state();
        state.pings += 1;
        if state.fail_ping {
            return Err(DbError::connection("server has gone away"));
        }
        Ok(())
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        if sql.starts_with("SHOW VARIABLES") {
            let mut state = self.state();
            state.timeout_lookups += 1;
            return Ok(state
                .wait_timeout
                .iter()
                .map(|v| {
                    let mut r = Record::new();
                    r.insert("Variable_name", "wait_timeout");
                    r.insert("Value", v.as_str());
                    r
                })
                .collect());
        }
        self.pause().await;
        self.record(sql, params)?;
        Ok(self.state().rows.pop_front().unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        self.pause().await;
        self.record(sql, params)?;
        Ok(self.state().exec_results.pop_front().unwrap_or_default())
    }

    async fn close(self) -> DbResult<()> {
        self.state().closes += 1;
        Ok(())
    }
}
