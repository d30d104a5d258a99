//! Nested transaction scopes on a single connection.
//!
//! The outermost scope is a real transaction (`BEGIN` / `COMMIT` /
//! `ROLLBACK`); every scope opened inside it is a savepoint named after its
//! depth. The stack only does bookkeeping and SQL generation: the executor
//! runs the statements and pops a scope once they all succeeded, so a failed
//! `COMMIT` leaves the scope current.

use crate::error::{DbError, DbResult};

const SAVEPOINT_PREFIX: &str = "fluentdb_sp_";

/// One open transaction scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    depth: usize,
    savepoint: Option<String>,
}

impl Scope {
    fn at_depth(depth: usize) -> Self {
        let savepoint = (depth > 1).then(|| format!("{SAVEPOINT_PREFIX}{depth}"));
        Self { depth, savepoint }
    }

    /// 1 for the outermost scope.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Savepoint backing this scope; `None` for the outermost transaction.
    pub fn savepoint(&self) -> Option<&str> {
        self.savepoint.as_deref()
    }

    pub fn is_outermost(&self) -> bool {
        self.savepoint.is_none()
    }

    fn begin_sql(&self) -> String {
        match &self.savepoint {
            None => "BEGIN".to_string(),
            Some(name) => format!("SAVEPOINT {name}"),
        }
    }

    fn commit_sql(&self) -> Vec<String> {
        match &self.savepoint {
            None => vec!["COMMIT".to_string()],
            Some(name) => vec![format!("RELEASE SAVEPOINT {name}")],
        }
    }

    fn rollback_sql(&self) -> Vec<String> {
        match &self.savepoint {
            None => vec!["ROLLBACK".to_string()],
            Some(name) => vec![
                format!("ROLLBACK TO SAVEPOINT {name}"),
                format!("RELEASE SAVEPOINT {name}"),
            ],
        }
    }
}

/// Ordered stack of open scopes; the last one is current.
#[derive(Debug, Default)]
pub struct TransactionStack {
    scopes: Vec<Scope>,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// The scope statements currently run in.
    pub fn current(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// The scope `begin` would open, with the statement that opens it.
    pub(crate) fn prepare_begin(&self) -> (Scope, String) {
        let scope = Scope::at_depth(self.scopes.len() + 1);
        let sql = scope.begin_sql();
        (scope, sql)
    }

    pub(crate) fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Statements that commit the current scope.
    pub(crate) fn prepare_commit(&self) -> DbResult<Vec<String>> {
        self.current()
            .map(Scope::commit_sql)
            .ok_or_else(DbError::no_transaction)
    }

    /// Statements that roll back the current scope.
    pub(crate) fn prepare_rollback(&self) -> DbResult<Vec<String>> {
        self.current()
            .map(Scope::rollback_sql)
            .ok_or_else(DbError::no_transaction)
    }

    pub(crate) fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// Drop every scope, returning how many were open.
    pub(crate) fn clear(&mut self) -> usize {
        let depth = self.scopes.len();
        self.scopes.clear();
        depth
    }
}
