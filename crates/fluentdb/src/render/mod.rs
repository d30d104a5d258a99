//! SQL rendering: [`QueryState`] + action → SQL text with `?` placeholders.
//!
//! Every function here is pure. Parameters are pushed in exactly the order
//! their placeholders are written, so `Statement::params` always lines up with
//! the `?` markers in `Statement::sql`.
//!
//! Clause order is fixed regardless of the order the builder was called in:
//!
//! ```text
//! SELECT fields FROM tables/joins
//!   WHERE … GROUP BY … [WITH ROLLUP] HAVING … ORDER BY … LIMIT … OFFSET …
//! ```

use crate::condition::{Condition, Predicate, normalize_operator};
use crate::error::{DbError, DbResult};
use crate::quote::{interpolate, quote_field, quote_ident};
use crate::state::QueryState;
use crate::table::Order;
use crate::value::Value;
use std::collections::HashMap;

#[cfg(test)]
mod tests;

/// Largest LIMIT MySQL accepts; used when only an OFFSET was given.
const MAX_LIMIT: u64 = u64::MAX;

/// A rendered statement: SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// A statement with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A statement with caller-provided parameters for its `?` markers.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    fn push_bind(&mut self, value: Value) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    /// Number of placeholders outside quoted text.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// Fail unless every `?` marker has exactly one parameter.
    pub fn check_arity(&self) -> DbResult<()> {
        let markers = self.placeholder_count();
        if markers != self.params.len() {
            return Err(DbError::render(format!(
                "statement has {markers} placeholder(s) but {} parameter(s)",
                self.params.len()
            )));
        }
        Ok(())
    }

    /// SQL text with parameters substituted (diagnostics only).
    pub fn to_debug_sql(&self) -> String {
        interpolate(&self.sql, &self.params)
    }
}

fn count_placeholders(sql: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut count = 0;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q != '`' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}

/// One row for [`insert`]: field name → value.
pub type InsertRow = HashMap<String, Value>;

// ==================== Clause writers ====================

fn write_tables(stmt: &mut Statement, state: &QueryState) -> DbResult<()> {
    if state.tables.is_empty() {
        return Err(DbError::render("no table given; call from() first"));
    }

    let mut roots = 0;
    for table in &state.tables {
        let mut rendered = quote_ident(&table.name)?;
        if let Some(alias) = table.alias.as_deref().filter(|a| !a.trim().is_empty()) {
            rendered.push(' ');
            rendered.push_str(&quote_ident(alias)?);
        }

        if table.is_join() {
            if roots == 0 {
                return Err(DbError::render(format!(
                    "join on '{}' has no table to join to",
                    table.name
                )));
            }
            stmt.push(" ")
                .push(table.join_type.as_sql())
                .push(" ")
                .push(&rendered)
                .push(" ON ")
                .push(table.join_predicate.trim());
        } else {
            if roots > 0 {
                stmt.push(", ");
            }
            stmt.push(&rendered);
            roots += 1;
        }
    }
    Ok(())
}

fn write_conditions(stmt: &mut Statement, keyword: &str, conditions: &[Condition]) -> DbResult<()> {
    if conditions.is_empty() {
        return Ok(());
    }
    stmt.push(" ").push(keyword);
    for (i, cond) in conditions.iter().enumerate() {
        if i > 0 {
            stmt.push(" ").push(cond.connector.as_sql());
        }
        match &cond.predicate {
            Predicate::Compare {
                field,
                operator,
                value,
            } => {
                let field = quote_field(field)?;
                let op = normalize_operator(operator)?;
                stmt.push(" ")
                    .push(&field)
                    .push(" ")
                    .push(op)
                    .push(" ")
                    .push_bind(value.clone());
            }
            Predicate::Raw(sql) => {
                stmt.push(" ").push(sql.trim());
            }
        }
    }
    Ok(())
}

fn write_keys(stmt: &mut Statement, keyword: &str, keys: &[Order]) -> DbResult<()> {
    if keys.is_empty() {
        return Ok(());
    }
    stmt.push(" ").push(keyword).push(" ");
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push(&quote_field(&key.field)?);
        if let Some(dir) = key.direction {
            stmt.push(" ").push(dir.as_sql());
        }
    }
    Ok(())
}

fn write_group(stmt: &mut Statement, state: &QueryState) -> DbResult<()> {
    write_keys(stmt, "GROUP BY", &state.groups)?;
    if state.rollup && !state.groups.is_empty() {
        stmt.push(" WITH ROLLUP");
    }
    Ok(())
}

fn write_limit_offset(stmt: &mut Statement, state: &QueryState) {
    let limit = state.limit.filter(|l| *l > 0);
    let offset = state.offset.filter(|o| *o > 0);
    match (limit, offset) {
        (Some(l), _) => {
            stmt.push(&format!(" LIMIT {l}"));
        }
        (None, Some(_)) => {
            stmt.push(&format!(" LIMIT {MAX_LIMIT}"));
        }
        (None, None) => {}
    }
    if let Some(o) = offset {
        stmt.push(&format!(" OFFSET {o}"));
    }
}

fn fields_or_default(state: &QueryState) -> &str {
    let fields = state.fields.trim();
    if fields.is_empty() { "*" } else { fields }
}

// ==================== Statements ====================

/// `SELECT` with every clause.
pub fn select(state: &QueryState) -> DbResult<Statement> {
    let mut stmt = Statement::default();
    stmt.push("SELECT ").push(fields_or_default(state)).push(" FROM ");
    write_tables(&mut stmt, state)?;
    write_conditions(&mut stmt, "WHERE", &state.wheres)?;
    write_group(&mut stmt, state)?;
    write_conditions(&mut stmt, "HAVING", &state.havings)?;
    write_keys(&mut stmt, "ORDER BY", &state.orders)?;
    write_limit_offset(&mut stmt, state);
    Ok(stmt)
}

/// `SELECT COUNT(field)` over the tables, WHERE and HAVING of the state.
///
/// GROUP BY, ORDER BY, LIMIT and OFFSET are ignored: the result is always one row.
pub fn count(state: &QueryState, field: Option<&str>) -> DbResult<Statement> {
    let target = match field.map(str::trim) {
        None | Some("") | Some("*") => "*".to_string(),
        Some(f) => quote_field(f)?,
    };
    let mut stmt = Statement::default();
    stmt.push("SELECT COUNT(").push(&target).push(") FROM ");
    write_tables(&mut stmt, state)?;
    write_conditions(&mut stmt, "WHERE", &state.wheres)?;
    write_conditions(&mut stmt, "HAVING", &state.havings)?;
    Ok(stmt)
}

fn insert_target(state: &QueryState) -> DbResult<String> {
    let table = state
        .tables
        .iter()
        .find(|t| !t.is_join())
        .ok_or_else(|| DbError::render("no table given; call from() first"))?;
    quote_ident(&table.name)
}

/// Multi-row `INSERT ... VALUES`.
///
/// A field missing from a row (or explicitly `Value::Null`) renders `NULL`
/// and binds nothing; present fields bind in `fields` order, row by row.
pub fn insert<S: AsRef<str>>(state: &QueryState, fields: &[S], rows: &[InsertRow]) -> DbResult<Statement> {
    if fields.is_empty() {
        return Err(DbError::render("insert requires at least one field"));
    }
    if rows.is_empty() {
        return Err(DbError::render("insert requires at least one row"));
    }

    let mut stmt = Statement::default();
    stmt.push("INSERT INTO ").push(&insert_target(state)?).push(" (");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push(&quote_ident(field.as_ref())?);
    }
    stmt.push(") VALUES ");

    for (r, row) in rows.iter().enumerate() {
        if r > 0 {
            stmt.push(", ");
        }
        stmt.push("(");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                stmt.push(", ");
            }
            match row.get(field.as_ref()) {
                Some(value) if !value.is_null() => {
                    stmt.push_bind(value.clone());
                }
                _ => {
                    stmt.push("NULL");
                }
            }
        }
        stmt.push(")");
    }
    Ok(stmt)
}

/// `INSERT INTO table <select_sql>`; the select text is caller-provided.
pub fn insert_select(state: &QueryState, select_sql: &str) -> DbResult<Statement> {
    let select_sql = select_sql.trim();
    if select_sql.is_empty() {
        return Err(DbError::render("insert_select requires a SELECT statement"));
    }
    let mut stmt = Statement::default();
    stmt.push("INSERT INTO ")
        .push(&insert_target(state)?)
        .push(" ")
        .push(select_sql);
    Ok(stmt)
}

/// `UPDATE tables SET ... [WHERE] [ORDER BY] [LIMIT]`.
///
/// SET values are bound before WHERE values.
pub fn update(state: &QueryState, assignments: &[(String, Value)]) -> DbResult<Statement> {
    if assignments.is_empty() {
        return Err(DbError::render("update requires at least one SET assignment"));
    }

    let mut stmt = Statement::default();
    stmt.push("UPDATE ");
    write_tables(&mut stmt, state)?;
    stmt.push(" SET ");
    for (i, (field, value)) in assignments.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push(&quote_ident(field)?).push(" = ").push_bind(value.clone());
    }
    write_conditions(&mut stmt, "WHERE", &state.wheres)?;
    write_keys(&mut stmt, "ORDER BY", &state.orders)?;
    if let Some(l) = state.limit.filter(|l| *l > 0) {
        stmt.push(&format!(" LIMIT {l}"));
    }
    Ok(stmt)
}

/// `DELETE FROM tables [WHERE]`.
pub fn delete(state: &QueryState) -> DbResult<Statement> {
    let mut stmt = Statement::default();
    stmt.push("DELETE FROM ");
    write_tables(&mut stmt, state)?;
    write_conditions(&mut stmt, "WHERE", &state.wheres)?;
    Ok(stmt)
}
