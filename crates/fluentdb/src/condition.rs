//! WHERE / HAVING predicates.
//!
//! A [`Condition`] is either a structured comparison (`field op ?`, value bound
//! as a parameter) or a raw SQL fragment emitted verbatim. Raw fragments bind
//! nothing: whoever builds them owns their injection safety.

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// How a condition is joined to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// The body of a [`Condition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field operator ?`
    Compare {
        field: String,
        operator: String,
        value: Value,
    },
    /// Raw SQL emitted as-is.
    Raw(String),
}

/// One WHERE or HAVING predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub predicate: Predicate,
    pub connector: Connector,
}

impl Condition {
    /// A bound comparison joined with AND.
    pub fn compare(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            predicate: Predicate::Compare {
                field: field.into(),
                operator: operator.into(),
                value: value.into(),
            },
            connector: Connector::And,
        }
    }

    /// A raw predicate joined with AND.
    ///
    /// # Safety
    /// The text is not escaped. Never build it from untrusted input.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            predicate: Predicate::Raw(sql.into()),
            connector: Connector::And,
        }
    }

    /// Join this condition with OR instead of AND.
    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }

    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.predicate, Predicate::Raw(_))
    }
}

const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "<=>", "LIKE", "NOT LIKE", "REGEXP", "NOT REGEXP",
    "RLIKE",
];

/// Normalize a comparison operator, rejecting anything outside the supported set.
pub(crate) fn normalize_operator(op: &str) -> DbResult<&'static str> {
    let upper = op.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    OPERATORS
        .iter()
        .copied()
        .find(|known| *known == upper)
        .ok_or_else(|| DbError::render(format!("unsupported comparison operator '{op}'")))
}
