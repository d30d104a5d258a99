//! The clause accumulator a handle carries between chained calls.

use crate::condition::Condition;
use crate::table::{Order, TableRef};

/// Default field selection.
pub const DEFAULT_FIELDS: &str = "*";

/// Clauses collected by chained builder calls, consumed by one terminal call.
///
/// Bound parameters are not stored here: the renderer produces them alongside
/// the SQL text, in placeholder order, from the conditions and values below.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub fields: String,
    pub tables: Vec<TableRef>,
    pub wheres: Vec<Condition>,
    pub havings: Vec<Condition>,
    pub orders: Vec<Order>,
    pub groups: Vec<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub rollup: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS.to_string(),
            tables: Vec::new(),
            wheres: Vec::new(),
            havings: Vec::new(),
            orders: Vec::new(),
            groups: Vec::new(),
            limit: None,
            offset: None,
            rollup: false,
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every clause to its zero state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Move the accumulated clauses out, leaving a cleared state behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Direction;

    #[test]
    fn clear_resets_everything() {
        let mut state = QueryState::new();
        state.fields = "id".to_string();
        state.tables.push(TableRef::root("user", None));
        state.wheres.push(Condition::compare("id", "=", 1));
        state.havings.push(Condition::raw("COUNT(*) > 1"));
        state.orders.push(Order::new("id", Some(Direction::Desc)));
        state.groups.push(Order::new("class_id", None));
        state.limit = Some(5);
        state.offset = Some(10);
        state.rollup = true;
        assert!(!state.is_empty());

        state.clear();
        assert!(state.is_empty());
        assert_eq!(state.fields, "*");
    }

    #[test]
    fn take_leaves_cleared_state() {
        let mut state = QueryState::new();
        state.limit = Some(1);
        let taken = state.take();
        assert_eq!(taken.limit, Some(1));
        assert!(state.is_empty());
    }
}
