//! FROM / JOIN sources and ORDER BY / GROUP BY keys.

/// Kind of JOIN emitted for a [`TableRef`] with a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    /// Plain `JOIN` (inner join in MySQL).
    #[default]
    Plain,
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinType::Plain => "JOIN",
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// One table in the FROM list.
///
/// An empty `join_predicate` marks a root source; anything else is a JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub join_predicate: String,
    pub join_type: JoinType,
}

impl TableRef {
    pub fn root(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
            join_predicate: String::new(),
            join_type: JoinType::Plain,
        }
    }

    pub fn join(
        name: impl Into<String>,
        alias: Option<String>,
        predicate: impl Into<String>,
        join_type: JoinType,
    ) -> Self {
        Self {
            name: name.into(),
            alias,
            join_predicate: predicate.into(),
            join_type,
        }
    }

    pub fn is_join(&self) -> bool {
        !self.join_predicate.trim().is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY or GROUP BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Option<Direction>,
}

impl Order {
    pub fn new(field: impl Into<String>, direction: Option<Direction>) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}
