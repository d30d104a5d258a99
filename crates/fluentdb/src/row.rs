//! Generic result rows.

use crate::error::{DbError, DbResult};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::str::FromStr;

/// One result row: column name → textual value, in result-set column order.
///
/// SQL NULL columns are absent, so "missing" and "present but empty" stay
/// distinguishable: `get("x") == None` vs `get("x") == Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    columns: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value under the same name in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Parse a column into `T`; `Ok(None)` if the column is NULL/absent.
    pub fn get_parsed<T>(&self, column: &str) -> DbResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(column) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| DbError::decode(column, e.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (c, v) in iter {
            record.insert(c, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (c, v) in &self.columns {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_column_order() {
        let mut r = Record::new();
        r.insert("b", "2");
        r.insert("a", "1");
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn null_vs_empty() {
        let mut r = Record::new();
        r.insert("nick", "");
        assert_eq!(r.get("nick"), Some(""));
        assert_eq!(r.get("email"), None);
        assert!(!r.contains("email"));
    }

    #[test]
    fn duplicate_column_replaces_in_place() {
        let r: Record = vec![
            ("id".to_string(), "1".to_string()),
            ("name".to_string(), "a".to_string()),
            ("id".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(r.len(), 2);
        assert_eq!(r.iter().next(), Some(("id", "2")));
    }

    #[test]
    fn parsed_access() {
        let mut r = Record::new();
        r.insert("age", "18");
        r.insert("bad", "x");
        assert_eq!(r.get_parsed::<i64>("age").unwrap(), Some(18));
        assert_eq!(r.get_parsed::<i64>("missing").unwrap(), None);
        assert!(r.get_parsed::<i64>("bad").is_err());
    }

    #[test]
    fn serializes_as_ordered_map() {
        let mut r = Record::new();
        r.insert("z", "1");
        r.insert("a", "2");
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"z":"1","a":"2"}"#);
    }
}
