//! MySQL driver backed by `sqlx`.
//!
//! Statements without parameters go over the text protocol; statements with
//! parameters are prepared and bound. Either way every column is rendered to
//! text by its declared type, so callers see the same string for `42` whether
//! it arrived as text or as a binary integer.

use super::{Driver, DriverConnection, ExecResult};
use crate::dsn::{Address, ConnectOptions};
use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode,
};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};

/// Opens [`MySqlConn`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

/// A single `sqlx` MySQL connection.
pub struct MySqlConn {
    inner: MySqlConnection,
}

impl std::fmt::Debug for MySqlConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConn").finish_non_exhaustive()
    }
}

pub(crate) fn sqlx_options(options: &ConnectOptions) -> DbResult<MySqlConnectOptions> {
    let mut opts = MySqlConnectOptions::new();
    opts = match &options.address {
        Address::Tcp { host, port } => opts.host(host).port(*port),
        Address::Socket(path) => opts.socket(path),
    };
    if !options.database.is_empty() {
        opts = opts.database(&options.database);
    }
    if let Some(user) = &options.user {
        opts = opts.username(user);
    }
    if let Some(password) = &options.password {
        opts = opts.password(password);
    }
    if let Some(charset) = &options.charset {
        opts = opts.charset(charset);
    }
    if let Some(collation) = &options.collation {
        opts = opts.collation(collation);
    }
    if let Some(tls) = &options.tls {
        let mode: MySqlSslMode = tls
            .parse()
            .map_err(|e: sqlx::Error| DbError::connection(e.to_string()))?;
        opts = opts.ssl_mode(mode);
    }
    Ok(opts)
}

impl Driver for MySqlDriver {
    type Conn = MySqlConn;

    async fn connect(&self, options: &ConnectOptions) -> DbResult<MySqlConn> {
        let opts = sqlx_options(options)?;
        let inner = MySqlConnection::connect_with(&opts)
            .await
            .map_err(|e| DbError::connection(e.to_string()))?;
        Ok(MySqlConn { inner })
    }
}

impl DriverConnection for MySqlConn {
    async fn ping(&mut self) -> DbResult<()> {
        self.inner
            .ping()
            .await
            .map_err(|e| DbError::connection(e.to_string()))
    }

    async fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        let rows = if params.is_empty() {
            Executor::fetch_all(&mut self.inner, sql).await?
        } else {
            bind_all(sqlx::query(sql), params)
                .fetch_all(&mut self.inner)
                .await?
        };
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<ExecResult> {
        let done = if params.is_empty() {
            Executor::execute(&mut self.inner, sql).await?
        } else {
            bind_all(sqlx::query(sql), params)
                .execute(&mut self.inner)
                .await?
        };
        Ok(ExecResult {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn close(self) -> DbResult<()> {
        self.inner.close().await.map_err(DbError::from)
    }
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = bind_value(query, value);
    }
    query
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::UInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
        Value::DateTime(v) => query.bind(*v),
        Value::Date(v) => query.bind(*v),
        Value::Time(v) => query.bind(*v),
        Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
    }
}

fn decode_row(row: &MySqlRow) -> DbResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        if row.try_get_raw(idx)?.is_null() {
            continue;
        }
        let text = decode_text(row, idx, column.type_info().name())
            .map_err(|e| DbError::decode(column.name(), e.to_string()))?;
        record.insert(column.name(), text);
    }
    Ok(record)
}

fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> Result<String, sqlx::Error> {
    let typed = match type_name {
        name if name.ends_with("UNSIGNED") => {
            row.try_get_unchecked::<u64, _>(idx).map(|v| v.to_string())
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(idx).map(|v| v.to_string())
        }
        "FLOAT" => row.try_get_unchecked::<f32, _>(idx).map(|v| v.to_string()),
        "DOUBLE" => row.try_get_unchecked::<f64, _>(idx).map(|v| v.to_string()),
        "DATE" => row.try_get_unchecked::<NaiveDate, _>(idx).map(format_date),
        "DATETIME" | "TIMESTAMP" => row
            .try_get_unchecked::<NaiveDateTime, _>(idx)
            .map(format_datetime),
        "TIME" => row.try_get_unchecked::<NaiveTime, _>(idx).map(format_time),
        "BIT" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|bytes| bits_to_u64(&bytes).to_string()),
        _ => return bytes_as_text(row, idx),
    };
    // Zero dates and out-of-range TIME values do not fit chrono; fall back to
    // the server's own text.
    typed.or_else(|_| bytes_as_text(row, idx))
}

fn bytes_as_text(row: &MySqlRow, idx: usize) -> Result<String, sqlx::Error> {
    row.try_get_unchecked::<Vec<u8>, _>(idx)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

pub(crate) fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

pub(crate) fn format_time(t: NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

pub(crate) fn bits_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_text_drops_zero_fraction() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(format_datetime(dt), "2024-01-02 03:04:05");

        let dt = dt.with_nanosecond(120_000_000).unwrap();
        assert_eq!(format_datetime(dt), "2024-01-02 03:04:05.120000");
    }

    #[test]
    fn time_and_date_text() {
        assert_eq!(
            format_date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
            "1999-12-31"
        );
        assert_eq!(
            format_time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()),
            "23:59:01"
        );
    }

    #[test]
    fn bit_bytes_are_big_endian() {
        assert_eq!(bits_to_u64(&[0x01]), 1);
        assert_eq!(bits_to_u64(&[0x01, 0x00]), 256);
        assert_eq!(bits_to_u64(&[]), 0);
    }

    #[test]
    fn every_tls_mode_is_understood_by_sqlx() {
        for mode in ["disabled", "preferred", "required", "verify_ca", "verify_identity"] {
            let dsn = format!("u:p@tcp(db:3307)/app?charset=utf8mb4&tls={mode}");
            let opts = ConnectOptions::parse(&dsn).unwrap();
            assert!(sqlx_options(&opts).is_ok(), "{mode}");
        }
    }
}
