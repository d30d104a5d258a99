//! Connection string parsing.
//!
//! Accepted form:
//!
//! ```text
//! [user[:password]@][tcp(host[:port]) | unix(/path/to.sock) | host[:port]]/database[?opt=value&...]
//! ```
//!
//! The password may contain `@` and `/`: the last `/` starts the database name
//! and the last `@` before it ends the credentials. An empty address means
//! `127.0.0.1:3306`. An optional `mysql://` prefix is accepted.

use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Socket(PathBuf),
}

impl Default for Address {
    fn default() -> Self {
        Address::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Parsed connection string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectOptions {
    pub user: Option<String>,
    pub password: Option<String>,
    pub address: Address,
    pub database: String,
    pub charset: Option<String>,
    pub collation: Option<String>,
    /// TLS mode (`disabled`, `preferred`, `required`, `verify_ca`, `verify_identity`).
    pub tls: Option<String>,
    /// Connect deadline from `?timeout=`.
    pub connect_timeout: Option<Duration>,
    /// Options not understood by the crate, kept for drivers that want them.
    pub extra: BTreeMap<String, String>,
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("address", &self.address)
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("collation", &self.collation)
            .field("tls", &self.tls)
            .field("connect_timeout", &self.connect_timeout)
            .field("extra", &self.extra)
            .finish()
    }
}

impl ConnectOptions {
    /// Parse a connection string.
    pub fn parse(dsn: &str) -> DbResult<Self> {
        let dsn = dsn.trim();
        let dsn = dsn.strip_prefix("mysql://").unwrap_or(dsn);

        let slash = dsn
            .rfind('/')
            .ok_or_else(|| DbError::connection("connection string is missing '/database'"))?;
        let (prefix, rest) = (&dsn[..slash], &dsn[slash + 1..]);

        let mut opts = ConnectOptions::default();

        let (database, query) = match rest.split_once('?') {
            Some((db, q)) => (db, Some(q)),
            None => (rest, None),
        };
        opts.database = database.to_string();

        let address = match prefix.rfind('@') {
            Some(at) => {
                let creds = &prefix[..at];
                match creds.split_once(':') {
                    Some((user, pass)) => {
                        opts.user = non_empty(user);
                        opts.password = Some(pass.to_string());
                    }
                    None => opts.user = non_empty(creds),
                }
                &prefix[at + 1..]
            }
            None => prefix,
        };
        opts.address = parse_address(address)?;

        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                opts.apply_option(&key, &value)?;
            }
        }

        Ok(opts)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> DbResult<()> {
        match key {
            "charset" => {
                // MySQL-style lists ("utf8mb4,utf8") pick the first entry.
                self.charset = value.split(',').next().and_then(non_empty);
            }
            "collation" => self.collation = non_empty(value),
            "tls" | "ssl-mode" | "ssl_mode" => self.tls = Some(normalize_tls(value)?),
            "timeout" | "connect_timeout" => self.connect_timeout = Some(parse_duration(value)?),
            other => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "fluentdb.dsn", option = other, "ignoring unknown connection option");
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_address(addr: &str) -> DbResult<Address> {
    if addr.is_empty() {
        return Ok(Address::default());
    }
    if let Some(inner) = addr.strip_prefix("unix(").and_then(|a| a.strip_suffix(')')) {
        if inner.is_empty() {
            return Err(DbError::connection("empty unix socket path"));
        }
        return Ok(Address::Socket(PathBuf::from(inner)));
    }
    let hostport = addr
        .strip_prefix("tcp(")
        .and_then(|a| a.strip_suffix(')'))
        .unwrap_or(addr);
    if hostport.contains('(') || hostport.contains(')') {
        return Err(DbError::connection(format!("unsupported address '{addr}'")));
    }
    parse_host_port(hostport)
}

fn parse_host_port(s: &str) -> DbResult<Address> {
    if s.is_empty() {
        return Ok(Address::default());
    }

    // [ipv6]:port
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| DbError::connection(format!("unclosed '[' in address '{s}'")))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(p)?,
            None if tail.is_empty() => DEFAULT_PORT,
            None => return Err(DbError::connection(format!("invalid address '{s}'"))),
        };
        return Ok(Address::Tcp {
            host: host.to_string(),
            port,
        });
    }

    let (host, port) = match s.rsplit_once(':') {
        Some((h, p)) => (h, parse_port(p)?),
        None => (s, DEFAULT_PORT),
    };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    Ok(Address::Tcp {
        host: host.to_string(),
        port,
    })
}

fn parse_port(p: &str) -> DbResult<u16> {
    p.parse::<u16>()
        .map_err(|_| DbError::connection(format!("invalid port '{p}'")))
}

fn normalize_tls(value: &str) -> DbResult<String> {
    let mode = match value.to_ascii_lowercase().replace('-', "_").as_str() {
        "false" | "disabled" | "disable" => "disabled",
        "preferred" | "prefer" | "skip_verify" => "preferred",
        "true" | "required" | "require" => "required",
        "verify_ca" => "verify_ca",
        "verify_identity" | "verify_full" => "verify_identity",
        _ => return Err(DbError::connection(format!("unsupported tls mode '{value}'"))),
    };
    Ok(mode.to_string())
}

/// Parse durations like `5s`, `500ms`, `1m30s`, or a bare number of seconds.
pub(crate) fn parse_duration(s: &str) -> DbResult<Duration> {
    let s = s.trim();
    let invalid = || DbError::connection(format!("invalid duration '{s}'"));
    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let amount: f64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit_secs = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return Err(invalid()),
        };
        let step = Duration::try_from_secs_f64(amount * unit_secs).map_err(|_| invalid())?;
        total = total.checked_add(step).ok_or_else(invalid)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}
