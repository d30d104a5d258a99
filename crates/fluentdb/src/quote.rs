//! Identifier quoting and value escaping.
//!
//! Every piece of caller text that ends up in rendered SQL as an identifier
//! passes through [`quote_ident`] or [`quote_field`]; every value that ends up
//! in diagnostic SQL passes through [`quote_value`]. Values sent to the server
//! are always bound, never escaped.
//!
//! - Unquoted segments are wrapped in backticks: `u.age` → `` `u`.`age` ``
//! - Already back-ticked segments are kept (with `` `` `` escapes intact)
//! - A `*` segment stays bare: `u.*` → `` `u`.* ``
//! - Aggregates keep the function name bare: `SUM(u.score)` → `` SUM(`u`.`score`) ``
//!
//! # Example
//! ```ignore
//! use fluentdb::quote::quote_field;
//!
//! assert_eq!(quote_field("COUNT(id)")?, "COUNT(`id`)");
//! # Ok::<(), fluentdb::DbError>(())
//! ```

use crate::error::{DbError, DbResult};
use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

/// Quote a (possibly dotted) identifier.
pub fn quote_ident(ident: &str) -> DbResult<String> {
    let ident = ident.trim();
    if ident.is_empty() {
        return Err(DbError::render("identifier cannot be empty"));
    }
    if ident.contains('\0') {
        return Err(DbError::render("identifier cannot contain NUL character"));
    }

    let mut out = String::with_capacity(ident.len() + 4);
    let mut chars = ident.chars().peekable();
    let mut first = true;

    while first || chars.peek().is_some() {
        if !first {
            // Separator between segments.
            match chars.next() {
                Some('.') if chars.peek().is_some() => out.push('.'),
                Some('.') => {
                    return Err(DbError::render(format!("trailing '.' in identifier '{ident}'")));
                }
                Some(c) => {
                    return Err(DbError::render(format!(
                        "expected '.' between identifier parts in '{ident}', got '{c}'"
                    )));
                }
                None => break,
            }
        }
        first = false;

        if chars.peek() == Some(&'`') {
            chars.next();
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('`') if chars.peek() == Some(&'`') => {
                        chars.next();
                        name.push_str("``");
                    }
                    Some('`') => break,
                    Some(c) => name.push(c),
                    None => {
                        return Err(DbError::render(format!(
                            "unclosed quoted identifier '{ident}'"
                        )));
                    }
                }
            }
            if name.is_empty() {
                return Err(DbError::render(format!("empty quoted identifier in '{ident}'")));
            }
            out.push('`');
            out.push_str(&name);
            out.push('`');
            continue;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '.' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return Err(DbError::render(format!("empty identifier segment in '{ident}'")));
        }
        if name == "*" {
            out.push('*');
        } else {
            out.push('`');
            out.push_str(&name.replace('`', "``"));
            out.push('`');
        }
    }

    Ok(out)
}

fn aggregate_re() -> &'static Regex {
    static AGGREGATE_RE: OnceLock<Regex> = OnceLock::new();
    AGGREGATE_RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(\s*([^()]+?)\s*\)$")
            .expect("invalid built-in aggregate regex")
    })
}

/// Quote a field reference, recognising `name(arg)` aggregate expressions.
///
/// A field containing parentheses that does not have the `name(arg)` shape is
/// rejected rather than passed through.
pub fn quote_field(field: &str) -> DbResult<String> {
    let field = field.trim();
    if !field.contains('(') && !field.contains(')') {
        return quote_ident(field);
    }

    let caps = aggregate_re()
        .captures(field)
        .ok_or_else(|| DbError::render(format!("malformed aggregate field '{field}'")))?;
    let func = &caps[1];
    let arg = &caps[2];
    let arg = if arg == "*" { "*".to_string() } else { quote_ident(arg)? };
    Ok(format!("{func}({arg})"))
}

/// Escape a string for use inside a single-quoted MySQL literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for ch in s.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

/// Render a value as a quoted SQL literal (diagnostics only).
pub fn quote_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => format!("'{}'", u8::from(*b)),
        Value::Int(v) => format!("'{v}'"),
        Value::UInt(v) => format!("'{v}'"),
        Value::Float(v) => format!("'{v}'"),
        Value::Text(s) => format!("'{}'", escape_string(s)),
        Value::Bytes(b) => format!("'{}'", escape_string(&String::from_utf8_lossy(b))),
        Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        Value::Json(j) => format!("'{}'", escape_string(&j.to_string())),
    }
}

/// Substitute bound values into `?` placeholders for logging.
///
/// `?` characters inside quoted literals or identifiers are left alone. Extra
/// placeholders (more `?` than values) are kept as `?`.
pub fn interpolate(sql: &str, params: &[Value]) -> String {
    if params.is_empty() {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut values = params.iter();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' && q != '`' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => match values.next() {
                    Some(v) => out.push_str(&quote_value(v)),
                    None => out.push('?'),
                },
                c => out.push(c),
            },
        }
    }
    out
}
