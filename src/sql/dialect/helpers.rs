//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects compose to
//! implement `SqlDialect` with minimal duplication. A dialect that is a delta
//! over another (Redshift and CockroachDB over Postgres) calls the same
//! helpers for everything it does not change.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::strategy::{CreateOrReplace, PlaceholderStyle, ViewColumnRename, ViewSupport};
use crate::sql::value::Value;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Generic, Postgres, Redshift, CockroachDB, Oracle
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL, SQLite
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: SQL Server
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// Aliases
// =============================================================================

/// `expr as alias`.
pub fn alias_as(expr: &str, alias: &str) -> String {
    format!("{} as {}", expr, alias)
}

/// `expr alias` (Oracle rejects `as` for table aliases).
pub fn alias_space(expr: &str, alias: &str) -> String {
    format!("{} {}", expr, alias)
}

// =============================================================================
// Bindings
// =============================================================================

/// Booleans bound as `1`/`0`.
/// Used by: Oracle
pub fn bool_as_number(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Int(i64::from(*b)),
        other => other.clone(),
    }
}

/// Rewrite `?` markers for the driver, turning escaped `\?` into a literal `?`.
///
/// A `?` is escaped only behind an odd run of backslashes, so `\\?` is an
/// escaped backslash followed by a real marker.
pub fn position_placeholders(sql: &str, style: PlaceholderStyle) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut index = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let run = 1 + backslash_run(&mut chars);
                if run % 2 == 1 && chars.peek() == Some(&'?') {
                    chars.next();
                    out.extend(std::iter::repeat('\\').take(run - 1));
                    out.push('?');
                } else {
                    out.extend(std::iter::repeat('\\').take(run));
                }
            }
            '?' => {
                match style {
                    PlaceholderStyle::Question => out.push('?'),
                    PlaceholderStyle::Dollar => {
                        out.push('$');
                        out.push_str(&(index + 1).to_string());
                    }
                    PlaceholderStyle::AtP => {
                        out.push_str("@p");
                        out.push_str(&index.to_string());
                    }
                    PlaceholderStyle::Colon => {
                        out.push(':');
                        out.push_str(&(index + 1).to_string());
                    }
                }
                index += 1;
            }
            _ => out.push(c),
        }
    }

    out
}

/// Count unescaped `?` markers.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let run = 1 + backslash_run(&mut chars);
                if run % 2 == 1 && chars.peek() == Some(&'?') {
                    chars.next();
                }
            }
            '?' => count += 1,
            _ => {}
        }
    }
    count
}

/// Consume the backslashes that follow, returning how many there were.
pub(crate) fn backslash_run(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> usize {
    let mut run = 0;
    while chars.next_if_eq(&'\\').is_some() {
        run += 1;
    }
    run
}

// =============================================================================
// JSON paths
// =============================================================================

static BRACKET_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([0-9]+)\]").unwrap());

/// Split a `$.a.b[0]` path into segments for array-path functions.
pub fn json_path_segments(path: &str, brackets_to_dots: bool) -> Vec<String> {
    let trimmed = path.strip_prefix("$.").unwrap_or(path);
    let normalized = if brackets_to_dots {
        BRACKET_INDEX.replace_all(trimmed, ".$1").into_owned()
    } else {
        trimmed.to_string()
    };
    normalized.split('.').map(str::to_string).collect()
}

/// Cast applied to an extracted JSON value before comparing it.
pub fn json_cast_for(value: &Value) -> &'static str {
    let numeric = match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(n) if n != 0.0 && n.fract() == 0.0 => "::int",
        Some(n) if n != 0.0 => "::float",
        _ => " #>> '{}'",
    }
}

// =============================================================================
// Names
// =============================================================================

/// Shorten an identifier to `max` characters, keeping it unique with a digest
/// suffix.
/// Used by: Oracle (30-character constraint names)
pub fn short_key_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let keep = max.saturating_sub(11);
    let prefix: String = name.chars().take(keep).collect();
    format!("{}_{}", prefix, &digest[..10])
}

// =============================================================================
// View capability sets
// =============================================================================

/// Postgres and Redshift.
pub const VIEWS_POSTGRES: ViewSupport = ViewSupport {
    create_or_replace: CreateOrReplace::OrReplace,
    materialized: true,
    check_option: true,
    rename_column: ViewColumnRename::AlterView,
    set_default: true,
};

/// CockroachDB: Postgres creation syntax, no column alteration.
pub const VIEWS_COCKROACH: ViewSupport = ViewSupport {
    rename_column: ViewColumnRename::Unsupported,
    set_default: false,
    ..VIEWS_POSTGRES
};

pub const VIEWS_MYSQL: ViewSupport = ViewSupport {
    create_or_replace: CreateOrReplace::OrReplace,
    check_option: true,
    ..ViewSupport::BASIC
};

pub const VIEWS_SQLITE: ViewSupport = ViewSupport {
    create_or_replace: CreateOrReplace::DropThenCreate,
    ..ViewSupport::BASIC
};

pub const VIEWS_MSSQL: ViewSupport = ViewSupport {
    create_or_replace: CreateOrReplace::OrAlter,
    rename_column: ViewColumnRename::SpRename,
    ..ViewSupport::BASIC
};

pub const VIEWS_ORACLE: ViewSupport = ViewSupport {
    create_or_replace: CreateOrReplace::OrReplace,
    materialized: true,
    ..ViewSupport::BASIC
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_placeholders() {
        let sql = r"select * from t where a = ? and b ? 'k' and c \? 'x' and d = ?";
        assert_eq!(
            position_placeholders(sql, PlaceholderStyle::Dollar),
            "select * from t where a = $1 and b $2 'k' and c ? 'x' and d = $3"
        );
        assert_eq!(
            position_placeholders("a = ? and b = ?", PlaceholderStyle::Colon),
            "a = :1 and b = :2"
        );
        assert_eq!(
            position_placeholders("a = ? and b = ?", PlaceholderStyle::AtP),
            "a = @p0 and b = @p1"
        );
        assert_eq!(
            position_placeholders(r"a \? ?", PlaceholderStyle::Question),
            "a ? ?"
        );
    }

    #[test]
    fn test_count_placeholders_skips_escaped() {
        assert_eq!(count_placeholders(r"a = ? and b \? c and d = ?"), 2);
        assert_eq!(count_placeholders("select 1"), 0);
        assert_eq!(count_placeholders(r"a = '\\' || ? and b \\\? c"), 1);
    }

    #[test]
    fn test_escaped_backslash_before_marker() {
        assert_eq!(
            position_placeholders(r"a = \\? and b = \\\? and c = ?", PlaceholderStyle::Dollar),
            r"a = \\$1 and b = \\? and c = $2"
        );
        assert_eq!(count_placeholders(r"a = \\? and b = \\\? and c = ?"), 2);
    }

    #[test]
    fn test_json_path_segments() {
        assert_eq!(json_path_segments("$.a.b", false), vec!["a", "b"]);
        assert_eq!(
            json_path_segments("$.items[2].name", true),
            vec!["items", "2", "name"]
        );
        assert_eq!(json_path_segments("$.items[2]", false), vec!["items[2]"]);
    }

    #[test]
    fn test_json_cast_for() {
        assert_eq!(json_cast_for(&Value::Int(7)), "::int");
        assert_eq!(json_cast_for(&Value::Float(1.5)), "::float");
        assert_eq!(json_cast_for(&Value::from("12")), "::int");
        assert_eq!(json_cast_for(&Value::from("abc")), " #>> '{}'");
    }

    #[test]
    fn test_short_key_name() {
        assert_eq!(short_key_name("users_email_unique", 30), "users_email_unique");
        let long = "very_long_table_name_with_column_name_foreign";
        let short = short_key_name(long, 30);
        assert_eq!(short.chars().count(), 30);
        assert!(short.starts_with("very_long_table_name"));
        assert_eq!(short, short_key_name(long, 30));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_double("weird\"name"), "\"weird\"\"name\"");
        assert_eq!(quote_backtick("weird`name"), "`weird``name`");
        assert_eq!(quote_bracket("weird]name"), "[weird]]name]");
    }
}
