//! Inline value formatting.
//!
//! The default compile path always parameterizes values. Escaping is only used
//! where a literal must appear in the SQL text itself: column defaults in DDL,
//! and the interpolated form of a compiled query used for error messages.
//!
//! Every piece of [`EscapeRules`] is a separate method so a dialect can
//! override one (say, arrays) and inherit the rest.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Local, Utc};

use super::value::{format_float, Value};

// ============================================================================
// Time zones
// ============================================================================

/// Zone used when rendering date values as literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZone {
    /// The process-local zone.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Offset(FixedOffset),
}

impl TimeZone {
    /// Parse `local`, `Z`, `+HH:MM`, `-HHMM` or `+HH`.
    pub fn parse(tz: &str) -> Option<Self> {
        let tz = tz.trim();
        if tz.eq_ignore_ascii_case("local") {
            return Some(TimeZone::Local);
        }
        if tz == "Z" || tz == "z" {
            return FixedOffset::east_opt(0).map(TimeZone::Offset);
        }
        let (sign, rest) = match tz.chars().next()? {
            '+' => (1, &tz[1..]),
            '-' => (-1, &tz[1..]),
            _ => return None,
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let (hours, minutes) = match digits.len() {
            2 => (digits.parse::<i32>().ok()?, 0),
            4 => (
                digits[..2].parse::<i32>().ok()?,
                digits[2..].parse::<i32>().ok()?,
            ),
            _ => return None,
        };
        if hours > 23 || minutes > 59 {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).map(TimeZone::Offset)
    }
}

/// Format as `YYYY-MM-DD HH:mm:ss.mmm` in the given zone.
pub fn date_to_string(date: &DateTime<Utc>, tz: TimeZone) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
    match tz {
        TimeZone::Local => date.with_timezone(&Local).format(FORMAT).to_string(),
        TimeZone::Offset(offset) => date.with_timezone(&offset).format(FORMAT).to_string(),
    }
}

// ============================================================================
// Escape rules
// ============================================================================

/// Dialect-overridable literal rendering.
pub trait EscapeRules: Send + Sync {
    /// Quote a string literal.
    fn escape_string(&self, s: &str) -> String {
        escape_string_backslash(s)
    }

    fn escape_date(&self, date: &DateTime<Utc>, tz: TimeZone) -> String {
        self.escape_string(&date_to_string(date, tz))
    }

    fn escape_buffer(&self, data: &[u8]) -> String {
        buffer_to_hex_literal(data)
    }

    /// Arrays render as a comma list; nested arrays become parenthesized
    /// tuples, so `[[1, 2], [3, 4]]` is `(1, 2), (3, 4)`.
    fn escape_array(&self, items: &[Value], tz: TimeZone) -> String {
        items
            .iter()
            .map(|item| match item {
                Value::Array(inner) => format!("({})", self.escape_array(inner, tz)),
                other => self.escape(other, tz),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn escape_object(&self, json: &serde_json::Value) -> String {
        self.escape_string(&json.to_string())
    }

    /// Render any value as literal text.
    fn escape(&self, value: &Value, tz: TimeZone) -> String {
        match value {
            Value::Undefined | Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => self.escape_string(s),
            Value::Date(d) => self.escape_date(d, tz),
            Value::Bytes(b) => self.escape_buffer(b),
            Value::Array(items) => self.escape_array(items, tz),
            Value::Json(j) => self.escape_object(j),
        }
    }
}

/// Backslash escaping of control characters and quotes (MySQL family and the
/// generic client).
#[derive(Debug, Clone, Copy, Default)]
pub struct BackslashEscape;

impl EscapeRules for BackslashEscape {}

/// Standard SQL string literals: only the single quote is special.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEscape;

impl EscapeRules for StandardEscape {
    fn escape_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }
}

/// Postgres: standard strings plus `'{..}'` array literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEscape;

impl EscapeRules for PostgresEscape {
    fn escape_string(&self, s: &str) -> String {
        StandardEscape.escape_string(s)
    }

    fn escape_array(&self, items: &[Value], tz: TimeZone) -> String {
        self.escape_string(&pg_array_string(items, tz))
    }
}

/// Build the body of a Postgres array literal (`{1,"a",NULL}`).
fn pg_array_string(items: &[Value], tz: TimeZone) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => "NULL".to_string(),
            Value::Array(inner) => pg_array_string(inner, tz),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Date(d) => json_quote(&date_to_string(d, tz)),
            Value::Json(j) => json_quote(&j.to_string()),
            Value::Bytes(b) => json_quote(&String::from_utf8_lossy(b)),
            Value::String(s) => json_quote(s),
        })
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn json_quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// `'...'` with `\0 \b \t \n \r \x1a " ' \` backslash-escaped.
pub fn escape_string_backslash(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// `X'0a1b'`.
pub fn buffer_to_hex_literal(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 3);
    out.push_str("X'");
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn test_backslash_escape_is_injection_safe() {
        let escaped = escape_string_backslash("a'; drop table users; --");
        assert_eq!(escaped, "'a\\'; drop table users; --'");
        assert_eq!(escape_string_backslash("line\nbreak\0"), "'line\\nbreak\\0'");
        assert_eq!(escape_string_backslash("\\\"\u{1a}"), "'\\\\\\\"\\Z'");
    }

    #[test]
    fn test_standard_escape_doubles_quotes() {
        assert_eq!(StandardEscape.escape_string("it's"), "'it''s'");
    }

    #[test]
    fn test_escape_scalars() {
        let tz = TimeZone::Local;
        assert_eq!(BackslashEscape.escape(&Value::Null, tz), "NULL");
        assert_eq!(BackslashEscape.escape(&Value::Undefined, tz), "NULL");
        assert_eq!(BackslashEscape.escape(&Value::Bool(true), tz), "true");
        assert_eq!(BackslashEscape.escape(&Value::Float(2.5), tz), "2.5");
        assert_eq!(
            BackslashEscape.escape(&Value::bytes(vec![0x0a, 0xff]), tz),
            "X'0aff'"
        );
    }

    #[test]
    fn test_escape_nested_arrays_as_tuples() {
        let v = Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::from("a")]),
            Value::Array(vec![Value::Int(2), Value::from("b")]),
        ]);
        assert_eq!(
            StandardEscape.escape(&v, TimeZone::Local),
            "(1, 'a'), (2, 'b')"
        );
    }

    #[test]
    fn test_postgres_array_literal() {
        let v = Value::Array(vec![Value::Int(1), Value::from("x"), Value::Null]);
        assert_eq!(
            PostgresEscape.escape(&v, TimeZone::Local),
            "'{1,\"x\",NULL}'"
        );
    }

    #[test]
    fn test_date_in_fixed_offset() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let plus_two = TimeZone::parse("+02:00").unwrap();
        assert_eq!(date_to_string(&date, plus_two), "2024-01-02 05:04:05.000");
        let utc = TimeZone::parse("Z").unwrap();
        assert_eq!(
            StandardEscape.escape(&Value::Date(date), utc),
            "'2024-01-02 03:04:05.000'"
        );
        assert_eq!(
            TimeZone::parse("-0530"),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).map(TimeZone::Offset)
        );
        assert_eq!(TimeZone::parse("bogus"), None);
    }
}
