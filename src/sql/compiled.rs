//! Compiled query results.

use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::dialect::helpers::{backslash_run, position_placeholders};
use super::dialect::{Dialect, SqlDialect};
use super::escape::{EscapeRules, TimeZone};
use super::statement::Method;
use super::value::Value;

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
    pub method: Method,
    #[serde(skip)]
    pub dialect: Dialect,
    pub options: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    pub cancel_on_timeout: bool,
    /// Fresh per compile; not part of the deterministic output.
    pub uid: Uuid,
    pub returning: Vec<String>,
}

/// SQL rewritten for the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CompiledQuery {
    /// Position placeholders in the dialect's native syntax and prepare
    /// bindings for the driver.
    pub fn to_native(&self) -> NativeQuery {
        let dialect = self.dialect.dialect();
        NativeQuery {
            sql: position_placeholders(&self.sql, dialect.placeholder_style()),
            bindings: self.bindings.iter().map(|b| dialect.prep_binding(b)).collect(),
        }
    }

    /// Substitute escaped literals for the placeholders.
    ///
    /// For diagnostics only; the result is never executed. Placeholders
    /// beyond the available bindings are left as `?`.
    pub fn interpolate(&self, tz: TimeZone) -> String {
        interpolate(&self.sql, &self.bindings, self.dialect.escape_rules(), tz)
    }

    /// Hex SHA-256 of the JSON form of `{sql, bindings}`.
    pub fn fingerprint(&self) -> String {
        let payload = serde_json::json!({
            "sql": self.sql,
            "bindings": self.bindings,
        });
        let mut hasher = Sha256::new();
        hasher.update(payload.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Number of unescaped placeholders in the SQL text.
    pub fn placeholder_count(&self) -> usize {
        super::dialect::helpers::count_placeholders(&self.sql)
    }
}

/// Replace `?` placeholders with escaped literals. `\?` becomes a literal `?`.
pub(crate) fn interpolate(
    sql: &str,
    bindings: &[Value],
    rules: &dyn EscapeRules,
    tz: TimeZone,
) -> String {
    let mut out = String::with_capacity(sql.len() + bindings.len() * 8);
    let mut bindings = bindings.iter();
    let mut chars = sql.chars().peekable();

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
            '?' => match bindings.next() {
                Some(value) => out.push_str(&rules.escape(value, tz)),
                None => out.push('?'),
            },
            _ => out.push(c),
        }
    }
    out
}
