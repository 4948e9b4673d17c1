//! Raw SQL expressions.
//!
//! A [`Raw`] carries literal SQL with either positional or named bindings.
//! It can be compiled on its own or spliced into any clause of a builder;
//! in the latter case its bindings land in the parent's binding list at the
//! position of the raw text.
//!
//! Positional markers:
//! - `?` a bound value
//! - `??` an identifier (wrapped with the dialect's quoting)
//! - `\?` a literal question mark, kept escaped until placeholders are positioned
//!
//! Named markers:
//! - `:key` a bound value
//! - `:key:` an identifier
//! - `\:key` the literal text `:key`
//!
//! `::` casts are left alone, and names missing from the binding map are
//! emitted verbatim.

use std::time::Duration;

use super::dialect::helpers::backslash_run;
use super::formatter::Formatter;
use super::value::{Operand, Value};
use crate::error::{Error, Result};

/// Bindings attached to a raw expression.
#[derive(Debug, Clone, Default)]
pub enum RawBindings {
    #[default]
    None,
    Positional(Vec<Operand>),
    Named(Vec<(String, Operand)>),
}

/// Literal SQL with its own bindings.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct Raw {
    pub(crate) sql: String,
    pub(crate) bindings: RawBindings,
    pub(crate) before: Option<String>,
    pub(crate) after: Option<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancel_on_timeout: bool,
}

impl Raw {
    /// Raw SQL without bindings.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: RawBindings::None,
            before: None,
            after: None,
            timeout: None,
            cancel_on_timeout: false,
        }
    }

    /// Raw SQL with positional `?` / `??` bindings.
    pub fn with_bindings<I, T>(sql: impl Into<String>, bindings: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        let mut raw = Raw::new(sql);
        raw.bindings = RawBindings::Positional(bindings.into_iter().map(Into::into).collect());
        raw
    }

    /// Raw SQL with named `:key` / `:key:` bindings.
    pub fn named<I, K, T>(sql: impl Into<String>, bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Operand>,
    {
        let mut raw = Raw::new(sql);
        raw.bindings = RawBindings::Named(
            bindings
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        raw
    }

    /// Surround the rendered SQL with fixed text.
    pub fn wrap(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self.after = Some(after.into());
        self
    }

    /// Attach an execution timeout. Zero durations are ignored.
    pub fn timeout(mut self, duration: Duration, cancel: bool) -> Self {
        if !duration.is_zero() {
            self.timeout = Some(duration);
            self.cancel_on_timeout = cancel;
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Render into `fmt`, appending bindings in placeholder order.
    pub(crate) fn render(&self, fmt: &mut Formatter<'_>) -> Result<String> {
        let body = match &self.bindings {
            RawBindings::None => self.sql.clone(),
            RawBindings::Positional(values) => render_positional(&self.sql, values, fmt)?,
            RawBindings::Named(values) => render_named(&self.sql, values, fmt)?,
        };
        let mut out = String::with_capacity(body.len());
        if let Some(before) = &self.before {
            out.push_str(before);
        }
        out.push_str(&body);
        if let Some(after) = &self.after {
            out.push_str(after);
        }
        Ok(out)
    }

    /// Keys (named) or indices (positional) whose values contain an
    /// undefined hole.
    pub(crate) fn undefined_keys(&self) -> Vec<String> {
        match &self.bindings {
            RawBindings::None => Vec::new(),
            RawBindings::Positional(values) => values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_undefined())
                .map(|(i, _)| i.to_string())
                .collect(),
            RawBindings::Named(values) => values
                .iter()
                .filter(|(_, v)| v.is_undefined())
                .map(|(k, _)| k.clone())
                .collect(),
        }
    }
}

impl From<&str> for Raw {
    fn from(sql: &str) -> Self {
        Raw::new(sql)
    }
}

impl From<String> for Raw {
    fn from(sql: String) -> Self {
        Raw::new(sql)
    }
}

/// Identifier rendering for `??` and `:key:` markers.
fn render_identifier(value: &Operand, fmt: &mut Formatter<'_>) -> Result<String> {
    match value {
        Operand::Value(Value::Array(items)) => {
            let parts = items
                .iter()
                .map(|item| fmt.wrap(&Operand::Value(item.clone())))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(", "))
        }
        other => fmt.wrap(other),
    }
}

fn render_positional(sql: &str, values: &[Operand], fmt: &mut Formatter<'_>) -> Result<String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut index = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let run = 1 + backslash_run(&mut chars);
                out.extend(std::iter::repeat('\\').take(run));
                if run % 2 == 1 && chars.peek() == Some(&'?') {
                    chars.next();
                    out.push('?');
                }
            }
            '?' => {
                let identifier = chars.peek() == Some(&'?');
                if identifier {
                    chars.next();
                }
                match values.get(index) {
                    Some(value) if identifier => out.push_str(&render_identifier(value, fmt)?),
                    Some(value) => out.push_str(&fmt.parameter(value)?),
                    None => out.push_str(if identifier { "??" } else { "?" }),
                }
                index += 1;
            }
            _ => out.push(c),
        }
    }

    if index != values.len() {
        return Err(Error::validation(format!(
            "Expected {} bindings, saw {}",
            values.len(),
            index
        )));
    }
    Ok(out)
}

fn render_named(
    sql: &str,
    values: &[(String, Operand)],
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0usize;

    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    while i < chars.len() {
        let c = chars[i];
        let escaped = c == '\\' && chars.get(i + 1) == Some(&':');
        let start = if escaped { i + 1 } else { i };

        if chars[start] != ':' || !chars.get(start + 1).copied().is_some_and(is_word) {
            out.push(c);
            i += 1;
            continue;
        }

        let mut end = start + 1;
        while end < chars.len() && is_word(chars[end]) {
            end += 1;
        }
        let key: String = chars[start + 1..end].iter().collect();

        // `:key:` marks an identifier unless the colon opens a `::` cast.
        let identifier = chars.get(end) == Some(&':')
            && (chars.get(end + 1) != Some(&':') || chars.get(end + 2) == Some(&':'));
        let token_end = if identifier { end + 1 } else { end };
        let token: String = chars[start..token_end].iter().collect();

        if escaped {
            out.push_str(&token);
            i = token_end;
            continue;
        }

        match values.iter().find(|(k, _)| *k == key) {
            Some((_, Operand::Value(Value::Undefined))) => {
                fmt.push_binding(Value::Undefined);
                out.push_str(&token);
            }
            Some((_, value)) if identifier => out.push_str(&render_identifier(value, fmt)?),
            Some((_, value)) => out.push_str(&fmt.parameter(value)?),
            None => out.push_str(&token),
        }
        i = token_end;
    }

    Ok(out)
}
