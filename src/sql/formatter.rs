//! Identifier formatter and binding accumulator.
//!
//! A [`Formatter`] is created fresh for every compile pass. Each time a value
//! is parameterized its binding is appended immediately, so the binding list
//! always follows the left-to-right order of the placeholders in the emitted
//! text, including bindings pulled from nested builders and raw expressions.

use once_cell::sync::Lazy;
use regex::Regex;

use super::builder::QueryBuilder;
use super::compiler;
use super::dialect::SqlDialect;
use super::statement::Method;
use super::value::{Operand, Value};
use crate::client::Client;
use crate::error::{Error, Result};

/// Case-insensitive ` as ` infix separating an expression from its alias.
static ALIAS_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i) as ").unwrap());

/// Operators accepted by comparison clauses, keyed by their lowercase form.
const OPERATORS: &[(&str, &str)] = &[
    ("=", "="),
    ("<", "<"),
    (">", ">"),
    ("<=", "<="),
    (">=", ">="),
    ("<>", "<>"),
    ("!=", "!="),
    ("like", "like"),
    ("not like", "not like"),
    ("between", "between"),
    ("not between", "not between"),
    ("ilike", "ilike"),
    ("not ilike", "not ilike"),
    ("exists", "exists"),
    ("not exist", "not exist"),
    ("rlike", "rlike"),
    ("not rlike", "not rlike"),
    ("regexp", "regexp"),
    ("not regexp", "not regexp"),
    ("match", "match"),
    ("in", "in"),
    ("not in", "not in"),
    ("&", "&"),
    ("|", "|"),
    ("^", "^"),
    ("<<", "<<"),
    (">>", ">>"),
    ("~", "~"),
    ("~=", "~="),
    ("~*", "~*"),
    ("!~", "!~"),
    ("!~*", "!~*"),
    ("#", "#"),
    ("&&", "&&"),
    ("@>", "@>"),
    ("<@", "<@"),
    ("||", "||"),
    ("&<", "&<"),
    ("&>", "&>"),
    ("-|-", "-|-"),
    ("@@", "@@"),
    ("!!", "!!"),
    ("?", "\\?"),
    ("?|", "\\?|"),
    ("?&", "\\?&"),
];

/// Validate an operator token against the whitelist.
///
/// Operators are emitted unquoted, so anything outside the list is rejected.
pub fn operator(value: &str) -> Result<&'static str> {
    let lowered = value.to_lowercase();
    OPERATORS
        .iter()
        .find(|(key, _)| *key == lowered)
        .map(|(_, op)| *op)
        .ok_or_else(|| Error::validation(format!("The operator \"{}\" is not permitted", value)))
}

/// Renders identifiers and parameters for one compile pass.
pub struct Formatter<'a> {
    client: &'a Client,
    bindings: Vec<Value>,
}

impl<'a> Formatter<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            bindings: Vec::new(),
        }
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.client.dialect().dialect()
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn into_bindings(self) -> Vec<Value> {
        self.bindings
    }

    /// Take the accumulated bindings, leaving the formatter empty.
    pub fn take_bindings(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.bindings)
    }

    pub fn push_binding(&mut self, value: Value) {
        self.bindings.push(value);
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// Quote a single identifier segment.
    pub fn wrap_identifier(&self, ident: &str) -> String {
        self.client.wrap_identifier(ident.trim())
    }

    /// Quote a possibly dotted, possibly aliased identifier string.
    ///
    /// `users.id as uid` becomes `"users"."id" as "uid"`; `*` stays bare.
    pub fn wrap_string(&self, value: &str) -> String {
        if let Some((first, second)) = Self::split_alias(value) {
            return self.alias(&self.wrap_string(first), second);
        }
        value
            .split('.')
            .map(|segment| self.wrap_identifier(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Split `expr as alias` at the first case-insensitive ` as `.
    pub fn split_alias(value: &str) -> Option<(&str, &str)> {
        ALIAS_SPLIT
            .find(value)
            .map(|m| (&value[..m.start()], &value[m.end()..]))
    }

    /// Join an expression with a quoted alias.
    pub fn alias(&self, expr: &str, alias: &str) -> String {
        self.dialect().alias(expr, &self.wrap_identifier(alias))
    }

    /// Wrap an operand in identifier position.
    pub fn wrap(&mut self, value: &Operand) -> Result<String> {
        match value {
            Operand::Raw(raw) => raw.render(self),
            Operand::Query(qb) => self.sub_query(qb, false),
            Operand::Deferred(deferred) => {
                let qb = deferred.build();
                self.sub_query(&qb, true)
            }
            Operand::Value(Value::Int(i)) => Ok(i.to_string()),
            Operand::Value(Value::Float(f)) => Ok(Value::Float(*f).as_text()),
            Operand::Value(v) => Ok(self.wrap_string(&v.as_text())),
        }
    }

    /// Wrap a list of operands and join them with `, `.
    pub fn columnize(&mut self, values: &[Operand]) -> Result<String> {
        let parts = values
            .iter()
            .map(|v| self.wrap(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(", "))
    }

    /// Wrap plain column names and join them with `, `.
    pub fn columnize_names<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.wrap_string(n.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Render an operand in value position.
    ///
    /// Plain values become `?` with the value appended to the bindings.
    pub fn parameter(&mut self, value: &Operand) -> Result<String> {
        match value {
            Operand::Raw(raw) => raw.render(self),
            Operand::Query(qb) => self.sub_query(qb, true),
            Operand::Deferred(deferred) => {
                let qb = deferred.build();
                self.sub_query(&qb, true)
            }
            Operand::Value(v) => {
                self.bindings.push(v.clone());
                Ok("?".to_string())
            }
        }
    }

    /// Render a list of values as `?, ?, ?`.
    pub fn parameterize(&mut self, values: &[Operand]) -> Result<String> {
        let parts = values
            .iter()
            .map(|v| self.parameter(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join(", "))
    }

    /// Bind a plain value.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.bindings.push(value.into());
        "?".to_string()
    }

    /// Render an operand for a `values (..)` list: arrays become tuples.
    pub fn values(&mut self, value: &Operand) -> Result<String> {
        match value {
            Operand::Value(Value::Array(items)) => {
                if matches!(items.first(), Some(Value::Array(_))) {
                    let tuples = items
                        .iter()
                        .map(|item| match item {
                            Value::Array(inner) => Ok(format!(
                                "({})",
                                self.parameterize(&values_to_operands(inner))?
                            )),
                            other => self.parameter(&Operand::Value(other.clone())),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(format!("({})", tuples.join(", ")))
                } else {
                    Ok(format!("({})", self.parameterize(&values_to_operands(items))?))
                }
            }
            Operand::Raw(_) => Ok(format!("({})", self.parameter(value)?)),
            other => self.parameter(other),
        }
    }

    /// Render a raw expression or nested builder without parentheses; plain
    /// values are bound.
    pub fn raw_or_query(&mut self, value: &Operand) -> Result<String> {
        match value {
            Operand::Raw(raw) => raw.render(self),
            Operand::Query(qb) => compiler::render_query(qb, self),
            Operand::Deferred(deferred) => {
                let qb = deferred.build();
                compiler::render_query(&qb, self)
            }
            Operand::Value(_) => self.parameter(value),
        }
    }

    /// Render a nested builder, with parentheses when it is a select used as
    /// a value or carries an alias.
    pub(crate) fn sub_query(&mut self, qb: &QueryBuilder, is_parameter: bool) -> Result<String> {
        let sql = compiler::render_query(qb, self)?;
        if sql.is_empty() {
            return Ok(sql);
        }
        let method = qb.statement().method;
        let alias = qb.statement().single.alias.clone();
        if matches!(method, Method::Select | Method::First) && (is_parameter || alias.is_some()) {
            let wrapped = format!("({})", sql);
            return Ok(match alias {
                Some(alias) => self.alias(&wrapped, &alias),
                None => wrapped,
            });
        }
        Ok(sql)
    }
}

pub(crate) fn values_to_operands(values: &[Value]) -> Vec<Operand> {
    values.iter().cloned().map(Operand::Value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use crate::sql::raw::Raw;

    #[test]
    fn test_wrap_string_alias_and_dots() {
        let client = Client::new(Dialect::Postgres);
        let fmt = Formatter::new(&client);
        assert_eq!(fmt.wrap_string("users.id"), "\"users\".\"id\"");
        assert_eq!(fmt.wrap_string("users.*"), "\"users\".*");
        assert_eq!(fmt.wrap_string("id AS uid"), "\"id\" as \"uid\"");
        assert_eq!(fmt.wrap_string("*"), "*");
    }

    #[test]
    fn test_oracle_alias_has_no_as() {
        let client = Client::new(Dialect::Oracle);
        let fmt = Formatter::new(&client);
        assert_eq!(fmt.wrap_string("users as u"), "\"users\" \"u\"");
    }

    #[test]
    fn test_operator_whitelist() {
        assert_eq!(operator("LIKE").unwrap(), "like");
        assert_eq!(operator("?|").unwrap(), "\\?|");
        assert_eq!(operator("@>").unwrap(), "@>");
        let err = operator("= 1; drop table users; --").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            operator("<=>").unwrap_err().to_string(),
            "The operator \"<=>\" is not permitted"
        );
    }

    #[test]
    fn test_parameter_appends_in_order() {
        let client = Client::new(Dialect::Generic);
        let mut fmt = Formatter::new(&client);
        let a = fmt.parameter(&Operand::from(1)).unwrap();
        let b = fmt
            .parameter(&Operand::Raw(Raw::with_bindings("lower(?)", ["X"])))
            .unwrap();
        assert_eq!(a, "?");
        assert_eq!(b, "lower(?)");
        assert_eq!(fmt.bindings(), &[Value::Int(1), Value::from("X")]);
    }

    #[test]
    fn test_values_tuples() {
        let client = Client::new(Dialect::Generic);
        let mut fmt = Formatter::new(&client);
        let v = Operand::Value(Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
            Value::Array(vec![Value::Int(3), Value::Int(4)]),
        ]));
        assert_eq!(fmt.values(&v).unwrap(), "((?, ?), (?, ?))");
        assert_eq!(fmt.bindings().len(), 4);
    }
}
