//! Statement compiler.
//!
//! Walks a [`Statement`] in canonical clause order and renders it through a
//! [`Formatter`]. Every clause is rendered strictly left to right so the
//! formatter's binding list lines up with the placeholders in the text.
//!
//! Dialect differences are resolved by dispatching on the capability
//! strategies in [`crate::sql::dialect::strategy`], never on the dialect
//! itself.

mod dml;
mod json;
mod select;
mod where_clause;

use tracing::debug;
use uuid::Uuid;

use super::builder::QueryBuilder;
use super::compiled::CompiledQuery;
use super::formatter::Formatter;
use super::raw::Raw;
use super::statement::{Method, Statement};
use super::value::{Operand, Value};
use crate::client::Client;
use crate::error::{Error, Result};

/// Compile a builder into SQL text and bindings.
pub fn compile(builder: &QueryBuilder, client: &Client) -> Result<CompiledQuery> {
    let statement = builder.statement();
    let mut fmt = Formatter::new(client);
    let sql = render_query(builder, &mut fmt)?;
    let bindings = fmt.into_bindings();

    let positions: Vec<String> = bindings
        .iter()
        .enumerate()
        .filter(|(_, v)| v.contains_undefined())
        .map(|(i, _)| i.to_string())
        .collect();
    if !positions.is_empty() {
        return Err(Error::binding(format!(
            "Undefined binding(s) detected when compiling {}. Undefined column(s): [{}] at binding position(s) [{}] query: {}",
            statement.method.as_str().to_uppercase(),
            statement.undefined_columns().join(", "),
            positions.join(", "),
            sql
        )));
    }

    if client.options().log_sql {
        debug!(
            dialect = %client.dialect(),
            method = %statement.method,
            bindings = bindings.len(),
            sql = %sql,
            "compiled query"
        );
    }

    Ok(CompiledQuery {
        sql,
        bindings,
        method: statement.method,
        dialect: client.dialect(),
        options: statement.single.options.clone(),
        timeout: statement.single.timeout,
        cancel_on_timeout: statement.single.cancel_on_timeout,
        uid: Uuid::new_v4(),
        returning: statement.single.returning.clone(),
    })
}

/// Compile a standalone raw expression.
pub fn compile_raw(raw: &Raw, client: &Client) -> Result<CompiledQuery> {
    let mut fmt = Formatter::new(client);
    let sql = raw.render(&mut fmt)?;
    let bindings = fmt.into_bindings();

    let keys = raw.undefined_keys();
    if !keys.is_empty() || bindings.iter().any(Value::contains_undefined) {
        return Err(Error::binding(format!(
            "Undefined binding(s) detected for keys [{}] when compiling RAW query: {}",
            keys.join(","),
            sql
        )));
    }

    if client.options().log_sql {
        debug!(
            dialect = %client.dialect(),
            bindings = bindings.len(),
            sql = %sql,
            "compiled raw"
        );
    }

    Ok(CompiledQuery {
        sql,
        bindings,
        method: Method::Raw,
        dialect: client.dialect(),
        options: Default::default(),
        timeout: raw.timeout,
        cancel_on_timeout: raw.cancel_on_timeout,
        uid: Uuid::new_v4(),
        returning: Vec::new(),
    })
}

/// Render a builder into an existing formatter.
///
/// Used for the top-level statement and for every nested builder, so nested
/// bindings land in the parent's list at the right position.
pub(crate) fn render_query(qb: &QueryBuilder, fmt: &mut Formatter<'_>) -> Result<String> {
    let statement = qb.statement();
    let comments = render_comments(statement)?;
    let body = match statement.method {
        Method::Select | Method::First => select::render(statement, fmt)?,
        Method::Insert => dml::insert(statement, fmt)?,
        Method::Upsert => dml::upsert(statement, fmt)?,
        Method::Update => dml::update(statement, fmt)?,
        Method::Delete => dml::delete(statement, fmt)?,
        Method::Truncate => dml::truncate(statement, fmt)?,
        other => {
            return Err(Error::validation(format!(
                "Method '{}' cannot be compiled by the query compiler",
                other
            )))
        }
    };
    Ok(match comments {
        Some(comments) if !body.is_empty() => format!("{} {}", comments, body),
        _ => body,
    })
}

fn render_comments(statement: &Statement) -> Result<Option<String>> {
    if statement.single.comments.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::with_capacity(statement.single.comments.len());
    for comment in &statement.single.comments {
        if comment.contains("/*") || comment.contains("*/") || comment.contains('?') {
            return Err(Error::validation(
                "The query comment can not contain \"/*\", \"*/\" or \"?\" characters.",
            ));
        }
        parts.push(format!("/* {} */", comment));
    }
    Ok(Some(parts.join(" ")))
}

// =============================================================================
// Shared helpers
// =============================================================================

/// The statement's target table, schema-qualified and quoted.
pub(crate) fn table_name(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    match &statement.single.table {
        None => Ok(String::new()),
        Some(table) => qualified(table, statement.single.schema.as_deref(), fmt),
    }
}

/// Quote a table operand, prefixing the schema for plain names.
pub(crate) fn qualified(
    table: &Operand,
    schema: Option<&str>,
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    match (table.as_str(), schema) {
        (Some(name), Some(schema)) => Ok(fmt.wrap_string(&format!("{}.{}", schema, name))),
        (Some(name), None) => Ok(fmt.wrap_string(name)),
        _ => fmt.wrap(table),
    }
}

/// Capability error naming the current dialect.
pub(crate) fn unsupported(fmt: &Formatter<'_>, feature: &str) -> Error {
    let dialect = fmt.dialect().name();
    Error::capability(
        dialect,
        format!("{} is not supported by the {} dialect", feature, dialect),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;
    use crate::sql::value::Row;

    #[test]
    fn test_comments_prefix_statement() {
        let mut qb = QueryBuilder::table("users");
        qb.comment("audit").comment("by job");
        let compiled = compile(&qb, &Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(
            compiled.sql,
            "/* audit */ /* by job */ select * from \"users\""
        );
    }

    #[test]
    fn test_comment_rejects_markers() {
        let mut qb = QueryBuilder::table("users");
        qb.comment("a */ drop table users; /*");
        let err = compile(&qb, &Client::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_undefined_where_value_is_binding_error() {
        let mut qb = QueryBuilder::table("users");
        qb.where_("id", Value::Undefined);
        let err = compile(&qb, &Client::default()).unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
        assert!(err.to_string().starts_with(
            "Undefined binding(s) detected when compiling SELECT. Undefined column(s): [id]"
        ));
    }

    #[test]
    fn test_undefined_insert_cell_names_row_and_position() {
        let mut qb = QueryBuilder::table("t");
        qb.insert(Row::new().set("tags", Value::Array(vec![Value::Int(1), Value::Undefined])));
        let err = compile(&qb, &Client::new(Dialect::Postgres)).unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
        assert_eq!(
            err.to_string(),
            "Undefined binding(s) detected when compiling INSERT. Undefined column(s): [tags (row 0)] \
             at binding position(s) [0] query: insert into \"t\" (\"tags\") values (?)"
        );
    }

    #[test]
    fn test_undefined_having_and_update_values_are_named() {
        let mut qb = QueryBuilder::table("orders");
        qb.select(["user_id"])
            .where_("status", "paid")
            .group_by(["user_id"])
            .having("total", ">", Value::Undefined);
        let message = compile(&qb, &Client::default()).unwrap_err().to_string();
        assert!(
            message.contains("Undefined column(s): [total] at binding position(s) [1]"),
            "{}",
            message
        );

        let mut qb = QueryBuilder::table("users");
        qb.update(Row::new().set("roles", Value::Array(vec![Value::Undefined])))
            .where_("id", 1);
        let message = compile(&qb, &Client::default()).unwrap_err().to_string();
        assert!(
            message.contains("Undefined column(s): [roles] at binding position(s) [0]"),
            "{}",
            message
        );
    }

    #[test]
    fn test_compile_raw_undefined_keys() {
        let raw = Raw::with_bindings("select ?, ?", [Value::Int(1), Value::Undefined]);
        let err = compile_raw(&raw, &Client::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Undefined binding(s) detected for keys [1] when compiling RAW query: select ?, ?"
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut qb = QueryBuilder::table("users");
        qb.where_("id", 5).where_in("role", ["a", "b"]);
        let client = Client::new(Dialect::MySql);
        let a = compile(&qb, &client).unwrap();
        let b = compile(&qb, &client).unwrap();
        assert_eq!(a.sql, b.sql);
        assert_eq!(a.bindings, b.bindings);
        assert_ne!(a.uid, b.uid);
    }
}
