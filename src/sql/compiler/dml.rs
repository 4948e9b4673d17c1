//! Insert, upsert, update, delete and truncate.

use super::select::render_with;
use super::where_clause::{clause, render_conditions};
use super::{table_name, unsupported};
use crate::error::{Error, Result};
use crate::sql::dialect::strategy::*;
use crate::sql::formatter::Formatter;
use crate::sql::statement::*;
use crate::sql::value::{Operand, Row, Value};

// =============================================================================
// Insert
// =============================================================================

pub(crate) fn insert(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let with = render_with(statement, fmt)?;
    let table = table_name(statement, fmt)?;

    let ignore = matches!(
        statement.single.on_conflict,
        Some(OnConflict {
            action: Some(ConflictAction::Ignore),
            ..
        })
    ) && fmt.dialect().on_conflict_style() == OnConflictStyle::OnDuplicateKey;
    let keyword = if ignore { "insert ignore into" } else { "insert into" };

    if let Some(InsertSource::Rows(rows)) = &statement.single.insert {
        if rows.len() > 1 && fmt.dialect().multi_row_insert() == MultiRowInsert::InsertAll {
            // `insert all` has no place for a conflict or returning clause.
            if !render_on_conflict(statement, fmt)?.is_empty() {
                return Err(unsupported(fmt, "on conflict with a multi-row insert"));
            }
            if !render_returning(statement, fmt)?.is_empty()
                || !render_output(statement, "inserted", fmt)?.is_empty()
            {
                return Err(unsupported(fmt, "returning with a multi-row insert"));
            }
            return insert_all(&with, &table, rows, fmt);
        }
    }

    let body = match insert_body(statement, fmt)? {
        Some(body) => body,
        None => return Ok(String::new()),
    };
    let mut sql = format!("{}{} {}{}", with, keyword, table, body);
    sql.push_str(&render_on_conflict(statement, fmt)?);
    sql.push_str(&render_returning(statement, fmt)?);
    Ok(sql)
}

/// CockroachDB's native `upsert into`.
pub(crate) fn upsert(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    if fmt.dialect().upsert_style() == UpsertStyle::Unsupported {
        return Err(unsupported(fmt, "upsert"));
    }
    let with = render_with(statement, fmt)?;
    let table = table_name(statement, fmt)?;
    let body = match insert_body(statement, fmt)? {
        Some(body) => body,
        None => return Ok(String::new()),
    };
    let mut sql = format!("{}upsert into {}{}", with, table, body);
    sql.push_str(&render_returning(statement, fmt)?);
    Ok(sql)
}

/// Columns, output clause and values following `insert into t`.
///
/// `None` means there is nothing to insert.
fn insert_body(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<Option<String>> {
    let rows = match &statement.single.insert {
        None => return Ok(None),
        Some(InsertSource::Query(query)) => {
            let output = render_output(statement, "inserted", fmt)?;
            return Ok(Some(format!("{} {}", output, fmt.raw_or_query(query)?)));
        }
        Some(InsertSource::Rows(rows)) => rows,
    };
    if rows.is_empty() {
        return Ok(None);
    }

    let columns = insert_columns(rows);
    let output = render_output(statement, "inserted", fmt)?;

    if columns.is_empty() {
        return match fmt.dialect().empty_insert() {
            EmptyInsert::DefaultValues => Ok(Some(format!("{} default values", output))),
            EmptyInsert::EmptyValues => Ok(Some(format!(" (){} values ()", output))),
            EmptyInsert::Unsupported => Err(unsupported(fmt, "an insert without columns")),
        };
    }

    let column_list = format!(" ({})", fmt.columnize_names(&columns));

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        values.push(format!("({})", row_values(row, &columns, fmt)?));
    }
    Ok(Some(format!(
        "{}{} values {}",
        column_list,
        output,
        values.join(", ")
    )))
}

/// `insert all into t (..) values (..) into t (..) values (..) select 1 from dual`.
fn insert_all(with: &str, table: &str, rows: &[Row], fmt: &mut Formatter<'_>) -> Result<String> {
    let columns = insert_columns(rows);
    let column_list = fmt.columnize_names(&columns);
    let mut parts = Vec::with_capacity(rows.len());
    for row in rows {
        parts.push(format!(
            "into {} ({}) values ({})",
            table,
            column_list,
            row_values(row, &columns, fmt)?
        ));
    }
    Ok(format!("{}insert all {} select 1 from dual", with, parts.join(" ")))
}

/// Union of row keys in first-seen order.
fn insert_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.to_string());
            }
        }
    }
    columns
}

/// One row's values; missing and undefined cells take the default marker.
fn row_values(row: &Row, columns: &[String], fmt: &mut Formatter<'_>) -> Result<String> {
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        match row.get(column) {
            Some(value) if !matches!(value, Operand::Value(Value::Undefined)) => {
                values.push(fmt.parameter(value)?)
            }
            _ => values.push(default_marker(fmt)?),
        }
    }
    Ok(values.join(", "))
}

fn default_marker(fmt: &mut Formatter<'_>) -> Result<String> {
    if fmt.client().options().use_null_as_default {
        return Ok(fmt.bind(Value::Null));
    }
    match fmt.dialect().default_marker() {
        DefaultMarker::Keyword => Ok("DEFAULT".to_string()),
        DefaultMarker::Unsupported => {
            let dialect = fmt.dialect().name();
            Err(Error::capability(
                dialect,
                format!(
                    "{} does not support inserting default values. Set the use_null_as_default option to fill missing columns with NULL.",
                    dialect
                ),
            ))
        }
    }
}

fn render_on_conflict(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let Some(conflict) = &statement.single.on_conflict else {
        return Ok(String::new());
    };
    let Some(action) = &conflict.action else {
        return Ok(String::new());
    };

    match fmt.dialect().on_conflict_style() {
        OnConflictStyle::Unsupported => Err(unsupported(fmt, "on conflict")),
        OnConflictStyle::OnDuplicateKey => match action {
            // Already rendered as `insert ignore`.
            ConflictAction::Ignore => Ok(String::new()),
            ConflictAction::Merge(spec) => {
                if !conflict.merge_where.is_empty() {
                    return Err(unsupported(fmt, "merge with a where clause"));
                }
                let assignments = merge_assignments(statement, spec, fmt, |fmt, column| {
                    let wrapped = fmt.wrap_string(column);
                    format!("{} = values({})", wrapped, wrapped)
                })?;
                Ok(format!(" on duplicate key update {}", assignments))
            }
        },
        OnConflictStyle::OnConflict => {
            let target = match &conflict.target {
                ConflictTarget::None => String::new(),
                ConflictTarget::Columns(columns) => format!(" ({})", fmt.columnize_names(columns)),
                ConflictTarget::Raw(raw) => format!(" {}", raw.render(fmt)?),
            };
            match action {
                ConflictAction::Ignore => Ok(format!(" on conflict{} do nothing", target)),
                ConflictAction::Merge(spec) => {
                    let assignments = merge_assignments(statement, spec, fmt, |fmt, column| {
                        let wrapped = fmt.wrap_string(column);
                        format!("{} = excluded.{}", wrapped, wrapped)
                    })?;
                    let filter =
                        clause("where", render_conditions(&conflict.merge_where, fmt)?);
                    Ok(format!(
                        " on conflict{} do update set {}{}",
                        target, assignments, filter
                    ))
                }
            }
        }
    }
}

fn merge_assignments(
    statement: &Statement,
    spec: &MergeSpec,
    fmt: &mut Formatter<'_>,
    incoming: impl Fn(&Formatter<'_>, &str) -> String,
) -> Result<String> {
    let parts = match spec {
        MergeSpec::All => {
            let rows: &[Row] = match &statement.single.insert {
                Some(InsertSource::Rows(rows)) => rows,
                _ => &[],
            };
            let conflict_columns: Vec<&str> = match &statement.single.on_conflict {
                Some(OnConflict {
                    target: ConflictTarget::Columns(columns),
                    ..
                }) => columns.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            };
            insert_columns(rows)
                .iter()
                .filter(|c| !conflict_columns.contains(&c.as_str()))
                .map(|c| incoming(fmt, c))
                .collect::<Vec<_>>()
        }
        MergeSpec::Columns(columns) => columns.iter().map(|c| incoming(fmt, c)).collect(),
        MergeSpec::Values(row) => {
            let mut parts = Vec::with_capacity(row.len());
            for (column, value) in row.iter() {
                let column = fmt.wrap_string(column);
                parts.push(format!("{} = {}", column, fmt.parameter(value)?));
            }
            parts
        }
    };
    if parts.is_empty() {
        return Err(Error::validation(
            "merge() has no columns to update; pass the columns explicitly",
        ));
    }
    Ok(parts.join(", "))
}

// =============================================================================
// Returning
// =============================================================================

/// Trailing `returning ..` for dialects with a returning clause.
fn render_returning(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let returning = &statement.single.returning;
    if returning.is_empty() {
        return Ok(String::new());
    }
    match fmt.dialect().returning_style() {
        ReturningStyle::Returning => Ok(format!(" returning {}", fmt.columnize_names(returning))),
        // Rendered in place by `render_output`.
        ReturningStyle::Output => Ok(String::new()),
        ReturningStyle::Unsupported => Err(unsupported(fmt, "returning")),
    }
}

/// ` output inserted.[id]` for dialects that return rows through `output`.
fn render_output(statement: &Statement, prefix: &str, fmt: &mut Formatter<'_>) -> Result<String> {
    let returning = &statement.single.returning;
    if returning.is_empty() || fmt.dialect().returning_style() != ReturningStyle::Output {
        return Ok(String::new());
    }
    let columns = returning
        .iter()
        .map(|column| format!("{}.{}", prefix, fmt.wrap_string(column)))
        .collect::<Vec<_>>();
    Ok(format!(" output {}", columns.join(", ")))
}

// =============================================================================
// Update / delete / truncate
// =============================================================================

pub(crate) fn update(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let with = render_with(statement, fmt)?;
    let table = table_name(statement, fmt)?;

    let mut assignments = Vec::new();
    for (column, value) in statement.single.update.iter() {
        if matches!(value, Operand::Value(Value::Undefined)) {
            continue;
        }
        let column = fmt.wrap_string(column);
        assignments.push(format!("{} = {}", column, fmt.parameter(value)?));
    }
    for counter in &statement.single.counters {
        let column = fmt.wrap_string(&counter.column);
        let sign = if counter.decrement { "-" } else { "+" };
        let amount = fmt.bind(counter.amount.clone());
        assignments.push(format!("{} = {} {} {}", column, column, sign, amount));
    }
    if assignments.is_empty() {
        return Err(Error::validation(
            "Empty .update() call detected! Update data does not contain any values to update.",
        ));
    }

    let output = render_output(statement, "inserted", fmt)?;
    let mut sql = format!("{}update {} set {}{}", with, table, assignments.join(", "), output);
    sql.push_str(&clause("where", render_conditions(&statement.wheres, fmt)?));
    sql.push_str(&render_returning(statement, fmt)?);
    Ok(sql)
}

pub(crate) fn delete(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let with = render_with(statement, fmt)?;
    let table = table_name(statement, fmt)?;
    let mut sql = format!("{}delete from {}", with, table);
    if !statement.single.using.is_empty() {
        sql.push_str(&format!(" using {}", fmt.columnize_names(&statement.single.using)));
    }
    sql.push_str(&render_output(statement, "deleted", fmt)?);
    sql.push_str(&clause("where", render_conditions(&statement.wheres, fmt)?));
    sql.push_str(&render_returning(statement, fmt)?);
    Ok(sql)
}

pub(crate) fn truncate(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let table = table_name(statement, fmt)?;
    Ok(match fmt.dialect().truncate_style() {
        TruncateStyle::Truncate => format!("truncate {}", table),
        TruncateStyle::TruncateTable => format!("truncate table {}", table),
        TruncateStyle::RestartIdentity => format!("truncate {} restart identity", table),
        TruncateStyle::DeleteFrom => format!("delete from {}", table),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, ClientOptions};
    use crate::sql::builder::QueryBuilder;
    use crate::sql::compiler::render_query;
    use crate::sql::dialect::Dialect;

    fn sql(qb: &QueryBuilder, client: &Client) -> Result<(String, Vec<Value>)> {
        let mut fmt = Formatter::new(client);
        let sql = render_query(qb, &mut fmt)?;
        Ok((sql, fmt.into_bindings()))
    }

    #[test]
    fn test_heterogeneous_rows_fill_defaults() {
        let mut qb = QueryBuilder::table("t");
        qb.insert_many([Row::new().set("a", 1), Row::new().set("a", 2).set("b", 3)]);
        let (text, bindings) = sql(&qb, &Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(
            text,
            "insert into \"t\" (\"a\", \"b\") values (?, DEFAULT), (?, ?)"
        );
        assert_eq!(bindings, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_sqlite_requires_null_as_default() {
        let mut qb = QueryBuilder::table("t");
        qb.insert_many([Row::new().set("a", 1), Row::new().set("b", 2)]);
        let err = sql(&qb, &Client::new(Dialect::Sqlite3)).unwrap_err();
        assert!(matches!(err, Error::Capability { dialect: "sqlite3", .. }));

        let client = Client::with_options(
            Dialect::Sqlite3,
            ClientOptions {
                use_null_as_default: true,
                ..Default::default()
            },
        );
        let (text, bindings) = sql(&qb, &client).unwrap();
        assert_eq!(text, "insert into `t` (`a`, `b`) values (?, ?), (?, ?)");
        assert_eq!(
            bindings,
            vec![Value::Int(1), Value::Null, Value::Null, Value::Int(2)]
        );
    }

    #[test]
    fn test_empty_insert() {
        let mut qb = QueryBuilder::table("t");
        qb.insert(Row::new());
        let (text, _) = sql(&qb, &Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(text, "insert into \"t\" default values");
        let (text, _) = sql(&qb, &Client::new(Dialect::MySql)).unwrap();
        assert_eq!(text, "insert into `t` () values ()");

        let mut none = QueryBuilder::table("t");
        none.insert_many(Vec::<Row>::new());
        assert_eq!(sql(&none, &Client::default()).unwrap().0, "");
    }

    #[test]
    fn test_on_conflict_merge_excludes_target() {
        let mut qb = QueryBuilder::table("users");
        qb.insert(Row::new().set("email", "a@b.c").set("name", "A"))
            .on_conflict(["email"])
            .merge()
            .returning(["id"]);
        let (text, _) = sql(&qb, &Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(
            text,
            "insert into \"users\" (\"email\", \"name\") values (?, ?) on conflict (\"email\") do update set \"name\" = excluded.\"name\" returning \"id\""
        );
    }

    #[test]
    fn test_mysql_ignore_and_duplicate_key() {
        let mut qb = QueryBuilder::table("users");
        qb.insert(Row::new().set("email", "a@b.c"))
            .on_conflict(["email"])
            .ignore();
        let (text, _) = sql(&qb, &Client::new(Dialect::MySql)).unwrap();
        assert_eq!(text, "insert ignore into `users` (`email`) values (?)");

        let mut qb = QueryBuilder::table("users");
        qb.insert(Row::new().set("email", "a@b.c").set("name", "A"))
            .on_conflict(["email"])
            .merge_columns(["name"]);
        let (text, _) = sql(&qb, &Client::new(Dialect::MySql)).unwrap();
        assert_eq!(
            text,
            "insert into `users` (`email`, `name`) values (?, ?) on duplicate key update `name` = values(`name`)"
        );
    }

    #[test]
    fn test_mssql_output_clause() {
        let mut qb = QueryBuilder::table("users");
        qb.insert(Row::new().set("name", "A")).returning(["id"]);
        let (text, _) = sql(&qb, &Client::new(Dialect::MsSql)).unwrap();
        assert_eq!(
            text,
            "insert into [users] ([name]) output inserted.[id] values (?)"
        );

        let mut qb = QueryBuilder::table("users");
        qb.where_("id", 1).delete().returning(["id"]);
        let (text, _) = sql(&qb, &Client::new(Dialect::MsSql)).unwrap();
        assert_eq!(text, "delete from [users] output deleted.[id] where [id] = ?");
    }

    #[test]
    fn test_update_with_counters() {
        let mut qb = QueryBuilder::table("accounts");
        qb.update(Row::new().set("name", "x"))
            .increment("balance", 10)
            .where_("id", 1);
        let (text, bindings) = sql(&qb, &Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(
            text,
            "update \"accounts\" set \"name\" = ?, \"balance\" = \"balance\" + ? where \"id\" = ?"
        );
        assert_eq!(bindings, vec![Value::from("x"), Value::Int(10), Value::Int(1)]);
    }

    #[test]
    fn test_empty_update_rejected() {
        let mut qb = QueryBuilder::table("accounts");
        qb.update(Row::new().set("a", Value::Undefined));
        let err = sql(&qb, &Client::default()).unwrap_err();
        assert!(err.to_string().starts_with("Empty .update() call detected!"));
    }

    #[test]
    fn test_upsert_capability() {
        let mut qb = QueryBuilder::table("t");
        qb.upsert(Row::new().set("id", 1).set("v", 2));
        let (text, _) = sql(&qb, &Client::new(Dialect::CockroachDb)).unwrap();
        assert_eq!(text, "upsert into \"t\" (\"id\", \"v\") values (?, ?)");

        let err = sql(&qb, &Client::new(Dialect::Postgres)).unwrap_err();
        assert_eq!(err.to_string(), "upsert is not supported by the postgres dialect");
    }

    #[test]
    fn test_truncate_styles() {
        let mut qb = QueryBuilder::table("t");
        qb.truncate();
        let client = |d| Client::new(d);
        assert_eq!(
            sql(&qb, &client(Dialect::Postgres)).unwrap().0,
            "truncate \"t\" restart identity"
        );
        assert_eq!(sql(&qb, &client(Dialect::CockroachDb)).unwrap().0, "truncate \"t\"");
        assert_eq!(sql(&qb, &client(Dialect::MsSql)).unwrap().0, "truncate table [t]");
        assert_eq!(sql(&qb, &client(Dialect::Sqlite3)).unwrap().0, "delete from `t`");
    }
}
