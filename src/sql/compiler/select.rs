//! Select statements and the clauses shared with writes.
//!
//! Clause order: with, columns, from, joins, where, group by, having,
//! order by, limit/offset, set operations, lock.

use super::json;
use super::where_clause::{clause, render_conditions, render_join_conditions};
use super::{qualified, table_name, unsupported};
use crate::error::Result;
use crate::sql::dialect::strategy::{LimitStyle, LockStyle, NullsOrdering};
use crate::sql::formatter::Formatter;
use crate::sql::statement::*;
use crate::sql::value::Operand;

pub(crate) fn render(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let with = render_with(statement, fmt)?;
    let head = render_head(statement, fmt)?;
    let table = render_from(statement, fmt)?;

    let mut sql = with;
    sql.push_str(&head);
    sql.push_str(&table);
    sql.push_str(&render_joins(statement, fmt)?);
    sql.push_str(&clause("where", render_conditions(&statement.wheres, fmt)?));
    sql.push_str(&render_group(statement, fmt)?);
    sql.push_str(&clause("having", render_conditions(&statement.havings, fmt)?));
    sql.push_str(&render_order(statement, fmt)?);
    sql.push_str(&render_limit(statement, fmt)?);
    sql.push_str(&render_unions(statement, fmt)?);
    sql.push_str(&render_lock(statement, fmt)?);
    Ok(sql)
}

// =============================================================================
// With
// =============================================================================

/// `with "a" as (..), "b" as (..) ` including the trailing space.
pub(crate) fn render_with(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    if statement.with.is_empty() {
        return Ok(String::new());
    }
    let recursive =
        statement.with.iter().any(|w| w.recursive) && fmt.dialect().emit_recursive_keyword();

    let mut parts = Vec::with_capacity(statement.with.len());
    for with in &statement.with {
        let mut part = fmt.wrap_identifier(&with.alias);
        if !with.columns.is_empty() {
            part.push('(');
            part.push_str(&fmt.columnize_names(&with.columns));
            part.push(')');
        }
        part.push_str(" as ");
        match with.materialized {
            Some(_) if !fmt.dialect().supports_cte_materialization() => {
                return Err(unsupported(fmt, "with materialized"));
            }
            Some(true) => part.push_str("materialized "),
            Some(false) => part.push_str("not materialized "),
            None => {}
        }
        part.push('(');
        part.push_str(&fmt.raw_or_query(&with.query)?);
        part.push(')');
        parts.push(part);
    }

    Ok(format!(
        "with {}{} ",
        if recursive { "recursive " } else { "" },
        parts.join(", ")
    ))
}

// =============================================================================
// Columns
// =============================================================================

fn top_style(statement: &Statement, fmt: &Formatter<'_>) -> bool {
    fmt.dialect().limit_style() == LimitStyle::Top
        && statement.single.limit.is_some()
        && statement.single.offset.is_none()
}

fn render_head(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let mut head = String::from("select ");
    match &statement.single.distinct {
        Distinct::None => {}
        Distinct::All => head.push_str("distinct "),
        Distinct::On(columns) => {
            if !fmt.dialect().supports_distinct_on() {
                return Err(unsupported(fmt, "distinct on"));
            }
            head.push_str(&format!("distinct on ({}) ", fmt.columnize(columns)?));
        }
    }

    if top_style(statement, fmt) {
        if let Some(limit) = &statement.single.limit {
            head.push_str(&format!("top ({}) ", fmt.parameter(limit)?));
        }
    }

    if statement.columns.is_empty() {
        head.push('*');
    } else {
        let mut columns = Vec::with_capacity(statement.columns.len());
        for column in &statement.columns {
            columns.push(render_column(column, fmt)?);
        }
        head.push_str(&columns.join(", "));
    }
    Ok(head)
}

fn render_column(column: &ColumnClause, fmt: &mut Formatter<'_>) -> Result<String> {
    match column {
        ColumnClause::Plain(value) => fmt.wrap(value),
        ColumnClause::Aggregate {
            function,
            columns,
            alias,
            distinct,
        } => render_aggregate(*function, columns, alias.as_deref(), *distinct, fmt),
        ColumnClause::Analytic(analytic) => render_analytic(analytic, fmt),
        ColumnClause::JsonExtract {
            column,
            path,
            alias,
        } => {
            let expr = json::extract(column, path, fmt)?;
            Ok(match alias {
                Some(alias) => fmt.alias(&expr, alias),
                None => expr,
            })
        }
    }
}

fn render_aggregate(
    function: AggregateFn,
    columns: &[Operand],
    alias: Option<&str>,
    distinct: bool,
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let distinct = if distinct { "distinct " } else { "" };

    // `count("id as total")` aliases the aggregate, not the column.
    if let ([single], None) = (columns, alias) {
        if let Some((column, alias)) = single.as_str().and_then(Formatter::split_alias) {
            let expr = format!("{}({}{})", function.name(), distinct, fmt.wrap_string(column));
            return Ok(fmt.alias(&expr, alias));
        }
    }

    let inner = if columns.is_empty() {
        "*".to_string()
    } else {
        fmt.columnize(columns)?
    };
    let expr = format!("{}({}{})", function.name(), distinct, inner);
    Ok(match alias {
        Some(alias) => fmt.alias(&expr, alias),
        None => expr,
    })
}

fn render_terms(terms: &[OrderTerm], fmt: &Formatter<'_>) -> String {
    terms
        .iter()
        .map(|term| match term.direction {
            Some(direction) => format!("{} {}", fmt.wrap_string(&term.column), direction.keyword()),
            None => fmt.wrap_string(&term.column),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_analytic(analytic: &Analytic, fmt: &mut Formatter<'_>) -> Result<String> {
    let mut over = Vec::new();
    if !analytic.partition_by.is_empty() {
        over.push(format!("partition by {}", render_terms(&analytic.partition_by, fmt)));
    }
    if !analytic.order_by.is_empty() {
        over.push(format!("order by {}", render_terms(&analytic.order_by, fmt)));
    }
    let expr = format!("{}() over ({})", analytic.function.name(), over.join(" "));
    Ok(match &analytic.alias {
        Some(alias) => fmt.alias(&expr, alias),
        None => expr,
    })
}

// =============================================================================
// From and joins
// =============================================================================

fn render_from(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let table = table_name(statement, fmt)?;
    if table.is_empty() {
        return Ok(table);
    }
    let hint = if fmt.dialect().lock_style() == LockStyle::MsSql {
        mssql_lock_hint(statement, fmt)?
    } else {
        String::new()
    };
    Ok(format!(" from {}{}", table, hint))
}

pub(crate) fn render_joins(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let mut sql = String::new();
    for join in &statement.joins {
        sql.push(' ');
        match join {
            JoinClause::Raw(raw) => sql.push_str(&raw.render(fmt)?),
            JoinClause::Table {
                kind,
                table,
                schema,
                conditions,
                using,
            } => {
                sql.push_str(kind.keyword());
                sql.push(' ');
                sql.push_str(&qualified(table, schema.as_deref(), fmt)?);
                if !using.is_empty() {
                    sql.push_str(&format!(" using ({})", fmt.columnize_names(using)));
                } else {
                    let on = render_join_conditions(conditions, fmt)?;
                    if !on.is_empty() {
                        sql.push_str(" on ");
                        sql.push_str(&on);
                    }
                }
            }
        }
    }
    Ok(sql)
}

// =============================================================================
// Group, order, limit
// =============================================================================

fn render_group(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    if statement.groups.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" group by {}", fmt.columnize(&statement.groups)?))
}

pub(crate) fn render_order(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    if statement.orders.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(statement.orders.len());
    for order in &statement.orders {
        parts.push(match order {
            OrderClause::Raw(raw) => raw.render(fmt)?,
            OrderClause::Column {
                value,
                direction,
                nulls,
            } => {
                let column = fmt.wrap(value)?;
                match (nulls, fmt.dialect().nulls_ordering()) {
                    (None, _) => format!("{} {}", column, direction.keyword()),
                    (Some(NullsPosition::First), NullsOrdering::Native) => {
                        format!("{} {} nulls first", column, direction.keyword())
                    }
                    (Some(NullsPosition::Last), NullsOrdering::Native) => {
                        format!("{} {} nulls last", column, direction.keyword())
                    }
                    (Some(NullsPosition::First), NullsOrdering::Emulated) => {
                        format!("({} is not null), {} {}", column, column, direction.keyword())
                    }
                    (Some(NullsPosition::Last), NullsOrdering::Emulated) => {
                        format!("({} is null), {} {}", column, column, direction.keyword())
                    }
                }
            }
        });
    }
    Ok(format!(" order by {}", parts.join(", ")))
}

fn render_limit(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let limit = statement.single.limit.as_ref();
    let offset = statement.single.offset.as_ref();
    let mut sql = String::new();

    match fmt.dialect().limit_style() {
        LimitStyle::LimitOffset(offset_only_limit) => {
            if let Some(limit) = limit {
                sql.push_str(&format!(" limit {}", fmt.parameter(limit)?));
            } else if let (Some(literal), Some(_)) = (offset_only_limit, offset) {
                sql.push_str(&format!(" limit {}", literal));
            }
            if let Some(offset) = offset {
                sql.push_str(&format!(" offset {}", fmt.parameter(offset)?));
            }
        }
        LimitStyle::Top => {
            // Without an offset the limit was emitted as `top (?)`.
            if let Some(offset) = offset {
                if statement.orders.is_empty() {
                    sql.push_str(" order by (select 0)");
                }
                sql.push_str(&format!(" offset {} rows", fmt.parameter(offset)?));
                if let Some(limit) = limit {
                    sql.push_str(&format!(" fetch next {} rows only", fmt.parameter(limit)?));
                }
            }
        }
        LimitStyle::OffsetFetch => {
            if let Some(offset) = offset {
                sql.push_str(&format!(" offset {} rows", fmt.parameter(offset)?));
            }
            if let Some(limit) = limit {
                sql.push_str(&format!(" fetch next {} rows only", fmt.parameter(limit)?));
            }
        }
    }
    Ok(sql)
}

// =============================================================================
// Set operations and locks
// =============================================================================

fn render_unions(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let mut sql = String::new();
    for union in &statement.unions {
        let query = fmt.raw_or_query(&union.query)?;
        if union.wrap {
            sql.push_str(&format!(" {} ({})", union.op.keyword(), query));
        } else {
            sql.push_str(&format!(" {} {}", union.op.keyword(), query));
        }
    }
    Ok(sql)
}

fn lock_name(mode: LockMode) -> &'static str {
    match mode {
        LockMode::ForUpdate => "for update",
        LockMode::ForShare => "for share",
        LockMode::ForNoKeyUpdate => "for no key update",
        LockMode::ForKeyShare => "for key share",
    }
}

fn render_wait(statement: &Statement) -> &'static str {
    match statement.single.wait {
        Some(WaitMode::SkipLocked) => " skip locked",
        Some(WaitMode::NoWait) => " nowait",
        None => "",
    }
}

fn render_lock(statement: &Statement, fmt: &mut Formatter<'_>) -> Result<String> {
    let Some(lock) = &statement.single.lock else {
        if statement.single.wait.is_some() {
            return Err(crate::error::Error::validation(
                "skip_locked / no_wait can only be used after a lock mode",
            ));
        }
        return Ok(String::new());
    };

    match fmt.dialect().lock_style() {
        LockStyle::Postgres => {
            let mut sql = format!(" {}", lock_name(lock.mode));
            if !lock.tables.is_empty() {
                sql.push_str(&format!(" of {}", fmt.columnize_names(&lock.tables)));
            }
            sql.push_str(render_wait(statement));
            Ok(sql)
        }
        LockStyle::MySql => {
            let keyword = match lock.mode {
                LockMode::ForUpdate => "for update",
                LockMode::ForShare => "lock in share mode",
                other => return Err(unsupported(fmt, lock_name(other))),
            };
            Ok(format!(" {}{}", keyword, render_wait(statement)))
        }
        LockStyle::Oracle => match lock.mode {
            LockMode::ForUpdate => Ok(format!(" for update{}", render_wait(statement))),
            other => Err(unsupported(fmt, lock_name(other))),
        },
        // Rendered as a table hint in the from clause.
        LockStyle::MsSql => Ok(String::new()),
        LockStyle::Unsupported => Err(unsupported(fmt, lock_name(lock.mode))),
    }
}

fn mssql_lock_hint(statement: &Statement, fmt: &Formatter<'_>) -> Result<String> {
    let Some(lock) = &statement.single.lock else {
        return Ok(String::new());
    };
    let mut hints = vec![match lock.mode {
        LockMode::ForUpdate => "UPDLOCK",
        LockMode::ForShare => "HOLDLOCK",
        other => return Err(unsupported(fmt, lock_name(other))),
    }];
    match statement.single.wait {
        Some(WaitMode::SkipLocked) => hints.push("READPAST"),
        Some(WaitMode::NoWait) => hints.push("NOWAIT"),
        None => {}
    }
    Ok(format!(" with ({})", hints.join(", ")))
}
