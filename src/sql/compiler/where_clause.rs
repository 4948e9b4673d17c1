//! Where, having and join-on conditions.

use super::json;
use crate::error::Result;
use crate::sql::dialect::strategy::LikeStyle;
use crate::sql::formatter::{operator, values_to_operands, Formatter};
use crate::sql::statement::{Condition, ConditionKind, InValues, JoinCondition, JoinOn};
use crate::sql::value::{Operand, Value};

/// Render conditions joined by their boolean operators, without a leading
/// keyword. Empty groups are skipped.
pub(crate) fn render_conditions(
    conditions: &[Condition],
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let mut out = String::new();
    for condition in conditions {
        let Some(text) = render_condition(condition, fmt)? else {
            continue;
        };
        if !out.is_empty() {
            out.push(' ');
            out.push_str(condition.bool_op.keyword());
            out.push(' ');
        }
        out.push_str(&text);
    }
    Ok(out)
}

fn not_prefix(not: bool) -> &'static str {
    if not {
        "not "
    } else {
        ""
    }
}

fn render_condition(condition: &Condition, fmt: &mut Formatter<'_>) -> Result<Option<String>> {
    let not = condition.not;
    let text = match &condition.kind {
        ConditionKind::Basic {
            column,
            operator: op,
            value,
        } => {
            let column = fmt.wrap(column)?;
            let op = operator(op)?;
            let value = if op == "in" || op == "not in" {
                fmt.values(value)?
            } else {
                fmt.parameter(value)?
            };
            format!("{}{} {} {}", not_prefix(not), column, op, value)
        }
        ConditionKind::Raw(raw) => format!("{}{}", not_prefix(not), raw.render(fmt)?),
        ConditionKind::Wrapped(deferred) => {
            let qb = deferred.build();
            let inner = render_conditions(&qb.statement().wheres, fmt)?;
            if inner.is_empty() {
                return Ok(None);
            }
            format!("{}({})", not_prefix(not), inner)
        }
        ConditionKind::In { columns, values } => render_in(columns, values, not, fmt)?,
        ConditionKind::Null { column } => {
            let column = fmt.wrap(column)?;
            format!("{} is {}null", column, not_prefix(not))
        }
        ConditionKind::Exists { query } => {
            format!("{}exists ({})", not_prefix(not), fmt.raw_or_query(query)?)
        }
        ConditionKind::Between { column, low, high } => {
            let column = fmt.wrap(column)?;
            let low = fmt.parameter(low)?;
            let high = fmt.parameter(high)?;
            format!("{} {}between {} and {}", column, not_prefix(not), low, high)
        }
        ConditionKind::Column {
            left,
            operator: op,
            right,
        } => {
            let left = fmt.wrap(left)?;
            let op = operator(op)?;
            let right = fmt.wrap(right)?;
            format!("{}{} {} {}", not_prefix(not), left, op, right)
        }
        ConditionKind::Like {
            column,
            value,
            case_insensitive,
        } => format!(
            "{}{}",
            not_prefix(not),
            render_like(column, value, *case_insensitive, fmt)?
        ),
        ConditionKind::JsonPath {
            column,
            path,
            operator: op,
            value,
        } => format!(
            "{}{}",
            not_prefix(not),
            json::where_json_path(column, path, op, value, fmt)?
        ),
    };
    Ok(Some(text))
}

fn render_in(
    columns: &[Operand],
    values: &InValues,
    not: bool,
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    // An empty list matches nothing (or everything, negated).
    if let InValues::List(items) = values {
        if items.is_empty() {
            return Ok(if not { "1 = 1" } else { "1 = 0" }.to_string());
        }
    }

    let keyword = if not { "not in" } else { "in" };
    let column = if columns.len() > 1 {
        format!("({})", fmt.columnize(columns)?)
    } else {
        match columns.first() {
            Some(column) => fmt.wrap(column)?,
            None => String::new(),
        }
    };
    let values = match values {
        InValues::List(items) => fmt.values(&Operand::Value(Value::Array(items.clone())))?,
        InValues::Query(query) => fmt.values(query)?,
    };
    Ok(format!("{} {} {}", column, keyword, values))
}

fn render_like(
    column: &Operand,
    value: &Operand,
    case_insensitive: bool,
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let column = fmt.wrap(column)?;
    let style = fmt.dialect().like_style();
    Ok(match (style, case_insensitive) {
        (LikeStyle::Standard, false) => format!("{} like {}", column, fmt.parameter(value)?),
        (LikeStyle::Standard, true) => format!("{} ilike {}", column, fmt.parameter(value)?),
        (LikeStyle::MySql, false) => {
            format!("{} like {} COLLATE utf8_bin", column, fmt.parameter(value)?)
        }
        (LikeStyle::MySql, true) => format!("{} like {}", column, fmt.parameter(value)?),
        (LikeStyle::MsSql, false) => format!(
            "{} collate SQL_Latin1_General_CP1_CS_AS like {}",
            column,
            fmt.parameter(value)?
        ),
        (LikeStyle::MsSql, true) => format!(
            "{} collate SQL_Latin1_General_CP1_CI_AS like {}",
            column,
            fmt.parameter(value)?
        ),
        (LikeStyle::Lowered, false) => format!("{} like {}", column, fmt.parameter(value)?),
        (LikeStyle::Lowered, true) => {
            format!("lower({}) like lower({})", column, fmt.parameter(value)?)
        }
    })
}

// =============================================================================
// Join conditions
// =============================================================================

/// Render `on` conditions of a join.
pub(crate) fn render_join_conditions(
    conditions: &[JoinCondition],
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let mut out = String::new();
    for condition in conditions {
        let text = render_join_condition(condition, fmt)?;
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
            out.push_str(condition.bool_op.keyword());
            out.push(' ');
        }
        out.push_str(&text);
    }
    Ok(out)
}

fn render_join_condition(condition: &JoinCondition, fmt: &mut Formatter<'_>) -> Result<String> {
    let not = condition.not;
    Ok(match &condition.kind {
        JoinOn::On {
            first,
            operator: op,
            second,
        } => {
            let first = fmt.wrap(first)?;
            let op = operator(op)?;
            let second = fmt.wrap(second)?;
            format!("{}{} {} {}", not_prefix(not), first, op, second)
        }
        JoinOn::Val {
            column,
            operator: op,
            value,
        } => {
            let column = fmt.wrap(column)?;
            let op = operator(op)?;
            let value = fmt.parameter(value)?;
            format!("{}{} {} {}", not_prefix(not), column, op, value)
        }
        JoinOn::In { column, values } => {
            let column = fmt.wrap(column)?;
            let keyword = if not { "not in" } else { "in" };
            let values = fmt.parameterize(&values_to_operands(values))?;
            format!("{} {} ({})", column, keyword, values)
        }
        JoinOn::Null { column } => {
            let column = fmt.wrap(column)?;
            format!("{} is {}null", column, not_prefix(not))
        }
        JoinOn::Between { column, low, high } => {
            let column = fmt.wrap(column)?;
            let low = fmt.parameter(low)?;
            let high = fmt.parameter(high)?;
            format!("{} {}between {} and {}", column, not_prefix(not), low, high)
        }
        JoinOn::Exists { query } => {
            format!("{}exists ({})", not_prefix(not), fmt.raw_or_query(query)?)
        }
        JoinOn::Raw(raw) => format!("{}{}", not_prefix(not), raw.render(fmt)?),
        JoinOn::Group(inner) => {
            let inner = render_join_conditions(inner, fmt)?;
            if inner.is_empty() {
                String::new()
            } else {
                format!("{}({})", not_prefix(not), inner)
            }
        }
    })
}

/// Keyword preceding a condition group.
pub(crate) fn clause(keyword: &str, body: String) -> String {
    if body.is_empty() {
        body
    } else {
        format!(" {} {}", keyword, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::sql::builder::QueryBuilder;
    use crate::sql::dialect::Dialect;

    fn render(qb: &QueryBuilder, dialect: Dialect) -> (String, Vec<Value>) {
        let client = Client::new(dialect);
        let mut fmt = Formatter::new(&client);
        let sql = render_conditions(&qb.statement().wheres, &mut fmt).unwrap();
        (sql, fmt.into_bindings())
    }

    #[test]
    fn test_or_and_not_chaining() {
        let mut qb = QueryBuilder::new();
        qb.where_("a", 1).or_where("b", 2).where_not("c", 3);
        let (sql, bindings) = render(&qb, Dialect::Postgres);
        assert_eq!(sql, "\"a\" = ? or \"b\" = ? and not \"c\" = ?");
        assert_eq!(bindings, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_grouped_conditions() {
        let mut qb = QueryBuilder::new();
        qb.where_("a", 1).or_where_group(|q| {
            q.where_("b", 2).where_op("c", ">", 3);
        });
        let (sql, _) = render(&qb, Dialect::Postgres);
        assert_eq!(sql, "\"a\" = ? or (\"b\" = ? and \"c\" > ?)");
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut qb = QueryBuilder::new();
        qb.where_group(|_| {}).where_("a", 1);
        let (sql, _) = render(&qb, Dialect::Postgres);
        assert_eq!(sql, "\"a\" = ?");
    }

    #[test]
    fn test_in_variants() {
        let mut qb = QueryBuilder::new();
        qb.where_in("id", [1, 2, 3])
            .where_not_in("role", Vec::<Value>::new())
            .where_in_tuple(
                ["a", "b"],
                vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3), Value::Int(4)]],
            );
        let (sql, bindings) = render(&qb, Dialect::MySql);
        assert_eq!(
            sql,
            "`id` in (?, ?, ?) and 1 = 1 and (`a`, `b`) in ((?, ?), (?, ?))"
        );
        assert_eq!(bindings.len(), 7);
    }

    #[test]
    fn test_like_styles() {
        let mut qb = QueryBuilder::new();
        qb.where_like("name", "a%").where_ilike("name", "b%");
        assert_eq!(
            render(&qb, Dialect::Postgres).0,
            "\"name\" like ? and \"name\" ilike ?"
        );
        assert_eq!(
            render(&qb, Dialect::MySql).0,
            "`name` like ? COLLATE utf8_bin and `name` like ?"
        );
        assert_eq!(
            render(&qb, Dialect::MsSql).0,
            "[name] collate SQL_Latin1_General_CP1_CS_AS like ? and [name] collate SQL_Latin1_General_CP1_CI_AS like ?"
        );
    }

    #[test]
    fn test_invalid_operator_rejected() {
        let mut qb = QueryBuilder::new();
        qb.where_op("a", "; drop table x", 1);
        let client = Client::default();
        let mut fmt = Formatter::new(&client);
        assert!(render_conditions(&qb.statement().wheres, &mut fmt).is_err());
    }
}
