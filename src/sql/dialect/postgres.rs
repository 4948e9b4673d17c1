//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - ANSI identifier quoting (`"`)
//! - `$n` placeholders
//! - RETURNING clause and ON CONFLICT
//! - DISTINCT ON, `materialized` CTEs, native NULLS FIRST/LAST
//! - `jsonb_path_query_first` for JSON paths
//! - Every row lock mode, deferrable constraints, query cancelling

use super::helpers;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{enum_check, DdlSupport, SchemaDialect, DDL_POSTGRES};
use crate::sql::escape::{EscapeRules, PostgresEscape};
use crate::sql::formatter::Formatter;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn escape_rules(&self) -> &'static dyn EscapeRules {
        &PostgresEscape
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        OnConflictStyle::OnConflict
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::RestartIdentity
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::Postgres
    }

    fn nulls_ordering(&self) -> NullsOrdering {
        NullsOrdering::Native
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::PathQuery
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_cte_materialization(&self) -> bool {
        true
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_POSTGRES
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &Postgres
    }

    fn supports_cancel(&self) -> bool {
        true
    }
}

impl SchemaDialect for Postgres {
    fn ddl(&self) -> DdlSupport {
        DDL_POSTGRES
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        postgres_column_type(column, fmt)
    }
}

/// `timestamp` / `timestamptz` with an optional precision.
fn timestamp(use_tz: bool, precision: Option<u32>) -> String {
    let base = if use_tz { "timestamptz" } else { "timestamp" };
    match precision {
        Some(p) => format!("{}({})", base, p),
        None => base.to_string(),
    }
}

/// Column types shared by the Postgres family.
pub(super) fn postgres_column_type(column: &ColumnDef, fmt: &Formatter<'_>) -> String {
    match &column.ty {
        ColumnType::Increments => "serial primary key".to_string(),
        ColumnType::BigIncrements => "bigserial primary key".to_string(),
        ColumnType::Integer(_) | ColumnType::MediumInteger => "integer".to_string(),
        ColumnType::TinyInteger | ColumnType::SmallInteger => "smallint".to_string(),
        ColumnType::BigInteger => "bigint".to_string(),
        ColumnType::Text => "text".to_string(),
        ColumnType::String(length) => format!("varchar({})", length),
        ColumnType::Floating { .. } => "real".to_string(),
        ColumnType::Double { .. } => "double precision".to_string(),
        ColumnType::Decimal {
            precision: Some(p),
            scale,
        } => format!("decimal({}, {})", p, scale),
        ColumnType::Decimal { precision: None, .. } => "decimal".to_string(),
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::DateTime { use_tz, precision }
        | ColumnType::Timestamp { use_tz, precision } => {
            timestamp(*use_tz, *precision)
        }
        ColumnType::Time => "time".to_string(),
        ColumnType::Binary(_) => "bytea".to_string(),
        ColumnType::Enum(_) => enum_check("text", column, fmt),
        ColumnType::Json => "json".to_string(),
        ColumnType::Jsonb => "jsonb".to_string(),
        ColumnType::Uuid => "uuid".to_string(),
        ColumnType::Specific(text) => text.clone(),
    }
}
