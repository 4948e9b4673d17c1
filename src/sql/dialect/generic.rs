//! Generic SQL dialect.
//!
//! Used when no client is configured for a specific database. Supports the
//! least: every optional capability falls back to the trait defaults, and
//! DDL follows the Postgres shapes with SQLite-like column types.

use super::helpers;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{enum_check, DdlSupport, SchemaDialect, DDL_POSTGRES};
use crate::sql::escape::{BackslashEscape, EscapeRules};
use crate::sql::formatter::Formatter;

/// Generic SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Generic;

const DDL_GENERIC: DdlSupport = DdlSupport {
    extensions: false,
    inherits: false,
    ..DDL_POSTGRES
};

impl SqlDialect for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn escape_rules(&self) -> &'static dyn EscapeRules {
        &BackslashEscape
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &Generic
    }
}

impl SchemaDialect for Generic {
    fn ddl(&self) -> DdlSupport {
        DDL_GENERIC
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        match &column.ty {
            ColumnType::Increments | ColumnType::BigIncrements => {
                "integer not null primary key autoincrement".to_string()
            }
            ColumnType::Integer(_)
            | ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::MediumInteger => "integer".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::Text | ColumnType::Json | ColumnType::Jsonb => "text".to_string(),
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
            ColumnType::DateTime { .. } | ColumnType::Timestamp { .. } => "datetime".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::Binary(_) => "blob".to_string(),
            ColumnType::Enum(_) => enum_check("text", column, fmt),
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::Specific(text) => text.clone(),
        }
    }
}
