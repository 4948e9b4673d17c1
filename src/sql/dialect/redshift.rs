//! Amazon Redshift SQL dialect.
//!
//! Redshift speaks the Postgres wire protocol and shares its quoting and
//! placeholders, but lacks most of the write extensions:
//! - No RETURNING, no ON CONFLICT, no row locks
//! - `json_extract_path_text` with one argument per path segment
//! - No secondary indexes; index creation is skipped
//! - `identity(1,1)` instead of serial columns

use super::helpers;
use super::postgres::postgres_column_type;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{CreateLikeStyle, DdlSupport, SchemaDialect, DDL_POSTGRES};
use crate::sql::escape::{EscapeRules, PostgresEscape};
use crate::sql::formatter::Formatter;

/// Amazon Redshift SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Redshift;

const DDL_REDSHIFT: DdlSupport = DdlSupport {
    create_like: CreateLikeStyle::LikeParens,
    skip_indexes: true,
    alter_type_using: false,
    primary_forces_not_null: true,
    extensions: false,
    inherits: false,
    ..DDL_POSTGRES
};

impl SqlDialect for Redshift {
    fn name(&self) -> &'static str {
        "redshift"
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

    fn nulls_ordering(&self) -> NullsOrdering {
        NullsOrdering::Native
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::ArrayPath {
            function: "json_extract_path_text",
            brackets_to_dots: false,
            cast: false,
        }
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_POSTGRES
    }

    fn supports_deferrable(&self) -> bool {
        false
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &Redshift
    }

    fn supports_cancel(&self) -> bool {
        true
    }
}

impl SchemaDialect for Redshift {
    fn ddl(&self) -> DdlSupport {
        DDL_REDSHIFT
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        match &column.ty {
            ColumnType::Increments => "integer identity(1,1) primary key not null".to_string(),
            ColumnType::BigIncrements => "bigint identity(1,1) primary key not null".to_string(),
            ColumnType::Text
            | ColumnType::Binary(_)
            | ColumnType::Json
            | ColumnType::Jsonb => "varchar(max)".to_string(),
            ColumnType::Enum(_) => "varchar(255)".to_string(),
            ColumnType::Uuid => "char(36)".to_string(),
            _ => postgres_column_type(column, fmt),
        }
    }
}
