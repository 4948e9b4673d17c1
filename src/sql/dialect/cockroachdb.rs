//! CockroachDB SQL dialect.
//!
//! A delta over Postgres:
//! - Native `upsert into`
//! - Plain `truncate` (no `restart identity`)
//! - Emulated NULLS FIRST/LAST
//! - `json_extract_path` with one argument per segment
//! - Unique constraints are dropped as indexes, and column type changes need
//!   an experimental session setting

use super::helpers;
use super::postgres::postgres_column_type;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::ColumnDef;
use crate::schema::dialect::{DdlSupport, KeyStyle, SchemaDialect, DDL_POSTGRES};
use crate::sql::escape::{EscapeRules, PostgresEscape};
use crate::sql::formatter::Formatter;

/// CockroachDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct CockroachDb;

const DDL_COCKROACH: DdlSupport = DdlSupport {
    keys: KeyStyle::Cockroach,
    experimental_alter: true,
    inherits: false,
    ..DDL_POSTGRES
};

impl SqlDialect for CockroachDb {
    fn name(&self) -> &'static str {
        "cockroachdb"
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

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::UpsertInto
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        OnConflictStyle::OnConflict
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::Postgres
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::ArrayPath {
            function: "json_extract_path",
            brackets_to_dots: true,
            cast: true,
        }
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_cte_materialization(&self) -> bool {
        true
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_COCKROACH
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &CockroachDb
    }

    fn supports_cancel(&self) -> bool {
        true
    }
}

impl SchemaDialect for CockroachDb {
    fn ddl(&self) -> DdlSupport {
        DDL_COCKROACH
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        postgres_column_type(column, fmt)
    }
}
