//! SQL Server dialect.
//!
//! SQL Server has significant differences from ANSI:
//! - Square bracket identifier quoting (`[name]`)
//! - `@p0` placeholders
//! - TOP for simple limiting, OFFSET FETCH once an offset is present
//! - OUTPUT instead of RETURNING
//! - Table hints instead of row lock clauses
//! - No RECURSIVE keyword for recursive CTEs
//! - `object_id` guards instead of `if [not] exists`, `sp_rename` for renames

use super::helpers;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{
    enum_check, AlterStyle, CommentStyle, CreateLikeStyle, DdlSupport, ExistenceCheck,
    IfExistsStyle, KeyStyle, Probe, RefreshStyle, RenameTableStyle, SchemaDialect,
};
use crate::sql::formatter::Formatter;

/// SQL Server dialect.
#[derive(Debug, Clone, Copy)]
pub struct MsSql;

const DDL_MSSQL: DdlSupport = DdlSupport {
    alter: AlterStyle::MsSql,
    keys: KeyStyle::MsSql,
    comments: CommentStyle::ExtendedProperty,
    if_exists: IfExistsStyle::ObjectId,
    create_like: CreateLikeStyle::SelectInto,
    rename_table: RenameTableStyle::SpRename,
    refresh: RefreshStyle::Statement,
    skip_indexes: false,
    experimental_alter: false,
    alter_type_using: false,
    primary_forces_not_null: false,
    default_before_null: false,
    column_position: false,
    schemas: false,
    extensions: false,
    table_options: false,
    inherits: false,
    max_identifier_length: None,
};

impl SqlDialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtP
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Output
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::TruncateTable
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Top
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::MsSql
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::Function("JSON_VALUE")
    }

    fn like_style(&self) -> LikeStyle {
        LikeStyle::MsSql
    }

    fn emit_recursive_keyword(&self) -> bool {
        false
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_MSSQL
    }

    fn supports_deferrable(&self) -> bool {
        false
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &MsSql
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN TRANSACTION;"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT TRANSACTION;"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK TRANSACTION;"
    }
}

impl SchemaDialect for MsSql {
    fn ddl(&self) -> DdlSupport {
        DDL_MSSQL
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        match &column.ty {
            ColumnType::Increments => "int identity(1,1) not null primary key".to_string(),
            ColumnType::BigIncrements => "bigint identity(1,1) not null primary key".to_string(),
            ColumnType::Integer(_) | ColumnType::MediumInteger => "int".to_string(),
            ColumnType::TinyInteger => "tinyint".to_string(),
            ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::Text | ColumnType::Json | ColumnType::Jsonb => "nvarchar(max)".to_string(),
            ColumnType::String(length) => format!("nvarchar({})", length),
            ColumnType::Floating { .. } | ColumnType::Double { .. } => "float".to_string(),
            ColumnType::Decimal {
                precision: Some(p),
                scale,
            } => format!("decimal({}, {})", p, scale),
            ColumnType::Decimal { precision: None, .. } => "decimal".to_string(),
            ColumnType::Boolean => "bit".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { use_tz, precision }
            | ColumnType::Timestamp { use_tz, precision } => {
                let base = if *use_tz { "datetimeoffset" } else { "datetime2" };
                match precision {
                    Some(p) => format!("{}({})", base, p),
                    None => base.to_string(),
                }
            }
            ColumnType::Time => "time".to_string(),
            ColumnType::Binary(Some(length)) => format!("varbinary({})", length),
            ColumnType::Binary(None) => "varbinary(max)".to_string(),
            ColumnType::Enum(_) => enum_check("nvarchar(100)", column, fmt),
            ColumnType::Uuid => "uniqueidentifier".to_string(),
            ColumnType::Specific(text) => text.clone(),
        }
    }

    fn check_regex(&self, _column: &str, _pattern: &str) -> Option<String> {
        None
    }

    fn length_function(&self) -> &'static str {
        "LEN"
    }

    fn has_table(&self, table: &str, schema: Option<&str>, _fmt: &Formatter<'_>) -> Probe {
        Probe {
            sql: "select object_id from sys.tables where object_id = object_id(?)".to_string(),
            bindings: vec![object_path(table, schema)],
            check: ExistenceCheck::AnyRow,
        }
    }

    fn has_column(
        &self,
        table: &str,
        column: &str,
        schema: Option<&str>,
        _fmt: &Formatter<'_>,
    ) -> Probe {
        Probe {
            sql: "select object_id from sys.columns where name = ? and object_id = object_id(?)"
                .to_string(),
            bindings: vec![column.to_string(), object_path(table, schema)],
            check: ExistenceCheck::AnyRow,
        }
    }
}

fn object_path(table: &str, schema: Option<&str>) -> String {
    match schema {
        Some(schema) => format!("{}.{}", schema, table),
        None => table.to_string(),
    }
}
