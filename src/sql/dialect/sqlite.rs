//! SQLite SQL dialect.
//!
//! SQLite features:
//! - Backtick identifier quoting
//! - No `DEFAULT` keyword inside multi-row inserts
//! - `limit -1 offset ?` when only an offset is given
//! - `delete from` instead of truncate
//! - Most table alterations rebuild the table through a temporary copy

use super::helpers;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{
    enum_check, AlterStyle, CommentStyle, CreateLikeStyle, DdlSupport, ExistenceCheck,
    IfExistsStyle, KeyStyle, Probe, RefreshStyle, RenameTableStyle, SchemaDialect,
};
use crate::sql::formatter::Formatter;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite3;

const DDL_SQLITE: DdlSupport = DdlSupport {
    alter: AlterStyle::Sqlite,
    keys: KeyStyle::Sqlite,
    comments: CommentStyle::Ignored,
    if_exists: IfExistsStyle::Native,
    create_like: CreateLikeStyle::AsSelect,
    rename_table: RenameTableStyle::AlterRenameTo,
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

impl SqlDialect for Sqlite3 {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn default_marker(&self) -> DefaultMarker {
        DefaultMarker::Unsupported
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        OnConflictStyle::OnConflict
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Returning
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::DeleteFrom
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset(Some("-1"))
    }

    fn supports_cte_materialization(&self) -> bool {
        true
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_SQLITE
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &Sqlite3
    }
}

impl SchemaDialect for Sqlite3 {
    fn ddl(&self) -> DdlSupport {
        DDL_SQLITE
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        match &column.ty {
            ColumnType::Increments | ColumnType::BigIncrements => {
                "integer not null primary key autoincrement".to_string()
            }
            ColumnType::Integer(_) | ColumnType::SmallInteger | ColumnType::MediumInteger => {
                "integer".to_string()
            }
            ColumnType::TinyInteger => "tinyint".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::String(length) => format!("varchar({})", length),
            ColumnType::Floating { .. }
            | ColumnType::Double { .. }
            | ColumnType::Decimal { .. } => {
                "float".to_string()
            }
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { .. } | ColumnType::Timestamp { .. } => "datetime".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::Binary(_) => "blob".to_string(),
            ColumnType::Enum(_) => enum_check("text", column, fmt),
            ColumnType::Json | ColumnType::Jsonb => "json".to_string(),
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::Specific(text) => text.clone(),
        }
    }

    fn check_regex(&self, column: &str, pattern: &str) -> Option<String> {
        Some(format!("{} REGEXP {}", column, pattern))
    }

    fn has_table(&self, table: &str, _schema: Option<&str>, _fmt: &Formatter<'_>) -> Probe {
        Probe {
            sql: "select * from sqlite_master where type = 'table' and name = ?".to_string(),
            bindings: vec![table.to_string()],
            check: ExistenceCheck::AnyRow,
        }
    }

    fn has_column(
        &self,
        table: &str,
        column: &str,
        _schema: Option<&str>,
        fmt: &Formatter<'_>,
    ) -> Probe {
        Probe {
            sql: format!("PRAGMA table_info({})", fmt.wrap_identifier(table)),
            bindings: Vec::new(),
            check: ExistenceCheck::NamedRow(column.to_string()),
        }
    }
}
