//! Oracle SQL dialect.
//!
//! Oracle features:
//! - ANSI identifier quoting, `:n` placeholders
//! - No `as` before table aliases
//! - OFFSET/FETCH pagination
//! - `insert all .. select 1 from dual` for multi-row inserts
//! - Booleans bound and stored as numbers
//! - PL/SQL blocks for existence guards, 30-character constraint names

use super::helpers;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{
    enum_check, AlterStyle, CommentStyle, CreateLikeStyle, DdlSupport, ExistenceCheck,
    IfExistsStyle, KeyStyle, Probe, RefreshStyle, RenameTableStyle, SchemaDialect,
};
use crate::sql::formatter::Formatter;
use crate::sql::value::Value;

/// Oracle SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Oracle;

const DDL_ORACLE: DdlSupport = DdlSupport {
    alter: AlterStyle::Oracle,
    keys: KeyStyle::Postgres,
    comments: CommentStyle::CommentOn,
    if_exists: IfExistsStyle::PlSql,
    create_like: CreateLikeStyle::AsSelectParens,
    rename_table: RenameTableStyle::Rename,
    refresh: RefreshStyle::DbmsMview,
    skip_indexes: false,
    experimental_alter: false,
    alter_type_using: false,
    primary_forces_not_null: false,
    default_before_null: true,
    column_position: false,
    schemas: false,
    extensions: false,
    table_options: false,
    inherits: false,
    max_identifier_length: Some(30),
};

impl SqlDialect for Oracle {
    fn name(&self) -> &'static str {
        "oracledb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn alias(&self, expr: &str, alias: &str) -> String {
        helpers::alias_space(expr, alias)
    }

    fn prep_binding(&self, value: &Value) -> Value {
        helpers::bool_as_number(value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Colon
    }

    fn empty_insert(&self) -> EmptyInsert {
        EmptyInsert::Unsupported
    }

    fn multi_row_insert(&self) -> MultiRowInsert {
        MultiRowInsert::InsertAll
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::TruncateTable
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::OffsetFetch
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::Oracle
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::Function("json_value")
    }

    fn like_style(&self) -> LikeStyle {
        LikeStyle::Lowered
    }

    fn emit_recursive_keyword(&self) -> bool {
        false
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_ORACLE
    }

    fn supports_deferrable(&self) -> bool {
        false
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &Oracle
    }

    fn begin_transaction(&self) -> &'static str {
        "SET TRANSACTION READ WRITE"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK"
    }
}

impl SchemaDialect for Oracle {
    fn ddl(&self) -> DdlSupport {
        DDL_ORACLE
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        let quoted = fmt.wrap_identifier(&column.name);
        match &column.ty {
            ColumnType::Increments => {
                "integer generated by default on null as identity primary key".to_string()
            }
            ColumnType::BigIncrements => {
                "number(20, 0) generated by default on null as identity primary key".to_string()
            }
            ColumnType::Integer(_) | ColumnType::MediumInteger => "integer".to_string(),
            ColumnType::TinyInteger | ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::BigInteger => "number(20, 0)".to_string(),
            ColumnType::Text => "clob".to_string(),
            ColumnType::String(length) => format!("varchar2({})", length),
            ColumnType::Floating { precision, .. } => format!("float({})", precision),
            ColumnType::Double { .. } => "float".to_string(),
            ColumnType::Decimal {
                precision: Some(p),
                scale,
            } => format!("decimal({}, {})", p, scale),
            ColumnType::Decimal { precision: None, .. } => "decimal".to_string(),
            ColumnType::Boolean => format!("number(1, 0) check ({} in ('0', '1'))", quoted),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { use_tz, precision }
            | ColumnType::Timestamp { use_tz, precision } => {
                let base = match precision {
                    Some(p) => format!("timestamp({})", p),
                    None => "timestamp".to_string(),
                };
                if *use_tz {
                    format!("{} with local time zone", base)
                } else {
                    base
                }
            }
            ColumnType::Time => "timestamp with local time zone".to_string(),
            ColumnType::Binary(_) => "blob".to_string(),
            ColumnType::Enum(values) => {
                let length = values.iter().map(|v| v.len()).max().unwrap_or(1).max(1);
                enum_check(&format!("varchar2({})", length), column, fmt)
            }
            ColumnType::Json | ColumnType::Jsonb => {
                format!("varchar2(4000) check ({} is json)", quoted)
            }
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::Specific(text) => text.clone(),
        }
    }

    fn check_regex(&self, column: &str, pattern: &str) -> Option<String> {
        Some(format!("REGEXP_LIKE({},{})", column, pattern))
    }

    fn has_table(&self, table: &str, schema: Option<&str>, _fmt: &Formatter<'_>) -> Probe {
        let (sql, bindings) = match schema {
            Some(owner) => (
                "select TABLE_NAME from ALL_TABLES where OWNER = ? and TABLE_NAME = ?",
                vec![owner.to_string(), table.to_string()],
            ),
            None => (
                "select TABLE_NAME from USER_TABLES where TABLE_NAME = ?",
                vec![table.to_string()],
            ),
        };
        Probe {
            sql: sql.to_string(),
            bindings,
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
        let mut sql =
            "select COLUMN_NAME from ALL_TAB_COLUMNS where TABLE_NAME = ? and COLUMN_NAME = ?"
                .to_string();
        let mut bindings = vec![table.to_string(), column.to_string()];
        if let Some(owner) = schema {
            sql.push_str(" and OWNER = ?");
            bindings.push(owner.to_string());
        }
        Probe {
            sql,
            bindings,
            check: ExistenceCheck::AnyRow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_column_types() {
        let client = Client::new(Dialect::Oracle);
        let fmt = Formatter::new(&client);
        let render = |name: &str, ty| Oracle.column_type(&ColumnDef::new(name, ty), &fmt);
        assert_eq!(
            render("active", ColumnType::Boolean),
            "number(1, 0) check (\"active\" in ('0', '1'))"
        );
        assert_eq!(
            render("doc", ColumnType::Json),
            "varchar2(4000) check (\"doc\" is json)"
        );
        assert_eq!(
            render("kind", ColumnType::Enum(vec!["ab".into(), "abcd".into()])),
            "varchar2(4) check (\"kind\" in ('ab', 'abcd'))"
        );
        assert_eq!(
            render(
                "at",
                ColumnType::Timestamp {
                    use_tz: true,
                    precision: None
                }
            ),
            "timestamp with local time zone"
        );
    }

    #[test]
    fn test_ddl_shortens_names() {
        assert_eq!(Oracle.ddl().max_identifier_length, Some(30));
        assert!(Oracle.ddl().default_before_null);
    }
}
