//! MySQL SQL dialect.
//!
//! MySQL features:
//! - Backtick identifier quoting
//! - Backslash string escaping
//! - `insert ignore` / `on duplicate key update`
//! - LIMIT with a huge literal when only an offset is given
//! - Case sensitivity through collations
//! - Inline column comments, column placement and table options in DDL

use super::helpers;
use super::strategy::*;
use super::SqlDialect;
use crate::schema::column::{ColumnDef, ColumnType};
use crate::schema::dialect::{
    AlterStyle, CommentStyle, CreateLikeStyle, DdlSupport, IfExistsStyle, KeyStyle, Probe,
    RefreshStyle, RenameTableStyle, SchemaDialect, ExistenceCheck,
};
use crate::sql::escape::{BackslashEscape, EscapeRules};
use crate::sql::formatter::Formatter;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

const DDL_MYSQL: DdlSupport = DdlSupport {
    alter: AlterStyle::MySql,
    keys: KeyStyle::MySql,
    comments: CommentStyle::Inline,
    if_exists: IfExistsStyle::Native,
    create_like: CreateLikeStyle::Like,
    rename_table: RenameTableStyle::RenameTable,
    refresh: RefreshStyle::Statement,
    skip_indexes: false,
    experimental_alter: false,
    alter_type_using: false,
    primary_forces_not_null: false,
    default_before_null: false,
    column_position: true,
    schemas: false,
    extensions: false,
    table_options: true,
    inherits: false,
    max_identifier_length: None,
};

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn escape_rules(&self) -> &'static dyn EscapeRules {
        &BackslashEscape
    }

    fn empty_insert(&self) -> EmptyInsert {
        EmptyInsert::EmptyValues
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        OnConflictStyle::OnDuplicateKey
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::TruncateTable
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset(Some("18446744073709551615"))
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::MySql
    }

    fn like_style(&self) -> LikeStyle {
        LikeStyle::MySql
    }

    fn view_support(&self) -> ViewSupport {
        helpers::VIEWS_MYSQL
    }

    fn supports_deferrable(&self) -> bool {
        false
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        &MySql
    }

    fn supports_cancel(&self) -> bool {
        true
    }
}

impl SchemaDialect for MySql {
    fn ddl(&self) -> DdlSupport {
        DDL_MYSQL
    }

    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
        let base = match &column.ty {
            ColumnType::Increments => {
                return "int unsigned not null auto_increment primary key".to_string()
            }
            ColumnType::BigIncrements => {
                return "bigint unsigned not null auto_increment primary key".to_string()
            }
            ColumnType::Integer(Some(width)) => format!("int({})", width),
            ColumnType::Integer(None) => "int".to_string(),
            ColumnType::TinyInteger => "tinyint".to_string(),
            ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::MediumInteger => "mediumint".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::String(length) => format!("varchar({})", length),
            ColumnType::Floating { precision, scale } => format!("float({}, {})", precision, scale),
            ColumnType::Double {
                precision: Some(p),
                scale: Some(s),
            } => format!("double({}, {})", p, s),
            ColumnType::Double { .. } => "double".to_string(),
            ColumnType::Decimal {
                precision: Some(p),
                scale,
            } => format!("decimal({}, {})", p, scale),
            ColumnType::Decimal { precision: None, .. } => "decimal".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::DateTime { precision, .. } => with_precision("datetime", *precision),
            ColumnType::Timestamp { precision, .. } => with_precision("timestamp", *precision),
            ColumnType::Time => "time".to_string(),
            ColumnType::Binary(Some(length)) => format!("varbinary({})", length),
            ColumnType::Binary(None) => "blob".to_string(),
            ColumnType::Enum(values) => {
                let rules = fmt.dialect().escape_rules();
                let list: Vec<String> = values.iter().map(|v| rules.escape_string(v)).collect();
                format!("enum({})", list.join(", "))
            }
            ColumnType::Json | ColumnType::Jsonb => "json".to_string(),
            ColumnType::Uuid => "char(36)".to_string(),
            ColumnType::Specific(text) => text.clone(),
        };
        if column.unsigned && is_numeric(&column.ty) {
            format!("{} unsigned", base)
        } else {
            base
        }
    }

    fn check_regex(&self, column: &str, pattern: &str) -> Option<String> {
        Some(format!("{} REGEXP {}", column, pattern))
    }

    fn has_table(&self, table: &str, schema: Option<&str>, _fmt: &Formatter<'_>) -> Probe {
        information_schema("tables", table, None, schema)
    }

    fn has_column(
        &self,
        table: &str,
        column: &str,
        schema: Option<&str>,
        _fmt: &Formatter<'_>,
    ) -> Probe {
        information_schema("columns", table, Some(column), schema)
    }
}

fn with_precision(base: &str, precision: Option<u32>) -> String {
    match precision {
        Some(p) => format!("{}({})", base, p),
        None => base.to_string(),
    }
}

fn is_numeric(ty: &ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::Integer(_)
            | ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::MediumInteger
            | ColumnType::BigInteger
            | ColumnType::Floating { .. }
            | ColumnType::Double { .. }
            | ColumnType::Decimal { .. }
    )
}

/// Probe against `information_schema`, scoped to the connection's database
/// unless a schema is given.
fn information_schema(
    view: &str,
    table: &str,
    column: Option<&str>,
    schema: Option<&str>,
) -> Probe {
    let mut sql = format!("select * from information_schema.{} where table_name = ?", view);
    let mut bindings = vec![table.to_string()];
    if let Some(column) = column {
        sql.push_str(" and column_name = ?");
        bindings.push(column.to_string());
    }
    match schema {
        Some(schema) => {
            sql.push_str(" and table_schema = ?");
            bindings.push(schema.to_string());
        }
        None => sql.push_str(" and table_schema = database()"),
    }
    Probe {
        sql,
        bindings,
        check: ExistenceCheck::AnyRow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_column_types() {
        let client = Client::new(Dialect::MySql);
        let fmt = Formatter::new(&client);

        let mut col = ColumnDef::new("n", ColumnType::Integer(None));
        col.unsigned = true;
        assert_eq!(MySql.column_type(&col, &fmt), "int unsigned");

        let col = ColumnDef::new(
            "mood",
            ColumnType::Enum(vec!["happy".into(), "it's ok".into()]),
        );
        assert_eq!(MySql.column_type(&col, &fmt), "enum('happy', 'it\\'s ok')");

        let col = ColumnDef::new("f", ColumnType::Floating { precision: 8, scale: 2 });
        assert_eq!(MySql.column_type(&col, &fmt), "float(8, 2)");

        // unsigned only applies to numbers
        let mut col = ColumnDef::new("s", ColumnType::String(10));
        col.unsigned = true;
        assert_eq!(MySql.column_type(&col, &fmt), "varchar(10)");
    }

    #[test]
    fn test_has_table_uses_current_database() {
        let client = Client::new(Dialect::MySql);
        let fmt = Formatter::new(&client);
        let probe = MySql.has_table("users", None, &fmt);
        assert_eq!(
            probe.sql,
            "select * from information_schema.tables where table_name = ? and table_schema = database()"
        );
        assert_eq!(probe.bindings, vec!["users"]);
    }
}
