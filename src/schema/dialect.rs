//! DDL rendering rules.
//!
//! Like the query side, DDL differences are expressed as capability
//! strategies grouped in [`DdlSupport`]. A dialect picks one value per
//! strategy and maps column types; everything else is shared.

use crate::sql::formatter::Formatter;

use super::column::{ColumnDef, ColumnType};

/// How columns are added, altered, dropped and renamed on an existing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterStyle {
    /// `add column ..`, `alter column .. type ..`, `rename a to b`.
    Postgres,
    /// `add ..`, `modify .. <definition>`, `rename column a to b`.
    MySql,
    /// `add column ..`; anything else rebuilds the table.
    Sqlite,
    /// `add ..`, `alter column .. <type> [not ]null`, `exec sp_rename`.
    MsSql,
    /// `add (..)`, `modify (..)`, `drop (..)`, `rename column a to b`.
    Oracle,
}

/// How indexes and keys are created and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `create index`, constraints through `alter table .. add constraint`.
    Postgres,
    /// Postgres, except unique constraints are dropped as indexes.
    Cockroach,
    /// `alter table .. add index|unique|primary key`.
    MySql,
    /// `create [unique] index`; foreign keys inline in `create table`.
    Sqlite,
    /// `create [unique] index .. on`, `drop index .. on ..`.
    MsSql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `comment on table|column .. is '..'`.
    CommentOn,
    /// `comment '..'` on the column, `comment = '..'` on the table.
    Inline,
    /// `exec sp_addextendedproperty`.
    ExtendedProperty,
    /// Comments are dropped with a warning.
    Ignored,
}

/// How `if exists` / `if not exists` guards are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExistsStyle {
    Native,
    /// `if object_id('t', 'U') is [not ]null ..`.
    ObjectId,
    /// A PL/SQL block swallowing the "already exists" / "does not exist" error.
    PlSql,
}

/// `create table a like b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateLikeStyle {
    /// `create table a (like b including all)`.
    LikeIncludingAll,
    /// `create table a (like b)`.
    LikeParens,
    /// `create table a like b`.
    Like,
    /// `create table a as select * from b where 0=1`.
    AsSelect,
    /// `create table a as (select * from b where 0=1)`.
    AsSelectParens,
    /// `select * into a from b where 0=1`.
    SelectInto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameTableStyle {
    /// `alter table a rename to b`.
    AlterRenameTo,
    /// `rename table a to b`.
    RenameTable,
    /// `rename a to b`.
    Rename,
    /// `exec sp_rename ?, ?`.
    SpRename,
}

/// How a materialized view is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStyle {
    /// `refresh materialized view v`.
    Statement,
    /// `BEGIN DBMS_MVIEW.REFRESH('v'); END;`.
    DbmsMview,
}

/// DDL capability set of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdlSupport {
    pub alter: AlterStyle,
    pub keys: KeyStyle,
    pub comments: CommentStyle,
    pub if_exists: IfExistsStyle,
    pub create_like: CreateLikeStyle,
    pub rename_table: RenameTableStyle,
    pub refresh: RefreshStyle,
    /// Index creation is skipped with a warning.
    pub skip_indexes: bool,
    /// Column type changes are preceded by a session flag statement.
    pub experimental_alter: bool,
    /// `using (c::type)` when changing a column type.
    pub alter_type_using: bool,
    /// Primary key columns are forced `not null`.
    pub primary_forces_not_null: bool,
    /// `default` is rendered before the nullability modifier.
    pub default_before_null: bool,
    /// `first` / `after` column placement.
    pub column_position: bool,
    /// `create schema` / `drop schema`.
    pub schemas: bool,
    /// `create extension` / `drop extension`.
    pub extensions: bool,
    /// `engine`, `charset` and `collate` table options.
    pub table_options: bool,
    /// `inherits (parent)` on create.
    pub inherits: bool,
    /// Generated key names are shortened to this many characters.
    pub max_identifier_length: Option<usize>,
}

pub const DDL_POSTGRES: DdlSupport = DdlSupport {
    alter: AlterStyle::Postgres,
    keys: KeyStyle::Postgres,
    comments: CommentStyle::CommentOn,
    if_exists: IfExistsStyle::Native,
    create_like: CreateLikeStyle::LikeIncludingAll,
    rename_table: RenameTableStyle::AlterRenameTo,
    refresh: RefreshStyle::Statement,
    skip_indexes: false,
    experimental_alter: false,
    alter_type_using: true,
    primary_forces_not_null: false,
    default_before_null: false,
    column_position: false,
    schemas: true,
    extensions: true,
    table_options: false,
    inherits: true,
    max_identifier_length: None,
};

/// How a table existence or column existence probe is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistenceCheck {
    /// Any returned row means "exists".
    AnyRow,
    /// A returned row whose `name` field matches (case-insensitively).
    NamedRow(String),
}

/// A probe query with its positional bindings.
#[derive(Debug, Clone)]
pub struct Probe {
    pub sql: String,
    pub bindings: Vec<String>,
    pub check: ExistenceCheck,
}

/// DDL rendering rules for one dialect.
pub trait SchemaDialect: Send + Sync {
    /// DDL capability set.
    fn ddl(&self) -> DdlSupport;

    /// Type text for a column, including `unsigned` where the dialect has it.
    ///
    /// Auto-increment types carry their own key clause (`serial primary key`).
    fn column_type(&self, column: &ColumnDef, fmt: &Formatter<'_>) -> String;

    /// Whether the type text already makes the column a primary key.
    fn is_increments(&self, column: &ColumnDef) -> bool {
        matches!(
            column.ty,
            ColumnType::Increments | ColumnType::BigIncrements
        )
    }

    /// `check` body for a regular expression constraint, `None` when the
    /// dialect has no regex matching.
    fn check_regex(&self, column: &str, pattern: &str) -> Option<String> {
        Some(format!("{} ~ {}", column, pattern))
    }

    /// Function measuring string length in check constraints.
    fn length_function(&self) -> &'static str {
        "length"
    }

    /// Query answering `has_table`.
    fn has_table(&self, table: &str, schema: Option<&str>, _fmt: &Formatter<'_>) -> Probe {
        let mut sql = "select * from information_schema.tables where table_name = ?".to_string();
        let mut bindings = vec![table.to_string()];
        match schema {
            Some(schema) => {
                sql.push_str(" and table_schema = ?");
                bindings.push(schema.to_string());
            }
            None => sql.push_str(" and table_schema = current_schema()"),
        }
        Probe {
            sql,
            bindings,
            check: ExistenceCheck::AnyRow,
        }
    }

    /// Query answering `has_column`.
    fn has_column(
        &self,
        table: &str,
        column: &str,
        schema: Option<&str>,
        _fmt: &Formatter<'_>,
    ) -> Probe {
        let mut sql = "select * from information_schema.columns where table_name = ? and column_name = ?"
            .to_string();
        let mut bindings = vec![table.to_string(), column.to_string()];
        match schema {
            Some(schema) => {
                sql.push_str(" and table_schema = ?");
                bindings.push(schema.to_string());
            }
            None => sql.push_str(" and table_schema = current_schema()"),
        }
        Probe {
            sql,
            bindings,
            check: ExistenceCheck::AnyRow,
        }
    }
}

/// Inline `check (col in (..))` used by dialects without a native enum type.
pub(crate) fn enum_check(base: &str, column: &ColumnDef, fmt: &Formatter<'_>) -> String {
    let ColumnType::Enum(values) = &column.ty else {
        return base.to_string();
    };
    let tz = fmt.client().options().time_zone;
    let rules = fmt.dialect().escape_rules();
    let list = values
        .iter()
        .map(|v| rules.escape(&crate::sql::value::Value::from(v.as_str()), tz))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} check ({} in ({}))",
        base,
        fmt.wrap_identifier(&column.name),
        list
    )
}
