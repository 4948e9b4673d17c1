//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` by choosing a value for every
//! capability strategy (see [`strategy`]) and by picking quoting and escaping
//! rules from [`helpers`]:
//!
//! - Identifier quoting: `"` (Generic/PG/Oracle), `` ` `` (MySQL/SQLite), `[]` (MSSQL)
//! - Upsert: `upsert into` (CockroachDB) or a capability error
//! - Returning: `returning`, `output inserted.x`, or a capability error
//! - Locking: `for update` family, table hints, or a capability error
//! - JSON paths: one bound path, or one binding per path segment
//!
//! # Usage
//!
//! ```ignore
//! use polyql::dialect::{Dialect, SqlDialect};
//!
//! let dialect: Dialect = "pg".parse()?;
//! assert_eq!(dialect.quote_identifier("user"), "\"user\"");
//! ```
//!
//! # Capability matrix
//!
//! | Feature | Postgres | Redshift | CockroachDB | MySQL | SQLite | MSSQL | Oracle |
//! |---------|----------|----------|-------------|-------|--------|-------|--------|
//! | UPSERT | ❌ | ❌ | ✓ | ❌ | ❌ | ❌ | ❌ |
//! | ON CONFLICT | ✓ | ❌ | ✓ | dup key | ✓ | ❌ | ❌ |
//! | RETURNING | ✓ | ❌ | ✓ | ❌ | ✓ | OUTPUT | ❌ |
//! | Row locks | ✓ | ❌ | ✓ | ✓ | ❌ | hints | update only |
//! | Deferrable | ✓ | ❌ | ✓ | ❌ | ✓ | ❌ | ❌ |
//! | View column rename | ✓ | ✓ | ❌ | ❌ | ❌ | sp_rename | ❌ |
//! | Materialized view | ✓ | ✓ | ✓ | ❌ | ❌ | ❌ | ✓ |
//!
//! Legend: ✓ = supported, ❌ = capability error at compile time

mod cockroachdb;
mod generic;
pub mod helpers;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod redshift;
mod sqlite;
pub mod strategy;

pub use cockroachdb::CockroachDb;
pub use generic::Generic;
pub use mssql::MsSql;
pub use mysql::MySql;
pub use oracle::Oracle;
pub use postgres::Postgres;
pub use redshift::Redshift;
pub use sqlite::Sqlite3;

use std::str::FromStr;

use self::strategy::*;
use super::escape::{EscapeRules, StandardEscape};
use super::value::Value;
use crate::error::{Error, Result};
use crate::schema::dialect::SchemaDialect;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations pick capability strategies; the defaults describe the
/// generic client, which supports the least.
pub trait SqlDialect: std::fmt::Debug + Send + Sync {
    /// Dialect name for display, logging and error messages.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifiers and Values
    // =========================================================================

    /// Quote a single identifier segment (table, column, alias).
    ///
    /// - Generic/PostgreSQL/Oracle: `"identifier"`
    /// - MySQL/SQLite: `` `identifier` ``
    /// - MSSQL: `[identifier]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Join an expression and an already-quoted alias.
    fn alias(&self, expr: &str, alias: &str) -> String {
        helpers::alias_as(expr, alias)
    }

    /// Rules used when a value must be inlined as a literal.
    fn escape_rules(&self) -> &'static dyn EscapeRules {
        &StandardEscape
    }

    /// Adjust a binding before it is handed to the driver.
    fn prep_binding(&self, value: &Value) -> Value {
        value.clone()
    }

    /// Native placeholder syntax.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    // =========================================================================
    // Writes
    // =========================================================================

    fn default_marker(&self) -> DefaultMarker {
        DefaultMarker::Keyword
    }

    fn empty_insert(&self) -> EmptyInsert {
        EmptyInsert::DefaultValues
    }

    fn multi_row_insert(&self) -> MultiRowInsert {
        MultiRowInsert::Values
    }

    fn upsert_style(&self) -> UpsertStyle {
        UpsertStyle::Unsupported
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        OnConflictStyle::Unsupported
    }

    fn returning_style(&self) -> ReturningStyle {
        ReturningStyle::Unsupported
    }

    fn truncate_style(&self) -> TruncateStyle {
        TruncateStyle::Truncate
    }

    // =========================================================================
    // Reads
    // =========================================================================

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::LimitOffset(None)
    }

    fn lock_style(&self) -> LockStyle {
        LockStyle::Unsupported
    }

    fn nulls_ordering(&self) -> NullsOrdering {
        NullsOrdering::Emulated
    }

    fn json_path_style(&self) -> JsonPathStyle {
        JsonPathStyle::Function("json_extract")
    }

    fn like_style(&self) -> LikeStyle {
        LikeStyle::Standard
    }

    /// Whether `select distinct on (..)` is available.
    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// Whether CTEs accept `materialized` / `not materialized`.
    fn supports_cte_materialization(&self) -> bool {
        false
    }

    /// Whether to emit RECURSIVE keyword for recursive CTEs.
    ///
    /// MSSQL and Oracle omit it.
    fn emit_recursive_keyword(&self) -> bool {
        true
    }

    // =========================================================================
    // Schema
    // =========================================================================

    fn view_support(&self) -> ViewSupport {
        ViewSupport::BASIC
    }

    /// Whether constraints may be declared `deferrable`.
    fn supports_deferrable(&self) -> bool {
        true
    }

    /// DDL rendering rules for this dialect.
    fn schema(&self) -> &'static dyn SchemaDialect;

    // =========================================================================
    // Execution
    // =========================================================================

    /// Whether a timed-out query may be cancelled on the server.
    fn supports_cancel(&self) -> bool {
        false
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN;"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT;"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK;"
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Generic,
    Postgres,
    Redshift,
    CockroachDb,
    MySql,
    Sqlite3,
    MsSql,
    Oracle,
}

impl Dialect {
    /// Every dialect, in declaration order.
    pub const ALL: [Dialect; 8] = [
        Dialect::Generic,
        Dialect::Postgres,
        Dialect::Redshift,
        Dialect::CockroachDb,
        Dialect::MySql,
        Dialect::Sqlite3,
        Dialect::MsSql,
        Dialect::Oracle,
    ];

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Generic => &Generic,
            Dialect::Postgres => &Postgres,
            Dialect::Redshift => &Redshift,
            Dialect::CockroachDb => &CockroachDb,
            Dialect::MySql => &MySql,
            Dialect::Sqlite3 => &Sqlite3,
            Dialect::MsSql => &MsSql,
            Dialect::Oracle => &Oracle,
        }
    }

    /// Resolve a client name (with aliases) to a dialect.
    pub fn from_client_name(name: &str) -> Result<Dialect> {
        match name {
            "postgres" | "pg" | "postgresql" | "pgnative" => Ok(Dialect::Postgres),
            "redshift" => Ok(Dialect::Redshift),
            "cockroachdb" => Ok(Dialect::CockroachDb),
            "mysql" | "mysql2" => Ok(Dialect::MySql),
            "sqlite3" | "sqlite" | "better-sqlite3" => Ok(Dialect::Sqlite3),
            "mssql" => Ok(Dialect::MsSql),
            "oracledb" | "oracle" => Ok(Dialect::Oracle),
            "" => Err(Error::configuration(
                "Required configuration option 'client' is missing.",
            )),
            other => Err(Error::configuration(format!(
                "Unknown configuration option 'client' value {}. Note that it is case-sensitive, check documentation for supported values.",
                other
            ))),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dialect::from_client_name(s)
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn alias(&self, expr: &str, alias: &str) -> String {
        self.dialect().alias(expr, alias)
    }

    fn escape_rules(&self) -> &'static dyn EscapeRules {
        self.dialect().escape_rules()
    }

    fn prep_binding(&self, value: &Value) -> Value {
        self.dialect().prep_binding(value)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.dialect().placeholder_style()
    }

    fn default_marker(&self) -> DefaultMarker {
        self.dialect().default_marker()
    }

    fn empty_insert(&self) -> EmptyInsert {
        self.dialect().empty_insert()
    }

    fn multi_row_insert(&self) -> MultiRowInsert {
        self.dialect().multi_row_insert()
    }

    fn upsert_style(&self) -> UpsertStyle {
        self.dialect().upsert_style()
    }

    fn on_conflict_style(&self) -> OnConflictStyle {
        self.dialect().on_conflict_style()
    }

    fn returning_style(&self) -> ReturningStyle {
        self.dialect().returning_style()
    }

    fn truncate_style(&self) -> TruncateStyle {
        self.dialect().truncate_style()
    }

    fn limit_style(&self) -> LimitStyle {
        self.dialect().limit_style()
    }

    fn lock_style(&self) -> LockStyle {
        self.dialect().lock_style()
    }

    fn nulls_ordering(&self) -> NullsOrdering {
        self.dialect().nulls_ordering()
    }

    fn json_path_style(&self) -> JsonPathStyle {
        self.dialect().json_path_style()
    }

    fn like_style(&self) -> LikeStyle {
        self.dialect().like_style()
    }

    fn supports_distinct_on(&self) -> bool {
        self.dialect().supports_distinct_on()
    }

    fn supports_cte_materialization(&self) -> bool {
        self.dialect().supports_cte_materialization()
    }

    fn emit_recursive_keyword(&self) -> bool {
        self.dialect().emit_recursive_keyword()
    }

    fn view_support(&self) -> ViewSupport {
        self.dialect().view_support()
    }

    fn supports_deferrable(&self) -> bool {
        self.dialect().supports_deferrable()
    }

    fn schema(&self) -> &'static dyn SchemaDialect {
        self.dialect().schema()
    }

    fn supports_cancel(&self) -> bool {
        self.dialect().supports_cancel()
    }

    fn begin_transaction(&self) -> &'static str {
        self.dialect().begin_transaction()
    }

    fn commit_transaction(&self) -> &'static str {
        self.dialect().commit_transaction()
    }

    fn rollback_transaction(&self) -> &'static str {
        self.dialect().rollback_transaction()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
