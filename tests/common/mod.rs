//! Shared helpers for integration tests.

#![allow(dead_code)]

use polyql::sql::{CompiledQuery, Dialect, QueryBuilder};
use polyql::Client;
use sqlparser::dialect::{
    GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect,
    SQLiteDialect,
};
use sqlparser::parser::Parser;

/// Compile `qb` for `dialect` with default options.
pub fn compile(qb: &QueryBuilder, dialect: Dialect) -> CompiledQuery {
    Client::new(dialect)
        .compile(qb)
        .unwrap_or_else(|e| panic!("compile failed for {:?}: {}", dialect, e))
}

/// Assert that `sql` parses for the dialect family.
pub fn assert_parses(sql: &str, dialect: Dialect) {
    let parser: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres | Dialect::CockroachDb => Box::new(PostgreSqlDialect {}),
        Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Sqlite3 => Box::new(SQLiteDialect {}),
        Dialect::MsSql => Box::new(MsSqlDialect {}),
        Dialect::Generic | Dialect::Oracle => Box::new(GenericDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser, sql) {
        panic!("SQL does not parse for {:?}: {}\nSQL: {}", dialect, e, sql);
    }
}
