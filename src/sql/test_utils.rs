//! Parse checks for generated SQL in unit tests.

use sqlparser::dialect::{
    GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect,
    SQLiteDialect,
};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Parse `sql` with the sqlparser dialect closest to `dialect`.
///
/// Compiled SQL keeps `?` placeholders, which every parser dialect accepts.
/// Oracle and the generic client go through the generic parser.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres | Dialect::CockroachDb => Box::new(PostgreSqlDialect {}),
        Dialect::Redshift => Box::new(RedshiftSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Sqlite3 => Box::new(SQLiteDialect {}),
        Dialect::MsSql => Box::new(MsSqlDialect {}),
        Dialect::Generic | Dialect::Oracle => Box::new(GenericDialect {}),
    };

    match Parser::parse_sql(&*parser, sql) {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("{} does not parse for {}: {}", sql, dialect, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting_styles_parse() {
        validate_sql("select * from \"users\" where \"id\" = ?", Dialect::Postgres).unwrap();
        validate_sql("select * from `users` where `id` = ?", Dialect::MySql).unwrap();
        validate_sql("select * from [users] where [id] = ?", Dialect::MsSql).unwrap();
    }

    #[test]
    fn test_rejects_garbage() {
        let err = validate_sql("selec * form users", Dialect::Sqlite3).unwrap_err();
        assert!(err.contains("sqlite3"));
    }
}
