//! View DDL across dialects.

use polyql::schema::SchemaBuilder;
use polyql::sql::{Dialect, QueryBuilder};
use polyql::{Client, Error};

fn active_users() -> QueryBuilder {
    let mut qb = QueryBuilder::table("users");
    qb.select(["id", "email"]).where_("status", "active");
    qb
}

fn sql(schema: &SchemaBuilder, dialect: Dialect) -> Vec<String> {
    schema
        .to_sql(&Client::new(dialect))
        .unwrap_or_else(|e| panic!("schema compile failed for {:?}: {}", dialect, e))
}

fn capability_error(schema: &SchemaBuilder, dialect: Dialect) -> String {
    match Client::new(dialect).compile_schema(schema) {
        Err(err @ Error::Capability { .. }) => err.to_string(),
        other => panic!("expected capability error for {:?}, got {:?}", dialect, other),
    }
}

#[test]
fn test_create_view_inlines_bindings() {
    let mut schema = SchemaBuilder::new();
    schema.create_view("active_users", |v| {
        v.columns(["user_id", "mail"]).as_query(active_users());
    });

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![r#"create view "active_users" ("user_id", "mail") as select "id", "email" from "users" where "status" = 'active'"#]
    );
}

#[test]
fn test_create_or_replace_per_dialect() {
    let mut schema = SchemaBuilder::new();
    schema.create_view_or_replace("active_users", |v| {
        v.as_query(active_users());
    });

    assert_eq!(
        sql(&schema, Dialect::MySql),
        vec!["create or replace view `active_users` as select `id`, `email` from `users` where `status` = 'active'"]
    );
    assert_eq!(
        sql(&schema, Dialect::Sqlite3),
        vec![
            "drop view if exists `active_users`",
            "create view `active_users` as select `id`, `email` from `users` where `status` = 'active'",
        ]
    );
    assert_eq!(
        sql(&schema, Dialect::MsSql),
        vec!["CREATE OR ALTER VIEW [active_users] AS select [id], [email] from [users] where [status] = 'active'"]
    );
}

#[test]
fn test_view_without_query_is_rejected() {
    let mut schema = SchemaBuilder::new();
    schema.create_view("empty", |_| {});

    let err = Client::new(Dialect::Postgres).compile_schema(&schema).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "View 'empty' has no query");
}

#[test]
fn test_check_options() {
    let mut schema = SchemaBuilder::new();
    schema.create_view("active_users", |v| {
        v.as_query(active_users()).local_check_option();
    });

    let pg = sql(&schema, Dialect::Postgres);
    assert!(pg[0].ends_with("with local check option"), "{}", pg[0]);

    assert_eq!(
        capability_error(&schema, Dialect::Sqlite3),
        "View check options is not supported by the sqlite3 dialect"
    );
}

#[test]
fn test_materialized_views() {
    let mut schema = SchemaBuilder::new();
    schema
        .create_materialized_view("user_stats", |v| {
            v.as_query(active_users());
        })
        .refresh_materialized_view("user_stats", true)
        .drop_materialized_view("user_stats");

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"create materialized view "user_stats" as select "id", "email" from "users" where "status" = 'active'"#,
            r#"refresh materialized view concurrently "user_stats""#,
            r#"drop materialized view "user_stats""#,
        ]
    );

    let mut refresh = SchemaBuilder::new();
    refresh.refresh_materialized_view("user_stats", false);
    assert_eq!(
        sql(&refresh, Dialect::Oracle),
        vec!["BEGIN DBMS_MVIEW.REFRESH('user_stats'); END;"]
    );

    assert_eq!(
        capability_error(&schema, Dialect::MySql),
        "Materialized views is not supported by the mysql dialect"
    );
}

#[test]
fn test_alter_view_columns() {
    let mut schema = SchemaBuilder::new();
    schema.alter_view("active_users", |v| {
        v.column("mail").rename("email");
        v.column("status").default_to("active");
    });

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"alter view "active_users" rename "mail" to "email""#,
            r#"alter view "active_users" alter "status" set default 'active'"#,
        ]
    );
    assert_eq!(
        capability_error(&schema, Dialect::CockroachDb),
        "rename column of views is not supported by the cockroachdb dialect"
    );
}

#[test]
fn test_rename_and_drop_view() {
    let mut schema = SchemaBuilder::new();
    schema
        .rename_view("active_users", "live_users")
        .drop_view_if_exists("old_users");

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"alter view "active_users" rename to "live_users""#,
            r#"drop view if exists "old_users""#,
        ]
    );
    assert_eq!(
        capability_error(&schema, Dialect::Sqlite3),
        "rename_view is not supported by the sqlite3 dialect"
    );
}
