//! Per-dialect rendering differences observed through the public builder.

#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, compile};
use insta::assert_snapshot;
use polyql::sql::statement::{Direction, NullsPosition};
use polyql::sql::{Dialect, QueryBuilder, Value};
use polyql::{Client, Error};

#[test]
fn test_client_names_resolve_to_dialects() {
    let cases = [
        ("pg", Dialect::Postgres),
        ("postgresql", Dialect::Postgres),
        ("redshift", Dialect::Redshift),
        ("cockroachdb", Dialect::CockroachDb),
        ("mysql2", Dialect::MySql),
        ("better-sqlite3", Dialect::Sqlite3),
        ("mssql", Dialect::MsSql),
        ("oracle", Dialect::Oracle),
    ];
    for (name, expected) in cases {
        let client = Client::from_client_name(name).unwrap();
        assert_eq!(client.dialect(), expected, "{}", name);
    }

    let err = Client::from_client_name("sqlserver").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(err.to_string().contains("value sqlserver"));
}

#[test]
fn test_identifier_quoting_and_schema() {
    let mut qb = QueryBuilder::table("users as u");
    qb.with_schema("app").select(["u.id"]);

    assert_snapshot!(
        compile(&qb, Dialect::Postgres).sql,
        @r#"select "u"."id" from "app"."users" as "u""#
    );
    assert_snapshot!(
        compile(&qb, Dialect::MySql).sql,
        @"select `u`.`id` from `app`.`users` as `u`"
    );
    assert_snapshot!(
        compile(&qb, Dialect::MsSql).sql,
        @"select [u].[id] from [app].[users] as [u]"
    );
}

#[test]
fn test_pagination_styles() {
    let mut qb = QueryBuilder::table("users");
    qb.select(["id"]).order_by("id", Direction::Asc).limit(10).offset(20);

    let pg = compile(&qb, Dialect::Postgres);
    assert_eq!(
        pg.sql,
        r#"select "id" from "users" order by "id" asc limit ? offset ?"#
    );
    assert_eq!(pg.bindings, vec![Value::Int(10), Value::Int(20)]);
    assert_parses(&pg.sql, Dialect::Postgres);

    let oracle = compile(&qb, Dialect::Oracle);
    assert_eq!(
        oracle.sql,
        r#"select "id" from "users" order by "id" asc offset ? rows fetch next ? rows only"#
    );
    assert_eq!(oracle.bindings, vec![Value::Int(20), Value::Int(10)]);

    let mssql = compile(&qb, Dialect::MsSql);
    assert_eq!(
        mssql.sql,
        "select [id] from [users] order by [id] asc offset ? rows fetch next ? rows only"
    );
    assert_parses(&mssql.sql, Dialect::MsSql);
}

#[test]
fn test_nulls_ordering_native_or_emulated() {
    let mut qb = QueryBuilder::table("users");
    qb.order_by_nulls("last_seen", Direction::Asc, NullsPosition::Last);

    for dialect in [Dialect::Postgres, Dialect::Redshift] {
        assert_eq!(
            compile(&qb, dialect).sql,
            r#"select * from "users" order by "last_seen" asc nulls last"#
        );
    }
    assert_eq!(
        compile(&qb, Dialect::MySql).sql,
        "select * from `users` order by (`last_seen` is null), `last_seen` asc"
    );
}

#[test]
fn test_like_and_ilike() {
    let mut qb = QueryBuilder::table("users");
    qb.where_like("name", "Al%").where_ilike("email", "%@EXAMPLE.com");

    assert_eq!(
        compile(&qb, Dialect::Postgres).sql,
        r#"select * from "users" where "name" like ? and "email" ilike ?"#
    );
    assert_eq!(
        compile(&qb, Dialect::MySql).sql,
        "select * from `users` where `name` like ? COLLATE utf8_bin and `email` like ?"
    );
    assert_eq!(
        compile(&qb, Dialect::Oracle).sql,
        r#"select * from "users" where "name" like ? and lower("email") like lower(?)"#
    );
}

#[test]
fn test_json_path_where_per_dialect() {
    let mut qb = QueryBuilder::table("orders");
    qb.where_json_path("data", "$.items[0].qty", ">", 2);

    let mysql = compile(&qb, Dialect::MySql);
    assert_eq!(
        mysql.sql,
        "select * from `orders` where json_extract(`data`, ?) > ?"
    );
    assert_eq!(mysql.bindings, vec![Value::from("$.items[0].qty"), Value::Int(2)]);

    assert_eq!(
        compile(&qb, Dialect::Postgres).sql,
        r#"select * from "orders" where jsonb_path_query_first("data", ?)::int > ?"#
    );

    let crdb = compile(&qb, Dialect::CockroachDb);
    assert_eq!(
        crdb.sql,
        r#"select * from "orders" where json_extract_path("data", ?, ?, ?)::int > ?"#
    );
    assert_eq!(
        crdb.bindings,
        vec![
            Value::from("items"),
            Value::from("0"),
            Value::from("qty"),
            Value::Int(2)
        ]
    );

    assert_eq!(
        compile(&qb, Dialect::MsSql).sql,
        "select * from [orders] where JSON_VALUE([data], ?) > ?"
    );
}

#[test]
fn test_row_locks() {
    let mut qb = QueryBuilder::table("jobs");
    qb.where_("state", "queued").for_update().no_wait();

    assert_eq!(
        compile(&qb, Dialect::MySql).sql,
        "select * from `jobs` where `state` = ? for update nowait"
    );
    assert_eq!(
        compile(&qb, Dialect::Oracle).sql,
        r#"select * from "jobs" where "state" = ? for update nowait"#
    );
    assert_eq!(
        compile(&qb, Dialect::MsSql).sql,
        "select * from [jobs] with (UPDLOCK, NOWAIT) where [state] = ?"
    );

    let mut shared = QueryBuilder::table("jobs");
    shared.for_share();
    assert_eq!(
        compile(&shared, Dialect::MySql).sql,
        "select * from `jobs` lock in share mode"
    );
    let err = Client::new(Dialect::Oracle).compile(&shared).unwrap_err();
    assert_eq!(err.to_string(), "for share is not supported by the oracledb dialect");

    let err = Client::new(Dialect::Redshift).compile(&shared).unwrap_err();
    assert!(matches!(err, Error::Capability { .. }));
}

#[test]
fn test_oracle_native_bindings_are_numeric_booleans() {
    let mut qb = QueryBuilder::table("flags");
    qb.where_("enabled", true);

    let native = compile(&qb, Dialect::Oracle).to_native();
    assert_eq!(native.sql, r#"select * from "flags" where "enabled" = :1"#);
    assert_eq!(native.bindings, vec![Value::Int(1)]);

    let native = compile(&qb, Dialect::Postgres).to_native();
    assert_eq!(native.bindings, vec![Value::Bool(true)]);
}
