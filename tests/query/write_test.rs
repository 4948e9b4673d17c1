//! Insert, upsert, update, delete and truncate compilation.

#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, compile};
use insta::assert_snapshot;
use polyql::sql::{Dialect, QueryBuilder, Row, Value};
use polyql::{Client, ClientOptions, Error};

fn rows() -> Vec<Row> {
    vec![Row::new().set("a", 1), Row::new().set("a", 2).set("b", 3)]
}

#[test]
fn test_heterogeneous_rows_use_default_marker() {
    let mut qb = QueryBuilder::table("t");
    qb.insert_many(rows());

    let compiled = compile(&qb, Dialect::MySql);
    assert_snapshot!(compiled.sql, @"insert into `t` (`a`, `b`) values (?, DEFAULT), (?, ?)");
    assert_eq!(
        compiled.bindings,
        vec![Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    assert_parses(&compiled.sql, Dialect::MySql);
}

#[test]
fn test_null_as_default_binds_nulls() {
    let client = Client::with_options(
        Dialect::Postgres,
        ClientOptions {
            use_null_as_default: true,
            ..Default::default()
        },
    );
    let mut qb = QueryBuilder::table("t");
    qb.insert_many(rows());

    let compiled = client.compile(&qb).unwrap();
    assert_eq!(
        compiled.sql,
        r#"insert into "t" ("a", "b") values (?, ?), (?, ?)"#
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::Int(1), Value::Null, Value::Int(2), Value::Int(3)]
    );
}

#[test]
fn test_oracle_multi_row_insert_all() {
    let mut qb = QueryBuilder::table("t");
    qb.insert_many(rows());

    let compiled = compile(&qb, Dialect::Oracle);
    assert_snapshot!(
        compiled.sql,
        @r#"insert all into "t" ("a", "b") values (?, DEFAULT) into "t" ("a", "b") values (?, ?) select 1 from dual"#
    );
    assert_eq!(compiled.bindings.len(), 3);
}

#[test]
fn test_oracle_multi_row_insert_keeps_capability_checks() {
    let oracle = Client::new(Dialect::Oracle);

    let mut qb = QueryBuilder::table("t");
    qb.insert_many(rows()).returning(["id"]);
    let err = oracle.compile(&qb).unwrap_err();
    assert!(matches!(err, Error::Capability { .. }));
    assert_eq!(err.to_string(), "returning is not supported by the oracledb dialect");

    let mut qb = QueryBuilder::table("t");
    qb.insert_many(rows()).on_conflict(["a"]).ignore();
    let err = oracle.compile(&qb).unwrap_err();
    assert!(matches!(err, Error::Capability { .. }));
    assert_eq!(err.to_string(), "on conflict is not supported by the oracledb dialect");
}

#[test]
fn test_upsert_without_native_support_names_dialect() {
    let mut qb = QueryBuilder::table("t");
    qb.upsert(Row::new().set("id", 1));

    for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::MsSql, Dialect::Oracle] {
        let err = Client::new(dialect).compile(&qb).unwrap_err();
        match err {
            Error::Capability { dialect: name, message } => {
                assert_eq!(name, dialect.to_string());
                assert!(message.contains(name));
            }
            other => panic!("unexpected error for {:?}: {other:?}", dialect),
        }
    }

    assert_snapshot!(
        compile(&qb, Dialect::CockroachDb).sql,
        @r#"upsert into "t" ("id") values (?)"#
    );
}

#[test]
fn test_on_conflict_ignore_per_dialect() {
    let mut qb = QueryBuilder::table("users");
    qb.insert(Row::new().set("email", "a@b.c"))
        .on_conflict(["email"])
        .ignore();

    assert_eq!(
        compile(&qb, Dialect::Postgres).sql,
        r#"insert into "users" ("email") values (?) on conflict ("email") do nothing"#
    );
    assert_eq!(
        compile(&qb, Dialect::Sqlite3).sql,
        "insert into `users` (`email`) values (?) on conflict (`email`) do nothing"
    );
    assert_eq!(
        compile(&qb, Dialect::MySql).sql,
        "insert ignore into `users` (`email`) values (?)"
    );
}

#[test]
fn test_merge_values_binds_after_insert_values() {
    let mut qb = QueryBuilder::table("counters");
    qb.insert(Row::new().set("key", "hits").set("n", 1))
        .on_conflict(["key"])
        .merge_values(Row::new().set("n", 10));

    let compiled = compile(&qb, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql,
        @r#"insert into "counters" ("key", "n") values (?, ?) on conflict ("key") do update set "n" = ?"#
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("hits"), Value::Int(1), Value::Int(10)]
    );
}

#[test]
fn test_update_where_returning() {
    let mut qb = QueryBuilder::table("users");
    qb.update(Row::new().set("name", "Ann").set("age", 30))
        .where_("id", 7)
        .returning(["id", "name"]);

    let compiled = compile(&qb, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql,
        @r#"update "users" set "name" = ?, "age" = ? where "id" = ? returning "id", "name""#
    );
    assert_eq!(compiled.returning, vec!["id".to_string(), "name".to_string()]);

    let err = Client::new(Dialect::MySql).compile(&qb).unwrap_err();
    assert_eq!(err.to_string(), "returning is not supported by the mysql dialect");
}

#[test]
fn test_delete_and_truncate() {
    let mut qb = QueryBuilder::table("sessions");
    qb.where_op("expires_at", "<", "2024-01-01").delete();
    let compiled = compile(&qb, Dialect::Sqlite3);
    assert_eq!(compiled.sql, "delete from `sessions` where `expires_at` < ?");
    assert_parses(&compiled.sql, Dialect::Sqlite3);

    let mut qb = QueryBuilder::table("sessions");
    qb.truncate();
    assert_eq!(compile(&qb, Dialect::MySql).sql, "truncate table `sessions`");
    assert_eq!(compile(&qb, Dialect::Oracle).sql, r#"truncate table "sessions""#);
    assert_eq!(compile(&qb, Dialect::Sqlite3).sql, "delete from `sessions`");
}

#[test]
fn test_schema_qualified_insert() {
    let mut qb = QueryBuilder::table("events");
    qb.with_schema("audit").insert(Row::new().set("kind", "login"));
    assert_eq!(
        compile(&qb, Dialect::MsSql).sql,
        "insert into [audit].[events] ([kind]) values (?)"
    );
}
