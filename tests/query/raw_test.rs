//! Raw expressions, helper functions and builder extensions.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use common::compile;
use polyql::sql::escape::TimeZone;
use polyql::sql::extension::Extensions;
use polyql::sql::functions::{now, Ref};
use polyql::sql::{Dialect, Method, Operand, QueryBuilder, Raw, Row, Value};
use polyql::{Client, Error};

// ============================================================================
// Standalone raw
// ============================================================================

#[test]
fn test_compile_raw_named_bindings() {
    let raw = Raw::named(
        "select :col: from users where id = :id and created_at::date = :day",
        [
            ("col", Operand::from("email")),
            ("id", Operand::from(9)),
            ("day", Operand::from("2024-03-01")),
        ],
    );
    let compiled = Client::new(Dialect::Postgres).compile_raw(&raw).unwrap();
    assert_eq!(
        compiled.sql,
        r#"select "email" from users where id = ? and created_at::date = ?"#
    );
    assert_eq!(compiled.method, Method::Raw);
    assert_eq!(
        compiled.to_native().sql,
        r#"select "email" from users where id = $1 and created_at::date = $2"#
    );
}

#[test]
fn test_compile_raw_rejects_binding_count_mismatch() {
    let raw = Raw::with_bindings("select ? + ?", [1]);
    let err = Client::default().compile_raw(&raw).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "Expected 1 bindings, saw 2");
}

#[test]
fn test_compile_raw_names_undefined_keys() {
    let raw = Raw::named("select :a, :b", [("a", Value::Undefined), ("b", Value::Int(1))]);
    let err = Client::default().compile_raw(&raw).unwrap_err();
    assert!(matches!(err, Error::Binding(_)));
    assert_eq!(
        err.to_string(),
        "Undefined binding(s) detected for keys [a] when compiling RAW query: select :a, ?"
    );
}

#[test]
fn test_raw_timeout_is_carried() {
    let raw = Raw::new("select pg_sleep(5)").timeout(Duration::from_millis(100), true);
    let compiled = Client::new(Dialect::Postgres).compile_raw(&raw).unwrap();
    assert_eq!(compiled.timeout, Some(Duration::from_millis(100)));
    assert!(compiled.cancel_on_timeout);
}

// ============================================================================
// Raw inside builders
// ============================================================================

#[test]
fn test_raw_column_bindings_precede_where_bindings() {
    let mut qb = QueryBuilder::table("users");
    qb.column(Raw::with_bindings(
        "coalesce(??, ?) as label",
        [Operand::from("nickname"), Operand::from("anonymous")],
    ))
    .where_("id", 3);

    let compiled = compile(&qb, Dialect::Postgres);
    assert_eq!(
        compiled.sql,
        r#"select coalesce("nickname", ?) as label from "users" where "id" = ?"#
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("anonymous"), Value::Int(3)]
    );
}

#[test]
fn test_builder_bound_into_raw_is_parenthesized() {
    let mut inner = QueryBuilder::table("orders");
    inner.select(["id"]).where_("customer_id", 4);

    let mut qb = QueryBuilder::table("customers");
    qb.where_raw(Raw::with_bindings("exists ?", [inner])).where_("active", true);

    let compiled = compile(&qb, Dialect::MySql);
    assert_eq!(
        compiled.sql,
        "select * from `customers` where exists (select `id` from `orders` where `customer_id` = ?) and `active` = ?"
    );
    assert_eq!(compiled.bindings, vec![Value::Int(4), Value::Bool(true)]);
}

#[test]
fn test_wrapped_raw_and_helpers() {
    let mut qb = QueryBuilder::table("events");
    qb.insert(
        Row::new()
            .set("kind", "signup")
            .set("created_at", now(Some(3))),
    );
    assert_eq!(
        compile(&qb, Dialect::Postgres).sql,
        r#"insert into "events" ("kind", "created_at") values (?, CURRENT_TIMESTAMP(3))"#
    );

    let mut qb = QueryBuilder::table("a");
    qb.where_("a.owner_id", Ref::new("id").with_schema("b"))
        .column(Raw::new("count(*)").wrap("(", ") as n"));
    assert_eq!(
        compile(&qb, Dialect::Sqlite3).sql,
        "select (count(*)) as n from `a` where `a`.`owner_id` = `b`.`id`"
    );
}

#[test]
fn test_interpolate_for_diagnostics() {
    let mut qb = QueryBuilder::table("users");
    qb.where_("name", "O'Brien").where_("age", 40);
    let compiled = compile(&qb, Dialect::Postgres);
    assert_eq!(
        compiled.interpolate(TimeZone::Local),
        r#"select * from "users" where "name" = 'O''Brien' and "age" = 40"#
    );
}

// ============================================================================
// Extensions
// ============================================================================

#[test]
fn test_extension_methods() {
    let mut extensions = Extensions::new();
    extensions
        .register("active_since", |qb, args| {
            let since = args
                .first()
                .cloned()
                .ok_or_else(|| Error::validation("active_since needs a date"))?;
            qb.where_("active", true).where_op("seen_at", ">=", since);
            Ok(())
        })
        .unwrap();

    let mut qb = QueryBuilder::table("users");
    qb.call(&extensions, "active_since", &[Operand::from("2024-01-01")])
        .unwrap()
        .limit(1);
    let compiled = compile(&qb, Dialect::Postgres);
    assert_eq!(
        compiled.sql,
        r#"select * from "users" where "active" = ? and "seen_at" >= ? limit ?"#
    );

    let err = extensions.register("where_", |_, _| Ok(())).unwrap_err();
    assert_eq!(err.to_string(), "Cannot extend with existing method ('where_').");
    let err = extensions.register("active_since", |_, _| Ok(())).unwrap_err();
    assert!(err.to_string().contains("active_since"));

    let mut qb = QueryBuilder::table("users");
    assert!(qb.call(&extensions, "missing", &[]).is_err());
}
