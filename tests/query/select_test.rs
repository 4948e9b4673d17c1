//! Select compilation across dialects.

#[path = "../common/mod.rs"]
mod common;

use common::{assert_parses, compile};
use insta::assert_snapshot;
use polyql::sql::formatter::operator;
use polyql::sql::statement::{Direction, JoinKind};
use polyql::sql::{Dialect, QueryBuilder, Raw, Value};
use polyql::{Client, Error};

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_simple_select() {
    let mut qb = QueryBuilder::new();
    qb.select(["*"]).from("users").where_("id", 5);

    let compiled = Client::default().compile(&qb).unwrap();
    assert_snapshot!(compiled.sql, @r#"select * from "users" where "id" = ?"#);
    assert_eq!(compiled.bindings, vec![Value::Int(5)]);
    assert_parses(&compiled.sql, Dialect::Generic);
}

#[test]
fn test_raw_where_matches_plain_where() {
    let mut plain = QueryBuilder::table("users");
    plain.where_("id", 5);

    let mut raw = QueryBuilder::table("users");
    raw.where_raw(Raw::with_bindings("?? = ?", [Value::from("id"), Value::Int(5)]));

    for dialect in Dialect::ALL {
        let a = compile(&plain, dialect);
        let b = compile(&raw, dialect);
        assert_eq!(a.sql, b.sql, "{:?}", dialect);
        assert_eq!(a.bindings, b.bindings, "{:?}", dialect);
    }
}

#[test]
fn test_select_is_deterministic() {
    let mut qb = QueryBuilder::table("orders");
    qb.select(["id", "total as amount"])
        .where_in("status", ["open", "held"])
        .order_by("id", Direction::Desc)
        .limit(10);

    for dialect in Dialect::ALL {
        let a = compile(&qb, dialect);
        let b = compile(&qb, dialect);
        assert_eq!(a.sql, b.sql);
        assert_eq!(a.bindings, b.bindings);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.placeholder_count(), a.bindings.len());
    }
}

// ============================================================================
// Clause order and binding order
// ============================================================================

#[test]
fn test_canonical_clause_order() {
    let mut qb = QueryBuilder::table("orders");
    // called out of canonical order on purpose
    qb.limit(5)
        .order_by("created_at", Direction::Asc)
        .having("total", ">", 100)
        .group_by(["customer_id"])
        .where_("status", "paid")
        .select(["customer_id"])
        .sum("amount as total");

    let compiled = compile(&qb, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql,
        @r#"select "customer_id", sum("amount") as "total" from "orders" where "status" = ? group by "customer_id" having "total" > ? order by "created_at" asc limit ?"#
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("paid"), Value::Int(100), Value::Int(5)]
    );
}

#[test]
fn test_nested_bindings_follow_placeholders() {
    let mut inner = QueryBuilder::table("payments");
    inner.select(["order_id"]).where_op("amount", ">", 50);

    let mut qb = QueryBuilder::table("orders");
    qb.where_("region", "eu")
        .where_in_query("id", inner)
        .where_("status", "open");

    let compiled = compile(&qb, Dialect::MySql);
    assert_snapshot!(
        compiled.sql,
        @"select * from `orders` where `region` = ? and `id` in (select `order_id` from `payments` where `amount` > ?) and `status` = ?"
    );
    assert_eq!(
        compiled.bindings,
        vec![Value::from("eu"), Value::Int(50), Value::from("open")]
    );
    assert_parses(&compiled.sql, Dialect::MySql);
}

#[test]
fn test_joins_in_call_order() {
    let mut qb = QueryBuilder::table("users");
    qb.select(["users.id", "teams.name"])
        .join("teams", "teams.id", "=", "users.team_id")
        .join_on(JoinKind::Left, "profiles", |j| {
            j.on("profiles.user_id", "=", "users.id")
                .on_val("profiles.visible", "=", true);
        });

    let compiled = compile(&qb, Dialect::Postgres);
    assert_snapshot!(
        compiled.sql,
        @r#"select "users"."id", "teams"."name" from "users" inner join "teams" on "teams"."id" = "users"."team_id" left join "profiles" on "profiles"."user_id" = "users"."id" and "profiles"."visible" = ?"#
    );
    assert_eq!(compiled.bindings, vec![Value::Bool(true)]);
    assert_parses(&compiled.sql, Dialect::Postgres);
}

#[test]
fn test_union_after_limit() {
    let mut other = QueryBuilder::table("archived_users");
    other.select(["id"]);

    let mut qb = QueryBuilder::table("users");
    qb.select(["id"]).union_all(other);

    let compiled = compile(&qb, Dialect::Sqlite3);
    assert_snapshot!(
        compiled.sql,
        @"select `id` from `users` union all select `id` from `archived_users`"
    );
}

// ============================================================================
// Placeholders
// ============================================================================

#[test]
fn test_native_placeholders_per_dialect() {
    let mut qb = QueryBuilder::table("users");
    qb.where_("a", 1).where_("b", 2);

    assert_eq!(
        compile(&qb, Dialect::Postgres).to_native().sql,
        r#"select * from "users" where "a" = $1 and "b" = $2"#
    );
    assert_eq!(
        compile(&qb, Dialect::MsSql).to_native().sql,
        "select * from [users] where [a] = @p0 and [b] = @p1"
    );
    assert_eq!(
        compile(&qb, Dialect::Oracle).to_native().sql,
        r#"select * from "users" where "a" = :1 and "b" = :2"#
    );
    assert_eq!(
        compile(&qb, Dialect::MySql).to_native().sql,
        "select * from `users` where `a` = ? and `b` = ?"
    );
}

#[test]
fn test_escaped_question_mark_survives() {
    let mut qb = QueryBuilder::table("docs");
    qb.where_raw(Raw::with_bindings(r"data \? ? and id = ?", [Value::from("k"), Value::Int(1)]));

    let compiled = compile(&qb, Dialect::Postgres);
    assert_eq!(compiled.placeholder_count(), 2);
    assert_eq!(
        compiled.to_native().sql,
        r#"select * from "docs" where data ? $1 and id = $2"#
    );
}

// ============================================================================
// Validation and binding errors
// ============================================================================

#[test]
fn test_operator_whitelist_for_every_dialect() {
    for dialect in Dialect::ALL {
        let mut qb = QueryBuilder::table("users");
        qb.where_op("id", "= 1 or 1 =", 1);
        let err = Client::new(dialect).compile(&qb).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{:?}", dialect);
    }
    assert_eq!(operator("ILIKE").unwrap(), "ilike");
    assert_eq!(operator("?|").unwrap(), "\\?|");
}

#[test]
fn test_undefined_inside_array_is_binding_error() {
    let mut qb = QueryBuilder::table("users");
    qb.where_in("id", vec![Value::Int(1), Value::Undefined]);
    let err = Client::new(Dialect::Postgres).compile(&qb).unwrap_err();
    assert!(matches!(err, Error::Binding(_)));
    assert!(err.to_string().contains("Undefined column(s): [id]"));
}

#[test]
fn test_distinct_on_requires_postgres_family() {
    let mut qb = QueryBuilder::table("events");
    qb.distinct_on(["user_id"]).select(["user_id", "at"]);

    assert_snapshot!(
        compile(&qb, Dialect::Postgres).sql,
        @r#"select distinct on ("user_id") "user_id", "at" from "events""#
    );
    let err = Client::new(Dialect::MySql).compile(&qb).unwrap_err();
    assert_eq!(err.to_string(), "distinct on is not supported by the mysql dialect");
}
