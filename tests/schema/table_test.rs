//! Table DDL across dialects.

use polyql::schema::dialect::ExistenceCheck;
use polyql::schema::{Deferrable, IndexOptions, SchemaBuilder, SchemaStatement};
use polyql::sql::{Dialect, Value};
use polyql::{Client, Error};

fn users_table() -> SchemaBuilder {
    let mut schema = SchemaBuilder::new();
    schema.create_table("users", |t| {
        let _ = t.increments("id");
        let _ = t.string("email", 255).not_nullable().unique();
        let _ = t.boolean("active").default_to(true);
        let _ = t.integer("team_id").references("teams.id").on_delete("cascade");
        t.timestamps(true, true, false);
        t.comment("people");
    });
    schema
}

fn sql(schema: &SchemaBuilder, dialect: Dialect) -> Vec<String> {
    schema
        .to_sql(&Client::new(dialect))
        .unwrap_or_else(|e| panic!("schema compile failed for {:?}: {}", dialect, e))
}

// ============================================================================
// Create
// ============================================================================

#[test]
fn test_create_table_postgres() {
    assert_eq!(
        sql(&users_table(), Dialect::Postgres),
        vec![
            r#"create table "users" ("id" serial primary key, "email" varchar(255) not null, "active" boolean default '1', "team_id" integer, "created_at" timestamptz not null default CURRENT_TIMESTAMP, "updated_at" timestamptz not null default CURRENT_TIMESTAMP)"#,
            r#"comment on table "users" is 'people'"#,
            r#"alter table "users" add constraint "users_email_unique" unique ("email")"#,
            r#"alter table "users" add constraint "users_team_id_foreign" foreign key ("team_id") references "teams" ("id") on delete cascade"#,
        ]
    );
}

#[test]
fn test_create_table_mysql() {
    assert_eq!(
        sql(&users_table(), Dialect::MySql),
        vec![
            "create table `users` (`id` int unsigned not null auto_increment primary key, `email` varchar(255) not null, `active` boolean default '1', `team_id` int, `created_at` timestamp not null default CURRENT_TIMESTAMP, `updated_at` timestamp not null default CURRENT_TIMESTAMP) comment = 'people'",
            "alter table `users` add unique `users_email_unique`(`email`)",
            "alter table `users` add constraint `users_team_id_foreign` foreign key (`team_id`) references `teams` (`id`) on delete cascade",
        ]
    );
}

#[test]
fn test_create_table_sqlite_inlines_foreign_keys() {
    assert_eq!(
        sql(&users_table(), Dialect::Sqlite3),
        vec![
            "create table `users` (`id` integer not null primary key autoincrement, `email` varchar(255) not null, `active` boolean default '1', `team_id` integer, `created_at` datetime not null default CURRENT_TIMESTAMP, `updated_at` datetime not null default CURRENT_TIMESTAMP, constraint `users_team_id_foreign` foreign key (`team_id`) references `teams` (`id`) on delete cascade)",
            "create unique index `users_email_unique` on `users` (`email`)",
        ]
    );
}

#[test]
fn test_composite_primary_key_and_index() {
    let mut schema = SchemaBuilder::new();
    schema.create_table_if_not_exists("memberships", |t| {
        let _ = t.integer("user_id").not_nullable();
        let _ = t.integer("team_id").not_nullable();
        t.primary(["user_id", "team_id"], IndexOptions::default())
            .index(["team_id"], IndexOptions::named("by_team").using("btree"));
    });

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"create table if not exists "memberships" ("user_id" integer not null, "team_id" integer not null, constraint "memberships_pkey" primary key ("user_id", "team_id"))"#,
            r#"create index "by_team" on "memberships" using btree ("team_id")"#,
        ]
    );
}

#[test]
fn test_deferrable_is_a_capability() {
    let mut schema = SchemaBuilder::new();
    schema.alter_table("users", |t| {
        t.unique(["email"], IndexOptions::default().deferrable(Deferrable::Deferred));
    });

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![r#"alter table "users" add constraint "users_email_unique" unique ("email") deferrable initially deferred"#]
    );

    let err = Client::new(Dialect::MySql).compile_schema(&schema).unwrap_err();
    match err {
        Error::Capability { dialect, message } => {
            assert_eq!(dialect, "mysql");
            assert_eq!(message, "mysql does not support deferrable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Alter, drop, rename
// ============================================================================

#[test]
fn test_alter_column_postgres() {
    let mut schema = SchemaBuilder::new();
    schema.alter_table("users", |t| {
        let _ = t.string("name", 100).not_nullable().alter();
        t.rename_column("nick", "nickname").drop_column("legacy");
    });

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"alter table "users" alter column "name" drop default"#,
            r#"alter table "users" alter column "name" drop not null"#,
            r#"alter table "users" alter column "name" type varchar(100) using ("name"::varchar(100))"#,
            r#"alter table "users" alter column "name" set not null"#,
            r#"alter table "users" rename "nick" to "nickname""#,
            r#"alter table "users" drop column "legacy""#,
        ]
    );
    assert_eq!(
        sql(&schema, Dialect::MySql),
        vec![
            "alter table `users` modify `name` varchar(100) not null",
            "alter table `users` rename column `nick` to `nickname`",
            "alter table `users` drop `legacy`",
        ]
    );
}

#[test]
fn test_sqlite_alter_mixes_statements_and_rebuild() {
    let mut schema = SchemaBuilder::new();
    schema.alter_table("users", |t| {
        let _ = t.text("bio").nullable();
        t.drop_column("legacy");
    });

    let statements = Client::new(Dialect::Sqlite3).compile_schema(&schema).unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].sql(),
        Some("alter table `users` add column `bio` text null")
    );
    assert!(matches!(&statements[1], SchemaStatement::Rebuild(plan) if plan.table == "users"));
}

#[test]
fn test_rename_and_drop_table() {
    let mut schema = SchemaBuilder::new();
    schema.rename_table("people", "users").drop_table_if_exists("old_users");

    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![
            r#"alter table "people" rename to "users""#,
            r#"drop table if exists "old_users""#,
        ]
    );
    assert_eq!(
        sql(&schema, Dialect::MySql),
        vec![
            "rename table `people` to `users`",
            "drop table if exists `old_users`",
        ]
    );

    let statements = Client::new(Dialect::MsSql).compile_schema(&schema).unwrap();
    match &statements[0] {
        SchemaStatement::Query { query, .. } => {
            assert_eq!(query.sql, "exec sp_rename ?, ?");
            assert_eq!(
                query.bindings,
                vec![Value::from("people"), Value::from("users")]
            );
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

// ============================================================================
// Probes and schemas
// ============================================================================

#[test]
fn test_has_table_probe() {
    let mut schema = SchemaBuilder::new();
    schema.with_schema("app").has_table("users");

    let statements = Client::new(Dialect::Postgres).compile_schema(&schema).unwrap();
    match &statements[0] {
        SchemaStatement::Query { query, check } => {
            assert_eq!(
                query.sql,
                "select * from information_schema.tables where table_name = ? and table_schema = ?"
            );
            assert_eq!(query.bindings, vec![Value::from("users"), Value::from("app")]);
            assert_eq!(check, &Some(ExistenceCheck::AnyRow));
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_create_schema_requires_support() {
    let mut schema = SchemaBuilder::new();
    schema.create_schema_if_not_exists("audit");
    assert_eq!(
        sql(&schema, Dialect::Postgres),
        vec![r#"create schema if not exists "audit""#]
    );

    let err = Client::new(Dialect::Sqlite3).compile_schema(&schema).unwrap_err();
    assert_eq!(
        err.to_string(),
        "create_schema is not supported by the sqlite3 dialect"
    );
}
