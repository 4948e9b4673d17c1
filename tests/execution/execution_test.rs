//! Executor behavior against a scripted pool and driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use polyql::error::BoxError;
use polyql::execution::{ConnectionPool, Driver, Executor, QueryResult, ResultRow, SchemaOutcome};
use polyql::schema::SchemaBuilder;
use polyql::sql::compiled::NativeQuery;
use polyql::sql::{Dialect, QueryBuilder, Row, Value};
use polyql::{Client, ClientOptions, Error};

// ============================================================================
// Mocks
// ============================================================================

type Responder = fn(&NativeQuery) -> Result<QueryResult, BoxError>;

#[derive(Default)]
struct Calls {
    sql: Mutex<Vec<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    cancels: AtomicUsize,
}

impl Calls {
    fn sql(&self) -> Vec<String> {
        self.sql.lock().unwrap().clone()
    }
}

struct MockPool {
    calls: Arc<Calls>,
    hang: bool,
    invalid: usize,
}

#[async_trait]
impl ConnectionPool for MockPool {
    type Connection = usize;

    async fn acquire(&self) -> Result<usize, BoxError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self.calls.acquired.fetch_add(1, Ordering::SeqCst))
    }

    async fn release(&self, _conn: usize) {
        self.calls.released.fetch_add(1, Ordering::SeqCst);
    }

    async fn destroy(&self) {}

    async fn validate(&self, conn: &usize) -> bool {
        *conn >= self.invalid
    }
}

struct MockDriver {
    calls: Arc<Calls>,
    delay: Option<Duration>,
    cancel_fails: bool,
    respond: Responder,
}

#[async_trait]
impl Driver for MockDriver {
    type Connection = usize;

    async fn execute(
        &self,
        _conn: &mut usize,
        query: &NativeQuery,
    ) -> Result<QueryResult, BoxError> {
        self.calls.sql.lock().unwrap().push(query.sql.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(query)
    }

    async fn cancel(&self, _conn: &mut usize) -> Result<(), BoxError> {
        self.calls.cancels.fetch_add(1, Ordering::SeqCst);
        if self.cancel_fails {
            Err("connection lost".into())
        } else {
            Ok(())
        }
    }
}

fn empty(_: &NativeQuery) -> Result<QueryResult, BoxError> {
    Ok(QueryResult::default())
}

fn row(value: serde_json::Value) -> ResultRow {
    value.as_object().cloned().unwrap()
}

struct Setup {
    hang: bool,
    invalid: usize,
    delay: Option<Duration>,
    cancel_fails: bool,
    respond: Responder,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            hang: false,
            invalid: 0,
            delay: None,
            cancel_fails: false,
            respond: empty,
        }
    }
}

impl Setup {
    fn build(self, client: Client) -> (Executor<MockPool, MockDriver>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let pool = MockPool {
            calls: calls.clone(),
            hang: self.hang,
            invalid: self.invalid,
        };
        let driver = MockDriver {
            calls: calls.clone(),
            delay: self.delay,
            cancel_fails: self.cancel_fails,
            respond: self.respond,
        };
        (Executor::new(client, pool, driver), calls)
    }
}

fn slow_query(cancel: bool) -> QueryBuilder {
    let mut qb = QueryBuilder::table("reports");
    qb.where_("id", 1).timeout(Duration::from_millis(50), cancel);
    qb
}

// ============================================================================
// Connections and queries
// ============================================================================

#[tokio::test]
async fn test_run_builder_sends_native_sql_and_releases() {
    let (executor, calls) = Setup::default().build(Client::new(Dialect::Postgres));
    let mut qb = QueryBuilder::table("users");
    qb.where_("id", 1);

    let result = executor.run_builder(&qb).await.unwrap();
    assert_eq!(result, QueryResult::default());
    assert_eq!(calls.sql(), vec![r#"select * from "users" where "id" = $1"#]);
    assert_eq!(calls.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_connections_are_dropped() {
    let (executor, calls) = Setup {
        invalid: 2,
        ..Default::default()
    }
    .build(Client::new(Dialect::MySql));

    let conn = executor.acquire().await.unwrap();
    assert_eq!(conn, 2);
    assert_eq!(calls.acquired.load(Ordering::SeqCst), 3);
    executor.release(conn).await;
}

#[tokio::test]
async fn test_pool_timeout() {
    let client = Client::with_options(
        Dialect::Postgres,
        ClientOptions {
            acquire_connection_timeout: Duration::from_millis(30),
            ..Default::default()
        },
    );
    let (executor, _calls) = Setup {
        hang: true,
        ..Default::default()
    }
    .build(client);

    let err = executor.run_builder(&QueryBuilder::table("users")).await.unwrap_err();
    assert!(matches!(err, Error::PoolTimeout(d) if d == Duration::from_millis(30)));
    assert!(err.to_string().starts_with("Timeout acquiring a connection."));
}

#[tokio::test]
async fn test_query_timeout_without_cancel() {
    let (executor, calls) = Setup {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    }
    .build(Client::new(Dialect::Postgres));

    let err = executor.run_builder(&slow_query(false)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Defined query timeout of 50ms exceeded when running query."
    );
    assert_eq!(calls.cancels.load(Ordering::SeqCst), 0);
    assert_eq!(calls.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_query_timeout_with_cancel() {
    let (executor, calls) = Setup {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    }
    .build(Client::new(Dialect::Postgres));

    let err = executor.run_builder(&slow_query(true)).await.unwrap_err();
    assert!(matches!(err, Error::QueryTimeout(_)));
    assert_eq!(calls.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_cancel_is_reported() {
    let (executor, _calls) = Setup {
        delay: Some(Duration::from_secs(5)),
        cancel_fails: true,
        ..Default::default()
    }
    .build(Client::new(Dialect::MySql));

    let err = executor.run_builder(&slow_query(true)).await.unwrap_err();
    assert!(matches!(err, Error::Execution { .. }));
    assert_eq!(
        err.to_string(),
        "After query timeout of 50ms exceeded, cancelling of query failed."
    );
}

#[tokio::test]
async fn test_cancel_requires_dialect_support() {
    let (executor, calls) = Setup {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    }
    .build(Client::new(Dialect::Sqlite3));

    let err = executor.run_builder(&slow_query(true)).await.unwrap_err();
    assert!(matches!(err, Error::Capability { dialect: "sqlite3", .. }));
    assert_eq!(err.to_string(), "Query cancelling not supported for this dialect");
    assert_eq!(calls.cancels.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_driver_errors_carry_interpolated_sql() {
    let (executor, _calls) = Setup {
        respond: |_| Err("relation does not exist".into()),
        ..Default::default()
    }
    .build(Client::new(Dialect::Postgres));

    let mut qb = QueryBuilder::table("missing");
    qb.where_("name", "x");
    let err = executor.run_builder(&qb).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"select * from "missing" where "name" = 'x' - relation does not exist"#
    );
}

// ============================================================================
// Batch insert
// ============================================================================

fn numbered_rows(n: i64) -> Vec<Row> {
    (1..=n).map(|i| Row::new().set("n", i)).collect()
}

#[tokio::test]
async fn test_batch_insert_chunks_in_one_transaction() {
    let (executor, calls) = Setup {
        respond: |_| Ok(QueryResult::from_rows(vec![row(json!({ "id": 1 }))])),
        ..Default::default()
    }
    .build(Client::new(Dialect::Postgres));

    let returned = executor
        .batch_insert("items", numbered_rows(5), 2, &["id"])
        .await
        .unwrap();
    assert_eq!(returned.len(), 3);
    assert_eq!(
        calls.sql(),
        vec![
            "BEGIN;",
            r#"insert into "items" ("n") values ($1), ($2) returning "id""#,
            r#"insert into "items" ("n") values ($1), ($2) returning "id""#,
            r#"insert into "items" ("n") values ($1) returning "id""#,
            "COMMIT;",
        ]
    );
}

#[tokio::test]
async fn test_batch_insert_rolls_back_on_failure() {
    let (executor, calls) = Setup {
        respond: |query| {
            if query.bindings.contains(&Value::Int(3)) {
                Err("duplicate key".into())
            } else {
                Ok(QueryResult::affected(2))
            }
        },
        ..Default::default()
    }
    .build(Client::new(Dialect::Sqlite3));

    let err = executor
        .batch_insert("items", numbered_rows(4), 2, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Execution { .. }));
    let sql = calls.sql();
    assert_eq!(sql.len(), 4);
    assert_eq!(sql.last().map(String::as_str), Some("ROLLBACK;"));
    assert_eq!(calls.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_insert_validates_chunk_size() {
    let (executor, calls) = Setup::default().build(Client::new(Dialect::Postgres));
    let err = executor
        .batch_insert("items", numbered_rows(2), 0, &[])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid chunkSize: 0");
    assert!(calls.sql().is_empty());

    let rows = executor.batch_insert("items", Vec::new(), 10, &[]).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(calls.acquired.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Schema statements
// ============================================================================

#[tokio::test]
async fn test_probe_answers_existence() {
    let (executor, calls) = Setup {
        respond: |_| {
            Ok(QueryResult::from_rows(vec![
                row(json!({ "cid": 0, "name": "id" })),
                row(json!({ "cid": 1, "name": "Email" })),
            ]))
        },
        ..Default::default()
    }
    .build(Client::new(Dialect::Sqlite3));

    let mut schema = SchemaBuilder::new();
    schema.has_column("users", "email").has_column("users", "phone");
    let statements = executor.client().compile_schema(&schema).unwrap();

    let outcomes = executor.run_schema(&statements).await.unwrap();
    assert_eq!(
        outcomes,
        vec![SchemaOutcome::Exists(true), SchemaOutcome::Exists(false)]
    );
    assert_eq!(calls.sql()[0], "PRAGMA table_info(`users`)");
}

fn sqlite_catalog(query: &NativeQuery) -> Result<QueryResult, BoxError> {
    if query.sql == "PRAGMA foreign_keys" {
        return Ok(QueryResult::from_rows(vec![row(json!({ "foreign_keys": 1 }))]));
    }
    if query.sql.starts_with("SELECT type, sql FROM sqlite_master") {
        return Ok(QueryResult::from_rows(vec![
            row(json!({
                "type": "table",
                "sql": "CREATE TABLE `users` (`id` integer not null primary key autoincrement, `legacy` text, `email` varchar(255))"
            })),
            row(json!({
                "type": "index",
                "sql": "CREATE INDEX `users_legacy_index` ON `users` (`legacy`)"
            })),
        ]));
    }
    Ok(QueryResult::default())
}

#[tokio::test]
async fn test_sqlite_rebuild_runs_with_foreign_keys_off() {
    let (executor, calls) = Setup {
        respond: sqlite_catalog,
        ..Default::default()
    }
    .build(Client::new(Dialect::Sqlite3));

    let mut schema = SchemaBuilder::new();
    schema.alter_table("users", |t| {
        t.drop_column("legacy");
    });
    let statements = executor.client().compile_schema(&schema).unwrap();

    let outcomes = executor.run_schema(&statements).await.unwrap();
    assert_eq!(
        outcomes,
        vec![SchemaOutcome::Rebuilt {
            table: "users".to_string(),
            statements: 4
        }]
    );

    let sql = calls.sql();
    assert_eq!(sql[0], "PRAGMA foreign_keys");
    assert_eq!(sql[1], "PRAGMA foreign_keys = OFF");
    assert_eq!(sql[2], "BEGIN;");
    assert!(sql.contains(
        &r#"INSERT INTO "_polyql_tmp_users" SELECT "id", "email" FROM "users";"#.to_string()
    ));
    assert!(!sql.iter().any(|s| s.contains("users_legacy_index")));
    assert_eq!(
        &sql[sql.len() - 3..],
        &["PRAGMA foreign_key_check", "COMMIT;", "PRAGMA foreign_keys = ON"]
    );
}
