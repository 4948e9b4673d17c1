//! Executor: compiled queries in, driver results out.
//!
//! The executor owns the policies around a driver call: bounded connection
//! acquisition, per-statement timeouts with optional cancellation, error
//! annotation with the interpolated SQL, and releasing the connection on
//! every path.

use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::{BoxError, Error, Result};
use crate::schema::dialect::ExistenceCheck;
use crate::schema::sqlite_rebuild::{
    set_foreign_keys, RebuildPlan, FOREIGN_KEYS_QUERY, FOREIGN_KEY_CHECK,
};
use crate::schema::SchemaStatement;
use crate::sql::builder::QueryBuilder;
use crate::sql::compiled::{CompiledQuery, NativeQuery};
use crate::sql::dialect::SqlDialect;
use crate::sql::value::Row;

use super::pool::{ConnectionPool, Driver, QueryResult, ResultRow};

/// Rows per insert statement when the caller has no preference.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// SQL longer than this is cut in log events.
const LOGGED_SQL_LIMIT: usize = 240;

/// What one schema statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOutcome {
    /// Result of an ordinary statement.
    Result(QueryResult),
    /// Answer to a `has_table` / `has_column` probe.
    Exists(bool),
    /// A SQLite rebuild ran; carries the number of statements it took.
    Rebuilt { table: String, statements: usize },
}

/// Runs compiled queries through a pool and a driver.
pub struct Executor<P, D> {
    client: Client,
    pool: P,
    driver: D,
}

impl<P, D> Executor<P, D>
where
    P: ConnectionPool,
    D: Driver<Connection = P::Connection>,
{
    pub fn new(client: Client, pool: P, driver: D) -> Self {
        Self {
            client,
            pool,
            driver,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Acquire a validated connection within the client's acquire timeout.
    pub async fn acquire(&self) -> Result<P::Connection> {
        let limit = self.client.options().acquire_connection_timeout;
        let deadline = Instant::now() + limit;

        loop {
            let conn = match timeout_at(deadline, self.pool.acquire()).await {
                Err(_) => return Err(Error::PoolTimeout(limit)),
                Ok(Err(source)) => {
                    return Err(Error::Execution {
                        message: format!("Unable to acquire a connection - {}", source),
                        source,
                    })
                }
                Ok(Ok(conn)) => conn,
            };

            if self.pool.validate(&conn).await {
                if self.client.options().log_sql {
                    debug!(dialect = %self.client.dialect(), "acquired connection");
                }
                return Ok(conn);
            }

            warn!(dialect = %self.client.dialect(), "dropping connection that failed validation");
            drop(conn);
            if Instant::now() >= deadline {
                return Err(Error::PoolTimeout(limit));
            }
        }
    }

    pub async fn release(&self, conn: P::Connection) {
        self.pool.release(conn).await;
        if self.client.options().log_sql {
            debug!(dialect = %self.client.dialect(), "released connection");
        }
    }

    /// Close the pool.
    pub async fn destroy(&self) {
        self.pool.destroy().await;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Compile and run a query builder.
    pub async fn run_builder(&self, builder: &QueryBuilder) -> Result<QueryResult> {
        let query = self.client.compile(builder)?;
        self.run(&query).await
    }

    /// Run one compiled query on a pooled connection.
    pub async fn run(&self, query: &CompiledQuery) -> Result<QueryResult> {
        let mut conn = self.acquire().await?;
        let result = self.run_on(&mut conn, query).await;
        self.release(conn).await;
        result
    }

    /// Run one compiled query on a connection the caller holds.
    pub async fn run_on(
        &self,
        conn: &mut P::Connection,
        query: &CompiledQuery,
    ) -> Result<QueryResult> {
        let native = query.to_native();
        self.log_statement(query, &native);

        let outcome = match query.timeout {
            Some(limit) => {
                let attempt = timeout(limit, self.driver.execute(conn, &native)).await;
                match attempt {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(self.timed_out(conn, query).await),
                }
            }
            None => self.driver.execute(conn, &native).await,
        };

        outcome.map_err(|source| self.execution_error(query, source))
    }

    async fn timed_out(&self, conn: &mut P::Connection, query: &CompiledQuery) -> Error {
        let limit = query.timeout.unwrap_or_default();
        if !query.cancel_on_timeout {
            return Error::QueryTimeout(limit);
        }
        if let Err(err) = self.client.assert_can_cancel() {
            return err;
        }
        match self.driver.cancel(conn).await {
            Ok(()) => Error::QueryTimeout(limit),
            Err(source) => Error::Execution {
                message: format!(
                    "After query timeout of {}ms exceeded, cancelling of query failed.",
                    limit.as_millis()
                ),
                source,
            },
        }
    }

    fn execution_error(&self, query: &CompiledQuery, source: BoxError) -> Error {
        let sql = query.interpolate(self.client.options().time_zone);
        Error::Execution {
            message: format!("{} - {}", sql, source),
            source,
        }
    }

    fn log_statement(&self, query: &CompiledQuery, native: &NativeQuery) {
        let options = self.client.options();
        if !options.log_sql {
            return;
        }
        if options.debug {
            let interpolated = query.interpolate(options.time_zone);
            debug!(
                uid = %query.uid,
                method = %query.method,
                sql = %truncated(&interpolated),
                "running query"
            );
        } else {
            debug!(
                uid = %query.uid,
                method = %query.method,
                bindings = native.bindings.len(),
                sql = %truncated(&native.sql),
                "running query"
            );
        }
    }

    /// Run literal SQL without bindings. Used for transaction control and
    /// pragmas.
    async fn run_sql(&self, conn: &mut P::Connection, sql: &str) -> Result<QueryResult> {
        let native = NativeQuery {
            sql: sql.to_string(),
            bindings: Vec::new(),
        };
        if self.client.options().log_sql {
            debug!(sql = %truncated(sql), "running statement");
        }
        self.driver
            .execute(conn, &native)
            .await
            .map_err(|source| Error::Execution {
                message: format!("{} - {}", sql, source),
                source,
            })
    }

    async fn begin(&self, conn: &mut P::Connection) -> Result<()> {
        let sql = self.client.dialect().begin_transaction();
        self.run_sql(conn, sql).await.map(drop)
    }

    /// Commit on success, roll back on failure. A rollback error is logged;
    /// the original error is the one returned.
    async fn finish<T>(&self, conn: &mut P::Connection, result: Result<T>) -> Result<T> {
        let dialect = self.client.dialect();
        match result {
            Ok(value) => {
                self.run_sql(conn, dialect.commit_transaction()).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.run_sql(conn, dialect.rollback_transaction()).await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    // =========================================================================
    // Batch insert
    // =========================================================================

    /// Insert `rows` into `table` in chunks of `chunk_size`, all inside one
    /// transaction. Returns the rows every chunk returned, in order.
    pub async fn batch_insert(
        &self,
        table: &str,
        rows: Vec<Row>,
        chunk_size: usize,
        returning: &[&str],
    ) -> Result<Vec<ResultRow>> {
        if chunk_size == 0 {
            return Err(Error::validation(format!("Invalid chunkSize: {}", chunk_size)));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // every chunk compiles before anything runs
        let queries = rows
            .chunks(chunk_size)
            .map(|chunk| {
                let mut builder = QueryBuilder::table(table);
                builder.insert_many(chunk.iter().cloned());
                if !returning.is_empty() {
                    builder.returning(returning.iter().copied());
                }
                self.client.compile(&builder)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.acquire().await?;
        let result = self.insert_chunks(&mut conn, &queries).await;
        self.release(conn).await;
        result
    }

    async fn insert_chunks(
        &self,
        conn: &mut P::Connection,
        queries: &[CompiledQuery],
    ) -> Result<Vec<ResultRow>> {
        self.begin(conn).await?;
        let mut inserted: Result<Vec<ResultRow>> = Ok(Vec::new());
        for query in queries {
            match self.run_on(conn, query).await {
                Ok(result) => {
                    if let Ok(rows) = inserted.as_mut() {
                        rows.extend(result.rows);
                    }
                }
                Err(err) => {
                    inserted = Err(err);
                    break;
                }
            }
        }
        self.finish(conn, inserted).await
    }

    // =========================================================================
    // Schema statements
    // =========================================================================

    /// Run compiled schema statements in order on one connection.
    pub async fn run_schema(&self, statements: &[SchemaStatement]) -> Result<Vec<SchemaOutcome>> {
        let mut conn = self.acquire().await?;
        let result = self.schema_statements(&mut conn, statements).await;
        self.release(conn).await;
        result
    }

    async fn schema_statements(
        &self,
        conn: &mut P::Connection,
        statements: &[SchemaStatement],
    ) -> Result<Vec<SchemaOutcome>> {
        let mut outcomes = Vec::with_capacity(statements.len());
        for statement in statements {
            let outcome = match statement {
                SchemaStatement::Query { query, check: None } => {
                    SchemaOutcome::Result(self.run_on(conn, query).await?)
                }
                SchemaStatement::Query {
                    query,
                    check: Some(check),
                } => {
                    let result = self.run_on(conn, query).await?;
                    SchemaOutcome::Exists(answers(check, &result.rows))
                }
                SchemaStatement::Rebuild(plan) => SchemaOutcome::Rebuilt {
                    table: plan.table.clone(),
                    statements: self.rebuild(conn, plan).await?,
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Copy, rename and drop a SQLite table. Foreign key enforcement is
    /// switched off around the rebuild (it cannot change inside a
    /// transaction) and violations are checked before committing.
    async fn rebuild(&self, conn: &mut P::Connection, plan: &RebuildPlan) -> Result<usize> {
        let pragma = self.run_sql(conn, FOREIGN_KEYS_QUERY).await?;
        let enforced = pragma
            .rows
            .first()
            .and_then(|row| row.values().next())
            .is_some_and(is_truthy);

        if enforced {
            self.run_sql(conn, &set_foreign_keys(false)).await?;
        }

        self.begin(conn).await?;
        let applied = self.apply_rebuild(conn, plan).await;
        let result = self.finish(conn, applied).await;

        if enforced {
            let restored = self.run_sql(conn, &set_foreign_keys(true)).await;
            if result.is_ok() {
                restored?;
            }
        }
        result
    }

    async fn apply_rebuild(&self, conn: &mut P::Connection, plan: &RebuildPlan) -> Result<usize> {
        let definitions = self.run_sql(conn, &plan.table_sql_query()).await?;
        let mut create_sql = None;
        let mut index_sqls = Vec::new();
        for row in &definitions.rows {
            let sql = row.get("sql").and_then(|v| v.as_str());
            match (row.get("type").and_then(|v| v.as_str()), sql) {
                (Some("table"), Some(sql)) => create_sql = Some(sql.to_string()),
                (Some("index"), Some(sql)) => index_sqls.push(sql.to_string()),
                _ => {}
            }
        }
        let create_sql = create_sql
            .ok_or_else(|| Error::validation(format!("No such table: {}", plan.table)))?;

        let statements = plan.plan(&create_sql, &index_sqls)?;
        for sql in &statements {
            self.run_sql(conn, sql).await?;
        }

        let violations = self.run_sql(conn, FOREIGN_KEY_CHECK).await?;
        if !violations.rows.is_empty() {
            return Err(Error::validation("FOREIGN KEY constraint failed"));
        }
        Ok(statements.len())
    }
}

fn answers(check: &ExistenceCheck, rows: &[ResultRow]) -> bool {
    match check {
        ExistenceCheck::AnyRow => !rows.is_empty(),
        ExistenceCheck::NamedRow(column) => rows.iter().any(|row| {
            row.get("name")
                .and_then(|v| v.as_str())
                .is_some_and(|name| name.eq_ignore_ascii_case(column))
        }),
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => s == "1",
        _ => false,
    }
}

fn truncated(sql: &str) -> &str {
    if sql.len() <= LOGGED_SQL_LIMIT {
        return sql;
    }
    let mut end = LOGGED_SQL_LIMIT;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
