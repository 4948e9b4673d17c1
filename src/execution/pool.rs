//! Collaborator contracts for running compiled SQL.
//!
//! polyql never talks to a database itself. A [`ConnectionPool`] hands out
//! connections and a [`Driver`] runs native SQL on them; both are supplied by
//! the application.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::BoxError;
use crate::sql::compiled::NativeQuery;

/// One result row, keyed by column name.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// Normalized driver result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<ResultRow>,
    /// Rows affected, or returned for reads.
    pub row_count: u64,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        let row_count = rows.len() as u64;
        Self { rows, row_count }
    }

    /// Result of a write that returned no rows.
    pub fn affected(row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
        }
    }
}

/// Pool of driver connections.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    type Connection: Send + 'static;

    /// Wait for a free connection. The executor bounds this with the
    /// client's acquire timeout.
    async fn acquire(&self) -> Result<Self::Connection, BoxError>;

    /// Return a connection to the pool.
    async fn release(&self, conn: Self::Connection);

    /// Close every connection.
    async fn destroy(&self);

    /// Whether a freshly acquired connection is usable. Connections failing
    /// validation are dropped and another is acquired.
    async fn validate(&self, conn: &Self::Connection) -> bool {
        let _ = conn;
        true
    }
}

/// Runs native SQL on one connection.
#[async_trait]
pub trait Driver: Send + Sync {
    type Connection: Send + 'static;

    async fn execute(
        &self,
        conn: &mut Self::Connection,
        query: &NativeQuery,
    ) -> Result<QueryResult, BoxError>;

    /// Cancel whatever statement is running on `conn`.
    ///
    /// Called after a timed-out statement when cancellation was requested.
    async fn cancel(&self, conn: &mut Self::Connection) -> Result<(), BoxError> {
        let _ = conn;
        Err("driver does not implement query cancellation".into())
    }
}
