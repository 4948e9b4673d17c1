//! # polyql
//!
//! A cross-dialect SQL statement builder and compiler.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        QueryBuilder / SchemaBuilder (fluent calls)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [statement model]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Grouped clauses + single properties, plain data        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compiler + dialect strategies]
//! ┌─────────────────────────────────────────────────────────┐
//! │   CompiledQuery { sql, bindings, method, timeout, .. }   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor, optional]
//! ┌─────────────────────────────────────────────────────────┐
//! │   ConnectionPool + Driver supplied by the application    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use polyql::prelude::*;
//!
//! let client = Client::new(Dialect::Postgres);
//! let mut query = QueryBuilder::table("users");
//! query.select(["*"]).where_("id", 5);
//!
//! let compiled = client.compile(&query)?;
//! assert_eq!(compiled.sql, "select * from \"users\" where \"id\" = ?");
//! assert_eq!(compiled.to_native().sql, "select * from \"users\" where \"id\" = $1");
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod schema;
pub mod sql;

pub use client::{Client, ClientOptions};
pub use error::{Error, Result};

/// Commonly used types.
pub mod prelude {
    pub use crate::client::{Client, ClientOptions};
    pub use crate::config::Settings;
    pub use crate::error::{Error, Result};
    pub use crate::execution::{ConnectionPool, Driver, Executor, QueryResult};
    pub use crate::schema::{SchemaBuilder, SchemaStatement};
    pub use crate::sql::{
        CompiledQuery, Dialect, Method, NativeQuery, Operand, QueryBuilder, Raw, Row, Value,
    };
}
