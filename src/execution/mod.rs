//! Execution layer.
//!
//! Connection pooling and wire protocols belong to the application; this
//! module defines the contracts it must satisfy and the [`Executor`] that
//! drives them:
//!
//! - [`pool`] - `ConnectionPool` and `Driver` traits, normalized results
//! - [`executor`] - timeouts, cancellation, batch inserts, schema runs

pub mod executor;
pub mod pool;

pub use executor::{Executor, SchemaOutcome, DEFAULT_CHUNK_SIZE};
pub use pool::{ConnectionPool, Driver, QueryResult, ResultRow};
