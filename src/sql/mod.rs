//! SQL generation module.
//!
//! Builders record clauses as data; compilers turn them into SQL text plus
//! an ordered binding list for one dialect:
//!
//! - [`builder`] - fluent query builder
//! - [`statement`] - the clause model the builder fills
//! - [`compiler`] - base compiler and dialect-dispatched clause renderers
//! - [`formatter`] - identifier wrapping and binding accumulation
//! - [`raw`] - literal SQL with positional or named bindings
//! - [`compiled`] - compiled output, placeholder positioning, interpolation
//! - [`dialect`] - SQL dialect implementations

pub mod builder;
pub mod compiled;
pub mod compiler;
pub mod dialect;
pub mod escape;
pub mod extension;
pub mod formatter;
pub mod functions;
pub mod raw;
pub mod statement;
pub mod value;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use builder::QueryBuilder;
pub use compiled::{CompiledQuery, NativeQuery};
pub use dialect::{Dialect, SqlDialect};
pub use raw::Raw;
pub use statement::{ClauseKind, Method};
pub use value::{Operand, Row, Value};
