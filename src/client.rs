//! Client: a dialect plus an immutable option snapshot.
//!
//! Every compile reads its options from the [`Client`] it was handed. Toggling
//! identifier processing returns a new client, so a migration runner that
//! disables processing for its bookkeeping queries never affects a compile
//! running elsewhere with the original client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::schema::{SchemaBuilder, SchemaStatement};
use crate::sql::builder::QueryBuilder;
use crate::sql::compiled::CompiledQuery;
use crate::sql::compiler;
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::escape::TimeZone;
use crate::sql::raw::Raw;

/// Identifier hook: receives the identifier and the dialect's own quoting
/// function, returns the final quoted text.
pub type WrapIdentifierFn = Arc<dyn Fn(&str, &dyn Fn(&str) -> String) -> String + Send + Sync>;

/// Options read by the compilers and the executor.
#[derive(Clone)]
pub struct ClientOptions {
    /// Fill missing insert columns with `NULL` instead of `DEFAULT`.
    pub use_null_as_default: bool,
    /// Custom identifier quoting, applied while processing is enabled.
    pub wrap_identifier: Option<WrapIdentifierFn>,
    /// Whether user hooks run. Migrations switch this off.
    pub processing: bool,
    /// Emit `debug!` events for compiled SQL.
    pub log_sql: bool,
    /// Include interpolated SQL in execution events.
    pub debug: bool,
    /// Zone used when dates are inlined as literals.
    pub time_zone: TimeZone,
    /// Upper bound on waiting for a pooled connection.
    pub acquire_connection_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            use_null_as_default: false,
            wrap_identifier: None,
            processing: true,
            log_sql: true,
            debug: false,
            time_zone: TimeZone::Local,
            acquire_connection_timeout: Duration::from_millis(60_000),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("use_null_as_default", &self.use_null_as_default)
            .field("wrap_identifier", &self.wrap_identifier.is_some())
            .field("processing", &self.processing)
            .field("log_sql", &self.log_sql)
            .field("debug", &self.debug)
            .field("time_zone", &self.time_zone)
            .field("acquire_connection_timeout", &self.acquire_connection_timeout)
            .finish()
    }
}

/// A dialect bound to a set of options.
#[derive(Debug, Clone)]
pub struct Client {
    dialect: Dialect,
    options: Arc<ClientOptions>,
}

impl Default for Client {
    fn default() -> Self {
        Client::new(Dialect::Generic)
    }
}

impl Client {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            options: Arc::new(ClientOptions::default()),
        }
    }

    pub fn with_options(dialect: Dialect, options: ClientOptions) -> Self {
        Self {
            dialect,
            options: Arc::new(options),
        }
    }

    /// Resolve a client name such as `pg` or `sqlite`.
    pub fn from_client_name(name: &str) -> Result<Self> {
        Ok(Client::new(Dialect::from_client_name(name)?))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let name = settings.client.as_deref().unwrap_or("");
        let dialect = Dialect::from_client_name(name)?;
        Ok(Client::with_options(dialect, settings.client_options()?))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// A copy of this client with user hooks switched off.
    pub fn disable_processing(&self) -> Client {
        self.with_processing(false)
    }

    pub fn enable_processing(&self) -> Client {
        self.with_processing(true)
    }

    fn with_processing(&self, processing: bool) -> Client {
        let mut options = (*self.options).clone();
        options.processing = processing;
        Client {
            dialect: self.dialect,
            options: Arc::new(options),
        }
    }

    /// Quote one identifier segment, running the user hook when enabled.
    pub fn wrap_identifier(&self, ident: &str) -> String {
        let dialect = self.dialect;
        let quote = move |value: &str| {
            if value == "*" {
                value.to_string()
            } else {
                dialect.quote_identifier(value)
            }
        };
        match &self.options.wrap_identifier {
            Some(hook) if self.options.processing => hook(ident, &quote),
            _ => quote(ident),
        }
    }

    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn schema(&self) -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Compile a query builder.
    pub fn compile(&self, builder: &QueryBuilder) -> Result<CompiledQuery> {
        compiler::compile(builder, self)
    }

    /// Compile a standalone raw expression.
    pub fn compile_raw(&self, raw: &Raw) -> Result<CompiledQuery> {
        compiler::compile_raw(raw, self)
    }

    /// Compile a schema builder into its statements.
    pub fn compile_schema(&self, schema: &SchemaBuilder) -> Result<Vec<SchemaStatement>> {
        schema.compile(self)
    }

    /// Fail unless the dialect can cancel running queries.
    pub fn assert_can_cancel(&self) -> Result<()> {
        if self.dialect.supports_cancel() {
            Ok(())
        } else {
            Err(Error::capability(
                self.dialect.name(),
                "Query cancelling not supported for this dialect",
            ))
        }
    }
}
