//! Schema builder.
//!
//! [`SchemaBuilder`] records DDL operations in call order. Table and view
//! callbacks run immediately, so the builder holds plain data and can be
//! compiled any number of times, for any client.
//!
//! Compiling yields [`SchemaStatement`]s: ordinary compiled queries (some of
//! them existence probes) and SQLite rebuild plans, which need the live
//! table definition and are only expanded at execution time.

pub mod column;
mod compiler;
pub mod dialect;
pub mod sqlite_rebuild;
pub mod table;
pub mod view;

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::client::Client;
use crate::error::Result;
use crate::sql::compiled::CompiledQuery;
use crate::sql::raw::Raw;
use crate::sql::statement::Method;
use crate::sql::value::Value;

use self::compiler::{DdlCompiler, Emitted};
use self::dialect::ExistenceCheck;
use self::sqlite_rebuild::RebuildPlan;
use self::table::{TableBuilder, TableMode};
use self::view::ViewBuilder;

pub use self::column::{
    AlterOptions, ColumnBuilder, ColumnDef, ColumnType, Deferrable, ForeignBuilder, ForeignKey,
};
pub use self::table::IndexOptions;

/// A table, view or other object name with an optional schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub name: String,
    pub schema: Option<String>,
}

impl ObjectName {
    pub fn new(name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone)]
enum SchemaOp {
    CreateTable(TableBuilder),
    AlterTable(TableBuilder),
    DropTable {
        target: ObjectName,
        if_exists: bool,
    },
    RenameTable {
        from: ObjectName,
        to: String,
    },
    HasTable(ObjectName),
    HasColumn {
        table: ObjectName,
        column: String,
    },
    CreateView {
        view: ViewBuilder,
        replace: bool,
        materialized: bool,
    },
    RefreshMaterializedView {
        target: ObjectName,
        concurrently: bool,
    },
    AlterView(ViewBuilder),
    RenameView {
        from: ObjectName,
        to: String,
    },
    DropView {
        target: ObjectName,
        if_exists: bool,
        materialized: bool,
    },
    CreateSchema {
        name: String,
        if_not_exists: bool,
    },
    DropSchema {
        name: String,
        if_exists: bool,
        cascade: bool,
    },
    CreateExtension {
        name: String,
        if_not_exists: bool,
    },
    DropExtension {
        name: String,
        if_exists: bool,
    },
    Raw(Raw),
}

impl SchemaOp {
    fn method(&self) -> Method {
        match self {
            SchemaOp::CreateTable(_)
            | SchemaOp::CreateView { .. }
            | SchemaOp::CreateSchema { .. }
            | SchemaOp::CreateExtension { .. } => Method::Create,
            SchemaOp::AlterTable(_)
            | SchemaOp::AlterView(_)
            | SchemaOp::RefreshMaterializedView { .. } => Method::Alter,
            SchemaOp::DropTable { .. }
            | SchemaOp::DropView { .. }
            | SchemaOp::DropSchema { .. }
            | SchemaOp::DropExtension { .. } => Method::Drop,
            SchemaOp::RenameTable { .. } | SchemaOp::RenameView { .. } => Method::Rename,
            SchemaOp::HasTable(_) | SchemaOp::HasColumn { .. } => Method::Select,
            SchemaOp::Raw(_) => Method::Raw,
        }
    }
}

/// One compiled schema statement.
#[derive(Debug, Clone)]
pub enum SchemaStatement {
    Query {
        query: CompiledQuery,
        /// Set for existence probes: how the result rows answer the question.
        check: Option<ExistenceCheck>,
    },
    /// SQLite table rebuild, planned against the live definition.
    Rebuild(RebuildPlan),
}

impl SchemaStatement {
    /// SQL text, `None` for rebuild plans.
    pub fn sql(&self) -> Option<&str> {
        match self {
            SchemaStatement::Query { query, .. } => Some(&query.sql),
            SchemaStatement::Rebuild(_) => None,
        }
    }
}

/// Ordered DDL operations.
#[derive(Debug, Clone, Default)]
#[must_use = "builders have no effect until compiled"]
pub struct SchemaBuilder {
    schema: Option<String>,
    ops: Vec<SchemaOp>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema applied to every operation recorded after this call.
    pub fn with_schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.schema = Some(schema.into());
        self
    }

    fn target(&self, name: &str) -> ObjectName {
        ObjectName::new(name, self.schema.clone())
    }

    fn push(&mut self, op: SchemaOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn create_with(
        &mut self,
        name: &str,
        mode: TableMode,
        f: impl FnOnce(&mut TableBuilder),
    ) -> &mut Self {
        let mut table = TableBuilder::new(name, mode).with_schema(self.schema.clone());
        f(&mut table);
        self.push(SchemaOp::CreateTable(table))
    }

    pub fn create_table(&mut self, name: &str, f: impl FnOnce(&mut TableBuilder)) -> &mut Self {
        self.create_with(
            name,
            TableMode::Create {
                if_not_exists: false,
                like: None,
            },
            f,
        )
    }

    pub fn create_table_if_not_exists(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut TableBuilder),
    ) -> &mut Self {
        self.create_with(
            name,
            TableMode::Create {
                if_not_exists: true,
                like: None,
            },
            f,
        )
    }

    /// Copy the structure of `source`; columns added in the callback are
    /// appended afterwards.
    pub fn create_table_like(
        &mut self,
        name: &str,
        source: &str,
        f: impl FnOnce(&mut TableBuilder),
    ) -> &mut Self {
        self.create_with(
            name,
            TableMode::Create {
                if_not_exists: false,
                like: Some(source.to_string()),
            },
            f,
        )
    }

    pub fn alter_table(&mut self, name: &str, f: impl FnOnce(&mut TableBuilder)) -> &mut Self {
        let mut table = TableBuilder::alter(name).with_schema(self.schema.clone());
        f(&mut table);
        self.push(SchemaOp::AlterTable(table))
    }

    pub fn drop_table(&mut self, name: &str) -> &mut Self {
        let target = self.target(name);
        self.push(SchemaOp::DropTable {
            target,
            if_exists: false,
        })
    }

    pub fn drop_table_if_exists(&mut self, name: &str) -> &mut Self {
        let target = self.target(name);
        self.push(SchemaOp::DropTable {
            target,
            if_exists: true,
        })
    }

    pub fn rename_table(&mut self, from: &str, to: &str) -> &mut Self {
        let from = self.target(from);
        self.push(SchemaOp::RenameTable {
            from,
            to: to.to_string(),
        })
    }

    pub fn has_table(&mut self, name: &str) -> &mut Self {
        let target = self.target(name);
        self.push(SchemaOp::HasTable(target))
    }

    pub fn has_column(&mut self, table: &str, column: &str) -> &mut Self {
        let table = self.target(table);
        self.push(SchemaOp::HasColumn {
            table,
            column: column.to_string(),
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    fn view_with(&mut self, name: &str, f: impl FnOnce(&mut ViewBuilder)) -> ViewBuilder {
        let mut view = ViewBuilder::new(name).with_schema(self.schema.clone());
        f(&mut view);
        view
    }

    pub fn create_view(&mut self, name: &str, f: impl FnOnce(&mut ViewBuilder)) -> &mut Self {
        let view = self.view_with(name, f);
        self.push(SchemaOp::CreateView {
            view,
            replace: false,
            materialized: false,
        })
    }

    pub fn create_view_or_replace(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ViewBuilder),
    ) -> &mut Self {
        let view = self.view_with(name, f);
        self.push(SchemaOp::CreateView {
            view,
            replace: true,
            materialized: false,
        })
    }

    pub fn create_materialized_view(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut ViewBuilder),
    ) -> &mut Self {
        let view = self.view_with(name, f);
        self.push(SchemaOp::CreateView {
            view,
            replace: false,
            materialized: true,
        })
    }

    pub fn refresh_materialized_view(&mut self, name: &str, concurrently: bool) -> &mut Self {
        let target = self.target(name);
        self.push(SchemaOp::RefreshMaterializedView {
            target,
            concurrently,
        })
    }

    pub fn alter_view(&mut self, name: &str, f: impl FnOnce(&mut ViewBuilder)) -> &mut Self {
        let view = self.view_with(name, f);
        self.push(SchemaOp::AlterView(view))
    }

    pub fn rename_view(&mut self, from: &str, to: &str) -> &mut Self {
        let from = self.target(from);
        self.push(SchemaOp::RenameView {
            from,
            to: to.to_string(),
        })
    }

    pub fn drop_view(&mut self, name: &str) -> &mut Self {
        self.drop_view_with(name, false, false)
    }

    pub fn drop_view_if_exists(&mut self, name: &str) -> &mut Self {
        self.drop_view_with(name, true, false)
    }

    pub fn drop_materialized_view(&mut self, name: &str) -> &mut Self {
        self.drop_view_with(name, false, true)
    }

    fn drop_view_with(&mut self, name: &str, if_exists: bool, materialized: bool) -> &mut Self {
        let target = self.target(name);
        self.push(SchemaOp::DropView {
            target,
            if_exists,
            materialized,
        })
    }

    // ========================================================================
    // Schemas, extensions, raw
    // ========================================================================

    pub fn create_schema(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::CreateSchema {
            name: name.to_string(),
            if_not_exists: false,
        })
    }

    pub fn create_schema_if_not_exists(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::CreateSchema {
            name: name.to_string(),
            if_not_exists: true,
        })
    }

    pub fn drop_schema(&mut self, name: &str, cascade: bool) -> &mut Self {
        self.push(SchemaOp::DropSchema {
            name: name.to_string(),
            if_exists: false,
            cascade,
        })
    }

    pub fn drop_schema_if_exists(&mut self, name: &str, cascade: bool) -> &mut Self {
        self.push(SchemaOp::DropSchema {
            name: name.to_string(),
            if_exists: true,
            cascade,
        })
    }

    pub fn create_extension(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::CreateExtension {
            name: name.to_string(),
            if_not_exists: false,
        })
    }

    pub fn create_extension_if_not_exists(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::CreateExtension {
            name: name.to_string(),
            if_not_exists: true,
        })
    }

    pub fn drop_extension(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::DropExtension {
            name: name.to_string(),
            if_exists: false,
        })
    }

    pub fn drop_extension_if_exists(&mut self, name: &str) -> &mut Self {
        self.push(SchemaOp::DropExtension {
            name: name.to_string(),
            if_exists: true,
        })
    }

    /// Raw statement passed through in order.
    pub fn raw(&mut self, raw: impl Into<Raw>) -> &mut Self {
        self.push(SchemaOp::Raw(raw.into()))
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compile every recorded operation, in order.
    pub fn compile(&self, client: &Client) -> Result<Vec<SchemaStatement>> {
        let mut statements = Vec::new();
        for op in &self.ops {
            if let SchemaOp::Raw(raw) = op {
                statements.push(SchemaStatement::Query {
                    query: client.compile_raw(raw)?,
                    check: None,
                });
                continue;
            }

            let method = op.method();
            let mut compiler = DdlCompiler::new(client);
            match op {
                SchemaOp::CreateTable(table) => compiler.create_table(table)?,
                SchemaOp::AlterTable(table) => compiler.alter_table(table)?,
                SchemaOp::DropTable { target, if_exists } => {
                    compiler.drop_table(target, *if_exists)
                }
                SchemaOp::RenameTable { from, to } => compiler.rename_table(from, to),
                SchemaOp::HasTable(target) => compiler.has_table(target),
                SchemaOp::HasColumn { table, column } => compiler.has_column(table, column),
                SchemaOp::CreateView {
                    view,
                    replace,
                    materialized,
                } => compiler.create_view(view, *replace, *materialized)?,
                SchemaOp::RefreshMaterializedView {
                    target,
                    concurrently,
                } => compiler.refresh_materialized_view(target, *concurrently)?,
                SchemaOp::AlterView(view) => compiler.alter_view(view)?,
                SchemaOp::RenameView { from, to } => compiler.rename_view(from, to)?,
                SchemaOp::DropView {
                    target,
                    if_exists,
                    materialized,
                } => compiler.drop_view(target, *if_exists, *materialized)?,
                SchemaOp::CreateSchema { name, if_not_exists } => {
                    compiler.create_schema(name, *if_not_exists)?
                }
                SchemaOp::DropSchema {
                    name,
                    if_exists,
                    cascade,
                } => compiler.drop_schema(name, *if_exists, *cascade)?,
                SchemaOp::CreateExtension { name, if_not_exists } => {
                    compiler.create_extension(name, *if_not_exists)?
                }
                SchemaOp::DropExtension { name, if_exists } => {
                    compiler.drop_extension(name, *if_exists)?
                }
                SchemaOp::Raw(_) => {}
            }

            for emitted in compiler.finish() {
                let statement = match emitted {
                    Emitted::Sql { sql, bindings } => SchemaStatement::Query {
                        query: schema_query(client, sql, bindings, method),
                        check: None,
                    },
                    Emitted::Probe(probe) => SchemaStatement::Query {
                        query: schema_query(
                            client,
                            probe.sql,
                            probe.bindings.into_iter().map(Value::from).collect(),
                            Method::Select,
                        ),
                        check: Some(probe.check),
                    },
                    Emitted::Rebuild(plan) => {
                        if client.options().log_sql {
                            debug!(
                                table = %plan.table,
                                ops = plan.ops.len(),
                                "planned table rebuild"
                            );
                        }
                        SchemaStatement::Rebuild(plan)
                    }
                };
                statements.push(statement);
            }
        }
        Ok(statements)
    }

    /// SQL text of every non-rebuild statement.
    pub fn to_sql(&self, client: &Client) -> Result<Vec<String>> {
        Ok(self
            .compile(client)?
            .iter()
            .filter_map(|s| s.sql().map(str::to_string))
            .collect())
    }
}

fn schema_query(
    client: &Client,
    sql: String,
    bindings: Vec<Value>,
    method: Method,
) -> CompiledQuery {
    if client.options().log_sql {
        debug!(
            dialect = %client.dialect(),
            method = %method,
            bindings = bindings.len(),
            sql = %sql,
            "compiled schema statement"
        );
    }
    CompiledQuery {
        sql,
        bindings,
        method,
        dialect: client.dialect(),
        options: Default::default(),
        timeout: None,
        cancel_on_timeout: false,
        uid: Uuid::new_v4(),
        returning: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_with_schema_applies_to_later_operations() {
        let mut schema = SchemaBuilder::new();
        schema.drop_table("a").with_schema("s").drop_table("b");
        let sql = schema.to_sql(&Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(sql, vec!["drop table \"a\"", "drop table \"s\".\"b\""]);
    }

    #[test]
    fn test_probe_carries_existence_check() {
        let mut schema = SchemaBuilder::new();
        schema.has_column("users", "id");
        let statements = schema.compile(&Client::new(Dialect::Sqlite3)).unwrap();
        match &statements[0] {
            SchemaStatement::Query { query, check } => {
                assert_eq!(query.method, Method::Select);
                assert_eq!(check, &Some(ExistenceCheck::NamedRow("id".into())));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_statements_keep_call_order() {
        let mut schema = SchemaBuilder::new();
        schema
            .raw("select 1")
            .create_table("t", |t| {
                t.increments("id");
            })
            .drop_table("t");
        let sql = schema.to_sql(&Client::new(Dialect::Postgres)).unwrap();
        assert_eq!(
            sql,
            vec![
                "select 1",
                "create table \"t\" (\"id\" serial primary key)",
                "drop table \"t\"",
            ]
        );
    }

    #[test]
    fn test_sqlite_alter_column_becomes_rebuild() {
        let mut schema = SchemaBuilder::new();
        schema.alter_table("users", |t| {
            t.string("name", 100).not_nullable().alter();
        });
        let statements = schema.compile(&Client::new(Dialect::Sqlite3)).unwrap();
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            SchemaStatement::Rebuild(plan) => {
                assert_eq!(plan.table, "users");
                assert_eq!(plan.ops.len(), 1);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }
}
