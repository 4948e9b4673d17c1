//! DDL compiler.
//!
//! Renders one schema operation into zero or more statements. Dialect
//! differences are resolved through the [`DdlSupport`] strategies of the
//! client's dialect plus its column type mapping; nothing here branches on
//! the dialect itself.

use tracing::warn;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::sql::compiled::interpolate;
use crate::sql::compiler::{render_query, unsupported};
use crate::sql::dialect::helpers::short_key_name;
use crate::sql::dialect::strategy::{CreateOrReplace, ViewColumnRename};
use crate::sql::escape::TimeZone;
use crate::sql::formatter::Formatter;
use crate::sql::raw::Raw;
use crate::sql::value::{Operand, Value};

use super::column::{CheckKind, ColumnCheck, ColumnDef, ColumnPosition, Deferrable, ForeignKey};
use super::dialect::{
    AlterStyle, CommentStyle, CreateLikeStyle, DdlSupport, IfExistsStyle, KeyStyle, Probe,
    RefreshStyle, RenameTableStyle, SchemaDialect,
};
use super::sqlite_rebuild::{RebuildOp, RebuildPlan};
use super::table::{IndexOptions, TableBuilder, TableMode, TableOp};
use super::view::{ViewAlteration, ViewBuilder};
use super::ObjectName;

const LENGTH_OPERATORS: &[&str] = &["=", "!=", "<>", "<", "<=", ">", ">="];
const REFERENTIAL_ACTIONS: &[&str] =
    &["cascade", "set null", "set default", "restrict", "no action"];

/// Output of one schema operation.
#[derive(Debug)]
pub(crate) enum Emitted {
    Sql { sql: String, bindings: Vec<Value> },
    Probe(Probe),
    Rebuild(RebuildPlan),
}

pub(crate) struct DdlCompiler<'a> {
    fmt: Formatter<'a>,
    schema: &'static dyn SchemaDialect,
    ddl: DdlSupport,
    out: Vec<Emitted>,
}

impl<'a> DdlCompiler<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        let fmt = Formatter::new(client);
        let schema = fmt.dialect().schema();
        Self {
            ddl: schema.ddl(),
            schema,
            fmt,
            out: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Vec<Emitted> {
        self.out
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn dialect_name(&self) -> &'static str {
        self.fmt.dialect().name()
    }

    fn tz(&self) -> TimeZone {
        self.fmt.client().options().time_zone
    }

    fn quote(&self, ident: &str) -> String {
        self.fmt.wrap_identifier(ident)
    }

    fn qualified(&self, name: &str, schema: Option<&str>) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(name)),
            None => self.fmt.wrap_string(name),
        }
    }

    fn object(&self, object: &ObjectName) -> String {
        self.qualified(&object.name, object.schema.as_deref())
    }

    fn columns(&self, columns: &[String]) -> String {
        self.fmt.columnize_names(columns)
    }

    fn string_literal(&self, text: &str) -> String {
        self.fmt.dialect().escape_rules().escape_string(text)
    }

    fn literal(&self, value: &Value) -> String {
        self.fmt.dialect().escape_rules().escape(value, self.tz())
    }

    fn literal_list(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.literal(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render a raw expression with its bindings inlined as literals.
    fn inline_raw(&mut self, raw: &Raw) -> Result<String> {
        let sql = raw.render(&mut self.fmt)?;
        let bindings = self.fmt.take_bindings();
        Ok(interpolate(
            &sql,
            &bindings,
            self.fmt.dialect().escape_rules(),
            self.tz(),
        ))
    }

    fn push(&mut self, sql: impl Into<String>) {
        self.out.push(Emitted::Sql {
            sql: sql.into(),
            bindings: Vec::new(),
        });
    }

    fn push_bound(&mut self, sql: impl Into<String>, bindings: Vec<Value>) {
        self.out.push(Emitted::Sql {
            sql: sql.into(),
            bindings,
        });
    }

    fn shorten(&self, name: String) -> String {
        match self.ddl.max_identifier_length {
            Some(max) => short_key_name(&name, max),
            None => name,
        }
    }

    /// Generated key name: `{table}_{columns}_{kind}`.
    fn key_name(&self, table: &TableBuilder, columns: &[String], kind: &str) -> String {
        let name = format!("{}_{}_{}", table.name, columns.join("_"), kind)
            .to_lowercase()
            .replace(['-', '.'], "_");
        self.shorten(name)
    }

    fn primary_name(&self, table: &TableBuilder) -> String {
        self.shorten(format!("{}_pkey", table.name).to_lowercase())
    }

    fn deferrable(&self, mode: Option<Deferrable>) -> Result<String> {
        match mode {
            None => Ok(String::new()),
            Some(mode) if self.fmt.dialect().supports_deferrable() => {
                Ok(format!(" {}", mode.clause()))
            }
            Some(_) => {
                let dialect = self.dialect_name();
                Err(Error::capability(
                    dialect,
                    format!("{} does not support deferrable", dialect),
                ))
            }
        }
    }

    /// `if not exists` / `if exists` keyword when the dialect has one.
    fn native_guard(&self, wanted: bool, keyword: &'static str) -> &'static str {
        if wanted && self.ddl.if_exists == IfExistsStyle::Native {
            keyword
        } else {
            ""
        }
    }

    /// Wrap a statement that should only run when the object does (`exists`)
    /// or does not exist, for dialects without a native guard.
    fn guard(&self, sql: String, quoted: &str, exists: bool, object_type: &str) -> String {
        match self.ddl.if_exists {
            IfExistsStyle::Native => sql,
            IfExistsStyle::ObjectId => format!(
                "if object_id('{}', '{}') is {}null {}",
                quoted.replace('\'', "''"),
                object_type,
                if exists { "not " } else { "" },
                sql
            ),
            IfExistsStyle::PlSql => format!(
                "begin execute immediate '{}'; exception when others then if sqlcode != {} then raise; end if; end;",
                sql.replace('\'', "''"),
                if exists { -942 } else { -955 }
            ),
        }
    }

    fn check_identifier_option(&self, value: &str, what: &str) -> Result<()> {
        if value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            Ok(())
        } else {
            Err(Error::validation(format!("Invalid {}: {}", what, value)))
        }
    }

    fn check_table_options(&self, table: &TableBuilder, creating: bool) -> Result<()> {
        let mysql_options = [
            ("engine", &table.engine),
            ("charset", &table.charset),
            ("collate", &table.collate),
            ("inherits", &table.inherits),
        ];
        for (option, value) in mysql_options {
            if value.is_none() {
                continue;
            }
            let supported = if option == "inherits" {
                self.ddl.inherits
            } else {
                self.ddl.table_options
            };
            if !supported {
                return Err(Error::validation(format!(
                    "Table option '{}' is not supported by the {} dialect",
                    option,
                    self.dialect_name()
                )));
            }
            if !creating {
                return Err(Error::validation(format!(
                    "Table option '{}' can only be used when creating a table",
                    option
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Columns
    // ========================================================================

    pub(crate) fn column_definition(
        &mut self,
        table: &TableBuilder,
        column: &ColumnDef,
    ) -> Result<String> {
        let mut sql = format!(
            "{} {}",
            self.quote(&column.name),
            self.schema.column_type(column, &self.fmt)
        );

        if !self.schema.is_increments(column) {
            let forced = self.ddl.primary_forces_not_null
                && table.primary_columns().contains(&column.name.as_str());
            let null = match column.nullable {
                Some(false) => Some("not null"),
                _ if forced => Some("not null"),
                Some(true) => Some("null"),
                None => None,
            };
            let default = match &column.default {
                Some(value) => Some(self.default_clause(column, value)?),
                None => None,
            };
            let (first, second) = if self.ddl.default_before_null {
                (default, null.map(str::to_string))
            } else {
                (null.map(str::to_string), default)
            };
            for part in [first, second].into_iter().flatten() {
                sql.push(' ');
                sql.push_str(&part);
            }
        }

        if let Some(collation) = &column.collate {
            if self.ddl.table_options {
                sql.push_str(&format!(" collate {}", self.string_literal(collation)));
            } else {
                self.check_identifier_option(collation, "collation")?;
                sql.push_str(&format!(" collate {}", collation));
            }
        }
        if let (Some(comment), CommentStyle::Inline) = (&column.comment, self.ddl.comments) {
            sql.push_str(&format!(" comment {}", self.string_literal(comment)));
        }
        if self.ddl.column_position {
            match &column.position {
                Some(ColumnPosition::First) => sql.push_str(" first"),
                Some(ColumnPosition::After(other)) => {
                    sql.push_str(&format!(" after {}", self.quote(other)))
                }
                None => {}
            }
        }
        for check in &column.checks {
            sql.push(' ');
            sql.push_str(&self.column_check(column, check)?);
        }
        Ok(sql)
    }

    fn default_clause(&mut self, column: &ColumnDef, value: &Operand) -> Result<String> {
        let text = match value {
            Operand::Raw(raw) => self.inline_raw(raw)?,
            Operand::Value(Value::Null) => "null".to_string(),
            Operand::Value(Value::Undefined) => {
                return Err(Error::binding(format!(
                    "Undefined default value for column '{}'",
                    column.name
                )))
            }
            Operand::Value(Value::Bool(b)) => format!("'{}'", u8::from(*b)),
            Operand::Value(Value::Json(json)) => self.string_literal(&json.to_string()),
            Operand::Value(value) => self.string_literal(&value.as_text()),
            Operand::Query(_) | Operand::Deferred(_) => {
                return Err(Error::validation(format!(
                    "Default of column '{}' must be a value or a raw expression",
                    column.name
                )))
            }
        };
        Ok(format!("default {}", text))
    }

    fn named_check(&self, name: Option<&str>, body: &str) -> String {
        match name {
            Some(name) => format!("constraint {} check ({})", self.quote(name), body),
            None => format!("check ({})", body),
        }
    }

    fn column_check(&self, column: &ColumnDef, check: &ColumnCheck) -> Result<String> {
        let col = self.quote(&column.name);
        let body = match &check.kind {
            CheckKind::Positive => format!("{} > 0", col),
            CheckKind::Negative => format!("{} < 0", col),
            CheckKind::In(values) => format!("{} in ({})", col, self.literal_list(values)),
            CheckKind::NotIn(values) => format!("{} not in ({})", col, self.literal_list(values)),
            CheckKind::Between(ranges) => ranges
                .iter()
                .map(|(low, high)| {
                    format!("{} between {} and {}", col, self.literal(low), self.literal(high))
                })
                .collect::<Vec<_>>()
                .join(" or "),
            CheckKind::Length { operator, length } => {
                if !LENGTH_OPERATORS.contains(&operator.as_str()) {
                    return Err(Error::validation(format!(
                        "The operator '{}' is not allowed in a length check",
                        operator
                    )));
                }
                format!("{}({}) {} {}", self.schema.length_function(), col, operator, length)
            }
            CheckKind::Regex(pattern) => self
                .schema
                .check_regex(&col, &self.string_literal(pattern))
                .ok_or_else(|| unsupported(&self.fmt, "Regular expression checks"))?,
        };
        Ok(self.named_check(check.name.as_deref(), &body))
    }

    // ========================================================================
    // Tables
    // ========================================================================

    pub(crate) fn create_table(&mut self, table: &TableBuilder) -> Result<()> {
        let TableMode::Create { if_not_exists, like } = &table.mode else {
            return self.alter_table(table);
        };
        self.check_table_options(table, true)?;
        let name = self.qualified(&table.name, table.schema.as_deref());
        let guard = self.native_guard(*if_not_exists, "if not exists ");
        let mut rebuild = RebuildPlan::new(&table.name);

        if let Some(like) = like {
            let source = self.qualified(like, table.schema.as_deref());
            let sql = match self.ddl.create_like {
                CreateLikeStyle::LikeIncludingAll => {
                    format!("create table {}{} (like {} including all)", guard, name, source)
                }
                CreateLikeStyle::LikeParens => {
                    format!("create table {}{} (like {})", guard, name, source)
                }
                CreateLikeStyle::Like => format!("create table {}{} like {}", guard, name, source),
                CreateLikeStyle::AsSelect => format!(
                    "create table {}{} as select * from {} where 0=1",
                    guard, name, source
                ),
                CreateLikeStyle::AsSelectParens => format!(
                    "create table {}{} as (select * from {} where 0=1)",
                    guard, name, source
                ),
                CreateLikeStyle::SelectInto => {
                    format!("select * into {} from {} where 0=1", name, source)
                }
            };
            let sql = if *if_not_exists {
                self.guard(sql, &name, false, "U")
            } else {
                sql
            };
            self.push(sql);

            // columns declared on top of the copy are added afterwards
            let added: Vec<&ColumnDef> = table.columns.iter().collect();
            if !added.is_empty() {
                self.add_columns(table, &name, &added)?;
            }
            self.comments(table, &name, false)?;
            self.table_ops(table, &name, false, &mut rebuild)?;
            return self.finish_rebuild(rebuild);
        }

        let mut defs = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            defs.push(self.column_definition(table, column)?);
        }
        for op in &table.ops {
            match op {
                TableOp::Primary { columns, options } => {
                    let key = options
                        .name
                        .clone()
                        .unwrap_or_else(|| self.primary_name(table));
                    defs.push(format!(
                        "constraint {} primary key ({}){}",
                        self.quote(&key),
                        self.columns(columns),
                        self.deferrable(options.deferrable)?
                    ));
                }
                TableOp::Check { expression, name } => {
                    let body = self.inline_raw(expression)?;
                    defs.push(self.named_check(name.as_deref(), &body));
                }
                TableOp::Foreign(index) if self.ddl.keys == KeyStyle::Sqlite => {
                    defs.push(self.foreign_constraint(table, &table.foreign_keys[*index])?);
                }
                _ => {}
            }
        }

        let mut sql = format!("create table {}{} ({})", guard, name, defs.join(", "));
        if self.ddl.table_options {
            if let Some(charset) = &table.charset {
                self.check_identifier_option(charset, "charset")?;
                sql.push_str(&format!(" default character set {}", charset));
            }
            if let Some(collation) = &table.collate {
                self.check_identifier_option(collation, "collation")?;
                sql.push_str(&format!(" collate {}", collation));
            }
            if let Some(engine) = &table.engine {
                self.check_identifier_option(engine, "engine")?;
                sql.push_str(&format!(" engine = {}", engine));
            }
            if let (Some(comment), CommentStyle::Inline) = (&table.comment, self.ddl.comments) {
                sql.push_str(&format!(" comment = {}", self.string_literal(comment)));
            }
        }
        if let Some(parent) = &table.inherits {
            sql.push_str(&format!(
                " inherits ({})",
                self.qualified(parent, table.schema.as_deref())
            ));
        }
        let sql = if *if_not_exists {
            self.guard(sql, &name, false, "U")
        } else {
            sql
        };
        self.push(sql);

        self.comments(table, &name, true)?;
        self.table_ops(table, &name, true, &mut rebuild)?;
        self.finish_rebuild(rebuild)
    }

    pub(crate) fn alter_table(&mut self, table: &TableBuilder) -> Result<()> {
        self.check_table_options(table, false)?;
        let name = self.qualified(&table.name, table.schema.as_deref());
        let mut rebuild = RebuildPlan::new(&table.name);

        let (added, altered): (Vec<&ColumnDef>, Vec<&ColumnDef>) =
            table.columns.iter().partition(|c| c.alter.is_none());
        if !added.is_empty() {
            self.add_columns(table, &name, &added)?;
        }
        if !altered.is_empty() {
            self.alter_columns(table, &name, &altered, &mut rebuild)?;
        }
        self.comments(table, &name, false)?;
        self.table_ops(table, &name, false, &mut rebuild)?;
        self.finish_rebuild(rebuild)
    }

    fn finish_rebuild(&mut self, rebuild: RebuildPlan) -> Result<()> {
        if !rebuild.ops.is_empty() {
            self.out.push(Emitted::Rebuild(rebuild));
        }
        Ok(())
    }

    fn add_columns(
        &mut self,
        table: &TableBuilder,
        name: &str,
        columns: &[&ColumnDef],
    ) -> Result<()> {
        let mut defs = Vec::with_capacity(columns.len());
        for column in columns {
            defs.push(self.column_definition(table, column)?);
        }
        match self.ddl.alter {
            AlterStyle::Postgres => {
                let adds: Vec<String> = defs.iter().map(|d| format!("add column {}", d)).collect();
                self.push(format!("alter table {} {}", name, adds.join(", ")));
            }
            AlterStyle::MySql => {
                let adds: Vec<String> = defs.iter().map(|d| format!("add {}", d)).collect();
                self.push(format!("alter table {} {}", name, adds.join(", ")));
            }
            AlterStyle::Sqlite => {
                for def in defs {
                    self.push(format!("alter table {} add column {}", name, def));
                }
            }
            AlterStyle::MsSql => self.push(format!("alter table {} add {}", name, defs.join(", "))),
            AlterStyle::Oracle => {
                self.push(format!("alter table {} add ({})", name, defs.join(", ")))
            }
        }
        Ok(())
    }

    fn alter_columns(
        &mut self,
        table: &TableBuilder,
        name: &str,
        columns: &[&ColumnDef],
        rebuild: &mut RebuildPlan,
    ) -> Result<()> {
        match self.ddl.alter {
            AlterStyle::Postgres => {
                let changes_type = columns
                    .iter()
                    .any(|c| c.alter.is_some_and(|a| a.alter_type));
                if self.ddl.experimental_alter && changes_type {
                    warn!(
                        dialect = self.dialect_name(),
                        table = %table.name,
                        "altering a column type relies on an experimental session setting"
                    );
                    self.push("SET enable_experimental_alter_column_type_general = true");
                }
                for column in columns {
                    let options = column.alter.unwrap_or_default();
                    let prefix =
                        format!("alter table {} alter column {} ", name, self.quote(&column.name));
                    let ty = self.schema.column_type(column, &self.fmt);
                    if options.alter_type {
                        self.push(format!("{}drop default", prefix));
                    }
                    if options.alter_nullable {
                        self.push(format!("{}drop not null", prefix));
                    }
                    if options.alter_type {
                        let using = if self.ddl.alter_type_using {
                            format!(" using ({}::{})", self.quote(&column.name), ty)
                        } else {
                            String::new()
                        };
                        self.push(format!("{}type {}{}", prefix, ty, using));
                    }
                    if let Some(value) = &column.default {
                        let default = self.default_clause(column, value)?;
                        self.push(format!("{}set {}", prefix, default));
                    }
                    if options.alter_nullable && column.nullable == Some(false) {
                        self.push(format!("{}set not null", prefix));
                    }
                }
            }
            AlterStyle::MySql => {
                let mut modifies = Vec::with_capacity(columns.len());
                for column in columns {
                    modifies.push(format!("modify {}", self.column_definition(table, column)?));
                }
                self.push(format!("alter table {} {}", name, modifies.join(", ")));
            }
            AlterStyle::Sqlite => {
                for column in columns {
                    let definition = self.column_definition(table, column)?;
                    rebuild.ops.push(RebuildOp::AlterColumn {
                        column: column.name.clone(),
                        definition,
                    });
                }
            }
            AlterStyle::MsSql => {
                for column in columns {
                    let ty = self.schema.column_type(column, &self.fmt);
                    let null = if column.nullable == Some(false) {
                        "not null"
                    } else {
                        "null"
                    };
                    self.push(format!(
                        "alter table {} alter column {} {} {}",
                        name,
                        self.quote(&column.name),
                        ty,
                        null
                    ));
                    if let Some(value) = &column.default {
                        let default = self.default_clause(column, value)?;
                        let key =
                            self.key_name(table, std::slice::from_ref(&column.name), "default");
                        self.push(format!(
                            "alter table {} add constraint {} {} for {}",
                            name,
                            self.quote(&key),
                            default,
                            self.quote(&column.name)
                        ));
                    }
                }
            }
            AlterStyle::Oracle => {
                let mut defs = Vec::with_capacity(columns.len());
                for column in columns {
                    defs.push(self.column_definition(table, column)?);
                }
                self.push(format!("alter table {} modify ({})", name, defs.join(", ")));
            }
        }
        Ok(())
    }

    fn comments(&mut self, table: &TableBuilder, name: &str, creating: bool) -> Result<()> {
        let column_comments: Vec<(&str, &str)> = table
            .columns
            .iter()
            .filter_map(|c| c.comment.as_deref().map(|text| (c.name.as_str(), text)))
            .collect();

        match self.ddl.comments {
            CommentStyle::CommentOn => {
                if let Some(comment) = &table.comment {
                    self.push(format!(
                        "comment on table {} is {}",
                        name,
                        self.string_literal(comment)
                    ));
                }
                for (column, text) in column_comments {
                    self.push(format!(
                        "comment on column {}.{} is {}",
                        name,
                        self.quote(column),
                        self.string_literal(text)
                    ));
                }
            }
            // column comments are part of the definitions
            CommentStyle::Inline => {
                if let (Some(comment), false) = (&table.comment, creating) {
                    self.push(format!(
                        "alter table {} comment = {}",
                        name,
                        self.string_literal(comment)
                    ));
                }
            }
            CommentStyle::ExtendedProperty => {
                let schema = table.schema.as_deref().unwrap_or("dbo");
                let base = format!(
                    "EXEC sp_addextendedproperty N'MS_Description', {{}}, N'Schema', {}, N'Table', {}",
                    national(schema),
                    national(&table.name)
                );
                if let Some(comment) = &table.comment {
                    self.push(base.replacen("{}", &national(comment), 1));
                }
                for (column, text) in column_comments {
                    self.push(format!(
                        "{}, N'Column', {}",
                        base.replacen("{}", &national(text), 1),
                        national(column)
                    ));
                }
            }
            CommentStyle::Ignored => {
                if table.comment.is_some() || !column_comments.is_empty() {
                    warn!(
                        dialect = self.dialect_name(),
                        table = %table.name,
                        "comments are not supported by this dialect and were ignored"
                    );
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Table operations
    // ========================================================================

    fn table_ops(
        &mut self,
        table: &TableBuilder,
        name: &str,
        creating: bool,
        rebuild: &mut RebuildPlan,
    ) -> Result<()> {
        for op in &table.ops {
            match op {
                TableOp::Index { columns, options } => self.index(table, name, columns, options)?,
                TableOp::Unique { columns, options } => self.unique(table, name, columns, options)?,
                TableOp::Primary { columns, options } => {
                    // inline in create table
                    if !creating {
                        self.primary(table, name, columns, options, rebuild)?;
                    }
                }
                TableOp::Foreign(index) => {
                    if !(creating && self.ddl.keys == KeyStyle::Sqlite) {
                        let fk = &table.foreign_keys[*index];
                        let constraint = self.foreign_constraint(table, fk)?;
                        if self.ddl.keys == KeyStyle::Sqlite {
                            rebuild.ops.push(RebuildOp::AddForeign(constraint));
                        } else {
                            self.push(format!("alter table {} add {}", name, constraint));
                        }
                    }
                }
                TableOp::DropIndex { columns, name: key } => {
                    let key = key
                        .clone()
                        .unwrap_or_else(|| self.key_name(table, columns, "index"));
                    let sql = match self.ddl.keys {
                        KeyStyle::Postgres | KeyStyle::Cockroach => {
                            format!("drop index {}", self.qualified(&key, table.schema.as_deref()))
                        }
                        KeyStyle::MySql => {
                            format!("alter table {} drop index {}", name, self.quote(&key))
                        }
                        KeyStyle::Sqlite => format!("drop index {}", self.quote(&key)),
                        KeyStyle::MsSql => format!("drop index {} on {}", self.quote(&key), name),
                    };
                    self.push(sql);
                }
                TableOp::DropUnique { columns, name: key } => {
                    let key = key
                        .clone()
                        .unwrap_or_else(|| self.key_name(table, columns, "unique"));
                    let sql = match self.ddl.keys {
                        KeyStyle::Postgres => {
                            format!("alter table {} drop constraint {}", name, self.quote(&key))
                        }
                        KeyStyle::Cockroach => {
                            format!("drop index {}@{} cascade", name, self.quote(&key))
                        }
                        KeyStyle::MySql => {
                            format!("alter table {} drop index {}", name, self.quote(&key))
                        }
                        KeyStyle::Sqlite => format!("drop index {}", self.quote(&key)),
                        KeyStyle::MsSql => format!("drop index {} on {}", self.quote(&key), name),
                    };
                    self.push(sql);
                }
                TableOp::DropPrimary(key) => {
                    let key = key.clone().unwrap_or_else(|| self.primary_name(table));
                    match self.ddl.keys {
                        KeyStyle::MySql => {
                            self.push(format!("alter table {} drop primary key", name))
                        }
                        KeyStyle::Sqlite => rebuild.ops.push(RebuildOp::DropPrimary),
                        _ => self.push(format!(
                            "alter table {} drop constraint {}",
                            name,
                            self.quote(&key)
                        )),
                    }
                }
                TableOp::DropForeign { columns, name: key } => match self.ddl.keys {
                    KeyStyle::Sqlite => rebuild.ops.push(RebuildOp::DropForeign {
                        columns: columns.clone(),
                        name: key.clone(),
                    }),
                    style => {
                        let key = key
                            .clone()
                            .unwrap_or_else(|| self.key_name(table, columns, "foreign"));
                        let verb = if style == KeyStyle::MySql {
                            "foreign key"
                        } else {
                            "constraint"
                        };
                        self.push(format!(
                            "alter table {} drop {} {}",
                            name,
                            verb,
                            self.quote(&key)
                        ));
                    }
                },
                TableOp::RenameColumn { from, to } => self.rename_column(name, from, to),
                TableOp::DropColumns(columns) => match self.ddl.alter {
                    AlterStyle::Postgres => {
                        let drops: Vec<String> = columns
                            .iter()
                            .map(|c| format!("drop column {}", self.quote(c)))
                            .collect();
                        self.push(format!("alter table {} {}", name, drops.join(", ")));
                    }
                    AlterStyle::MySql => {
                        let drops: Vec<String> = columns
                            .iter()
                            .map(|c| format!("drop {}", self.quote(c)))
                            .collect();
                        self.push(format!("alter table {} {}", name, drops.join(", ")));
                    }
                    AlterStyle::Sqlite => rebuild.ops.push(RebuildOp::DropColumns(columns.clone())),
                    AlterStyle::MsSql => self.push(format!(
                        "alter table {} drop column {}",
                        name,
                        self.columns(columns)
                    )),
                    AlterStyle::Oracle => {
                        self.push(format!("alter table {} drop ({})", name, self.columns(columns)))
                    }
                },
                TableOp::SetNullable { column, nullable } => match self.ddl.alter {
                    AlterStyle::Postgres => self.push(format!(
                        "alter table {} alter column {} {}",
                        name,
                        self.quote(column),
                        if *nullable { "drop not null" } else { "set not null" }
                    )),
                    AlterStyle::Oracle => self.push(format!(
                        "alter table {} modify ({} {})",
                        name,
                        self.quote(column),
                        if *nullable { "NULL" } else { "NOT NULL" }
                    )),
                    AlterStyle::Sqlite => rebuild.ops.push(RebuildOp::SetNullable {
                        column: column.clone(),
                        nullable: *nullable,
                    }),
                    AlterStyle::MySql | AlterStyle::MsSql => {
                        return Err(unsupported(&self.fmt, "Changing column nullability"))
                    }
                },
                TableOp::Check { expression, name: key } => {
                    // inline in create table
                    if creating {
                        continue;
                    }
                    if self.ddl.alter == AlterStyle::Sqlite {
                        return Err(unsupported(
                            &self.fmt,
                            "Adding check constraints to an existing table",
                        ));
                    }
                    let body = self.inline_raw(expression)?;
                    let check = self.named_check(key.as_deref(), &body);
                    self.push(format!("alter table {} add {}", name, check));
                }
                TableOp::DropChecks(keys) => {
                    let verb = match self.ddl.alter {
                        AlterStyle::Sqlite => {
                            return Err(unsupported(&self.fmt, "Dropping check constraints"))
                        }
                        AlterStyle::MySql => "check",
                        _ => "constraint",
                    };
                    for key in keys {
                        self.push(format!(
                            "alter table {} drop {} {}",
                            name,
                            verb,
                            self.quote(key)
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn index(
        &mut self,
        table: &TableBuilder,
        name: &str,
        columns: &[String],
        options: &IndexOptions,
    ) -> Result<()> {
        let key = options
            .name
            .clone()
            .unwrap_or_else(|| self.key_name(table, columns, "index"));
        if let Some(index_type) = &options.index_type {
            self.check_identifier_option(index_type, "index type")?;
        }
        let cols = self.columns(columns);
        match self.ddl.keys {
            KeyStyle::Postgres | KeyStyle::Cockroach => {
                if self.ddl.skip_indexes {
                    warn!(
                        dialect = self.dialect_name(),
                        table = %table.name,
                        index = %key,
                        "index creation is not supported by this dialect, skipping"
                    );
                    return Ok(());
                }
                let using = options
                    .index_type
                    .as_ref()
                    .map(|t| format!(" using {}", t))
                    .unwrap_or_default();
                self.push(format!(
                    "create index {} on {}{} ({})",
                    self.quote(&key),
                    name,
                    using,
                    cols
                ));
            }
            KeyStyle::MySql => {
                let index_type = options
                    .index_type
                    .as_ref()
                    .map(|t| format!("{} ", t))
                    .unwrap_or_default();
                self.push(format!(
                    "alter table {} add {}index {}({})",
                    name,
                    index_type,
                    self.quote(&key),
                    cols
                ));
            }
            KeyStyle::Sqlite | KeyStyle::MsSql => {
                self.push(format!("create index {} on {} ({})", self.quote(&key), name, cols))
            }
        }
        Ok(())
    }

    fn unique(
        &mut self,
        table: &TableBuilder,
        name: &str,
        columns: &[String],
        options: &IndexOptions,
    ) -> Result<()> {
        let key = options
            .name
            .clone()
            .unwrap_or_else(|| self.key_name(table, columns, "unique"));
        let deferrable = self.deferrable(options.deferrable)?;
        let cols = self.columns(columns);
        let sql = match self.ddl.keys {
            KeyStyle::Postgres | KeyStyle::Cockroach => format!(
                "alter table {} add constraint {} unique ({}){}",
                name,
                self.quote(&key),
                cols,
                deferrable
            ),
            KeyStyle::MySql => {
                format!("alter table {} add unique {}({})", name, self.quote(&key), cols)
            }
            KeyStyle::Sqlite => {
                format!("create unique index {} on {} ({})", self.quote(&key), name, cols)
            }
            KeyStyle::MsSql => {
                let predicate = columns
                    .iter()
                    .map(|c| format!("{} is not null", self.quote(c)))
                    .collect::<Vec<_>>()
                    .join(" and ");
                format!(
                    "create unique index {} on {} ({}) where {}",
                    self.quote(&key),
                    name,
                    cols,
                    predicate
                )
            }
        };
        self.push(sql);
        Ok(())
    }

    fn primary(
        &mut self,
        table: &TableBuilder,
        name: &str,
        columns: &[String],
        options: &IndexOptions,
        rebuild: &mut RebuildPlan,
    ) -> Result<()> {
        let key = options
            .name
            .clone()
            .unwrap_or_else(|| self.primary_name(table));
        let deferrable = self.deferrable(options.deferrable)?;
        let constraint = format!(
            "constraint {} primary key ({}){}",
            self.quote(&key),
            self.columns(columns),
            deferrable
        );
        if self.ddl.keys == KeyStyle::Sqlite {
            rebuild.ops.push(RebuildOp::AddPrimary(constraint));
        } else {
            self.push(format!("alter table {} add {}", name, constraint));
        }
        Ok(())
    }

    fn foreign_constraint(&self, table: &TableBuilder, fk: &ForeignKey) -> Result<String> {
        let target = fk.in_table.as_deref().ok_or_else(|| {
            Error::validation(format!(
                "Foreign key on ({}) does not name the referenced table",
                fk.columns.join(", ")
            ))
        })?;
        if fk.references.is_empty() {
            return Err(Error::validation(format!(
                "Foreign key on ({}) does not name the referenced columns",
                fk.columns.join(", ")
            )));
        }
        let key = fk
            .key_name
            .clone()
            .unwrap_or_else(|| self.key_name(table, &fk.columns, "foreign"));

        let mut sql = format!(
            "constraint {} foreign key ({}) references {} ({})",
            self.quote(&key),
            self.columns(&fk.columns),
            self.qualified(target, table.schema.as_deref()),
            self.columns(&fk.references)
        );
        for (clause, action) in [("on delete", &fk.on_delete), ("on update", &fk.on_update)] {
            if let Some(action) = action {
                if !REFERENTIAL_ACTIONS.contains(&action.to_lowercase().as_str()) {
                    return Err(Error::validation(format!(
                        "Invalid referential action: {}",
                        action
                    )));
                }
                sql.push_str(&format!(" {} {}", clause, action));
            }
        }
        sql.push_str(&self.deferrable(fk.deferrable)?);
        Ok(sql)
    }

    fn rename_column(&mut self, name: &str, from: &str, to: &str) {
        let (from_q, to_q) = (self.quote(from), self.quote(to));
        match self.ddl.alter {
            AlterStyle::Postgres | AlterStyle::Sqlite => {
                self.push(format!("alter table {} rename {} to {}", name, from_q, to_q))
            }
            AlterStyle::MySql | AlterStyle::Oracle => self.push(format!(
                "alter table {} rename column {} to {}",
                name, from_q, to_q
            )),
            AlterStyle::MsSql => self.push_bound(
                "exec sp_rename ?, ?, 'COLUMN'",
                vec![Value::from(format!("{}.{}", name, from)), Value::from(to)],
            ),
        }
    }

    pub(crate) fn drop_table(&mut self, target: &ObjectName, if_exists: bool) {
        let name = self.object(target);
        let sql = format!(
            "drop table {}{}",
            self.native_guard(if_exists, "if exists "),
            name
        );
        let sql = if if_exists {
            self.guard(sql, &name, true, "U")
        } else {
            sql
        };
        self.push(sql);
    }

    pub(crate) fn rename_table(&mut self, from: &ObjectName, to: &str) {
        let from_q = self.object(from);
        let to_q = self.quote(to);
        match self.ddl.rename_table {
            RenameTableStyle::AlterRenameTo => {
                self.push(format!("alter table {} rename to {}", from_q, to_q))
            }
            RenameTableStyle::RenameTable => {
                self.push(format!("rename table {} to {}", from_q, to_q))
            }
            RenameTableStyle::Rename => self.push(format!("rename {} to {}", from_q, to_q)),
            RenameTableStyle::SpRename => self.push_bound(
                "exec sp_rename ?, ?",
                vec![Value::from(from.to_string()), Value::from(to)],
            ),
        }
    }

    pub(crate) fn has_table(&mut self, target: &ObjectName) {
        let probe = self
            .schema
            .has_table(&target.name, target.schema.as_deref(), &self.fmt);
        self.out.push(Emitted::Probe(probe));
    }

    pub(crate) fn has_column(&mut self, target: &ObjectName, column: &str) {
        let probe = self
            .schema
            .has_column(&target.name, column, target.schema.as_deref(), &self.fmt);
        self.out.push(Emitted::Probe(probe));
    }

    // ========================================================================
    // Schemas and extensions
    // ========================================================================

    pub(crate) fn create_schema(&mut self, schema: &str, if_not_exists: bool) -> Result<()> {
        if !self.ddl.schemas {
            return Err(unsupported(&self.fmt, "create_schema"));
        }
        self.push(format!(
            "create schema {}{}",
            if if_not_exists { "if not exists " } else { "" },
            self.quote(schema)
        ));
        Ok(())
    }

    pub(crate) fn drop_schema(
        &mut self,
        schema: &str,
        if_exists: bool,
        cascade: bool,
    ) -> Result<()> {
        if !self.ddl.schemas {
            return Err(unsupported(&self.fmt, "drop_schema"));
        }
        self.push(format!(
            "drop schema {}{}{}",
            if if_exists { "if exists " } else { "" },
            self.quote(schema),
            if cascade { " cascade" } else { "" }
        ));
        Ok(())
    }

    pub(crate) fn create_extension(&mut self, extension: &str, if_not_exists: bool) -> Result<()> {
        if !self.ddl.extensions {
            return Err(unsupported(&self.fmt, "create_extension"));
        }
        self.push(format!(
            "create extension {}{}",
            if if_not_exists { "if not exists " } else { "" },
            self.quote(extension)
        ));
        Ok(())
    }

    pub(crate) fn drop_extension(&mut self, extension: &str, if_exists: bool) -> Result<()> {
        if !self.ddl.extensions {
            return Err(unsupported(&self.fmt, "drop_extension"));
        }
        self.push(format!(
            "drop extension {}{}",
            if if_exists { "if exists " } else { "" },
            self.quote(extension)
        ));
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    fn view_select(&mut self, view: &ViewBuilder) -> Result<String> {
        let query = view
            .query
            .as_ref()
            .ok_or_else(|| Error::validation(format!("View '{}' has no query", view.name)))?;
        let sql = render_query(query, &mut self.fmt)?;
        let bindings = self.fmt.take_bindings();
        if bindings.iter().any(Value::contains_undefined) {
            return Err(Error::binding(format!(
                "Undefined binding(s) detected in the query of view '{}'",
                view.name
            )));
        }
        Ok(interpolate(
            &sql,
            &bindings,
            self.fmt.dialect().escape_rules(),
            self.tz(),
        ))
    }

    pub(crate) fn create_view(
        &mut self,
        view: &ViewBuilder,
        replace: bool,
        materialized: bool,
    ) -> Result<()> {
        let support = self.fmt.dialect().view_support();
        if materialized && !support.materialized {
            return Err(unsupported(&self.fmt, "Materialized views"));
        }
        if view.check.is_some() && !support.check_option {
            return Err(unsupported(&self.fmt, "View check options"));
        }

        let name = self.qualified(&view.name, view.schema.as_deref());
        let columns = if view.columns.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.columns(&view.columns))
        };
        let select = self.view_select(view)?;
        let check = view
            .check
            .map(|c| format!(" {}", c.clause()))
            .unwrap_or_default();

        let head = if replace {
            match support.create_or_replace {
                CreateOrReplace::OrReplace => "create or replace view",
                CreateOrReplace::OrAlter => {
                    self.push(format!(
                        "CREATE OR ALTER VIEW {}{} AS {}{}",
                        name, columns, select, check
                    ));
                    return Ok(());
                }
                CreateOrReplace::DropThenCreate => {
                    self.push(format!("drop view if exists {}", name));
                    "create view"
                }
                CreateOrReplace::Unsupported => {
                    return Err(unsupported(&self.fmt, "create_view_or_replace"))
                }
            }
        } else if materialized {
            "create materialized view"
        } else {
            "create view"
        };
        self.push(format!("{} {}{} as {}{}", head, name, columns, select, check));
        Ok(())
    }

    pub(crate) fn refresh_materialized_view(
        &mut self,
        target: &ObjectName,
        concurrently: bool,
    ) -> Result<()> {
        if !self.fmt.dialect().view_support().materialized {
            return Err(unsupported(&self.fmt, "Materialized views"));
        }
        match self.ddl.refresh {
            RefreshStyle::Statement => self.push(format!(
                "refresh materialized view {}{}",
                if concurrently { "concurrently " } else { "" },
                self.object(target)
            )),
            RefreshStyle::DbmsMview => self.push(format!(
                "BEGIN DBMS_MVIEW.REFRESH('{}'); END;",
                target.to_string().replace('\'', "''")
            )),
        }
        Ok(())
    }

    pub(crate) fn drop_view(
        &mut self,
        target: &ObjectName,
        if_exists: bool,
        materialized: bool,
    ) -> Result<()> {
        if materialized && !self.fmt.dialect().view_support().materialized {
            return Err(unsupported(&self.fmt, "Materialized views"));
        }
        let name = self.object(target);
        let sql = format!(
            "drop {}view {}{}",
            if materialized { "materialized " } else { "" },
            self.native_guard(if_exists, "if exists "),
            name
        );
        let sql = if if_exists {
            self.guard(sql, &name, true, "V")
        } else {
            sql
        };
        self.push(sql);
        Ok(())
    }

    pub(crate) fn rename_view(&mut self, from: &ObjectName, to: &str) -> Result<()> {
        match (self.ddl.rename_table, self.ddl.alter) {
            (_, AlterStyle::Sqlite) => Err(unsupported(&self.fmt, "rename_view")),
            (RenameTableStyle::AlterRenameTo, _) => {
                self.push(format!(
                    "alter view {} rename to {}",
                    self.object(from),
                    self.quote(to)
                ));
                Ok(())
            }
            _ => {
                self.rename_table(from, to);
                Ok(())
            }
        }
    }

    pub(crate) fn alter_view(&mut self, view: &ViewBuilder) -> Result<()> {
        let support = self.fmt.dialect().view_support();
        let name = self.qualified(&view.name, view.schema.as_deref());
        for alteration in &view.alterations {
            match alteration {
                ViewAlteration::RenameColumn { from, to } => match support.rename_column {
                    ViewColumnRename::AlterView => self.push(format!(
                        "alter view {} rename {} to {}",
                        name,
                        self.quote(from),
                        self.quote(to)
                    )),
                    ViewColumnRename::SpRename => self.push_bound(
                        "exec sp_rename ?, ?, 'COLUMN'",
                        vec![Value::from(format!("{}.{}", name, from)), Value::from(to.as_str())],
                    ),
                    ViewColumnRename::Unsupported => {
                        return Err(unsupported(&self.fmt, "rename column of views"))
                    }
                },
                ViewAlteration::DefaultTo { column, value } => {
                    if !support.set_default {
                        return Err(unsupported(&self.fmt, "change default values of views"));
                    }
                    let literal = match value {
                        Operand::Raw(raw) => self.inline_raw(raw)?,
                        Operand::Value(value) => self.literal(value),
                        _ => {
                            return Err(Error::validation(format!(
                                "Default of view column '{}' must be a value or a raw expression",
                                column
                            )))
                        }
                    };
                    self.push(format!(
                        "alter view {} alter {} set default {}",
                        name,
                        self.quote(column),
                        literal
                    ));
                }
            }
        }
        Ok(())
    }
}

/// `N'..'` literal for SQL Server procedure arguments.
fn national(text: &str) -> String {
    format!("N'{}'", text.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    fn sqls(out: Vec<Emitted>) -> Vec<String> {
        out.into_iter()
            .filter_map(|e| match e {
                Emitted::Sql { sql, .. } => Some(sql),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_key_names_are_normalized() {
        let client = Client::new(Dialect::Postgres);
        let compiler = DdlCompiler::new(&client);
        let table = TableBuilder::create("User-Accounts");
        assert_eq!(
            compiler.key_name(&table, &["Email".to_string()], "unique"),
            "user_accounts_email_unique"
        );
        assert_eq!(compiler.primary_name(&table), "user-accounts_pkey");
    }

    #[test]
    fn test_oracle_shortens_key_names() {
        let client = Client::new(Dialect::Oracle);
        let compiler = DdlCompiler::new(&client);
        let table = TableBuilder::create("a_rather_long_table_name");
        let key = compiler.key_name(&table, &["another_long_column".to_string()], "foreign");
        assert_eq!(key.chars().count(), 30);
    }

    #[test]
    fn test_guards() {
        let client = Client::new(Dialect::MsSql);
        let mut compiler = DdlCompiler::new(&client);
        compiler.drop_table(&ObjectName::new("users", None), true);
        assert_eq!(
            sqls(compiler.finish()),
            vec!["if object_id('[users]', 'U') is not null drop table [users]"]
        );

        let client = Client::new(Dialect::Oracle);
        let mut compiler = DdlCompiler::new(&client);
        compiler.drop_table(&ObjectName::new("users", None), true);
        assert_eq!(
            sqls(compiler.finish()),
            vec!["begin execute immediate 'drop table \"users\"'; exception when others then if sqlcode != -942 then raise; end if; end;"]
        );
    }

    #[test]
    fn test_referential_actions_are_whitelisted() {
        let client = Client::new(Dialect::Postgres);
        let compiler = DdlCompiler::new(&client);
        let table = TableBuilder::create("posts");
        let fk = ForeignKey {
            columns: vec!["user_id".into()],
            references: vec!["id".into()],
            in_table: Some("users".into()),
            on_delete: Some("cascade; drop table users".into()),
            ..Default::default()
        };
        assert!(matches!(
            compiler.foreign_constraint(&table, &fk),
            Err(Error::Validation(_))
        ));
    }
}
