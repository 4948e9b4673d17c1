//! Table builder: columns plus table-level operations, in call order.

use crate::error::Result;
use crate::sql::functions::now;
use crate::sql::raw::Raw;

use super::column::{ColumnBuilder, ColumnDef, ColumnType, Deferrable, ForeignBuilder, ForeignKey};

/// Whether the builder creates a new table or alters an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableMode {
    Create {
        if_not_exists: bool,
        /// Copy the structure of this table.
        like: Option<String>,
    },
    Alter,
}

/// Options shared by index, unique and primary key declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub name: Option<String>,
    /// Index method (`using gin`) or MySQL index type (`fulltext`).
    pub index_type: Option<String>,
    pub deferrable: Option<Deferrable>,
}

impl IndexOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn using(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    pub fn deferrable(mut self, mode: Deferrable) -> Self {
        self.deferrable = Some(mode);
        self
    }
}

/// Table-level operation, rendered after the column statements.
#[derive(Debug, Clone)]
pub enum TableOp {
    Index {
        columns: Vec<String>,
        options: IndexOptions,
    },
    Unique {
        columns: Vec<String>,
        options: IndexOptions,
    },
    Primary {
        columns: Vec<String>,
        options: IndexOptions,
    },
    /// Index into the table's foreign key list.
    Foreign(usize),
    DropIndex {
        columns: Vec<String>,
        name: Option<String>,
    },
    DropUnique {
        columns: Vec<String>,
        name: Option<String>,
    },
    DropPrimary(Option<String>),
    DropForeign {
        columns: Vec<String>,
        name: Option<String>,
    },
    RenameColumn {
        from: String,
        to: String,
    },
    DropColumns(Vec<String>),
    SetNullable {
        column: String,
        nullable: bool,
    },
    Check {
        expression: Raw,
        name: Option<String>,
    },
    DropChecks(Vec<String>),
}

/// Accumulates the definition of one table.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) mode: TableMode,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
    pub(crate) ops: Vec<TableOp>,
    pub(crate) comment: Option<String>,
    pub(crate) engine: Option<String>,
    pub(crate) charset: Option<String>,
    pub(crate) collate: Option<String>,
    pub(crate) inherits: Option<String>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>, mode: TableMode) -> Self {
        Self {
            name: name.into(),
            schema: None,
            mode,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            ops: Vec::new(),
            comment: None,
            engine: None,
            charset: None,
            collate: None,
            inherits: None,
        }
    }

    pub fn create(name: impl Into<String>) -> Self {
        Self::new(
            name,
            TableMode::Create {
                if_not_exists: false,
                like: None,
            },
        )
    }

    pub fn alter(name: impl Into<String>) -> Self {
        Self::new(name, TableMode::Alter)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &TableMode {
        &self.mode
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub(crate) fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    pub(crate) fn push_foreign(&mut self, fk: ForeignKey) -> &mut ForeignKey {
        let index = self.foreign_keys.len();
        self.foreign_keys.push(fk);
        self.ops.push(TableOp::Foreign(index));
        &mut self.foreign_keys[index]
    }

    /// Columns named by primary key operations, in declaration order.
    pub(crate) fn primary_columns(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                TableOp::Primary { columns, .. } => Some(columns),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Declare a column of any type.
    pub fn add_column(&mut self, name: impl Into<String>, ty: ColumnType) -> ColumnBuilder<'_> {
        self.columns.push(ColumnDef::new(name, ty));
        let index = self.columns.len() - 1;
        ColumnBuilder::new(self, index)
    }

    /// Declare a column by type name. Short names are aliased first, so
    /// `"string"` and `"varchar"` are the same type.
    pub fn column_of_type(&mut self, name: &str, type_name: &str) -> Result<ColumnBuilder<'_>> {
        let ty = ColumnType::from_name(type_name)?;
        Ok(self.add_column(name, ty))
    }

    pub fn increments(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Increments)
    }

    pub fn big_increments(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::BigIncrements)
    }

    pub fn integer(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Integer(None))
    }

    pub fn tiny_integer(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::TinyInteger)
    }

    pub fn small_integer(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::SmallInteger)
    }

    pub fn medium_integer(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::MediumInteger)
    }

    pub fn big_integer(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::BigInteger)
    }

    pub fn text(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Text)
    }

    pub fn string(&mut self, name: &str, length: u32) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::String(length))
    }

    pub fn float(&mut self, name: &str, precision: u32, scale: u32) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Floating { precision, scale })
    }

    pub fn double(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(
            name,
            ColumnType::Double {
                precision: None,
                scale: None,
            },
        )
    }

    /// `precision: None` leaves the precision unconstrained where the
    /// dialect allows it.
    pub fn decimal(&mut self, name: &str, precision: Option<u32>, scale: u32) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Decimal { precision, scale })
    }

    pub fn boolean(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Boolean)
    }

    pub fn date(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Date)
    }

    pub fn datetime(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.datetime_with(name, true, None)
    }

    pub fn datetime_with(
        &mut self,
        name: &str,
        use_tz: bool,
        precision: Option<u32>,
    ) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::DateTime { use_tz, precision })
    }

    pub fn time(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Time)
    }

    pub fn timestamp(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.timestamp_with(name, true, None)
    }

    pub fn timestamp_with(
        &mut self,
        name: &str,
        use_tz: bool,
        precision: Option<u32>,
    ) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Timestamp { use_tz, precision })
    }

    pub fn binary(&mut self, name: &str, length: Option<u32>) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Binary(length))
    }

    pub fn enu<S: Into<String>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = S>,
    ) -> ColumnBuilder<'_> {
        let values = values.into_iter().map(Into::into).collect();
        self.add_column(name, ColumnType::Enum(values))
    }

    pub fn json(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Json)
    }

    pub fn jsonb(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Jsonb)
    }

    pub fn uuid(&mut self, name: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Uuid)
    }

    /// A column whose type text is passed through as given.
    pub fn specific_type(&mut self, name: &str, type_text: &str) -> ColumnBuilder<'_> {
        self.add_column(name, ColumnType::Specific(type_text.to_string()))
    }

    /// `created_at` / `updated_at` columns.
    ///
    /// `use_timestamps` picks `timestamp` over `datetime`; `default_to_now`
    /// makes both `not null default CURRENT_TIMESTAMP`.
    pub fn timestamps(&mut self, use_timestamps: bool, default_to_now: bool, camel_case: bool) {
        let names = timestamp_names(camel_case);
        for name in names {
            let column = if use_timestamps {
                self.timestamp(name)
            } else {
                self.datetime(name)
            };
            if default_to_now {
                let _ = column.not_nullable().default_to(now(None));
            }
        }
    }

    pub fn drop_timestamps(&mut self, camel_case: bool) {
        self.drop_columns(timestamp_names(camel_case));
    }

    // ========================================================================
    // Keys and indexes
    // ========================================================================

    pub fn index<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        options: IndexOptions,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::Index { columns, options });
        self
    }

    pub fn unique<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        options: IndexOptions,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::Unique { columns, options });
        self
    }

    pub fn primary<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        options: IndexOptions,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::Primary { columns, options });
        self
    }

    /// Declare a (possibly composite) foreign key.
    pub fn foreign<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> ForeignBuilder<'_> {
        let fk = self.push_foreign(ForeignKey {
            columns: collect(columns),
            ..Default::default()
        });
        ForeignBuilder::new(fk)
    }

    pub fn drop_index<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        name: Option<&str>,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::DropIndex {
            columns,
            name: name.map(str::to_string),
        });
        self
    }

    pub fn drop_unique<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        name: Option<&str>,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::DropUnique {
            columns,
            name: name.map(str::to_string),
        });
        self
    }

    pub fn drop_primary(&mut self, name: Option<&str>) -> &mut Self {
        self.ops.push(TableOp::DropPrimary(name.map(str::to_string)));
        self
    }

    pub fn drop_foreign<S: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        name: Option<&str>,
    ) -> &mut Self {
        let columns = collect(columns);
        self.ops.push(TableOp::DropForeign {
            columns,
            name: name.map(str::to_string),
        });
        self
    }

    // ========================================================================
    // Column operations
    // ========================================================================

    pub fn rename_column(&mut self, from: &str, to: &str) -> &mut Self {
        self.ops.push(TableOp::RenameColumn {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    pub fn drop_column(&mut self, name: &str) -> &mut Self {
        self.drop_columns([name])
    }

    pub fn drop_columns<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.ops.push(TableOp::DropColumns(collect(names)));
        self
    }

    pub fn set_nullable(&mut self, column: &str) -> &mut Self {
        self.ops.push(TableOp::SetNullable {
            column: column.to_string(),
            nullable: true,
        });
        self
    }

    pub fn drop_nullable(&mut self, column: &str) -> &mut Self {
        self.ops.push(TableOp::SetNullable {
            column: column.to_string(),
            nullable: false,
        });
        self
    }

    /// Table check constraint from a raw expression.
    pub fn check(&mut self, expression: impl Into<Raw>, name: Option<&str>) -> &mut Self {
        self.ops.push(TableOp::Check {
            expression: expression.into(),
            name: name.map(str::to_string),
        });
        self
    }

    pub fn drop_checks<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.ops.push(TableOp::DropChecks(collect(names)));
        self
    }

    // ========================================================================
    // Table options
    // ========================================================================

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    /// MySQL storage engine; create only.
    pub fn engine(&mut self, engine: impl Into<String>) -> &mut Self {
        self.engine = Some(engine.into());
        self
    }

    /// MySQL default character set; create only.
    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    /// MySQL default collation; create only.
    pub fn collate(&mut self, collation: impl Into<String>) -> &mut Self {
        self.collate = Some(collation.into());
        self
    }

    /// Postgres table inheritance; create only.
    pub fn inherits(&mut self, parent: impl Into<String>) -> &mut Self {
        self.inherits = Some(parent.into());
        self
    }
}

fn collect<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

fn timestamp_names(camel_case: bool) -> [&'static str; 2] {
    if camel_case {
        ["createdAt", "updatedAt"]
    } else {
        ["created_at", "updated_at"]
    }
}
