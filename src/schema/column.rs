//! Column definitions and their chainable builders.

use crate::error::{Error, Result};
use crate::sql::value::{Operand, Value};

use super::table::{IndexOptions, TableBuilder, TableOp};

// ============================================================================
// Column types
// ============================================================================

/// Canonical column type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Increments,
    BigIncrements,
    Integer(Option<u32>),
    TinyInteger,
    SmallInteger,
    MediumInteger,
    BigInteger,
    Text,
    String(u32),
    Floating { precision: u32, scale: u32 },
    Double { precision: Option<u32>, scale: Option<u32> },
    Decimal { precision: Option<u32>, scale: u32 },
    Boolean,
    Date,
    DateTime { use_tz: bool, precision: Option<u32> },
    Time,
    Timestamp { use_tz: bool, precision: Option<u32> },
    Binary(Option<u32>),
    Enum(Vec<String>),
    Json,
    Jsonb,
    Uuid,
    /// Type text passed through untouched.
    Specific(String),
}

/// Short names accepted for column types, mapped to their canonical name.
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("float", "floating"),
    ("enum", "enu"),
    ("boolean", "bool"),
    ("string", "varchar"),
    ("bigint", "bigInteger"),
];

/// Resolve a type alias to its canonical name.
pub fn canonical_type_name(name: &str) -> &str {
    COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

impl ColumnType {
    /// Build a type from its name, with default sizes.
    ///
    /// Aliases are resolved first, so `string` and `varchar` are the same type.
    pub fn from_name(name: &str) -> Result<ColumnType> {
        let ty = match canonical_type_name(name) {
            "increments" => ColumnType::Increments,
            "bigIncrements" | "bigincrements" => ColumnType::BigIncrements,
            "integer" | "int" => ColumnType::Integer(None),
            "tinyint" => ColumnType::TinyInteger,
            "smallint" => ColumnType::SmallInteger,
            "mediumint" => ColumnType::MediumInteger,
            "bigInteger" | "biginteger" => ColumnType::BigInteger,
            "text" => ColumnType::Text,
            "varchar" => ColumnType::String(255),
            "floating" => ColumnType::Floating {
                precision: 8,
                scale: 2,
            },
            "double" => ColumnType::Double {
                precision: None,
                scale: None,
            },
            "decimal" => ColumnType::Decimal {
                precision: Some(8),
                scale: 2,
            },
            "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" | "dateTime" => ColumnType::DateTime {
                use_tz: true,
                precision: None,
            },
            "time" => ColumnType::Time,
            "timestamp" => ColumnType::Timestamp {
                use_tz: true,
                precision: None,
            },
            "binary" => ColumnType::Binary(None),
            "enu" => ColumnType::Enum(Vec::new()),
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::Jsonb,
            "uuid" => ColumnType::Uuid,
            other => {
                return Err(Error::validation(format!(
                    "Unknown column type '{}'",
                    other
                )))
            }
        };
        Ok(ty)
    }
}

// ============================================================================
// Column definition
// ============================================================================

/// Where a column is placed when added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
}

/// Which parts of an existing column an alter replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlterOptions {
    pub alter_nullable: bool,
    pub alter_type: bool,
}

impl Default for AlterOptions {
    fn default() -> Self {
        Self {
            alter_nullable: true,
            alter_type: true,
        }
    }
}

/// Column check constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    Positive,
    Negative,
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Any of the inclusive ranges.
    Between(Vec<(Value, Value)>),
    Length { operator: String, length: u32 },
    Regex(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCheck {
    pub kind: CheckKind,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: Option<bool>,
    pub default: Option<Operand>,
    pub unsigned: bool,
    pub position: Option<ColumnPosition>,
    pub comment: Option<String>,
    pub collate: Option<String>,
    pub checks: Vec<ColumnCheck>,
    /// Set when the column replaces an existing one.
    pub alter: Option<AlterOptions>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: None,
            default: None,
            unsigned: false,
            position: None,
            comment: None,
            collate: None,
            checks: Vec::new(),
            alter: None,
        }
    }
}

// ============================================================================
// Foreign keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferrable {
    Deferred,
    Immediate,
    NotDeferrable,
}

impl Deferrable {
    pub fn clause(&self) -> &'static str {
        match self {
            Deferrable::Deferred => "deferrable initially deferred",
            Deferrable::Immediate => "deferrable initially immediate",
            Deferrable::NotDeferrable => "not deferrable",
        }
    }
}

/// A foreign key descriptor, shared by table-level and column-level
/// declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references: Vec<String>,
    pub in_table: Option<String>,
    pub key_name: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
    pub deferrable: Option<Deferrable>,
}

/// Chainable handle over one [`ForeignKey`]. Every call mutates the same
/// descriptor, so the order of calls does not matter.
#[must_use = "foreign key builders only describe the key"]
pub struct ForeignBuilder<'a> {
    fk: &'a mut ForeignKey,
}

impl<'a> ForeignBuilder<'a> {
    pub(crate) fn new(fk: &'a mut ForeignKey) -> Self {
        Self { fk }
    }

    /// Referenced column, either `column` or `table.column`.
    pub fn references(self, target: &str) -> Self {
        match target.split_once('.') {
            Some((table, column)) => {
                self.fk.in_table = Some(table.to_string());
                self.fk.references = vec![column.to_string()];
            }
            None => self.fk.references = vec![target.to_string()],
        }
        self
    }

    /// Referenced columns of a composite key.
    pub fn references_columns<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Self {
        self.fk.references = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_table(self, table: impl Into<String>) -> Self {
        self.fk.in_table = Some(table.into());
        self
    }

    /// Alias of [`ForeignBuilder::in_table`].
    pub fn on(self, table: impl Into<String>) -> Self {
        self.in_table(table)
    }

    pub fn on_delete(self, action: impl Into<String>) -> Self {
        self.fk.on_delete = Some(action.into());
        self
    }

    pub fn on_update(self, action: impl Into<String>) -> Self {
        self.fk.on_update = Some(action.into());
        self
    }

    pub fn with_key_name(self, name: impl Into<String>) -> Self {
        self.fk.key_name = Some(name.into());
        self
    }

    /// Checked against the dialect when the table is compiled.
    pub fn deferrable(self, mode: Deferrable) -> Self {
        self.fk.deferrable = Some(mode);
        self
    }
}

// ============================================================================
// Column builder
// ============================================================================

/// Chainable modifiers for the column just declared on a [`TableBuilder`].
#[must_use = "column builders only modify the column they were created for"]
pub struct ColumnBuilder<'a> {
    table: &'a mut TableBuilder,
    index: usize,
}

impl<'a> ColumnBuilder<'a> {
    pub(crate) fn new(table: &'a mut TableBuilder, index: usize) -> Self {
        Self { table, index }
    }

    fn column(&mut self) -> &mut ColumnDef {
        &mut self.table.columns[self.index]
    }

    fn name(&self) -> String {
        self.table.columns[self.index].name.clone()
    }

    fn is_increments(&self) -> bool {
        matches!(
            self.table.columns[self.index].ty,
            ColumnType::Increments | ColumnType::BigIncrements
        )
    }

    pub fn nullable(mut self) -> Self {
        self.column().nullable = Some(true);
        self
    }

    pub fn not_nullable(mut self) -> Self {
        self.column().nullable = Some(false);
        self
    }

    /// Default value. Plain values are inlined as literals, raw expressions
    /// verbatim.
    pub fn default_to(mut self, value: impl Into<Operand>) -> Self {
        self.column().default = Some(value.into());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.column().unsigned = true;
        self
    }

    pub fn first(mut self) -> Self {
        self.column().position = Some(ColumnPosition::First);
        self
    }

    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.column().position = Some(ColumnPosition::After(column.into()));
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.column().comment = Some(comment.into());
        self
    }

    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.column().collate = Some(collation.into());
        self
    }

    /// Replace an existing column instead of adding one.
    pub fn alter(self) -> Self {
        self.alter_with(AlterOptions::default())
    }

    pub fn alter_with(mut self, options: AlterOptions) -> Self {
        self.column().alter = Some(options);
        self
    }

    // ------------------------------------------------------------------------
    // Keys, forwarded to the table
    // ------------------------------------------------------------------------

    pub fn primary(self) -> Self {
        self.primary_with(IndexOptions::default())
    }

    pub fn primary_with(self, options: IndexOptions) -> Self {
        self.key(|columns| TableOp::Primary { columns, options })
    }

    pub fn unique(self) -> Self {
        self.unique_with(IndexOptions::default())
    }

    pub fn unique_with(self, options: IndexOptions) -> Self {
        self.key(|columns| TableOp::Unique { columns, options })
    }

    pub fn index(self) -> Self {
        self.index_with(IndexOptions::default())
    }

    pub fn index_with(self, options: IndexOptions) -> Self {
        self.key(|columns| TableOp::Index { columns, options })
    }

    fn key(self, op: impl FnOnce(Vec<String>) -> TableOp) -> Self {
        // auto-increment columns already carry their key
        if !self.is_increments() {
            let name = self.name();
            self.table.ops.push(op(vec![name]));
        }
        self
    }

    /// Declare a foreign key on this column. `target` is `table.column` or a
    /// bare column completed with [`ForeignBuilder::in_table`].
    pub fn references(self, target: &str) -> ForeignBuilder<'a> {
        let name = self.name();
        let ColumnBuilder { table, .. } = self;
        let fk = table.push_foreign(ForeignKey {
            columns: vec![name],
            ..Default::default()
        });
        ForeignBuilder::new(fk).references(target)
    }

    // ------------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------------

    pub fn check(mut self, kind: CheckKind, name: Option<&str>) -> Self {
        self.column().checks.push(ColumnCheck {
            kind,
            name: name.map(str::to_string),
        });
        self
    }

    pub fn check_positive(self) -> Self {
        self.check(CheckKind::Positive, None)
    }

    pub fn check_negative(self) -> Self {
        self.check(CheckKind::Negative, None)
    }

    pub fn check_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.check(CheckKind::In(values), None)
    }

    pub fn check_not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.check(CheckKind::NotIn(values), None)
    }

    pub fn check_between<V: Into<Value>>(self, low: V, high: V) -> Self {
        self.check(CheckKind::Between(vec![(low.into(), high.into())]), None)
    }

    /// `operator` is one of `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`.
    pub fn check_length(self, operator: &str, length: u32) -> Self {
        self.check(
            CheckKind::Length {
                operator: operator.to_string(),
                length,
            },
            None,
        )
    }

    pub fn check_regex(self, pattern: impl Into<String>) -> Self {
        self.check(CheckKind::Regex(pattern.into()), None)
    }
}
