//! Statement model: what a builder accumulates and a compiler reads.
//!
//! Clause entries are grouped by kind. Within a group, insertion order is
//! significant (wheres are ANDed in call order, joins emitted in call
//! order); the order in which groups are emitted is fixed by the compiler.

use std::time::Duration;

use serde::Serialize;

use super::raw::Raw;
use super::value::{Deferred, Operand, Row, Value};

// =============================================================================
// Method
// =============================================================================

/// Which compiler entry point runs for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Select,
    First,
    Insert,
    Update,
    Delete,
    Upsert,
    Truncate,
    Raw,
    // Schema statements
    Create,
    Alter,
    Drop,
    Rename,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Select => "select",
            Method::First => "first",
            Method::Insert => "insert",
            Method::Update => "update",
            Method::Delete => "delete",
            Method::Upsert => "upsert",
            Method::Truncate => "truncate",
            Method::Raw => "raw",
            Method::Create => "create",
            Method::Alter => "alter",
            Method::Drop => "drop",
            Method::Rename => "rename",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Method::Select | Method::First)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clause groups that can be reset with `clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    With,
    Select,
    Join,
    Where,
    Union,
    Group,
    Having,
    Order,
    Limit,
    Offset,
    Counters,
    Returning,
    Lock,
}

// =============================================================================
// Conditions (where / having / join on)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }
}

/// Right-hand side of an `in` condition.
#[derive(Debug, Clone)]
pub enum InValues {
    /// Literal list; for tuple conditions each item is an array.
    List(Vec<Value>),
    /// Sub-query or raw producing the set.
    Query(Operand),
}

/// One where/having entry.
#[derive(Debug, Clone)]
pub struct Condition {
    pub bool_op: BoolOp,
    pub not: bool,
    pub kind: ConditionKind,
}

#[derive(Debug, Clone)]
pub enum ConditionKind {
    Basic {
        column: Operand,
        operator: String,
        value: Operand,
    },
    Raw(Raw),
    /// A parenthesized group built by a callback.
    Wrapped(Deferred),
    In {
        columns: Vec<Operand>,
        values: InValues,
    },
    Null {
        column: Operand,
    },
    Exists {
        query: Operand,
    },
    Between {
        column: Operand,
        low: Operand,
        high: Operand,
    },
    Column {
        left: Operand,
        operator: String,
        right: Operand,
    },
    Like {
        column: Operand,
        value: Operand,
        case_insensitive: bool,
    },
    JsonPath {
        column: Operand,
        path: String,
        operator: String,
        value: Operand,
    },
}

impl Condition {
    pub fn new(bool_op: BoolOp, not: bool, kind: ConditionKind) -> Self {
        Self { bool_op, not, kind }
    }

    /// Column name when the compared value is undefined, for error messages.
    pub fn undefined_column(&self) -> Option<String> {
        let (column, undefined) = match &self.kind {
            ConditionKind::Basic { column, value, .. } => (column, value.is_undefined()),
            ConditionKind::Like { column, value, .. } => (column, value.is_undefined()),
            ConditionKind::JsonPath { column, value, .. } => (column, value.is_undefined()),
            ConditionKind::Between { column, low, high } => {
                (column, low.is_undefined() || high.is_undefined())
            }
            ConditionKind::In {
                columns,
                values: InValues::List(values),
            } => match columns.first() {
                Some(column) => (column, values.iter().any(Value::contains_undefined)),
                None => return None,
            },
            _ => return None,
        };
        if undefined {
            column.as_str().map(str::to_string)
        } else {
            None
        }
    }
}

// =============================================================================
// Columns
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl AggregateFn {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticFn {
    RowNumber,
    Rank,
    DenseRank,
}

impl AnalyticFn {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticFn::RowNumber => "row_number",
            AnalyticFn::Rank => "rank",
            AnalyticFn::DenseRank => "dense_rank",
        }
    }
}

/// `row_number() over (partition by .. order by ..)`.
#[derive(Debug, Clone)]
pub struct Analytic {
    pub function: AnalyticFn,
    pub alias: Option<String>,
    pub partition_by: Vec<OrderTerm>,
    pub order_by: Vec<OrderTerm>,
}

/// A column with an optional direction, used inside window definitions.
#[derive(Debug, Clone)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Option<Direction>,
}

impl OrderTerm {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Desc),
        }
    }
}

impl<S: Into<String>> From<S> for OrderTerm {
    fn from(column: S) -> Self {
        OrderTerm::new(column)
    }
}

#[derive(Debug, Clone)]
pub enum ColumnClause {
    Plain(Operand),
    Aggregate {
        function: AggregateFn,
        columns: Vec<Operand>,
        alias: Option<String>,
        distinct: bool,
    },
    Analytic(Analytic),
    JsonExtract {
        column: Operand,
        path: String,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub enum Distinct {
    #[default]
    None,
    All,
    On(Vec<Operand>),
}

// =============================================================================
// Joins
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    LeftOuter,
    Right,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner join",
            JoinKind::Left => "left join",
            JoinKind::LeftOuter => "left outer join",
            JoinKind::Right => "right join",
            JoinKind::RightOuter => "right outer join",
            JoinKind::FullOuter => "full outer join",
            JoinKind::Cross => "cross join",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinCondition {
    pub bool_op: BoolOp,
    pub not: bool,
    pub kind: JoinOn,
}

#[derive(Debug, Clone)]
pub enum JoinOn {
    /// Column-to-column comparison.
    On {
        first: Operand,
        operator: String,
        second: Operand,
    },
    /// Column-to-value comparison.
    Val {
        column: Operand,
        operator: String,
        value: Operand,
    },
    In {
        column: Operand,
        values: Vec<Value>,
    },
    Null {
        column: Operand,
    },
    Between {
        column: Operand,
        low: Operand,
        high: Operand,
    },
    Exists {
        query: Operand,
    },
    Raw(Raw),
    Group(Vec<JoinCondition>),
}

#[derive(Debug, Clone)]
pub enum JoinClause {
    Table {
        kind: JoinKind,
        table: Operand,
        schema: Option<String>,
        conditions: Vec<JoinCondition>,
        using: Vec<String>,
    },
    Raw(Raw),
}

// =============================================================================
// Ordering, grouping, unions, CTEs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    /// Parse a direction; anything other than `desc` sorts ascending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsPosition {
    First,
    Last,
}

#[derive(Debug, Clone)]
pub enum OrderClause {
    Column {
        value: Operand,
        direction: Direction,
        nulls: Option<NullsPosition>,
    },
    Raw(Raw),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            SetOp::Union => "union",
            SetOp::UnionAll => "union all",
            SetOp::Intersect => "intersect",
            SetOp::Except => "except",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnionClause {
    pub op: SetOp,
    pub query: Operand,
    pub wrap: bool,
}

#[derive(Debug, Clone)]
pub struct WithClause {
    pub alias: String,
    pub columns: Vec<String>,
    pub query: Operand,
    pub recursive: bool,
    pub materialized: Option<bool>,
}

// =============================================================================
// Locks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    ForUpdate,
    ForShare,
    ForNoKeyUpdate,
    ForKeyShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    SkipLocked,
    NoWait,
}

#[derive(Debug, Clone)]
pub struct Lock {
    pub mode: LockMode,
    pub tables: Vec<String>,
}

// =============================================================================
// Writes
// =============================================================================

#[derive(Debug, Clone)]
pub enum InsertSource {
    Rows(Vec<Row>),
    /// `insert into t select ..` or a raw body.
    Query(Operand),
}

#[derive(Debug, Clone)]
pub struct Counter {
    pub column: String,
    pub amount: Value,
    pub decrement: bool,
}

#[derive(Debug, Clone)]
pub enum ConflictTarget {
    None,
    Columns(Vec<String>),
    Raw(Raw),
}

#[derive(Debug, Clone)]
pub enum MergeSpec {
    /// Every inserted column takes the excluded value.
    All,
    /// Only the listed columns take the excluded value.
    Columns(Vec<String>),
    /// Explicit assignments.
    Values(Row),
}

#[derive(Debug, Clone)]
pub enum ConflictAction {
    Ignore,
    Merge(MergeSpec),
}

#[derive(Debug, Clone)]
pub struct OnConflict {
    pub target: ConflictTarget,
    pub action: Option<ConflictAction>,
    pub merge_where: Vec<Condition>,
}

// =============================================================================
// Statement
// =============================================================================

/// At most one per statement.
#[derive(Debug, Clone, Default)]
pub struct SingleProperties {
    pub table: Option<Operand>,
    pub schema: Option<String>,
    pub alias: Option<String>,
    pub distinct: Distinct,
    pub limit: Option<Operand>,
    pub offset: Option<Operand>,
    pub lock: Option<Lock>,
    pub wait: Option<WaitMode>,
    pub returning: Vec<String>,
    pub comments: Vec<String>,
    pub insert: Option<InsertSource>,
    pub update: Row,
    pub counters: Vec<Counter>,
    pub on_conflict: Option<OnConflict>,
    pub using: Vec<String>,
    pub timeout: Option<Duration>,
    pub cancel_on_timeout: bool,
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A query's accumulated clauses.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub method: Method,
    pub with: Vec<WithClause>,
    pub columns: Vec<ColumnClause>,
    pub joins: Vec<JoinClause>,
    pub wheres: Vec<Condition>,
    pub groups: Vec<Operand>,
    pub havings: Vec<Condition>,
    pub orders: Vec<OrderClause>,
    pub unions: Vec<UnionClause>,
    pub single: SingleProperties,
}

impl Statement {
    /// Reset one clause group.
    pub fn clear(&mut self, kind: ClauseKind) {
        match kind {
            ClauseKind::With => self.with.clear(),
            ClauseKind::Select => {
                self.columns.clear();
                self.single.distinct = Distinct::None;
            }
            ClauseKind::Join => self.joins.clear(),
            ClauseKind::Where => self.wheres.clear(),
            ClauseKind::Union => self.unions.clear(),
            ClauseKind::Group => self.groups.clear(),
            ClauseKind::Having => self.havings.clear(),
            ClauseKind::Order => self.orders.clear(),
            ClauseKind::Limit => self.single.limit = None,
            ClauseKind::Offset => self.single.offset = None,
            ClauseKind::Counters => self.single.counters.clear(),
            ClauseKind::Returning => self.single.returning.clear(),
            ClauseKind::Lock => {
                self.single.lock = None;
                self.single.wait = None;
            }
        }
    }

    /// Columns and row cells whose bound value contains an undefined.
    ///
    /// Insert cells are reported as `column (row N)`. A bare undefined in an
    /// insert or update row is not listed, it renders as a default or is
    /// skipped.
    pub fn undefined_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .wheres
            .iter()
            .chain(&self.havings)
            .filter_map(Condition::undefined_column)
            .collect();

        for join in &self.joins {
            if let JoinClause::Table { conditions, .. } = join {
                undefined_join_columns(conditions, &mut columns);
            }
        }

        if let Some(InsertSource::Rows(rows)) = &self.single.insert {
            for (index, row) in rows.iter().enumerate() {
                for (column, value) in row.iter() {
                    if nested_undefined(value) {
                        columns.push(format!("{} (row {})", column, index));
                    }
                }
            }
        }

        for (column, value) in self.single.update.iter() {
            if nested_undefined(value) {
                columns.push(column.to_string());
            }
        }

        if let Some(OnConflict {
            action: Some(ConflictAction::Merge(MergeSpec::Values(row))),
            ..
        }) = &self.single.on_conflict
        {
            for (column, value) in row.iter() {
                if value.is_undefined() {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }
}

/// An undefined that survives into the bindings, i.e. one inside an array.
fn nested_undefined(value: &Operand) -> bool {
    matches!(value, Operand::Value(v @ Value::Array(_)) if v.contains_undefined())
}

fn undefined_join_columns(conditions: &[JoinCondition], out: &mut Vec<String>) {
    for condition in conditions {
        let (column, undefined) = match &condition.kind {
            JoinOn::Val { column, value, .. } => (column, value.is_undefined()),
            JoinOn::In { column, values } => (column, values.iter().any(Value::contains_undefined)),
            JoinOn::Between { column, low, high } => {
                (column, low.is_undefined() || high.is_undefined())
            }
            JoinOn::Group(inner) => {
                undefined_join_columns(inner, out);
                continue;
            }
            _ => continue,
        };
        if undefined {
            if let Some(name) = column.as_str() {
                out.push(name.to_string());
            }
        }
    }
}
