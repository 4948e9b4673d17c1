//! Fluent query builder.
//!
//! Builder methods only mutate the [`Statement`]; nothing is rendered until
//! the builder is handed to a [`Client`](crate::Client) for compilation.
//!
//! ```ignore
//! use polyql::prelude::*;
//!
//! let client = Client::new(Dialect::Postgres);
//! let mut q = QueryBuilder::new();
//! q.select(["id", "name"]).from("users").where_("id", 5);
//! let compiled = client.compile(&q)?;
//! assert_eq!(compiled.sql, r#"select "id", "name" from "users" where "id" = ?"#);
//! ```

use std::time::Duration;

use super::extension::Extensions;
use super::raw::Raw;
use super::statement::*;
use super::value::{Deferred, Operand, Row, Value};
use crate::error::Result;

// =============================================================================
// Join builder
// =============================================================================

/// Collects `on` conditions for a callback join.
#[derive(Debug, Clone, Default)]
pub struct JoinBuilder {
    pub(crate) conditions: Vec<JoinCondition>,
    pub(crate) using: Vec<String>,
}

impl JoinBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, bool_op: BoolOp, not: bool, kind: JoinOn) -> &mut Self {
        self.conditions.push(JoinCondition { bool_op, not, kind });
        self
    }

    /// `on first op second`, comparing two columns.
    pub fn on(
        &mut self,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.push(
            BoolOp::And,
            false,
            JoinOn::On {
                first: first.into(),
                operator: operator.to_string(),
                second: second.into(),
            },
        )
    }

    pub fn and_on(
        &mut self,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.on(first, operator, second)
    }

    pub fn or_on(
        &mut self,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.push(
            BoolOp::Or,
            false,
            JoinOn::On {
                first: first.into(),
                operator: operator.to_string(),
                second: second.into(),
            },
        )
    }

    /// `on column op ?`, comparing a column with a bound value.
    pub fn on_val(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push(
            BoolOp::And,
            false,
            JoinOn::Val {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    pub fn or_on_val(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push(
            BoolOp::Or,
            false,
            JoinOn::Val {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    pub fn on_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(
            BoolOp::And,
            false,
            JoinOn::In {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn on_not_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(
            BoolOp::And,
            true,
            JoinOn::In {
                column: column.into(),
                values: values.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn on_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push(
            BoolOp::And,
            false,
            JoinOn::Null {
                column: column.into(),
            },
        )
    }

    pub fn on_not_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push(
            BoolOp::And,
            true,
            JoinOn::Null {
                column: column.into(),
            },
        )
    }

    pub fn on_between(
        &mut self,
        column: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> &mut Self {
        self.push(
            BoolOp::And,
            false,
            JoinOn::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
            },
        )
    }

    pub fn on_exists(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.push(
            BoolOp::And,
            false,
            JoinOn::Exists {
                query: query.into(),
            },
        )
    }

    pub fn on_raw(&mut self, raw: Raw) -> &mut Self {
        self.push(BoolOp::And, false, JoinOn::Raw(raw))
    }

    /// A parenthesized group of conditions.
    pub fn on_group(&mut self, f: impl FnOnce(&mut JoinBuilder)) -> &mut Self {
        let mut inner = JoinBuilder::new();
        f(&mut inner);
        self.push(BoolOp::And, false, JoinOn::Group(inner.conditions))
    }

    pub fn or_on_group(&mut self, f: impl FnOnce(&mut JoinBuilder)) -> &mut Self {
        let mut inner = JoinBuilder::new();
        f(&mut inner);
        self.push(BoolOp::Or, false, JoinOn::Group(inner.conditions))
    }

    /// `using (a, b)` instead of `on`.
    pub fn using<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.using.extend(columns.into_iter().map(Into::into));
        self
    }
}

// =============================================================================
// On conflict
// =============================================================================

/// Handle returned by [`QueryBuilder::on_conflict`].
#[must_use = "call ignore() or merge() to finish the conflict clause"]
pub struct OnConflictBuilder<'a> {
    builder: &'a mut QueryBuilder,
}

impl<'a> OnConflictBuilder<'a> {
    fn set(self, action: ConflictAction) -> &'a mut QueryBuilder {
        if let Some(conflict) = self.builder.statement.single.on_conflict.as_mut() {
            conflict.action = Some(action);
        }
        self.builder
    }

    /// `do nothing` / `insert ignore`.
    pub fn ignore(self) -> &'a mut QueryBuilder {
        self.set(ConflictAction::Ignore)
    }

    /// Update every inserted column with the incoming value.
    pub fn merge(self) -> &'a mut QueryBuilder {
        self.set(ConflictAction::Merge(MergeSpec::All))
    }

    /// Update only the listed columns with the incoming value.
    pub fn merge_columns<I, S>(self, columns: I) -> &'a mut QueryBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.set(ConflictAction::Merge(MergeSpec::Columns(columns)))
    }

    /// Update with explicit values.
    pub fn merge_values(self, values: impl Into<Row>) -> &'a mut QueryBuilder {
        self.set(ConflictAction::Merge(MergeSpec::Values(values.into())))
    }
}

// =============================================================================
// Query builder
// =============================================================================

/// Accumulates a query statement.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) statement: Statement,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `QueryBuilder::new().from(table)`.
    pub fn table(table: impl Into<Operand>) -> Self {
        let mut qb = Self::new();
        qb.from(table);
        qb
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn method(&self) -> Method {
        self.statement.method
    }

    // =========================================================================
    // Projection
    // =========================================================================

    pub fn select<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.statement.method = Method::Select;
        self.statement
            .columns
            .extend(columns.into_iter().map(|c| ColumnClause::Plain(c.into())));
        self
    }

    /// Add a single column.
    pub fn column(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.statement.columns.push(ColumnClause::Plain(column.into()));
        self
    }

    pub fn distinct<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.statement.single.distinct = Distinct::All;
        self.select(columns)
    }

    /// `select distinct on (..)`, available on the Postgres family.
    pub fn distinct_on<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.statement.single.distinct =
            Distinct::On(columns.into_iter().map(Into::into).collect());
        self
    }

    fn aggregate(
        &mut self,
        function: AggregateFn,
        column: impl Into<Operand>,
        distinct: bool,
    ) -> &mut Self {
        self.statement.columns.push(ColumnClause::Aggregate {
            function,
            columns: vec![column.into()],
            alias: None,
            distinct,
        });
        self
    }

    /// `count(column)`; `column as alias` aliases the result.
    pub fn count(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Count, column, false)
    }

    pub fn count_distinct(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Count, column, true)
    }

    pub fn min(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Min, column, false)
    }

    pub fn max(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Max, column, false)
    }

    pub fn sum(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Sum, column, false)
    }

    pub fn sum_distinct(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Sum, column, true)
    }

    pub fn avg(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Avg, column, false)
    }

    pub fn avg_distinct(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.aggregate(AggregateFn::Avg, column, true)
    }

    fn analytic(
        &mut self,
        function: AnalyticFn,
        alias: Option<&str>,
        order_by: Vec<OrderTerm>,
        partition_by: Vec<OrderTerm>,
    ) -> &mut Self {
        self.statement.columns.push(ColumnClause::Analytic(Analytic {
            function,
            alias: alias.map(str::to_string),
            partition_by,
            order_by,
        }));
        self
    }

    pub fn row_number(
        &mut self,
        alias: Option<&str>,
        order_by: Vec<OrderTerm>,
        partition_by: Vec<OrderTerm>,
    ) -> &mut Self {
        self.analytic(AnalyticFn::RowNumber, alias, order_by, partition_by)
    }

    pub fn rank(
        &mut self,
        alias: Option<&str>,
        order_by: Vec<OrderTerm>,
        partition_by: Vec<OrderTerm>,
    ) -> &mut Self {
        self.analytic(AnalyticFn::Rank, alias, order_by, partition_by)
    }

    pub fn dense_rank(
        &mut self,
        alias: Option<&str>,
        order_by: Vec<OrderTerm>,
        partition_by: Vec<OrderTerm>,
    ) -> &mut Self {
        self.analytic(AnalyticFn::DenseRank, alias, order_by, partition_by)
    }

    /// Select a value extracted from a JSON column.
    pub fn json_extract(
        &mut self,
        column: impl Into<Operand>,
        path: &str,
        alias: Option<&str>,
    ) -> &mut Self {
        self.statement.columns.push(ColumnClause::JsonExtract {
            column: column.into(),
            path: path.to_string(),
            alias: alias.map(str::to_string),
        });
        self
    }

    // =========================================================================
    // Source
    // =========================================================================

    pub fn from(&mut self, table: impl Into<Operand>) -> &mut Self {
        self.statement.single.table = Some(table.into());
        self
    }

    pub fn into(&mut self, table: impl Into<Operand>) -> &mut Self {
        self.from(table)
    }

    pub fn with_schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.statement.single.schema = Some(schema.into());
        self
    }

    /// Alias used when this builder is nested in another one.
    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.statement.single.alias = Some(alias.into());
        self
    }

    fn push_with(
        &mut self,
        alias: &str,
        columns: Vec<String>,
        query: Operand,
        recursive: bool,
        materialized: Option<bool>,
    ) -> &mut Self {
        self.statement.with.push(WithClause {
            alias: alias.to_string(),
            columns,
            query,
            recursive,
            materialized,
        });
        self
    }

    pub fn with(&mut self, alias: &str, query: impl Into<Operand>) -> &mut Self {
        self.push_with(alias, Vec::new(), query.into(), false, None)
    }

    pub fn with_columns<I, S>(
        &mut self,
        alias: &str,
        columns: I,
        query: impl Into<Operand>,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.push_with(alias, columns, query.into(), false, None)
    }

    pub fn with_recursive<I, S>(
        &mut self,
        alias: &str,
        columns: I,
        query: impl Into<Operand>,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.push_with(alias, columns, query.into(), true, None)
    }

    pub fn with_materialized(&mut self, alias: &str, query: impl Into<Operand>) -> &mut Self {
        self.push_with(alias, Vec::new(), query.into(), false, Some(true))
    }

    pub fn with_not_materialized(&mut self, alias: &str, query: impl Into<Operand>) -> &mut Self {
        self.push_with(alias, Vec::new(), query.into(), false, Some(false))
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// Join with a callback building the `on` conditions.
    pub fn join_on(
        &mut self,
        kind: JoinKind,
        table: impl Into<Operand>,
        f: impl FnOnce(&mut JoinBuilder),
    ) -> &mut Self {
        let mut jb = JoinBuilder::new();
        f(&mut jb);
        self.statement.joins.push(JoinClause::Table {
            kind,
            table: table.into(),
            schema: self.statement.single.schema.clone(),
            conditions: jb.conditions,
            using: jb.using,
        });
        self
    }

    fn join_kind(
        &mut self,
        kind: JoinKind,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        let (first, second) = (first.into(), second.into());
        self.join_on(kind, table, move |j| {
            j.on(first, operator, second);
        })
    }

    pub fn join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::Inner, table, first, operator, second)
    }

    pub fn inner_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::Inner, table, first, operator, second)
    }

    pub fn left_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::Left, table, first, operator, second)
    }

    pub fn left_outer_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::LeftOuter, table, first, operator, second)
    }

    pub fn right_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::Right, table, first, operator, second)
    }

    pub fn right_outer_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::RightOuter, table, first, operator, second)
    }

    pub fn full_outer_join(
        &mut self,
        table: impl Into<Operand>,
        first: impl Into<Operand>,
        operator: &str,
        second: impl Into<Operand>,
    ) -> &mut Self {
        self.join_kind(JoinKind::FullOuter, table, first, operator, second)
    }

    pub fn cross_join(&mut self, table: impl Into<Operand>) -> &mut Self {
        self.join_on(JoinKind::Cross, table, |_| {})
    }

    pub fn join_raw(&mut self, raw: Raw) -> &mut Self {
        self.statement.joins.push(JoinClause::Raw(raw));
        self
    }

    // =========================================================================
    // Where
    // =========================================================================

    fn push_where(&mut self, bool_op: BoolOp, not: bool, kind: ConditionKind) -> &mut Self {
        self.statement.wheres.push(Condition::new(bool_op, not, kind));
        self
    }

    fn basic_where(
        &mut self,
        bool_op: BoolOp,
        not: bool,
        column: Operand,
        operator: &str,
        value: Operand,
    ) -> &mut Self {
        // `where col = null` means `is null`.
        if value.is_null() {
            let op = operator.trim().to_lowercase();
            if op == "=" || op == "is" {
                return self.push_where(bool_op, not, ConditionKind::Null { column });
            }
            if op == "!=" || op == "<>" || op == "is not" {
                return self.push_where(bool_op, !not, ConditionKind::Null { column });
            }
        }
        self.push_where(
            bool_op,
            not,
            ConditionKind::Basic {
                column,
                operator: operator.to_string(),
                value,
            },
        )
    }

    /// `where column = value`.
    pub fn where_(&mut self, column: impl Into<Operand>, value: impl Into<Operand>) -> &mut Self {
        self.basic_where(BoolOp::And, false, column.into(), "=", value.into())
    }

    pub fn where_op(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.basic_where(BoolOp::And, false, column.into(), operator, value.into())
    }

    pub fn or_where(&mut self, column: impl Into<Operand>, value: impl Into<Operand>) -> &mut Self {
        self.basic_where(BoolOp::Or, false, column.into(), "=", value.into())
    }

    pub fn or_where_op(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.basic_where(BoolOp::Or, false, column.into(), operator, value.into())
    }

    pub fn where_not(
        &mut self,
        column: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.basic_where(BoolOp::And, true, column.into(), "=", value.into())
    }

    pub fn or_where_not(
        &mut self,
        column: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.basic_where(BoolOp::Or, true, column.into(), "=", value.into())
    }

    pub fn where_raw(&mut self, raw: Raw) -> &mut Self {
        self.push_where(BoolOp::And, false, ConditionKind::Raw(raw))
    }

    pub fn or_where_raw(&mut self, raw: Raw) -> &mut Self {
        self.push_where(BoolOp::Or, false, ConditionKind::Raw(raw))
    }

    /// A parenthesized group of conditions.
    pub fn where_group(
        &mut self,
        f: impl Fn(&mut QueryBuilder) + Send + Sync + 'static,
    ) -> &mut Self {
        self.push_where(BoolOp::And, false, ConditionKind::Wrapped(Deferred::new(f)))
    }

    pub fn or_where_group(
        &mut self,
        f: impl Fn(&mut QueryBuilder) + Send + Sync + 'static,
    ) -> &mut Self {
        self.push_where(BoolOp::Or, false, ConditionKind::Wrapped(Deferred::new(f)))
    }

    pub fn where_not_group(
        &mut self,
        f: impl Fn(&mut QueryBuilder) + Send + Sync + 'static,
    ) -> &mut Self {
        self.push_where(BoolOp::And, true, ConditionKind::Wrapped(Deferred::new(f)))
    }

    fn in_list<I, V>(values: I) -> InValues
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        InValues::List(values.into_iter().map(Into::into).collect())
    }

    pub fn where_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = vec![column.into()];
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::In {
                columns,
                values: Self::in_list(values),
            },
        )
    }

    pub fn where_not_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = vec![column.into()];
        self.push_where(
            BoolOp::And,
            true,
            ConditionKind::In {
                columns,
                values: Self::in_list(values),
            },
        )
    }

    pub fn or_where_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = vec![column.into()];
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::In {
                columns,
                values: Self::in_list(values),
            },
        )
    }

    pub fn or_where_not_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = vec![column.into()];
        self.push_where(
            BoolOp::Or,
            true,
            ConditionKind::In {
                columns,
                values: Self::in_list(values),
            },
        )
    }

    /// `where column in (select ..)`.
    pub fn where_in_query(
        &mut self,
        column: impl Into<Operand>,
        query: impl Into<Operand>,
    ) -> &mut Self {
        let columns = vec![column.into()];
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::In {
                columns,
                values: InValues::Query(query.into()),
            },
        )
    }

    /// `where (a, b) in ((?, ?), (?, ?))`.
    pub fn where_in_tuple<C, S>(&mut self, columns: C, tuples: Vec<Vec<Value>>) -> &mut Self
    where
        C: IntoIterator<Item = S>,
        S: Into<Operand>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        let values = InValues::List(tuples.into_iter().map(Value::Array).collect());
        self.push_where(BoolOp::And, false, ConditionKind::In { columns, values })
    }

    pub fn where_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn where_not_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::And,
            true,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn or_where_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn or_where_not_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            true,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn where_exists(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Exists {
                query: query.into(),
            },
        )
    }

    pub fn where_not_exists(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::And,
            true,
            ConditionKind::Exists {
                query: query.into(),
            },
        )
    }

    pub fn or_where_exists(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::Exists {
                query: query.into(),
            },
        )
    }

    pub fn where_between(
        &mut self,
        column: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
            },
        )
    }

    pub fn where_not_between(
        &mut self,
        column: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            true,
            ConditionKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
            },
        )
    }

    pub fn or_where_between(
        &mut self,
        column: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
            },
        )
    }

    /// Compare two columns.
    pub fn where_column(
        &mut self,
        left: impl Into<Operand>,
        operator: &str,
        right: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Column {
                left: left.into(),
                operator: operator.to_string(),
                right: right.into(),
            },
        )
    }

    pub fn or_where_column(
        &mut self,
        left: impl Into<Operand>,
        operator: &str,
        right: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::Column {
                left: left.into(),
                operator: operator.to_string(),
                right: right.into(),
            },
        )
    }

    /// Case-sensitive `like`.
    pub fn where_like(
        &mut self,
        column: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Like {
                column: column.into(),
                value: value.into(),
                case_insensitive: false,
            },
        )
    }

    /// Case-insensitive `like`.
    pub fn where_ilike(
        &mut self,
        column: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::Like {
                column: column.into(),
                value: value.into(),
                case_insensitive: true,
            },
        )
    }

    pub fn or_where_like(
        &mut self,
        column: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::Or,
            false,
            ConditionKind::Like {
                column: column.into(),
                value: value.into(),
                case_insensitive: false,
            },
        )
    }

    /// Compare a value extracted from a JSON column at `path` (`$.a.b`).
    pub fn where_json_path(
        &mut self,
        column: impl Into<Operand>,
        path: &str,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_where(
            BoolOp::And,
            false,
            ConditionKind::JsonPath {
                column: column.into(),
                path: path.to_string(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    // =========================================================================
    // Group / having / order
    // =========================================================================

    pub fn group_by<I, T>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.statement.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn group_by_raw(&mut self, raw: Raw) -> &mut Self {
        self.statement.groups.push(Operand::Raw(raw));
        self
    }

    fn push_having(&mut self, bool_op: BoolOp, not: bool, kind: ConditionKind) -> &mut Self {
        self.statement.havings.push(Condition::new(bool_op, not, kind));
        self
    }

    pub fn having(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_having(
            BoolOp::And,
            false,
            ConditionKind::Basic {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    pub fn or_having(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.push_having(
            BoolOp::Or,
            false,
            ConditionKind::Basic {
                column: column.into(),
                operator: operator.to_string(),
                value: value.into(),
            },
        )
    }

    pub fn having_raw(&mut self, raw: Raw) -> &mut Self {
        self.push_having(BoolOp::And, false, ConditionKind::Raw(raw))
    }

    pub fn having_in<I, V>(&mut self, column: impl Into<Operand>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = vec![column.into()];
        self.push_having(
            BoolOp::And,
            false,
            ConditionKind::In {
                columns,
                values: Self::in_list(values),
            },
        )
    }

    pub fn having_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_having(
            BoolOp::And,
            false,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn having_not_null(&mut self, column: impl Into<Operand>) -> &mut Self {
        self.push_having(
            BoolOp::And,
            true,
            ConditionKind::Null {
                column: column.into(),
            },
        )
    }

    pub fn having_between(
        &mut self,
        column: impl Into<Operand>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> &mut Self {
        self.push_having(
            BoolOp::And,
            false,
            ConditionKind::Between {
                column: column.into(),
                low: low.into(),
                high: high.into(),
            },
        )
    }

    pub fn having_exists(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.push_having(
            BoolOp::And,
            false,
            ConditionKind::Exists {
                query: query.into(),
            },
        )
    }

    pub fn order_by(&mut self, column: impl Into<Operand>, direction: Direction) -> &mut Self {
        self.statement.orders.push(OrderClause::Column {
            value: column.into(),
            direction,
            nulls: None,
        });
        self
    }

    pub fn order_by_nulls(
        &mut self,
        column: impl Into<Operand>,
        direction: Direction,
        nulls: NullsPosition,
    ) -> &mut Self {
        self.statement.orders.push(OrderClause::Column {
            value: column.into(),
            direction,
            nulls: Some(nulls),
        });
        self
    }

    pub fn order_by_raw(&mut self, raw: Raw) -> &mut Self {
        self.statement.orders.push(OrderClause::Raw(raw));
        self
    }

    // =========================================================================
    // Paging, set operations, locks
    // =========================================================================

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.statement.single.limit = Some(Operand::Value(Value::Int(clamp_count(limit))));
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.statement.single.offset = Some(Operand::Value(Value::Int(clamp_count(offset))));
        self
    }

    /// Select a single row.
    pub fn first(&mut self) -> &mut Self {
        self.statement.method = Method::First;
        self.limit(1)
    }

    fn set_op(&mut self, op: SetOp, query: impl Into<Operand>, wrap: bool) -> &mut Self {
        self.statement.unions.push(UnionClause {
            op,
            query: query.into(),
            wrap,
        });
        self
    }

    pub fn union(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.set_op(SetOp::Union, query, false)
    }

    pub fn union_all(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.set_op(SetOp::UnionAll, query, false)
    }

    pub fn intersect(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.set_op(SetOp::Intersect, query, false)
    }

    pub fn except(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.set_op(SetOp::Except, query, false)
    }

    /// Set operation with the right-hand query in parentheses.
    pub fn union_wrapped(&mut self, op: SetOp, query: impl Into<Operand>) -> &mut Self {
        self.set_op(op, query, true)
    }

    fn lock(&mut self, mode: LockMode, tables: Vec<String>) -> &mut Self {
        self.statement.single.lock = Some(Lock { mode, tables });
        self
    }

    pub fn for_update(&mut self) -> &mut Self {
        self.lock(LockMode::ForUpdate, Vec::new())
    }

    /// `for update of t1, t2`.
    pub fn for_update_of<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock(LockMode::ForUpdate, tables.into_iter().map(Into::into).collect())
    }

    pub fn for_share(&mut self) -> &mut Self {
        self.lock(LockMode::ForShare, Vec::new())
    }

    pub fn for_no_key_update(&mut self) -> &mut Self {
        self.lock(LockMode::ForNoKeyUpdate, Vec::new())
    }

    pub fn for_key_share(&mut self) -> &mut Self {
        self.lock(LockMode::ForKeyShare, Vec::new())
    }

    pub fn skip_locked(&mut self) -> &mut Self {
        self.statement.single.wait = Some(WaitMode::SkipLocked);
        self
    }

    pub fn no_wait(&mut self) -> &mut Self {
        self.statement.single.wait = Some(WaitMode::NoWait);
        self
    }

    /// Prepend a `/* comment */`.
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.statement.single.comments.push(text.into());
        self
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn insert(&mut self, row: impl Into<Row>) -> &mut Self {
        self.insert_many([row.into()])
    }

    pub fn insert_many<I>(&mut self, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = Row>,
    {
        self.statement.method = Method::Insert;
        self.statement.single.insert = Some(InsertSource::Rows(rows.into_iter().collect()));
        self
    }

    /// `insert into t select ..`.
    pub fn insert_query(&mut self, query: impl Into<Operand>) -> &mut Self {
        self.statement.method = Method::Insert;
        self.statement.single.insert = Some(InsertSource::Query(query.into()));
        self
    }

    pub fn upsert(&mut self, row: impl Into<Row>) -> &mut Self {
        self.upsert_many([row.into()])
    }

    pub fn upsert_many<I>(&mut self, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = Row>,
    {
        self.statement.method = Method::Upsert;
        self.statement.single.insert = Some(InsertSource::Rows(rows.into_iter().collect()));
        self
    }

    /// Start an `on conflict` clause for the current insert.
    pub fn on_conflict<I, S>(&mut self, columns: I) -> OnConflictBuilder<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let target = if columns.is_empty() {
            ConflictTarget::None
        } else {
            ConflictTarget::Columns(columns)
        };
        self.statement.single.on_conflict = Some(OnConflict {
            target,
            action: None,
            merge_where: Vec::new(),
        });
        OnConflictBuilder { builder: self }
    }

    /// `on conflict <raw target>`.
    pub fn on_conflict_raw(&mut self, raw: Raw) -> OnConflictBuilder<'_> {
        self.statement.single.on_conflict = Some(OnConflict {
            target: ConflictTarget::Raw(raw),
            action: None,
            merge_where: Vec::new(),
        });
        OnConflictBuilder { builder: self }
    }

    /// Restrict a merge with `where` (Postgres family and SQLite).
    pub fn merge_where(
        &mut self,
        column: impl Into<Operand>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> &mut Self {
        if let Some(conflict) = self.statement.single.on_conflict.as_mut() {
            conflict.merge_where.push(Condition::new(
                BoolOp::And,
                false,
                ConditionKind::Basic {
                    column: column.into(),
                    operator: operator.to_string(),
                    value: value.into(),
                },
            ));
        }
        self
    }

    pub fn update(&mut self, values: impl Into<Row>) -> &mut Self {
        self.statement.method = Method::Update;
        let values: Row = values.into();
        for (column, value) in values.iter() {
            self.statement.single.update.insert(column, value.clone());
        }
        self
    }

    /// Update a single column.
    pub fn update_set(
        &mut self,
        column: impl Into<String>,
        value: impl Into<Operand>,
    ) -> &mut Self {
        self.statement.method = Method::Update;
        self.statement.single.update.insert(column, value);
        self
    }

    pub fn increment(&mut self, column: impl Into<String>, amount: impl Into<Value>) -> &mut Self {
        self.statement.method = Method::Update;
        self.statement.single.counters.push(Counter {
            column: column.into(),
            amount: amount.into(),
            decrement: false,
        });
        self
    }

    pub fn decrement(&mut self, column: impl Into<String>, amount: impl Into<Value>) -> &mut Self {
        self.statement.method = Method::Update;
        self.statement.single.counters.push(Counter {
            column: column.into(),
            amount: amount.into(),
            decrement: true,
        });
        self
    }

    pub fn delete(&mut self) -> &mut Self {
        self.statement.method = Method::Delete;
        self
    }

    pub fn truncate(&mut self) -> &mut Self {
        self.statement.method = Method::Truncate;
        self
    }

    pub fn returning<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement
            .single
            .returning
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// `delete from t using a, b` (Postgres).
    pub fn using<I, S>(&mut self, tables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement.single.using = tables.into_iter().map(Into::into).collect();
        self
    }

    // =========================================================================
    // Misc
    // =========================================================================

    /// Attach an execution timeout; zero durations are ignored.
    pub fn timeout(&mut self, duration: Duration, cancel: bool) -> &mut Self {
        if !duration.is_zero() {
            self.statement.single.timeout = Some(duration);
            self.statement.single.cancel_on_timeout = cancel;
        }
        self
    }

    /// Free-form options copied onto the compiled query.
    pub fn options(&mut self, options: serde_json::Map<String, serde_json::Value>) -> &mut Self {
        self.statement.single.options.extend(options);
        self
    }

    pub fn clear(&mut self, kind: ClauseKind) -> &mut Self {
        self.statement.clear(kind);
        self
    }

    /// Apply a reusable fragment.
    pub fn modify(&mut self, f: impl FnOnce(&mut QueryBuilder)) -> &mut Self {
        f(self);
        self
    }

    /// Invoke a registered extension.
    pub fn call(
        &mut self,
        extensions: &Extensions,
        name: &str,
        args: &[Operand],
    ) -> Result<&mut Self> {
        extensions.invoke(name, self, args)?;
        Ok(self)
    }
}

/// Row counts above `i64::MAX` saturate instead of wrapping.
fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl From<&str> for QueryBuilder {
    fn from(table: &str) -> Self {
        QueryBuilder::table(table)
    }
}
