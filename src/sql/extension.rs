//! Typed extension registry for user-defined builder methods.
//!
//! ```ignore
//! let mut ext = Extensions::new();
//! ext.register("active", |qb, _| {
//!     qb.where_("deleted_at", Value::Null);
//!     Ok(())
//! })?;
//! qb.call(&ext, "active", &[])?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builder::QueryBuilder;
use super::value::Operand;
use crate::error::{Error, Result};

pub type ExtensionFn = Arc<dyn Fn(&mut QueryBuilder, &[Operand]) -> Result<()> + Send + Sync>;

/// Names of built-in builder methods; extensions may not shadow them.
const BUILTIN_METHODS: &[&str] = &[
    "select", "column", "distinct", "distinct_on", "count", "count_distinct", "min", "max",
    "sum", "sum_distinct", "avg", "avg_distinct", "row_number", "rank", "dense_rank",
    "json_extract", "from", "into", "table", "with_schema", "alias", "with", "with_columns",
    "with_recursive", "with_materialized", "with_not_materialized", "join", "join_on",
    "inner_join", "left_join", "left_outer_join", "right_join", "right_outer_join",
    "full_outer_join", "cross_join", "join_raw", "where_", "where_op", "or_where",
    "or_where_op", "where_not", "or_where_not", "where_raw", "or_where_raw", "where_group",
    "or_where_group", "where_not_group", "where_in", "where_not_in", "or_where_in",
    "or_where_not_in", "where_in_query", "where_in_tuple", "where_null", "where_not_null",
    "or_where_null", "or_where_not_null", "where_exists", "where_not_exists",
    "or_where_exists", "where_between", "where_not_between", "or_where_between",
    "where_column", "or_where_column", "where_like", "where_ilike", "or_where_like",
    "where_json_path", "group_by", "group_by_raw", "having", "or_having", "having_raw",
    "having_in", "having_null", "having_not_null", "having_between", "having_exists",
    "order_by", "order_by_nulls", "order_by_raw", "limit", "offset", "first", "union",
    "union_all", "intersect", "except", "union_wrapped", "for_update", "for_update_of",
    "for_share", "for_no_key_update", "for_key_share", "skip_locked", "no_wait", "comment",
    "insert", "insert_many", "insert_query", "upsert", "upsert_many", "on_conflict",
    "on_conflict_raw", "merge_where", "update", "update_set", "increment", "decrement",
    "delete", "truncate", "returning", "using", "timeout", "options", "clear", "modify",
    "call",
];

/// Registered extensions, keyed by name.
#[derive(Clone, Default)]
pub struct Extensions {
    methods: HashMap<String, ExtensionFn>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named method. Names of built-in methods and names already
    /// registered are rejected.
    pub fn register<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&mut QueryBuilder, &[Operand]) -> Result<()> + Send + Sync + 'static,
    {
        if BUILTIN_METHODS.contains(&name) || self.methods.contains_key(name) {
            return Err(Error::validation(format!(
                "Cannot extend with existing method ('{}').",
                name
            )));
        }
        self.methods.insert(name.to_string(), Arc::new(f));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub(crate) fn invoke(&self, name: &str, qb: &mut QueryBuilder, args: &[Operand]) -> Result<()> {
        match self.methods.get(name) {
            Some(f) => f(qb, args),
            None => Err(Error::validation(format!(
                "No extension registered under '{}'",
                name
            ))),
        }
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Extensions").field("methods", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::statement::ConditionKind;
    use crate::sql::value::Value;

    #[test]
    fn test_register_and_call() {
        let mut ext = Extensions::new();
        ext.register("active", |qb, _| {
            qb.where_("deleted_at", Value::Null);
            Ok(())
        })
        .unwrap();

        let mut qb = QueryBuilder::table("users");
        qb.call(&ext, "active", &[]).unwrap();
        assert!(matches!(
            qb.statement().wheres[0].kind,
            ConditionKind::Null { .. }
        ));
    }

    #[test]
    fn test_collisions_rejected() {
        let mut ext = Extensions::new();
        let err = ext.register("where_in", |_, _| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "Cannot extend with existing method ('where_in').");

        ext.register("mine", |_, _| Ok(())).unwrap();
        assert!(ext.register("mine", |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_unknown_extension() {
        let ext = Extensions::new();
        let mut qb = QueryBuilder::new();
        assert!(qb.call(&ext, "missing", &[]).is_err());
    }
}
