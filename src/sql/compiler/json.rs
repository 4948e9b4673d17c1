//! JSON path extraction.
//!
//! Paths are written `$.a.b[0]`. Dialects either bind the whole path once or
//! bind each segment separately to an array-path function.

use crate::error::Result;
use crate::sql::dialect::helpers::{json_cast_for, json_path_segments};
use crate::sql::dialect::strategy::JsonPathStyle;
use crate::sql::formatter::{operator, Formatter};
use crate::sql::value::{Operand, Value};

/// The extraction call, e.g. `json_extract("col", ?)`.
pub(crate) fn extract(column: &Operand, path: &str, fmt: &mut Formatter<'_>) -> Result<String> {
    let column = fmt.wrap(column)?;
    Ok(match fmt.dialect().json_path_style() {
        JsonPathStyle::Function(function) => {
            let path = fmt.bind(path);
            format!("{}({}, {})", function, column, path)
        }
        JsonPathStyle::PathQuery => {
            let path = fmt.bind(path);
            format!("jsonb_path_query_first({}, {})", column, path)
        }
        JsonPathStyle::ArrayPath {
            function,
            brackets_to_dots,
            ..
        } => {
            let segments = json_path_segments(path, brackets_to_dots)
                .into_iter()
                .map(|segment| fmt.bind(segment))
                .collect::<Vec<_>>();
            format!("{}({}, {})", function, column, segments.join(", "))
        }
    })
}

/// `extract(column, path) op ?`, casting where the dialect compares typed values.
pub(crate) fn where_json_path(
    column: &Operand,
    path: &str,
    op: &str,
    value: &Operand,
    fmt: &mut Formatter<'_>,
) -> Result<String> {
    let op = operator(op)?;
    let extracted = extract(column, path, fmt)?;
    let cast = match fmt.dialect().json_path_style() {
        JsonPathStyle::PathQuery | JsonPathStyle::ArrayPath { cast: true, .. } => match value {
            Operand::Value(v) => json_cast_for(v),
            _ => json_cast_for(&Value::Null),
        },
        _ => "",
    };
    let value = fmt.parameter(value)?;
    Ok(format!("{}{} {} {}", extracted, cast, op, value))
}
