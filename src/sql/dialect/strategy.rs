//! Capability strategies a dialect is assembled from.
//!
//! Each enum names one decision point where SQL families disagree. A dialect
//! picks one value per strategy; the compilers dispatch on the value instead
//! of on the dialect itself, so two dialects that pick the same strategies
//! render identically.

/// How `?` placeholders are rewritten right before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite, generic).
    Question,
    /// `$1, $2, ...` (Postgres family).
    Dollar,
    /// `@p0, @p1, ...` (SQL Server).
    AtP,
    /// `:1, :2, ...` (Oracle).
    Colon,
}

/// Native `upsert` statement support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    Unsupported,
    /// `upsert into t (..) values (..)`.
    UpsertInto,
}

/// Conflict handling attached to an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflictStyle {
    Unsupported,
    /// `on conflict (..) do nothing | do update set ..`.
    OnConflict,
    /// `insert ignore` / `on duplicate key update ..`.
    OnDuplicateKey,
}

/// Returning rows from a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningStyle {
    Unsupported,
    /// Trailing `returning ..`.
    Returning,
    /// `output inserted.x` placed before `values` / `where`.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateStyle {
    /// `truncate t`.
    Truncate,
    /// `truncate table t`.
    TruncateTable,
    /// `truncate t restart identity`.
    RestartIdentity,
    /// `delete from t` for engines without truncate.
    DeleteFrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `limit ? offset ?`; the literal is the limit emitted when only an
    /// offset is given (engines that reject a bare offset).
    LimitOffset(Option<&'static str>),
    /// `select top (?) ..`, or `offset ? rows fetch next ? rows only` when an
    /// offset is present.
    Top,
    /// `offset ? rows fetch next ? rows only`.
    OffsetFetch,
}

/// Row locking clause family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStyle {
    Unsupported,
    /// All four lock modes, `of` tables, `skip locked` and `nowait`.
    Postgres,
    /// `for update` / `lock in share mode`.
    MySql,
    /// Table hints after the table name.
    MsSql,
    /// `for update` only.
    Oracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrdering {
    /// `order by x asc nulls last`.
    Native,
    /// `order by case when x is null then .. end, x asc`.
    Emulated,
}

/// JSON path extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonPathStyle {
    /// A function taking the column and the whole path as one binding.
    Function(&'static str),
    /// `jsonb_path_query_first(col, ?)` with a cast chosen from the compared value.
    PathQuery,
    /// A function taking each path segment as its own binding.
    ArrayPath {
        function: &'static str,
        /// Convert `[n]` subscripts to `.n` before splitting.
        brackets_to_dots: bool,
        /// Cast the extracted value from the compared value (`::int`, `::float`, `#>> '{}'`).
        cast: bool,
    },
}

/// Case-sensitivity handling for `like` / `ilike`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStyle {
    /// `like` and native `ilike`.
    Standard,
    /// `like .. COLLATE utf8_bin` for case-sensitive, plain `like` otherwise.
    MySql,
    /// Explicit case-sensitive / insensitive collations.
    MsSql,
    /// `like`, with `lower(..) like lower(..)` standing in for `ilike`.
    Lowered,
}

/// What fills a missing column in a multi-row insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMarker {
    /// The `DEFAULT` keyword.
    Keyword,
    /// No keyword available; only `NULL` (null-as-default mode) works.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInsert {
    /// `insert into t default values`.
    DefaultValues,
    /// `insert into t () values ()`.
    EmptyValues,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiRowInsert {
    /// `values (..), (..)`.
    Values,
    /// `insert all into t .. into t .. select 1 from dual`.
    InsertAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOrReplace {
    Unsupported,
    /// `create or replace view`.
    OrReplace,
    /// `CREATE OR ALTER VIEW`.
    OrAlter,
    /// `drop view if exists` followed by `create view`.
    DropThenCreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewColumnRename {
    Unsupported,
    /// `alter view v rename a to b`.
    AlterView,
    /// `exec sp_rename ?, ?, 'COLUMN'`.
    SpRename,
}

/// View creation and alteration capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSupport {
    pub create_or_replace: CreateOrReplace,
    pub materialized: bool,
    pub check_option: bool,
    pub rename_column: ViewColumnRename,
    pub set_default: bool,
}

impl ViewSupport {
    /// Plain `create view` only.
    pub const BASIC: ViewSupport = ViewSupport {
        create_or_replace: CreateOrReplace::Unsupported,
        materialized: false,
        check_option: false,
        rename_column: ViewColumnRename::Unsupported,
        set_default: false,
    };
}

impl Default for ViewSupport {
    fn default() -> Self {
        Self::BASIC
    }
}
