//! SQLite table rebuilds.
//!
//! SQLite cannot alter a column, drop a constraint or change a primary key in
//! place. Those operations are planned at execution time from the live
//! `CREATE TABLE` text: the definition is edited, a temporary table is created
//! from it, rows are copied across, and the temporary table replaces the
//! original. Indexes are re-created afterwards.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

use crate::error::{Error, Result};

pub const FOREIGN_KEYS_QUERY: &str = "PRAGMA foreign_keys";
pub const FOREIGN_KEY_CHECK: &str = "PRAGMA foreign_key_check";

pub fn set_foreign_keys(enable: bool) -> String {
    format!("PRAGMA foreign_keys = {}", if enable { "ON" } else { "OFF" })
}

/// One edit applied to the table definition.
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOp {
    /// Replace a column definition.
    AlterColumn { column: String, definition: String },
    DropColumns(Vec<String>),
    /// Drop by constraint name, or by the constrained columns when unnamed.
    DropForeign {
        columns: Vec<String>,
        name: Option<String>,
    },
    /// Append a rendered foreign key constraint.
    AddForeign(String),
    /// Replace any primary key with a rendered constraint.
    AddPrimary(String),
    DropPrimary,
    SetNullable { column: String, nullable: bool },
}

/// Rebuild of one table, compiled ahead of time and planned once the current
/// definition is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildPlan {
    pub table: String,
    pub ops: Vec<RebuildOp>,
}

/// One comma-separated entry of the table body.
#[derive(Debug, Clone)]
struct Entry {
    tokens: Vec<Token>,
}

impl Entry {
    fn words(&self) -> impl Iterator<Item = &Word> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Word(w) => Some(w),
            _ => None,
        })
    }

    fn first_keyword(&self) -> Option<Keyword> {
        self.words().next().map(|w| w.keyword)
    }

    fn is_constraint(&self) -> bool {
        matches!(
            self.first_keyword(),
            Some(
                Keyword::CONSTRAINT
                    | Keyword::PRIMARY
                    | Keyword::UNIQUE
                    | Keyword::CHECK
                    | Keyword::FOREIGN
            )
        )
    }

    /// Column name for a column definition.
    fn column_name(&self) -> Option<&str> {
        if self.is_constraint() {
            return None;
        }
        self.words().next().map(|w| w.value.as_str())
    }

    fn constraint_name(&self) -> Option<&str> {
        let mut words = self.words();
        match words.next() {
            Some(w) if w.keyword == Keyword::CONSTRAINT => words.next().map(|w| w.value.as_str()),
            _ => None,
        }
    }

    fn has_keyword(&self, keyword: Keyword) -> bool {
        self.words().any(|w| w.keyword == keyword)
    }

    /// Identifiers inside the first parenthesized group.
    fn first_group(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut depth = 0;
        for token in &self.tokens {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    if depth == 1 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Word(w) if depth == 1 => out.push(w.value.clone()),
                _ => {}
            }
        }
        out
    }

    fn render(&self) -> String {
        render_tokens(&self.tokens)
    }
}

fn render_token(token: &Token) -> String {
    match token {
        Token::SingleQuotedString(s) => format!("'{}'", s.replace('\'', "''")),
        Token::Word(w) => match w.quote_style {
            Some('"') => format!("\"{}\"", w.value.replace('"', "\"\"")),
            Some('`') => format!("`{}`", w.value.replace('`', "``")),
            Some('[') => format!("[{}]", w.value),
            _ => w.value.clone(),
        },
        other => other.to_string(),
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(render_token).collect::<String>().trim().to_string()
}

fn is_whitespace(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_))
}

fn eq_ident(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn tokenize(sql: &str) -> Result<Vec<Token>> {
    Tokenizer::new(&SQLiteDialect {}, sql)
        .tokenize()
        .map_err(|e| Error::validation(format!("Unable to parse table definition: {}", e)))
}

/// Split `create table t (body) suffix` into the body entries and the suffix.
fn split_definition(table: &str, sql: &str) -> Result<(Vec<Entry>, String)> {
    let tokens = tokenize(sql)?;
    let open = tokens
        .iter()
        .position(|t| *t == Token::LParen)
        .ok_or_else(|| {
            Error::validation(format!("No column list in the definition of '{}'", table))
        })?;

    let mut entries = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    let mut close = None;
    for (i, token) in tokens.iter().enumerate().skip(open + 1) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth == 0 => {
                close = Some(i);
                break;
            }
            Token::RParen => depth -= 1,
            Token::Comma if depth == 0 => {
                entries.push(Entry {
                    tokens: std::mem::take(&mut current),
                });
                continue;
            }
            _ => {}
        }
        current.push(token.clone());
    }
    let close =
        close.ok_or_else(|| Error::validation(format!("Unbalanced definition of '{}'", table)))?;
    entries.push(Entry { tokens: current });

    let suffix = render_tokens(&tokens[close + 1..]);
    Ok((entries, suffix))
}

/// Remove `words` (matched in sequence, whitespace skipped) from a token list.
fn remove_sequence(tokens: &mut Vec<Token>, words: &[Keyword]) -> bool {
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !is_whitespace(t))
        .map(|(i, _)| i)
        .collect();
    for window in positions.windows(words.len()) {
        let matches = window.iter().zip(words).all(|(&i, kw)| {
            matches!(&tokens[i], Token::Word(w) if w.keyword == *kw)
        });
        if matches {
            let (start, end) = (window[0], window[window.len() - 1]);
            tokens.drain(start..=end);
            return true;
        }
    }
    false
}

fn strip_inline_primary(entry: &mut Entry) {
    if remove_sequence(&mut entry.tokens, &[Keyword::PRIMARY, Keyword::KEY]) {
        remove_sequence(&mut entry.tokens, &[Keyword::AUTOINCREMENT]);
    }
}

fn strip_inline_references(entry: &mut Entry) {
    let start = entry
        .tokens
        .iter()
        .position(|t| matches!(t, Token::Word(w) if w.keyword == Keyword::REFERENCES));
    if let Some(start) = start {
        entry.tokens.truncate(start);
    }
}

impl RebuildPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ops: Vec::new(),
        }
    }

    pub fn temp_table(&self) -> String {
        format!("_polyql_tmp_{}", self.table)
    }

    /// Query returning `(type, sql)` rows for the table and its indexes.
    pub fn table_sql_query(&self) -> String {
        format!(
            "SELECT type, sql FROM sqlite_master WHERE (type='table' OR (type='index' AND sql IS NOT NULL)) AND tbl_name='{}'",
            self.table.replace('\'', "''")
        )
    }

    /// Statements performing the rebuild, given the current table definition
    /// and the definitions of its indexes.
    pub fn plan(&self, create_sql: &str, index_sqls: &[String]) -> Result<Vec<String>> {
        let (mut entries, suffix) = split_definition(&self.table, create_sql)?;
        let original: Vec<String> = entries
            .iter()
            .filter_map(|e| e.column_name().map(str::to_string))
            .collect();
        let mut dropped: Vec<String> = Vec::new();

        for op in &self.ops {
            match op {
                RebuildOp::AlterColumn { column, definition } => {
                    let position = entries
                        .iter()
                        .position(|e| e.column_name().is_some_and(|n| eq_ident(n, column)))
                        .ok_or_else(|| {
                            Error::validation(format!(
                                "Column '{}' not found in '{}'",
                                column, self.table
                            ))
                        })?;
                    entries[position] = Entry {
                        tokens: tokenize(definition)?,
                    };
                }
                RebuildOp::DropColumns(columns) => {
                    entries.retain(|e| {
                        !e.column_name()
                            .is_some_and(|n| columns.iter().any(|c| eq_ident(n, c)))
                    });
                    dropped.extend(columns.iter().cloned());
                }
                RebuildOp::DropForeign { columns, name } => {
                    entries.retain(|e| {
                        if !e.is_constraint() || !e.has_keyword(Keyword::FOREIGN) {
                            return true;
                        }
                        match name {
                            Some(name) => !e.constraint_name().is_some_and(|n| eq_ident(n, name)),
                            None => {
                                let group = e.first_group();
                                !(group.len() == columns.len()
                                    && group.iter().zip(columns).all(|(a, b)| eq_ident(a, b)))
                            }
                        }
                    });
                    if let [column] = columns.as_slice() {
                        for entry in entries.iter_mut() {
                            if entry.column_name().is_some_and(|n| eq_ident(n, column)) {
                                strip_inline_references(entry);
                            }
                        }
                    }
                }
                RebuildOp::AddForeign(constraint) => entries.push(Entry {
                    tokens: tokenize(constraint)?,
                }),
                RebuildOp::AddPrimary(constraint) => {
                    drop_primary(&mut entries);
                    entries.push(Entry {
                        tokens: tokenize(constraint)?,
                    });
                }
                RebuildOp::DropPrimary => drop_primary(&mut entries),
                RebuildOp::SetNullable { column, nullable } => {
                    let entry = entries
                        .iter_mut()
                        .find(|e| e.column_name().is_some_and(|n| eq_ident(n, column)))
                        .ok_or_else(|| {
                            Error::validation(format!(
                                "Column '{}' not found in '{}'",
                                column, self.table
                            ))
                        })?;
                    remove_sequence(&mut entry.tokens, &[Keyword::NOT, Keyword::NULL]);
                    if !nullable {
                        entry.tokens.extend(tokenize(" not null")?);
                    }
                }
            }
        }

        let columns: Vec<String> = original
            .into_iter()
            .filter(|c| !dropped.iter().any(|d| eq_ident(c, d)))
            .collect();
        let body = entries
            .iter()
            .map(Entry::render)
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let temp = self.temp_table();

        let mut statements = Vec::with_capacity(4 + index_sqls.len());
        let mut create = format!("CREATE TABLE {} ({})", quote(&temp), body);
        if !suffix.is_empty() {
            create.push(' ');
            create.push_str(&suffix);
        }
        statements.push(create);
        statements.push(format!(
            "INSERT INTO {} SELECT {} FROM {};",
            quote(&temp),
            columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
            quote(&self.table)
        ));
        statements.push(format!("DROP TABLE {}", quote(&self.table)));
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            quote(&temp),
            quote(&self.table)
        ));

        for index in index_sqls {
            if !references_any(index, &dropped)? {
                statements.push(index.clone());
            }
        }
        Ok(statements)
    }
}

fn drop_primary(entries: &mut Vec<Entry>) {
    entries.retain(|e| !(e.is_constraint() && e.has_keyword(Keyword::PRIMARY)));
    for entry in entries.iter_mut() {
        if entry.column_name().is_some() {
            strip_inline_primary(entry);
        }
    }
}

fn references_any(sql: &str, columns: &[String]) -> Result<bool> {
    if columns.is_empty() {
        return Ok(false);
    }
    Ok(tokenize(sql)?.iter().any(|t| match t {
        Token::Word(w) => columns.iter().any(|c| eq_ident(&w.value, c)),
        _ => false,
    }))
}
