//! Compiling `?` placeholders into a dialect's native bind markers.
//!
//! Raw SQL handed to a [`Database`](crate::Database) uses `?` as its single
//! positional placeholder. Before execution the text is walked with a small
//! lexical state machine that skips string literals, quoted identifiers,
//! comments and (for Postgres) dollar-quoted bodies; every remaining `?` is
//! replaced with the grammar's marker for its position. `??` outside those
//! regions stands for a literal `?` (e.g. the Postgres `jsonb ? key`
//! operator).
//!
//! Only the placeholders are rewritten. Bound values never enter the SQL
//! text; they travel to the driver separately.

use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_escape_string_start, is_line_comment_start,
    matches_tag, try_start_dollar_quote,
};
use scanner::{Lexicon, State};

use crate::error::DbError;
use crate::grammar::Grammar;
use crate::types::{DatabaseType, DatabaseValue};

/// SQL text after placeholder compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSql<'a> {
    /// Text with native bind markers; borrowed when nothing changed.
    pub sql: Cow<'a, str>,
    /// How many values the text expects.
    pub placeholders: usize,
}

#[derive(Debug, Clone, Copy)]
enum Marker {
    Placeholder(usize),
    EscapedQuestion(usize),
}

/// Count the `?` placeholders `sql` expects under `dialect`'s lexical rules.
#[must_use]
pub fn count_placeholders(sql: &str, dialect: DatabaseType) -> usize {
    scan(sql, Lexicon::for_dialect(dialect))
        .iter()
        .filter(|marker| matches!(marker, Marker::Placeholder(_)))
        .count()
}

/// Rewrite `?` placeholders into `grammar`'s native markers.
#[must_use]
pub fn compile_placeholders<'a>(sql: &'a str, grammar: &dyn Grammar) -> CompiledSql<'a> {
    let markers = scan(sql, Lexicon::for_dialect(grammar.dialect()));
    if markers.is_empty() {
        return CompiledSql {
            sql: Cow::Borrowed(sql),
            placeholders: 0,
        };
    }

    let mut out = String::with_capacity(sql.len() + markers.len() * 2);
    let mut last = 0;
    let mut position = 0;
    for marker in &markers {
        match *marker {
            Marker::Placeholder(at) => {
                out.push_str(&sql[last..at]);
                position += 1;
                out.push_str(&grammar.bind_placeholder(position));
                last = at + 1;
            }
            Marker::EscapedQuestion(at) => {
                out.push_str(&sql[last..at]);
                out.push('?');
                last = at + 2;
            }
        }
    }
    out.push_str(&sql[last..]);

    let sql = if out == sql {
        Cow::Borrowed(sql)
    } else {
        Cow::Owned(out)
    };
    CompiledSql {
        sql,
        placeholders: position,
    }
}

/// Compile `sql` for `grammar` and check it against the bound values.
///
/// # Errors
/// Returns `DbError::ParameterCountMismatch` when the placeholder count and
/// `values.len()` differ; nothing is truncated or padded.
pub fn compile_raw<'a>(
    grammar: &dyn Grammar,
    sql: &'a str,
    values: &[DatabaseValue],
) -> Result<Cow<'a, str>, DbError> {
    let compiled = compile_placeholders(sql, grammar);
    if compiled.placeholders != values.len() {
        return Err(DbError::ParameterCountMismatch {
            expected: compiled.placeholders,
            actual: values.len(),
        });
    }
    Ok(compiled.sql)
}

fn scan(sql: &str, lexicon: Lexicon) -> Vec<Marker> {
    let bytes = sql.as_bytes();
    let mut markers = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' if lexicon.escape_strings && is_escape_string_start(bytes, idx) => {
                    state = State::EscapeQuoted;
                }
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' if lexicon.backticks => state = State::Backticked,
                b'#' if lexicon.hash_comments => state = State::LineComment,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' if lexicon.dollar_quotes => {
                    if let Some((tag, opener_end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = opener_end;
                    }
                }
                b'?' => {
                    if bytes.get(idx + 1) == Some(&b'?') {
                        markers.push(Marker::EscapedQuestion(idx));
                        idx += 1;
                    } else {
                        markers.push(Marker::Placeholder(idx));
                    }
                }
                _ => {}
            },
            State::SingleQuoted | State::EscapeQuoted | State::DoubleQuoted | State::Backticked => {
                let (quote, escapes) = match state {
                    State::SingleQuoted => (b'\'', lexicon.backslash_escapes),
                    State::EscapeQuoted => (b'\'', true),
                    State::DoubleQuoted => (b'"', lexicon.backslash_escapes),
                    _ => (b'`', false),
                };
                if b == b'\\' && escapes {
                    idx += 1; // skip escaped character
                } else if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // skip doubled quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    markers
}
