use crate::types::DatabaseType;

/// Lexical context while walking SQL text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    /// `E'...'`: single quotes where backslash always escapes.
    EscapeQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Which quoting and comment forms a dialect understands.
#[derive(Clone, Copy, Debug)]
pub(super) struct Lexicon {
    pub(super) hash_comments: bool,
    pub(super) backticks: bool,
    pub(super) dollar_quotes: bool,
    pub(super) backslash_escapes: bool,
    pub(super) escape_strings: bool,
}

impl Lexicon {
    pub(super) fn for_dialect(dialect: DatabaseType) -> Self {
        match dialect {
            DatabaseType::Postgres => Self {
                hash_comments: false,
                backticks: false,
                dollar_quotes: true,
                backslash_escapes: false,
                escape_strings: true,
            },
            DatabaseType::MySql => Self {
                hash_comments: true,
                backticks: true,
                dollar_quotes: false,
                backslash_escapes: true,
                escape_strings: false,
            },
            DatabaseType::Sqlite => Self {
                hash_comments: false,
                backticks: true,
                dollar_quotes: false,
                backslash_escapes: false,
                escape_strings: false,
            },
        }
    }
}
