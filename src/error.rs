//! Error type shared by the balanced containers, the grammar parser and the rhythm parsers.

use derive_more::{Display, Error};

// -------------------------------------------------------------------------------------------------

/// Errors raised by the fallible, authoritative operations of this crate.
///
/// Best-effort parsers, such as [`Tree::from_string`](crate::measure::Tree::from_string), don't
/// use this type but return `None` instead.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum Error {
    /// A position or range argument fell outside of `[0, len]`, or a range was reversed.
    #[display("index {index} out of range [0, {len}]")]
    IndexRange { index: usize, len: usize },
    /// A grammar definition failed to parse or referenced undefined nonterminals.
    #[display("grammar error in line {line}: {message}")]
    Grammar { line: usize, message: String },
    /// A rhythm string form failed to parse.
    #[display("invalid rhythm '{input}': {message}")]
    Rhythm { input: String, message: String },
}

impl Error {
    pub(crate) fn index_range(index: usize, len: usize) -> Self {
        Self::IndexRange { index, len }
    }

    pub(crate) fn grammar<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Grammar {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn rhythm<S: Into<String>>(input: &str, message: S) -> Self {
        Self::Rhythm {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

/// Result alias for operations which fail with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
