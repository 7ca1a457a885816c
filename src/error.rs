//! Error types for quarry.

use crate::value::Value;

/// Errors that can occur while building or querying a corpus.
///
/// Every variant carries the offending name, id, or shape so a failure deep
/// in a pipeline can be diagnosed without re-running it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Two atoms in one atom table share an id.
    #[error("duplicate atom id: {0}")]
    DuplicateAtomId(Value),

    /// Two chunks in one chunk table share an id.
    #[error("duplicate chunk id: {0}")]
    DuplicateChunkId(Value),

    /// A registry lookup named a chunk set the corpus does not have.
    #[error("unknown chunk name: '{0}'")]
    UnknownChunkName(String),

    /// A chunk set built against one corpus was used with a different corpus.
    #[error("chunk set belongs to a different corpus")]
    ForeignCorpusReference,

    /// A named column does not exist in the table being read.
    #[error("unknown attribute: '{0}'")]
    UnknownAttribute(String),

    /// A column's length does not match the table it is being attached to.
    #[error("attribute '{name}' has {actual} values, expected {expected}")]
    AttributeLengthMismatch {
        /// The column being attached.
        name: String,
        /// The table's row count.
        expected: usize,
        /// The column's length.
        actual: usize,
    },

    /// Window size and offset produce a non-positive stride (or a zero size).
    #[error("invalid window config: size {size}, offset {offset} (stride must be > 0)")]
    InvalidWindowConfig {
        /// The window size.
        size: usize,
        /// The window offset.
        offset: i64,
    },

    /// An operation needed atoms ordered by an attribute they do not carry.
    #[error("atoms lack ordering attribute '{0}'")]
    MissingOrderingAttribute(String),

    /// Two values had to be ordered but have no natural ordering.
    #[error("cannot compare {left} with {right} in attribute '{name}'")]
    IncomparableValue {
        /// The attribute being compared.
        name: String,
        /// Kind of the left value.
        left: &'static str,
        /// Kind of the right value.
        right: &'static str,
    },

    /// Two tables being combined do not share a compatible schema.
    #[error("incompatible schema in column '{column}': {reason}")]
    IncompatibleSchema {
        /// The column that failed the check.
        column: String,
        /// What differed.
        reason: String,
    },

    /// A membership row references an atom id absent from the corpus.
    #[error("membership references unknown atom id: {0}")]
    DanglingAtomReference(Value),

    /// A membership row references a chunk id absent from the chunk table.
    #[error("membership references unknown chunk id: {0}")]
    DanglingChunkReference(Value),

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An ingestion record could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// One-based line number in the input.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
