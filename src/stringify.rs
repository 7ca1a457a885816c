//! Materializing chunk text from member atoms.
//!
//! Atoms are the only place text lives; a chunk's text is always derived,
//! never stored. [`Stringify`] joins member atoms with one fixed delimiter.
//! [`DelimitedStringify`] picks the delimiter per gap by watching where
//! *other* chunk sets change identity; that is how a paragraph break knows
//! to render as a pilcrow while an ordinary word gap renders as a space.

use std::collections::HashMap;

use crate::col;
use crate::error::{Error, Result};
use crate::table::Column;
use crate::value::Value;
use crate::{AttrExpr, ChunkSet};

/// Joins each chunk's member atom text, in ordinal order, with one
/// delimiter.
///
/// A chunk with no atoms materializes as null (there is nothing to join,
/// and an empty string would be indistinguishable from a chunk of empty
/// atoms). Atoms with null text join as empty strings.
///
/// ## Example
///
/// ```rust
/// use quarry::{Stringify, Value};
///
/// # fn main() -> quarry::Result<()> {
/// let corpus = quarry::corpus_from_text("Pack my box.", "doc")?;
/// let out = corpus
///     .chunk("sentence")?
///     .select(&[], &[("text", &Stringify::new("_"))])?;
///
/// assert_eq!(
///     out.value("text", 0).and_then(Value::as_str),
///     Some("Pack_my_box_.")
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Stringify {
    delimiter: String,
}

impl Stringify {
    /// Join atom text with `delimiter`.
    #[must_use]
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl Default for Stringify {
    /// Joins with a single space.
    fn default() -> Self {
        Self::new(" ")
    }
}

impl AttrExpr for Stringify {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        let members = chunks.member_rows_ordered()?;
        let texts = chunks.atoms().try_column(col::TEXT)?;

        let mut out = Vec::with_capacity(members.len());
        for rows in &members {
            if rows.is_empty() {
                out.push(Value::Null);
                continue;
            }
            let mut s = String::new();
            for (i, &row) in rows.iter().enumerate() {
                if i > 0 {
                    s.push_str(&self.delimiter);
                }
                s.push_str(texts.values()[row].as_str().unwrap_or(""));
            }
            out.push(Value::from(s));
        }
        Ok(Column::from(out))
    }
}

/// Joins member atom text with structure-aware delimiters.
///
/// Boundary chunk sets are consulted in the order they were added: the gap
/// after an atom takes the first boundary's delimiter whose chunk identity
/// changes between that atom and the next, and falls back to the atom
/// delimiter when none does. Nothing is appended after the final atom.
///
/// ```text
/// atoms:        a    b    c    d
/// "paragraph":  P1   P1   P2   P2
/// "line":       L1   L2   L2   L3
///
/// boundaries: paragraph -> "\n\n", line -> "\n", atom delimiter " "
/// gaps:         line | paragraph | line
/// result:       "a\nb\n\nc\nd"
/// ```
///
/// A gap only counts as a boundary change when *both* atoms belong to some
/// chunk of that boundary set and the chunks differ; atoms outside the set
/// never trigger it. An atom belonging to several chunks of one boundary
/// set takes the last one's identity.
#[derive(Debug, Clone)]
pub struct DelimitedStringify {
    boundaries: Vec<(ChunkSet, String)>,
    atom_delimiter: String,
}

impl DelimitedStringify {
    /// Join atom text with `atom_delimiter` wherever no boundary changes.
    #[must_use]
    pub fn new(atom_delimiter: impl Into<String>) -> Self {
        Self {
            boundaries: Vec::new(),
            atom_delimiter: atom_delimiter.into(),
        }
    }

    /// Add a boundary chunk set; gaps where its chunk identity changes
    /// render as `delimiter`. Earlier boundaries win when several change at
    /// the same gap.
    #[must_use]
    pub fn boundary(mut self, chunks: &ChunkSet, delimiter: impl Into<String>) -> Self {
        self.boundaries.push((chunks.clone(), delimiter.into()));
        self
    }
}

impl AttrExpr for DelimitedStringify {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        for (set, _) in &self.boundaries {
            if !chunks.same_corpus(set) {
                return Err(Error::ForeignCorpusReference);
            }
        }

        let members = chunks.member_rows_ordered()?;
        let texts = chunks.atoms().try_column(col::TEXT)?;

        // atom row -> owning chunk id, one map per boundary set
        let mut owners: Vec<HashMap<usize, Value>> = Vec::with_capacity(self.boundaries.len());
        for (set, _) in &self.boundaries {
            let ids = set.chunks().try_column(col::ID)?;
            let mut map = HashMap::new();
            for (c_row, atom_rows) in set.member_rows()?.iter().enumerate() {
                for &a in atom_rows {
                    map.insert(a, ids.values()[c_row].clone());
                }
            }
            owners.push(map);
        }

        let mut out = Vec::with_capacity(members.len());
        for rows in &members {
            if rows.is_empty() {
                out.push(Value::Null);
                continue;
            }
            let mut s = String::new();
            for (i, &row) in rows.iter().enumerate() {
                s.push_str(texts.values()[row].as_str().unwrap_or(""));
                let Some(&next) = rows.get(i + 1) else {
                    break;
                };
                let delimiter = self
                    .boundaries
                    .iter()
                    .zip(&owners)
                    .find_map(|((_, delim), owner)| {
                        match (owner.get(&row), owner.get(&next)) {
                            (Some(a), Some(b)) if a != b => Some(delim.as_str()),
                            _ => None,
                        }
                    })
                    .unwrap_or(&self.atom_delimiter);
                s.push_str(delimiter);
            }
            out.push(Value::from(s));
        }
        Ok(Column::from(out))
    }
}
