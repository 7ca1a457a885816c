//! Regex-match chunking.
//!
//! Turns every regex match into a chunk. Each boundary chunk's atoms are
//! laid out in ordinal order, joined with single spaces, and the pattern is
//! run over that joined text; a match's chunk contains every atom whose span
//! in the joined text intersects the match span.
//!
//! ```text
//! atoms:   The   quick   brown   fox
//! joined:  "The quick brown fox"
//!           0..3 4..9  10..15  16..19
//!
//! pattern "ick bro"  ->  match [6..13)
//! chunk members: quick, brown      (both spans intersect the match)
//! ```
//!
//! Matching never crosses boundary chunks: a pattern that would span two
//! pages finds nothing when the boundary is `"page"`.

use regex::Regex;

use crate::col;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::table::{Column, Table};
use crate::value::{hash_id, Value};
use crate::{ChunkExpr, ChunkSet};

/// Chunk expression producing one chunk per regex match.
///
/// Atoms whose text is null (or not text at all) take part as empty strings:
/// they occupy a position in the joined text but can never be matched.
///
/// ## Example
///
/// ```rust
/// use quarry::PatternChunk;
///
/// # fn main() -> quarry::Result<()> {
/// let corpus = quarry::corpus_from_text("The quick brown fox", "doc")?;
///
/// let matches = corpus.derive(&PatternChunk::new("document", "quick brown")?)?;
///
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches.memberships().len(), 2); // "quick" and "brown"
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PatternChunk {
    boundary: String,
    regex: Regex,
}

impl PatternChunk {
    /// Create a match expression over the registered chunk set named
    /// `boundary`.
    ///
    /// The pattern compiles eagerly. Case-insensitivity and other flags go
    /// inline (`(?i)...`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`](crate::Error::Pattern) for an invalid
    /// pattern.
    pub fn new(boundary: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            boundary: boundary.into(),
            regex: Regex::new(pattern)?,
        })
    }
}

impl ChunkExpr for PatternChunk {
    fn chunk(&self, corpus: &Corpus) -> Result<ChunkSet> {
        let boundary = corpus.chunk(&self.boundary)?;
        let members = boundary.member_rows_ordered()?;
        let boundary_ids = boundary.chunks().try_column(col::ID)?;
        let texts = corpus.atoms().try_column(col::TEXT)?;
        let atom_ids = corpus.atoms().try_column(col::ID)?;

        let mut chunk_ids: Vec<Value> = Vec::new();
        let mut m_chunk: Vec<Value> = Vec::new();
        let mut m_atom: Vec<Value> = Vec::new();

        for (b_row, rows) in members.iter().enumerate() {
            let boundary_id = &boundary_ids.values()[b_row];

            let mut joined = String::new();
            let mut spans = Vec::with_capacity(rows.len());
            for (i, &row) in rows.iter().enumerate() {
                if i > 0 {
                    joined.push(' ');
                }
                let start = joined.len();
                joined.push_str(texts.values()[row].as_str().unwrap_or(""));
                spans.push((start, joined.len(), row));
            }

            for m in self.regex.find_iter(&joined) {
                let id = Value::Int(hash_id(&(boundary_id, m.start())));
                for &(start, end, row) in &spans {
                    if start < m.end() && m.start() < end {
                        m_chunk.push(id.clone());
                        m_atom.push(atom_ids.values()[row].clone());
                    }
                }
                chunk_ids.push(id);
            }
        }

        let chunks = Table::from_columns([(col::ID, Column::from(chunk_ids))])?;
        let memberships = Table::from_columns([
            (col::CHUNK, Column::from(m_chunk)),
            (col::ATOM, Column::from(m_atom)),
        ])?;
        ChunkSet::new(corpus, chunks, memberships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn corpus_with_lines(lines: &[&[&str]]) -> Corpus {
        let words: Vec<&str> = lines.iter().flat_map(|l| l.iter().copied()).collect();
        let ids: Vec<i64> = (1..=words.len() as i64).collect();
        let atoms = Table::from_columns([
            ("id", Column::from(ids.clone())),
            ("text", Column::from(words)),
            ("ordinal", Column::from(ids)),
        ])
        .unwrap();
        let mut corpus = Corpus::new(atoms).unwrap();

        let mut chunk_ids = Vec::new();
        let mut m_chunk = Vec::new();
        let mut m_atom = Vec::new();
        let mut next_atom = 1i64;
        for (i, line) in lines.iter().enumerate() {
            let line_id = 100 + i as i64;
            chunk_ids.push(line_id);
            for _ in 0..line.len() {
                m_chunk.push(line_id);
                m_atom.push(next_atom);
                next_atom += 1;
            }
        }
        let chunks = Table::from_columns([("id", Column::from(chunk_ids))]).unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(m_chunk)),
            ("atom", Column::from(m_atom)),
        ])
        .unwrap();
        let set = ChunkSet::new(&corpus, chunks, memberships).unwrap();
        corpus.set_chunk("line", &set).unwrap();
        corpus
    }

    #[test]
    fn phrase_match_captures_its_atoms() {
        let corpus = corpus_with_lines(&[&["The", "quick", "brown", "fox"]]);
        let matches = corpus
            .derive(&PatternChunk::new("line", "quick brown").unwrap())
            .unwrap();
        assert_eq!(matches.len(), 1);
        let members = matches.member_rows_ordered().unwrap();
        assert_eq!(members[0], vec![1, 2]);
    }

    #[test]
    fn partial_word_overlap_still_captures() {
        let corpus = corpus_with_lines(&[&["The", "quick", "brown", "fox"]]);
        let matches = corpus
            .derive(&PatternChunk::new("line", "ick bro").unwrap())
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches.member_rows_ordered().unwrap()[0], vec![1, 2]);
    }

    #[test]
    fn each_match_becomes_a_chunk() {
        let corpus = corpus_with_lines(&[&["The", "quick", "brown", "fox"]]);
        let matches = corpus
            .derive(&PatternChunk::new("line", "o").unwrap())
            .unwrap();
        // one 'o' in "brown", one in "fox"
        assert_eq!(matches.len(), 2);
        let ids = matches.chunks().distinct("id").unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn matching_stays_inside_boundary_chunks() {
        let corpus = corpus_with_lines(&[&["a", "b"], &["c", "d"]]);
        let matches = corpus
            .derive(&PatternChunk::new("line", "b c").unwrap())
            .unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn inline_flags_apply() {
        let corpus = corpus_with_lines(&[&["The", "quick"]]);
        let matches = corpus
            .derive(&PatternChunk::new("line", "(?i)the").unwrap())
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn bad_patterns_fail_at_construction() {
        assert!(matches!(
            PatternChunk::new("line", "("),
            Err(Error::Pattern(_))
        ));
    }

    #[test]
    fn unknown_boundary_is_reported() {
        let corpus = corpus_with_lines(&[&["a"]]);
        assert!(matches!(
            corpus.derive(&PatternChunk::new("page", "a").unwrap()),
            Err(Error::UnknownChunkName(n)) if n == "page"
        ));
    }
}
