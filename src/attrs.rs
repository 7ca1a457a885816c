//! Attribute expressions that read existing state.
//!
//! Everything here is a small [`AttrExpr`]: given a chunk set, produce one
//! column with one value per chunk. [`Attr`] copies a column the chunk
//! table already has (the aliasing primitive behind `select`). [`AtomData`]
//! gathers member-atom attributes into per-chunk lists. [`RegexCount`] and
//! [`ChunkOverlap`] compute derived signals used by the filter stage.

use std::collections::HashSet;

use regex::Regex;

use crate::col;
use crate::error::{Error, Result};
use crate::table::Column;
use crate::value::Value;
use crate::{AttrExpr, ChunkSet};

/// Copies an attribute the chunk table already carries.
///
/// The workhorse behind renames: `select(&[], &[("nth", &Attr::new("ordinal"))])`
/// materializes `ordinal` under the name `nth` without touching the
/// original column.
///
/// ```rust
/// use quarry::{Attr, Value};
///
/// # fn main() -> quarry::Result<()> {
/// let corpus = quarry::corpus_from_text("One two. Three.", "doc")?;
/// let out = corpus
///     .chunk("sentence")?
///     .select(&[], &[("nth", &Attr::new("ordinal"))])?;
///
/// assert_eq!(out.value("nth", 1), Some(&Value::from(2i64)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Attr {
    name: String,
}

impl Attr {
    /// Read the chunk attribute named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl AttrExpr for Attr {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        Ok(chunks.chunks().try_column(&self.name)?.clone())
    }
}

/// Gathers one atom attribute into a per-chunk list.
///
/// Values appear in membership order, one list per chunk; a chunk with no
/// atoms yields an empty list. Atoms missing the attribute surface as
/// [`Error::UnknownAttribute`] since atom attributes are table columns,
/// not per-row options.
#[derive(Debug, Clone)]
pub struct AtomData {
    attr: String,
}

impl AtomData {
    /// Gather the atom attribute named `attr`.
    #[must_use]
    pub fn new(attr: impl Into<String>) -> Self {
        Self { attr: attr.into() }
    }
}

impl AttrExpr for AtomData {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        let source = chunks.atoms().try_column(&self.attr)?;
        let mut out = Vec::with_capacity(chunks.len());
        for rows in chunks.member_rows()? {
            let gathered: Vec<Value> = rows
                .iter()
                .map(|&row| source.values()[row].clone())
                .collect();
            out.push(Value::from(gathered));
        }
        Ok(Column::from(out))
    }
}

/// Counts non-overlapping regex matches in derived chunk text.
///
/// Wraps another expression (typically a stringifier) and counts matches
/// in whatever string it produces. Null input stays null, so empty chunks
/// pass through rather than counting as zero matches.
pub struct RegexCount {
    source: Box<dyn AttrExpr>,
    regex: Regex,
}

impl std::fmt::Debug for RegexCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegexCount")
            .field("pattern", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

impl RegexCount {
    /// Count matches of `pattern` in the text produced by `source`.
    ///
    /// Inline flags such as `(?i)` work as usual.
    ///
    /// # Errors
    ///
    /// The pattern compiles eagerly; an invalid one fails here with
    /// [`Error::Pattern`].
    pub fn new(source: impl AttrExpr + 'static, pattern: &str) -> Result<Self> {
        Ok(Self {
            source: Box::new(source),
            regex: Regex::new(pattern)?,
        })
    }
}

impl AttrExpr for RegexCount {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        let texts = self.source.eval(chunks)?;
        let out: Vec<Value> = texts
            .iter()
            .map(|v| match v.as_str() {
                Some(text) => Value::from(self.regex.find_iter(text).count() as i64),
                None => Value::Null,
            })
            .collect();
        Ok(Column::from(out))
    }
}

/// How [`ChunkOverlap`] reports shared atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapAgg {
    /// True when at least one member atom is shared.
    Bool,
    /// Number of distinct shared member atoms.
    Count,
    /// Shared fraction of this chunk's distinct members; null for empty
    /// chunks.
    Frac,
}

/// Measures how much each chunk overlaps another chunk set.
///
/// An atom is shared when it belongs to the chunk *and* to any chunk of
/// `other`. Both sets must come from the same corpus; anything else is a
/// [`Error::ForeignCorpusReference`].
///
/// The classic use is relevance marking: derive an ephemeral chunk set of
/// query matches, then ask every line what fraction of it the matches
/// cover.
#[derive(Debug, Clone)]
pub struct ChunkOverlap {
    other: ChunkSet,
    agg: OverlapAgg,
}

impl ChunkOverlap {
    /// Measure overlap against `other`, reported per `agg`.
    #[must_use]
    pub fn new(other: &ChunkSet, agg: OverlapAgg) -> Self {
        Self {
            other: other.clone(),
            agg,
        }
    }
}

impl AttrExpr for ChunkOverlap {
    fn eval(&self, chunks: &ChunkSet) -> Result<Column> {
        if !chunks.same_corpus(&self.other) {
            return Err(Error::ForeignCorpusReference);
        }

        let shared: HashSet<&Value> = self
            .other
            .memberships()
            .try_column(col::ATOM)?
            .iter()
            .collect();
        let atom_ids = chunks.atoms().try_column(col::ID)?;

        let mut out = Vec::with_capacity(chunks.len());
        for rows in chunks.member_rows()? {
            let members: HashSet<&Value> =
                rows.iter().map(|&row| &atom_ids.values()[row]).collect();
            let n_shared = members.intersection(&shared).count();
            out.push(match self.agg {
                OverlapAgg::Bool => Value::from(n_shared > 0),
                OverlapAgg::Count => Value::from(n_shared as i64),
                OverlapAgg::Frac if members.is_empty() => Value::Null,
                OverlapAgg::Frac => Value::from(n_shared as f64 / members.len() as f64),
            });
        }
        Ok(Column::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::stringify::Stringify;
    use crate::table::Table;

    fn corpus_with_atoms(texts: &[&str]) -> Corpus {
        let ids: Vec<i64> = (1..=texts.len() as i64).collect();
        let atoms = Table::from_columns([
            ("id", Column::from(ids.clone())),
            ("text", Column::from(texts.to_vec())),
            ("ordinal", Column::from(ids)),
        ])
        .unwrap();
        Corpus::new(atoms).unwrap()
    }

    fn set_over(corpus: &Corpus, groups: &[(i64, &[i64])]) -> ChunkSet {
        let chunk_ids: Vec<i64> = groups.iter().map(|(id, _)| *id).collect();
        let mut m_chunk = Vec::new();
        let mut m_atom = Vec::new();
        for (id, atoms) in groups {
            for &a in *atoms {
                m_chunk.push(*id);
                m_atom.push(a);
            }
        }
        let chunks = Table::from_columns([("id", Column::from(chunk_ids))]).unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(m_chunk)),
            ("atom", Column::from(m_atom)),
        ])
        .unwrap();
        ChunkSet::new(corpus, chunks, memberships).unwrap()
    }

    #[test]
    fn attr_copies_an_existing_column() {
        let corpus = corpus_with_atoms(&["a", "b"]);
        let set = set_over(&corpus, &[(10, &[1]), (20, &[2])])
            .enrich(&[("text", &Stringify::default())])
            .unwrap();
        let col = Attr::new("text").eval(&set).unwrap();
        assert_eq!(col.get(1), Some(&Value::from("b")));
    }

    #[test]
    fn attr_reports_unknown_columns() {
        let corpus = corpus_with_atoms(&["a"]);
        let set = set_over(&corpus, &[(10, &[1])]);
        assert!(matches!(
            Attr::new("width").eval(&set),
            Err(Error::UnknownAttribute(n)) if n == "width"
        ));
    }

    #[test]
    fn atom_data_gathers_in_membership_order() {
        let corpus = corpus_with_atoms(&["a", "b", "c"]);
        let set = set_over(&corpus, &[(10, &[3, 1, 2])]);
        let col = AtomData::new("text").eval(&set).unwrap();
        assert_eq!(
            col.get(0),
            Some(&Value::from(vec![
                Value::from("c"),
                Value::from("a"),
                Value::from("b"),
            ]))
        );
    }

    #[test]
    fn atom_data_empty_chunk_is_an_empty_list() {
        let corpus = corpus_with_atoms(&["a"]);
        let set = set_over(&corpus, &[(10, &[])]);
        let col = AtomData::new("text").eval(&set).unwrap();
        assert_eq!(col.get(0), Some(&Value::from(Vec::<Value>::new())));
    }

    #[test]
    fn regex_count_counts_matches() {
        let corpus = corpus_with_atoms(&["one", "two", "onion"]);
        let set = set_over(&corpus, &[(10, &[1, 2]), (20, &[3])]);
        let expr = RegexCount::new(Stringify::default(), "o").unwrap();
        let col = expr.eval(&set).unwrap();
        assert_eq!(col.get(0), Some(&Value::from(2i64)));
        assert_eq!(col.get(1), Some(&Value::from(2i64)));
    }

    #[test]
    fn regex_count_honors_inline_flags() {
        let corpus = corpus_with_atoms(&["One", "ONION"]);
        let set = set_over(&corpus, &[(10, &[1, 2])]);
        let expr = RegexCount::new(Stringify::default(), "(?i)o").unwrap();
        assert_eq!(expr.eval(&set).unwrap().get(0), Some(&Value::from(3i64)));
    }

    #[test]
    fn regex_count_passes_null_through() {
        let corpus = corpus_with_atoms(&["a"]);
        let set = set_over(&corpus, &[(10, &[])]);
        let expr = RegexCount::new(Stringify::default(), "a").unwrap();
        assert_eq!(expr.eval(&set).unwrap().get(0), Some(&Value::Null));
    }

    #[test]
    fn regex_count_rejects_bad_patterns() {
        assert!(matches!(
            RegexCount::new(Stringify::default(), "(unclosed"),
            Err(Error::Pattern(_))
        ));
    }

    #[test]
    fn overlap_counts_shared_atoms() {
        let corpus = corpus_with_atoms(&["a", "b", "c", "d"]);
        let lines = set_over(&corpus, &[(10, &[1, 2]), (20, &[3, 4])]);
        let matches = set_over(&corpus, &[(91, &[2, 3])]);

        let count = ChunkOverlap::new(&matches, OverlapAgg::Count)
            .eval(&lines)
            .unwrap();
        assert_eq!(count.get(0), Some(&Value::from(1i64)));
        assert_eq!(count.get(1), Some(&Value::from(1i64)));

        let frac = ChunkOverlap::new(&matches, OverlapAgg::Frac)
            .eval(&lines)
            .unwrap();
        assert_eq!(frac.get(0), Some(&Value::from(0.5)));
    }

    #[test]
    fn overlap_bool_and_empty_chunks() {
        let corpus = corpus_with_atoms(&["a", "b"]);
        let lines = set_over(&corpus, &[(10, &[1]), (20, &[2]), (30, &[])]);
        let matches = set_over(&corpus, &[(91, &[1])]);

        let flags = ChunkOverlap::new(&matches, OverlapAgg::Bool)
            .eval(&lines)
            .unwrap();
        assert_eq!(flags.get(0), Some(&Value::from(true)));
        assert_eq!(flags.get(1), Some(&Value::from(false)));
        assert_eq!(flags.get(2), Some(&Value::from(false)));

        let frac = ChunkOverlap::new(&matches, OverlapAgg::Frac)
            .eval(&lines)
            .unwrap();
        assert_eq!(frac.get(2), Some(&Value::Null));
    }

    #[test]
    fn overlap_rejects_foreign_sets() {
        let corpus = corpus_with_atoms(&["a"]);
        let other = corpus_with_atoms(&["a"]);
        let lines = set_over(&corpus, &[(10, &[1])]);
        let foreign = set_over(&other, &[(10, &[1])]);
        assert!(matches!(
            ChunkOverlap::new(&foreign, OverlapAgg::Bool).eval(&lines),
            Err(Error::ForeignCorpusReference)
        ));
    }
}
