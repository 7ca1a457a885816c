//! Chunk sets: a chunk table, its membership junction, and the pipeline verbs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::col;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::table::Table;
use crate::{AttrExpr, ChunkFilter};

/// A set of chunks over one corpus's atoms.
///
/// A chunk set is three tables travelling together: the corpus's atom table
/// (shared, immutable), a chunk table (one row per chunk, `id` plus any
/// attributes), and a membership junction (`chunk`, `atom`) recording which
/// atoms each chunk contains. Atoms are never copied into chunks; the
/// junction is the only link.
///
/// Chunk sets are values. [`enrich`](ChunkSet::enrich),
/// [`filter`](ChunkSet::filter), and [`retain_rows`](ChunkSet::retain_rows)
/// all return new sets and leave the receiver untouched; cloning shares the
/// underlying buffers.
///
/// Construction through [`ChunkSet::new`] validates referential integrity
/// eagerly: chunk ids unique, every membership row pointing at a real chunk
/// and a real atom. Everything downstream preserves those invariants by
/// construction, so consumers never re-check.
#[derive(Clone, PartialEq)]
pub struct ChunkSet {
    atoms: Arc<Table>,
    chunks: Table,
    memberships: Table,
}

impl ChunkSet {
    /// Build a chunk set against `corpus`.
    ///
    /// `chunks` must carry a unique `id` column; `memberships` must carry
    /// `chunk` and `atom` columns whose values exist in the chunk table and
    /// the corpus's atom table respectively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateChunkId`] on repeated chunk ids,
    /// [`Error::DanglingChunkReference`] or [`Error::DanglingAtomReference`]
    /// when a membership row points at nothing.
    pub fn new(corpus: &Corpus, chunks: Table, memberships: Table) -> Result<ChunkSet> {
        let atoms = Arc::clone(corpus.atom_store());
        validate_parts(&atoms, &chunks, &memberships)?;
        Ok(ChunkSet {
            atoms,
            chunks,
            memberships,
        })
    }

    /// Assemble a chunk set from parts already known to satisfy the
    /// construction invariants.
    pub(crate) fn assemble(atoms: Arc<Table>, chunks: Table, memberships: Table) -> ChunkSet {
        ChunkSet {
            atoms,
            chunks,
            memberships,
        }
    }

    /// The chunk table: one row per chunk.
    #[must_use]
    pub fn chunks(&self) -> &Table {
        &self.chunks
    }

    /// The membership junction: one row per (chunk, atom) edge.
    #[must_use]
    pub fn memberships(&self) -> &Table {
        &self.memberships
    }

    /// The owning corpus's atom table.
    #[must_use]
    pub fn atoms(&self) -> &Table {
        &self.atoms
    }

    pub(crate) fn atom_store(&self) -> &Arc<Table> {
        &self.atoms
    }

    /// Whether `other` was built against the same corpus as `self`.
    ///
    /// Identity, not equality: two corpora over identical atom tables are
    /// still different corpora.
    #[must_use]
    pub fn same_corpus(&self, other: &ChunkSet) -> bool {
        Arc::ptr_eq(&self.atoms, &other.atoms)
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the set has no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// For each chunk (chunk-table row order), the atom-table row indices of
    /// its member atoms, in membership-table order.
    ///
    /// This is the chunk↔atom join every attribute expression builds on.
    ///
    /// # Errors
    ///
    /// Returns an error if a required column is missing. Dangling membership
    /// rows cannot occur on a validly constructed set.
    pub fn member_rows(&self) -> Result<Vec<Vec<usize>>> {
        let chunk_ids = self.chunks.try_column(col::ID)?;
        let m_chunk = self.memberships.try_column(col::CHUNK)?;
        let m_atom = self.memberships.try_column(col::ATOM)?;
        let atom_ids = self.atoms.try_column(col::ID)?;

        let chunk_row: HashMap<&crate::Value, usize> = chunk_ids
            .iter()
            .enumerate()
            .map(|(i, v)| (v, i))
            .collect();
        let atom_row: HashMap<&crate::Value, usize> = atom_ids
            .iter()
            .enumerate()
            .map(|(i, v)| (v, i))
            .collect();

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); chunk_ids.len()];
        for (c, a) in m_chunk.iter().zip(m_atom.iter()) {
            let Some(&ci) = chunk_row.get(c) else {
                return Err(Error::DanglingChunkReference(c.clone()));
            };
            let Some(&ai) = atom_row.get(a) else {
                return Err(Error::DanglingAtomReference(a.clone()));
            };
            members[ci].push(ai);
        }
        Ok(members)
    }

    /// Like [`member_rows`](ChunkSet::member_rows), with each chunk's atoms
    /// sorted by the atoms' `ordinal` attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOrderingAttribute`] when the atom table has
    /// no `ordinal` column or a member atom's ordinal is null,
    /// [`Error::IncomparableValue`] when ordinals cannot be ordered.
    pub fn member_rows_ordered(&self) -> Result<Vec<Vec<usize>>> {
        let ordinals = self
            .atoms
            .column(col::ORDINAL)
            .ok_or_else(|| Error::MissingOrderingAttribute(col::ORDINAL.to_string()))?;

        let mut members = self.member_rows()?;
        for rows in &mut members {
            let Some(&first) = rows.first() else {
                continue;
            };
            for &row in rows.iter() {
                let (a, b) = (&ordinals.values()[first], &ordinals.values()[row]);
                if a.is_null() || b.is_null() {
                    return Err(Error::MissingOrderingAttribute(col::ORDINAL.to_string()));
                }
                if a.natural_cmp(b).is_none() {
                    return Err(Error::IncomparableValue {
                        name: col::ORDINAL.to_string(),
                        left: a.kind(),
                        right: b.kind(),
                    });
                }
            }
            rows.sort_by(|&a, &b| {
                ordinals.values()[a]
                    .natural_cmp(&ordinals.values()[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        Ok(members)
    }

    /// Attach derived attributes, one column per named expression.
    ///
    /// Every expression is evaluated against the *pre-enrich* chunk set, so
    /// expressions in one call never see each other's output; the columns
    /// are then attached left to right. Naming an existing column replaces
    /// it (and naming one twice in a call keeps the later expression's
    /// values).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeLengthMismatch`] when an expression yields
    /// the wrong number of values, in which case nothing is attached; any
    /// expression error is forwarded.
    pub fn enrich(&self, exprs: &[(&str, &dyn AttrExpr)]) -> Result<ChunkSet> {
        let mut computed = Vec::with_capacity(exprs.len());
        for (name, expr) in exprs {
            let column = expr.eval(self)?;
            if column.len() != self.chunks.len() {
                return Err(Error::AttributeLengthMismatch {
                    name: (*name).to_string(),
                    expected: self.chunks.len(),
                    actual: column.len(),
                });
            }
            computed.push((*name, column));
        }

        let mut chunks = self.chunks.clone();
        for (name, column) in computed {
            chunks = chunks.with_column(name, column)?;
        }
        log::trace!(
            "enrich: {} expression(s) over {} chunk(s)",
            exprs.len(),
            chunks.len()
        );
        Ok(ChunkSet {
            atoms: Arc::clone(&self.atoms),
            chunks,
            memberships: self.memberships.clone(),
        })
    }

    /// Apply filters left to right. An empty list is the identity.
    ///
    /// # Errors
    ///
    /// Forwards the first filter error; later filters never run.
    pub fn filter(&self, filters: &[&dyn ChunkFilter]) -> Result<ChunkSet> {
        let mut current = self.clone();
        for filter in filters {
            current = filter.apply(current)?;
        }
        log::trace!(
            "filter: {} -> {} chunk(s) through {} filter(s)",
            self.len(),
            current.len(),
            filters.len()
        );
        Ok(current)
    }

    /// Project the chunk table into an output table.
    ///
    /// `columns` copies existing chunk attributes through by name;
    /// `computed` evaluates attribute expressions against this chunk set.
    /// Output column order is positional names first, computed columns
    /// after, both in given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] for an absent positional name,
    /// [`Error::AttributeLengthMismatch`] for a computed column of the
    /// wrong length.
    pub fn select(&self, columns: &[&str], computed: &[(&str, &dyn AttrExpr)]) -> Result<Table> {
        let mut out = self.chunks.select(columns)?;
        for (name, expr) in computed {
            let column = expr.eval(self)?;
            if column.len() != self.chunks.len() {
                return Err(Error::AttributeLengthMismatch {
                    name: (*name).to_string(),
                    expected: self.chunks.len(),
                    actual: column.len(),
                });
            }
            out = out.with_column(*name, column)?;
        }
        Ok(out)
    }

    /// Keep only the chunk-table rows at `rows` (in the given order),
    /// dropping membership rows of removed chunks.
    ///
    /// This is the single row-subset path; every built-in filter goes
    /// through it, which is what keeps the junction table from referencing
    /// chunks that no longer exist.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn retain_rows(&self, rows: &[usize]) -> ChunkSet {
        let chunks = self.chunks.take(rows);
        let kept: HashSet<&crate::Value> = chunks
            .column(col::ID)
            .map(|c| c.iter().collect())
            .unwrap_or_default();
        let m_rows: Vec<usize> = self
            .memberships
            .column(col::CHUNK)
            .map(|mc| {
                mc.iter()
                    .enumerate()
                    .filter(|(_, v)| kept.contains(v))
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default();
        ChunkSet {
            atoms: Arc::clone(&self.atoms),
            chunks,
            memberships: self.memberships.take(&m_rows),
        }
    }
}

impl fmt::Debug for ChunkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChunkSet {{ chunks: {}, memberships: {} }}",
            self.chunks.len(),
            self.memberships.len()
        )
    }
}

/// Referential-integrity checks shared by [`ChunkSet::new`] and the merge
/// engine.
pub(crate) fn validate_parts(atoms: &Table, chunks: &Table, memberships: &Table) -> Result<()> {
    let chunk_ids = chunks.try_column(col::ID)?;
    let mut seen = HashSet::with_capacity(chunk_ids.len());
    for id in chunk_ids {
        if !seen.insert(id) {
            return Err(Error::DuplicateChunkId(id.clone()));
        }
    }

    let atom_ids: HashSet<&crate::Value> = atoms.try_column(col::ID)?.iter().collect();
    let m_chunk = memberships.try_column(col::CHUNK)?;
    let m_atom = memberships.try_column(col::ATOM)?;
    for c in m_chunk {
        if !seen.contains(c) {
            return Err(Error::DanglingChunkReference(c.clone()));
        }
    }
    for a in m_atom {
        if !atom_ids.contains(a) {
            return Err(Error::DanglingAtomReference(a.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use crate::{Attr, Value};

    fn corpus() -> Corpus {
        let atoms = Table::from_columns([
            ("id", Column::from(vec![1i64, 2, 3, 4, 5])),
            ("text", Column::from(vec!["The", "quick", "brown", "fox", "jumps"])),
            ("ordinal", Column::from(vec![1i64, 2, 3, 4, 5])),
        ])
        .unwrap();
        Corpus::new(atoms).unwrap()
    }

    fn lines(corpus: &Corpus) -> ChunkSet {
        let chunks = Table::from_columns([
            ("id", Column::from(vec![10i64, 20])),
            ("ordinal", Column::from(vec![1i64, 2])),
        ])
        .unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(vec![10i64, 10, 10, 20, 20])),
            ("atom", Column::from(vec![1i64, 2, 3, 4, 5])),
        ])
        .unwrap();
        ChunkSet::new(corpus, chunks, memberships).unwrap()
    }

    struct WrongLength;

    impl AttrExpr for WrongLength {
        fn eval(&self, _chunks: &ChunkSet) -> Result<Column> {
            Ok(Column::from(vec![1i64]))
        }
    }

    #[test]
    fn construction_rejects_duplicate_chunk_ids() {
        let c = corpus();
        let chunks = Table::from_columns([("id", Column::from(vec![10i64, 10]))]).unwrap();
        let memberships = Table::from_columns([
            ("chunk", Column::from(Vec::<Value>::new())),
            ("atom", Column::from(Vec::<Value>::new())),
        ])
        .unwrap();
        let err = ChunkSet::new(&c, chunks, memberships).unwrap_err();
        assert!(matches!(err, Error::DuplicateChunkId(id) if id == Value::from(10i64)));
    }

    #[test]
    fn construction_rejects_dangling_references() {
        let c = corpus();
        let chunks = Table::from_columns([("id", Column::from(vec![10i64]))]).unwrap();

        let bad_atom = Table::from_columns([
            ("chunk", Column::from(vec![10i64])),
            ("atom", Column::from(vec![99i64])),
        ])
        .unwrap();
        assert!(matches!(
            ChunkSet::new(&c, chunks.clone(), bad_atom),
            Err(Error::DanglingAtomReference(id)) if id == Value::from(99i64)
        ));

        let bad_chunk = Table::from_columns([
            ("chunk", Column::from(vec![77i64])),
            ("atom", Column::from(vec![1i64])),
        ])
        .unwrap();
        assert!(matches!(
            ChunkSet::new(&c, chunks, bad_chunk),
            Err(Error::DanglingChunkReference(id)) if id == Value::from(77i64)
        ));
    }

    #[test]
    fn member_rows_follow_membership_order() {
        let c = corpus();
        let set = lines(&c);
        let members = set.member_rows().unwrap();
        assert_eq!(members, vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn member_rows_ordered_sorts_by_ordinal() {
        let c = corpus();
        let chunks = Table::from_columns([("id", Column::from(vec![10i64]))]).unwrap();
        // membership deliberately out of ordinal order
        let memberships = Table::from_columns([
            ("chunk", Column::from(vec![10i64, 10, 10])),
            ("atom", Column::from(vec![3i64, 1, 2])),
        ])
        .unwrap();
        let set = ChunkSet::new(&c, chunks, memberships).unwrap();
        assert_eq!(set.member_rows().unwrap(), vec![vec![2, 0, 1]]);
        assert_eq!(set.member_rows_ordered().unwrap(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn enrich_appends_and_preserves_shape() {
        let c = corpus();
        let set = lines(&c);
        let enriched = set.enrich(&[("o2", &Attr::new("ordinal"))]).unwrap();
        assert_eq!(enriched.len(), set.len());
        assert_eq!(enriched.memberships(), set.memberships());
        assert_eq!(
            enriched.chunks().column_names().collect::<Vec<_>>(),
            ["id", "ordinal", "o2"]
        );
    }

    #[test]
    fn enrich_evaluates_against_pre_enrich_state() {
        let c = corpus();
        let set = lines(&c);
        // "fresh" is attached by this same call, so reading it must fail:
        // expressions never see their siblings' output.
        let err = set
            .enrich(&[
                ("fresh", &Attr::new("ordinal")),
                ("copy", &Attr::new("fresh")),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute(n) if n == "fresh"));
    }

    #[test]
    fn enrich_same_name_last_wins() {
        let c = corpus();
        let set = lines(&c);
        let enriched = set
            .enrich(&[("x", &Attr::new("ordinal")), ("x", &Attr::new("id"))])
            .unwrap();
        assert_eq!(
            enriched.chunks().column_names().collect::<Vec<_>>(),
            ["id", "ordinal", "x"]
        );
        assert_eq!(enriched.chunks().value("x", 0), Some(&Value::from(10i64)));
    }

    #[test]
    fn enrich_rejects_wrong_length_columns() {
        let c = corpus();
        let set = lines(&c);
        let err = set.enrich(&[("bad", &WrongLength)]).unwrap_err();
        assert!(matches!(
            err,
            Error::AttributeLengthMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn filter_with_no_filters_is_identity() {
        let c = corpus();
        let set = lines(&c);
        assert_eq!(set.filter(&[]).unwrap(), set);
    }

    #[test]
    fn retain_rows_restricts_membership() {
        let c = corpus();
        let set = lines(&c);
        let kept = set.retain_rows(&[1]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.memberships().len(), 2);
        assert_eq!(
            kept.memberships().value("chunk", 0),
            Some(&Value::from(20i64))
        );
    }

    #[test]
    fn select_orders_positional_then_computed() {
        let c = corpus();
        let set = lines(&c);
        let out = set
            .select(&["ordinal"], &[("o", &Attr::new("ordinal"))])
            .unwrap();
        assert_eq!(out.column_names().collect::<Vec<_>>(), ["ordinal", "o"]);
        assert_eq!(out.len(), 2);
        assert!(matches!(
            set.select(&["nope"], &[]),
            Err(Error::UnknownAttribute(n)) if n == "nope"
        ));
    }

    #[test]
    fn same_corpus_is_identity_not_equality() {
        let c1 = corpus();
        let c2 = corpus();
        let s1 = lines(&c1);
        let s2 = lines(&c2);
        assert!(s1.same_corpus(&s1.clone()));
        assert!(!s1.same_corpus(&s2));
    }
}
