//! Corpora: the immutable atom table and the named chunk-set registry.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::chunks::{validate_parts, ChunkSet};
use crate::col;
use crate::error::{Error, Result};
use crate::table::Table;
use crate::value::Value;
use crate::ChunkExpr;

/// Chunk tables persisted under a registry name. The corpus reference is
/// implicit: registered parts always belong to the owning corpus.
#[derive(Clone)]
struct Registered {
    chunks: Table,
    memberships: Table,
}

/// A corpus: one immutable atom table plus named chunk sets over it.
///
/// The atom table is fixed at construction and never changes; re-atomizing
/// means building a new corpus. The registry is the only mutable part, and
/// it only ever gains or replaces *whole* chunk sets via
/// [`set_chunk`](Corpus::set_chunk).
///
/// A corpus has identity: chunk sets remember which corpus produced them,
/// and registering a chunk set into a different corpus fails with
/// [`Error::ForeignCorpusReference`] even if the two corpora hold equal
/// atoms. For that reason `Corpus` is deliberately not `Clone`; merge or
/// rebuild instead.
pub struct Corpus {
    atoms: Arc<Table>,
    registry: BTreeMap<String, Registered>,
}

impl Corpus {
    /// Build a corpus over `atoms`.
    ///
    /// The table must carry an `id` column with a unique id per atom.
    /// Everything else about the atom schema is the adapter's business:
    /// text, ordinals, bounding boxes, whatever the source material has.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] when the `id` column is missing,
    /// [`Error::DuplicateAtomId`] when two atoms share an id.
    pub fn new(atoms: Table) -> Result<Corpus> {
        let ids = atoms.try_column(col::ID)?;
        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                return Err(Error::DuplicateAtomId(id.clone()));
            }
        }
        log::debug!("corpus: {} atom(s)", atoms.len());
        Ok(Corpus {
            atoms: Arc::new(atoms),
            registry: BTreeMap::new(),
        })
    }

    /// The atom table.
    #[must_use]
    pub fn atoms(&self) -> &Table {
        &self.atoms
    }

    pub(crate) fn atom_store(&self) -> &Arc<Table> {
        &self.atoms
    }

    /// Registered chunk-set names, in sorted order.
    pub fn chunk_names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    /// Whether a chunk set named `name` is registered.
    #[must_use]
    pub fn has_chunk(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    /// The registered chunk set named `name`.
    ///
    /// Cheap: the returned set shares the registered buffers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownChunkName`] for an unregistered name.
    pub fn chunk(&self, name: &str) -> Result<ChunkSet> {
        let stored = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownChunkName(name.to_string()))?;
        Ok(ChunkSet::assemble(
            Arc::clone(&self.atoms),
            stored.chunks.clone(),
            stored.memberships.clone(),
        ))
    }

    /// Evaluate a chunk expression against this corpus.
    ///
    /// The result is ephemeral: nothing is registered until
    /// [`set_chunk`](Corpus::set_chunk) is called with it.
    ///
    /// # Errors
    ///
    /// Forwards any error from the expression.
    pub fn derive(&self, expr: &dyn ChunkExpr) -> Result<ChunkSet> {
        expr.chunk(self)
    }

    /// Register `chunks` under `name`, replacing any previous registration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ForeignCorpusReference`] when the chunk set was
    /// built against a different corpus, even one over equal atoms.
    pub fn set_chunk(&mut self, name: impl Into<String>, chunks: &ChunkSet) -> Result<()> {
        if !Arc::ptr_eq(&self.atoms, chunks.atom_store()) {
            return Err(Error::ForeignCorpusReference);
        }
        let name = name.into();
        log::debug!("set_chunk '{}': {} chunk(s)", name, chunks.len());
        self.registry.insert(
            name,
            Registered {
                chunks: chunks.chunks().clone(),
                memberships: chunks.memberships().clone(),
            },
        );
        Ok(())
    }

    /// Combine corpora into one new corpus.
    ///
    /// 1. The atom tables are concatenated; ids must stay disjoint across
    ///    inputs.
    /// 2. The registry covers the union of the input names. Each name's
    ///    chunk and membership tables are concatenated across exactly the
    ///    inputs that define it.
    /// 3. The inputs are left untouched; merging zero corpora yields an
    ///    empty corpus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateAtomId`] or [`Error::DuplicateChunkId`] on
    /// id collisions, [`Error::IncompatibleSchema`] when tables that must
    /// concatenate carry different columns.
    pub fn merge<'a>(corpora: impl IntoIterator<Item = &'a Corpus>) -> Result<Corpus> {
        let corpora: Vec<&Corpus> = corpora.into_iter().collect();

        let mut seen: HashSet<&Value> = HashSet::new();
        for corpus in &corpora {
            for id in corpus.atoms.try_column(col::ID)? {
                if !seen.insert(id) {
                    return Err(Error::DuplicateAtomId(id.clone()));
                }
            }
        }

        let atoms = if corpora.is_empty() {
            Table::from_columns([(col::ID, Vec::<Value>::new())])?
        } else {
            Table::concat(corpora.iter().map(|c| c.atoms.as_ref()))?
        };

        let names: BTreeSet<&str> = corpora
            .iter()
            .flat_map(|c| c.registry.keys().map(String::as_str))
            .collect();

        let mut registry = BTreeMap::new();
        for name in names {
            let parts: Vec<&Registered> = corpora
                .iter()
                .filter_map(|c| c.registry.get(name))
                .collect();
            let chunks = Table::concat(parts.iter().map(|r| &r.chunks))?;
            let memberships = Table::concat(parts.iter().map(|r| &r.memberships))?;
            validate_parts(&atoms, &chunks, &memberships)?;
            registry.insert(name.to_string(), Registered { chunks, memberships });
        }

        log::debug!(
            "merge: {} corpora -> {} atom(s), {} chunk set(s)",
            corpora.len(),
            atoms.len(),
            registry.len()
        );
        Ok(Corpus {
            atoms: Arc::new(atoms),
            registry,
        })
    }
}

impl fmt::Debug for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Corpus {{ atoms: {}, chunk_sets: [", self.atoms.len())?;
        for (i, name) in self.registry.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "'{name}'")?;
        }
        write!(f, "] }}")
    }
}
