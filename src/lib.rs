//! # quarry
//!
//! Bottom-up retrieval over atomized documents.
//!
//! ## The Problem
//!
//! Retrieval pipelines usually treat chunking as slicing: cut the document
//! into spans, index the spans, and hope the cut points were right. Every new
//! granularity (pages, sentences, OCR lines, sliding windows) means
//! re-slicing the document, and the results can't be combined because each
//! scheme carries its own private copy of the text.
//!
//! quarry turns that upside down. A document is decomposed *once* into
//! indivisible **atoms** (words, OCR tokens, cells). A **chunk** is then
//! nothing but a row in a table plus a set of edges to the atoms it contains:
//!
//! ```text
//! Atom table (immutable)      Membership          Chunk table ("line")
//! id    text     ordinal      chunk   atom        id    ordinal  width
//! a1    The      1            L1      a1          L1    1        110
//! a2    quick    2            L1      a2          L2    2        200
//! a3    brown    3            L2      a3          ..
//! ..                          ..
//! ```
//!
//! Because every chunking scheme shares the same atoms, schemes compose:
//! sliding windows can be clipped to page boundaries, regex matches can be
//! scored by how much they overlap a heading line, and any chunk's text can
//! be re-materialized with whatever delimiters the consumer wants.
//!
//! ## The Model
//!
//! - [`Corpus`]: an immutable atom table plus a registry of named chunk sets.
//! - [`ChunkSet`]: a chunk table and its membership junction, tied to the
//!   corpus that produced it.
//! - Three single-operation traits wire everything together:
//!   - [`ChunkExpr`]: `Corpus → ChunkSet` (chunking strategies)
//!   - [`AttrExpr`]: `ChunkSet → Column` (derived attributes)
//!   - [`ChunkFilter`]: `ChunkSet → ChunkSet` (winnowing)
//!
//! A retrieval pipeline is chunk → enrich → filter → select, each step a
//! pure function over immutable values.
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry::{FixedWindow, Stringify, TopK, Value};
//!
//! # fn main() -> quarry::Result<()> {
//! // Atomize a document: word atoms plus "document" and "sentence" chunk sets.
//! let mut corpus = quarry::corpus_from_text(
//!     "The quick brown fox jumps over the lazy dog. \
//!      Pack my box with five dozen liquor jugs.",
//!     "doc-1",
//! )?;
//!
//! // Sliding windows of 6 atoms, overlapping by 2, clipped to the document.
//! let windows = corpus.derive(&FixedWindow::new("document", 6, -2))?;
//! corpus.set_chunk("window", &windows)?;
//!
//! // Materialize sentence text, keep the last sentence, project the result.
//! let picked = corpus
//!     .chunk("sentence")?
//!     .enrich(&[("text", &Stringify::default())])?
//!     .filter(&[&TopK::new("ordinal", 1)])?
//!     .select(&["ordinal", "text"], &[])?;
//!
//! assert_eq!(picked.len(), 1);
//! let text = picked.value("text", 0).and_then(Value::as_str).unwrap();
//! assert!(text.contains("liquor"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Where Chunks Come From
//!
//! | Source | What it produces | When to use |
//! |--------|------------------|-------------|
//! | [`FixedWindow`] | `ceil(m / stride)` windows per boundary chunk | uniform retrieval units, overlap control |
//! | [`PatternChunk`] | one chunk per regex match | targeted extraction, anchors |
//! | [`corpus_from_text`] | word atoms, `document` + `sentence` sets | plain prose |
//! | [`corpus_from_tesseract`] | OCR atoms, `page`/`block`/`paragraph`/`line` sets | scanned documents |
//!
//! Everything downstream ([`TopK`], [`Threshold`], [`EqualTo`] filters, the
//! [`Stringify`] family, [`AtomData`], [`RegexCount`], [`ChunkOverlap`]) is
//! granularity-agnostic: it only ever sees chunk tables and memberships.
//!
//! ## Cost Model
//!
//! | Operation | Cost | Notes |
//! |-----------|------|-------|
//! | `chunk` / registry lookup | O(1) | tables share buffers |
//! | `derive` (windowing) | O(m log m) | per boundary, m member atoms |
//! | `enrich` / `select` | O(chunks × atoms) | one hash join |
//! | `filter` | O(chunks + memberships) | membership restricted eagerly |
//! | `merge` | O(total rows) | id disjointness checked up front |
//!
//! Values are dynamically typed and reference-counted; cloning corpora,
//! chunk sets, or columns never copies text buffers.
//!
//! ## Feature Flags
//!
//! - `tfidf`: the `Tfidf` relevance scorer, a worked example of building
//!   retrieval scoring as a plain [`AttrExpr`].

mod attrs;
mod chunks;
mod corpus;
mod error;
mod filters;
mod fixed;
mod pattern;
mod stringify;
mod table;
mod tesseract;
mod text;
mod value;

#[cfg(feature = "tfidf")]
mod tfidf;

pub use attrs::{AtomData, Attr, ChunkOverlap, OverlapAgg, RegexCount};
pub use chunks::ChunkSet;
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use filters::{Cmp, EqualTo, Threshold, TopK};
pub use fixed::FixedWindow;
pub use pattern::PatternChunk;
pub use stringify::{DelimitedStringify, Stringify};
pub use table::{Column, Table};
pub use tesseract::{corpus_from_tesseract, records_from_tsv, TesseractRecord};
pub use text::corpus_from_text;
pub use value::Value;

#[cfg(feature = "tfidf")]
pub use tfidf::Tfidf;

/// Column-name conventions shared by every table in a corpus.
///
/// Adapters are free to attach any further columns; these are the ones the
/// engine itself reads.
pub mod col {
    /// Identifier column carried by atom tables and chunk tables.
    pub const ID: &str = "id";
    /// Membership column holding the chunk side of the junction.
    pub const CHUNK: &str = "chunk";
    /// Membership column holding the atom side of the junction.
    pub const ATOM: &str = "atom";
    /// The explicit ordering attribute that windowing and stringification
    /// sort member atoms by.
    pub const ORDINAL: &str = "ordinal";
    /// Atom text column read by the stringifiers.
    pub const TEXT: &str = "text";
}

/// A chunking strategy: evaluates against a corpus to produce a chunk set.
///
/// Implementations decide which atoms belong together; they never copy atom
/// data, only reference it through membership rows. The built-ins are
/// [`FixedWindow`] and [`PatternChunk`]; registry names cover the rest via
/// [`Corpus::chunk`].
pub trait ChunkExpr: Send + Sync {
    /// Produce a chunk set over `corpus`'s atoms.
    ///
    /// The result is ephemeral until registered with [`Corpus::set_chunk`].
    ///
    /// # Errors
    ///
    /// Returns an error when the corpus lacks something the strategy needs,
    /// such as a registry name or an atom column.
    fn chunk(&self, corpus: &Corpus) -> Result<ChunkSet>;
}

/// A derived attribute: evaluates against a chunk set to produce one value
/// per chunk.
///
/// Used by [`ChunkSet::enrich`] and [`ChunkSet::select`]. The returned
/// column must be exactly as long as the chunk table; `enrich` checks and
/// rejects anything else, so implementations can be written naively.
///
/// Custom expressions are ordinary types:
///
/// ```rust
/// use quarry::{AttrExpr, ChunkSet, Column, Value};
///
/// /// Member-atom count per chunk.
/// struct MemberCount;
///
/// impl AttrExpr for MemberCount {
///     fn eval(&self, chunks: &ChunkSet) -> quarry::Result<Column> {
///         Ok(chunks
///             .member_rows()?
///             .iter()
///             .map(|rows| Value::from(rows.len() as i64))
///             .collect())
///     }
/// }
/// ```
pub trait AttrExpr: Send + Sync {
    /// Compute one value per chunk of `chunks`, in chunk-table row order.
    ///
    /// # Errors
    ///
    /// Returns an error when the chunk set lacks an attribute the
    /// expression reads.
    fn eval(&self, chunks: &ChunkSet) -> Result<Column>;
}

/// A winnowing step: evaluates against a chunk set to produce a chunk set
/// with a subset of its chunks.
///
/// Filters must keep the membership table restricted to surviving chunks;
/// [`ChunkSet::retain_rows`] does both halves in one call and is what every
/// built-in uses.
pub trait ChunkFilter: Send + Sync {
    /// Apply this filter to `chunks`.
    ///
    /// # Errors
    ///
    /// Returns an error for a missing or unorderable ranking attribute.
    fn apply(&self, chunks: ChunkSet) -> Result<ChunkSet>;
}
