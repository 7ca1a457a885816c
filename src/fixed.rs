//! Fixed-size windowing over member atoms.
//!
//! The workhorse chunk expression: walk each boundary chunk's atoms in
//! ordinal order, emitting a window of `size` atoms every `size + offset`
//! atoms. A negative offset overlaps adjacent windows; a positive one leaves
//! gaps.
//!
//! ## How It Works
//!
//! ```text
//! boundary chunk with 5 atoms, size = 4, offset = -2   (stride = 2)
//!
//! atoms:     a1  a2  a3  a4  a5
//! window 0: [a1  a2  a3  a4]           starts at 0
//! window 1:         [a3  a4  a5]       starts at 2, clipped
//! window 2:                 [a5]       starts at 4, clipped
//! ```
//!
//! Windows are emitted while their start lies inside the boundary chunk, so
//! each boundary chunk with `m` atoms yields exactly `ceil(m / stride)`
//! windows, the last ones clipped rather than padded.
//!
//! ## Why a Boundary?
//!
//! Windows never cross their boundary chunk. Windowing against `"page"`
//! stops at each page's last atom and restarts on the next page; windowing
//! against `"document"` runs straight through. Picking the boundary is how
//! overlap is kept from bleeding across structure that matters.

use crate::col;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::table::{Column, Table};
use crate::value::Value;
use crate::{ChunkExpr, ChunkSet};

/// Fixed-size sliding-window chunk expression.
///
/// ## Example
///
/// ```rust
/// use quarry::FixedWindow;
///
/// # fn main() -> quarry::Result<()> {
/// let corpus = quarry::corpus_from_text("one two three four five", "doc")?;
///
/// let windows = corpus.derive(&FixedWindow::new("document", 4, -2))?;
///
/// // stride 2 over 5 atoms: windows start at atoms 0, 2, 4
/// assert_eq!(windows.len(), 3);
/// assert_eq!(windows.memberships().len(), 4 + 3 + 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FixedWindow {
    boundary: String,
    size: usize,
    offset: i64,
}

impl FixedWindow {
    /// Create a window expression over the registered chunk set named
    /// `boundary`.
    ///
    /// `size` is the window length in atoms; `offset` shifts each window's
    /// start relative to the previous window's end (negative = overlap,
    /// positive = gap, zero = adjacent). The configuration is checked when
    /// the expression is evaluated: a zero size or a stride `size + offset`
    /// of zero or less fails with [`Error::InvalidWindowConfig`].
    #[must_use]
    pub fn new(boundary: impl Into<String>, size: usize, offset: i64) -> Self {
        Self {
            boundary: boundary.into(),
            size,
            offset,
        }
    }

    /// Windows with no overlap and no gap.
    #[must_use]
    pub fn adjacent(boundary: impl Into<String>, size: usize) -> Self {
        Self::new(boundary, size, 0)
    }
}

impl ChunkExpr for FixedWindow {
    fn chunk(&self, corpus: &Corpus) -> Result<ChunkSet> {
        let stride_signed = i64::try_from(self.size)
            .unwrap_or(i64::MAX)
            .saturating_add(self.offset);
        if self.size == 0 || stride_signed <= 0 {
            return Err(Error::InvalidWindowConfig {
                size: self.size,
                offset: self.offset,
            });
        }
        let stride = usize::try_from(stride_signed).unwrap_or(usize::MAX);

        let boundary = corpus.chunk(&self.boundary)?;
        let members = boundary.member_rows_ordered()?;
        let boundary_ids = boundary.chunks().try_column(col::ID)?;
        let atom_ids = corpus.atoms().try_column(col::ID)?;

        let mut window_ids: Vec<Value> = Vec::new();
        let mut m_chunk: Vec<Value> = Vec::new();
        let mut m_atom: Vec<Value> = Vec::new();

        for (b_row, rows) in members.iter().enumerate() {
            let boundary_id = &boundary_ids.values()[b_row];
            let mut start = 0;
            while start < rows.len() {
                let end = (start + self.size).min(rows.len());
                let id = Value::Int(window_id(boundary_id, start));
                for &atom_row in &rows[start..end] {
                    m_chunk.push(id.clone());
                    m_atom.push(atom_ids.values()[atom_row].clone());
                }
                window_ids.push(id);
                start += stride;
            }
        }

        let chunks = Table::from_columns([(col::ID, Column::from(window_ids))])?;
        let memberships = Table::from_columns([
            (col::CHUNK, Column::from(m_chunk)),
            (col::ATOM, Column::from(m_atom)),
        ])?;
        ChunkSet::new(corpus, chunks, memberships)
    }
}

/// Window ids derive from (boundary chunk id, window start) so windows built
/// over different documents never collide, even across merged corpora.
fn window_id(boundary: &Value, start: usize) -> i64 {
    crate::value::hash_id(&(boundary, start))
}
