//! Chunk filters: keep the chunks worth keeping.
//!
//! Filters take a chunk set and return one with a subset of its chunks;
//! membership rows of dropped chunks go with them (everything here flows
//! through [`ChunkSet::retain_rows`]). Order matters for [`TopK`], which
//! looks at the whole set, while [`Threshold`] and [`EqualTo`] are
//! per-chunk and commute with each other.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::value::Value;
use crate::{ChunkFilter, ChunkSet};

/// Comparison operator for [`Threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// Keep values strictly below the reference.
    Lt,
    /// Keep values at or below the reference.
    Le,
    /// Keep values strictly above the reference.
    Gt,
    /// Keep values at or above the reference.
    Ge,
}

/// Keep the `k` highest-ranked chunks by an attribute.
///
/// The survivors stay in their *input* order: TopK ranks, it does not
/// sort. Ties are broken toward earlier rows, and `k` larger than the chunk
/// count keeps everything.
///
/// ## Example
///
/// ```rust
/// use quarry::TopK;
///
/// # fn main() -> quarry::Result<()> {
/// # let corpus = quarry::corpus_from_text("A b. C d. E f.", "doc")?;
/// let sentences = corpus.chunk("sentence")?;
/// let last_two = sentences.filter(&[&TopK::new("ordinal", 2)])?;
///
/// assert_eq!(last_two.len(), 2);
/// // input order preserved: sentence 2 before sentence 3
/// assert_eq!(last_two.chunks().value("ordinal", 0), Some(&quarry::Value::from(2i64)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TopK {
    attr: String,
    k: usize,
    lowest: bool,
}

impl TopK {
    /// Keep the `k` highest values of `attr`.
    #[must_use]
    pub fn new(attr: impl Into<String>, k: usize) -> Self {
        Self {
            attr: attr.into(),
            k,
            lowest: false,
        }
    }

    /// Keep the `k` lowest values of `attr`.
    #[must_use]
    pub fn lowest(attr: impl Into<String>, k: usize) -> Self {
        Self {
            attr: attr.into(),
            k,
            lowest: true,
        }
    }
}

impl ChunkFilter for TopK {
    fn apply(&self, chunks: ChunkSet) -> Result<ChunkSet> {
        let column = chunks.chunks().try_column(&self.attr)?;
        check_orderable(&self.attr, column.values())?;

        let mut order: Vec<usize> = (0..column.len()).collect();
        let values = column.values();
        if self.lowest {
            order.sort_by(|&a, &b| values[a].natural_cmp(&values[b]).unwrap_or(Ordering::Equal));
        } else {
            order.sort_by(|&a, &b| values[b].natural_cmp(&values[a]).unwrap_or(Ordering::Equal));
        }

        let k = self.k.min(order.len());
        let mut keep = order[..k].to_vec();
        keep.sort_unstable();
        Ok(chunks.retain_rows(&keep))
    }
}

/// Keep chunks whose attribute clears a reference value.
///
/// The comparison uses natural ordering, so an `Int` column can be
/// thresholded by a `Float` reference and vice versa. A null or
/// unorderable value anywhere in the column fails with
/// [`Error::IncomparableValue`] rather than silently dropping rows.
#[derive(Debug, Clone)]
pub struct Threshold {
    attr: String,
    cmp: Cmp,
    value: Value,
}

impl Threshold {
    /// Keep chunks where `attr` `cmp` `value` holds.
    #[must_use]
    pub fn new(attr: impl Into<String>, cmp: Cmp, value: impl Into<Value>) -> Self {
        Self {
            attr: attr.into(),
            cmp,
            value: value.into(),
        }
    }
}

impl ChunkFilter for Threshold {
    fn apply(&self, chunks: ChunkSet) -> Result<ChunkSet> {
        let column = chunks.chunks().try_column(&self.attr)?;
        let mut keep = Vec::new();
        for (row, value) in column.iter().enumerate() {
            let Some(ord) = value.natural_cmp(&self.value) else {
                return Err(Error::IncomparableValue {
                    name: self.attr.clone(),
                    left: value.kind(),
                    right: self.value.kind(),
                });
            };
            let pass = match self.cmp {
                Cmp::Lt => ord == Ordering::Less,
                Cmp::Le => ord != Ordering::Greater,
                Cmp::Gt => ord == Ordering::Greater,
                Cmp::Ge => ord != Ordering::Less,
            };
            if pass {
                keep.push(row);
            }
        }
        Ok(chunks.retain_rows(&keep))
    }
}

/// Keep chunks whose attribute equals any of the given values.
///
/// Uses total equality, which is kind-exact: an `Int` column is never equal
/// to a `Str` probe, and that is a miss, not an error.
#[derive(Debug, Clone)]
pub struct EqualTo {
    attr: String,
    values: Vec<Value>,
}

impl EqualTo {
    /// Keep chunks where `attr` is one of `values`.
    #[must_use]
    pub fn new<V: Into<Value>>(attr: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl ChunkFilter for EqualTo {
    fn apply(&self, chunks: ChunkSet) -> Result<ChunkSet> {
        let column = chunks.chunks().try_column(&self.attr)?;
        let wanted: HashSet<&Value> = self.values.iter().collect();
        let keep: Vec<usize> = column
            .iter()
            .enumerate()
            .filter(|(_, v)| wanted.contains(v))
            .map(|(row, _)| row)
            .collect();
        Ok(chunks.retain_rows(&keep))
    }
}

fn check_orderable(attr: &str, values: &[Value]) -> Result<()> {
    let Some(first) = values.first() else {
        return Ok(());
    };
    for value in values {
        if first.natural_cmp(value).is_none() {
            return Err(Error::IncomparableValue {
                name: attr.to_string(),
                left: first.kind(),
                right: value.kind(),
            });
        }
    }
    Ok(())
}
