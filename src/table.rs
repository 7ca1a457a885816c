//! Immutable columnar tables.
//!
//! A [`Table`] is an ordered set of named [`Column`]s with a uniform row
//! count. Tables are values: every operation returns a new table, and the
//! backing buffers are reference-counted, so "copying" a table is a handful
//! of pointer bumps no matter how many rows it holds.
//!
//! ```text
//! Table { rows: 3 }
//!   "id"      [ 101, 102, 103 ]   ─┐ shared Arc<[Value]> buffers;
//!   "text"    [ 'a', 'b', 'c' ]    ├ a filtered or projected table
//!   "ordinal" [ 1, 2, 3 ]         ─┘ reuses what it can
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// An immutable, reference-counted column of [`Value`]s.
///
/// Cloning a column is O(1); row subsets allocate a new buffer of cloned
/// values (cheap, since strings and lists are themselves shared).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    values: Arc<[Value]>,
}

impl Column {
    /// Number of values in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `row`, if in bounds.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// The full value slice.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterate over the values in row order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Kind of the first non-null value, or `"null"` for an empty or
    /// all-null column. This is what schema compatibility compares.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.values
            .iter()
            .find(|v| !v.is_null())
            .map_or("null", Value::kind)
    }

    /// A new column holding the values at `rows`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Column {
        rows.iter().map(|&r| self.values[r].clone()).collect()
    }
}

impl<'a> IntoIterator for &'a Column {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl From<Vec<Value>> for Column {
    fn from(values: Vec<Value>) -> Self {
        Column {
            values: Arc::from(values),
        }
    }
}

impl FromIterator<Value> for Column {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Column {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        values.into_iter().map(Value::from).collect()
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        values.into_iter().map(Value::from).collect()
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        values.into_iter().map(Value::from).collect()
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        values.into_iter().map(Value::from).collect()
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        values.into_iter().map(Value::from).collect()
    }
}

/// An immutable table: named columns, uniform row count.
///
/// Construction validates that all columns are the same length. Everything
/// downstream (projection, row subsets, concatenation) preserves that
/// invariant by construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<(String, Column)>,
    rows: usize,
}

impl Table {
    /// Build a table from `(name, column)` pairs.
    ///
    /// A name given twice keeps its first position with the later column's
    /// values, matching the overwrite-by-name policy used everywhere else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeLengthMismatch`] when column lengths
    /// disagree.
    pub fn from_columns<N, C>(columns: impl IntoIterator<Item = (N, C)>) -> Result<Table>
    where
        N: Into<String>,
        C: Into<Column>,
    {
        let mut table = Table::default();
        let mut first = true;
        for (name, column) in columns {
            let (name, column) = (name.into(), column.into());
            if first {
                table.rows = column.len();
                first = false;
            }
            table = table.with_column(name, column)?;
        }
        Ok(table)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// The column named `name`, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// The column named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] for an absent name.
    pub fn try_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Whether a column named `name` exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// The value at (`name`, `row`), if both exist.
    #[must_use]
    pub fn value(&self, name: &str, row: usize) -> Option<&Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// A new table with `column` attached under `name`.
    ///
    /// An existing column of that name is replaced in place; a new name is
    /// appended after the current columns. A column attached to a table
    /// with no columns yet sets the row count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeLengthMismatch`] when the column length
    /// differs from the row count.
    pub fn with_column(&self, name: impl Into<String>, column: impl Into<Column>) -> Result<Table> {
        let (name, column) = (name.into(), column.into());
        let rows = if self.columns.is_empty() {
            column.len()
        } else {
            self.rows
        };
        if column.len() != rows {
            return Err(Error::AttributeLengthMismatch {
                name,
                expected: rows,
                actual: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = column,
            None => columns.push((name, column)),
        }
        Ok(Table { columns, rows })
    }

    /// Project the table down to `names`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] for any absent name.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for &name in names {
            let column = self.try_column(name)?;
            columns.push((name.to_string(), column.clone()));
        }
        Ok(Table {
            columns,
            rows: self.rows,
        })
    }

    /// A new table holding the rows at `rows`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn take(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(n, c)| (n.clone(), c.take(rows)))
            .collect();
        Table {
            columns,
            rows: rows.len(),
        }
    }

    /// Concatenate tables row-wise.
    ///
    /// Schemas must be union-compatible: every input carries the same set of
    /// column names (order may differ; the first input's order wins) and no
    /// column mixes value kinds across inputs (all-null columns are
    /// compatible with anything).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleSchema`] naming the offending column on
    /// any violation.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Result<Table> {
        let tables: Vec<&Table> = tables.into_iter().collect();
        let Some(first) = tables.first() else {
            return Ok(Table::default());
        };

        for table in &tables[1..] {
            for name in first.column_names() {
                if !table.has_column(name) {
                    return Err(Error::IncompatibleSchema {
                        column: name.to_string(),
                        reason: "missing from one input".to_string(),
                    });
                }
            }
            for name in table.column_names() {
                if !first.has_column(name) {
                    return Err(Error::IncompatibleSchema {
                        column: name.to_string(),
                        reason: "missing from one input".to_string(),
                    });
                }
            }
        }

        let mut columns = Vec::with_capacity(first.columns.len());
        let mut rows = 0;
        for (name, _) in &first.columns {
            let mut kind = "null";
            let mut values = Vec::new();
            for table in &tables {
                // presence checked above
                let column = table.try_column(name)?;
                let k = column.kind();
                if kind == "null" {
                    kind = k;
                } else if k != "null" && k != kind {
                    return Err(Error::IncompatibleSchema {
                        column: name.clone(),
                        reason: format!("{kind} vs {k}"),
                    });
                }
                values.extend(column.iter().cloned());
            }
            rows = values.len();
            columns.push((name.clone(), Column::from(values)));
        }
        Ok(Table { columns, rows })
    }

    /// The distinct values of a column, in first-appearance order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] for an absent name.
    pub fn distinct(&self, name: &str) -> Result<Vec<Value>> {
        let column = self.try_column(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for value in column {
            if seen.insert(value.clone()) {
                out.push(value.clone());
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table {{ rows: {}, columns: [", self.rows)?;
        for (i, (name, column)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {}", column.kind())?;
        }
        write!(f, "] }}")
    }
}
