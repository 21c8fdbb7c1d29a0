//! Sparse vectors and row matrices.
//!
//! A [`SparseVector`] is a logical `length`-wide vector backed by an ordered
//! index -> value map. A [`SparseMatrix`] stores its rows in one contiguous
//! entry arena (CSR layout: `offsets[r]..offsets[r + 1]` are row `r`'s entries),
//! so composing matrices never allocates per-row containers.
//!
//! Dense arrays are only produced on request (`to_dense`, `row_dense`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SparseError {
    #[error("row width {got} does not match matrix width {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("invalid matrix layout: {0}")]
    InvalidLayout(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    length: usize,
    entries: BTreeMap<usize, f32>,
}

impl SparseVector {
    /// All-zero vector of `length`; nothing is allocated per column.
    pub fn new(length: usize) -> Self {
        Self {
            length,
            entries: BTreeMap::new(),
        }
    }

    /// Sparse copy of a dense slice (zeros are not stored).
    pub fn from_dense(values: &[f32]) -> Self {
        let mut v = Self::new(values.len());
        for (i, &x) in values.iter().enumerate() {
            if x != 0.0 {
                v.entries.insert(i, x);
            }
        }
        v
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of stored entries (explicit zeros included).
    pub fn stored(&self) -> usize {
        self.entries.len()
    }

    /// Store `value` at `index`, even if it is zero.
    ///
    /// Panics if `index >= len()`.
    pub fn set(&mut self, index: usize, value: f32) {
        assert!(
            index < self.length,
            "index {index} out of range for sparse vector of length {}",
            self.length
        );
        self.entries.insert(index, value);
    }

    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> f32 {
        assert!(
            index < self.length,
            "index {index} out of range for sparse vector of length {}",
            self.length
        );
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Stored `(index, value)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.entries.iter().map(|(&i, &v)| (i, v))
    }

    /// `self ‖ other`: `other`'s entries are shifted by `self.len()`.
    pub fn cat(&self, other: &SparseVector) -> SparseVector {
        let mut entries = self.entries.clone();
        entries.extend(other.iter().map(|(i, v)| (i + self.length, v)));
        SparseVector {
            length: self.length + other.length,
            entries,
        }
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = vec![0.0f32; self.length];
        for (i, v) in self.iter() {
            out[i] = v;
        }
        out
    }
}

/// Borrowed view of one matrix row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a> {
    cols: usize,
    indices: &'a [usize],
    values: &'a [f32],
}

impl<'a> SparseRow<'a> {
    pub fn len(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cols == 0
    }

    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> f32 {
        assert!(index < self.cols, "index {index} out of range for row of width {}", self.cols);
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = vec![0.0f32; self.cols];
        for (i, v) in self.iter() {
            out[i] = v;
        }
        out
    }

    pub fn to_vector(&self) -> SparseVector {
        SparseVector {
            length: self.cols,
            entries: self.iter().collect(),
        }
    }

    /// Indices and values of the non-zero entries.
    pub fn nonzero(&self) -> (Vec<usize>, Vec<f32>) {
        self.iter().filter(|&(_, v)| v != 0.0).unzip()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SparseMatrixDoc", into = "SparseMatrixDoc")]
pub struct SparseMatrix {
    cols: usize,
    offsets: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct SparseMatrixDoc {
    rows: usize,
    cols: usize,
    offsets: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl TryFrom<SparseMatrixDoc> for SparseMatrix {
    type Error = SparseError;

    fn try_from(d: SparseMatrixDoc) -> Result<Self, Self::Error> {
        if d.rows.checked_add(1) != Some(d.offsets.len()) || d.offsets[0] != 0 {
            return Err(SparseError::InvalidLayout("offsets must be rows + 1 long and start at 0"));
        }
        if d.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(SparseError::InvalidLayout("offsets must be non-decreasing"));
        }
        if d.indices.len() != d.values.len() || d.offsets[d.rows] != d.indices.len() {
            return Err(SparseError::InvalidLayout("entry count does not match offsets"));
        }
        if d.indices.iter().any(|&i| i >= d.cols) {
            return Err(SparseError::InvalidLayout("column index out of range"));
        }
        Ok(Self {
            cols: d.cols,
            offsets: d.offsets,
            indices: d.indices,
            values: d.values,
        })
    }
}

impl From<SparseMatrix> for SparseMatrixDoc {
    fn from(m: SparseMatrix) -> Self {
        Self {
            rows: m.rows(),
            cols: m.cols,
            offsets: m.offsets,
            indices: m.indices,
            values: m.values,
        }
    }
}

impl SparseMatrix {
    /// Matrix with no rows and `cols` columns.
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            offsets: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// One empty row, zero columns: the identity for [`row_product_cat`].
    pub fn unit() -> Self {
        Self {
            cols: 0,
            offsets: vec![0, 0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total stored entries across all rows.
    pub fn stored(&self) -> usize {
        self.indices.len()
    }

    pub fn push_row(&mut self, v: &SparseVector) -> Result<(), SparseError> {
        if v.len() != self.cols {
            return Err(SparseError::DimensionMismatch {
                expected: self.cols,
                got: v.len(),
            });
        }
        for (i, x) in v.iter() {
            self.indices.push(i);
            self.values.push(x);
        }
        self.offsets.push(self.indices.len());
        Ok(())
    }

    /// Panics if `r >= rows()`.
    pub fn row(&self, r: usize) -> SparseRow<'_> {
        let (start, end) = (self.offsets[r], self.offsets[r + 1]);
        SparseRow {
            cols: self.cols,
            indices: &self.indices[start..end],
            values: &self.values[start..end],
        }
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = SparseRow<'_>> {
        (0..self.rows()).map(move |r| self.row(r))
    }

    pub fn row_dense(&self, r: usize) -> Vec<f32> {
        self.row(r).to_dense()
    }

    pub fn to_dense(&self) -> Vec<Vec<f32>> {
        self.iter_rows().map(|r| r.to_dense()).collect()
    }

    pub fn row_nonzero(&self, r: usize) -> (Vec<usize>, Vec<f32>) {
        self.row(r).nonzero()
    }
}

/// Cartesian row composition.
///
/// For every row `i` of `m1` and row `j` of `m2` (in that nesting order) emits
/// `m1.row(i) ‖ m2.row(j)`. The result has `m1.rows() * m2.rows()` rows and
/// `m1.cols() + m2.cols()` columns. This is not a zip: composing two multi-row
/// matrices yields every pairwise combination.
pub fn row_product_cat(m1: &SparseMatrix, m2: &SparseMatrix) -> SparseMatrix {
    let rows = m1.rows() * m2.rows();
    let entries = m1.stored() * m2.rows() + m2.stored() * m1.rows();
    let mut out = SparseMatrix {
        cols: m1.cols + m2.cols,
        offsets: Vec::with_capacity(rows + 1),
        indices: Vec::with_capacity(entries),
        values: Vec::with_capacity(entries),
    };
    out.offsets.push(0);

    for a in m1.iter_rows() {
        for b in m2.iter_rows() {
            out.indices.extend_from_slice(a.indices);
            out.values.extend_from_slice(a.values);
            out.indices.extend(b.indices.iter().map(|&i| i + m1.cols));
            out.values.extend_from_slice(b.values);
            out.offsets.push(out.indices.len());
        }
    }
    out
}
