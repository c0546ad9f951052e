//! Labelled matrices and vectors.
//!
//! Every model matrix carries an ordered row index and column index of
//! [`Label`]s next to a dense `nalgebra` backing store. Reindexing keeps
//! entries at matching labels, zero-fills new labels, and refuses to drop a
//! nonzero entry whose label is missing from the target ("flow loss").

use std::collections::{HashMap, HashSet};

use nalgebra::{DMatrix, DVector};

use crate::error::{IdentifierKind, LcaioError, Result};
use crate::label::Label;

/// Ordered, duplicate-free sequence of labels with O(1) position lookup.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    labels: Vec<Label>,
    positions: HashMap<Label, usize>,
}

impl PartialEq for LabelIndex {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

fn duplicates(labels: &[Label]) -> Vec<Label> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for label in labels {
        if !seen.insert(label) && !dups.contains(label) {
            dups.push(label.clone());
        }
    }
    dups
}

impl LabelIndex {
    pub fn new(labels: Vec<Label>) -> Result<Self> {
        let dups = duplicates(&labels);
        if !dups.is_empty() {
            return Err(LcaioError::IdentifierCollision {
                context: "label index".to_string(),
                labels: dups,
            });
        }
        let positions = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Ok(Self { labels, positions })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    pub fn position(&self, label: &Label) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.positions.contains_key(label)
    }

    /// Labels of `self` followed by labels of `other` not already present.
    pub fn union(&self, other: &LabelIndex) -> LabelIndex {
        let mut labels = self.labels.clone();
        labels.extend(other.iter().filter(|l| !self.contains(l)).cloned());
        // Cannot collide: only labels absent from `self` were appended.
        let positions = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        LabelIndex { labels, positions }
    }

    /// Concatenate two indices that must not share any label.
    pub fn concat(&self, other: &LabelIndex) -> Result<LabelIndex> {
        let shared: Vec<Label> = other.iter().filter(|l| self.contains(l)).cloned().collect();
        if !shared.is_empty() {
            return Err(LcaioError::IdentifierCollision {
                context: "index concatenation".to_string(),
                labels: shared,
            });
        }
        let mut labels = self.labels.clone();
        labels.extend(other.labels.iter().cloned());
        LabelIndex::new(labels)
    }

    /// Labels shared with `other`, in `self`'s order.
    pub fn intersection(&self, other: &LabelIndex) -> Vec<Label> {
        self.iter().filter(|l| other.contains(l)).cloned().collect()
    }

    pub fn select(&self, positions: &[usize]) -> LabelIndex {
        let labels = positions.iter().map(|p| self.labels[*p].clone()).collect();
        // Positions come from a duplicate-free index and are themselves unique.
        LabelIndex::new(labels).unwrap_or_default()
    }

    pub fn sorted(&self) -> LabelIndex {
        let mut labels = self.labels.clone();
        labels.sort();
        LabelIndex::new(labels).unwrap_or_default()
    }

    /// Resolve `labels` to positions, failing on the first unknown label.
    pub fn positions_of(&self, labels: &[Label], kind: IdentifierKind) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|l| self.position(l).ok_or_else(|| LcaioError::unknown(kind, l)))
            .collect()
    }
}

impl From<LabelIndex> for Vec<Label> {
    fn from(index: LabelIndex) -> Self {
        index.labels
    }
}

fn is_nonzero(value: f64, tolerance: f64) -> bool {
    value.abs() > tolerance || value.is_nan()
}

/// Dense matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix {
    rows: LabelIndex,
    cols: LabelIndex,
    data: DMatrix<f64>,
}

impl LabeledMatrix {
    pub fn new(rows: LabelIndex, cols: LabelIndex, data: DMatrix<f64>) -> Result<Self> {
        if data.nrows() != rows.len() || data.ncols() != cols.len() {
            return Err(LcaioError::ShapeMismatch {
                what: "labelled matrix".to_string(),
                expected: (rows.len(), cols.len()),
                got: (data.nrows(), data.ncols()),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn from_labels(rows: Vec<Label>, cols: Vec<Label>, data: DMatrix<f64>) -> Result<Self> {
        Self::new(LabelIndex::new(rows)?, LabelIndex::new(cols)?, data)
    }

    pub fn zeros(rows: LabelIndex, cols: LabelIndex) -> Self {
        let data = DMatrix::zeros(rows.len(), cols.len());
        Self { rows, cols, data }
    }

    /// Build from sparse `(row, col, value)` triplets; repeated positions add up.
    pub fn from_triplets<I>(rows: LabelIndex, cols: LabelIndex, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut m = Self::zeros(rows, cols);
        for (i, j, v) in triplets {
            if i >= m.nrows() || j >= m.ncols() {
                return Err(LcaioError::ShapeMismatch {
                    what: format!("triplet ({}, {})", i, j),
                    expected: (m.nrows(), m.ncols()),
                    got: (i + 1, j + 1),
                });
            }
            m.data[(i, j)] += v;
        }
        Ok(m)
    }

    pub fn row_index(&self) -> &LabelIndex {
        &self.rows
    }

    pub fn col_index(&self) -> &LabelIndex {
        &self.cols
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn into_data(self) -> DMatrix<f64> {
        self.data
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn get(&self, row: &Label, col: &Label) -> Option<f64> {
        let i = self.rows.position(row)?;
        let j = self.cols.position(col)?;
        Some(self.data[(i, j)])
    }

    pub fn set(&mut self, row: &Label, col: &Label, value: f64) -> Result<()> {
        let i = self
            .rows
            .position(row)
            .ok_or_else(|| LcaioError::unknown(IdentifierKind::Label, row))?;
        let j = self
            .cols
            .position(col)
            .ok_or_else(|| LcaioError::unknown(IdentifierKind::Label, col))?;
        self.data[(i, j)] = value;
        Ok(())
    }

    pub fn column(&self, col: &Label) -> Option<DVector<f64>> {
        let j = self.cols.position(col)?;
        Some(self.data.column(j).into_owned())
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// Rows holding a nonzero entry whose label is absent from `target`.
    pub fn lost_rows(&self, target: &LabelIndex, tolerance: f64) -> Vec<Label> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, l)| !target.contains(l))
            .filter(|(i, _)| self.data.row(*i).iter().any(|v| is_nonzero(*v, tolerance)))
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Columns holding a nonzero entry whose label is absent from `target`.
    pub fn lost_cols(&self, target: &LabelIndex, tolerance: f64) -> Vec<Label> {
        self.cols
            .iter()
            .enumerate()
            .filter(|(_, l)| !target.contains(l))
            .filter(|(j, _)| self.data.column(*j).iter().any(|v| is_nonzero(*v, tolerance)))
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Reindex both axes at once. Fails with flow loss before building anything.
    pub fn reindex(&self, rows: &LabelIndex, cols: &LabelIndex, tolerance: f64) -> Result<Self> {
        let mut lost = self.lost_rows(rows, tolerance);
        lost.extend(self.lost_cols(cols, tolerance));
        if !lost.is_empty() {
            return Err(LcaioError::FlowLoss {
                matrix: "matrix".to_string(),
                labels: lost,
            });
        }
        let row_src: Vec<Option<usize>> = rows.iter().map(|l| self.rows.position(l)).collect();
        let col_src: Vec<Option<usize>> = cols.iter().map(|l| self.cols.position(l)).collect();
        let data = DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            match (row_src[i], col_src[j]) {
                (Some(si), Some(sj)) => self.data[(si, sj)],
                _ => 0.0,
            }
        });
        Ok(Self {
            rows: rows.clone(),
            cols: cols.clone(),
            data,
        })
    }

    pub fn reindex_rows(&self, rows: &LabelIndex, tolerance: f64) -> Result<Self> {
        self.reindex(rows, &self.cols, tolerance)
    }

    pub fn reindex_cols(&self, cols: &LabelIndex, tolerance: f64) -> Result<Self> {
        self.reindex(&self.rows, cols, tolerance)
    }

    /// Keep only the columns at `positions`, in that order.
    pub fn select_col_positions(&self, positions: &[usize]) -> Self {
        Self {
            rows: self.rows.clone(),
            cols: self.cols.select(positions),
            data: self.data.select_columns(positions.iter()),
        }
    }

    /// Keep only the rows at `positions`, in that order.
    pub fn select_row_positions(&self, positions: &[usize]) -> Self {
        Self {
            rows: self.rows.select(positions),
            cols: self.cols.clone(),
            data: self.data.select_rows(positions.iter()),
        }
    }

    /// Replace the column labels without touching values.
    pub fn relabel_cols(&self, cols: LabelIndex) -> Result<Self> {
        Self::new(self.rows.clone(), cols, self.data.clone())
    }

    /// Replace the row labels without touching values.
    pub fn relabel_rows(&self, rows: LabelIndex) -> Result<Self> {
        Self::new(rows, self.cols.clone(), self.data.clone())
    }

    /// Place `other`'s columns after this matrix's columns. Row indices must match.
    pub fn hconcat(&self, other: &LabeledMatrix) -> Result<Self> {
        if self.rows != other.rows {
            return Err(LcaioError::ShapeMismatch {
                what: "column concatenation with different row index".to_string(),
                expected: (self.nrows(), other.ncols()),
                got: (other.nrows(), other.ncols()),
            });
        }
        let cols = self.cols.concat(&other.cols)?;
        let left = self.ncols();
        let data = DMatrix::from_fn(self.nrows(), cols.len(), |i, j| {
            if j < left {
                self.data[(i, j)]
            } else {
                other.data[(i, j - left)]
            }
        });
        Self::new(self.rows.clone(), cols, data)
    }

    /// Block-diagonal composition `diag(self, other)`; no cross terms.
    pub fn block_diag(&self, other: &LabeledMatrix) -> Result<Self> {
        let rows = self.rows.concat(&other.rows)?;
        let cols = self.cols.concat(&other.cols)?;
        let (r0, c0) = self.shape();
        let data = DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            if i < r0 && j < c0 {
                self.data[(i, j)]
            } else if i >= r0 && j >= c0 {
                other.data[(i - r0, j - c0)]
            } else {
                0.0
            }
        });
        Self::new(rows, cols, data)
    }

    /// Element-wise sum of two matrices over identical indices.
    pub fn add(&self, other: &LabeledMatrix) -> Result<Self> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(LcaioError::ShapeMismatch {
                what: "element-wise sum with different labels".to_string(),
                expected: self.shape(),
                got: other.shape(),
            });
        }
        Self::new(self.rows.clone(), self.cols.clone(), &self.data + &other.data)
    }

    /// Copy with rows and columns sorted by label.
    pub fn sorted(&self) -> Self {
        let rows = self.rows.sorted();
        let cols = self.cols.sorted();
        let row_src: Vec<usize> = rows.iter().filter_map(|l| self.rows.position(l)).collect();
        let col_src: Vec<usize> = cols.iter().filter_map(|l| self.cols.position(l)).collect();
        let data = DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            self.data[(row_src[i], col_src[j])]
        });
        Self { rows, cols, data }
    }

    /// Largest absolute difference to `other`, ignoring label order.
    ///
    /// `None` when the two matrices are not over the same label sets.
    pub fn max_abs_diff(&self, other: &LabeledMatrix) -> Option<f64> {
        let a = self.sorted();
        let b = other.sorted();
        if a.rows != b.rows || a.cols != b.cols {
            return None;
        }
        Some(
            (&a.data - &b.data)
                .iter()
                .fold(0.0_f64, |acc, v| acc.max(v.abs())),
        )
    }
}

/// Dense vector with labelled entries.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledVector {
    index: LabelIndex,
    data: DVector<f64>,
}

impl LabeledVector {
    pub fn new(index: LabelIndex, data: DVector<f64>) -> Result<Self> {
        if data.len() != index.len() {
            return Err(LcaioError::ShapeMismatch {
                what: "labelled vector".to_string(),
                expected: (index.len(), 1),
                got: (data.len(), 1),
            });
        }
        Ok(Self { index, data })
    }

    pub fn zeros(index: LabelIndex) -> Self {
        let data = DVector::zeros(index.len());
        Self { index, data }
    }

    pub fn index(&self) -> &LabelIndex {
        &self.index
    }

    pub fn data(&self) -> &DVector<f64> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, label: &Label) -> Option<f64> {
        self.index.position(label).map(|i| self.data[i])
    }

    pub fn set(&mut self, label: &Label, value: f64) -> Result<()> {
        let i = self
            .index
            .position(label)
            .ok_or_else(|| LcaioError::unknown(IdentifierKind::Label, label))?;
        self.data[i] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, f64)> + '_ {
        self.index.iter().zip(self.data.iter().copied())
    }

    pub fn to_pairs(&self) -> Vec<(Label, f64)> {
        self.iter().map(|(l, v)| (l.clone(), v)).collect()
    }

    pub fn reindex(&self, target: &LabelIndex, tolerance: f64) -> Result<Self> {
        let lost: Vec<Label> = self
            .iter()
            .filter(|(l, v)| !target.contains(l) && is_nonzero(*v, tolerance))
            .map(|(l, _)| l.clone())
            .collect();
        if !lost.is_empty() {
            return Err(LcaioError::FlowLoss {
                matrix: "vector".to_string(),
                labels: lost,
            });
        }
        let data = DVector::from_iterator(
            target.len(),
            target.iter().map(|l| self.get(l).unwrap_or(0.0)),
        );
        Ok(Self {
            index: target.clone(),
            data,
        })
    }

    pub fn select_positions(&self, positions: &[usize]) -> Self {
        Self {
            index: self.index.select(positions),
            data: DVector::from_iterator(positions.len(), positions.iter().map(|p| self.data[*p])),
        }
    }

    pub fn relabel(&self, index: LabelIndex) -> Result<Self> {
        Self::new(index, self.data.clone())
    }

    pub fn concat(&self, other: &LabeledVector) -> Result<Self> {
        let index = self.index.concat(&other.index)?;
        let data = DVector::from_iterator(
            index.len(),
            self.data.iter().chain(other.data.iter()).copied(),
        );
        Self::new(index, data)
    }

    pub fn sorted(&self) -> Self {
        let index = self.index.sorted();
        let data = DVector::from_iterator(
            index.len(),
            index.iter().map(|l| self.get(l).unwrap_or(0.0)),
        );
        Self { index, data }
    }

    /// Largest absolute difference to `other`, ignoring label order.
    pub fn max_abs_diff(&self, other: &LabeledVector) -> Option<f64> {
        let a = self.sorted();
        let b = other.sorted();
        if a.index != b.index {
            return None;
        }
        Some(
            (&a.data - &b.data)
                .iter()
                .fold(0.0_f64, |acc, v| acc.max(v.abs())),
        )
    }
}
