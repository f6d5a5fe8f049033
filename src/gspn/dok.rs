//! Dictionary-of-keys sparse integer matrix.
//!
//! The incidence matrices of an expanded net are sparse and grow while the
//! expansion inserts synthetic places and transitions. A `BTreeMap` keyed by
//! `(row, column)` keeps entry iteration in row-major order, which makes every
//! pass over a matrix deterministic.

use std::collections::BTreeMap;
use std::ops::Bound;

/// Sparse matrix over `i64` in dictionary-of-keys representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DokMatrix {
    rows: usize,
    cols: usize,
    entries: BTreeMap<(usize, usize), i64>,
}

impl DokMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: BTreeMap::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Grow the matrix to at least the given dimensions.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = self.rows.max(rows);
        self.cols = self.cols.max(cols);
    }

    /// Set an entry; storing zero removes the entry.
    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        debug_assert!(row < self.rows && col < self.cols);
        if value == 0 {
            self.entries.remove(&(row, col));
        } else {
            self.entries.insert((row, col), value);
        }
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.entries.get(&(row, col)).copied().unwrap_or(0)
    }

    /// All non-zero entries as `(row, col, value)`, in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        self.entries.iter().map(|(&(r, c), &v)| (r, c, v))
    }

    /// Non-zero entries of one row as `(col, value)`, in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.entries
            .range((Bound::Included((row, 0)), Bound::Excluded((row + 1, 0))))
            .map(|(&(_, c), &v)| (c, v))
    }

    /// Non-zero entries of one column as `(row, value)`, in row order.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.entries
            .iter()
            .filter(move |&(&(_, c), _)| c == col)
            .map(|(&(r, _), &v)| (r, v))
    }

    pub fn num_nonzero(&self) -> usize {
        self.entries.len()
    }

    /// Entry-wise difference `self - other`; dimensions must match.
    pub fn sub(&self, other: &DokMatrix) -> DokMatrix {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);

        let mut result = self.clone();
        for (key, value) in &other.entries {
            let updated = result.entries.get(key).copied().unwrap_or(0) - value;
            if updated == 0 {
                result.entries.remove(key);
            } else {
                result.entries.insert(*key, updated);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_zero_removal() {
        let mut m = DokMatrix::new(3, 3);
        m.set(1, 2, 5);
        assert_eq!(m.get(1, 2), 5);
        assert_eq!(m.get(0, 0), 0);
        assert_eq!(m.num_nonzero(), 1);

        m.set(1, 2, 0);
        assert_eq!(m.get(1, 2), 0);
        assert_eq!(m.num_nonzero(), 0);
    }

    #[test]
    fn test_entries_row_major_order() {
        let mut m = DokMatrix::new(3, 3);
        m.set(2, 0, 1);
        m.set(0, 1, 2);
        m.set(0, 0, 3);
        m.set(1, 2, 4);

        let order: Vec<(usize, usize, i64)> = m.entries().collect();
        assert_eq!(order, vec![(0, 0, 3), (0, 1, 2), (1, 2, 4), (2, 0, 1)]);
    }

    #[test]
    fn test_row_and_column_views() {
        let mut m = DokMatrix::new(2, 3);
        m.set(0, 0, 1);
        m.set(0, 2, 2);
        m.set(1, 2, 3);

        let row0: Vec<(usize, i64)> = m.row(0).collect();
        assert_eq!(row0, vec![(0, 1), (2, 2)]);

        let col2: Vec<(usize, i64)> = m.column(2).collect();
        assert_eq!(col2, vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn test_resize_grows_only() {
        let mut m = DokMatrix::new(2, 2);
        m.resize(4, 3);
        assert_eq!((m.rows(), m.cols()), (4, 3));
        m.resize(1, 1);
        assert_eq!((m.rows(), m.cols()), (4, 3));
    }

    #[test]
    fn test_sub_cancels_entries() {
        let mut f = DokMatrix::new(2, 2);
        f.set(0, 0, 1);
        f.set(1, 1, 2);
        let mut b = DokMatrix::new(2, 2);
        b.set(0, 0, 1);
        b.set(1, 0, 3);

        let c = f.sub(&b);
        assert_eq!(c.get(0, 0), 0);
        assert_eq!(c.get(1, 1), 2);
        assert_eq!(c.get(1, 0), -3);
        assert_eq!(c.num_nonzero(), 2);
    }
}
