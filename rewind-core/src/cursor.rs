//! Single-pass cursor over an owned sequence

use std::iter::FusedIterator;

/// Forward-only cursor that owns the values it yields.
///
/// Used for replayed reduce groups: the cursor owns a copy of the recorded
/// sequence and hands values out by move. Once exhausted it stays exhausted.
#[derive(Debug, Clone)]
pub struct SequenceCursor<V> {
    values: std::vec::IntoIter<V>,
    total: usize,
}

impl<V> SequenceCursor<V> {
    /// Take ownership of `values`, positioned before the first one
    pub fn new(values: Vec<V>) -> Self {
        Self {
            total: values.len(),
            values: values.into_iter(),
        }
    }

    /// Length of the whole sequence, regardless of position
    pub fn total(&self) -> usize {
        self.total
    }

    /// Values not yet yielded
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl<V> From<Vec<V>> for SequenceCursor<V> {
    fn from(values: Vec<V>) -> Self {
        Self::new(values)
    }
}

impl<V> Iterator for SequenceCursor<V> {
    type Item = V;

    #[inline]
    fn next(&mut self) -> Option<V> {
        self.values.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<V> ExactSizeIterator for SequenceCursor<V> {}

impl<V> FusedIterator for SequenceCursor<V> {}
