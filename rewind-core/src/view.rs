//! The value iterator handed to a reduce function
//!
//! A [`ValueView`] is one of two shapes:
//!
//! - **Borrowed**: a mutable borrow of the driver's live iterator. No
//!   allocation; the borrow checker keeps the view from outliving the
//!   iterator it advances.
//! - **Owned**: a [`SequenceCursor`] over a private copy of a replayed
//!   group, dropped with the view.
//!
//! Both shapes iterate forward once and report the group's total length
//! through [`ValueView::total`] without consuming anything.

use std::iter::FusedIterator;

use crate::cursor::SequenceCursor;

/// Values of one reduce group, live or replayed
pub enum ValueView<'a, I: Iterator> {
    /// Borrowed live iterator
    Borrowed(BorrowedValues<'a, I>),
    /// Replayed copy of a recorded group
    Owned(SequenceCursor<I::Item>),
}

/// Borrowed live iterator plus the length it reported when the view was made
#[derive(Debug)]
pub struct BorrowedValues<'a, I> {
    iter: &'a mut I,
    total: usize,
    exhausted: bool,
}

impl<'a, I: ExactSizeIterator> ValueView<'a, I> {
    /// View over the caller's live iterator
    pub fn borrowed(iter: &'a mut I) -> Self {
        let total = iter.len();
        ValueView::Borrowed(BorrowedValues {
            iter,
            total,
            exhausted: false,
        })
    }
}

impl<I: Iterator> ValueView<'_, I> {
    /// View owning `values`
    pub fn owned(values: Vec<I::Item>) -> Self {
        ValueView::Owned(SequenceCursor::new(values))
    }

    /// Number of values in the group
    pub fn total(&self) -> usize {
        match self {
            ValueView::Borrowed(b) => b.total,
            ValueView::Owned(cursor) => cursor.total(),
        }
    }

    /// Whether the values come from a replay log rather than live data
    pub fn is_replayed(&self) -> bool {
        matches!(self, ValueView::Owned(_))
    }
}

impl<I: Iterator> Iterator for ValueView<'_, I> {
    type Item = I::Item;

    #[inline]
    fn next(&mut self) -> Option<I::Item> {
        match self {
            ValueView::Borrowed(b) => {
                if b.exhausted {
                    return None;
                }
                let next = b.iter.next();
                b.exhausted = next.is_none();
                next
            }
            ValueView::Owned(cursor) => cursor.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ValueView::Borrowed(b) if b.exhausted => (0, Some(0)),
            ValueView::Borrowed(b) => b.iter.size_hint(),
            ValueView::Owned(cursor) => cursor.size_hint(),
        }
    }
}

impl<I: Iterator> FusedIterator for ValueView<'_, I> {}

impl<I: Iterator> std::fmt::Debug for ValueView<'_, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = if self.is_replayed() { "Owned" } else { "Borrowed" };
        f.debug_struct("ValueView")
            .field("shape", &shape)
            .field("total", &self.total())
            .finish()
    }
}
