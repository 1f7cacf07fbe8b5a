//! Test fixtures pairing generated objects with weak handles to them.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Generates `count` elements up front and returns a [`Sequence`] that
/// owns them together with weak handles to each, in order.
///
/// The elements stay alive as long as the sequence (or whoever it handed
/// them to) holds them; [`Sequence::dismiss_next`] lets a test drop them one
/// at a time.
///
/// ```
/// use gc_testing::fixtures::generate_sequence_and_weak_references;
/// use gc_testing::Reclaimer;
///
/// let (mut sequence, references) = generate_sequence_and_weak_references(3, |i| i * 10);
/// let reclaimer = Reclaimer::default();
/// for reference in &references {
///     reclaimer.assert_target_only_reclaimable_after(reference, || sequence.dismiss_next());
/// }
/// ```
pub fn generate_sequence_and_weak_references<T>(
    count: usize,
    mut generator: impl FnMut(usize) -> T,
) -> (Sequence<T>, Vec<Weak<T>>) {
    let elements: VecDeque<Arc<T>> = (0..count).map(|index| Arc::new(generator(index))).collect();
    let references = elements.iter().map(Arc::downgrade).collect();
    (Sequence { elements }, references)
}

/// Iterator over pre-generated elements.
///
/// Yields each element as a strong `Arc`; elements not yet reached are kept
/// alive by the sequence itself.
#[derive(Debug)]
pub struct Sequence<T> {
    elements: VecDeque<Arc<T>>,
}

impl<T> Sequence<T> {
    /// Advances past the next element without handing it out, dropping the
    /// sequence's strong reference to it.
    ///
    /// Does nothing once the sequence is exhausted.
    pub fn dismiss_next(&mut self) {
        self.elements.pop_front();
    }

    /// Number of elements not yet yielded or dismissed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.elements.len()
    }
}

impl<T> Iterator for Sequence<T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Arc<T>> {
        self.elements.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.elements.len(), Some(self.elements.len()))
    }
}

impl<T> ExactSizeIterator for Sequence<T> {}
