//! Fixed-capacity ring buffer for history, alerts and logs.

use serde::{Serialize, Serializer};

/// Append-only buffer that evicts the oldest entry once full.
///
/// Storage is allocated once; after the buffer fills, pushes overwrite the
/// slot at `head` and advance it.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    head: usize,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        for value in values {
            self.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// The entry `index` places after the oldest.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.slots.len() {
            return None;
        }
        self.slots.get((self.head + index) % self.slots.len())
    }

    pub fn latest(&self) -> Option<&T> {
        self.iter().next_back()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_insertion_order_before_wrapping() {
        let mut ring = RingBuffer::new(4);
        ring.extend([1, 2, 3]);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ring.latest(), Some(&3));
    }

    #[test]
    fn evicts_oldest_first() {
        let mut ring = RingBuffer::new(3);
        ring.extend(1..=7);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(ring.iter().rev().copied().collect::<Vec<_>>(), vec![7, 6, 5]);
    }

    #[test]
    fn get_counts_from_the_oldest() {
        let mut ring = RingBuffer::new(3);
        ring.extend(1..=5);
        assert_eq!(ring.get(0), Some(&3));
        assert_eq!(ring.get(2), Some(&5));
        assert_eq!(ring.get(3), None);
    }

    #[test]
    fn clear_resets_head() {
        let mut ring = RingBuffer::new(2);
        ring.extend([1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        ring.push(9);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let mut ring = RingBuffer::new(0);
        ring.extend(["a", "b"]);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.latest(), Some(&"b"));
    }
}
