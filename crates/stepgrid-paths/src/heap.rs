//! An indexed binary min-heap with removal.
//!
//! [`IndexedHeap`] orders items by an explicit `f64` priority and breaks ties
//! by insertion order (first in, first out). Every item maps to a dense slot
//! via [`HeapKey`], which lets the heap track where each item currently sits
//! and support [`remove`](IndexedHeap::remove) in `O(log n)`. Re-prioritising
//! an item is a `remove` followed by a `push`.

use std::cmp::Ordering;

/// Maps a heap item to a dense index (e.g. a flat grid-cell index).
///
/// Two items with the same index are the same item as far as the heap is
/// concerned: at most one of them can be queued at a time.
pub trait HeapKey {
    fn heap_index(&self) -> usize;
}

impl HeapKey for usize {
    #[inline]
    fn heap_index(&self) -> usize {
        *self
    }
}

const ABSENT: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    priority: f64,
    seq: u64,
}

impl<T> Slot<T> {
    #[inline]
    fn before(&self, other: &Self) -> bool {
        match self.priority.total_cmp(&other.priority) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.seq < other.seq,
        }
    }
}

/// Min-priority queue keyed by [`HeapKey`], FIFO among equal priorities.
#[derive(Debug, Clone)]
pub struct IndexedHeap<T> {
    slots: Vec<Slot<T>>,
    /// `positions[item.heap_index()]` is the item's slot, or `ABSENT`.
    positions: Vec<usize>,
    next_seq: u64,
}

impl<T> Default for IndexedHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexedHeap<T> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            positions: Vec::new(),
            next_seq: 0,
        }
    }

    /// Create an empty heap for items whose indices are below `index_bound`.
    pub fn with_index_bound(index_bound: usize) -> Self {
        Self {
            slots: Vec::new(),
            positions: vec![ABSENT; index_bound],
            next_seq: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The queued items in heap order (not priority order).
    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.slots.iter().map(|s| (&s.item, s.priority))
    }
}

impl<T: HeapKey> IndexedHeap<T> {
    /// Remove every item. Keeps allocated storage.
    pub fn clear(&mut self) {
        for s in &self.slots {
            self.positions[s.item.heap_index()] = ABSENT;
        }
        self.slots.clear();
        self.next_seq = 0;
    }

    #[inline]
    fn position(&self, item: &T) -> Option<usize> {
        match self.positions.get(item.heap_index()) {
            Some(&pos) if pos != ABSENT => Some(pos),
            _ => None,
        }
    }

    /// Whether an item with the same index is queued.
    #[inline]
    pub fn contains(&self, item: &T) -> bool {
        self.position(item).is_some()
    }

    /// Priority of the queued item with the same index.
    pub fn priority(&self, item: &T) -> Option<f64> {
        self.position(item).map(|pos| self.slots[pos].priority)
    }

    /// Queue `item` with `priority`.
    ///
    /// Returns `false` and leaves the heap unchanged if an item with the same
    /// index is already queued; use [`remove`](Self::remove) first to change
    /// its priority.
    pub fn push(&mut self, item: T, priority: f64) -> bool {
        let key = item.heap_index();
        if self.position(&item).is_some() {
            return false;
        }
        if key >= self.positions.len() {
            self.positions.resize(key + 1, ABSENT);
        }
        let pos = self.slots.len();
        self.slots.push(Slot {
            item,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.positions[key] = pos;
        self.sift_up(pos);
        true
    }

    /// The minimum item and its priority.
    pub fn peek(&self) -> Option<(&T, f64)> {
        self.slots.first().map(|s| (&s.item, s.priority))
    }

    /// Remove and return the minimum item and its priority.
    pub fn pop(&mut self) -> Option<(T, f64)> {
        self.take(0)
    }

    /// Remove the queued item with the same index as `item`, returning its
    /// priority.
    pub fn remove(&mut self, item: &T) -> Option<f64> {
        let pos = self.position(item)?;
        self.take(pos).map(|(_, priority)| priority)
    }

    fn take(&mut self, pos: usize) -> Option<(T, f64)> {
        let last = self.slots.len().checked_sub(1)?;
        self.swap(pos, last);
        let slot = self.slots.pop()?;
        self.positions[slot.item.heap_index()] = ABSENT;
        if pos < self.slots.len() {
            self.sift_up(pos);
            self.sift_down(pos);
        }
        Some((slot.item, slot.priority))
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        self.positions[self.slots[a].item.heap_index()] = a;
        self.positions[self.slots[b].item.heap_index()] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.slots[pos].before(&self.slots[parent]) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.slots.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.slots[right].before(&self.slots[left]) {
                right
            } else {
                left
            };
            if !self.slots[child].before(&self.slots[pos]) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(h: &mut IndexedHeap<usize>) -> Vec<usize> {
        std::iter::from_fn(|| h.pop().map(|(i, _)| i)).collect()
    }

    #[test]
    fn pops_in_priority_order() {
        let mut h = IndexedHeap::new();
        for (i, p) in [(0, 5.0), (1, 1.0), (2, 3.0), (3, 4.0), (4, 2.0)] {
            assert!(h.push(i, p));
        }
        assert_eq!(h.peek(), Some((&1, 1.0)));
        assert_eq!(drain(&mut h), vec![1, 4, 2, 3, 0]);
        assert!(h.is_empty());
    }

    #[test]
    fn equal_priorities_pop_fifo() {
        let mut h = IndexedHeap::with_index_bound(16);
        for i in [7, 3, 9, 1, 12, 5] {
            h.push(i, 2.0);
        }
        h.push(0, 1.0);
        assert_eq!(drain(&mut h), vec![0, 7, 3, 9, 1, 12, 5]);
    }

    #[test]
    fn duplicate_push_is_rejected() {
        let mut h = IndexedHeap::new();
        assert!(h.push(3usize, 4.0));
        assert!(!h.push(3usize, 1.0));
        assert_eq!(h.len(), 1);
        assert_eq!(h.priority(&3), Some(4.0));
    }

    #[test]
    fn remove_keeps_heap_valid() {
        let mut h = IndexedHeap::new();
        for i in 0..10usize {
            h.push(i, (10 - i) as f64);
        }
        assert_eq!(h.remove(&4), Some(6.0));
        assert_eq!(h.remove(&9), Some(1.0));
        assert_eq!(h.remove(&9), None);
        assert!(!h.contains(&4));
        assert_eq!(drain(&mut h), vec![8, 7, 6, 5, 3, 2, 1, 0]);
    }

    #[test]
    fn remove_then_push_reprioritises() {
        let mut h = IndexedHeap::new();
        h.push(0usize, 3.0);
        h.push(1usize, 2.0);
        h.push(2usize, 5.0);
        h.remove(&2);
        h.push(2, 1.0);
        assert_eq!(drain(&mut h), vec![2, 1, 0]);
    }

    #[test]
    fn reinserted_item_queues_behind_equal_keys() {
        let mut h = IndexedHeap::new();
        h.push(0usize, 1.0);
        h.push(1usize, 1.0);
        h.remove(&0);
        h.push(0, 1.0);
        assert_eq!(drain(&mut h), vec![1, 0]);
    }

    #[test]
    fn clear_forgets_positions() {
        let mut h = IndexedHeap::with_index_bound(4);
        h.push(1usize, 1.0);
        h.push(2usize, 2.0);
        h.clear();
        assert!(h.is_empty());
        assert!(!h.contains(&1));
        assert!(h.push(1, 0.5));
        assert_eq!(h.pop(), Some((1, 0.5)));
    }
}
