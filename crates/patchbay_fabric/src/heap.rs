//! Indexed binary min-heap used by every Dijkstra pass.
//!
//! Unlike `std::collections::BinaryHeap`, each id appears at most once and
//! its key can be decreased in place, so a search never holds more entries
//! than it has vertices.

/// An indexed min-heap from dense `usize` vertex ids to `u32` distances.
#[derive(Debug, Clone, Default)]
pub struct PriorityQueue {
    /// Heap-ordered vertex ids.
    heap: Vec<usize>,
    /// `position[id]` is the slot of `id` in `heap`, if queued.
    position: Vec<Option<usize>>,
    /// `key[id]` is the distance `id` was queued with.
    key: Vec<u32>,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue sized for ids below `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            position: vec![None; capacity],
            key: vec![0; capacity],
        }
    }

    /// Number of queued ids.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `id` is currently queued.
    pub fn contains(&self, id: usize) -> bool {
        self.position.get(id).is_some_and(Option::is_some)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        for &id in &self.heap {
            self.position[id] = None;
        }
        self.heap.clear();
    }

    /// Queues `id` at `distance`, or lowers its key if `distance` is strictly smaller.
    ///
    /// A larger or equal distance for an already queued id is ignored.
    pub fn insert_or_decrease(&mut self, id: usize, distance: u32) {
        if id >= self.position.len() {
            self.position.resize(id + 1, None);
            self.key.resize(id + 1, 0);
        }
        match self.position[id] {
            Some(slot) => {
                if distance < self.key[id] {
                    self.key[id] = distance;
                    self.sift_up(slot);
                }
            }
            None => {
                self.key[id] = distance;
                self.heap.push(id);
                let slot = self.heap.len() - 1;
                self.position[id] = Some(slot);
                self.sift_up(slot);
            }
        }
    }

    /// Removes and returns the id with the smallest distance.
    pub fn extract_min(&mut self) -> Option<usize> {
        let last = self.heap.len().checked_sub(1)?;
        self.swap(0, last);
        let min = self.heap.pop()?;
        self.position[min] = None;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position[self.heap[a]] = Some(a);
        self.position[self.heap[b]] = Some(b);
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.key[self.heap[slot]] >= self.key[self.heap[parent]] {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.key[self.heap[left]] < self.key[self.heap[smallest]] {
                smallest = left;
            }
            if right < len && self.key[self.heap[right]] < self.key[self.heap[smallest]] {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn empty_queue_extracts_none() {
        let mut q = PriorityQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.extract_min(), None);
    }

    #[test]
    fn extracts_in_distance_order() {
        let mut q = PriorityQueue::with_capacity(8);
        q.insert_or_decrease(3, 30);
        q.insert_or_decrease(1, 10);
        q.insert_or_decrease(5, 50);
        q.insert_or_decrease(2, 20);
        assert_eq!(q.len(), 4);
        assert_eq!(q.extract_min(), Some(1));
        assert_eq!(q.extract_min(), Some(2));
        assert_eq!(q.extract_min(), Some(3));
        assert_eq!(q.extract_min(), Some(5));
        assert_eq!(q.extract_min(), None);
    }

    #[test]
    fn decrease_moves_entry_forward() {
        let mut q = PriorityQueue::new();
        q.insert_or_decrease(0, 10);
        q.insert_or_decrease(1, 20);
        q.insert_or_decrease(1, 5);
        assert_eq!(q.len(), 2);
        assert_eq!(q.extract_min(), Some(1));
    }

    #[test]
    fn larger_key_is_ignored() {
        let mut q = PriorityQueue::new();
        q.insert_or_decrease(0, 10);
        q.insert_or_decrease(1, 20);
        q.insert_or_decrease(0, 30);
        assert_eq!(q.extract_min(), Some(0));
        assert_eq!(q.extract_min(), Some(1));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut q = PriorityQueue::with_capacity(2);
        q.insert_or_decrease(100, 1);
        assert!(q.contains(100));
        assert_eq!(q.extract_min(), Some(100));
        assert!(!q.contains(100));
    }

    #[test]
    fn clear_forgets_entries() {
        let mut q = PriorityQueue::new();
        q.insert_or_decrease(4, 1);
        q.insert_or_decrease(7, 2);
        q.clear();
        assert!(q.is_empty());
        assert!(!q.contains(4));
        q.insert_or_decrease(4, 9);
        assert_eq!(q.extract_min(), Some(4));
    }

    #[test]
    fn randomized_against_reference_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _round in 0..50 {
            let mut q = PriorityQueue::new();
            let mut model: HashMap<usize, u32> = HashMap::new();
            for _ in 0..200 {
                if rng.gen_bool(0.65) {
                    let id = rng.gen_range(0..40);
                    let dist = rng.gen_range(0..1000);
                    let before = model.values().min().copied();
                    q.insert_or_decrease(id, dist);
                    let entry = model.entry(id).or_insert(dist);
                    if dist < *entry {
                        *entry = dist;
                    }
                    let after = model.values().min().copied();
                    if let (Some(b), Some(a)) = (before, after) {
                        assert!(a <= b, "decrease raised the minimum");
                    }
                } else {
                    let expected = model.values().min().copied();
                    match q.extract_min() {
                        Some(id) => {
                            let dist = model.remove(&id).expect("extracted unknown id");
                            assert_eq!(Some(dist), expected);
                        }
                        None => assert!(expected.is_none()),
                    }
                }
                assert_eq!(q.len(), model.len());
            }
        }
    }
}
