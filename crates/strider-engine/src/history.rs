//! Bounded sample history for tracked variables.

use std::collections::VecDeque;

/// Time-aligned samples of one value, oldest first.
///
/// With a capacity, pushing past it drops the oldest sample.
#[derive(Clone, Debug)]
pub struct History<T> {
    samples: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T: Clone> History<T> {
    /// An empty history keeping at most `capacity` samples.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
        }
    }

    /// Append a sample.
    pub fn push(&mut self, value: T) {
        if let Some(cap) = self.capacity {
            while self.samples.len() >= cap {
                self.samples.pop_front();
            }
        }
        self.samples.push_back(value);
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.samples.get(index)
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<&T> {
        self.samples.back()
    }

    /// All samples, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_keeps_everything() {
        let mut h = History::new(None);
        for i in 0..100 {
            h.push(i);
        }
        assert_eq!(h.len(), 100);
        assert_eq!(h.get(0), Some(&0));
    }

    #[test]
    fn bounded_drops_oldest() {
        let mut h = History::new(Some(3));
        for i in 0..5 {
            h.push(i);
        }
        assert_eq!(h.to_vec(), vec![2, 3, 4]);
        assert_eq!(h.last(), Some(&4));
    }
}
