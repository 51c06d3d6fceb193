use std::collections::VecDeque;

/// Bounded FIFO of the most recent per-frame decisions.
///
/// Never holds more than `capacity` entries; the oldest is evicted first.
/// A running count of `true` entries keeps [`ContactHistory::ratio`] O(1).
#[derive(Debug, Clone)]
pub struct ContactHistory {
    decisions: VecDeque<bool>,
    capacity: usize,
    positives: usize,
}

impl ContactHistory {
    /// `capacity` must be non-zero; [`crate::EngineConfig::validate`] enforces this
    /// for engine-owned histories. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            decisions: VecDeque::with_capacity(capacity),
            capacity,
            positives: 0,
        }
    }

    pub fn push(&mut self, decision: bool) {
        if self.decisions.len() == self.capacity {
            if let Some(true) = self.decisions.pop_front() {
                self.positives -= 1;
            }
        }
        self.decisions.push_back(decision);
        if decision {
            self.positives += 1;
        }
    }

    /// Fraction of `true` decisions in the window; 0 when empty.
    pub fn ratio(&self) -> f32 {
        if self.decisions.is_empty() {
            return 0.0;
        }
        self.positives as f32 / self.decisions.len() as f32
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn positives(&self) -> usize {
        self.positives
    }

    /// Decisions oldest first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.decisions.iter().copied()
    }

    pub fn clear(&mut self) {
        self.decisions.clear();
        self.positives = 0;
    }
}
