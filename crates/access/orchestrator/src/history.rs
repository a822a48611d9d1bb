//! Bounded per-user attempt history.

use access_types::UnlockAttempt;
use std::collections::VecDeque;

/// Ring buffer of a single user's attempts, oldest first.
#[derive(Debug, Clone)]
pub struct AttemptHistory {
    attempts: VecDeque<UnlockAttempt>,
    capacity: usize,
}

impl AttemptHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            attempts: VecDeque::with_capacity(capacity.min(128)),
            capacity,
        }
    }

    /// Append, dropping the oldest attempt once full.
    pub fn push(&mut self, attempt: UnlockAttempt) {
        if self.capacity == 0 {
            return;
        }
        while self.attempts.len() >= self.capacity {
            self.attempts.pop_front();
        }
        self.attempts.push_back(attempt);
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnlockAttempt> {
        self.attempts.iter()
    }

    pub fn to_vec(&self) -> Vec<UnlockAttempt> {
        self.attempts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
