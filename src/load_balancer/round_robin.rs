//! Round-robin load balancing strategy that skips dead backends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Round-robin selector.
/// Stores a shared counter to rotate through backends.
///
/// The counter may wrap; only its remainder modulo the pool size matters.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the rotation at an arbitrary counter value.
    pub fn starting_at(cursor: u64) -> Self {
        Self {
            cursor: AtomicU64::new(cursor),
        }
    }

    /// Bump the counter and return the slot it pointed at.
    pub fn next_index(&self, len: usize) -> usize {
        let len = len.max(1) as u64;
        (self.cursor.fetch_add(1, Ordering::Relaxed) % len) as usize
    }

    /// Return the first alive backend at or after the next rotation slot.
    ///
    /// Scans at most `backends.len()` slots. When dead backends were skipped,
    /// the cursor is moved just past the chosen one. Concurrent callers may
    /// overwrite each other's store; that only costs fairness.
    pub fn next_alive(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let len = backends.len();
        let start = self.next_index(len);

        for offset in 0..len {
            let index = (start + offset) % len;
            let backend = &backends[index];
            if backend.is_alive() {
                if offset != 0 {
                    self.cursor.store(index as u64 + 1, Ordering::Relaxed);
                }
                return Some(backend.clone());
            }
        }
        None
    }
}
