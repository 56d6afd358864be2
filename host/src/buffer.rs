//! ==============================================================================
//! buffer.rs - bounded in-memory reading history
//! ==============================================================================
//!
//! purpose:
//!     keeps the most recent successful readings in insertion order.
//!     once full, every append evicts the oldest entry (fifo).
//!
//! locking:
//!     a single RwLock guards the deque. appends take the write half,
//!     snapshots the read half, so a snapshot never sees a half-applied
//!     append/evict pair. critical sections are a push and a pop, so a
//!     std lock is fine even from async handlers.
//!
//! ==============================================================================

use crate::domain::Reading;

use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 24 hours of history at a 5 minute sampling interval
pub const DEFAULT_CAPACITY: usize = 288;

pub struct ReadingBuffer {
    capacity: usize,
    readings: RwLock<VecDeque<Reading>>,
}

impl ReadingBuffer {
    /// create an empty buffer; a zero capacity is bumped to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// store a reading, evicting the oldest when over capacity
    ///
    /// failed readings are dropped silently. returns whether the reading
    /// was stored.
    pub fn append(&self, reading: Reading) -> bool {
        if reading.values().is_none() {
            return false;
        }

        let mut readings = self.write();
        readings.push_back(reading);
        while readings.len() > self.capacity {
            readings.pop_front();
        }
        true
    }

    /// owned copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<Reading> {
        self.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // a panic while holding the lock cannot leave the deque half-updated
    // (push/pop are atomic from our side), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Reading>> {
        self.readings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Reading>> {
        self.readings.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ReadingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::now_seconds;
    use std::sync::Arc;

    fn reading(i: usize) -> Reading {
        Reading::ok(i as f64 / 10.0, 50.0, now_seconds())
    }

    #[test]
    fn test_starts_empty() {
        let buffer = ReadingBuffer::default();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_keeps_insertion_order() {
        let buffer = ReadingBuffer::new(10);
        for i in 0..5 {
            assert!(buffer.append(reading(i)));
        }
        let temps: Vec<f64> = buffer.snapshot().iter().filter_map(|r| r.temperature()).collect();
        assert_eq!(temps, vec![0.0, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let buffer = ReadingBuffer::default();
        let appended: Vec<Reading> = (0..DEFAULT_CAPACITY + 37).map(reading).collect();
        for r in &appended {
            buffer.append(r.clone());
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), DEFAULT_CAPACITY);
        assert_eq!(snapshot, appended[37..].to_vec());
    }

    #[test]
    fn test_failed_append_is_noop() {
        let buffer = ReadingBuffer::new(3);
        buffer.append(reading(1));
        buffer.append(reading(2));
        let before = buffer.snapshot();

        assert!(!buffer.append(Reading::failed("timeout", now_seconds())));
        assert_eq!(buffer.snapshot(), before);

        // also a no-op when full: nothing gets evicted
        buffer.append(reading(3));
        let full = buffer.snapshot();
        assert!(!buffer.append(Reading::failed("timeout", now_seconds())));
        assert_eq!(buffer.snapshot(), full);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let buffer = ReadingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(reading(1));
        buffer.append(reading(2));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.snapshot()[0].temperature(), Some(0.2));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let buffer = ReadingBuffer::new(4);
        buffer.append(reading(1));
        let mut snapshot = buffer.snapshot();
        snapshot.clear();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let buffer = Arc::new(ReadingBuffer::new(16));
        let mut handles = Vec::new();

        for writer in 0..4 {
            let buffer = buffer.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    buffer.append(Reading::ok(writer as f64, i as f64 / 10.0, now_seconds()));
                }
            }));
        }
        for _ in 0..4 {
            let buffer = buffer.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = buffer.snapshot();
                    assert!(snapshot.len() <= 16);
                    assert!(snapshot.iter().all(|r| r.values().is_some()));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(buffer.len(), 16);
    }
}
