//! Bounded admission gate for tracked jobs.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic counter that never lets the number of tracked jobs exceed `max`.
///
/// This is the only watch state touched from outside the watch loop: callers
/// admit jobs concurrently while the loop releases them.
#[derive(Debug)]
pub struct CapacityGate {
    current: AtomicUsize,
    max: usize,
}

impl CapacityGate {
    /// Create a gate with room for `max` jobs.
    pub const fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Reserve a slot. Returns `false`, leaving the count untouched, when
    /// the gate is full.
    pub fn admit(&self) -> bool {
        self.current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max).then_some(n.saturating_add(1))
            })
            .is_ok()
    }

    /// Give a slot back. Releasing an empty gate is a no-op.
    pub fn release(&self) {
        let _ = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Number of slots in use.
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub const fn max(&self) -> usize {
        self.max
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.max.saturating_sub(self.current())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_admit_until_full() {
        let gate = CapacityGate::new(2);
        assert!(gate.admit());
        assert!(gate.admit());
        assert!(!gate.admit());
        assert_eq!(gate.current(), 2);
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn test_release_frees_a_slot() {
        let gate = CapacityGate::new(1);
        assert!(gate.admit());
        gate.release();
        assert_eq!(gate.current(), 0);
        assert!(gate.admit());
    }

    #[test]
    fn test_release_on_empty_gate() {
        let gate = CapacityGate::new(1);
        gate.release();
        assert_eq!(gate.current(), 0);
        assert!(gate.admit());
        assert!(!gate.admit());
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let gate = CapacityGate::new(0);
        assert!(!gate.admit());
        assert_eq!(gate.current(), 0);
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_max() {
        let gate = Arc::new(CapacityGate::new(10));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || (0..100).filter(|_| gate.admit()).count())
            })
            .collect();

        let admitted: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(0))
            .sum();

        assert_eq!(admitted, 10);
        assert_eq!(gate.current(), 10);
    }
}
