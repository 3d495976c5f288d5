//! Identity allocation for trackable objects.

use crate::types::ObjectId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of fresh object identities.
///
/// An allocator is created once per process or per model context and handed
/// to everything that constructs trackable objects, so that tests and
/// separate sessions never share a hidden counter.
///
/// # Implementations
///
/// - `CounterIdAllocator` - a single exclusive-access counter
///
/// # Contract
///
/// - `next()` never returns an id that was returned before or that was
///   passed to `bump()`.
/// - `bump(n)` guarantees every later `next()` returns an id strictly above `n`.
/// - Both paths touch the same counter and must be serialized together.
pub trait IdAllocator: Send + Sync + std::fmt::Debug {
    /// Hands out the next free id.
    fn next(&self) -> ObjectId;

    /// Raises the floor so that future ids are strictly above `minimum`.
    fn bump(&self, minimum: ObjectId);

    /// Returns `explicit` (after raising the floor past it) or a fresh id.
    ///
    /// Both branches run under one exclusive section.
    fn claim(&self, explicit: Option<ObjectId>) -> ObjectId;

    /// Returns the id the next call to `next()` would hand out.
    fn peek(&self) -> ObjectId;

    /// Restarts allocation from zero.
    fn reset(&self);
}

/// Counter-backed allocator.
///
/// The counter holds the next free id. Ids start at 0.
#[derive(Debug, Default)]
pub struct CounterIdAllocator {
    next_free: Mutex<u64>,
}

impl CounterIdAllocator {
    /// Creates an allocator handing out ids from 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_free: Mutex::new(first),
        }
    }

    /// Creates an Arc-wrapped allocator for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl IdAllocator for CounterIdAllocator {
    fn next(&self) -> ObjectId {
        let mut next_free = self.next_free.lock();
        let id = *next_free;
        *next_free = next_free.saturating_add(1);
        ObjectId(id)
    }

    fn bump(&self, minimum: ObjectId) {
        let mut next_free = self.next_free.lock();
        if *next_free <= minimum.0 {
            *next_free = minimum.0.saturating_add(1);
        }
    }

    fn claim(&self, explicit: Option<ObjectId>) -> ObjectId {
        let mut next_free = self.next_free.lock();
        match explicit {
            Some(id) => {
                if *next_free <= id.0 {
                    *next_free = id.0.saturating_add(1);
                }
                id
            }
            None => {
                let id = *next_free;
                *next_free = next_free.saturating_add(1);
                ObjectId(id)
            }
        }
    }

    fn peek(&self) -> ObjectId {
        ObjectId(*self.next_free.lock())
    }

    fn reset(&self) {
        *self.next_free.lock() = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_start_at_zero() {
        let alloc = CounterIdAllocator::new();
        assert_eq!(alloc.next(), ObjectId(0));
        assert_eq!(alloc.next(), ObjectId(1));
        assert_eq!(alloc.peek(), ObjectId(2));
    }

    #[test]
    fn test_bump_raises_floor() {
        let alloc = CounterIdAllocator::new();
        alloc.next();
        alloc.bump(ObjectId(100));
        assert_eq!(alloc.next(), ObjectId(101));
    }

    #[test]
    fn test_bump_below_floor_is_noop() {
        let alloc = CounterIdAllocator::starting_at(50);
        alloc.bump(ObjectId(10));
        assert_eq!(alloc.next(), ObjectId(50));
    }

    #[test]
    fn test_claim_explicit_and_fresh() {
        let alloc = CounterIdAllocator::new();
        assert_eq!(alloc.claim(Some(ObjectId(7))), ObjectId(7));
        assert_eq!(alloc.claim(None), ObjectId(8));
        // Explicit ids below the floor are returned as-is
        assert_eq!(alloc.claim(Some(ObjectId(3))), ObjectId(3));
        assert_eq!(alloc.claim(None), ObjectId(9));
    }

    #[test]
    fn test_reset() {
        let alloc = CounterIdAllocator::new();
        alloc.bump(ObjectId(20));
        alloc.reset();
        assert_eq!(alloc.next(), ObjectId(0));
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let alloc = CounterIdAllocator::shared();
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let alloc = Arc::clone(&alloc);
            handles.push(std::thread::spawn(move || {
                let mut ids = Vec::with_capacity(500);
                for i in 0..500u64 {
                    // Interleave floor raises with plain allocation
                    if i % 100 == 0 {
                        alloc.bump(ObjectId(t * 10_000 + i));
                    }
                    ids.push(alloc.next());
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    proptest! {
        #[test]
        fn prop_auto_ids_strictly_increase(n in 1usize..200) {
            let alloc = CounterIdAllocator::new();
            let ids: Vec<ObjectId> = (0..n).map(|_| alloc.next()).collect();
            for pair in ids.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }

        #[test]
        fn prop_explicit_id_raises_floor(start in 0u64..1_000, explicit in 0u64..10_000) {
            let alloc = CounterIdAllocator::starting_at(start);
            let claimed = alloc.claim(Some(ObjectId(explicit)));
            prop_assert_eq!(claimed, ObjectId(explicit));

            let fresh = alloc.next();
            prop_assert!(fresh > ObjectId(explicit));
            prop_assert!(fresh >= ObjectId(start));
        }
    }
}
