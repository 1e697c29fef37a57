//! EE Subscription ID Generator
//!
//! Hands out integer identifiers from a bounded range. Freed identifiers go to
//! the tail of a FIFO free list and are reused before the range advances,
//! the same head/tail discipline as the core object pool.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

use crate::context::ContextError;

/// Default lowest identifier handed out
pub const DEFAULT_MIN_ID: i64 = 1;
/// Default highest identifier handed out
pub const DEFAULT_MAX_ID: i64 = i32::MAX as i64;

#[derive(Debug)]
struct IdPool {
    /// Next never-used identifier; None once the range is consumed
    next: Option<i64>,
    /// Freed identifiers, oldest first
    recycled: VecDeque<i64>,
    /// Currently outstanding identifiers
    allocated: HashSet<i64>,
}

/// Concurrency-safe identifier allocator
#[derive(Debug)]
pub struct IdGenerator {
    min: i64,
    max: i64,
    pool: Mutex<IdPool>,
}

impl IdGenerator {
    /// Create a generator over the inclusive range `[min, max]`
    pub fn new(min: i64, max: i64) -> Result<Self, ContextError> {
        if min < 0 || min > max {
            return Err(ContextError::InvalidIdRange { min, max });
        }

        Ok(Self {
            min,
            max,
            pool: Mutex::new(IdPool {
                next: Some(min),
                recycled: VecDeque::new(),
                allocated: HashSet::new(),
            }),
        })
    }

    /// Lowest and highest identifier of the range
    pub fn range(&self) -> (i64, i64) {
        (self.min, self.max)
    }

    /// Allocate an identifier not currently outstanding
    pub fn allocate(&self) -> Result<i64, ContextError> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);

        let id = if let Some(id) = pool.recycled.pop_front() {
            id
        } else if let Some(id) = pool.next {
            pool.next = if id < self.max { Some(id + 1) } else { None };
            id
        } else {
            log::error!("EE subscription ID space [{}..={}] exhausted", self.min, self.max);
            return Err(ContextError::IdExhausted {
                min: self.min,
                max: self.max,
            });
        };

        pool.allocated.insert(id);
        Ok(id)
    }

    /// Return an identifier to the pool; unknown identifiers are ignored
    pub fn free(&self, id: i64) {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);

        if pool.allocated.remove(&id) {
            pool.recycled.push_back(id);
        } else {
            log::debug!("Ignoring free of unallocated EE subscription ID {id}");
        }
    }

    /// Whether the identifier is currently outstanding
    pub fn is_allocated(&self, id: i64) -> bool {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocated
            .contains(&id)
    }

    /// Number of outstanding identifiers
    pub fn outstanding(&self) -> usize {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .allocated
            .len()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ID,
            max: DEFAULT_MAX_ID,
            pool: Mutex::new(IdPool {
                next: Some(DEFAULT_MIN_ID),
                recycled: VecDeque::new(),
                allocated: HashSet::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allocate_sequential_then_exhausted() {
        let generator = IdGenerator::new(1, 3).unwrap();
        assert_eq!(generator.allocate().unwrap(), 1);
        assert_eq!(generator.allocate().unwrap(), 2);
        assert_eq!(generator.allocate().unwrap(), 3);
        assert!(matches!(
            generator.allocate(),
            Err(ContextError::IdExhausted { min: 1, max: 3 })
        ));
        assert_eq!(generator.outstanding(), 3);
    }

    #[test]
    fn test_free_recycles_in_fifo_order() {
        let generator = IdGenerator::new(0, 2).unwrap();
        for _ in 0..3 {
            generator.allocate().unwrap();
        }

        generator.free(2);
        generator.free(0);
        assert!(!generator.is_allocated(2));

        assert_eq!(generator.allocate().unwrap(), 2);
        assert_eq!(generator.allocate().unwrap(), 0);
        assert!(generator.allocate().is_err());
    }

    #[test]
    fn test_free_unallocated_is_noop() {
        let generator = IdGenerator::new(1, 2).unwrap();
        generator.free(1);
        generator.free(99);

        let first = generator.allocate().unwrap();
        generator.free(first);
        generator.free(first);

        // a double free must not hand the same id out twice
        let a = generator.allocate().unwrap();
        let b = generator.allocate().unwrap();
        assert_ne!(a, b);
        assert!(generator.allocate().is_err());
    }

    #[test]
    fn test_invalid_range() {
        assert!(IdGenerator::new(5, 4).is_err());
        assert!(IdGenerator::new(-1, 4).is_err());
        assert_eq!(IdGenerator::new(7, 7).unwrap().range(), (7, 7));
    }

    #[test]
    fn test_range_end_at_i64_max() {
        let generator = IdGenerator::new(i64::MAX - 1, i64::MAX).unwrap();
        assert_eq!(generator.allocate().unwrap(), i64::MAX - 1);
        assert_eq!(generator.allocate().unwrap(), i64::MAX);
        assert!(generator.allocate().is_err());
    }

    #[test]
    fn test_concurrent_allocate_unique() {
        let generator = Arc::new(IdGenerator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| generator.allocate().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(generator.outstanding(), 2000);
    }
}
