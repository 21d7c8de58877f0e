//! Byte budget for on-chip memory allocations.
//!
//! The pool never hands out memory itself; it only accounts for it. Each
//! successful [`SramPool::lease`] reserves bytes with a CAS loop and the
//! returned [`PoolLease`] gives them back on drop, so the counter is safe to
//! touch from any context.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded byte budget shared by every SRAM-backed buffer.
#[derive(Debug)]
pub struct SramPool {
    capacity: usize,
    used: AtomicUsize,
}

impl SramPool {
    /// Creates a pool with `capacity` bytes of budget.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            used: AtomicUsize::new(0),
        })
    }

    /// Total budget in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently reserved.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.used())
    }

    /// Reserves `bytes` from the budget; `None` when it does not fit.
    pub fn lease(self: &Arc<Self>, bytes: usize) -> Option<PoolLease> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let next = used.checked_add(bytes)?;
            if next > self.capacity {
                return None;
            }
            match self
                .used
                .compare_exchange_weak(used, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    return Some(PoolLease {
                        pool: Arc::clone(self),
                        bytes,
                    });
                }
                Err(actual) => used = actual,
            }
        }
    }
}

/// Reservation of pool bytes, returned on drop.
#[derive(Debug)]
pub struct PoolLease {
    pool: Arc<SramPool>,
    bytes: usize,
}

impl PoolLease {
    /// Reserved byte count.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.pool.used.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_accounts_and_returns_exact_amount() {
        let pool = SramPool::new(1024);
        let a = pool.lease(600).unwrap();
        assert_eq!(pool.used(), 600);
        assert!(pool.lease(500).is_none());
        let b = pool.lease(424).unwrap();
        assert_eq!(pool.available(), 0);
        drop(a);
        assert_eq!(pool.available(), 600);
        drop(b);
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn concurrent_leases_never_exceed_capacity() {
        let pool = SramPool::new(64 * 100);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut held = Vec::new();
                    for _ in 0..50 {
                        if let Some(lease) = pool.lease(64) {
                            held.push(lease);
                        }
                        assert!(pool.used() <= pool.capacity());
                    }
                    held
                })
            })
            .collect();
        let held: Vec<PoolLease> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(held.len(), 100);
        drop(held);
        assert_eq!(pool.used(), 0);
    }
}
