//! Exclusive per-fund scopes for ledger mutations.

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::error::{ComputeError, Result};

/// Held for the duration of one ledger mutation. Dropping it releases the fund.
pub struct LedgerGuard {
    fund_id: i32,
    _inner: Box<dyn Any + Send + Sync>,
}

impl LedgerGuard {
    pub fn new(fund_id: i32, inner: impl Any + Send + Sync) -> Self {
        Self {
            fund_id,
            _inner: Box::new(inner),
        }
    }

    pub fn fund_id(&self) -> i32 {
        self.fund_id
    }
}

impl std::fmt::Debug for LedgerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerGuard").field("fund_id", &self.fund_id).finish()
    }
}

/// Serializes mutations of one fund's ledger.
///
/// Single-instance deployments use [`InProcessLedgerLock`]. A deployment with
/// several application instances needs an implementation backed by a storage
/// level lock instead.
#[async_trait]
pub trait LedgerLock: Send + Sync {
    /// Waits at most `wait` for exclusive access to the fund's ledger.
    async fn acquire(&self, fund_id: i32, wait: Duration) -> Result<LedgerGuard>;
}

/// One async mutex per fund, created on first use.
///
/// Entries nobody holds or waits on are dropped on the next acquire, so the map
/// only tracks funds with a mutation in flight.
#[derive(Default)]
pub struct InProcessLedgerLock {
    locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
}

impl InProcessLedgerLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn fund_mutex(&self, fund_id: i32) -> Arc<AsyncMutex<()>> {
        // The map is only touched briefly, a poisoned guard still holds a valid map
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Holders and waiters keep a clone, so a count of one means idle
        locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        locks.entry(fund_id).or_default().clone()
    }

    /// Number of funds currently tracked.
    pub fn tracked_funds(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl LedgerLock for InProcessLedgerLock {
    async fn acquire(&self, fund_id: i32, wait: Duration) -> Result<LedgerGuard> {
        let mutex = self.fund_mutex(fund_id);
        let started = Instant::now();
        trace!(fund_id, wait_ms = wait.as_millis() as u64, "Waiting for fund ledger lock");

        match tokio::time::timeout(wait, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(
                    fund_id,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Acquired fund ledger lock"
                );
                Ok(LedgerGuard::new(fund_id, guard))
            }
            Err(_elapsed) => {
                warn!(fund_id, wait_ms = wait.as_millis() as u64, "Timed out waiting for fund ledger lock");
                Err(ComputeError::ConcurrencyTimeout {
                    fund_id,
                    waited_ms: started.elapsed().as_millis(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_second_acquire_times_out_while_held() {
        let lock = InProcessLedgerLock::new();
        let guard = lock.acquire(1, Duration::from_millis(50)).await.unwrap();
        assert_eq!(guard.fund_id(), 1);

        let err = lock.acquire(1, Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyTimeout);
        assert!(err.is_retryable());

        drop(guard);
        assert!(lock.acquire(1, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_funds_are_locked_independently() {
        let lock = InProcessLedgerLock::new();
        let _first = lock.acquire(1, Duration::from_millis(20)).await.unwrap();
        let second = lock.acquire(2, Duration::from_millis(20)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_idle_funds_are_pruned() {
        let lock = InProcessLedgerLock::new();
        for fund_id in 1..=50 {
            drop(lock.acquire(fund_id, Duration::from_millis(20)).await.unwrap());
        }
        assert_eq!(lock.tracked_funds(), 1);

        let held = lock.acquire(100, Duration::from_millis(20)).await.unwrap();
        let _other = lock.acquire(101, Duration::from_millis(20)).await.unwrap();
        assert_eq!(lock.tracked_funds(), 2);

        // A held fund survives pruning and still excludes other writers
        let err = lock.acquire(100, Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyTimeout);
        drop(held);
        assert!(lock.acquire(100, Duration::from_millis(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_once_released() {
        let lock = Arc::new(InProcessLedgerLock::new());
        let guard = lock.acquire(7, Duration::from_millis(50)).await.unwrap();

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.acquire(7, Duration::from_secs(2)).await.map(|g| g.fund_id()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert_eq!(waiter.await.unwrap().unwrap(), 7);
    }
}
