// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff for the store faults that are worth retrying
//! before surfacing to a caller: a session dropping mid-operation, or a
//! version race lost against a concurrent writer. Everything else
//! (`NoNode`, `NodeExists`, `NotEmpty`) is a logical outcome recipes already
//! branch on, not a fault, and is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::{KvStore, TxnOp, TxnResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_millis(10), max_delay: Duration::from_millis(200) }
    }
}

/// True for faults a retry has a real chance of clearing: a closed session
/// (`Unavailable`) or a version mismatch, whether reported directly by
/// `set`/`delete` or wrapped in a `transact` op failure.
fn is_retriable(err: &StoreError) -> bool {
    match err {
        StoreError::SessionClosed(_) | StoreError::BadVersion { .. } => true,
        StoreError::TransactionFailed { reason, .. } => reason.contains("version mismatch"),
        StoreError::NoNode(_) | StoreError::NodeExists(_) | StoreError::NotEmpty(_) => false,
    }
}

/// Run `f`, retrying on a retriable [`StoreError`] with exponential backoff
/// up to `policy.max_attempts` total tries.
pub async fn retry_async<T, F, Fut>(policy: RetryPolicy, mut f: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = policy.base_delay;
    for attempt in 1..=policy.max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.max_attempts && is_retriable(&err) => {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
            }
            Err(err) => return Err(err),
        }
    }
    unreachable!("loop always returns by its last iteration")
}

/// Run a multi-op transaction, retrying the whole batch on a retriable
/// fault. Transactions are atomic, so a failed attempt leaves no partial
/// state behind; re-submitting the same `ops` clears a dropped session, and
/// otherwise just fails again until `max_attempts` gives up and the
/// original error surfaces.
pub async fn transact_with_retry<S: KvStore>(store: &S, ops: Vec<TxnOp>) -> Result<Vec<TxnResult>, StoreError> {
    retry_async(RetryPolicy::default(), || async { store.transact(ops.clone()).await }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retrying_on_the_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry_async(RetryPolicy::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, StoreError>(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_a_session_closed_fault_until_it_clears() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 5, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(4) };
        let result = retry_async(policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(StoreError::SessionClosed(7))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(result, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(2) };
        let result: Result<(), StoreError> =
            retry_async(policy, || async { Err(StoreError::SessionClosed(1)) }).await;
        assert_eq!(result, Err(StoreError::SessionClosed(1)));
    }

    #[tokio::test]
    async fn a_logical_conflict_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = retry_async(RetryPolicy::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::NodeExists("/x".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
