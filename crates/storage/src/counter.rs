// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A lock-guarded read-modify-write counter, used to mint sequential job ids
//! at `/core/jobs_counter`.

use std::sync::Arc;

use crate::error::StoreError;
use crate::lock::SingleLock;
use crate::retry::{retry_async, RetryPolicy};
use crate::store::{CreateMode, KvStore};

pub struct IncrementalCounter<S: KvStore> {
    store: Arc<S>,
    path: String,
}

impl<S: KvStore> IncrementalCounter<S> {
    pub fn new(store: Arc<S>, path: impl Into<String>) -> Self {
        Self { store, path: path.into() }
    }

    async fn read(&self) -> Result<(u64, Option<u64>), StoreError> {
        match self.store.get(&self.path).await {
            Ok((data, stat)) => {
                let value = std::str::from_utf8(&data)
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(0);
                Ok((value, Some(stat.version)))
            }
            Err(StoreError::NoNode(_)) => Ok((0, None)),
            Err(err) => Err(err),
        }
    }

    /// Atomically read, increment, and persist the counter, returning the
    /// new value.
    pub async fn increment(&self) -> Result<u64, StoreError> {
        let mut lock = SingleLock::new(Arc::clone(&self.store), self.lock_root());
        lock.acquire().await?;
        let result = self.increment_locked().await;
        lock.release().await?;
        result
    }

    fn lock_root(&self) -> String {
        format!("{}.lock", self.path)
    }

    async fn increment_locked(&self) -> Result<u64, StoreError> {
        retry_async(RetryPolicy::default(), || async {
            let (value, version) = self.read().await?;
            let next = value + 1;
            let bytes = next.to_string().into_bytes();
            match version {
                Some(version) => {
                    self.store.set(&self.path, bytes, Some(version)).await?;
                }
                None => {
                    self.store.create(&self.path, bytes, CreateMode::Persistent).await?;
                }
            }
            Ok(next)
        })
        .await
    }
}

#[cfg(test)]
#[path = "counter_tests.rs"]
mod tests;
