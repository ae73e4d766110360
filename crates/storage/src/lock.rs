// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A mutex over a single coordination-store node, built from an ephemeral
//! child so a crashed holder releases it automatically. Used for both the
//! collector's per-job lock (`/control/jobs/<job_id>/lock`) and its
//! per-task claim lock (`/running/<task_id>/lock`).

use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{CreateMode, KvStore};

/// A lock backed by a single ephemeral node at `path` (e.g.
/// `/control/jobs/<job_id>/lock` or `/running/<task_id>/lock`): it either
/// exists (held) or does not (free). The node's parent must already exist.
pub struct SingleLock<S: KvStore> {
    store: Arc<S>,
    path: String,
    held: bool,
}

impl<S: KvStore> SingleLock<S> {
    pub fn new(store: Arc<S>, path: impl Into<String>) -> Self {
        Self { store, path: path.into(), held: false }
    }

    fn lock_path(&self) -> &str {
        &self.path
    }

    /// Attempt to acquire without blocking. Returns `false` if another
    /// session already holds it.
    pub async fn try_acquire(&mut self) -> Result<bool, StoreError> {
        match self.store.create(self.lock_path(), Vec::new(), CreateMode::Ephemeral).await {
            Ok(_) => {
                self.held = true;
                Ok(true)
            }
            Err(StoreError::NodeExists(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Block until the lock is free, then take it. Uses the store's
    /// broadcast watch channel to wake up rather than busy-polling.
    pub async fn acquire(&mut self) -> Result<(), StoreError> {
        loop {
            if self.try_acquire().await? {
                return Ok(());
            }
            let mut watch = self.store.subscribe();
            if self.store.exists(self.lock_path()).await?.is_none() {
                continue;
            }
            while let Ok(event) = watch.recv().await {
                if event.path() == self.lock_path() {
                    break;
                }
            }
        }
    }

    pub async fn release(&mut self) -> Result<(), StoreError> {
        if !self.held {
            return Ok(());
        }
        self.store.delete(self.lock_path(), None).await?;
        self.held = false;
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
