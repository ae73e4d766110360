// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A priority FIFO queue recipe backing both `/ready` and `/input`:
//! persistent sequential `entries/<name>` nodes hold the data, and an
//! ephemeral `taken/<name>` mirror marks an entry as claimed so a second
//! `get` does not hand out the same work. Losing the session that claimed
//! an entry (worker crash) drops its `taken/` mirror automatically, making
//! the entry available again the next time someone looks — how the
//! collector's abandonment sweep recovers a dead worker's task.
//!
//! `get` blocks until an entry is claimable rather than polling: it
//! subscribes to the store's watch channel before each scan, the same
//! subscribe-then-recheck-then-wait pattern [`crate::lock::SingleLock::acquire`]
//! uses, so a change landing between the scan and the subscribe is never
//! missed. `interrupt` gives a caller a way to unblock every `get` waiting
//! on this queue without claiming anything, for cooperative shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{CreateMode, KvStore};

const ENTRIES: &str = "entries";
const TAKEN: &str = "taken";
const INTERRUPT: &str = "interrupt";

/// One claimed-or-unclaimed item pulled off the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub name: String,
    pub data: Vec<u8>,
}

pub struct AbortableLockingQueue<S: KvStore> {
    store: Arc<S>,
    root: String,
    interrupt_seq: AtomicU64,
}

impl<S: KvStore> AbortableLockingQueue<S> {
    /// `root` must already exist; `entries`, `taken`, and `interrupt`
    /// subdirectories are created under it if absent.
    pub async fn open(store: Arc<S>, root: impl Into<String>) -> Result<Self, StoreError> {
        let root = root.into();
        for child in [ENTRIES, TAKEN] {
            let path = format!("{root}/{child}");
            match store.create(&path, Vec::new(), CreateMode::Persistent).await {
                Ok(_) | Err(StoreError::NodeExists(_)) => {}
                Err(err) => return Err(err),
            }
        }
        let interrupt_path = format!("{root}/{INTERRUPT}");
        match store.create(&interrupt_path, b"0".to_vec(), CreateMode::Persistent).await {
            Ok(_) | Err(StoreError::NodeExists(_)) => {}
            Err(err) => return Err(err),
        }
        Ok(Self { store, root, interrupt_seq: AtomicU64::new(0) })
    }

    /// Path of the `entries/` directory, exposed so callers can fold a
    /// `put` into a larger atomic transaction instead of calling [`Self::put`]
    /// directly.
    pub fn entries_path(&self) -> String {
        format!("{}/{ENTRIES}", self.root)
    }

    pub fn taken_path(&self) -> String {
        format!("{}/{TAKEN}", self.root)
    }

    fn interrupt_path(&self) -> String {
        format!("{}/{INTERRUPT}", self.root)
    }

    /// Enqueue `data` with the given name prefix, e.g. `entry-<priority>-`
    /// so priority orders before arrival order.
    pub async fn put(&self, name_prefix: &str, data: Vec<u8>) -> Result<String, StoreError> {
        let path = format!("{}/{name_prefix}", self.entries_path());
        let full_path = self.store.create(&path, data, CreateMode::Sequential).await?;
        Ok(full_path.rsplit('/').next().unwrap_or(&full_path).to_string())
    }

    /// Block until an entry is claimable, then claim and return it. Returns
    /// `Ok(None)` only when [`Self::interrupt`] wakes a waiter with nothing
    /// to hand out — never on a merely-empty queue, which instead keeps
    /// waiting on the store's watch channel rather than polling.
    pub async fn get(&self) -> Result<Option<QueueItem>, StoreError> {
        let baseline = self.read_interrupt_seq().await?;
        loop {
            if let Some(item) = self.try_claim().await? {
                return Ok(Some(item));
            }
            let mut watch = self.store.subscribe();
            // Re-check after subscribing: a put, release, or interrupt that
            // landed between the scan above and this subscribe would
            // otherwise be missed forever, since it fired before there was
            // a receiver to broadcast to.
            if let Some(item) = self.try_claim().await? {
                return Ok(Some(item));
            }
            if self.read_interrupt_seq().await? != baseline {
                return Ok(None);
            }
            loop {
                let event = match watch.recv().await {
                    Ok(event) => event,
                    Err(_) => break, // lagged or closed: rescan defensively
                };
                let path = event.path();
                if path == self.interrupt_path() {
                    return Ok(None);
                }
                if path.starts_with(&self.entries_path()) || path.starts_with(&self.taken_path()) {
                    break;
                }
            }
        }
    }

    async fn read_interrupt_seq(&self) -> Result<u64, StoreError> {
        let (bytes, _) = self.store.get(&self.interrupt_path()).await?;
        Ok(std::str::from_utf8(&bytes).ok().and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    /// Scan once for the first unclaimed entry in sort order and claim it
    /// without blocking.
    async fn try_claim(&self) -> Result<Option<QueueItem>, StoreError> {
        let mut names = self.store.children(&self.entries_path()).await?;
        names.sort();
        let taken = self.store.children(&self.taken_path()).await?;
        for name in names {
            if taken.contains(&name) {
                continue;
            }
            let taken_marker = format!("{}/{name}", self.taken_path());
            match self.store.create(&taken_marker, Vec::new(), CreateMode::Ephemeral).await {
                Ok(_) => {
                    let entry_path = format!("{}/{name}", self.entries_path());
                    let (data, _) = self.store.get(&entry_path).await?;
                    return Ok(Some(QueueItem { name, data }));
                }
                Err(StoreError::NodeExists(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// Wake every `get` currently blocked on this queue, handing each one
    /// `Ok(None)` instead of a claimed item. Does not consume or release
    /// any entry; used for cooperative shutdown, not claim handling.
    pub async fn interrupt(&self) -> Result<(), StoreError> {
        let seq = self.interrupt_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.set(&self.interrupt_path(), seq.to_string().into_bytes(), None).await?;
        Ok(())
    }

    /// Permanently remove a claimed entry after it has been processed.
    pub async fn consume(&self, name: &str) -> Result<(), StoreError> {
        let taken_marker = format!("{}/{name}", self.taken_path());
        let _ = self.store.delete(&taken_marker, None).await;
        self.store.delete(&format!("{}/{name}", self.entries_path()), None).await
    }

    /// Release a claim without consuming the entry, making it available to
    /// the next `get` (used when the handler could not be dispatched after
    /// all, not as a normal completion path).
    pub async fn abort_get(&self, name: &str) -> Result<(), StoreError> {
        let taken_marker = format!("{}/{name}", self.taken_path());
        self.store.delete(&taken_marker, None).await
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
