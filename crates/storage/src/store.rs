// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordination-store contract: the subset of ZooKeeper-style
//! primitives (persistent/ephemeral/sequential nodes, watches, atomic
//! multi-op transactions) every recipe in this crate is built from.
//!
//! There is no production ZooKeeper client in this workspace's dependency
//! stack, so the only implementation shipped here is [`crate::memory::MemoryStore`],
//! an in-process ensemble shared via `Arc` so multiple simulated workers can
//! attach to the same coordination state. The trait boundary is kept
//! separate from that implementation so a real networked backend could be
//! dropped in later without touching the recipes.

use async_trait::async_trait;

use crate::error::StoreError;

/// How a node's lifetime and naming behave: persistent, ephemeral (tied to
/// the creating session), or sequential (the store appends a monotonic
/// suffix to the requested path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    Persistent,
    Sequential,
    Ephemeral,
    EphemeralSequential,
}

impl CreateMode {
    pub fn is_sequential(self) -> bool {
        matches!(self, CreateMode::Sequential | CreateMode::EphemeralSequential)
    }

    pub fn is_ephemeral(self) -> bool {
        matches!(self, CreateMode::Ephemeral | CreateMode::EphemeralSequential)
    }
}

/// Metadata returned alongside a node's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub version: u64,
    pub ephemeral: bool,
}

/// A change observed on the store. Watches are broadcast-wide: a recipe
/// subscribes once and filters for the paths it cares about, mirroring the
/// "subscribe, re-check, then wait" pattern used to avoid missing a change
/// between the check and the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(String),
    DataChanged(String),
    Deleted(String),
}

impl WatchEvent {
    pub fn path(&self) -> &str {
        match self {
            WatchEvent::Created(p) | WatchEvent::DataChanged(p) | WatchEvent::Deleted(p) => p,
        }
    }
}

/// One step of an atomic multi-op transaction.
#[derive(Debug, Clone)]
pub enum TxnOp {
    Create { path: String, data: Vec<u8>, mode: CreateMode },
    SetData { path: String, data: Vec<u8>, expected_version: Option<u64> },
    Delete { path: String, expected_version: Option<u64> },
    /// Assert a node's version without modifying it, so a transaction can
    /// guard on state it does not otherwise touch.
    Check { path: String, expected_version: u64 },
}

#[derive(Debug, Clone)]
pub enum TxnResult {
    Created(String),
    SetData(Stat),
    Deleted,
    Checked,
}

/// A live attachment to the ensemble. Ephemeral nodes created through one
/// session disappear when that session closes, which is how the collector
/// detects an abandoned task.
#[async_trait]
pub trait KvStore: Send + Sync {
    fn session_id(&self) -> u64;

    async fn create(&self, path: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, StoreError>;

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), StoreError>;

    async fn set(&self, path: &str, data: Vec<u8>, expected_version: Option<u64>) -> Result<Stat, StoreError>;

    async fn delete(&self, path: &str, expected_version: Option<u64>) -> Result<(), StoreError>;

    async fn exists(&self, path: &str) -> Result<Option<Stat>, StoreError>;

    /// Direct children of `path`, sorted lexically (so sequential names sort
    /// in creation order).
    async fn children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    async fn transact(&self, ops: Vec<TxnOp>) -> Result<Vec<TxnResult>, StoreError>;

    /// Subscribe to every subsequent change on the ensemble.
    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WatchEvent>;

    /// Close this session, dropping every ephemeral node it created.
    async fn close(&self);
}
