// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination-store ensemble. One [`Ensemble`] is shared (via
//! `Arc`) across however many simulated worker processes attach to it, each
//! through its own [`MemoryStore`] handle / session.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::store::{CreateMode, KvStore, Stat, TxnOp, TxnResult, WatchEvent};

const WATCH_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
struct Node {
    data: Vec<u8>,
    version: u64,
    owner_session: Option<u64>,
    seq_counter: u64,
}

struct Inner {
    nodes: BTreeMap<String, Node>,
    sessions_ephemeral: HashMap<u64, HashSet<String>>,
}

impl Inner {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node { data: Vec::new(), version: 0, owner_session: None, seq_counter: 0 },
        );
        Self { nodes, sessions_ephemeral: HashMap::new() }
    }

    fn parent_of(path: &str) -> &str {
        if path == "/" {
            return "/";
        }
        match path.rfind('/') {
            Some(0) => "/",
            Some(idx) => &path[..idx],
            None => "/",
        }
    }

    fn create_node(
        &mut self,
        path: &str,
        data: Vec<u8>,
        mode: CreateMode,
        session_id: u64,
    ) -> Result<String, StoreError> {
        let parent = Self::parent_of(path).to_string();
        let actual_path = if mode.is_sequential() {
            let counter = self
                .nodes
                .get_mut(&parent)
                .ok_or_else(|| StoreError::NoNode(parent.clone()))?;
            counter.seq_counter += 1;
            format!("{path}{:010}", counter.seq_counter)
        } else {
            if !self.nodes.contains_key(&parent) && parent != "/" {
                return Err(StoreError::NoNode(parent));
            }
            path.to_string()
        };

        if self.nodes.contains_key(&actual_path) {
            return Err(StoreError::NodeExists(actual_path));
        }

        let owner_session = mode.is_ephemeral().then_some(session_id);
        self.nodes.insert(
            actual_path.clone(),
            Node { data, version: 0, owner_session, seq_counter: 0 },
        );
        if let Some(session) = owner_session {
            self.sessions_ephemeral
                .entry(session)
                .or_default()
                .insert(actual_path.clone());
        }
        Ok(actual_path)
    }

    fn get_node(&self, path: &str) -> Result<&Node, StoreError> {
        self.nodes.get(path).ok_or_else(|| StoreError::NoNode(path.to_string()))
    }

    fn set_data(
        &mut self,
        path: &str,
        data: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<Stat, StoreError> {
        let node = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| StoreError::NoNode(path.to_string()))?;
        if let Some(expected) = expected_version {
            if node.version != expected {
                return Err(StoreError::BadVersion {
                    path: path.to_string(),
                    expected,
                    found: node.version,
                });
            }
        }
        node.data = data;
        node.version += 1;
        Ok(Stat { version: node.version, ephemeral: node.owner_session.is_some() })
    }

    fn delete_node(&mut self, path: &str, expected_version: Option<u64>) -> Result<(), StoreError> {
        let has_children = self
            .nodes
            .range(format!("{path}/")..)
            .next()
            .map(|(child, _)| child.starts_with(&format!("{path}/")))
            .unwrap_or(false);
        if has_children {
            return Err(StoreError::NotEmpty(path.to_string()));
        }
        let node = self
            .nodes
            .get(path)
            .ok_or_else(|| StoreError::NoNode(path.to_string()))?;
        if let Some(expected) = expected_version {
            if node.version != expected {
                return Err(StoreError::BadVersion {
                    path: path.to_string(),
                    expected,
                    found: node.version,
                });
            }
        }
        let owner = node.owner_session;
        self.nodes.remove(path);
        if let Some(session) = owner {
            if let Some(set) = self.sessions_ephemeral.get_mut(&session) {
                set.remove(path);
            }
        }
        Ok(())
    }

    fn children_of(&self, path: &str) -> Result<Vec<String>, StoreError> {
        if !self.nodes.contains_key(path) {
            return Err(StoreError::NoNode(path.to_string()));
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        let mut children = Vec::new();
        for key in self.nodes.keys() {
            if key == path {
                continue;
            }
            if let Some(rest) = key.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    children.push(rest.to_string());
                }
            }
        }
        children.sort();
        Ok(children)
    }
}

struct Ensemble {
    inner: Mutex<Inner>,
    watch_tx: broadcast::Sender<WatchEvent>,
    next_session: AtomicU64,
}

/// A handle to a shared in-memory ensemble, bound to one session.
///
/// Cloning via [`MemoryStore::connect`] opens a fresh session on the same
/// ensemble, simulating a second process attaching to it; dropping or
/// calling [`KvStore::close`] on that handle releases its ephemeral nodes.
#[derive(Clone)]
pub struct MemoryStore {
    ensemble: Arc<Ensemble>,
    session_id: u64,
}

impl MemoryStore {
    /// Start a brand new ensemble with one initial session attached.
    pub fn new() -> Self {
        let ensemble = Arc::new(Ensemble {
            inner: Mutex::new(Inner::new()),
            watch_tx: broadcast::channel(WATCH_CHANNEL_CAPACITY).0,
            next_session: AtomicU64::new(1),
        });
        let session_id = ensemble.next_session.fetch_add(1, Ordering::SeqCst);
        Self { ensemble, session_id }
    }

    /// Attach a new session to the same ensemble this handle belongs to.
    pub fn connect(&self) -> Self {
        let session_id = self.ensemble.next_session.fetch_add(1, Ordering::SeqCst);
        Self { ensemble: Arc::clone(&self.ensemble), session_id }
    }

    fn broadcast(&self, event: WatchEvent) {
        let _ = self.ensemble.watch_tx.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn session_id(&self) -> u64 {
        self.session_id
    }

    async fn create(&self, path: &str, data: Vec<u8>, mode: CreateMode) -> Result<String, StoreError> {
        let actual_path = {
            let mut inner = self.ensemble.inner.lock();
            inner.create_node(path, data, mode, self.session_id)?
        };
        self.broadcast(WatchEvent::Created(actual_path.clone()));
        Ok(actual_path)
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Stat), StoreError> {
        let inner = self.ensemble.inner.lock();
        let node = inner.get_node(path)?;
        Ok((node.data.clone(), Stat { version: node.version, ephemeral: node.owner_session.is_some() }))
    }

    async fn set(&self, path: &str, data: Vec<u8>, expected_version: Option<u64>) -> Result<Stat, StoreError> {
        let stat = {
            let mut inner = self.ensemble.inner.lock();
            inner.set_data(path, data, expected_version)?
        };
        self.broadcast(WatchEvent::DataChanged(path.to_string()));
        Ok(stat)
    }

    async fn delete(&self, path: &str, expected_version: Option<u64>) -> Result<(), StoreError> {
        {
            let mut inner = self.ensemble.inner.lock();
            inner.delete_node(path, expected_version)?;
        }
        self.broadcast(WatchEvent::Deleted(path.to_string()));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<Option<Stat>, StoreError> {
        let inner = self.ensemble.inner.lock();
        Ok(inner
            .nodes
            .get(path)
            .map(|node| Stat { version: node.version, ephemeral: node.owner_session.is_some() }))
    }

    async fn children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.ensemble.inner.lock();
        inner.children_of(path)
    }

    async fn transact(&self, ops: Vec<TxnOp>) -> Result<Vec<TxnResult>, StoreError> {
        let (results, touched) = {
            let mut inner = self.ensemble.inner.lock();
            let snapshot = inner.nodes.clone();
            match apply_txn(&mut inner, &ops, self.session_id) {
                Ok(outcome) => outcome,
                Err(err) => {
                    inner.nodes = snapshot;
                    return Err(err);
                }
            }
        };
        for (path, event_kind) in touched {
            self.broadcast(match event_kind {
                TouchKind::Created => WatchEvent::Created(path),
                TouchKind::Changed => WatchEvent::DataChanged(path),
                TouchKind::Deleted => WatchEvent::Deleted(path),
            });
        }
        Ok(results)
    }

    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.ensemble.watch_tx.subscribe()
    }

    async fn close(&self) {
        let removed: Vec<String> = {
            let mut inner = self.ensemble.inner.lock();
            let paths = inner.sessions_ephemeral.remove(&self.session_id).unwrap_or_default();
            for path in &paths {
                inner.nodes.remove(path);
            }
            paths.into_iter().collect()
        };
        for path in removed {
            self.broadcast(WatchEvent::Deleted(path));
        }
    }
}

enum TouchKind {
    Created,
    Changed,
    Deleted,
}

fn apply_txn(
    inner: &mut Inner,
    ops: &[TxnOp],
    session_id: u64,
) -> Result<(Vec<TxnResult>, Vec<(String, TouchKind)>), StoreError> {
    let mut results = Vec::with_capacity(ops.len());
    let mut touched = Vec::with_capacity(ops.len());
    for (index, op) in ops.iter().enumerate() {
        let result = match op {
            TxnOp::Create { path, data, mode } => inner
                .create_node(path, data.clone(), *mode, session_id)
                .map(|actual| {
                    touched.push((actual.clone(), TouchKind::Created));
                    TxnResult::Created(actual)
                }),
            TxnOp::SetData { path, data, expected_version } => inner
                .set_data(path, data.clone(), *expected_version)
                .map(|stat| {
                    touched.push((path.clone(), TouchKind::Changed));
                    TxnResult::SetData(stat)
                }),
            TxnOp::Delete { path, expected_version } => {
                inner.delete_node(path, *expected_version).map(|()| {
                    touched.push((path.clone(), TouchKind::Deleted));
                    TxnResult::Deleted
                })
            }
            TxnOp::Check { path, expected_version } => inner.get_node(path).and_then(|node| {
                if node.version == *expected_version {
                    Ok(TxnResult::Checked)
                } else {
                    Err(StoreError::BadVersion {
                        path: path.clone(),
                        expected: *expected_version,
                        found: node.version,
                    })
                }
            }),
        };
        match result {
            Ok(value) => results.push(value),
            Err(err) => {
                let path = match op {
                    TxnOp::Create { path, .. }
                    | TxnOp::SetData { path, .. }
                    | TxnOp::Delete { path, .. }
                    | TxnOp::Check { path, .. } => path.clone(),
                };
                return Err(StoreError::TransactionFailed { index, path, reason: err.to_string() });
            }
        }
    }
    Ok((results, touched))
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
