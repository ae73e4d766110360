// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use crate::memory::MemoryStore;
use crate::store::CreateMode;

async fn store_with_core() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.create("/core", vec![], CreateMode::Persistent).await.unwrap();
    store
}

#[tokio::test]
async fn increment_starts_at_one_when_node_absent() {
    let store = store_with_core().await;
    let counter = IncrementalCounter::new(store, "/core/jobs_counter");
    assert_eq!(counter.increment().await.unwrap(), 1);
}

#[tokio::test]
async fn increment_is_monotonic() {
    let store = store_with_core().await;
    let counter = IncrementalCounter::new(store, "/core/jobs_counter");
    assert_eq!(counter.increment().await.unwrap(), 1);
    assert_eq!(counter.increment().await.unwrap(), 2);
    assert_eq!(counter.increment().await.unwrap(), 3);
}

#[tokio::test]
async fn concurrent_increments_do_not_lose_updates() {
    let store = store_with_core().await;
    let counter = Arc::new(IncrementalCounter::new(store, "/core/jobs_counter"));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let counter = Arc::clone(&counter);
        handles.push(tokio::spawn(async move { counter.increment().await.unwrap() }));
    }
    let mut values: Vec<u64> = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap());
    }
    values.sort_unstable();
    assert_eq!(values, (1..=20).collect::<Vec<_>>());
}
