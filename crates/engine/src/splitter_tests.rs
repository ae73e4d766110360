// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use oj_core::{FakeClock, SequentialIdGen};
use oj_storage::MemoryStore;
use std::collections::HashMap;
use std::time::Duration;

struct FixedRules(HashMap<String, Vec<oj_core::HandlerDescriptor>>);

#[async_trait]
impl RuleProvider for FixedRules {
    async fn handlers_for(&self, handler_type: &str) -> Result<Vec<oj_core::HandlerDescriptor>, CoreError> {
        Ok(self.0.get(handler_type).cloned().unwrap_or_default())
    }
}

async fn harness(
    rules: FixedRules,
) -> (Splitter<MemoryStore>, Intake<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    crate::bootstrap::init(&store).await.unwrap();
    let ids: Arc<dyn IdGen> = Arc::new(SequentialIdGen::new("id"));
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(1_000));
    let intake = Intake::open(Arc::clone(&store), Arc::clone(&ids), 10).await.unwrap();
    let splitter = Splitter::open(Arc::clone(&store), Arc::new(rules), ids, clock).await.unwrap();
    (splitter, intake, store)
}

#[tokio::test]
async fn matching_handler_produces_one_task_on_ready() {
    let handler = oj_core::test_support::handler("h1", "ping");
    let rules = FixedRules(HashMap::from([("ping".to_string(), vec![handler])]));
    let (splitter, intake, store) = harness(rules).await;

    let job_id = intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();
    let created = splitter.step().await.unwrap();
    assert_eq!(created, Some(1));

    assert!(store.exists(&schema::job_splitted_path(&job_id)).await.unwrap().is_some());
    let ready_entries = store.children(&format!("{}/entries", schema::READY_PATH)).await.unwrap();
    assert_eq!(ready_entries.len(), 1);
    let input_entries = store.children(&format!("{}/entries", schema::INPUT_PATH)).await.unwrap();
    assert!(input_entries.is_empty());
}

#[tokio::test]
async fn no_matching_handler_splits_to_zero_tasks() {
    let rules = FixedRules(HashMap::new());
    let (splitter, intake, store) = harness(rules).await;

    let job_id = intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();
    let created = splitter.step().await.unwrap();
    assert_eq!(created, Some(0));

    assert!(store.exists(&schema::job_splitted_path(&job_id)).await.unwrap().is_some());
    let ready_entries = store.children(&format!("{}/entries", schema::READY_PATH)).await.unwrap();
    assert!(ready_entries.is_empty());
}

#[tokio::test]
async fn cancelled_job_is_split_into_zero_tasks() {
    let handler = oj_core::test_support::handler("h1", "ping");
    let rules = FixedRules(HashMap::from([("ping".to_string(), vec![handler])]));
    let (splitter, intake, store) = harness(rules).await;

    let job_id = intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();
    intake.cancel(&job_id).await.unwrap();
    let created = splitter.step().await.unwrap();
    assert_eq!(created, Some(0));

    let ready_entries = store.children(&format!("{}/entries", schema::READY_PATH)).await.unwrap();
    assert!(ready_entries.is_empty());
}

#[tokio::test]
async fn step_blocks_on_empty_input_until_interrupted() {
    let (splitter, _intake, _store) = harness(FixedRules(HashMap::new())).await;
    let splitter = Arc::new(splitter);
    let waiter = {
        let splitter = Arc::clone(&splitter);
        tokio::spawn(async move { splitter.step().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "step must block rather than return None immediately");

    splitter.interrupt().await.unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), None);
}
