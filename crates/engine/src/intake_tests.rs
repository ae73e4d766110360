// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::SequentialIdGen;
use oj_storage::MemoryStore;

async fn new_intake(input_limit: u32) -> (Intake<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    crate::bootstrap::init(&store).await.unwrap();
    let ids: Arc<dyn IdGen> = Arc::new(SequentialIdGen::new("job"));
    let intake = Intake::open(Arc::clone(&store), ids, input_limit).await.unwrap();
    (intake, store)
}

#[tokio::test]
async fn submit_creates_job_record_and_input_entry() {
    let (intake, store) = new_intake(10).await;
    let event = oj_core::test_support::event("ping");

    let job_id = intake.submit(event, 1_000).await.unwrap();

    assert!(store.exists(&schema::job_path(&job_id)).await.unwrap().is_some());
    let entries = store.children(&format!("{}/entries", schema::INPUT_PATH)).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn submit_bumps_the_jobs_counter() {
    let (intake, store) = new_intake(10).await;
    intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();
    intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();

    let (data, _) = store.get(schema::JOBS_COUNTER_PATH).await.unwrap();
    assert_eq!(std::str::from_utf8(&data).unwrap(), "2");
}

#[tokio::test]
async fn submit_past_input_limit_is_overloaded() {
    let (intake, _store) = new_intake(1).await;
    intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();

    let result = intake.submit(oj_core::test_support::event("ping"), 1_000).await;
    assert_eq!(result.unwrap_err(), EngineError::Core(CoreError::Overloaded));
}

#[tokio::test]
async fn concurrent_submits_at_the_limit_admit_exactly_one() {
    let (intake, store) = new_intake(1).await;
    let intake = Arc::new(intake);
    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let intake = Arc::clone(&intake);
            tokio::spawn(async move { intake.submit(oj_core::test_support::event("ping"), 1_000).await })
        })
        .collect();

    let mut admitted = 0;
    let mut overloaded = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EngineError::Core(CoreError::Overloaded)) => overloaded += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(overloaded, 3);
    let entries = store.children(&format!("{}/entries", schema::INPUT_PATH)).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let (intake, store) = new_intake(10).await;
    let job_id = intake.submit(oj_core::test_support::event("ping"), 1_000).await.unwrap();

    intake.cancel(&job_id).await.unwrap();
    intake.cancel(&job_id).await.unwrap();

    assert!(store.exists(&schema::job_cancel_path(&job_id)).await.unwrap().is_some());
}
