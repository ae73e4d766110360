// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oj_core::{FakeClock, JobId, TaskId};
use oj_storage::MemoryStore;

const DELAY_MS: u64 = 5_000;

async fn new_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    crate::bootstrap::init(&store).await.unwrap();
    store
}

async fn seed_job(store: &Arc<MemoryStore>, job_id: &JobId, splitted: bool) {
    store.create(&schema::job_path(job_id), Vec::new(), CreateMode::Persistent).await.unwrap();
    store.create(&schema::tasks_path(job_id), Vec::new(), CreateMode::Persistent).await.unwrap();
    if splitted {
        store.create(&schema::job_splitted_path(job_id), Vec::new(), CreateMode::Persistent).await.unwrap();
    }
}

async fn seed_task(store: &Arc<MemoryStore>, job_id: &JobId, task_id: &TaskId, task: &TaskRecord) {
    store
        .create(
            &schema::task_path(job_id, task_id),
            oj_core::wire::encode(task).unwrap(),
            CreateMode::Persistent,
        )
        .await
        .unwrap();
}

async fn seed_running(store: &Arc<MemoryStore>, job_id: &JobId, task_id: &TaskId, handler: &str) {
    seed_running_with_priority(store, job_id, task_id, handler, oj_core::DEFAULT_PRIORITY).await
}

async fn seed_running_with_priority(
    store: &Arc<MemoryStore>,
    job_id: &JobId,
    task_id: &TaskId,
    handler: &str,
    priority: u32,
) {
    let running = RunningRecord::new(job_id.clone(), handler, 0, serde_json::Value::Null, priority);
    store
        .create(
            &schema::running_path(task_id),
            oj_core::wire::encode(&running).unwrap(),
            CreateMode::Persistent,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn orphan_running_node_with_no_control_task_is_removed() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(10_000));
    let task_id = TaskId::new("t-orphan");
    store
        .create(
            &schema::running_path(&task_id),
            oj_core::wire::encode(&RunningRecord::new(JobId::new("ghost"), "h", 0, serde_json::Value::Null, oj_core::DEFAULT_PRIORITY)).unwrap(),
            CreateMode::Persistent,
        )
        .await
        .unwrap();

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_none());
}

#[tokio::test]
async fn young_running_task_is_left_alone() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(1_000));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    seed_task(&store, &job_id, &task_id, &TaskRecord::new(1_000)).await;
    seed_running(&store, &job_id, &task_id, "h1").await;
    store
        .create(&schema::running_lock_path(&task_id), Vec::new(), CreateMode::Ephemeral)
        .await
        .unwrap();

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_some());
}

#[tokio::test]
async fn live_worker_holding_lock_is_never_raced() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(100_000));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    seed_task(&store, &job_id, &task_id, &TaskRecord::new(0)).await;
    seed_running(&store, &job_id, &task_id, "h1").await;
    // A live worker's session still holds the ephemeral lock.
    let worker_session = store.connect();
    worker_session
        .create(&schema::running_lock_path(&task_id), Vec::new(), CreateMode::Ephemeral)
        .await
        .unwrap();

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_some());
}

#[tokio::test]
async fn abandoned_unfinished_task_is_requeued_with_recycled_set() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(100_000));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    seed_task(&store, &job_id, &task_id, &TaskRecord::new(0)).await;
    seed_running(&store, &job_id, &task_id, "h1").await;
    // No ephemeral lock present: the owning worker's session died.

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_none());
    let ready_entries = store.children(&format!("{}/entries", schema::READY_PATH)).await.unwrap();
    assert_eq!(ready_entries.len(), 1);

    let (bytes, _) = store.get(&schema::task_path(&job_id, &task_id)).await.unwrap();
    let task: TaskRecord = oj_core::wire::decode(&bytes).unwrap();
    assert!(task.recycled.is_some());
}

#[tokio::test]
async fn abandoned_finished_task_is_just_removed_not_requeued() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(100_000));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    let mut task = TaskRecord::new(0);
    task.status = TaskStatus::Finished;
    task.finished = Some(1);
    seed_task(&store, &job_id, &task_id, &task).await;
    seed_running(&store, &job_id, &task_id, "h1").await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_none());
    let ready_entries = store.children(&format!("{}/entries", schema::READY_PATH)).await.unwrap();
    assert!(ready_entries.is_empty());
}

#[tokio::test]
async fn job_with_all_tasks_finished_is_reaped() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    let mut task = TaskRecord::new(0);
    task.status = TaskStatus::Finished;
    task.finished = Some(1);
    seed_task(&store, &job_id, &task_id, &task).await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::job_path(&job_id)).await.unwrap().is_none());
}

#[tokio::test]
async fn job_with_zero_tasks_and_splitted_is_reaped() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let job_id = JobId::new("job-1");
    seed_job(&store, &job_id, true).await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::job_path(&job_id)).await.unwrap().is_none());
}

#[tokio::test]
async fn job_not_yet_splitted_is_never_reaped() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let job_id = JobId::new("job-1");
    seed_job(&store, &job_id, false).await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::job_path(&job_id)).await.unwrap().is_some());
}

#[tokio::test]
async fn job_with_unfinished_task_is_not_reaped() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    seed_task(&store, &job_id, &task_id, &TaskRecord::new(0)).await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    assert!(store.exists(&schema::job_path(&job_id)).await.unwrap().is_some());
}

#[tokio::test]
async fn two_collectors_racing_an_orphan_only_one_wins() {
    let store = new_store().await;
    let task_id = TaskId::new("t-orphan");
    store
        .create(
            &schema::running_path(&task_id),
            oj_core::wire::encode(&RunningRecord::new(JobId::new("ghost"), "h", 0, serde_json::Value::Null, oj_core::DEFAULT_PRIORITY)).unwrap(),
            CreateMode::Persistent,
        )
        .await
        .unwrap();

    let store_a = Arc::clone(&store);
    let store_b = Arc::new(store.connect());
    let collector_a = Collector::open(store_a, Arc::new(FakeClock::new(10_000)), DELAY_MS, 100).await.unwrap();
    let collector_b = Collector::open(store_b, Arc::new(FakeClock::new(10_000)), DELAY_MS, 100).await.unwrap();

    let (a, b) = tokio::join!(collector_a.sweep(), collector_b.sweep());
    a.unwrap();
    b.unwrap();

    assert!(store.exists(&schema::running_path(&task_id)).await.unwrap().is_none());
}

#[tokio::test]
async fn requeued_task_keeps_its_original_priority() {
    let store = new_store().await;
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(100_000));
    let job_id = JobId::new("job-1");
    let task_id = TaskId::new("task-1");
    seed_job(&store, &job_id, true).await;
    seed_task(&store, &job_id, &task_id, &TaskRecord::new(0)).await;
    seed_running_with_priority(&store, &job_id, &task_id, "h1", 7).await;

    let collector = Collector::open(Arc::clone(&store), clock, DELAY_MS, 100).await.unwrap();
    collector.sweep().await.unwrap();

    let ready_path = format!("{}/entries", schema::READY_PATH);
    let entries = store.children(&ready_path).await.unwrap();
    assert_eq!(entries.len(), 1);
    let (bytes, _) = store.get(&format!("{ready_path}/{}", entries[0])).await.unwrap();
    let requeued: oj_core::ReadyEnvelope = oj_core::wire::decode(&bytes).unwrap();
    assert_eq!(requeued.priority, 7);
}
