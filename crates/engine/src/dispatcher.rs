// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dequeues `/ready`, claims a task under an ephemeral lock, and drives it
//! through the execution collaborator. Losing the session between claiming
//! and finishing leaves the lock's ephemeral child absent, which is how
//! the collector later detects abandonment.

use std::sync::Arc;

use oj_core::{
    schema, Clock, CoreError, ExecutionClient, ExecutionOutcome, IdGen, JobId, JobRecord, ReadyEnvelope,
    RunningRecord, SpawnedTask, TaskId, TaskRecord, TaskStatus, RULE_VERSION,
};
use oj_storage::{transact_with_retry, AbortableLockingQueue, CreateMode, KvStore, StoreError, Transaction};

use crate::error::EngineError;

pub struct Dispatcher<S: KvStore> {
    store: Arc<S>,
    ready: AbortableLockingQueue<S>,
    execution: Arc<dyn ExecutionClient>,
    ids: Arc<dyn IdGen>,
    clock: Arc<dyn Clock>,
}

impl<S: KvStore> Dispatcher<S> {
    pub async fn open(
        store: Arc<S>,
        execution: Arc<dyn ExecutionClient>,
        ids: Arc<dyn IdGen>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let ready = AbortableLockingQueue::open(Arc::clone(&store), schema::READY_PATH).await?;
        Ok(Self { store, ready, execution, ids, clock })
    }

    /// Wake a blocked [`Self::step`] with nothing to dispatch, for
    /// cooperative shutdown.
    pub async fn interrupt(&self) -> Result<(), EngineError> {
        self.ready.interrupt().await.map_err(EngineError::from)
    }

    /// Block for the next `/ready` entry and drive it to a terminal or
    /// continuation state. Returns the dispatched task id, or `None` if
    /// there was nothing to claim.
    pub async fn step(&self) -> Result<Option<TaskId>, EngineError> {
        let Some(item) = self.ready.get().await.map_err(EngineError::from)? else {
            return Ok(None);
        };
        let envelope: ReadyEnvelope = oj_core::wire::decode(&item.data)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("decoding ready envelope: {err}"))))?;

        let result = self.dispatch_one(&envelope).await;
        match &result {
            Ok(_) => self.ready.consume(&item.name).await.map_err(EngineError::from)?,
            Err(_) => {
                let _ = self.ready.abort_get(&item.name).await;
            }
        }
        result.map(|_| Some(envelope.task_id))
    }

    async fn dispatch_one(&self, envelope: &ReadyEnvelope) -> Result<(), EngineError> {
        if self
            .store
            .exists(&schema::job_cancel_path(&envelope.job_id))
            .await
            .map_err(EngineError::from)?
            .is_some()
        {
            return self.finish_task(&envelope.job_id, &envelope.task_id, None).await;
        }

        let now = self.clock.epoch_ms();
        self.claim(envelope, now).await?;

        let outcome = self
            .execution
            .execute(&envelope.handler, &envelope.event_extra, envelope.stack.as_deref())
            .await
            .map_err(EngineError::Core)?;

        self.apply_outcome(envelope, outcome).await
    }

    async fn claim(&self, envelope: &ReadyEnvelope, now: u64) -> Result<(), EngineError> {
        let running = RunningRecord::new(
            envelope.job_id.clone(),
            envelope.handler.clone(),
            now,
            envelope.event_extra.clone(),
            envelope.priority,
        );
        let running_bytes = oj_core::wire::encode(&running)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding running record: {err}"))))?;

        let task_path = schema::task_path(&envelope.job_id, &envelope.task_id);
        let (task_bytes, task_stat) = self.store.get(&task_path).await.map_err(EngineError::from)?;
        let mut task: TaskRecord = oj_core::wire::decode(&task_bytes)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("decoding task record: {err}"))))?;
        if task.created.is_none() {
            task.created = Some(now);
        }
        task.status = TaskStatus::Ready;
        let task_bytes = oj_core::wire::encode(&task)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding task record: {err}"))))?;

        let ops = Transaction::new()
            .create(
                schema::running_path(&envelope.task_id),
                running_bytes,
                CreateMode::Persistent,
            )
            .create(schema::running_lock_path(&envelope.task_id), Vec::new(), CreateMode::Ephemeral)
            .set_data(task_path, task_bytes, Some(task_stat.version))
            .build();
        transact_with_retry(self.store.as_ref(), ops).await.map_err(EngineError::from)?;
        Ok(())
    }

    async fn apply_outcome(&self, envelope: &ReadyEnvelope, outcome: ExecutionOutcome) -> Result<(), EngineError> {
        match outcome {
            ExecutionOutcome::Finished => {
                self.finish_task(&envelope.job_id, &envelope.task_id, None).await
            }
            ExecutionOutcome::Failed { message } => {
                self.finish_task(&envelope.job_id, &envelope.task_id, Some(message)).await
            }
            ExecutionOutcome::Continue { stack, spawned } => {
                self.requeue_continuation(envelope, stack, spawned).await
            }
        }
    }

    /// Delete the running record and its lock, and mark the control task
    /// finished (with `exc` set when `failure` is `Some`).
    async fn finish_task(&self, job_id: &JobId, task_id: &TaskId, failure: Option<String>) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let task_path = schema::task_path(job_id, task_id);
        let (task_bytes, task_stat) = self.store.get(&task_path).await.map_err(EngineError::from)?;
        let mut task: TaskRecord = oj_core::wire::decode(&task_bytes)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("decoding task record: {err}"))))?;
        task.status = TaskStatus::Finished;
        task.finished = Some(now);
        task.exc = failure;
        let task_bytes = oj_core::wire::encode(&task)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding task record: {err}"))))?;

        let mut txn = Transaction::new().set_data(task_path, task_bytes, Some(task_stat.version));
        if self.store.exists(&schema::running_path(task_id)).await.map_err(EngineError::from)?.is_some() {
            txn = txn
                .delete(schema::running_lock_path(task_id), None)
                .delete(schema::running_path(task_id), None);
        }
        transact_with_retry(self.store.as_ref(), txn.build()).await.map_err(EngineError::from)?;
        Ok(())
    }

    /// A handler yielded: drop the running record, push a fresh `/ready`
    /// entry carrying the new continuation stack, and mint one new job per
    /// `spawned` sub-task so it runs alongside the resumed one. Everything
    /// happens in one transaction, so a crash never leaves a spawned job
    /// half-created while its parent's continuation is already requeued.
    async fn requeue_continuation(
        &self,
        envelope: &ReadyEnvelope,
        stack: Vec<u8>,
        spawned: Vec<SpawnedTask>,
    ) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        let next = ReadyEnvelope::new(
            envelope.job_id.clone(),
            envelope.task_id.clone(),
            envelope.handler.clone(),
            envelope.priority,
            now,
            Some(stack),
            envelope.event_extra.clone(),
        );
        let next_bytes = oj_core::wire::encode(&next)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding ready envelope: {err}"))))?;

        let mut ops = Transaction::new()
            .delete(schema::running_lock_path(&envelope.task_id), None)
            .delete(schema::running_path(&envelope.task_id), None)
            .create(
                format!("{}/{}", self.ready.entries_path(), next.sort_prefix()),
                next_bytes,
                CreateMode::Sequential,
            );
        for spawn in spawned {
            ops = self.spawn_task(ops, envelope, now, spawn)?;
        }

        transact_with_retry(self.store.as_ref(), ops.build()).await.map_err(EngineError::from)?;
        Ok(())
    }

    /// Append the ops for one spawned sub-task: a new job naming
    /// `envelope.job_id` as its parent, a single task under it seeded with
    /// `spawn`'s handler and stack, and a `/ready` entry dispatching that
    /// task right away. The new job is marked splitted immediately — it
    /// already has its one and only task, there is nothing left to split.
    fn spawn_task(
        &self,
        ops: Transaction,
        envelope: &ReadyEnvelope,
        now: u64,
        spawn: SpawnedTask,
    ) -> Result<Transaction, EngineError> {
        let job_id = JobId::new(self.ids.next());
        let task_id = TaskId::new(self.ids.next());

        let record = JobRecord::new(RULE_VERSION, vec![envelope.job_id.clone()], now);
        let record_bytes = oj_core::wire::encode(&record)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding job record: {err}"))))?;

        let task = TaskRecord::new(now);
        let task_bytes = oj_core::wire::encode(&task)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding task record: {err}"))))?;

        let ready = ReadyEnvelope::new(
            job_id.clone(),
            task_id.clone(),
            spawn.handler,
            envelope.priority,
            now,
            Some(spawn.stack),
            envelope.event_extra.clone(),
        );
        let ready_bytes = oj_core::wire::encode(&ready)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding ready envelope: {err}"))))?;

        Ok(ops
            .create(schema::job_path(&job_id), record_bytes, CreateMode::Persistent)
            .create(schema::tasks_path(&job_id), Vec::new(), CreateMode::Persistent)
            .create(schema::task_path(&job_id, &task_id), task_bytes, CreateMode::Persistent)
            .create(schema::job_splitted_path(&job_id), now.to_string().into_bytes(), CreateMode::Persistent)
            .create(
                format!("{}/{}", self.ready.entries_path(), ready.sort_prefix()),
                ready_bytes,
                CreateMode::Sequential,
            ))
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
