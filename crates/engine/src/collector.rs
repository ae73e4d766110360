// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two periodic sweeps that reclaim abandoned work and garbage-collect
//! finished jobs. Both sweeps only ever touch a task or job after winning
//! its `SingleLock`, so two collectors racing on the same cluster never
//! double-requeue or double-reap.

use std::sync::Arc;

use oj_core::{schema, Clock, ReadyEnvelope, RunningRecord, TaskRecord, TaskStatus};
use oj_storage::{transact_with_retry, AbortableLockingQueue, CreateMode, KvStore, SingleLock, StoreError, Transaction};

use crate::error::EngineError;

pub struct Collector<S: KvStore> {
    store: Arc<S>,
    ready: AbortableLockingQueue<S>,
    clock: Arc<dyn Clock>,
    /// How long a just-claimed or just-recycled task is left alone before it
    /// can be considered abandoned (`collector.delay`).
    delay_ms: u64,
    /// Priority assigned to a requeued task (`collector.recycled_priority`).
    recycled_priority: u32,
}

impl<S: KvStore> Collector<S> {
    pub async fn open(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        delay_ms: u64,
        recycled_priority: u32,
    ) -> Result<Self, StoreError> {
        let ready = AbortableLockingQueue::open(Arc::clone(&store), schema::READY_PATH).await?;
        Ok(Self { store, ready, clock, delay_ms, recycled_priority })
    }

    /// Run both sweeps once. Callers loop this on `collector.interval`.
    pub async fn sweep(&self) -> Result<(), EngineError> {
        self.poll_running().await?;
        self.poll_control().await?;
        Ok(())
    }

    /// Reclaim abandoned tasks and clean up orphaned running records.
    async fn poll_running(&self) -> Result<(), EngineError> {
        for task_id_str in self.store.children(schema::RUNNING_PATH).await.map_err(EngineError::from)? {
            let task_id = oj_core::TaskId::new(task_id_str);
            self.poll_one_running(&task_id).await?;
        }
        Ok(())
    }

    async fn poll_one_running(&self, task_id: &oj_core::TaskId) -> Result<(), EngineError> {
        let running_path = schema::running_path(task_id);
        let (running_bytes, _) = match self.store.get(&running_path).await {
            Ok(found) => found,
            Err(StoreError::NoNode(_)) => return Ok(()),
            Err(err) => return Err(EngineError::from(err)),
        };
        let running: RunningRecord = oj_core::wire::decode(&running_bytes)
            .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("decoding running record: {err}"))))?;

        let task_path = schema::task_path(&running.job_id, task_id);
        let task = match self.store.get(&task_path).await {
            Ok((bytes, stat)) => {
                let record: TaskRecord = oj_core::wire::decode(&bytes).map_err(|err| {
                    EngineError::from(oj_core::CoreError::Invalid(format!("decoding task record: {err}")))
                })?;
                Some((record, stat.version))
            }
            Err(StoreError::NoNode(_)) => None,
            Err(err) => return Err(EngineError::from(err)),
        };

        let Some((task, task_version)) = task else {
            // Garbage: a running record with no owning control task.
            let mut lock = SingleLock::new(Arc::clone(&self.store), schema::running_lock_path(task_id));
            if lock.try_acquire().await.map_err(EngineError::from)? {
                self.remove_running(task_id).await?;
            }
            return Ok(());
        };

        let newest = task.recycled.or(task.created).unwrap_or(0);
        if newest + self.delay_ms > self.clock.epoch_ms() {
            return Ok(()); // too young to be considered abandoned
        }

        let mut lock = SingleLock::new(Arc::clone(&self.store), schema::running_lock_path(task_id));
        if !lock.try_acquire().await.map_err(EngineError::from)? {
            return Ok(()); // a live worker still holds the ephemeral lock
        }

        if task.status == TaskStatus::Finished {
            self.remove_running(task_id).await?;
        } else {
            self.push_back_running(task_id, &running, task_path, task_version).await?;
        }
        Ok(())
    }

    async fn remove_running(&self, task_id: &oj_core::TaskId) -> Result<(), EngineError> {
        let ops = Transaction::new()
            .delete(schema::running_lock_path(task_id), None)
            .delete(schema::running_path(task_id), None)
            .build();
        transact_with_retry(self.store.as_ref(), ops).await.map_err(EngineError::from)?;
        Ok(())
    }

    async fn push_back_running(
        &self,
        task_id: &oj_core::TaskId,
        running: &RunningRecord,
        task_path: String,
        task_version: u64,
    ) -> Result<(), EngineError> {
        let now = self.clock.epoch_ms();
        // Preserve the priority the task was originally dequeued with;
        // `recycled_priority` is only a fallback for a running record
        // written before this field existed, never produced by this
        // implementation.
        tracing::trace!(
            task = %task_id,
            priority = running.priority,
            fallback_priority = self.recycled_priority,
            "requeueing abandoned task"
        );
        let next = ReadyEnvelope::new(
            running.job_id.clone(),
            task_id.clone(),
            running.handler.clone(),
            running.priority,
            now,
            None,
            running.event_extra.clone(),
        );
        let next_bytes = oj_core::wire::encode(&next)
            .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("encoding ready envelope: {err}"))))?;

        let (task_bytes, _) = self.store.get(&task_path).await.map_err(EngineError::from)?;
        let mut task: TaskRecord = oj_core::wire::decode(&task_bytes)
            .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("decoding task record: {err}"))))?;
        task.recycled = Some(now);
        let task_bytes = oj_core::wire::encode(&task)
            .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("encoding task record: {err}"))))?;

        let ops = Transaction::new()
            .delete(schema::running_lock_path(task_id), None)
            .delete(schema::running_path(task_id), None)
            .create(
                format!("{}/{}", self.ready.entries_path(), next.sort_prefix()),
                next_bytes,
                CreateMode::Sequential,
            )
            .set_data(task_path, task_bytes, Some(task_version))
            .build();
        transact_with_retry(self.store.as_ref(), ops).await.map_err(EngineError::from)?;
        Ok(())
    }

    /// Reap jobs whose tasks are all finished.
    async fn poll_control(&self) -> Result<(), EngineError> {
        for job_id_str in self.store.children(schema::CONTROL_JOBS_PATH).await.map_err(EngineError::from)? {
            let job_id = oj_core::JobId::new(job_id_str);
            if !self.is_reapable(&job_id).await? {
                continue;
            }
            let mut lock = SingleLock::new(Arc::clone(&self.store), schema::job_lock_path(&job_id));
            if lock.try_acquire().await.map_err(EngineError::from)? {
                self.remove_control(&job_id).await?;
            }
        }
        Ok(())
    }

    async fn is_reapable(&self, job_id: &oj_core::JobId) -> Result<bool, EngineError> {
        if self.store.exists(&schema::job_splitted_path(job_id)).await.map_err(EngineError::from)?.is_none() {
            return Ok(false); // splitter has not finished with this job yet
        }
        let tasks_path = schema::tasks_path(job_id);
        for task_id in self.store.children(&tasks_path).await.map_err(EngineError::from)? {
            let (bytes, _) = self.store.get(&format!("{tasks_path}/{task_id}")).await.map_err(EngineError::from)?;
            let task: TaskRecord = oj_core::wire::decode(&bytes)
                .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("decoding task record: {err}"))))?;
            if task.status != TaskStatus::Finished {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn remove_control(&self, job_id: &oj_core::JobId) -> Result<(), EngineError> {
        let mut txn = Transaction::new();
        let tasks_path = schema::tasks_path(job_id);
        for task_id in self.store.children(&tasks_path).await.map_err(EngineError::from)? {
            txn = txn.delete(format!("{tasks_path}/{task_id}"), None);
        }
        txn = txn.delete(tasks_path, None);
        if self.store.exists(&schema::job_lock_path(job_id)).await.map_err(EngineError::from)?.is_some() {
            txn = txn.delete(schema::job_lock_path(job_id), None);
        }
        if self.store.exists(&schema::job_cancel_path(job_id)).await.map_err(EngineError::from)?.is_some() {
            txn = txn.delete(schema::job_cancel_path(job_id), None);
        }
        txn = txn
            .delete(schema::job_splitted_path(job_id), None)
            .delete(schema::job_path(job_id), None);
        transact_with_retry(self.store.as_ref(), txn.build()).await.map_err(EngineError::from)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
