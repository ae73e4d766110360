// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only views over the control tree. `get_info` takes the coarse
//! `/control/lock` only for the duration of the read, so it never contends
//! with the collector's per-job locks held during reap.

use std::sync::Arc;

use oj_core::{schema, JobId, TaskId, TaskRecord, TaskStatus};
use oj_storage::{KvStore, SingleLock, StoreError};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub created: Option<u64>,
    pub recycled: Option<u64>,
    pub finished: Option<u64>,
    pub exc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub job_id: JobId,
    pub added: u64,
    pub splitted: Option<u64>,
    pub cancelled: bool,
    pub tasks: Vec<TaskInfo>,
}

pub struct Query<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> Query<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All job ids currently tracked under `/control/jobs`.
    pub async fn get_jobs(&self) -> Result<Vec<JobId>, EngineError> {
        let names = self.store.children(schema::CONTROL_JOBS_PATH).await.map_err(EngineError::from)?;
        Ok(names.into_iter().map(JobId::new).collect())
    }

    /// True iff the job has been split and every one of its tasks has
    /// reached `status=finished` (or it has none at all).
    pub async fn get_finished(&self, job_id: &JobId) -> Result<bool, EngineError> {
        if self.store.exists(&schema::job_splitted_path(job_id)).await.map_err(EngineError::from)?.is_none() {
            return Ok(false);
        }
        for task in self.task_records(job_id).await? {
            if task.status != TaskStatus::Finished {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A consistent snapshot of one job's control state.
    pub async fn get_info(&self, job_id: &JobId) -> Result<JobInfo, EngineError> {
        let mut lock = SingleLock::new(Arc::clone(&self.store), schema::CONTROL_LOCK_PATH.to_string());
        lock.acquire().await.map_err(EngineError::from)?;
        let info = self.read_info(job_id).await;
        lock.release().await.map_err(EngineError::from)?;
        info
    }

    async fn read_info(&self, job_id: &JobId) -> Result<JobInfo, EngineError> {
        let (record_bytes, _) = match self.store.get(&schema::job_path(job_id)).await {
            Ok(found) => found,
            Err(StoreError::NoNode(path)) => {
                return Err(EngineError::from(oj_core::CoreError::NotFound(path)))
            }
            Err(err) => return Err(EngineError::from(err)),
        };
        let record: oj_core::JobRecord = oj_core::wire::decode(&record_bytes)
            .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("decoding job record: {err}"))))?;

        let splitted_path = schema::job_splitted_path(job_id);
        let splitted = match self.store.get(&splitted_path).await {
            Ok((bytes, _)) => std::str::from_utf8(&bytes).ok().and_then(|s| s.parse::<u64>().ok()),
            Err(StoreError::NoNode(_)) => None,
            Err(err) => return Err(EngineError::from(err)),
        };
        let cancelled = self.store.exists(&schema::job_cancel_path(job_id)).await.map_err(EngineError::from)?.is_some();

        let tasks_path = schema::tasks_path(job_id);
        let mut tasks = Vec::new();
        for task_id_str in self.store.children(&tasks_path).await.map_err(EngineError::from)? {
            let task_id = TaskId::new(task_id_str);
            let (bytes, _) = self.store.get(&schema::task_path(job_id, &task_id)).await.map_err(EngineError::from)?;
            let task: TaskRecord = oj_core::wire::decode(&bytes)
                .map_err(|err| EngineError::from(oj_core::CoreError::Invalid(format!("decoding task record: {err}"))))?;
            tasks.push(TaskInfo {
                task_id,
                status: task.status,
                created: task.created,
                recycled: task.recycled,
                finished: task.finished,
                exc: task.exc,
            });
        }

        Ok(JobInfo { job_id: job_id.clone(), added: record.added, splitted, cancelled, tasks })
    }

    async fn task_records(&self, job_id: &JobId) -> Result<Vec<TaskRecord>, EngineError> {
        let tasks_path = schema::tasks_path(job_id);
        let mut out = Vec::new();
        for task_id in self.store.children(&tasks_path).await.map_err(EngineError::from)? {
            let (bytes, _) = self.store.get(&format!("{tasks_path}/{task_id}")).await.map_err(EngineError::from)?;
            out.push(
                oj_core::wire::decode(&bytes).map_err(|err| {
                    EngineError::from(oj_core::CoreError::Invalid(format!("decoding task record: {err}")))
                })?,
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
