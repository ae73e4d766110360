// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepts one event from the API collaborator and turns it into a job:
//! mint an id, seed the job's control record, and append the envelope to
//! `/input` — all in one transaction, so a crash between steps never
//! leaves a half-created job.

use std::sync::Arc;

use oj_core::{schema, CoreError, Event, IdGen, InputEnvelope, JobId, JobRecord, RULE_VERSION};
use oj_storage::{
    transact_with_retry, AbortableLockingQueue, CreateMode, IncrementalCounter, KvStore, SingleLock, StoreError,
    Transaction,
};

use crate::error::EngineError;

pub struct Intake<S: KvStore> {
    store: Arc<S>,
    input: AbortableLockingQueue<S>,
    ids: Arc<dyn IdGen>,
    input_limit: u32,
}

impl<S: KvStore> Intake<S> {
    pub async fn open(
        store: Arc<S>,
        ids: Arc<dyn IdGen>,
        input_limit: u32,
    ) -> Result<Self, StoreError> {
        let input = AbortableLockingQueue::open(Arc::clone(&store), schema::INPUT_PATH).await?;
        Ok(Self { store, input, ids, input_limit })
    }

    /// Accept `event`, returning the newly minted job id. Refuses with
    /// [`CoreError::Overloaded`] if `/input` is already at `input_limit`.
    ///
    /// The depth check and the entry it guards run under a lock rather than
    /// as two independent steps, so two concurrent submits can't both read
    /// "one below the limit" and both push past it.
    pub async fn submit(&self, event: Event, now_ms: u64) -> Result<JobId, EngineError> {
        let mut lock = SingleLock::new(Arc::clone(&self.store), self.depth_lock_path());
        lock.acquire().await.map_err(EngineError::from)?;
        let result = self.submit_locked(event, now_ms).await;
        lock.release().await.map_err(EngineError::from)?;
        result
    }

    fn depth_lock_path(&self) -> String {
        format!("{}.depth_lock", self.input.entries_path())
    }

    async fn submit_locked(&self, event: Event, now_ms: u64) -> Result<JobId, EngineError> {
        let depth = self.store.children(&self.input.entries_path()).await.map_err(EngineError::from)?.len();
        if depth as u32 >= self.input_limit {
            return Err(EngineError::Core(CoreError::Overloaded));
        }

        let job_id = JobId::new(self.ids.next());
        let counter = IncrementalCounter::new(Arc::clone(&self.store), schema::JOBS_COUNTER_PATH);
        counter.increment().await?;

        let record = JobRecord::new(RULE_VERSION, Vec::new(), now_ms);
        let record_bytes = oj_core::wire::encode(&record).map_err(|err| {
            EngineError::Core(CoreError::Invalid(format!("encoding job record: {err}")))
        })?;

        let envelope = InputEnvelope::new(job_id.clone(), event, now_ms);
        let envelope_bytes = oj_core::wire::encode(&envelope).map_err(|err| {
            EngineError::Core(CoreError::Invalid(format!("encoding input envelope: {err}")))
        })?;

        let ops = Transaction::new()
            .create(schema::job_path(&job_id), record_bytes, CreateMode::Persistent)
            .create(schema::tasks_path(&job_id), Vec::new(), CreateMode::Persistent)
            .create(
                format!("{}/entry-", self.input.entries_path()),
                envelope_bytes,
                CreateMode::Sequential,
            )
            .build();

        transact_with_retry(self.store.as_ref(), ops).await.map_err(EngineError::from)?;
        Ok(job_id)
    }

    /// Mark a job cancelled. The splitter and dispatcher honor the marker
    /// the next time they touch the job.
    pub async fn cancel(&self, job_id: &JobId) -> Result<(), EngineError> {
        match self.store.create(schema::job_cancel_path(job_id), Vec::new(), CreateMode::Persistent).await {
            Ok(_) => Ok(()),
            Err(StoreError::NodeExists(_)) => Ok(()),
            Err(err) => Err(EngineError::from(err)),
        }
    }
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
