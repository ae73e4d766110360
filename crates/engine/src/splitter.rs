// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dequeues `/input`, resolves handlers through the matcher, and fans each
//! match out into a fresh task on `/ready`. A job whose event matches
//! nothing is marked `splitted` and has no tasks — it is reaped on the
//! collector's very next control sweep.

use std::sync::Arc;

use oj_core::{
    schema, Clock, CoreError, IdGen, InputEnvelope, JobId, ReadyEnvelope, RuleProvider, TaskId,
    TaskRecord, DEFAULT_PRIORITY,
};
use oj_storage::{transact_with_retry, AbortableLockingQueue, CreateMode, KvStore, StoreError, Transaction};

use crate::error::EngineError;
use crate::matcher::resolve_handlers;

pub struct Splitter<S: KvStore> {
    store: Arc<S>,
    input: AbortableLockingQueue<S>,
    ready: AbortableLockingQueue<S>,
    rules: Arc<dyn RuleProvider>,
    ids: Arc<dyn IdGen>,
    clock: Arc<dyn Clock>,
}

impl<S: KvStore> Splitter<S> {
    pub async fn open(
        store: Arc<S>,
        rules: Arc<dyn RuleProvider>,
        ids: Arc<dyn IdGen>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let input = AbortableLockingQueue::open(Arc::clone(&store), schema::INPUT_PATH).await?;
        let ready = AbortableLockingQueue::open(Arc::clone(&store), schema::READY_PATH).await?;
        Ok(Self { store, input, ready, rules, ids, clock })
    }

    /// Wake a blocked [`Self::step`] with nothing to split, for cooperative
    /// shutdown.
    pub async fn interrupt(&self) -> Result<(), EngineError> {
        self.input.interrupt().await.map_err(EngineError::from)
    }

    /// Block for the next `/input` entry and split it. Returns the number of
    /// tasks created (zero if nothing matched or the job was cancelled).
    pub async fn step(&self) -> Result<Option<usize>, EngineError> {
        let Some(item) = self.input.get().await.map_err(EngineError::from)? else {
            return Ok(None);
        };
        let envelope: InputEnvelope = oj_core::wire::decode(&item.data)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("decoding input envelope: {err}"))))?;

        let result = self.split_one(&envelope).await;
        match &result {
            Ok(_) => {
                self.input.consume(&item.name).await.map_err(EngineError::from)?;
            }
            Err(_) => {
                let _ = self.input.abort_get(&item.name).await;
            }
        }
        result.map(Some)
    }

    async fn split_one(&self, envelope: &InputEnvelope) -> Result<usize, EngineError> {
        let job_id = &envelope.job_id;
        let now = self.clock.epoch_ms();
        if self.store.exists(&schema::job_cancel_path(job_id)).await.map_err(EngineError::from)?.is_some() {
            self.mark_splitted(job_id, now).await?;
            return Ok(0);
        }

        let handlers = resolve_handlers(self.rules.as_ref(), &envelope.event).await?;

        if handlers.is_empty() {
            self.mark_splitted(job_id, now).await?;
            return Ok(0);
        }

        let event_extra = serde_json::to_value(&envelope.event.extra)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding event extra: {err}"))))?;

        // One transaction for every matched handler's task plus the splitted
        // marker, so a fault partway through never leaves some handlers
        // dispatched and others not — a retry that follows a total failure
        // starts from a clean slate instead of re-creating tasks for
        // handlers whose task already committed.
        let mut ops = Transaction::new();
        for handler in &handlers {
            let task_id = TaskId::new(self.ids.next());
            ops = self.append_task(ops, job_id, &task_id, &handler.id, now, event_extra.clone())?;
        }
        ops = ops.create(schema::job_splitted_path(job_id), now.to_string().into_bytes(), CreateMode::Persistent);
        transact_with_retry(self.store.as_ref(), ops.build()).await.map_err(EngineError::from)?;
        Ok(handlers.len())
    }

    fn append_task(
        &self,
        ops: Transaction,
        job_id: &JobId,
        task_id: &TaskId,
        handler: &str,
        now: u64,
        event_extra: serde_json::Value,
    ) -> Result<Transaction, EngineError> {
        let record = TaskRecord::new(now);
        let record_bytes = oj_core::wire::encode(&record)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding task record: {err}"))))?;

        let ready = ReadyEnvelope::new(
            job_id.clone(),
            task_id.clone(),
            handler,
            DEFAULT_PRIORITY,
            now,
            None,
            event_extra,
        );
        let ready_bytes = oj_core::wire::encode(&ready)
            .map_err(|err| EngineError::Core(CoreError::Invalid(format!("encoding ready envelope: {err}"))))?;

        Ok(ops
            .create(schema::task_path(job_id, task_id), record_bytes, CreateMode::Persistent)
            .create(
                format!("{}/{}", self.ready.entries_path(), ready.sort_prefix()),
                ready_bytes,
                CreateMode::Sequential,
            ))
    }

    async fn mark_splitted(&self, job_id: &JobId, now: u64) -> Result<(), EngineError> {
        let path = schema::job_splitted_path(job_id);
        match self.store.create(&path, now.to_string().into_bytes(), CreateMode::Persistent).await {
            Ok(_) => Ok(()),
            Err(StoreError::NodeExists(_)) => Ok(()),
            Err(err) => Err(EngineError::from(err)),
        }
    }
}

#[cfg(test)]
#[path = "splitter_tests.rs"]
mod tests;
