// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelopes stored on the two sequential queues: `/input` (raw events
//! awaiting the splitter) and `/ready` (tasks awaiting a dispatch slot).

use crate::event::Event;
use crate::job::JobId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEnvelope {
    pub job_id: JobId,
    pub event: Event,
    pub enqueued: u64,
}

impl InputEnvelope {
    pub fn new(job_id: JobId, event: Event, enqueued_ms: u64) -> Self {
        Self { job_id, event, enqueued: enqueued_ms }
    }
}

/// Default `/ready` priority: the source defaults to 100 and the collector
/// falls back to this when a control task predates priority tracking.
pub const DEFAULT_PRIORITY: u32 = 100;

/// An entry on `/ready`. The sequential node name encodes `priority` so that
/// lower-priority-number entries sort first within the same dequeue pass;
/// `recycled_priority` (config) is used when re-enqueuing an abandoned task
/// so it does not starve behind fresh work forever but also does not cut
/// ahead of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyEnvelope {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub handler: String,
    pub priority: u32,
    pub enqueued: u64,
    /// Continuation state handed back to the execution client; empty for a
    /// freshly split task.
    pub stack: Option<Vec<u8>>,
    /// The owning event's extra attributes, passed to the execution client
    /// alongside `stack` on every dispatch.
    pub event_extra: serde_json::Value,
}

impl ReadyEnvelope {
    pub fn new(
        job_id: JobId,
        task_id: TaskId,
        handler: impl Into<String>,
        priority: u32,
        enqueued_ms: u64,
        stack: Option<Vec<u8>>,
        event_extra: serde_json::Value,
    ) -> Self {
        Self {
            job_id,
            task_id,
            handler: handler.into(),
            priority,
            enqueued: enqueued_ms,
            stack,
            event_extra,
        }
    }

    /// The sequential-node name prefix used so entries sort by priority
    /// first and arrival order second: `entry-<priority>-<seq>`.
    pub fn sort_prefix(&self) -> String {
        format!("entry-{:03}-", self.priority)
    }
}
