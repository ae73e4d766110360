// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running records: one entry per task currently claimed by a worker,
//! addressed under `/running/<task_id>`. The entry's `lock` child is
//! ephemeral and its loss is how the collector detects a dead worker.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// Where a claimed task is in its execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningState {
    /// Handed to the execution client, result not yet observed.
    Executing,
    /// The execution client returned `Continue`; waiting to be picked back
    /// up and re-driven with the saved stack.
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningRecord {
    pub job_id: JobId,
    pub handler: String,
    pub state: RunningState,
    pub claimed: u64,
    /// The owning event's extra attributes, carried alongside the
    /// continuation `stack` so a resumed handler still sees the event that
    /// started it.
    pub event_extra: serde_json::Value,
    /// The priority this task was dequeued from `/ready` with, carried so
    /// the collector can requeue an abandoned task at its original priority
    /// instead of always falling back to `collector.recycled_priority`.
    pub priority: u32,
}

impl RunningRecord {
    pub fn new(
        job_id: JobId,
        handler: impl Into<String>,
        claimed_ms: u64,
        event_extra: serde_json::Value,
        priority: u32,
    ) -> Self {
        Self {
            job_id,
            handler: handler.into(),
            state: RunningState::Executing,
            claimed: claimed_ms,
            event_extra,
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_running_record_starts_executing() {
        let record = RunningRecord::new(JobId::new("job-1"), "my.handler", 10, serde_json::Value::Null, 100);
        assert_eq!(record.state, RunningState::Executing);
        assert_eq!(record.handler, "my.handler");
        assert_eq!(record.priority, 100);
    }
}
