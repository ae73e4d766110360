// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seams the engine dispatches through: where handler rules come from,
//! and how a handler actually runs. Production and test implementations
//! live in `oj-adapters`; this crate only defines the contracts.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::handler::HandlerDescriptor;

/// Supplies the handler registry the matcher consults. A real deployment
/// loads this from rule definitions on disk; tests can hand back a fixed
/// in-memory set.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    async fn handlers_for(&self, handler_type: &str) -> Result<Vec<HandlerDescriptor>, CoreError>;
}

/// A sub-task a `Continue` outcome asks the dispatcher to mint: runs
/// `handler` against its own fresh job, seeded with `stack` as its initial
/// continuation state instead of starting from an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedTask {
    pub handler: String,
    pub stack: Vec<u8>,
}

/// What happened when a dispatched task was handed to its handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The handler ran to completion successfully.
    Finished,
    /// The handler ran to completion and failed; `message` is recorded on
    /// the task's `exc`.
    Failed { message: String },
    /// The handler yielded control and should be resumed later with the
    /// returned `stack` as its continuation state. May also ask for
    /// `spawned` sub-tasks to be started alongside the resumed one, each as
    /// a fresh job whose `parents` names this task's job.
    Continue { stack: Vec<u8>, spawned: Vec<SpawnedTask> },
}

/// Runs one task against its handler. `stack` carries forward continuation
/// state from a previous `Continue` outcome, or is empty for a fresh task.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn execute(
        &self,
        handler: &str,
        event_extra: &Value,
        stack: Option<&[u8]>,
    ) -> Result<ExecutionOutcome, CoreError>;
}
