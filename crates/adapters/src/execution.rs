// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted [`ExecutionClient`] for tests and the demo daemon. Running
//! handler code in-process is out of scope for this crate; a real
//! deployment plugs in its own `ExecutionClient` (a subprocess runner, an
//! RPC call to a worker pool, ...) and never needs this one.

use async_trait::async_trait;
use oj_core::{CoreError, ExecutionClient, ExecutionOutcome};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded call to [`FakeExecutionClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteCall {
    pub handler: String,
    pub event_extra: Value,
    pub stack: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct FakeExecutionClient {
    inner: Arc<Mutex<State>>,
}

struct State {
    calls: Vec<ExecuteCall>,
    scripted: HashMap<String, ExecutionOutcome>,
    default_outcome: ExecutionOutcome,
    error: Option<String>,
}

impl Default for FakeExecutionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeExecutionClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                calls: Vec::new(),
                scripted: HashMap::new(),
                default_outcome: ExecutionOutcome::Finished,
                error: None,
            })),
        }
    }

    /// All recorded calls, in dispatch order.
    pub fn calls(&self) -> Vec<ExecuteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Script the outcome returned the next time (and every subsequent time)
    /// `handler` is executed.
    pub fn set_outcome(&self, handler: impl Into<String>, outcome: ExecutionOutcome) {
        self.inner.lock().scripted.insert(handler.into(), outcome);
    }

    /// Outcome returned for a handler with no scripted entry. Defaults to
    /// `Finished`.
    pub fn set_default_outcome(&self, outcome: ExecutionOutcome) {
        self.inner.lock().default_outcome = outcome;
    }

    /// Make the next (and every subsequent) `execute` call fail with this
    /// message instead of returning an outcome.
    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().error = Some(message.into());
    }
}

#[async_trait]
impl ExecutionClient for FakeExecutionClient {
    async fn execute(
        &self,
        handler: &str,
        event_extra: &Value,
        stack: Option<&[u8]>,
    ) -> Result<ExecutionOutcome, CoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ExecuteCall {
            handler: handler.to_string(),
            event_extra: event_extra.clone(),
            stack: stack.map(|s| s.to_vec()),
        });
        if let Some(message) = inner.error.take() {
            return Err(CoreError::Unavailable(message));
        }
        Ok(inner.scripted.get(handler).cloned().unwrap_or_else(|| inner.default_outcome.clone()))
    }
}
