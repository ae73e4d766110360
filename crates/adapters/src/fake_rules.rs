// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`RuleProvider`] for tests, so a test can hand back a fixed
//! handler set without writing HCL to a temp directory.

use async_trait::async_trait;
use oj_core::{CoreError, HandlerDescriptor, RuleProvider};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct FakeRuleProvider {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    registry: HashMap<String, Vec<HandlerDescriptor>>,
    calls: Vec<String>,
}

impl FakeRuleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handlers(&self, handler_type: impl Into<String>, handlers: Vec<HandlerDescriptor>) {
        self.inner.lock().registry.insert(handler_type.into(), handlers);
    }

    /// `handler_type` values passed to `handlers_for`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl RuleProvider for FakeRuleProvider {
    async fn handlers_for(&self, handler_type: &str) -> Result<Vec<HandlerDescriptor>, CoreError> {
        let mut inner = self.inner.lock();
        inner.calls.push(handler_type.to_string());
        Ok(inner.registry.get(handler_type).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_the_handlers_set_for_that_type() {
        let provider = FakeRuleProvider::new();
        provider.set_handlers("deploy", vec![HandlerDescriptor::new("a", "deploy")]);
        let handlers = provider.handlers_for("deploy").await.unwrap();
        assert_eq!(handlers.len(), 1);
        assert_eq!(provider.calls(), vec!["deploy"]);
    }

    #[tokio::test]
    async fn unconfigured_type_returns_empty_without_erroring() {
        let provider = FakeRuleProvider::new();
        assert!(provider.handlers_for("unknown").await.unwrap().is_empty());
    }
}
