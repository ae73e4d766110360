// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::comparator::Comparator;
use crate::event::Event;
use crate::handler::HandlerDescriptor;
use crate::job::{JobId, JobRecord};
use crate::task::{TaskId, TaskRecord};

pub fn event(handler_type: &str) -> Event {
    Event::new("test-host", "test-instance", handler_type)
}

pub fn event_with_extra(handler_type: &str, key: &str, value: impl Into<serde_json::Value>) -> Event {
    event(handler_type).with_extra(key, value)
}

pub fn handler(id: &str, handler_type: &str) -> HandlerDescriptor {
    HandlerDescriptor::new(id, handler_type)
}

pub fn handler_matching_extra(
    id: &str,
    handler_type: &str,
    key: &str,
    comparator: Comparator,
) -> HandlerDescriptor {
    let mut descriptor = HandlerDescriptor::new(id, handler_type);
    descriptor.extra_filters.insert(key.to_string(), comparator);
    descriptor
}

pub fn job_record(id: &str, added_ms: u64) -> (JobId, JobRecord) {
    (JobId::new(id), JobRecord::new("v1", vec![], added_ms))
}

pub fn task_record(id: &str, created_ms: u64) -> (TaskId, TaskRecord) {
    (TaskId::new(id), TaskRecord::new(created_ms))
}
