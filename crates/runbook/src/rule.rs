// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The handler-rule schema: a rule file declares, per `handler_type`, the
//! set of handlers that should run for a matching event.
//! Filter values may be a bare literal (defaulting to `Eq`, same as
//! [`oj_core::comparator::Comparator`]'s own `From<Value>`) or an explicit
//! tagged comparator object.

use std::collections::HashMap;

use indexmap::IndexMap;
use oj_core::{Comparator, HandlerDescriptor};
use serde::Deserialize;
use serde_json::Value;

/// A filter value as authored in a rule file: either a bare literal or a
/// tagged `{ op = "...", value = ... }` comparator.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FilterValue {
    Tagged(Comparator),
    Bare(Value),
}

impl From<FilterValue> for Comparator {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Tagged(comparator) => comparator,
            FilterValue::Bare(value) => Comparator::from(value),
        }
    }
}

/// One `handler "<handler_type>" "<id>" { ... }` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandlerBlock {
    #[serde(default)]
    event_filters: IndexMap<String, FilterValue>,
    #[serde(default)]
    extra_filters: IndexMap<String, FilterValue>,
    #[serde(default)]
    disabled: bool,
}

impl HandlerBlock {
    fn into_descriptor(self, id: String, handler_type: String) -> HandlerDescriptor {
        HandlerDescriptor {
            id,
            handler_type,
            event_filters: self.event_filters.into_iter().map(|(key, value)| (key, value.into())).collect(),
            extra_filters: self.extra_filters.into_iter().map(|(key, value)| (key, value.into())).collect(),
            disabled: self.disabled,
        }
    }
}

/// A parsed rule file. The outer map key is `handler_type`, the inner map
/// key is the handler's `id` within that type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFile {
    #[serde(default, alias = "handler")]
    handlers: HashMap<String, HashMap<String, HandlerBlock>>,
}

impl RuleFile {
    /// Flatten into descriptors, losing the handler_type grouping.
    pub fn into_descriptors(self) -> Vec<HandlerDescriptor> {
        self.handlers
            .into_iter()
            .flat_map(|(handler_type, blocks)| {
                blocks.into_iter().map(move |(id, block)| block.into_descriptor(id, handler_type.clone()))
            })
            .collect()
    }

    /// Group descriptors by `handler_type`, the shape `RuleProvider::handlers_for`
    /// looks up against.
    pub fn into_registry(self) -> HashMap<String, Vec<HandlerDescriptor>> {
        let mut registry: HashMap<String, Vec<HandlerDescriptor>> = HashMap::new();
        for descriptor in self.into_descriptors() {
            registry.entry(descriptor.handler_type.clone()).or_default().push(descriptor);
        }
        registry
    }

    /// Merge another rule file's handlers into this one. A later file's
    /// block for the same `(handler_type, id)` pair replaces the earlier one,
    /// mirroring last-write-wins for a directory of rule files loaded in
    /// sorted order.
    pub fn merge(&mut self, other: RuleFile) {
        for (handler_type, blocks) in other.handlers {
            self.handlers.entry(handler_type).or_default().extend(blocks);
        }
    }
}
