// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler descriptors and the pure matching function: given an event and a
//! handler's filters, decide whether the handler should run.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comparator::Comparator;
use crate::event::Event;

/// A registered rule: "when an event of `handler_type` matches these
/// filters, run this handler". `id` names the handler for logging and for
/// `disabled` toggling; it has no meaning to the matcher itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    pub id: String,
    pub handler_type: String,
    #[serde(default)]
    pub event_filters: IndexMap<String, Comparator>,
    #[serde(default)]
    pub extra_filters: IndexMap<String, Comparator>,
    #[serde(default)]
    pub disabled: bool,
}

impl HandlerDescriptor {
    pub fn new(id: impl Into<String>, handler_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handler_type: handler_type.into(),
            event_filters: IndexMap::new(),
            extra_filters: IndexMap::new(),
            disabled: false,
        }
    }

    fn matches_filters(
        &self,
        filters: &IndexMap<String, Comparator>,
        lookup: impl Fn(&str) -> Option<serde_json::Value>,
    ) -> bool {
        for (key, comparator) in filters {
            let field = match lookup(key) {
                Some(value) => value,
                None => {
                    debug!(handler = %self.id, key, "field absent from event, not matched");
                    return false;
                }
            };
            match comparator.compare(&field) {
                Ok(true) => continue,
                Ok(false) => {
                    debug!(handler = %self.id, key, "comparator did not match");
                    return false;
                }
                Err(err) => {
                    debug!(handler = %self.id, key, %err, "comparator errored, treating as not matched");
                    return false;
                }
            }
        }
        true
    }

    /// Whether this handler applies to `event`. A handler with no filters at
    /// all always matches: empty filters mean unconditional application.
    /// `event_filters` are checked against the top-level attributes only;
    /// `extra_filters` are checked against `extra` only — the two
    /// namespaces are disjoint, so an `extra_filters` entry keyed `"host"`
    /// never sees the event's top-level host, and an `event_filters` entry
    /// keyed on an extra-only attribute never matches it.
    pub fn matches(&self, event: &Event) -> bool {
        if self.disabled {
            return false;
        }
        if self.event_filters.is_empty() && self.extra_filters.is_empty() {
            return true;
        }
        self.matches_filters(&self.event_filters, |key| event.field(key))
            && self.matches_filters(&self.extra_filters, |key| event.extra_field(key))
    }
}

/// Select the handlers in `handlers` (keyed by `handler_type`) whose filters
/// match `event`. Pure and side-effect free beyond the debug logging above.
pub fn matching_handlers<'a>(
    handlers: &'a HashMap<String, Vec<HandlerDescriptor>>,
    event: &Event,
) -> Vec<&'a HandlerDescriptor> {
    handlers
        .get(&event.type_)
        .into_iter()
        .flatten()
        .filter(|handler| handler.matches(event))
        .collect()
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
