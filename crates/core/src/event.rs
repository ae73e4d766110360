// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events: the payloads that arrive on `/input` and are matched against
//! handler descriptors to decide which jobs to create.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single incoming event.
///
/// `host`/`instance`/`type_` are the three "well-known" attributes every
/// rule is allowed to filter on directly (`event_filters`); everything else
/// an emitter attaches rides in `extra` and is matched via `extra_filters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub host: String,
    pub instance: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub extra: IndexMap<String, Value>,
}

impl Event {
    pub fn new(host: impl Into<String>, instance: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            instance: instance.into(),
            type_: type_.into(),
            extra: IndexMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a well-known top-level attribute by name. Used for
    /// `event_filters`, which only ever see `host`/`instance`/`type`.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "host" => Some(Value::String(self.host.clone())),
            "instance" => Some(Value::String(self.instance.clone())),
            "type" => Some(Value::String(self.type_.clone())),
            _ => None,
        }
    }

    /// Look up a key in `extra` only. Used for `extra_filters`, which are
    /// not allowed to see the well-known top-level attributes.
    pub fn extra_field(&self, name: &str) -> Option<Value> {
        self.extra.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_resolves_well_known_attributes() {
        let event = Event::new("h1", "i1", "deploy.finished");
        assert_eq!(event.field("host"), Some(Value::String("h1".into())));
        assert_eq!(event.field("type"), Some(Value::String("deploy.finished".into())));
    }

    #[test]
    fn extra_field_resolves_extra_attributes_only() {
        let event = Event::new("h1", "i1", "deploy.finished").with_extra("env", "prod");
        assert_eq!(event.extra_field("env"), Some(Value::String("prod".into())));
        assert_eq!(event.extra_field("missing"), None);
        assert_eq!(event.extra_field("host"), None, "extra_field must not fall back to top-level attributes");
    }

    #[test]
    fn field_does_not_fall_back_to_extra() {
        let event = Event::new("h1", "i1", "deploy.finished").with_extra("env", "prod");
        assert_eq!(event.field("env"), None, "field must not reach into extra");
    }
}
