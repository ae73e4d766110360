// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rule comparators. A comparator decides whether one event field matches a
//! handler's filter value. `Eq` is the default when a rule supplies a bare
//! value instead of a tagged comparator.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Compiled `Re` patterns, keyed by source string, so a handler whose filter
/// never changes does not pay for a fresh `Regex::new` on every event it is
/// checked against.
fn regex_cache() -> &'static Mutex<HashMap<String, Regex>> {
    static CACHE: std::sync::OnceLock<Mutex<HashMap<String, Regex>>> = std::sync::OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Comparator {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Re(String),
}

impl Comparator {
    /// Compare `field` against this comparator's operand. A malformed
    /// operand (e.g. an invalid regex) is a `MatchError`, never a panic;
    /// callers treat it as a non-match and log it, mirroring how the
    /// original caught any comparison exception as a failed match.
    pub fn compare(&self, field: &Value) -> Result<bool, CoreError> {
        match self {
            Comparator::Eq(operand) => Ok(field == operand),
            Comparator::Ne(operand) => Ok(field != operand),
            Comparator::In(operands) => Ok(operands.contains(field)),
            Comparator::Re(pattern) => {
                let text = field.as_str().ok_or_else(|| {
                    CoreError::MatchError(format!("regex comparator against non-string {field}"))
                })?;
                let mut cache = regex_cache().lock();
                if let Some(re) = cache.get(pattern) {
                    return Ok(re.is_match(text));
                }
                let re = Regex::new(pattern)
                    .map_err(|err| CoreError::MatchError(format!("bad regex {pattern:?}: {err}")))?;
                let matched = re.is_match(text);
                cache.insert(pattern.clone(), re);
                Ok(matched)
            }
        }
    }
}

impl From<Value> for Comparator {
    fn from(value: Value) -> Self {
        Comparator::Eq(value)
    }
}
