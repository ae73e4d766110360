// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the handlers that apply to one event: fetch the candidate set
//! for the event's `handler_type` from the rule collaborator, then run the
//! pure matcher over it.

use oj_core::{Event, HandlerDescriptor, RuleProvider};

use crate::error::EngineError;

pub async fn resolve_handlers(
    rules: &dyn RuleProvider,
    event: &Event,
) -> Result<Vec<HandlerDescriptor>, EngineError> {
    let candidates = rules.handlers_for(&event.type_).await?;
    Ok(candidates.into_iter().filter(|handler| handler.matches(event)).collect())
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
