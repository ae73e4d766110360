// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Odd Jobs distribution engine: the four components that move a submitted
//! event through `/input` → `/ready` → `/running` → reaped, plus read-only
//! queries over the control tree and a restart-on-error wrapper for running
//! them as long-lived daemon loops.

pub mod bootstrap;
mod collector;
mod dispatcher;
mod error;
mod intake;
pub mod matcher;
mod query;
mod splitter;
pub mod supervise;

pub use collector::Collector;
pub use dispatcher::Dispatcher;
pub use error::EngineError;
pub use intake::Intake;
pub use query::{JobInfo, Query, TaskInfo};
pub use splitter::Splitter;
