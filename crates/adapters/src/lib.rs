// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Reference implementations of the engine's two collaborator traits
//! (`oj_core::ports::{RuleProvider, ExecutionClient}`): an HCL rule
//! directory for `RuleProvider`, and a scripted fake for `ExecutionClient`
//! since running handler code in-process is out of scope for this crate.

mod execution;
#[cfg(any(test, feature = "test-support"))]
mod fake_rules;
mod rules;

pub use execution::{ExecuteCall, FakeExecutionClient};
pub use rules::{default_rule_dir, HclRuleProvider, RuleProviderError};

#[cfg(any(test, feature = "test-support"))]
pub use fake_rules::FakeRuleProvider;
