// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Parses the HCL (or TOML/JSON) rule files that declare, per handler type,
//! which handlers run for a matching event. `oj-adapters`'s `RuleProvider`
//! implementation loads a directory of these with [`load_dir`] and turns the
//! result into the registry [`oj_core::ports::RuleProvider::handlers_for`]
//! looks up against.

mod parser;
mod rule;

pub use parser::{load_dir, parse_rule_file, Format, ParseError};
pub use rule::RuleFile;
