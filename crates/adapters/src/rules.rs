// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`RuleProvider`] backed by a directory of HCL rule files, watched with
//! `notify` so an operator editing a rule file on disk takes effect without
//! restarting the daemon.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use oj_core::{CoreError, HandlerDescriptor, RuleProvider};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RuleProviderError {
    #[error("loading rule directory {path}: {source}")]
    Load { path: String, source: oj_runbook::ParseError },

    #[error("watching rule directory {path}: {source}")]
    Watch { path: String, source: notify::Error },
}

type Registry = HashMap<String, Vec<HandlerDescriptor>>;

/// Loads `handler` rule blocks from every `.hcl`/`.toml`/`.json` file in a
/// directory and re-loads the whole directory whenever it changes.
pub struct HclRuleProvider {
    registry: Arc<RwLock<Registry>>,
    // Held for its Drop impl, which stops the background watch thread.
    _watcher: RecommendedWatcher,
}

/// `$XDG_CONFIG_HOME/oj/rules` (or platform equivalent), falling back to
/// `~/.oj/rules` when no config directory can be resolved.
pub fn default_rule_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(config_dir) => config_dir.join("oj").join("rules"),
        None => dirs::home_dir().unwrap_or_default().join(".oj").join("rules"),
    }
}

impl HclRuleProvider {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RuleProviderError> {
        let dir = dir.into();
        let registry = Arc::new(RwLock::new(load_registry(&dir)?));

        let watched_dir = dir.clone();
        let watched_registry = Arc::clone(&registry);
        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) if event.kind.is_access() => {}
                Ok(_) => reload(&watched_dir, &watched_registry),
                Err(err) => error!(path = %watched_dir.display(), %err, "rule directory watch error"),
            }
        })
        .map_err(|source| RuleProviderError::Watch { path: dir.display().to_string(), source })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| RuleProviderError::Watch { path: dir.display().to_string(), source })?;

        Ok(Self { registry, _watcher: watcher })
    }

    /// A snapshot of every loaded handler, across all types. Used by the
    /// daemon's status surface.
    pub fn all_handlers(&self) -> Vec<HandlerDescriptor> {
        self.registry.read().values().flatten().cloned().collect()
    }
}

fn load_registry(dir: &Path) -> Result<Registry, RuleProviderError> {
    oj_runbook::load_dir(dir)
        .map(oj_runbook::RuleFile::into_registry)
        .map_err(|source| RuleProviderError::Load { path: dir.display().to_string(), source })
}

fn reload(dir: &Path, registry: &Arc<RwLock<Registry>>) {
    match load_registry(dir) {
        Ok(fresh) => {
            *registry.write() = fresh;
            info!(path = %dir.display(), "reloaded rule directory");
        }
        Err(err) => warn!(path = %dir.display(), %err, "failed to reload rule directory, keeping previous rules"),
    }
}

#[async_trait]
impl RuleProvider for HclRuleProvider {
    async fn handlers_for(&self, handler_type: &str) -> Result<Vec<HandlerDescriptor>, CoreError> {
        Ok(self.registry.read().get(handler_type).cloned().unwrap_or_default())
    }
}
