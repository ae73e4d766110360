// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem locations the daemon needs: the Unix socket it listens on,
//! its log file, and the HCL rule directory it watches. All hang off a
//! single state directory, overridable with `OJD_STATE_DIR`.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
    pub rule_dir: PathBuf,
}

impl Paths {
    pub fn resolve() -> Self {
        let state_dir = state_dir();
        Self {
            socket_path: state_dir.join("ojd.sock"),
            log_path: state_dir.join("ojd.log"),
            config_path: state_dir.join("ojd.toml"),
            rule_dir: std::env::var_os("OJD_RULE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(oj_adapters::default_rule_dir),
            state_dir,
        }
    }
}

/// `OJD_STATE_DIR` > `XDG_STATE_HOME/oj` > `~/.local/state/oj`.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OJD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("oj");
    }
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join(".local/state/oj")
}
