// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.backend.hosts, vec!["memory://local".to_string()]);
    assert_eq!(config.worker.max_jobs, 100);
    assert_eq!(config.collector.recycled_priority, 100);
    assert_eq!(config.api.input_limit, 5_000);
    assert_eq!(config.loops.max_fails, 10);
}

#[test]
fn load_with_no_path_returns_defaults() {
    let config = Config::load(None).expect("load");
    assert_eq!(config, Config::default());
}

#[test]
fn load_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nonexistent.toml");
    let config = Config::load(Some(&path)).expect("load");
    assert_eq!(config, Config::default());
}

#[test]
fn load_merges_partial_toml_over_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("oddjobs.toml");
    std::fs::write(&path, "[worker]\nmax_jobs = 7\n").expect("write");

    let config = Config::load(Some(&path)).expect("load");
    assert_eq!(config.worker.max_jobs, 7);
    assert_eq!(config.collector, CollectorConfig::default());
}

#[test]
fn load_rejects_malformed_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "not valid [[[ toml").expect("write");

    let err = Config::load(Some(&path)).expect_err("should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
#[serial_test::serial]
fn env_override_wins_over_toml_and_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("oddjobs.toml");
    std::fs::write(&path, "[worker]\nmax_jobs = 7\n").expect("write");

    std::env::set_var("OJD_WORKER_MAX_JOBS", "42");
    let config = Config::load(Some(&path)).expect("load");
    std::env::remove_var("OJD_WORKER_MAX_JOBS");

    assert_eq!(config.worker.max_jobs, 42);
}

#[test]
#[serial_test::serial]
fn env_override_rejects_unparseable_value() {
    std::env::set_var("OJD_COLLECTOR_INTERVAL_S", "not-a-number");
    let result = Config::load(None);
    std::env::remove_var("OJD_COLLECTOR_INTERVAL_S");

    assert!(matches!(result, Err(ConfigError::BadEnvValue { .. })));
}

#[test]
#[serial_test::serial]
fn backend_hosts_env_override_splits_on_comma() {
    std::env::set_var("OJD_BACKEND_HOSTS", "memory://a, memory://b");
    let config = Config::load(None).expect("load");
    std::env::remove_var("OJD_BACKEND_HOSTS");

    assert_eq!(config.backend.hosts, vec!["memory://a".to_string(), "memory://b".to_string()]);
}
