// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odd Jobs Daemon (ojd)
//!
//! Background process that owns the event pipeline and answers the `oj`
//! CLI over a Unix socket. Typically started by `oj`, not invoked directly.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oj_adapters::{FakeExecutionClient, HclRuleProvider};
use oj_core::{Clock, Config, ExecutionClient, IdGen, RuleProvider, SystemClock, UuidIdGen};
use oj_daemon::{listener, Daemon, Paths};
use oj_storage::MemoryStore;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ojd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("usage: ojd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let paths = Paths::resolve();
    std::fs::create_dir_all(&paths.state_dir)?;
    let _log_guard = setup_logging(&paths.log_path)?;

    info!(state_dir = %paths.state_dir.display(), "starting daemon");
    let config = Config::load(Some(&paths.config_path))?;

    let unix_listener = match bind_socket(&paths.socket_path).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("ojd: failed to bind {}: {err}", paths.socket_path.display());
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    std::fs::create_dir_all(&paths.rule_dir)?;
    let rules: Arc<dyn RuleProvider> = Arc::new(HclRuleProvider::open(&paths.rule_dir).await?);
    let execution: Arc<dyn ExecutionClient> = Arc::new(FakeExecutionClient::new());
    let ids: Arc<dyn IdGen> = Arc::new(UuidIdGen);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let daemon = Arc::new(Daemon::open(store, rules, execution, ids, clock, config).await?);
    let loop_handles = daemon.spawn_loops();

    let listener_daemon = Arc::clone(&daemon);
    let listener_handle = tokio::spawn(listener::run(unix_listener, listener_daemon));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    println!("READY");
    info!(socket = %paths.socket_path.display(), "daemon ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        _ = wait_for_stop(&daemon) => info!("shutdown requested via command"),
    }

    daemon.request_shutdown().await;
    let _ = listener_handle.await;
    for handle in loop_handles {
        let _ = handle.await;
    }
    let _ = std::fs::remove_file(&paths.socket_path);
    info!("daemon stopped");
    Ok(())
}

/// Polls the daemon's stop flag so a CLI-issued `shutdown` command (which
/// only flips the flag, it sends no signal) also wakes the main loop.
async fn wait_for_stop<S: oj_storage::KvStore + 'static>(daemon: &Daemon<S>) {
    let mut interval = tokio::time::interval(Duration::from_millis(200));
    loop {
        interval.tick().await;
        if daemon.stop.is_stopped() {
            return;
        }
    }
}

/// Bind the daemon's Unix socket, clearing out a stale socket file left
/// behind by a process that did not exit cleanly. A socket that still
/// answers a connection belongs to a live daemon, not a stale one.
async fn bind_socket(path: &Path) -> std::io::Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            if UnixStream::connect(path).await.is_ok() {
                return Err(std::io::Error::new(std::io::ErrorKind::AddrInUse, "ojd is already running"));
            }
            info!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path)?;
            UnixListener::bind(path)
        }
        Err(err) => Err(err),
    }
}

fn print_help() {
    println!("ojd {}", env!("CARGO_PKG_VERSION"));
    println!("Odd Jobs Daemon - background process that owns the event pipeline");
    println!();
    println!("USAGE:");
    println!("    ojd");
    println!();
    println!("The daemon is typically started by the `oj` CLI and should not be");
    println!("invoked directly. It listens on a Unix socket for commands from `oj`.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

fn setup_logging(log_path: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let parent = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let file_name = log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("ojd.log"));
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}
