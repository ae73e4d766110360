// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connects to `ojd` over its Unix socket, starting it in the background
//! on first use if nothing answers there yet.

use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use oj_daemon::protocol::{self, ProtocolError, Request, Response};
use oj_daemon::Paths;
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon did not come up within the connect timeout")]
    StartTimeout,

    #[error("failed to start ojd: {0}")]
    StartFailed(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not locate the ojd binary (set OJ_DAEMON_BIN)")]
    NoDaemonBinary,
}

fn connect_timeout() -> Duration {
    parse_duration_ms("OJ_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

fn poll_interval() -> Duration {
    parse_duration_ms("OJ_CONNECT_POLL_MS").unwrap_or(Duration::from_millis(50))
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the running daemon, starting it in the background and
    /// waiting for the socket to come up if nothing is listening yet.
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        let paths = Paths::resolve();
        if let Ok(stream) = UnixStream::connect(&paths.socket_path).await {
            return Ok(Self { stream });
        }

        start_daemon_background()?;

        let deadline = Instant::now() + connect_timeout();
        loop {
            match UnixStream::connect(&paths.socket_path).await {
                Ok(stream) => return Ok(Self { stream }),
                Err(_) if Instant::now() < deadline => tokio::time::sleep(poll_interval()).await,
                Err(err) => return Err(err.into()),
            }
            if Instant::now() >= deadline {
                return Err(ClientError::StartTimeout);
            }
        }
    }

    /// Connect only; used by read-only commands that have nothing useful
    /// to do if no daemon is running.
    pub async fn connect() -> Result<Self, ClientError> {
        let paths = Paths::resolve();
        let stream = UnixStream::connect(&paths.socket_path).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, request: Request) -> Result<Response, ClientError> {
        let bytes = protocol::encode(&request)?;
        protocol::write_message(&mut self.stream, &bytes).await?;
        let bytes = protocol::read_message(&mut self.stream).await?;
        Ok(protocol::decode(&bytes)?)
    }
}

fn start_daemon_background() -> Result<(), ClientError> {
    let ojd_path = find_ojd_binary().ok_or(ClientError::NoDaemonBinary)?;
    Command::new(ojd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|err| ClientError::StartFailed(err.to_string()))?;
    Ok(())
}

fn find_ojd_binary() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("OJ_DAEMON_BIN") {
        return Some(PathBuf::from(path));
    }
    let current_exe = std::env::current_exe().ok()?;
    let sibling = current_exe.parent()?.join("ojd");
    if sibling.exists() {
        return Some(sibling);
    }
    which_on_path("ojd")
}

fn which_on_path(name: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths).map(|dir| dir.join(name)).find(|candidate| candidate.is_file())
    })
}
