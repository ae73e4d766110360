// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accepts connections on the daemon's Unix socket and serves the wire
//! protocol over each one. One task per connection; each connection may
//! carry several request/response round trips.

use std::sync::Arc;
use std::time::Duration;

use oj_storage::KvStore;
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use crate::daemon::Daemon;
use crate::protocol::{self, ProtocolError, Request};

/// Poll interval for noticing a shutdown request between `accept()` calls.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub async fn run<S: KvStore + 'static>(listener: UnixListener, daemon: Arc<Daemon<S>>) {
    let mut stop_check = tokio::time::interval(STOP_POLL_INTERVAL);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let daemon = Arc::clone(&daemon);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, daemon).await {
                                warn!(%err, "connection ended with an error");
                            }
                        });
                    }
                    Err(err) => error!(%err, "accept failed"),
                }
            }
            _ = stop_check.tick() => {
                if daemon.stop.is_stopped() {
                    info!("listener stopping on shutdown request");
                    break;
                }
            }
        }
    }
}

async fn handle_connection<S: KvStore + 'static>(
    mut stream: UnixStream,
    daemon: Arc<Daemon<S>>,
) -> Result<(), ProtocolError> {
    loop {
        let request = match protocol::read_request(&mut stream).await {
            Ok(request) => request,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        };
        let is_shutdown = matches!(request, Request::Shutdown);

        let response = daemon.handle_request(request).await;
        protocol::write_response(&mut stream, &response).await?;

        if is_shutdown {
            // The reply is already on the wire before we flip the flag, so
            // the caller never races the daemon going away mid-response.
            daemon.request_shutdown().await;
            return Ok(());
        }
    }
}
