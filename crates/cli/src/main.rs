// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oj` - talks to the `ojd` daemon over its Unix socket.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod client;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use oj_core::{Event, JobId};
use oj_daemon::protocol::JobInfoDto;
use oj_daemon::{Request, Response};
use serde_json::Value;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(name = "oj", version, about = "Odd Jobs - a distributed event-driven job dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an event, minting a new job.
    Submit {
        /// Host the event originated from.
        #[arg(long, default_value = "cli")]
        host: String,
        /// Instance identifier on that host.
        #[arg(long, default_value = "cli")]
        instance: String,
        /// Event type, matched against handler rules.
        #[arg(long = "type")]
        type_: String,
        /// Extra fields as key=value (value parsed as JSON, falling back to string).
        #[arg(long = "set", value_parser = parse_key_val)]
        extra: Vec<(String, Value)>,
    },
    /// Mark a job cancelled.
    Cancel { job_id: String },
    /// List every job id tracked under the control tree.
    List,
    /// Show one job's control-plane state.
    Info { job_id: String },
    /// Show the daemon's own status.
    Status,
    /// Ask the daemon to shut down.
    Shutdown,
}

fn parse_key_val(s: &str) -> Result<(String, Value)> {
    let (key, raw) = s.split_once('=').ok_or_else(|| anyhow!("expected key=value, got {s:?}"))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut client = DaemonClient::connect_or_start().await?;

    let request = match cli.command {
        Commands::Submit { host, instance, type_, extra } => {
            let mut event = Event::new(host, instance, type_);
            for (key, value) in extra {
                event = event.with_extra(key, value);
            }
            Request::Submit { event }
        }
        Commands::Cancel { job_id } => Request::Cancel { job_id: JobId::new(job_id) },
        Commands::List => Request::ListJobs,
        Commands::Info { job_id } => Request::JobInfo { job_id: JobId::new(job_id) },
        Commands::Status => Request::Status,
        Commands::Shutdown => Request::Shutdown,
    };

    match client.send(request).await? {
        Response::Pong => println!("pong"),
        Response::Submitted { job_id } => println!("{job_id}"),
        Response::Cancelled => println!("cancelled"),
        Response::Jobs(jobs) => {
            for job_id in jobs {
                println!("{job_id}");
            }
        }
        Response::JobInfo(info) => print_job_info(&info),
        Response::Status(status) => {
            println!("pid:        {}", status.pid);
            println!("uptime_s:   {}", status.uptime_s);
            println!("max_jobs:   {}", status.max_jobs);
        }
        Response::ShuttingDown => println!("daemon is shutting down"),
        Response::Error { message } => {
            eprintln!("error: {message}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_job_info(info: &JobInfoDto) {
    println!("job_id:    {}", info.job_id);
    println!("added:     {}", info.added);
    println!("splitted:  {}", info.splitted.map_or("no".to_string(), |ms| ms.to_string()));
    println!("cancelled: {}", info.cancelled);
    println!("finished:  {}", info.finished);
    println!("tasks:");
    for task in &info.tasks {
        let exc = task.exc.as_deref().unwrap_or("-");
        println!("  {} {} exc={}", task.task_id, task.status, exc);
    }
}
