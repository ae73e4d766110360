// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `oj` CLI's wire protocol: a 4-byte big-endian length prefix followed
//! by a JSON payload, carrying one [`Request`]/[`Response`] pair per
//! round trip over the daemon's Unix socket.

use oj_core::{Event, JobId, TaskId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Largest message this protocol will read or write. An event's `extra`
/// map is the only unbounded part of a request; this is generous for that
/// while still refusing a connection that sends nonsense.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Submit { event: Event },
    Cancel { job_id: JobId },
    JobInfo { job_id: JobId },
    ListJobs,
    Status,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Submitted { job_id: JobId },
    Cancelled,
    JobInfo(JobInfoDto),
    Jobs(Vec<JobId>),
    Status(StatusReport),
    ShuttingDown,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfoDto {
    pub task_id: TaskId,
    pub status: String,
    pub created: Option<u64>,
    pub recycled: Option<u64>,
    pub finished: Option<u64>,
    pub exc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfoDto {
    pub job_id: JobId,
    pub added: u64,
    pub splitted: Option<u64>,
    pub cancelled: bool,
    pub finished: bool,
    pub tasks: Vec<TaskInfoDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub pid: u32,
    pub uptime_s: u64,
    pub max_jobs: u32,
}

impl From<&oj_engine::TaskInfo> for TaskInfoDto {
    fn from(task: &oj_engine::TaskInfo) -> Self {
        Self {
            task_id: task.task_id.clone(),
            status: format!("{:?}", task.status).to_lowercase(),
            created: task.created,
            recycled: task.recycled,
            finished: task.finished,
            exc: task.exc.clone(),
        }
    }
}

/// `finished` is computed by the caller (it needs every task's status,
/// which `JobInfo` already carries, but whether an empty task list counts
/// as finished depends on whether the job has been split at all).
pub fn job_info_dto(info: &oj_engine::JobInfo, finished: bool) -> JobInfoDto {
    JobInfoDto {
        job_id: info.job_id.clone(),
        added: info.added,
        splitted: info.splitted,
        cancelled: info.cancelled,
        finished,
        tasks: info.tasks.iter().map(TaskInfoDto::from).collect(),
    }
}

/// Encode a message to JSON bytes, without the length prefix.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: json.len(), max: MAX_MESSAGE_SIZE });
    }
    Ok(json)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(err) => return Err(ProtocolError::Io(err)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: len, max: MAX_MESSAGE_SIZE });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: data.len(), max: MAX_MESSAGE_SIZE });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    write_message(writer, &data).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_request_through_the_wire_format() {
        let mut buf = Vec::new();
        write_response(&mut buf, &Response::Pong).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let bytes = read_message(&mut cursor).await.unwrap();
        let response: Response = decode(&bytes).unwrap();
        assert!(matches!(response, Response::Pong));
    }

    #[tokio::test]
    async fn empty_stream_reads_as_connection_closed() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_message(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[test]
    fn oversized_message_is_rejected_by_encode() {
        let big = vec![1u8; MAX_MESSAGE_SIZE];
        let err = encode(&big).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[test]
    fn request_round_trips_through_json() {
        let req = Request::Submit { event: Event::new("h", "i", "deploy.finished") };
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        match back {
            Request::Submit { event } => assert_eq!(event.type_, "deploy.finished"),
            other => panic!("unexpected request: {other:?}"),
        }
    }
}
