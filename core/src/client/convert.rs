//! Conversions between wire messages and client model types.

use crate::error::{CoreError, CoreResult};
use crate::generated::kestrel_v1 as pb;
use crate::run::{RunFailure, RunSnapshot, RunStatus, TaskOutcome, TaskRecord};
use crate::task::{ChunkContent, StreamChunk};
use crate::trigger::{CronEntry, ScheduleEntry};
use crate::worker::WorkerCommand;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

pub(crate) fn parse_id(kind: &str, raw: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CoreError::Other(format!("Invalid {} id '{}': {}", kind, raw, e)))
}

pub(crate) fn timestamp(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Empty payloads decode as null.
pub(crate) fn decode_json(bytes: &[u8]) -> CoreResult<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

pub(crate) fn status_from_wire(status: pb::RunStatus) -> CoreResult<RunStatus> {
    Ok(match status {
        pb::RunStatus::Queued => RunStatus::Queued,
        pb::RunStatus::Running => RunStatus::Running,
        pb::RunStatus::Succeeded => RunStatus::Succeeded,
        pb::RunStatus::Failed => RunStatus::Failed,
        pb::RunStatus::Cancelled => RunStatus::Cancelled,
        pb::RunStatus::Unspecified => {
            return Err(CoreError::Other("Scheduler returned an unspecified run status".into()))
        }
    })
}

pub(crate) fn status_to_wire(status: RunStatus) -> pb::RunStatus {
    match status {
        RunStatus::Queued => pb::RunStatus::Queued,
        RunStatus::Running => pb::RunStatus::Running,
        RunStatus::Succeeded => pb::RunStatus::Succeeded,
        RunStatus::Failed => pb::RunStatus::Failed,
        RunStatus::Cancelled => pb::RunStatus::Cancelled,
    }
}

fn record_from_wire(record: pb::TaskRecord) -> CoreResult<TaskRecord> {
    let outcome = match record.state() {
        pb::TaskState::Succeeded => TaskOutcome::Succeeded {
            output: decode_json(&record.output)?,
        },
        pb::TaskState::Skipped => TaskOutcome::Skipped {
            reason: record.detail.clone(),
        },
        pb::TaskState::Failed => TaskOutcome::Failed {
            error: record.detail.clone(),
        },
        pb::TaskState::Cancelled => TaskOutcome::Cancelled,
        pb::TaskState::Unspecified => {
            return Err(CoreError::Other(format!(
                "Task '{}' has an unspecified state",
                record.task
            )))
        }
    };
    Ok(TaskRecord {
        task: record.task,
        outcome,
        completed_at: timestamp(record.completed_at_ms),
    })
}

fn record_to_wire(record: &TaskRecord) -> CoreResult<pb::TaskRecord> {
    let (state, output, detail) = match &record.outcome {
        TaskOutcome::Succeeded { output } => {
            (pb::TaskState::Succeeded, serde_json::to_vec(output)?, String::new())
        }
        TaskOutcome::Skipped { reason } => (pb::TaskState::Skipped, Vec::new(), reason.clone()),
        TaskOutcome::Failed { error } => (pb::TaskState::Failed, Vec::new(), error.clone()),
        TaskOutcome::Cancelled => (pb::TaskState::Cancelled, Vec::new(), String::new()),
    };
    Ok(pb::TaskRecord {
        task: record.task.clone(),
        state: state as i32,
        output,
        detail,
        completed_at_ms: record.completed_at.timestamp_millis(),
    })
}

pub fn snapshot_from_wire(snapshot: pb::RunSnapshot) -> CoreResult<RunSnapshot> {
    let status = status_from_wire(snapshot.status())?;
    let failure = match (snapshot.failed_task, snapshot.failure) {
        (Some(task), Some(error)) => Some(RunFailure { task, error }),
        (Some(task), None) => Some(RunFailure {
            task,
            error: String::new(),
        }),
        _ => None,
    };
    Ok(RunSnapshot {
        run_id: parse_id("run", &snapshot.run_id)?,
        workflow: snapshot.workflow_name,
        status,
        records: snapshot
            .records
            .into_iter()
            .map(record_from_wire)
            .collect::<CoreResult<_>>()?,
        metadata: snapshot.metadata,
        failure,
        cancel_reason: snapshot.cancel_reason,
        created_at: timestamp(snapshot.created_at_ms),
        completed_at: snapshot.completed_at_ms.map(timestamp),
    })
}

pub fn snapshot_to_wire(snapshot: &RunSnapshot) -> CoreResult<pb::RunSnapshot> {
    Ok(pb::RunSnapshot {
        run_id: snapshot.run_id.to_string(),
        workflow_name: snapshot.workflow.clone(),
        status: status_to_wire(snapshot.status) as i32,
        records: snapshot
            .records
            .iter()
            .map(record_to_wire)
            .collect::<CoreResult<_>>()?,
        metadata: snapshot.metadata.clone(),
        failed_task: snapshot.failure.as_ref().map(|f| f.task.clone()),
        failure: snapshot.failure.as_ref().map(|f| f.error.clone()),
        cancel_reason: snapshot.cancel_reason.clone(),
        created_at_ms: snapshot.created_at.timestamp_millis(),
        completed_at_ms: snapshot.completed_at.map(|t| t.timestamp_millis()),
    })
}

pub fn chunk_to_wire(chunk: &StreamChunk) -> CoreResult<pb::StreamChunk> {
    let kind = match chunk.kind() {
        crate::task::ChunkKind::Text => pb::ChunkKind::Text,
        crate::task::ChunkKind::Progress => pb::ChunkKind::Progress,
        crate::task::ChunkKind::Data => pb::ChunkKind::Data,
        crate::task::ChunkKind::Error => pb::ChunkKind::Error,
    };
    Ok(pb::StreamChunk {
        run_id: chunk.run_id.to_string(),
        task: chunk.task.clone(),
        sequence: chunk.sequence,
        kind: kind as i32,
        payload: serde_json::to_vec(&chunk.content)?,
        emitted_at_ms: chunk.emitted_at.timestamp_millis(),
        end_of_stream: false,
    })
}

/// `Ok(None)` for an end-of-stream marker.
pub fn chunk_from_wire(chunk: pb::StreamChunk) -> CoreResult<Option<StreamChunk>> {
    if chunk.end_of_stream {
        return Ok(None);
    }
    let content: ChunkContent = serde_json::from_slice(&chunk.payload)?;
    Ok(Some(StreamChunk {
        run_id: parse_id("run", &chunk.run_id)?,
        task: chunk.task,
        sequence: chunk.sequence,
        content,
        emitted_at: timestamp(chunk.emitted_at_ms),
    }))
}

pub fn command_from_wire(command: pb::WorkerCommand) -> CoreResult<WorkerCommand> {
    match command.kind() {
        pb::CommandKind::Invoke => Ok(WorkerCommand::Invoke(serde_json::from_slice(
            &command.invocation,
        )?)),
        pb::CommandKind::Cancel => Ok(WorkerCommand::Cancel {
            invocation_id: parse_id("invocation", &command.invocation_id)?,
            reason: command.reason,
        }),
        pb::CommandKind::Unspecified => Err(CoreError::Other(
            "Scheduler sent a command of unspecified kind".into(),
        )),
    }
}

pub fn command_to_wire(command: &WorkerCommand) -> CoreResult<pb::WorkerCommand> {
    Ok(match command {
        WorkerCommand::Invoke(invocation) => pb::WorkerCommand {
            kind: pb::CommandKind::Invoke as i32,
            invocation_id: invocation.invocation_id.to_string(),
            invocation: serde_json::to_vec(invocation)?,
            reason: String::new(),
        },
        WorkerCommand::Cancel {
            invocation_id,
            reason,
        } => pb::WorkerCommand {
            kind: pb::CommandKind::Cancel as i32,
            invocation_id: invocation_id.to_string(),
            invocation: Vec::new(),
            reason: reason.clone(),
        },
    })
}

pub fn schedule_from_wire(entry: pb::ScheduleEntry) -> CoreResult<ScheduleEntry> {
    Ok(ScheduleEntry {
        id: parse_id("schedule", &entry.schedule_id)?,
        workflow: entry.workflow_name,
        trigger_at: timestamp(entry.trigger_at_ms),
        input: decode_json(&entry.input)?,
    })
}

pub fn cron_from_wire(entry: pb::CronEntry) -> CoreResult<CronEntry> {
    Ok(CronEntry {
        id: parse_id("cron", &entry.cron_id)?,
        workflow: entry.workflow_name,
        expression: entry.expression,
        input: decode_json(&entry.input)?,
    })
}
