//! Event, schedule and cron trigger operations

use crate::client::kestrel_client::KestrelClient;
use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use kestrel_core::trigger::normalize_cron_expression;
use kestrel_core::{CronEntry, ScheduleEntry};
use serde::Serialize;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Validate a cron expression locally. Five-field expressions gain a leading
/// seconds field of `0`; the normalised form is returned.
pub fn parse_cron_expression(expression: &str) -> Result<String> {
    let normalized = normalize_cron_expression(expression);
    cron::Schedule::from_str(&normalized).map_err(|e| ValidationError::CronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })?;
    Ok(normalized)
}

/// `client.events()`
#[derive(Debug, Clone, Copy)]
pub struct Events<'a> {
    client: &'a KestrelClient,
}

impl<'a> Events<'a> {
    pub(crate) fn new(client: &'a KestrelClient) -> Self {
        Self { client }
    }

    /// Push an event. Satisfies event conditions and starts every workflow
    /// bound to `event_key`. Returns no run id.
    pub async fn push<P: Serialize>(&self, event_key: &str, payload: &P) -> Result<()> {
        let payload = serde_json::to_value(payload)?;
        info!(event_key, "Pushing event");
        self.client.transport().push_event(event_key, payload).await
    }
}

/// `client.schedules()`: one-shot future triggers
#[derive(Debug, Clone, Copy)]
pub struct Schedules<'a> {
    client: &'a KestrelClient,
}

impl<'a> Schedules<'a> {
    pub(crate) fn new(client: &'a KestrelClient) -> Self {
        Self { client }
    }

    /// Persist a trigger for `trigger_at`. The run does not exist until it
    /// fires, so this returns a schedule id rather than a handle.
    pub async fn create<I: Serialize>(
        &self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: &I,
    ) -> Result<Uuid> {
        if trigger_at <= Utc::now() {
            return Err(ValidationError::Schedule(format!(
                "trigger_at {} is not in the future",
                trigger_at.to_rfc3339()
            ))
            .into());
        }
        let input = self.client.prepare_input(workflow, input)?;
        let id = self
            .client
            .transport()
            .create_schedule(workflow, trigger_at, input)
            .await?;
        info!(schedule_id = %id, workflow, trigger_at = %trigger_at, "Schedule created");
        Ok(id)
    }

    pub async fn delete(&self, schedule_id: Uuid) -> Result<()> {
        self.client.transport().delete_schedule(schedule_id).await
    }

    /// Pending schedules, optionally for one workflow
    pub async fn list(&self, workflow: Option<&str>) -> Result<Vec<ScheduleEntry>> {
        self.client.transport().list_schedules(workflow).await
    }
}

/// `client.crons()`: recurring triggers
#[derive(Debug, Clone, Copy)]
pub struct Crons<'a> {
    client: &'a KestrelClient,
}

impl<'a> Crons<'a> {
    pub(crate) fn new(client: &'a KestrelClient) -> Self {
        Self { client }
    }

    pub async fn create<I: Serialize>(
        &self,
        workflow: &str,
        expression: &str,
        input: &I,
    ) -> Result<Uuid> {
        let expression = parse_cron_expression(expression)?;
        let input = self.client.prepare_input(workflow, input)?;
        let id = self
            .client
            .transport()
            .create_cron(workflow, &expression, input)
            .await?;
        info!(cron_id = %id, workflow, expression = %expression, "Cron created");
        Ok(id)
    }

    pub async fn delete(&self, cron_id: Uuid) -> Result<()> {
        self.client.transport().delete_cron(cron_id).await
    }

    pub async fn list(&self, workflow: Option<&str>) -> Result<Vec<CronEntry>> {
        self.client.transport().list_crons(workflow).await
    }
}
