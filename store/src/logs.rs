//! Activity and error log persistence.
//!
//! Both logs are append-only from the pipeline's point of view; error
//! entries are additionally deleted when a retry of them succeeds.

use crate::error::Result;
use crate::types::{ActivityAction, ActivityRecord, ErrorRecord, Stage, Workflow};
use crate::Store;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Optional context attached to an activity entry.
#[derive(Clone, Debug, Default)]
pub struct ActivityContext {
    pub client_tag: Option<String>,
    pub section_name: Option<String>,
    pub lead_email: Option<String>,
    pub details: Option<serde_json::Value>,
}

fn error_from_row(row: &SqliteRow) -> Result<ErrorRecord> {
    Ok(ErrorRecord {
        id: row.try_get("id")?,
        timestamp: row.try_get("timestamp")?,
        workflow: row.try_get("workflow")?,
        stage: row.try_get("stage")?,
        message: row.try_get("message")?,
        payload: row.try_get("payload")?,
    })
}

impl Store {
    pub async fn log_activity(
        &self,
        workflow: Workflow,
        action: ActivityAction,
        context: ActivityContext,
    ) -> Result<i64> {
        let details = context
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result = sqlx::query(
            "INSERT INTO activity_log
                 (timestamp, workflow, client_tag, section_name, lead_email, action, details)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(now_rfc3339())
        .bind(workflow.as_str())
        .bind(&context.client_tag)
        .bind(&context.section_name)
        .bind(&context.lead_email)
        .bind(action.as_str())
        .bind(details)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Appends an error entry. `payload` is the serialized retry capsule,
    /// when one exists for this failure.
    pub async fn log_error(
        &self,
        workflow: Workflow,
        stage: Stage,
        message: &str,
        payload: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO error_log (timestamp, workflow, stage, message, payload)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(now_rfc3339())
        .bind(workflow.as_str())
        .bind(stage.as_str())
        .bind(message)
        .bind(payload)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_error(&self, id: i64) -> Result<Option<ErrorRecord>> {
        let row = sqlx::query(
            "SELECT id, timestamp, workflow, stage, message, payload FROM error_log WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(error_from_row).transpose()
    }

    pub async fn delete_error(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM error_log WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Ids of error entries carrying a retry capsule, oldest first, for the
    /// bulk-retry client.
    pub async fn retryable_error_ids(&self) -> Result<Vec<i64>> {
        let rows = sqlx::query("SELECT id FROM error_log WHERE payload IS NOT NULL ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(|row| Ok(row.try_get("id")?)).collect()
    }

    /// Best-effort sibling lookup for records that failed mid-pipeline and
    /// carry no capsule of their own: the most recent ingest-stage entry of
    /// the same workflow within `window_secs` of the given timestamp.
    ///
    /// The time window is a heuristic with no uniqueness guarantee under
    /// bursty traffic; under load it can correlate the wrong raw event.
    pub async fn sibling_ingest_payload(
        &self,
        workflow: &str,
        timestamp: &str,
        window_secs: i64,
    ) -> Result<Option<String>> {
        let Ok(center) = DateTime::parse_from_rfc3339(timestamp) else {
            return Ok(None);
        };
        let center = center.with_timezone(&Utc);
        let lo = (center - Duration::seconds(window_secs))
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let hi = (center + Duration::seconds(window_secs))
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        let row = sqlx::query(
            "SELECT payload FROM error_log
             WHERE workflow = ? AND stage = ? AND payload IS NOT NULL
                 AND timestamp >= ? AND timestamp <= ?
             ORDER BY id DESC LIMIT 1",
        )
        .bind(workflow)
        .bind(Stage::Ingest.as_str())
        .bind(lo)
        .bind(hi)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| r.try_get("payload")).transpose()?)
    }

    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityRecord>> {
        let rows = sqlx::query(
            "SELECT id, timestamp, workflow, client_tag, section_name, lead_email, action, details
             FROM activity_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ActivityRecord {
                    id: row.try_get("id")?,
                    timestamp: row.try_get("timestamp")?,
                    workflow: row.try_get("workflow")?,
                    client_tag: row.try_get("client_tag")?,
                    section_name: row.try_get("section_name")?,
                    lead_email: row.try_get("lead_email")?,
                    action: row.try_get("action")?,
                    details: row.try_get("details")?,
                })
            })
            .collect()
    }
}
