//! Operator-driven replay of failed work.
//!
//! Each error-log entry may carry a capsule describing exactly what to
//! replay. Entries without one (record-store failures) fall back to a
//! time-correlated sibling: the closest ingest-stage entry of the same
//! workflow, which holds the full raw event.

use crate::errors::{IngestError, Result};
use crate::event::ReplyEvent;
use crate::metrics_defs;
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::counter;
use store::Workflow;

/// Half-width of the sibling correlation window, in seconds. A heuristic:
/// under bursty traffic it can pick the wrong event.
pub const SIBLING_WINDOW_SECS: i64 = 5;

/// Self-describing replay instruction persisted alongside an error entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryCapsule {
    /// Rerun the whole pipeline from the raw inbound event.
    FullReplay { event: Value },
    /// Re-deliver a notification whose record-store write already landed.
    NotifyReplay { target_url: String, data: Value },
}

/// Replays one error-log entry and deletes it on success.
pub async fn retry_error(pipeline: &Pipeline, id: i64) -> Result<()> {
    let record = pipeline
        .store()
        .get_error(id)
        .await?
        .ok_or(IngestError::ErrorEntryNotFound(id))?;
    counter!(metrics_defs::RETRY_ATTEMPTED).increment(1);
    tracing::info!(
        id,
        workflow = %record.workflow,
        stage = %record.stage,
        "replaying error entry"
    );

    match &record.payload {
        Some(payload) => {
            let capsule: RetryCapsule = serde_json::from_str(payload)?;
            match capsule {
                RetryCapsule::NotifyReplay { target_url, data } => {
                    pipeline.notifier.send(&target_url, &data).await?;
                }
                RetryCapsule::FullReplay { event } => {
                    replay_event(pipeline, &record.workflow, event).await?;
                }
            }
        }
        None => {
            // No capsule of its own; borrow the raw event from a nearby
            // ingest-stage sibling.
            let sibling = pipeline
                .store()
                .sibling_ingest_payload(&record.workflow, &record.timestamp, SIBLING_WINDOW_SECS)
                .await?
                .ok_or(IngestError::NoRetryablePayload)?;
            let capsule: RetryCapsule = serde_json::from_str(&sibling)?;
            let RetryCapsule::FullReplay { event } = capsule else {
                return Err(IngestError::NoRetryablePayload);
            };
            replay_event(pipeline, &record.workflow, event).await?;
        }
    }

    pipeline.store().delete_error(id).await?;
    counter!(metrics_defs::RETRY_SUCCEEDED).increment(1);
    Ok(())
}

async fn replay_event(pipeline: &Pipeline, workflow: &str, event: Value) -> Result<()> {
    let workflow = Workflow::parse(workflow)
        .ok_or_else(|| IngestError::UnknownWorkflow(workflow.to_string()))?;
    let event: ReplyEvent = serde_json::from_value(event)?;
    pipeline.process(workflow, &event).await?;
    Ok(())
}
