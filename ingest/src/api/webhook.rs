use super::{utils, ApiResponse};
use crate::errors::{IngestError, Result};
use crate::event::ReplyEvent;
use crate::pipeline::{Outcome, Pipeline};
use crate::retry::RetryCapsule;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde_json::json;
use store::{Stage, Workflow};

pub async fn handle(
    pipeline: &Pipeline,
    workflow: Workflow,
    request: Request<Incoming>,
) -> Result<ApiResponse> {
    let raw = utils::read_json(request).await?;
    let event: ReplyEvent = serde_json::from_value(raw.clone())
        .map_err(|error| IngestError::BadRequest(error.to_string()))?;

    match pipeline.process(workflow, &event).await {
        Ok(outcome) => {
            let body = match &outcome {
                Outcome::Filtered => json!({"ok": true, "outcome": "filtered"}),
                Outcome::Unroutable => json!({"ok": true, "outcome": "unroutable"}),
                Outcome::Written { action, record_id } => json!({
                    "ok": true,
                    "outcome": action.as_str(),
                    "record_id": record_id,
                }),
            };
            Ok(utils::json_body(StatusCode::OK, &body))
        }
        // Malformed events have no replay value; answer 400 and move on.
        Err(error) if error.status() == StatusCode::BAD_REQUEST => Err(error),
        Err(error) => {
            // Keep the raw event so an operator can replay the whole thing
            // once the downstream issue clears.
            let capsule = RetryCapsule::FullReplay { event: raw };
            pipeline
                .record_error(workflow, Stage::Ingest, &error.to_string(), Some(&capsule))
                .await;
            Ok(utils::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "processing failed",
            ))
        }
    }
}
