use super::{utils, ApiResponse};
use crate::errors::{IngestError, Result};
use crate::pipeline::Pipeline;
use crate::retry::retry_error;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};

pub async fn handle(pipeline: &Pipeline, request: Request<Incoming>) -> Result<ApiResponse> {
    let payload = utils::read_json(request).await?;
    let id = payload
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(IngestError::MissingField("id"))?;

    retry_error(pipeline, id).await?;
    Ok(utils::json_body(StatusCode::OK, &json!({"ok": true, "id": id})))
}

pub async fn list(pipeline: &Pipeline) -> Result<ApiResponse> {
    let ids = pipeline.store().retryable_error_ids().await?;
    Ok(utils::json_body(StatusCode::OK, &json!({ "ids": ids })))
}
