use super::ApiResponse;
use crate::errors::{IngestError, Result};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use serde_json::Value;
use shared::http::json_response;

/// Collects and parses a JSON request body. A body that is not valid JSON
/// is the caller's fault, never ours.
pub async fn read_json(request: Request<Incoming>) -> Result<Value> {
    let bytes = request
        .into_body()
        .collect()
        .await
        .map_err(|error| IngestError::BadRequest(error.to_string()))?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|error| IngestError::BadRequest(error.to_string()))
}

pub fn json_body(status: StatusCode, body: &Value) -> ApiResponse {
    json_response(status, &body.to_string())
}

pub fn json_error(status: StatusCode, message: &str) -> ApiResponse {
    json_body(status, &serde_json::json!({ "error": message }))
}
