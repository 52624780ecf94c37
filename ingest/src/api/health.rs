use super::{utils, ApiResponse};
use crate::errors::Result;
use hyper::StatusCode;
use serde_json::json;

pub fn handle() -> Result<ApiResponse> {
    Ok(utils::json_body(StatusCode::OK, &json!({"status": "ok"})))
}
