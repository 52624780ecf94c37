//! HTTP surface of the ingest service.
//!
//! Two webhook endpoints (one per workflow), the retry endpoints for
//! operators, and a health probe. Handler errors are mapped to JSON error
//! responses here so the connection itself never fails on a bad event.

mod health;
mod retry;
mod utils;
mod webhook;

use crate::errors::IngestError;
use crate::pipeline::Pipeline;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use store::Workflow;

pub type ApiResponse = Response<BoxBody<Bytes, IngestError>>;

pub async fn dispatch(
    pipeline: Arc<Pipeline>,
    request: Request<Incoming>,
) -> Result<ApiResponse, IngestError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let result = match (method.as_str(), path.as_str()) {
        ("POST", "/webhook/tracked") => {
            webhook::handle(&pipeline, Workflow::Tracked, request).await
        }
        ("POST", "/webhook/untracked") => {
            webhook::handle(&pipeline, Workflow::Untracked, request).await
        }
        ("POST", "/errors/retry") => retry::handle(&pipeline, request).await,
        ("GET", "/errors/retryable") => retry::list(&pipeline).await,
        ("GET", "/health") => health::handle(),
        _ => Ok(utils::json_error(StatusCode::NOT_FOUND, "not found")),
    };

    result.or_else(|error| {
        tracing::warn!(method = %method, path, %error, "request failed");
        Ok(utils::json_error(error.status(), &error.to_string()))
    })
}
