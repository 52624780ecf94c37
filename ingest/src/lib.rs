//! Reply ingest service: webhook endpoints, the resolution and delivery
//! pipeline, and the operator-facing retry surface.

pub mod airtable;
pub mod api;
pub mod bounce;
pub mod company_code;
pub mod config;
pub mod errors;
pub mod event;
pub mod extract;
pub mod fields;
pub mod metrics_defs;
pub mod notifier;
pub mod pipeline;
pub mod redirect;
pub mod retry;

#[cfg(test)]
pub(crate) mod testutils;

use crate::errors::IngestError;
use crate::pipeline::Pipeline;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use shared::http::run_http_service;
use std::pin::Pin;
use std::sync::Arc;
use store::Store;

pub struct IngestService {
    pipeline: Arc<Pipeline>,
}

impl IngestService {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

impl Service<Request<Incoming>> for IngestService {
    type Response = Response<BoxBody<Bytes, IngestError>>;
    type Error = IngestError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        Box::pin(api::dispatch(self.pipeline.clone(), req))
    }
}

pub async fn run(config: config::Config) -> Result<(), IngestError> {
    let store = Store::connect(&config.database.url).await?;
    store.init_schema().await?;
    let pipeline = Pipeline::from_config(&config, store)?;
    let service = IngestService::new(Arc::new(pipeline));
    run_http_service(&config.listener.host, config.listener.port, service).await
}
