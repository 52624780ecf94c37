//! Local mock servers and fixtures shared by the ingest tests.

use crate::airtable::{AirtableClient, AirtableRecord, FieldMap, RetryPolicy};
use crate::notifier::Notifier;
use crate::pipeline::Pipeline;
use crate::redirect::RedirectResolver;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use store::Store;
use tokio::net::TcpListener;

type MockResponse = Response<http_body_util::combinators::BoxBody<Bytes, Infallible>>;

fn json_reply(status: StatusCode, body: Value) -> MockResponse {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())).boxed())
        .unwrap()
}

#[derive(Default)]
struct FailableState {
    fail_next: AtomicUsize,
    hits: AtomicUsize,
}

impl FailableState {
    /// Counts the hit and reports whether this request should 500.
    fn should_fail(&self) -> bool {
        self.hits.fetch_add(1, Ordering::SeqCst);
        loop {
            let remaining = self.fail_next.load(Ordering::SeqCst);
            if remaining == 0 {
                return false;
            }
            if self
                .fail_next
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }
}

async fn spawn_server<F, Fut>(handler: F) -> u16
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };
            let io = hyper_util::rt::TokioIo::new(stream);
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |request| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler(request).await) }
                });
                let _ = hyper_util::server::conn::auto::Builder::new(
                    hyper_util::rt::TokioExecutor::new(),
                )
                .serve_connection(io, service)
                .await;
            });
        }
    });
    port
}

/// In-memory stand-in for the record-store API. Understands the search,
/// create and update calls the client makes, and matches `filterByFormula`
/// expressions of the `AND({Field} = "value", ...)` shape.
pub struct MockAirtable {
    port: u16,
    records: Arc<Mutex<Vec<AirtableRecord>>>,
    state: Arc<FailableState>,
}

fn formula_pairs(formula: &str) -> Vec<(String, String)> {
    let pattern = regex::Regex::new(r#"\{([^}]+)\} = "((?:[^"\\]|\\.)*)""#).unwrap();
    pattern
        .captures_iter(formula)
        .map(|captures| {
            (
                captures[1].to_string(),
                captures[2].replace("\\\"", "\""),
            )
        })
        .collect()
}

fn field_as_string(fields: &FieldMap, key: &str) -> Option<String> {
    fields.get(key).map(|value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn matches_formula(record: &AirtableRecord, pairs: &[(String, String)]) -> bool {
    pairs
        .iter()
        .all(|(key, expected)| field_as_string(&record.fields, key).as_deref() == Some(expected.as_str()))
}

impl MockAirtable {
    pub async fn spawn() -> Self {
        let records: Arc<Mutex<Vec<AirtableRecord>>> = Arc::default();
        let state = Arc::new(FailableState::default());
        let next_id = Arc::new(AtomicUsize::new(1));

        let handler_records = records.clone();
        let handler_state = state.clone();
        let port = spawn_server(move |request: Request<Incoming>| {
            let records = handler_records.clone();
            let state = handler_state.clone();
            let next_id = next_id.clone();
            async move {
                if state.should_fail() {
                    return json_reply(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": "injected failure"}),
                    );
                }

                let method = request.method().clone();
                let path = request.uri().path().to_string();
                let query = request.uri().query().unwrap_or("").to_string();
                let body = request
                    .into_body()
                    .collect()
                    .await
                    .map(|collected| collected.to_bytes())
                    .unwrap_or_default();

                match method.as_str() {
                    "GET" => {
                        let formula = url::form_urlencoded::parse(query.as_bytes())
                            .find(|(key, _)| key == "filterByFormula")
                            .map(|(_, value)| value.into_owned())
                            .unwrap_or_default();
                        let pairs = formula_pairs(&formula);
                        let matching: Vec<_> = records
                            .lock()
                            .unwrap()
                            .iter()
                            .filter(|record| matches_formula(record, &pairs))
                            .cloned()
                            .collect();
                        json_reply(
                            StatusCode::OK,
                            json!({
                                "records": matching
                                    .iter()
                                    .map(|record| json!({"id": record.id, "fields": record.fields}))
                                    .collect::<Vec<_>>(),
                            }),
                        )
                    }
                    "POST" => {
                        let payload: Value =
                            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
                        let fields = payload["fields"]
                            .as_object()
                            .cloned()
                            .unwrap_or_default();
                        let id = format!("rec{}", next_id.fetch_add(1, Ordering::SeqCst));
                        records.lock().unwrap().push(AirtableRecord {
                            id: id.clone(),
                            fields: fields.clone(),
                        });
                        json_reply(StatusCode::OK, json!({"id": id, "fields": fields}))
                    }
                    "PATCH" => {
                        let record_id = path.rsplit('/').next().unwrap_or("").to_string();
                        let payload: Value =
                            serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
                        let fields = payload["fields"]
                            .as_object()
                            .cloned()
                            .unwrap_or_default();
                        let mut records = records.lock().unwrap();
                        match records.iter_mut().find(|record| record.id == record_id) {
                            Some(record) => {
                                for (key, value) in fields {
                                    record.fields.insert(key, value);
                                }
                                json_reply(StatusCode::OK, json!({"id": record_id}))
                            }
                            None => json_reply(
                                StatusCode::NOT_FOUND,
                                json!({"error": "no such record"}),
                            ),
                        }
                    }
                    _ => json_reply(
                        StatusCode::METHOD_NOT_ALLOWED,
                        json!({"error": "unsupported"}),
                    ),
                }
            }
        })
        .await;

        Self {
            port,
            records,
            state,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn records(&self) -> Vec<AirtableRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Makes the next `n` requests fail with a 500.
    pub fn fail_next(&self, n: usize) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

/// Records every JSON payload POSTed to it.
pub struct MockWebhook {
    port: u16,
    received: Arc<Mutex<Vec<Value>>>,
    state: Arc<FailableState>,
}

impl MockWebhook {
    pub async fn spawn() -> Self {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let state = Arc::new(FailableState::default());

        let handler_received = received.clone();
        let handler_state = state.clone();
        let port = spawn_server(move |request: Request<Incoming>| {
            let received = handler_received.clone();
            let state = handler_state.clone();
            async move {
                if state.should_fail() {
                    return json_reply(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": "injected failure"}),
                    );
                }
                let body = request
                    .into_body()
                    .collect()
                    .await
                    .map(|collected| collected.to_bytes())
                    .unwrap_or_default();
                if let Ok(payload) = serde_json::from_slice::<Value>(&body) {
                    received.lock().unwrap().push(payload);
                }
                json_reply(StatusCode::OK, json!({"ok": true}))
            }
        })
        .await;

        Self {
            port,
            received,
            state,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    pub fn fail_next(&self, n: usize) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }
}

/// A pipeline wired to the given mocks and an in-memory store, with the
/// "ACME" tag routed to a section and the untracked fallback configured.
/// All delays are shrunk so failure paths stay fast.
pub async fn test_pipeline(airtable: &MockAirtable, webhook: &MockWebhook) -> Pipeline {
    let store = Store::connect("sqlite::memory:").await.unwrap();
    store.init_schema().await.unwrap();

    let section_id = store
        .add_section("Acme Corp", "appACME", "tblACME", Some(&webhook.url()))
        .await
        .unwrap();
    store.add_client_tag("ACME", section_id).await.unwrap();
    store
        .set_untracked_config("appMISC", "tblMISC", Some(&webhook.url()))
        .await
        .unwrap();

    let client = AirtableClient::new(
        &airtable.url(),
        "test-token",
        RetryPolicy {
            retries: 2,
            base_delay: Duration::from_millis(5),
        },
    )
    .unwrap();
    let notifier = Notifier::new(2, Duration::from_millis(5)).unwrap();
    let redirects = RedirectResolver::new(Duration::from_millis(200)).unwrap();
    Pipeline::new(store, client, notifier, redirects)
}

/// A complete tracked event routed to the "ACME" tag.
pub fn sample_tracked_event() -> Value {
    json!({
        "data": {
            "lead": {
                "id": 9,
                "email": "pat@prospect.test",
                "first_name": "Pat",
                "last_name": "Quill",
                "company": "Prospect Co",
                "custom_variables": {
                    "101": {"name": "Company Phone", "value": "555-0100"},
                    "102": {"name": "LinkedIn URL", "value": "https://linkedin.test/in/pat"}
                }
            },
            "reply": {
                "id": 41,
                "email_subject": "Re: quick question",
                "text_body": "Sounds interesting, tell me more.",
                "html_body": "<p>Sounds interesting, tell me more.</p>",
                "from_name": "Pat Quill",
                "from_email_address": "pat@prospect.test",
                "to": [{"name": "Amy Lane", "address": "amy@clientbox.io"}]
            },
            "campaign": {"id": 3, "name": "ACME: Q3 outreach"},
            "sender_email": {"id": 5, "email": "amy@clientbox.io", "name": "Amy Lane"}
        }
    })
}

/// An untracked event: reply + sender only, no campaign context. The sender
/// domain is unroutable on purpose so redirect resolution stays local.
pub fn sample_untracked_event() -> Value {
    json!({
        "data": {
            "reply": {
                "id": 77,
                "email_subject": "Re: your note",
                "text_body": "We already work with analyzecorp, thanks.",
                "from_name": "Sam Reed",
                "from_email_address": "sam@somewhere.test",
                "to": [{"name": "Amy Lane", "address": "amy@clientbox.io"}]
            },
            "sender_email": {"id": 5, "email": "amy@invalid.invalid", "name": "Amy Lane"}
        }
    })
}
