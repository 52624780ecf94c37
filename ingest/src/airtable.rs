//! Record-store (Airtable) client: search-then-create-or-update with
//! exponential backoff around every network call.

use crate::errors::{IngestError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Outbound field map. Key names are part of the contract with the record
/// store and must not be renamed.
pub type FieldMap = Map<String, Value>;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

impl UpsertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertAction::Created => "created",
            UpsertAction::Updated => "updated",
        }
    }

    /// The reply status written alongside this action.
    pub fn reply_status(&self) -> &'static str {
        match self {
            UpsertAction::Created => "Pending",
            UpsertAction::Updated => "Pending again",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Upsert {
    pub record_id: String,
    pub action: UpsertAction,
}

/// Bounded exponential backoff: `retries` retries after the first attempt,
/// starting at `base_delay` and doubling.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

pub struct AirtableClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
    retry: RetryPolicy,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

impl AirtableClient {
    pub fn new(api_url: &str, token: &str, retry: RetryPolicy) -> reqwest::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry,
        })
    }

    fn table_url(&self, base: &str, table: &str) -> String {
        format!("{}/{}/{}", self.api_url, base, table)
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.retry.base_delay;
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= self.retry.retries {
                        return Err(error);
                    }
                    tracing::warn!(attempt, %error, "record store call failed, backing off");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(IngestError::RecordStore(format!(
            "{what} failed ({status}): {body}"
        )))
    }

    /// Searches for records matching a filter formula.
    pub async fn search(
        &self,
        base: &str,
        table: &str,
        filter_by_formula: &str,
    ) -> Result<Vec<AirtableRecord>> {
        self.with_retry(|| async {
            let response = self
                .http
                .get(self.table_url(base, table))
                .bearer_auth(&self.token)
                .query(&[("filterByFormula", filter_by_formula)])
                .send()
                .await?;
            let response = Self::check(response, "search").await?;
            let body: SearchResponse = response.json().await?;
            Ok(body.records)
        })
        .await
    }

    /// Creates a record, returning its id.
    pub async fn create(&self, base: &str, table: &str, fields: &FieldMap) -> Result<String> {
        self.with_retry(|| async {
            let response = self
                .http
                .post(self.table_url(base, table))
                .bearer_auth(&self.token)
                .json(&serde_json::json!({ "fields": fields }))
                .send()
                .await?;
            let response = Self::check(response, "create").await?;
            let body: CreateResponse = response.json().await?;
            Ok(body.id)
        })
        .await
    }

    /// Updates an existing record in place.
    pub async fn update(
        &self,
        base: &str,
        table: &str,
        record_id: &str,
        fields: &FieldMap,
    ) -> Result<()> {
        self.with_retry(|| async {
            let response = self
                .http
                .patch(format!("{}/{}", self.table_url(base, table), record_id))
                .bearer_auth(&self.token)
                .json(&serde_json::json!({ "fields": fields }))
                .send()
                .await?;
            Self::check(response, "update").await?;
            Ok(())
        })
        .await
    }

    /// Search by natural key, then create or update the first match.
    ///
    /// Not protected against concurrent duplicates: two events with the same
    /// natural key racing through here can both observe "no existing record"
    /// and create twice. Accepted limitation.
    pub async fn upsert(
        &self,
        base: &str,
        table: &str,
        filter_by_formula: &str,
        mut fields: FieldMap,
    ) -> Result<Upsert> {
        let existing = self.search(base, table, filter_by_formula).await?;
        let action = if existing.is_empty() {
            UpsertAction::Created
        } else {
            UpsertAction::Updated
        };
        fields.insert(
            "Reply Status".to_string(),
            Value::String(action.reply_status().to_string()),
        );

        let record_id = match existing.into_iter().next() {
            Some(record) => {
                self.update(base, table, &record.id, &fields).await?;
                record.id
            }
            None => self.create(base, table, &fields).await?,
        };

        Ok(Upsert { record_id, action })
    }
}

/// Escapes a value for embedding in a filter formula string literal.
fn escape_formula_value(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Natural-key filter for tracked replies: lead id + campaign name.
pub fn tracked_filter(lead_id: i64, campaign_name: &str) -> String {
    format!(
        r#"AND({{Lead ID}} = "{lead_id}", {{Campaign Name}} = "{}")"#,
        escape_formula_value(campaign_name)
    )
}

/// Natural-key filter for untracked replies: prospect email + resolved code.
pub fn untracked_filter(lead_email: &str, client_tag: &str) -> String {
    format!(
        r#"AND({{Lead Email}} = "{}", {{Client Tag}} = "{}")"#,
        escape_formula_value(lead_email),
        escape_formula_value(client_tag)
    )
}
