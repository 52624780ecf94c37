//! End-to-end reply processors.
//!
//! Each inbound event runs as an independent, short-lived task:
//! `received -> (filtered | unroutable | resolved) -> written -> notified?
//! -> recorded`. The record-store write is fatal on failure; the notify
//! step is best-effort and captured as replayable state instead.

mod tracked;
mod untracked;

use crate::airtable::{AirtableClient, RetryPolicy, UpsertAction};
use crate::config::Config;
use crate::errors::Result;
use crate::event::ReplyEvent;
use crate::metrics_defs;
use crate::notifier::Notifier;
use crate::redirect::RedirectResolver;
use crate::retry::RetryCapsule;
use serde_json::Value;
use shared::counter;
use std::time::Duration;
use store::logs::ActivityContext;
use store::{ActivityAction, Stage, Store, Workflow};

/// Terminal state of one processed event.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Dropped by a bounce-filter rule; nothing written.
    Filtered,
    /// No destination resolved; recorded as activity, nothing written.
    Unroutable,
    /// Upserted into the record store (and notified, when configured).
    Written {
        action: UpsertAction,
        record_id: String,
    },
}

pub struct Pipeline {
    pub(crate) store: Store,
    pub(crate) airtable: AirtableClient,
    pub(crate) notifier: Notifier,
    pub(crate) redirects: RedirectResolver,
}

impl Pipeline {
    pub fn new(
        store: Store,
        airtable: AirtableClient,
        notifier: Notifier,
        redirects: RedirectResolver,
    ) -> Self {
        Self {
            store,
            airtable,
            notifier,
            redirects,
        }
    }

    pub fn from_config(config: &Config, store: Store) -> reqwest::Result<Self> {
        let airtable = AirtableClient::new(
            &config.record_store.api_url,
            &config.record_store.token,
            RetryPolicy {
                retries: config.record_store.retries,
                base_delay: Duration::from_millis(config.record_store.backoff_base_ms),
            },
        )?;
        let notifier = Notifier::new(
            config.notifier.attempts,
            Duration::from_millis(config.notifier.delay_ms),
        )?;
        let redirects = RedirectResolver::new(Duration::from_millis(config.redirect.timeout_ms))?;
        Ok(Self::new(store, airtable, notifier, redirects))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Runs the processor for the given workflow.
    pub async fn process(&self, workflow: Workflow, event: &ReplyEvent) -> Result<Outcome> {
        match workflow {
            Workflow::Tracked => tracked::process(self, event).await,
            Workflow::Untracked => untracked::process(self, event).await,
        }
    }

    /// Appends an activity entry. Log failures are traced, never escalated.
    pub(crate) async fn record_activity(
        &self,
        workflow: Workflow,
        action: ActivityAction,
        context: ActivityContext,
    ) {
        if let Err(error) = self.store.log_activity(workflow, action, context).await {
            tracing::error!(
                workflow = workflow.as_str(),
                action = action.as_str(),
                %error,
                "failed to append activity log entry"
            );
        }
    }

    /// Appends an error entry, serializing the capsule when one exists.
    /// Log failures are traced, never escalated.
    pub(crate) async fn record_error(
        &self,
        workflow: Workflow,
        stage: Stage,
        message: &str,
        capsule: Option<&RetryCapsule>,
    ) {
        let payload = match capsule.map(serde_json::to_string).transpose() {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, "failed to serialize retry capsule");
                None
            }
        };
        if let Err(error) = self
            .store
            .log_error(workflow, stage, message, payload.as_deref())
            .await
        {
            tracing::error!(
                workflow = workflow.as_str(),
                stage = stage.as_str(),
                %error,
                "failed to append error log entry"
            );
        }
    }

    /// Best-effort notify: a failure is logged with a notify-only capsule
    /// and absorbed, since the record-store write already succeeded.
    pub(crate) async fn deliver_notify(&self, workflow: Workflow, target_url: &str, payload: Value) {
        if let Err(error) = self.notifier.send(target_url, &payload).await {
            counter!(metrics_defs::NOTIFY_FAILED).increment(1);
            tracing::error!(
                workflow = workflow.as_str(),
                target_url,
                %error,
                "notify failed after retries; capturing for replay"
            );
            let capsule = RetryCapsule::NotifyReplay {
                target_url: target_url.to_string(),
                data: payload,
            };
            self.record_error(workflow, Stage::Notify, &error.to_string(), Some(&capsule))
                .await;
        }
    }

    /// Client config is optional enrichment; a lookup failure means no
    /// enrichment, not a failed event.
    pub(crate) async fn client_config_or_none(&self, tag: &str) -> Option<store::ClientConfig> {
        match self.store.client_config(tag).await {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(tag, %error, "client config lookup failed; continuing without");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{
        sample_tracked_event, sample_untracked_event, test_pipeline, MockAirtable, MockWebhook,
    };
    use store::{BounceField, MatchType};

    fn event(value: serde_json::Value) -> ReplyEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn tracked_event_without_tag_is_unroutable() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;

        let mut raw = sample_tracked_event();
        raw["data"]["campaign"]["name"] = serde_json::json!("no tag in here");
        let outcome = pipeline
            .process(Workflow::Tracked, &event(raw))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Unroutable);
        assert!(airtable.records().is_empty());
        assert!(webhook.received().is_empty());

        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].action, "unroutable");
    }

    #[tokio::test]
    async fn tracked_event_with_unknown_tag_is_unroutable() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;

        let mut raw = sample_tracked_event();
        raw["data"]["campaign"]["name"] = serde_json::json!("GHOST: Q3");
        let outcome = pipeline
            .process(Workflow::Tracked, &event(raw))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unroutable);
        assert!(airtable.records().is_empty());
    }

    #[tokio::test]
    async fn tracked_write_and_notify_land() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;

        let outcome = pipeline
            .process(Workflow::Tracked, &event(sample_tracked_event()))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            Outcome::Written {
                action: UpsertAction::Created,
                ..
            }
        ));

        let records = airtable.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["Lead Email"], "pat@prospect.test");
        assert_eq!(records[0].fields["Phone"], "555-0100");

        let notified = webhook.received();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0]["client_tag"], "ACME");
        assert_eq!(notified[0]["reply_status"], "Pending");

        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity[0].action, "created");
        assert_eq!(activity[0].section_name.as_deref(), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn untracked_bounce_is_filtered_before_any_io() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;
        pipeline
            .store()
            .add_bounce_filter(BounceField::FromEmail, "somewhere.test", MatchType::NotContains)
            .await
            .unwrap();

        let outcome = pipeline
            .process(Workflow::Untracked, &event(sample_untracked_event()))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Filtered);
        assert!(airtable.records().is_empty());
        assert!(webhook.received().is_empty());

        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity[0].action, "filtered");
    }

    #[tokio::test]
    async fn untracked_without_rules_falls_back_with_sentinel() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;

        let outcome = pipeline
            .process(Workflow::Untracked, &event(sample_untracked_event()))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Written { .. }));

        let records = airtable.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["Client Tag"], "N/A");

        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity[0].section_name.as_deref(), Some("Untracked"));
    }

    #[tokio::test]
    async fn untracked_code_matching_a_tag_routes_to_its_section() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;
        pipeline
            .store()
            .add_company_code_rule("ACME", "analyzecorp", 10)
            .await
            .unwrap();

        // The sample body mentions analyzecorp, so the code resolves to ACME
        // and the reply lands in that client's section.
        let outcome = pipeline
            .process(Workflow::Untracked, &event(sample_untracked_event()))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Written { .. }));

        let records = airtable.records();
        assert_eq!(records[0].fields["Client Tag"], "ACME");
        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity[0].section_name.as_deref(), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn fatal_write_failure_surfaces_and_is_recorded() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;
        airtable.fail_next(100);

        let error = pipeline
            .process(Workflow::Tracked, &event(sample_tracked_event()))
            .await
            .unwrap_err();
        assert!(matches!(error, crate::errors::IngestError::RecordStore(_)));
        assert!(webhook.received().is_empty());

        // A record-store failure carries no capsule of its own.
        assert!(pipeline.store().retryable_error_ids().await.unwrap().is_empty());
        let entry = pipeline.store().get_error(1).await.unwrap().unwrap();
        assert_eq!(entry.stage, "record_store");
        assert!(entry.payload.is_none());

        let activity = pipeline.store().recent_activity(10).await.unwrap();
        assert_eq!(activity[0].action, "error");
        assert_eq!(activity[0].section_name.as_deref(), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn notify_failure_is_absorbed_and_captured() {
        let airtable = MockAirtable::spawn().await;
        let webhook = MockWebhook::spawn().await;
        let pipeline = test_pipeline(&airtable, &webhook).await;
        webhook.fail_next(100);

        // The write succeeds, so the event as a whole succeeds.
        let outcome = pipeline
            .process(Workflow::Tracked, &event(sample_tracked_event()))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Written { .. }));
        assert_eq!(airtable.records().len(), 1);

        let ids = pipeline.store().retryable_error_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        let entry = pipeline.store().get_error(ids[0]).await.unwrap().unwrap();
        assert_eq!(entry.stage, "notify");
        let capsule: crate::retry::RetryCapsule =
            serde_json::from_str(entry.payload.as_deref().unwrap()).unwrap();
        assert!(matches!(capsule, crate::retry::RetryCapsule::NotifyReplay { .. }));
    }
}
