//! Tracked workflow: replies tied to a known campaign, routed via the tag
//! embedded in the campaign name.

use super::{Outcome, Pipeline};
use crate::airtable::tracked_filter;
use crate::errors::{IngestError, Result};
use crate::event::ReplyEvent;
use crate::extract::{clean_reply, extract_custom_vars, extract_recipients, tag_from_campaign_name};
use crate::fields::{tracked_notify_payload, tracked_record_fields, Enrichment, TrackedView};
use crate::metrics_defs;
use serde_json::json;
use shared::counter;
use store::logs::ActivityContext;
use store::{ActivityAction, Stage, Workflow};

pub(super) async fn process(pipeline: &Pipeline, event: &ReplyEvent) -> Result<Outcome> {
    let data = &event.data;
    let lead = data.lead.as_ref().ok_or(IngestError::MissingField("data.lead"))?;
    let reply = data
        .reply
        .as_ref()
        .ok_or(IngestError::MissingField("data.reply"))?;
    let campaign = data
        .campaign
        .as_ref()
        .ok_or(IngestError::MissingField("data.campaign"))?;
    let sender = data
        .sender_email
        .as_ref()
        .ok_or(IngestError::MissingField("data.sender_email"))?;

    // Tag, then section. Either missing is unroutable, not an error.
    let Some(tag) = tag_from_campaign_name(&campaign.name) else {
        tracing::info!(campaign = %campaign.name, "no tag in campaign name");
        counter!(metrics_defs::REPLY_UNROUTABLE).increment(1);
        pipeline
            .record_activity(
                Workflow::Tracked,
                ActivityAction::Unroutable,
                ActivityContext {
                    lead_email: Some(lead.email.clone()),
                    details: Some(json!({
                        "reason": "no tag found in campaign name",
                        "campaign": campaign.name,
                    })),
                    ..Default::default()
                },
            )
            .await;
        return Ok(Outcome::Unroutable);
    };

    let Some(section) = pipeline.store.section_for_tag(&tag).await? else {
        tracing::info!(tag, "tag not mapped to any section");
        counter!(metrics_defs::REPLY_UNROUTABLE).increment(1);
        pipeline
            .record_activity(
                Workflow::Tracked,
                ActivityAction::Unroutable,
                ActivityContext {
                    client_tag: Some(tag.clone()),
                    lead_email: Some(lead.email.clone()),
                    details: Some(json!({
                        "reason": "tag not mapped to any section",
                        "tag": tag,
                    })),
                    ..Default::default()
                },
            )
            .await;
        return Ok(Outcome::Unroutable);
    };

    let vars = extract_custom_vars(&lead.custom_variables);
    let recipients = extract_recipients(reply.to.as_deref(), reply.cc.as_deref());
    let cleaned_reply = clean_reply(&reply.text_body, &reply.html_body);
    let enrichment = Enrichment::from_config(pipeline.client_config_or_none(&tag).await);

    let view = TrackedView {
        lead,
        reply,
        campaign,
        sender,
        tag: &tag,
        vars: &vars,
        recipients: &recipients,
        cleaned_reply: &cleaned_reply,
    };

    let fields = tracked_record_fields(&view, &enrichment);
    let filter = tracked_filter(lead.id, &campaign.name);
    let upsert = match pipeline
        .airtable
        .upsert(&section.base_id, &section.table_id, &filter, fields)
        .await
    {
        Ok(upsert) => upsert,
        Err(error) => {
            counter!(metrics_defs::REPLY_FAILED).increment(1);
            pipeline
                .record_error(
                    Workflow::Tracked,
                    Stage::RecordStore,
                    &format!(
                        "upsert failed for tag {tag} (section {}, lead {}): {error}",
                        section.name, lead.email
                    ),
                    None,
                )
                .await;
            pipeline
                .record_activity(
                    Workflow::Tracked,
                    ActivityAction::Error,
                    ActivityContext {
                        client_tag: Some(tag.clone()),
                        section_name: Some(section.name.clone()),
                        lead_email: Some(lead.email.clone()),
                        details: Some(json!({"error": error.to_string()})),
                    },
                )
                .await;
            return Err(error);
        }
    };

    if let Some(notify_url) = &section.notify_url {
        let payload = tracked_notify_payload(&view, &upsert.record_id, upsert.action);
        pipeline
            .deliver_notify(Workflow::Tracked, notify_url, payload)
            .await;
    }

    counter!(metrics_defs::REPLY_WRITTEN).increment(1);
    let action = match upsert.action {
        crate::airtable::UpsertAction::Created => ActivityAction::Created,
        crate::airtable::UpsertAction::Updated => ActivityAction::Updated,
    };
    pipeline
        .record_activity(
            Workflow::Tracked,
            action,
            ActivityContext {
                client_tag: Some(tag.clone()),
                section_name: Some(section.name.clone()),
                lead_email: Some(lead.email.clone()),
                details: Some(json!({
                    "base_id": section.base_id,
                    "record_id": upsert.record_id,
                })),
            },
        )
        .await;

    Ok(Outcome::Written {
        action: upsert.action,
        record_id: upsert.record_id,
    })
}
