//! Untracked workflow: replies with no campaign context. Bounce-filter
//! first, then infer a company code from domain, redirect and body signal,
//! and route to the matching section or the untracked fallback table.

use super::{Outcome, Pipeline};
use crate::airtable::untracked_filter;
use crate::bounce::{should_filter, ReplyFields};
use crate::company_code::resolve_company_code;
use crate::errors::{IngestError, Result};
use crate::event::ReplyEvent;
use crate::extract::{clean_reply, extract_recipients};
use crate::fields::{untracked_notify_payload, untracked_record_fields, Enrichment, UntrackedView};
use crate::metrics_defs;
use serde_json::json;
use shared::counter;
use store::logs::ActivityContext;
use store::{ActivityAction, Stage, Workflow};

/// Resolved write destination for an untracked reply.
struct Destination {
    name: String,
    base_id: String,
    table_id: String,
    notify_url: Option<String>,
}

pub(super) async fn process(pipeline: &Pipeline, event: &ReplyEvent) -> Result<Outcome> {
    let data = &event.data;
    let reply = data
        .reply
        .as_ref()
        .ok_or(IngestError::MissingField("data.reply"))?;
    let sender = data
        .sender_email
        .as_ref()
        .ok_or(IngestError::MissingField("data.sender_email"))?;

    let bounce_rules = pipeline.store.bounce_filter_rules().await?;
    let reply_fields = ReplyFields {
        from_name: &reply.from_name,
        from_email: &reply.from_email_address,
        body: &reply.text_body,
        subject: &reply.email_subject,
        to_address: reply.primary_recipient(),
    };
    if let Some(rule) = should_filter(&reply_fields, &bounce_rules) {
        tracing::info!(
            rule_id = rule.id,
            field = rule.field.as_str(),
            from_email = %reply.from_email_address,
            "reply dropped by bounce filter"
        );
        counter!(metrics_defs::REPLY_FILTERED).increment(1);
        pipeline
            .record_activity(
                Workflow::Untracked,
                ActivityAction::Filtered,
                ActivityContext {
                    lead_email: Some(reply.from_email_address.clone()),
                    details: Some(json!({
                        "rule_id": rule.id,
                        "field": rule.field.as_str(),
                        "value": rule.value,
                    })),
                    ..Default::default()
                },
            )
            .await;
        return Ok(Outcome::Filtered);
    }

    // The redirect is followed on the SENDING domain: where the client's own
    // marketing site lands tells us which client this mailbox belongs to.
    let redirect_url = pipeline.redirects.resolve(sender.domain()).await;
    let code_rules = pipeline.store.company_code_rules().await?;
    let resolution = resolve_company_code(
        &reply.from_email_address,
        &reply.text_body,
        &redirect_url,
        &code_rules,
    );
    tracing::debug!(
        code = %resolution.code,
        domain = %resolution.domain,
        redirect_url,
        "company code resolved"
    );

    // A code that maps to a known tag routes into that client's section;
    // everything else (including the sentinel) lands in the fallback table.
    let destination = match pipeline.store.section_for_tag(&resolution.code).await? {
        Some(section) => Destination {
            name: section.name,
            base_id: section.base_id,
            table_id: section.table_id,
            notify_url: section.notify_url,
        },
        None => {
            let fallback = pipeline.store.untracked_config().await?;
            Destination {
                name: "Untracked".to_string(),
                base_id: fallback.base_id,
                table_id: fallback.table_id,
                notify_url: fallback.notify_url,
            }
        }
    };

    let recipients = extract_recipients(reply.to.as_deref(), reply.cc.as_deref());
    let cleaned_reply = clean_reply(&reply.text_body, &reply.html_body);
    let enrichment =
        Enrichment::from_config(pipeline.client_config_or_none(&resolution.code).await);

    let view = UntrackedView {
        reply,
        sender,
        company_code: &resolution.code,
        recipients: &recipients,
        cleaned_reply: &cleaned_reply,
    };

    let fields = untracked_record_fields(&view, &enrichment);
    let filter = untracked_filter(&reply.from_email_address, &resolution.code);
    let upsert = match pipeline
        .airtable
        .upsert(&destination.base_id, &destination.table_id, &filter, fields)
        .await
    {
        Ok(upsert) => upsert,
        Err(error) => {
            counter!(metrics_defs::REPLY_FAILED).increment(1);
            pipeline
                .record_error(
                    Workflow::Untracked,
                    Stage::RecordStore,
                    &format!(
                        "upsert failed for code {} (destination {}, prospect {}): {error}",
                        resolution.code, destination.name, reply.from_email_address
                    ),
                    None,
                )
                .await;
            pipeline
                .record_activity(
                    Workflow::Untracked,
                    ActivityAction::Error,
                    ActivityContext {
                        client_tag: Some(resolution.code.clone()),
                        section_name: Some(destination.name.clone()),
                        lead_email: Some(reply.from_email_address.clone()),
                        details: Some(json!({"error": error.to_string()})),
                    },
                )
                .await;
            return Err(error);
        }
    };

    if let Some(notify_url) = &destination.notify_url {
        let payload = untracked_notify_payload(&view, &upsert.record_id, upsert.action);
        pipeline
            .deliver_notify(Workflow::Untracked, notify_url, payload)
            .await;
    }

    counter!(metrics_defs::REPLY_WRITTEN).increment(1);
    let action = match upsert.action {
        crate::airtable::UpsertAction::Created => ActivityAction::Created,
        crate::airtable::UpsertAction::Updated => ActivityAction::Updated,
    };
    pipeline
        .record_activity(
            Workflow::Untracked,
            action,
            ActivityContext {
                client_tag: Some(resolution.code.clone()),
                section_name: Some(destination.name.clone()),
                lead_email: Some(reply.from_email_address.clone()),
                details: Some(json!({
                    "base_id": destination.base_id,
                    "record_id": upsert.record_id,
                    "redirect_url": redirect_url,
                })),
            },
        )
        .await;

    Ok(Outcome::Written {
        action: upsert.action,
        record_id: upsert.record_id,
    })
}
