//! Outbound field-map construction.
//!
//! Key names on both maps are bit-exact contracts with the record store and
//! the downstream automation endpoint; renaming any of them requires a
//! coordinated change on the other side.

use crate::airtable::{FieldMap, UpsertAction};
use crate::event::{Campaign, Lead, Reply, SenderEmail};
use crate::extract::{split_name, CustomVars, Recipients};
use serde_json::{json, Value};
use store::ClientConfig;

/// Every reply lands as an open response; downstream categorization happens
/// outside this pipeline.
const LEAD_CATEGORY: &str = "Open Response";
const MEETING_READY_DEFAULT: &str = "No";

/// Per-tag enrichment merged into outbound maps. A tag without config is an
/// all-empty enrichment that emits nothing.
#[derive(Clone, Debug, Default)]
pub struct Enrichment {
    config: Option<ClientConfig>,
}

/// Presence rule for enrichment fields: only configured, non-empty values
/// make it into the field map.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Enrichment {
    pub fn from_config(config: Option<ClientConfig>) -> Self {
        Self { config }
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        [
            ("CC Name 1", &config.cc_name_1),
            ("CC Email 1", &config.cc_email_1),
            ("CC Name 2", &config.cc_name_2),
            ("CC Email 2", &config.cc_email_2),
            ("CC Name 3", &config.cc_name_3),
            ("CC Email 3", &config.cc_email_3),
            ("CC Name 4", &config.cc_name_4),
            ("CC Email 4", &config.cc_email_4),
            ("BCC Name 1", &config.bcc_name_1),
            ("BCC Email 1", &config.bcc_email_1),
            ("BCC Name 2", &config.bcc_name_2),
            ("BCC Email 2", &config.bcc_email_2),
            ("Our Reply", &config.reply_template),
        ]
        .into_iter()
        .filter_map(|(key, value)| present(value).map(|v| (key, v)))
        .collect()
    }

    fn apply(&self, fields: &mut FieldMap) {
        for (key, value) in self.pairs() {
            fields.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}

/// Everything the tracked builders need, borrowed from the event plus the
/// extraction results.
pub struct TrackedView<'a> {
    pub lead: &'a Lead,
    pub reply: &'a Reply,
    pub campaign: &'a Campaign,
    pub sender: &'a SenderEmail,
    pub tag: &'a str,
    pub vars: &'a CustomVars,
    pub recipients: &'a Recipients,
    pub cleaned_reply: &'a str,
}

pub fn tracked_record_fields(view: &TrackedView<'_>, enrichment: &Enrichment) -> FieldMap {
    let mut fields = FieldMap::new();
    let entries = [
        ("Lead Email", json!(view.lead.email)),
        ("Lead Name", json!(view.lead.full_name())),
        ("Lead ID", json!(view.lead.id)),
        ("Company Name", json!(view.lead.company)),
        ("Campaign Name", json!(view.campaign.name)),
        ("Campaign ID", json!(view.campaign.id)),
        ("Sender Email", json!(view.sender.email)),
        ("Sender ID", json!(view.sender.id)),
        ("Sender Name", json!(view.sender.name)),
        ("Email Subject", json!(view.reply.email_subject)),
        ("Reply we got", json!(view.cleaned_reply)),
        ("Reply ID", json!(view.reply.id)),
        ("From Name", json!(view.reply.from_name)),
        ("From Email", json!(view.reply.from_email_address)),
        ("To Email", json!(view.recipients.to_emails)),
        ("To Name", json!(view.recipients.to_names)),
        ("Prospect CC email", json!(view.recipients.cc_emails)),
        ("Prospect CC name", json!(view.recipients.cc_names)),
        ("Phone", json!(view.vars.phone)),
        ("Person Linkedin URL", json!(view.vars.linkedin)),
        ("Reply Time", json!(view.recipients.reply_time)),
        ("Client Tag", json!(view.tag)),
        ("Lead Category", json!(LEAD_CATEGORY)),
    ];
    for (key, value) in entries {
        fields.insert(key.to_string(), value);
    }
    enrichment.apply(&mut fields);
    fields
}

pub fn tracked_notify_payload(
    view: &TrackedView<'_>,
    record_id: &str,
    action: UpsertAction,
) -> Value {
    let (sender_first_name, _) = split_name(&view.sender.name);
    json!({
        // Mapped keys on the automation side; do not rename.
        "record_id": record_id,
        "reply_we_got": view.reply.text_body,
        "reply_subject": view.reply.email_subject,
        "from_email": view.reply.from_email_address,
        "sender_email": view.sender.email,
        "client_tag": view.tag,
        "first_name": view.lead.first_name,
        "last_name": view.lead.last_name,
        "company": view.lead.company,
        "company_phone": view.vars.phone,
        "linkedin": view.vars.linkedin,
        "cc_names": view.recipients.cc_names,
        "cc_emails": view.recipients.cc_emails,
        "city": view.vars.city,
        "state": view.vars.state,
        "google_maps_url": view.vars.google_maps_url,
        "address": view.vars.address,
        "full_sender_name": view.sender.name,
        "sender_first_name": sender_first_name,
        "Meeting-Ready Lead": MEETING_READY_DEFAULT,
        "from full name": view.reply.from_name,
        // Additional fields
        "lead_email": view.lead.email,
        "lead_name": view.lead.full_name(),
        "lead_id": view.lead.id,
        "campaign_name": view.campaign.name,
        "campaign_id": view.campaign.id,
        "sender_id": view.sender.id,
        "sender_name": view.sender.name,
        "reply_id": view.reply.id,
        "to_email": view.recipients.to_emails,
        "to_name": view.recipients.to_names,
        "reply_time": view.recipients.reply_time,
        "lead_category": LEAD_CATEGORY,
        "reply_status": action.reply_status(),
        "reply_cleaned": view.cleaned_reply,
    })
}

/// Untracked counterpart: no lead/campaign identity; the resolved company
/// code stands in for the client tag.
pub struct UntrackedView<'a> {
    pub reply: &'a Reply,
    pub sender: &'a SenderEmail,
    pub company_code: &'a str,
    pub recipients: &'a Recipients,
    pub cleaned_reply: &'a str,
}

pub fn untracked_record_fields(view: &UntrackedView<'_>, enrichment: &Enrichment) -> FieldMap {
    let mut fields = FieldMap::new();
    let entries = [
        ("Lead Email", json!(view.reply.from_email_address)),
        ("Lead Name", json!(view.reply.from_name)),
        ("Sender Email", json!(view.sender.email)),
        ("Sender ID", json!(view.sender.id)),
        ("Sender Name", json!(view.sender.name)),
        ("Email Subject", json!(view.reply.email_subject)),
        ("Reply we got", json!(view.cleaned_reply)),
        ("Reply ID", json!(view.reply.id)),
        ("From Name", json!(view.reply.from_name)),
        ("From Email", json!(view.reply.from_email_address)),
        ("To Email", json!(view.recipients.to_emails)),
        ("To Name", json!(view.recipients.to_names)),
        ("Prospect CC email", json!(view.recipients.cc_emails)),
        ("Prospect CC name", json!(view.recipients.cc_names)),
        ("Reply Time", json!(view.recipients.reply_time)),
        ("Client Tag", json!(view.company_code)),
        ("Lead Category", json!(LEAD_CATEGORY)),
    ];
    for (key, value) in entries {
        fields.insert(key.to_string(), value);
    }
    enrichment.apply(&mut fields);
    fields
}

pub fn untracked_notify_payload(
    view: &UntrackedView<'_>,
    record_id: &str,
    action: UpsertAction,
) -> Value {
    let (first_name, last_name) = split_name(&view.reply.from_name);
    let (sender_first_name, _) = split_name(&view.sender.name);
    json!({
        // Mapped keys on the automation side; do not rename.
        "record_id": record_id,
        "reply_we_got": view.reply.text_body,
        "reply_subject": view.reply.email_subject,
        "from_email": view.reply.from_email_address,
        "sender_email": view.sender.email,
        "client_tag": view.company_code,
        "first_name": first_name,
        "last_name": last_name,
        "cc_names": view.recipients.cc_names,
        "cc_emails": view.recipients.cc_emails,
        "full_sender_name": view.sender.name,
        "sender_first_name": sender_first_name,
        "Meeting-Ready Lead": MEETING_READY_DEFAULT,
        "from full name": view.reply.from_name,
        // Additional fields
        "lead_email": view.reply.from_email_address,
        "lead_name": view.reply.from_name,
        "sender_id": view.sender.id,
        "sender_name": view.sender.name,
        "reply_id": view.reply.id,
        "to_email": view.recipients.to_emails,
        "to_name": view.recipients.to_names,
        "reply_time": view.recipients.reply_time,
        "lead_category": LEAD_CATEGORY,
        "reply_status": action.reply_status(),
        "reply_cleaned": view.cleaned_reply,
    })
}
