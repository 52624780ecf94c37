//! Inbound webhook payload types.
//!
//! The sending platform posts `{ "data": { lead, reply, campaign,
//! sender_email } }`. Untracked events carry no lead/campaign by
//! definition, so everything beyond the envelope is optional and validated
//! per workflow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReplyEvent {
    pub data: EventData,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<Lead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<SenderEmail>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Lead {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub company: String,
    /// Keyed by arbitrary numeric strings on the wire; only name/value matter.
    #[serde(default)]
    pub custom_variables: BTreeMap<String, CustomVariable>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CustomVariable {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Reply {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub email_subject: String,
    #[serde(default)]
    pub text_body: String,
    #[serde(default)]
    pub html_body: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub from_email_address: String,
    #[serde(default)]
    pub to: Option<Vec<Mailbox>>,
    #[serde(default)]
    pub cc: Option<Vec<Mailbox>>,
}

impl Reply {
    /// First `to` address, used by the bounce filter.
    pub fn primary_recipient(&self) -> &str {
        self.to
            .as_deref()
            .and_then(|list| list.first())
            .map(|mailbox| mailbox.address.as_str())
            .unwrap_or("")
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Mailbox {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SenderEmail {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl SenderEmail {
    /// Domain of the client's sending mailbox, used for redirect resolution.
    pub fn domain(&self) -> &str {
        self.email.split('@').nth(1).unwrap_or("")
    }
}
