//! Pure field extractors normalizing raw event fields.

use crate::event::{CustomVariable, Mailbox};
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;

/// Extracts the client tag from a tracked campaign name.
///
/// Campaign names follow the format "TAG: rest of campaign name". No colon
/// (or nothing before it) means no tag, which is an unroutable outcome, not
/// an error.
pub fn tag_from_campaign_name(campaign_name: &str) -> Option<String> {
    let (tag, _) = campaign_name.split_once(':')?;
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Comma-joined recipient lists plus the reply timestamp, captured once per
/// event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recipients {
    pub to_emails: String,
    pub to_names: String,
    pub cc_emails: String,
    pub cc_names: String,
    pub reply_time: String,
}

pub fn extract_recipients(to: Option<&[Mailbox]>, cc: Option<&[Mailbox]>) -> Recipients {
    fn join(list: Option<&[Mailbox]>, pick: fn(&Mailbox) -> &str) -> String {
        list.unwrap_or_default()
            .iter()
            .map(pick)
            .collect::<Vec<_>>()
            .join(", ")
    }

    Recipients {
        to_emails: join(to, |m| &m.address),
        to_names: join(to, |m| &m.name),
        cc_emails: join(cc, |m| &m.address),
        cc_names: join(cc, |m| &m.name),
        reply_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Cleans reply text: prefer the plain-text body, fall back to a stripped
/// rendition of the HTML body.
pub fn clean_reply(text_body: &str, html_body: &str) -> String {
    let raw = text_body.trim();
    if !raw.is_empty() || html_body.is_empty() {
        return raw.to_string();
    }

    let mut text = String::with_capacity(html_body.len());
    let mut rest = html_body;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = after[1..end].trim().to_ascii_lowercase();
        if is_line_break(&tag) || tag == "/p" {
            text.push('\n');
        }
        rest = &after[end + 1..];
    }
    text.push_str(rest);

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .trim()
        .to_string()
}

// Matches `br` and its self-closing/attributed forms, not tags that merely
// start with those letters.
fn is_line_break(tag: &str) -> bool {
    match tag.strip_prefix("br") {
        Some(rest) => {
            rest.is_empty() || rest.starts_with(|c: char| c == '/' || c.is_whitespace())
        }
        None => false,
    }
}

/// Enrichment fields pulled out of the lead's custom variables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomVars {
    pub phone: String,
    pub linkedin: String,
    pub city: String,
    pub state: String,
    pub google_maps_url: String,
    pub address: String,
}

/// Picks known variables by name. Most names match case-insensitively;
/// "City" and "State" match case-sensitively (upstream sends them
/// capitalized, and lowercase variants mean something else to some tenants).
pub fn extract_custom_vars(vars: &BTreeMap<String, CustomVariable>) -> CustomVars {
    let mut out = CustomVars::default();
    for var in vars.values() {
        if var.name.is_empty() {
            continue;
        }
        match var.name.to_lowercase().as_str() {
            "company phone" => out.phone = var.value.clone(),
            "linkedin url" => out.linkedin = var.value.clone(),
            "google maps url" => out.google_maps_url = var.value.clone(),
            "address" => out.address = var.value.clone(),
            _ => {}
        }
        match var.name.as_str() {
            "City" => out.city = var.value.clone(),
            "State" => out.state = var.value.clone(),
            _ => {}
        }
    }
    out
}

/// Splits a display name into (first token, remainder).
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.trim().split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}
