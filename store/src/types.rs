use serde::{Deserialize, Serialize};

/// A client's data home: the record-store base/table their replies land in,
/// plus an optional downstream notify webhook.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub id: i64,
    pub name: String,
    pub base_id: String,
    pub table_id: String,
    pub notify_url: Option<String>,
}

/// Maps a client tag (case-normalized, unique) to a section.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientTag {
    pub id: i64,
    pub tag: String,
    pub section_id: i64,
}

/// A regex rule inferring a client identity for untracked replies.
/// Rules are evaluated in priority-descending order; first match wins.
#[derive(Clone, Debug, PartialEq)]
pub struct CompanyCodeRule {
    pub id: i64,
    pub code: String,
    pub pattern: String,
    pub priority: i64,
}

/// Which normalized reply field a bounce filter inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceField {
    FromName,
    FromEmail,
    Body,
    Subject,
    ToAddress,
}

impl BounceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BounceField::FromName => "from_name",
            BounceField::FromEmail => "from_email",
            BounceField::Body => "body",
            BounceField::Subject => "subject",
            BounceField::ToAddress => "to_address",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "from_name" => Some(BounceField::FromName),
            "from_email" => Some(BounceField::FromEmail),
            "body" => Some(BounceField::Body),
            "subject" => Some(BounceField::Subject),
            "to_address" => Some(BounceField::ToAddress),
            _ => None,
        }
    }
}

/// How a bounce filter value is compared against the field.
///
/// The names read from the admin side's point of view: a reply passes when
/// the field does *not* contain / *not* equal the value, so a rule fires
/// (drops the reply) when the field contains or equals it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    NotContains,
    NotEquals,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::NotContains => "notContains",
            MatchType::NotEquals => "notEquals",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notContains" => Some(MatchType::NotContains),
            "notEquals" => Some(MatchType::NotEquals),
            _ => None,
        }
    }
}

/// A single bounce-suppression rule. Any firing rule drops the reply.
#[derive(Clone, Debug, PartialEq)]
pub struct BounceFilterRule {
    pub id: i64,
    pub field: BounceField,
    pub value: String,
    pub match_type: MatchType,
}

/// Optional per-tag enrichment merged into outbound field maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientConfig {
    pub client_tag: String,
    pub cc_name_1: Option<String>,
    pub cc_email_1: Option<String>,
    pub cc_name_2: Option<String>,
    pub cc_email_2: Option<String>,
    pub cc_name_3: Option<String>,
    pub cc_email_3: Option<String>,
    pub cc_name_4: Option<String>,
    pub cc_email_4: Option<String>,
    pub bcc_name_1: Option<String>,
    pub bcc_email_1: Option<String>,
    pub bcc_name_2: Option<String>,
    pub bcc_email_2: Option<String>,
    pub reply_template: Option<String>,
}

/// Singleton fallback destination for untracked replies whose company code
/// does not map to a tenant section.
#[derive(Clone, Debug, PartialEq)]
pub struct UntrackedConfig {
    pub base_id: String,
    pub table_id: String,
    pub notify_url: Option<String>,
}

/// Which pipeline a log entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workflow {
    Tracked,
    Untracked,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Tracked => "tracked",
            Workflow::Untracked => "untracked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tracked" => Some(Workflow::Tracked),
            "untracked" => Some(Workflow::Untracked),
            _ => None,
        }
    }
}

/// Pipeline stage an error was recorded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Webhook-level failure; the record carries the full raw event.
    Ingest,
    /// Record-store upsert exhausted its retries.
    RecordStore,
    /// Downstream notification failed after bounded retries.
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::RecordStore => "record_store",
            Stage::Notify => "notify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ingest" => Some(Stage::Ingest),
            "record_store" => Some(Stage::RecordStore),
            "notify" => Some(Stage::Notify),
            _ => None,
        }
    }
}

/// Terminal outcome recorded for an event in the activity log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityAction {
    Created,
    Updated,
    Filtered,
    Unroutable,
    Error,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::Filtered => "filtered",
            ActivityAction::Unroutable => "unroutable",
            ActivityAction::Error => "error",
        }
    }
}

/// A persisted failure with enough context to be replayed.
///
/// `payload`, when present, is a serialized retry capsule (owned by the
/// ingest crate); records without one may still be replayable through a
/// time-correlated sibling.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorRecord {
    pub id: i64,
    pub timestamp: String,
    pub workflow: String,
    pub stage: String,
    pub message: String,
    pub payload: Option<String>,
}

/// Append-only audit trail entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityRecord {
    pub id: i64,
    pub timestamp: String,
    pub workflow: String,
    pub client_tag: Option<String>,
    pub section_name: Option<String>,
    pub lead_email: Option<String>,
    pub action: String,
    pub details: Option<String>,
}
