// jmap-client/src/types.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Standard keywords (RFC 8621 Section 4.1.1)
pub mod keywords {
    pub const SEEN: &str = "$seen";
    pub const FLAGGED: &str = "$flagged";
    pub const ANSWERED: &str = "$answered";
    pub const DRAFT: &str = "$draft";
}

/// JMAP Mailbox object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mailbox {
    pub id: String,
    pub name: String,
    /// `None` for a top-level mailbox
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_emails: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_emails: Option<u64>,
}

impl Mailbox {
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role))
    }
}

/// JMAP Email object.
///
/// Only the requested properties are present; anything not modelled here
/// (header pseudo-properties such as `header:X-Priority:asText`) lands in
/// `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailbox_ids: Option<BTreeMap<String, bool>>,
    /// Absent key means the keyword is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Vec<EmailAddress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_attachment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<Vec<BodyPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<Vec<BodyPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<BodyPart>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Email {
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords
            .as_ref()
            .and_then(|k| k.get(keyword))
            .copied()
            .unwrap_or(false)
    }

    /// Value of a `header:<name>:asText` property, if it was requested
    pub fn header_text(&self, name: &str) -> Option<&str> {
        self.extra
            .get(&format!("header:{}:asText", name))
            .and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// EmailBodyPart, both as returned by the server and as sent on create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type")]
    #[serde(default)]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<String>,
}

/// JMAP Identity object (RFC 8621 Section 6)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparator {
    pub property: String,
    pub is_ascending: bool,
}

impl Comparator {
    pub fn new(property: impl Into<String>, is_ascending: bool) -> Self {
        Self {
            property: property.into(),
            is_ascending,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFilterCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_mailbox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// Response types (RFC 8620 Section 5)

/// Foo/get response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponse<T> {
    pub account_id: String,
    #[serde(default)]
    pub state: Option<String>,
    pub list: Vec<T>,
    #[serde(default)]
    pub not_found: Option<Vec<String>>,
}

/// Foo/query response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub account_id: String,
    #[serde(default)]
    pub query_state: Option<String>,
    pub ids: Vec<String>,
    #[serde(default)]
    pub position: u64,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Server-set properties of a created object
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedObject {
    pub id: String,
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Foo/set response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetResponse {
    pub account_id: String,
    #[serde(default)]
    pub old_state: Option<String>,
    #[serde(default)]
    pub new_state: Option<String>,
    #[serde(default)]
    pub created: Option<HashMap<String, CreatedObject>>,
    #[serde(default)]
    pub updated: Option<HashMap<String, Option<serde_json::Value>>>,
    #[serde(default)]
    pub destroyed: Option<Vec<String>>,
    #[serde(default)]
    pub not_created: Option<HashMap<String, SetError>>,
    #[serde(default)]
    pub not_updated: Option<HashMap<String, SetError>>,
    #[serde(default)]
    pub not_destroyed: Option<HashMap<String, SetError>>,
}

impl SetResponse {
    pub fn created(&self, key: &str) -> Option<&CreatedObject> {
        self.created.as_ref().and_then(|c| c.get(key))
    }

    pub fn not_created(&self, key: &str) -> Option<&SetError> {
        self.not_created.as_ref().and_then(|c| c.get(key))
    }

    pub fn is_updated(&self, id: &str) -> bool {
        self.updated.as_ref().is_some_and(|u| u.contains_key(id))
    }

    pub fn not_updated(&self, id: &str) -> Option<&SetError> {
        self.not_updated.as_ref().and_then(|u| u.get(id))
    }
}

/// Per-object failure in a Foo/set response (RFC 8620 Section 5.3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetError {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<String>>,
}

impl std::fmt::Display for SetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.type_, description),
            None => write!(f, "{}", self.type_),
        }
    }
}

/// Body of a successful upload (RFC 8620 Section 6.1)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub account_id: String,
    pub blob_id: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub size: u64,
}
