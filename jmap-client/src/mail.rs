// jmap-client/src/mail.rs
//! Mail operations built on the batch engine. Each one discovers a fresh
//! session and expresses dependent lookups as same-batch back-references.
use crate::client::JmapClient;
use crate::error::{JmapError, MethodError, Result};
use crate::http::HttpClient;
use crate::request::{Ids, Method, MethodCall, RequestBuilder, ResultReference};
use crate::response::Outcome;
use crate::session::{Session, CAPABILITY_MAIL, CAPABILITY_SUBMISSION};
use crate::types::{
    keywords, BodyPart, Comparator, Email, EmailAddress, EmailFilterCondition, GetResponse,
    Identity, Mailbox, QueryResponse, SetError, SetResponse,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info, warn};

pub const MAILBOX_PROPERTIES: &[&str] = &[
    "id",
    "name",
    "parentId",
    "role",
    "sortOrder",
    "totalEmails",
    "unreadEmails",
];

pub const LIST_PROPERTIES: &[&str] = &[
    "id",
    "blobId",
    "threadId",
    "subject",
    "from",
    "to",
    "cc",
    "bcc",
    "replyTo",
    "keywords",
    "mailboxIds",
    "size",
    "receivedAt",
    "sentAt",
    "preview",
    "hasAttachment",
    "header:X-Priority:asText",
    "header:Importance:asText",
    "header:Priority:asText",
    "header:Auto-Submitted:asText",
];

pub const MESSAGE_PROPERTIES: &[&str] = &[
    "id",
    "blobId",
    "threadId",
    "subject",
    "from",
    "to",
    "cc",
    "bcc",
    "replyTo",
    "keywords",
    "mailboxIds",
    "size",
    "receivedAt",
    "sentAt",
    "hasAttachment",
    "textBody",
    "htmlBody",
    "attachments",
    "header:X-Priority:asText",
    "header:Importance:asText",
    "header:Priority:asText",
    "header:Auto-Submitted:asText",
];

pub const OUTBOX: &str = "outbox";

/// Case-insensitive lookup by mailbox name
pub fn find_mailbox<'a>(mailboxes: &'a [Mailbox], name: &str) -> Result<&'a Mailbox> {
    let wanted = name.to_lowercase();
    mailboxes
        .iter()
        .find(|m| m.name.to_lowercase() == wanted)
        .ok_or_else(|| JmapError::not_found("mailbox", name))
}

/// Outbox by role, falling back to the conventional name
pub fn find_outbox(mailboxes: &[Mailbox]) -> Result<&Mailbox> {
    mailboxes
        .iter()
        .find(|m| m.has_role(OUTBOX))
        .map(Ok)
        .unwrap_or_else(|| find_mailbox(mailboxes, OUTBOX))
}

/// Escape a keyword for use inside a patch path (RFC 6901)
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Patch touching only the named keywords: `true` sets, `false` clears.
pub fn keyword_patch(changes: &[(&str, bool)]) -> Map<String, Value> {
    changes
        .iter()
        .map(|(keyword, set)| {
            let value = if *set { Value::Bool(true) } else { Value::Null };
            (format!("keywords/{}", escape_pointer(keyword)), value)
        })
        .collect()
}

/// Parameters of a message listing
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub mailbox: String,
    pub limit: u64,
    pub sort_property: String,
    pub ascending: bool,
    pub text: Option<String>,
    pub properties: Vec<String>,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self {
            mailbox: "Inbox".to_string(),
            limit: 10,
            sort_property: "receivedAt".to_string(),
            ascending: false,
            text: None,
            properties: LIST_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// An email whose body parts have been downloaded
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(flatten)]
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Result of an Email/set update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum UpdateOutcome {
    Updated,
    /// The id does not exist or nothing changed
    NotUpdated(SetError),
    /// The whole call failed
    Rejected(MethodError),
}

/// Body content of an outgoing message
#[derive(Debug, Clone)]
pub enum BodyContent {
    Inline(String),
    Blob(String),
}

#[derive(Debug, Clone)]
pub enum AttachmentContent {
    Inline(Vec<u8>),
    Blob(String),
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    pub content: AttachmentContent,
}

/// Outgoing message
#[derive(Debug, Clone)]
pub struct Draft {
    /// Header sender; the sending identity is used when absent
    pub from: Option<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub body: BodyContent,
    /// Body is HTML rather than plain text
    pub html: bool,
    pub attachments: Vec<Attachment>,
}

impl Draft {
    fn recipients(&self) -> impl Iterator<Item = &EmailAddress> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    fn body_type(&self) -> &'static str {
        if self.html {
            "text/html"
        } else {
            "text/plain"
        }
    }
}

/// Why one call of the send batch did not produce its object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CallError {
    Method(MethodError),
    NotCreated(SetError),
    NoResponse,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Method(e) => write!(f, "method error: {}", e),
            CallError::NotCreated(e) => write!(f, "not created: {}", e),
            CallError::NoResponse => write!(f, "no response from server"),
        }
    }
}

/// Result of compose-and-send. Nothing is rolled back, so a created
/// message whose submission failed stays in the outbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SendOutcome {
    Sent {
        email_id: String,
        submission_id: String,
    },
    CreatedNotSent {
        email_id: String,
        error: CallError,
    },
    Rejected {
        error: CallError,
    },
}

struct SendPrerequisites {
    outbox_id: String,
    identity: Identity,
}

fn push_mailbox_calls(builder: &mut RequestBuilder, account_id: &str) -> Result<()> {
    let query = MethodCall::mailbox_query("mq", account_id);
    let get = MethodCall::mailbox_get(
        "mg",
        account_id,
        Ids::Ref(ResultReference::ids(&query)),
        MAILBOX_PROPERTIES,
    );
    builder.call(query)?.call(get)?;
    Ok(())
}

fn created_outcome(outcome: &Outcome, key: &str) -> Result<std::result::Result<String, CallError>> {
    match outcome {
        Outcome::Error(e) => Ok(Err(CallError::Method(e.clone()))),
        Outcome::Success(map) => {
            let set: SetResponse = serde_json::from_value(Value::Object(map.clone()))
                .map_err(|e| JmapError::Protocol(format!("unexpected set result: {}", e)))?;
            if let Some(created) = set.created(key) {
                Ok(Ok(created.id.clone()))
            } else if let Some(err) = set.not_created(key) {
                Ok(Err(CallError::NotCreated(err.clone())))
            } else {
                Ok(Err(CallError::NoResponse))
            }
        }
    }
}

impl<C: HttpClient> JmapClient<C> {
    async fn mailboxes_in(&self, session: &Session, account_id: &str) -> Result<Vec<Mailbox>> {
        let mut builder = RequestBuilder::new();
        push_mailbox_calls(&mut builder, account_id)?;
        let resp = self.send(session, &builder.build()).await?;

        resp.result::<QueryResponse>(Method::MailboxQuery, "mq")?;
        let got: GetResponse<Mailbox> = resp.result(Method::MailboxGet, "mg")?;
        Ok(got.list)
    }

    /// All mailboxes of the primary mail account, flat, parent ids intact
    pub async fn list_mailboxes(&self) -> Result<Vec<Mailbox>> {
        let session = self.session().await?;
        let account_id = session.account_id_for(CAPABILITY_MAIL)?;
        self.mailboxes_in(&session, account_id).await
    }

    /// Messages of one mailbox: Email/query and Email/get in a single batch
    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<Email>> {
        let session = self.session().await?;
        let account_id = session.account_id_for(CAPABILITY_MAIL)?;

        let mailboxes = self.mailboxes_in(&session, account_id).await?;
        let mailbox = find_mailbox(&mailboxes, &query.mailbox)?;

        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let filter = EmailFilterCondition {
            in_mailbox: Some(mailbox.id.clone()),
            text: query.text.clone(),
        };
        let email_query = MethodCall::email_query(
            "eq",
            account_id,
            &filter,
            &[Comparator::new(&query.sort_property, query.ascending)],
            Some(query.limit),
        );
        let properties: Vec<&str> = query.properties.iter().map(String::as_str).collect();
        let email_get = MethodCall::email_get(
            "eg",
            account_id,
            Ids::Ref(ResultReference::ids(&email_query)),
            &properties,
        );

        let mut builder = RequestBuilder::new();
        builder.call(email_query)?.call(email_get)?;
        let resp = self.send(&session, &builder.build()).await?;

        resp.result::<QueryResponse>(Method::EmailQuery, "eq")?;
        let got: GetResponse<Email> = resp.result(Method::EmailGet, "eg")?;
        debug!(mailbox = %mailbox.name, count = got.list.len(), "messages listed");
        Ok(got.list)
    }

    /// One message with its text and HTML bodies downloaded
    pub async fn get_message(&self, id: &str) -> Result<Message> {
        let session = self.session().await?;
        let account_id = session.account_id_for(CAPABILITY_MAIL)?;

        let call = MethodCall::email_get(
            "eg",
            account_id,
            Ids::List(vec![id.to_string()]),
            MESSAGE_PROPERTIES,
        );
        let resp = self.call(&session, call).await?;
        let got: GetResponse<Email> = resp.result(Method::EmailGet, "eg")?;
        let email = got
            .list
            .into_iter()
            .next()
            .ok_or_else(|| JmapError::not_found("message", id))?;

        let text = self
            .resolve_parts(&session, account_id, email.text_body.as_deref())
            .await?;
        let html = self
            .resolve_parts(&session, account_id, email.html_body.as_deref())
            .await?;

        Ok(Message { email, text, html })
    }

    async fn resolve_parts(
        &self,
        session: &Session,
        account_id: &str,
        parts: Option<&[BodyPart]>,
    ) -> Result<Option<String>> {
        let mut contents = Vec::new();
        for part in parts.unwrap_or_default() {
            let Some(blob_id) = part.blob_id.as_deref() else {
                continue;
            };
            let media_type = if part.type_.is_empty() {
                "text/plain"
            } else {
                part.type_.as_str()
            };
            // textBody may list inline media alongside the text
            if !media_type.to_ascii_lowercase().starts_with("text/") {
                debug!(blob_id, media_type, "skipping non-text body part");
                continue;
            }
            contents.push(
                self.download_text(session, account_id, blob_id, media_type)
                    .await?,
            );
        }
        Ok(if contents.is_empty() {
            None
        } else {
            Some(contents.join("\n"))
        })
    }

    /// Apply a patch to one email
    pub async fn update_email(&self, id: &str, patch: Map<String, Value>) -> Result<UpdateOutcome> {
        let session = self.session().await?;
        let account_id = session.account_id_for(CAPABILITY_MAIL)?;

        let resp = self
            .call(&session, MethodCall::email_update("u", account_id, id, patch))
            .await?;

        match resp.outcome(Method::EmailSet, "u")? {
            Outcome::Error(e) => Ok(UpdateOutcome::Rejected(e.clone())),
            Outcome::Success(map) => {
                let set: SetResponse = serde_json::from_value(Value::Object(map.clone()))
                    .map_err(|e| JmapError::Protocol(format!("unexpected set result: {}", e)))?;
                if set.is_updated(id) {
                    Ok(UpdateOutcome::Updated)
                } else if let Some(err) = set.not_updated(id) {
                    debug!(id, reason = %err, "email not updated");
                    Ok(UpdateOutcome::NotUpdated(err.clone()))
                } else {
                    Err(JmapError::Protocol(format!(
                        "Email/set mentions neither updated nor notUpdated for {}",
                        id
                    )))
                }
            }
        }
    }

    /// Set (`true`) or clear (`false`) keywords; other keywords are untouched
    pub async fn set_keywords(&self, id: &str, changes: &[(&str, bool)]) -> Result<UpdateOutcome> {
        if changes.is_empty() {
            return Err(JmapError::InvalidRequest("no keyword changes given".to_string()));
        }
        self.update_email(id, keyword_patch(changes)).await
    }

    /// Replace an email's mailbox membership with the named mailbox
    pub async fn move_to_mailbox(&self, id: &str, mailbox_name: &str) -> Result<UpdateOutcome> {
        let mailboxes = self.list_mailboxes().await?;
        let target = find_mailbox(&mailboxes, mailbox_name)?;

        let mut membership = Map::new();
        membership.insert(target.id.clone(), Value::Bool(true));
        let mut patch = Map::new();
        patch.insert("mailboxIds".to_string(), Value::Object(membership));
        self.update_email(id, patch).await
    }

    async fn send_prerequisites(
        &self,
        session: &Session,
        mail_account: &str,
        submission_account: &str,
    ) -> Result<SendPrerequisites> {
        let mut builder = RequestBuilder::new();
        push_mailbox_calls(&mut builder, mail_account)?;
        builder.call(MethodCall::identity_get("ig", submission_account))?;
        let resp = self.send(session, &builder.build()).await?;

        let mailboxes: GetResponse<Mailbox> = resp.result(Method::MailboxGet, "mg")?;
        let outbox_id = find_outbox(&mailboxes.list)?.id.clone();

        let identities: GetResponse<Identity> = resp.result(Method::IdentityGet, "ig")?;
        let identity = identities
            .list
            .into_iter()
            .next()
            .ok_or_else(|| JmapError::NoIdentity(submission_account.to_string()))?;

        Ok(SendPrerequisites {
            outbox_id,
            identity,
        })
    }

    /// Compose a message in the outbox and submit it, in one batch.
    pub async fn send_email(&self, draft: &Draft) -> Result<SendOutcome> {
        if draft.recipients().next().is_none() {
            return Err(JmapError::InvalidRequest("message has no recipients".to_string()));
        }

        let session = self.session().await?;
        let mail_account = session.account_id_for(CAPABILITY_MAIL)?;
        let submission_account = session.account_id_for(CAPABILITY_SUBMISSION)?;

        let prereq = self
            .send_prerequisites(&session, mail_account, submission_account)
            .await?;

        let body_blob = match &draft.body {
            BodyContent::Blob(id) => id.clone(),
            BodyContent::Inline(text) => {
                self.upload(
                    &session,
                    mail_account,
                    draft.body_type(),
                    text.as_bytes().to_vec(),
                )
                .await?
            }
        };

        let mut attachments = Vec::with_capacity(draft.attachments.len());
        for attachment in &draft.attachments {
            let blob_id = match &attachment.content {
                AttachmentContent::Blob(id) => id.clone(),
                AttachmentContent::Inline(data) => {
                    self.upload(&session, mail_account, &attachment.media_type, data.clone())
                        .await?
                }
            };
            attachments.push(BodyPart {
                blob_id: Some(blob_id),
                type_: attachment.media_type.clone(),
                name: Some(attachment.name.clone()),
                disposition: Some("attachment".to_string()),
                ..Default::default()
            });
        }

        let from = draft.from.clone().unwrap_or_else(|| EmailAddress {
            name: prereq.identity.name.clone().filter(|n| !n.is_empty()),
            email: prereq.identity.email.clone(),
        });
        let body_part = BodyPart {
            blob_id: Some(body_blob),
            type_: draft.body_type().to_string(),
            charset: Some("utf-8".to_string()),
            ..Default::default()
        };

        let outbox_id = prereq.outbox_id.as_str();
        let seen = keywords::SEEN;
        let mut email = json!({
            "mailboxIds": { outbox_id: true },
            "keywords": { seen: true },
            "from": [from],
            "to": draft.to,
            "subject": draft.subject,
        });
        if !draft.cc.is_empty() {
            email["cc"] = json!(draft.cc);
        }
        if !draft.bcc.is_empty() {
            email["bcc"] = json!(draft.bcc);
        }
        if draft.html {
            email["htmlBody"] = json!([body_part]);
        } else {
            email["textBody"] = json!([body_part]);
        }
        if !attachments.is_empty() {
            email["attachments"] = json!(attachments);
        }

        let rcpt_to: Vec<Value> = draft
            .recipients()
            .map(|r| json!({ "email": r.email }))
            .collect();
        let submission = json!({
            "identityId": prereq.identity.id,
            "emailId": "#draft",
            "envelope": {
                "mailFrom": { "email": prereq.identity.email },
                "rcptTo": rcpt_to,
            },
        });

        let mut builder = RequestBuilder::new();
        builder
            .call(MethodCall::email_create("c1", mail_account, "draft", email))?
            .call(MethodCall::submission_create(
                "c2",
                submission_account,
                "send",
                submission,
            ))?;
        let resp = self.send(&session, &builder.build()).await?;

        let email_id = match created_outcome(resp.outcome(Method::EmailSet, "c1")?, "draft")? {
            Ok(id) => id,
            Err(error) => {
                warn!(%error, "message was not created");
                return Ok(SendOutcome::Rejected { error });
            }
        };

        let submission = match resp.get(Method::EmailSubmissionSet, "c2") {
            Some(r) => created_outcome(&r.outcome, "send")?,
            None => Err(CallError::NoResponse),
        };

        match submission {
            Ok(submission_id) => {
                info!(email_id = %email_id, submission_id = %submission_id, "message submitted");
                Ok(SendOutcome::Sent {
                    email_id,
                    submission_id,
                })
            }
            Err(error) => {
                warn!(email_id = %email_id, %error, "message created but not submitted");
                Ok(SendOutcome::CreatedNotSent { email_id, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(id: &str, name: &str, role: Option<&str>) -> Mailbox {
        Mailbox {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: None,
            role: role.map(str::to_string),
            sort_order: None,
            total_emails: None,
            unread_emails: None,
        }
    }

    #[test]
    fn test_find_mailbox_ignores_case() {
        let boxes = vec![mailbox("M1", "INBOX", Some("inbox")), mailbox("M2", "Drafts", None)];
        assert_eq!(find_mailbox(&boxes, "inbox").unwrap().id, "M1");
        assert_eq!(find_mailbox(&boxes, "dRAFTS").unwrap().id, "M2");
        assert!(matches!(
            find_mailbox(&boxes, "Archive"),
            Err(JmapError::NotFound { kind: "mailbox", .. })
        ));
    }

    #[test]
    fn test_find_outbox_prefers_role() {
        let boxes = vec![
            mailbox("M1", "Outbox", None),
            mailbox("M2", "Sending", Some("outbox")),
        ];
        assert_eq!(find_outbox(&boxes).unwrap().id, "M2");
        assert_eq!(find_outbox(&boxes[..1]).unwrap().id, "M1");
        assert!(find_outbox(&[mailbox("M3", "Sent", Some("sent"))]).is_err());
    }

    #[test]
    fn test_keyword_patch_is_partial() {
        let patch = keyword_patch(&[("$seen", true), ("$flagged", false), ("a/b~c", true)]);
        assert_eq!(
            Value::Object(patch),
            json!({
                "keywords/$seen": true,
                "keywords/$flagged": null,
                "keywords/a~1b~0c": true
            })
        );
    }

    #[test]
    fn test_send_outcome_serialization() {
        let outcome = SendOutcome::CreatedNotSent {
            email_id: "E1".to_string(),
            error: CallError::NotCreated(SetError {
                type_: "forbiddenFrom".to_string(),
                description: None,
                properties: None,
            }),
        };
        assert_eq!(
            serde_json::to_value(outcome).unwrap(),
            json!({
                "status": "createdNotSent",
                "emailId": "E1",
                "error": {"kind": "notCreated", "type": "forbiddenFrom"}
            })
        );

        let sent = SendOutcome::Sent {
            email_id: "E2".to_string(),
            submission_id: "S2".to_string(),
        };
        assert_eq!(
            serde_json::to_value(sent).unwrap(),
            json!({"status": "sent", "emailId": "E2", "submissionId": "S2"})
        );
    }
}
