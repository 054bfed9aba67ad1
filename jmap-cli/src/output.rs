// jmap-cli/src/output.rs
use jmap_client::{Email, EmailAddress, JmapError, Mailbox, Message};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::IsTerminal;

/// Output format option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Auto-detect based on TTY
    Auto,
    Json,
    Human,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Auto
        }
    }

    pub fn is_json(self) -> bool {
        match self {
            Self::Json => true,
            Self::Human => false,
            Self::Auto => !std::io::stdout().is_terminal(),
        }
    }
}

/// Types that can be rendered either way
pub trait Formattable: Serialize {
    /// JSON envelope for scripts
    fn to_json(&self) -> String {
        serde_json::to_string(&Response::ok(self)).unwrap_or_default()
    }

    fn to_human(&self) -> String;
}

pub fn format_output<T: Formattable>(data: &T, format: OutputFormat) -> String {
    if format.is_json() {
        data.to_json()
    } else {
        data.to_human()
    }
}

pub fn print_output<T: Formattable>(data: &T, format: OutputFormat) {
    let text = format_output(data, format);
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

/// Standard JSON response envelope
#[derive(Debug, Serialize)]
pub struct Response<T> {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorResponse>,
}

impl<T> Response<T> {
    pub fn ok(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> Response<()> {
        Response::<()> {
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    type_: &'static str,
    message: String,
    retryable: bool,
}

impl ErrorResponse {
    pub fn from_error(error: &anyhow::Error) -> Self {
        let (type_, retryable) = match error.downcast_ref::<JmapError>() {
            Some(JmapError::Configuration(_)) => ("configuration", false),
            Some(JmapError::Authentication(_)) => ("auth_failed", false),
            Some(JmapError::Discovery(_)) => ("discovery_failed", true),
            Some(JmapError::Capability(_)) => ("unsupported", false),
            Some(JmapError::InvalidRequest(_)) => ("validation_failed", false),
            Some(JmapError::Protocol(_)) => ("protocol_error", true),
            Some(JmapError::Method { .. }) => ("method_error", false),
            Some(JmapError::NotFound { .. }) => ("not_found", false),
            Some(JmapError::NoIdentity(_)) => ("no_identity", false),
            Some(JmapError::Blob(_)) => ("blob_failed", true),
            Some(JmapError::Push(_)) => ("push_failed", true),
            None => ("internal", false),
        };
        Self {
            type_,
            message: format!("{:#}", error),
            retryable,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.retryable {
            ExitCode::TransientError
        } else {
            ExitCode::PermanentError
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Exit codes for scripted callers
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    TransientError = 1,
    PermanentError = 2,
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::TransientError => write!(f, "transient_error"),
            Self::PermanentError => write!(f, "permanent_error"),
        }
    }
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

pub fn print_response<T: Serialize>(resp: &Response<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(resp)?);
    Ok(())
}

/// Print a styled success message
pub fn print_success(message: &str) {
    let term = console::Term::stdout();
    let _ = term.write_str(&format!("{} {}\n", console::style("✓").green(), message));
}

/// Print a styled error message
pub fn print_error(message: &str) {
    let term = console::Term::stderr();
    let _ = term.write_str(&format!("{} {}\n", console::style("Error:").red(), message));
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    let term = console::Term::stderr();
    let _ = term.write_str(&format!("{} {}\n", console::style("Warning:").yellow(), message));
}

fn format_addresses(addresses: Option<&[EmailAddress]>) -> Option<String> {
    let addresses = addresses.filter(|a| !a.is_empty())?;
    Some(
        addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Header pseudo-properties shown in listings, with their display labels
const HEADER_LABELS: &[&str] = &["X-Priority", "Importance", "Priority", "Auto-Submitted"];

fn header_label(key: &str) -> Option<&str> {
    key.strip_prefix("header:")?.strip_suffix(":asText")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Drop blank properties and shorten `header:<Name>:asText` keys to `<Name>`
fn clean_email_json(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    map.into_iter()
        .filter(|(_, v)| !is_blank(v))
        .map(|(key, v)| {
            let label = header_label(&key).map(str::to_string);
            (label.unwrap_or(key), v)
        })
        .collect::<Map<String, Value>>()
        .into()
}

fn email_lines(email: &Email, out: &mut Vec<String>) {
    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.push(format!("{}: {}", label, value));
        }
    };

    field("ID", Some(email.id.clone()));
    field("Subject", email.subject.clone());
    field("From", format_addresses(email.from.as_deref()));
    field("To", format_addresses(email.to.as_deref()));
    field("Cc", format_addresses(email.cc.as_deref()));
    field("Bcc", format_addresses(email.bcc.as_deref()));
    field("Received", email.received_at.map(|t| t.to_rfc3339()));
    field("Size", email.size.map(|s| s.to_string()));
    if email.has_attachment == Some(true) {
        field("Has Attachment", Some("true".to_string()));
    }
    let set: Vec<&str> = email
        .keywords
        .iter()
        .flatten()
        .filter(|(_, on)| **on)
        .map(|(k, _)| k.as_str())
        .collect();
    field("Keywords", Some(set.join(" ")));
    field("Preview", email.preview.clone());
    for label in HEADER_LABELS.iter().copied() {
        field(label, email.header_text(label).map(|v| v.trim().to_string()));
    }
}

/// Flat message listing
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct MessageList(pub Vec<Email>);

impl Formattable for MessageList {
    fn to_json(&self) -> String {
        let cleaned: Vec<Value> = self
            .0
            .iter()
            .map(|email| serde_json::to_value(email).map(clean_email_json))
            .collect::<Result<_, _>>()
            .unwrap_or_default();
        serde_json::to_string(&Response::ok(cleaned)).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.0.is_empty() {
            return "No messages".to_string();
        }
        let mut lines = Vec::new();
        for email in &self.0 {
            email_lines(email, &mut lines);
            lines.push("---".to_string());
        }
        lines.join("\n")
    }
}

/// One message with its bodies
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct MessageView(pub Message);

impl Formattable for MessageView {
    fn to_json(&self) -> String {
        let value = serde_json::to_value(&self.0)
            .map(clean_email_json)
            .unwrap_or_default();
        serde_json::to_string(&Response::ok(value)).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        email_lines(&self.0.email, &mut lines);
        let body = self.0.text.as_deref().or(self.0.html.as_deref());
        if let Some(body) = body {
            lines.push(String::new());
            lines.push(body.to_string());
        }
        lines.join("\n")
    }
}

/// Mailboxes rendered as a tree under their parents
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct MailboxTree(pub Vec<Mailbox>);

impl MailboxTree {
    fn render_children<'a>(
        children: &HashMap<Option<&'a str>, Vec<&'a Mailbox>>,
        parent: Option<&'a str>,
        prefix: &str,
        visited: &mut HashSet<&'a str>,
        out: &mut String,
    ) {
        let Some(list) = children.get(&parent) else {
            return;
        };
        let list: Vec<&'a Mailbox> = list
            .iter()
            .copied()
            .filter(|m| !visited.contains(m.id.as_str()))
            .collect();
        for (index, mailbox) in list.iter().copied().enumerate() {
            // A parent chain that loops back is cut at the first repeat.
            if !visited.insert(mailbox.id.as_str()) {
                continue;
            }
            let last = index == list.len() - 1;
            out.push_str(prefix);
            out.push_str(if last { "└── " } else { "├── " });
            out.push_str(&mailbox.name);
            if let Some(role) = &mailbox.role {
                out.push_str(&format!(" ({})", role));
            }
            out.push('\n');
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            Self::render_children(
                children,
                Some(mailbox.id.as_str()),
                &child_prefix,
                visited,
                out,
            );
        }
    }

    pub fn render(&self) -> String {
        let known: HashSet<&str> = self.0.iter().map(|m| m.id.as_str()).collect();
        let mut children: HashMap<Option<&str>, Vec<&Mailbox>> = HashMap::new();
        for mailbox in &self.0 {
            // Orphans hang off the root so nothing is hidden.
            let parent = mailbox
                .parent_id
                .as_deref()
                .filter(|p| known.contains(p) && *p != mailbox.id);
            children.entry(parent).or_default().push(mailbox);
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| {
                a.sort_order
                    .unwrap_or(0)
                    .cmp(&b.sort_order.unwrap_or(0))
                    .then_with(|| a.name.cmp(&b.name))
            });
        }

        let mut out = String::new();
        let mut visited = HashSet::new();
        Self::render_children(&children, None, "", &mut visited, &mut out);

        // Mailboxes only reachable through a cycle
        for mailbox in &self.0 {
            if !visited.contains(mailbox.id.as_str()) {
                let mut cycle = HashMap::new();
                cycle.insert(None, vec![mailbox]);
                Self::render_children(&cycle, None, "", &mut visited, &mut out);
                Self::render_children(
                    &children,
                    Some(mailbox.id.as_str()),
                    "    ",
                    &mut visited,
                    &mut out,
                );
            }
        }
        out
    }
}

impl Formattable for MailboxTree {
    fn to_human(&self) -> String {
        if self.0.is_empty() {
            return "No mailboxes".to_string();
        }
        self.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mailbox(id: &str, name: &str, parent: Option<&str>, role: Option<&str>) -> Mailbox {
        Mailbox {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent.map(str::to_string),
            role: role.map(str::to_string),
            sort_order: None,
            total_emails: None,
            unread_emails: None,
        }
    }

    #[test]
    fn test_tree_nests_children() {
        let tree = MailboxTree(vec![
            mailbox("M2", "Drafts", Some("M1"), Some("drafts")),
            mailbox("M1", "Inbox", None, Some("inbox")),
            mailbox("M3", "Archive", None, None),
        ]);
        assert_eq!(
            tree.render(),
            "├── Archive\n└── Inbox (inbox)\n    └── Drafts (drafts)\n"
        );
    }

    #[test]
    fn test_tree_survives_parent_cycle() {
        let tree = MailboxTree(vec![
            mailbox("A", "Alpha", Some("B"), None),
            mailbox("B", "Beta", Some("A"), None),
            mailbox("S", "Self", Some("S"), None),
        ]);
        let rendered = tree.render();
        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("Beta"));
        assert!(rendered.contains("Self"));
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn test_orphan_is_shown_at_root() {
        let tree = MailboxTree(vec![mailbox("M9", "Lost", Some("gone"), None)]);
        assert_eq!(tree.render(), "└── Lost\n");
    }

    #[test]
    fn test_clean_email_json() {
        let cleaned = clean_email_json(json!({
            "id": "E1",
            "subject": "",
            "cc": [],
            "preview": null,
            "header:X-Priority:asText": "1"
        }));
        assert_eq!(cleaned, json!({"id": "E1", "X-Priority": "1"}));
    }

    #[test]
    fn test_error_envelope() {
        let err = anyhow::Error::new(JmapError::Protocol("boom".to_string()));
        let resp = ErrorResponse::from_error(&err);
        assert_eq!(resp.exit_code().code(), 1);
        let json = serde_json::to_value(Response::<()>::error(resp)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["type"], "protocol_error");
        assert_eq!(json["error"]["retryable"], true);

        let missing = anyhow::Error::new(JmapError::Configuration("x".to_string()));
        assert_eq!(ErrorResponse::from_error(&missing).exit_code().code(), 2);
    }

    #[test]
    fn test_message_list_human() {
        let email = Email {
            id: "E1".to_string(),
            subject: Some("Hi".to_string()),
            from: Some(vec![EmailAddress {
                name: Some("Ann".to_string()),
                email: "ann@example.com".to_string(),
            }]),
            ..Default::default()
        };
        let text = format_output(&MessageList(vec![email]), OutputFormat::Human);
        assert_eq!(text, "ID: E1\nSubject: Hi\nFrom: Ann <ann@example.com>\n---");
    }
}
