// jmap-cli/src/commands/send.rs
use super::Client;
use crate::config::Config;
use crate::output::{print_output, ExitCode, Formattable, OutputFormat};
use anyhow::{Context, Result};
use jmap_client::{Attachment, AttachmentContent, BodyContent, Draft, EmailAddress, SendOutcome};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Recipient address (repeatable or comma-separated)
    #[arg(long, required = true, value_delimiter = ',')]
    pub to: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub cc: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub bcc: Vec<String>,
    /// Sender address [default: EMAIL_FROM, then the server identity]
    #[arg(long)]
    pub from: Option<String>,
    /// Sender display name
    #[arg(long)]
    pub from_name: Option<String>,
    #[arg(short, long, default_value = "")]
    pub subject: String,
    /// Message body; read from stdin when omitted
    #[arg(long)]
    pub text: Option<String>,
    /// Send the body as HTML
    #[arg(long)]
    pub html: bool,
    /// File to attach (repeatable)
    #[arg(short, long, value_name = "PATH")]
    pub attach: Vec<PathBuf>,
}

fn addresses(list: &[String]) -> Vec<EmailAddress> {
    list.iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(EmailAddress::new)
        .collect()
}

fn sender(args: &SendArgs, config: &Config) -> Option<EmailAddress> {
    let mut from = match &args.from {
        Some(email) => Some(EmailAddress::new(email.trim())),
        None => config.from_address(),
    }?;
    if let Some(name) = args.from_name.as_deref().filter(|n| !n.is_empty()) {
        from.name = Some(name.to_string());
    }
    Some(from)
}

async fn read_body(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if std::io::stdin().is_terminal() {
        eprintln!("Type your message followed by ctrl-d");
    }
    let mut body = String::new();
    tokio::io::stdin()
        .read_to_string(&mut body)
        .await
        .context("Couldn't read message body from stdin")?;
    Ok(body)
}

async fn load_attachment(path: &Path) -> Result<Attachment> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Couldn't read attachment {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let media_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(Attachment {
        name,
        media_type,
        content: AttachmentContent::Inline(data),
    })
}

impl Formattable for SendOutcome {
    fn to_human(&self) -> String {
        match self {
            SendOutcome::Sent {
                email_id,
                submission_id,
            } => format!("Sent {} (submission {})", email_id, submission_id),
            SendOutcome::CreatedNotSent { email_id, error } => format!(
                "Message {} was created in the outbox but not sent: {}",
                email_id, error
            ),
            SendOutcome::Rejected { error } => format!("Message rejected: {}", error),
        }
    }
}

fn exit_code(outcome: &SendOutcome) -> ExitCode {
    match outcome {
        SendOutcome::Sent { .. } => ExitCode::Success,
        SendOutcome::CreatedNotSent { .. } => ExitCode::TransientError,
        SendOutcome::Rejected { .. } => ExitCode::PermanentError,
    }
}

pub async fn handle_send(
    client: &Client,
    config: &Config,
    args: SendArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let mut attachments = Vec::with_capacity(args.attach.len());
    for path in &args.attach {
        attachments.push(load_attachment(path).await?);
    }

    let draft = Draft {
        from: sender(&args, config),
        to: addresses(&args.to),
        cc: addresses(&args.cc),
        bcc: addresses(&args.bcc),
        subject: args.subject.clone(),
        body: BodyContent::Inline(read_body(args.text.clone()).await?),
        html: args.html,
        attachments,
    };

    let outcome = client.send_email(&draft).await?;
    print_output(&outcome, format);
    Ok(exit_code(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmap_client::CallError;
    use std::io::Write;

    fn args() -> SendArgs {
        SendArgs {
            to: vec!["bob@example.com".to_string(), " ".to_string()],
            cc: Vec::new(),
            bcc: Vec::new(),
            from: None,
            from_name: None,
            subject: "Hi".to_string(),
            text: Some("body".to_string()),
            html: false,
            attach: Vec::new(),
        }
    }

    #[test]
    fn test_blank_addresses_are_dropped() {
        assert_eq!(addresses(&args().to), vec![EmailAddress::new("bob@example.com")]);
    }

    #[test]
    fn test_sender_resolution() {
        let mut config = Config::default();
        assert_eq!(sender(&args(), &config), None);

        config.sender.default_from = Some("ann@example.com".to_string());
        config.sender.from_name = Some("Ann".to_string());
        assert_eq!(sender(&args(), &config).unwrap().to_string(), "Ann <ann@example.com>");

        let mut explicit = args();
        explicit.from = Some("team@example.com".to_string());
        explicit.from_name = Some("Team".to_string());
        assert_eq!(
            sender(&explicit, &config).unwrap().to_string(),
            "Team <team@example.com>"
        );
    }

    #[tokio::test]
    async fn test_attachment_type_is_guessed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let attachment = load_attachment(&path).await.unwrap();
        assert_eq!(attachment.name, "report.pdf");
        assert_eq!(attachment.media_type, "application/pdf");
        assert!(matches!(attachment.content, AttachmentContent::Inline(ref d) if d == b"%PDF-1.4"));
    }

    #[test]
    fn test_partial_send_is_not_success() {
        let outcome = SendOutcome::CreatedNotSent {
            email_id: "E1".to_string(),
            error: CallError::NoResponse,
        };
        assert_eq!(exit_code(&outcome).code(), 1);
        assert!(outcome.to_human().contains("outbox"));
    }
}
