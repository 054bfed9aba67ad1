// jmap-cli/src/commands/mailboxes.rs
use super::Client;
use crate::output::{print_output, ExitCode, MailboxTree, OutputFormat};
use anyhow::Result;

pub async fn handle_mailboxes(client: &Client, format: OutputFormat) -> Result<ExitCode> {
    let mailboxes = client.list_mailboxes().await?;
    print_output(&MailboxTree(mailboxes), format);
    Ok(ExitCode::Success)
}
