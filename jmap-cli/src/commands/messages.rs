// jmap-cli/src/commands/messages.rs
use super::Client;
use crate::output::{print_output, ExitCode, MessageList, MessageView, OutputFormat};
use anyhow::Result;
use jmap_client::MessageQuery;

#[derive(clap::Args, Debug)]
pub struct MessagesArgs {
    /// Mailbox name, matched case-insensitively
    #[arg(short, long, default_value = "Inbox")]
    pub mailbox: String,
    /// Max number of messages
    #[arg(short, long, default_value_t = 10)]
    pub limit: u64,
    /// Property to sort by
    #[arg(long, default_value = "receivedAt")]
    pub sort: String,
    /// Oldest first
    #[arg(long)]
    pub asc: bool,
    /// Only messages matching this text
    #[arg(short, long)]
    pub search: Option<String>,
}

impl From<MessagesArgs> for MessageQuery {
    fn from(args: MessagesArgs) -> Self {
        MessageQuery {
            mailbox: args.mailbox,
            limit: args.limit,
            sort_property: args.sort,
            ascending: args.asc,
            text: args.search.filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }
}

pub async fn handle_messages(
    client: &Client,
    args: MessagesArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let messages = client.list_messages(&args.into()).await?;
    print_output(&MessageList(messages), format);
    Ok(ExitCode::Success)
}

pub async fn handle_message(client: &Client, id: &str, format: OutputFormat) -> Result<ExitCode> {
    let message = client.get_message(id).await?;
    print_output(&MessageView(message), format);
    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_query() {
        let query: MessageQuery = MessagesArgs {
            mailbox: "Archive".to_string(),
            limit: 3,
            sort: "size".to_string(),
            asc: true,
            search: Some(String::new()),
        }
        .into();

        assert_eq!(query.mailbox, "Archive");
        assert_eq!(query.limit, 3);
        assert_eq!(query.sort_property, "size");
        assert!(query.ascending);
        assert!(query.text.is_none());
        assert!(!query.properties.is_empty());
    }
}
