// jmap-cli/src/commands/listen.rs
use super::Client;
use crate::output::{print_success, print_warning, ExitCode, OutputFormat};
use anyhow::Result;
use jmap_client::{JmapError, PushState};
use serde_json::Value;
use tracing::debug;

#[derive(clap::Args, Debug)]
pub struct ListenArgs {
    /// Data type to subscribe to (repeatable) [default: Email]
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,
}

/// One line per changed account: `<account> <Type>=<state> ...`
pub fn describe(notification: &Value) -> String {
    let kind = notification["@type"].as_str().unwrap_or("notification");
    let Some(changed) = notification["changed"].as_object() else {
        return kind.to_string();
    };
    changed
        .iter()
        .map(|(account, types)| {
            let states = types
                .as_object()
                .map(|t| {
                    t.iter()
                        .map(|(name, state)| format!("{}={}", name, state.as_str().unwrap_or("?")))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            format!("{} {}: {}", kind, account, states)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle_listen(
    client: &Client,
    args: ListenArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let types: Vec<&str> = args.types.iter().map(String::as_str).collect();
    let mut channel = client.listen(&types).await?;
    let cancel = channel.cancel_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted, closing push channel");
            cancel.cancel();
        }
    });

    if !format.is_json() {
        print_success("Listening for changes (ctrl-c to stop)");
    }

    while let Some(item) = channel.next().await {
        match item {
            Ok(notification) if format.is_json() => println!("{}", notification),
            Ok(notification) => println!("{}", describe(&notification)),
            // The channel closes itself after a transport failure.
            Err(JmapError::Push(msg)) if channel.state() != PushState::Closed => {
                print_warning(&msg);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ExitCode::Success)
}
