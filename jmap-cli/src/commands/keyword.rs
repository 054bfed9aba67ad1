// jmap-cli/src/commands/keyword.rs
use super::Client;
use crate::output::{print_output, ExitCode, Formattable, OutputFormat};
use anyhow::Result;
use jmap_client::{keywords, UpdateOutcome};
use serde::Serialize;

#[derive(clap::Args, Debug)]
pub struct KeywordArgs {
    /// Message ID
    pub id: String,
    /// Set $seen
    #[arg(long)]
    pub seen: bool,
    /// Set $flagged
    #[arg(long)]
    pub flagged: bool,
    /// Set $answered
    #[arg(long)]
    pub answered: bool,
    /// Set $draft
    #[arg(long)]
    pub draft: bool,
    /// Set a custom keyword (repeatable)
    #[arg(long, value_name = "KEYWORD")]
    pub set: Vec<String>,
    /// Clear a keyword (repeatable)
    #[arg(long, value_name = "KEYWORD")]
    pub unset: Vec<String>,
}

impl KeywordArgs {
    /// Requested changes; a keyword named in `--unset` is cleared even if
    /// also set.
    pub fn changes(&self) -> Vec<(&str, bool)> {
        let flags = [
            (self.seen, keywords::SEEN),
            (self.flagged, keywords::FLAGGED),
            (self.answered, keywords::ANSWERED),
            (self.draft, keywords::DRAFT),
        ];
        let set = flags
            .into_iter()
            .filter(|(on, _)| *on)
            .map(|(_, kw)| kw)
            .chain(self.set.iter().map(String::as_str))
            .filter(|kw| !self.unset.iter().any(|u| u == kw));

        let mut changes: Vec<(&str, bool)> = Vec::new();
        for kw in set {
            if !changes.iter().any(|(k, _)| *k == kw) {
                changes.push((kw, true));
            }
        }
        for kw in &self.unset {
            if !changes.iter().any(|(k, _)| k == kw) {
                changes.push((kw.as_str(), false));
            }
        }
        changes
    }
}

/// Outcome of an update, with the message it applied to
#[derive(Debug, Serialize)]
pub struct UpdateReport {
    pub id: String,
    #[serde(flatten)]
    pub outcome: UpdateOutcome,
}

impl UpdateReport {
    pub fn exit_code(&self) -> ExitCode {
        match self.outcome {
            // Unknown id or nothing changed: a no-op
            UpdateOutcome::Updated | UpdateOutcome::NotUpdated(_) => ExitCode::Success,
            UpdateOutcome::Rejected(_) => ExitCode::PermanentError,
        }
    }
}

impl Formattable for UpdateReport {
    fn to_human(&self) -> String {
        match &self.outcome {
            UpdateOutcome::Updated => format!("Updated {}", self.id),
            UpdateOutcome::NotUpdated(err) => format!("Not updated {}: {}", self.id, err),
            UpdateOutcome::Rejected(err) => format!("Rejected by server: {}", err),
        }
    }
}

fn report(id: &str, outcome: UpdateOutcome, format: OutputFormat) -> ExitCode {
    let report = UpdateReport {
        id: id.to_string(),
        outcome,
    };
    print_output(&report, format);
    report.exit_code()
}

pub async fn handle_keyword(
    client: &Client,
    args: KeywordArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let outcome = client.set_keywords(&args.id, &args.changes()).await?;
    Ok(report(&args.id, outcome, format))
}

pub async fn handle_move(
    client: &Client,
    id: &str,
    mailbox: &str,
    format: OutputFormat,
) -> Result<ExitCode> {
    let outcome = client.move_to_mailbox(id, mailbox).await?;
    Ok(report(id, outcome, format))
}
