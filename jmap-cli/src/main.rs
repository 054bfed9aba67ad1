// jmap-cli/src/main.rs
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{KeywordArgs, ListenArgs, MessagesArgs, SendArgs};
use config::Config;
use output::{print_error, print_response, ErrorResponse, ExitCode, OutputFormat, Response};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jmap")]
#[command(about = "A command-line client for JMAP mail servers", long_about = None, version)]
struct Cli {
    /// Output JSON (default when stdout is not a terminal)
    #[arg(short, long, global = true)]
    json: bool,
    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file interactively
    Init {
        /// Base URL of the JMAP server
        url: Option<String>,
    },
    #[command(flatten)]
    Mail(MailCommands),
}

/// Commands that talk to the configured server
#[derive(Subcommand)]
enum MailCommands {
    /// List mailboxes as a tree
    Mailboxes,
    /// List messages in a mailbox
    Messages(MessagesArgs),
    /// Show one message with its body
    Message {
        /// Message ID
        id: String,
    },
    /// Compose and send a message
    Send(SendArgs),
    /// Set or clear keywords ($seen, $flagged, ...) on a message
    Keyword(KeywordArgs),
    /// Move a message to another mailbox
    Move {
        /// Message ID
        id: String,
        /// Target mailbox name
        mailbox: String,
    },
    /// Print push notifications until interrupted
    Listen(ListenArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("jmap_client=debug,jmap=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_mail(cmd: MailCommands, format: OutputFormat) -> Result<ExitCode> {
    let config = Config::load()?;
    let client = commands::connect(&config)?;

    match cmd {
        MailCommands::Mailboxes => commands::handle_mailboxes(&client, format).await,
        MailCommands::Messages(args) => commands::handle_messages(&client, args, format).await,
        MailCommands::Message { id } => commands::handle_message(&client, &id, format).await,
        MailCommands::Send(args) => commands::handle_send(&client, &config, args, format).await,
        MailCommands::Keyword(args) => commands::handle_keyword(&client, args, format).await,
        MailCommands::Move { id, mailbox } => {
            commands::handle_move(&client, &id, &mailbox, format).await
        }
        MailCommands::Listen(args) => commands::handle_listen(&client, args, format).await,
    }
}

async fn run(command: Commands, format: OutputFormat) -> Result<ExitCode> {
    match command {
        Commands::Init { url } => commands::run_init(url).await,
        Commands::Mail(cmd) => handle_mail(cmd, format).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // reqwest and the websocket transport share one rustls provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let format = OutputFormat::from_flag(cli.json);
    let code = match run(cli.command, format).await {
        Ok(code) => code,
        Err(e) => {
            let error = ErrorResponse::from_error(&e);
            let code = error.exit_code();
            if format.is_json() {
                let _ = print_response(&Response::<()>::error(error));
            } else {
                print_error(error.message());
            }
            code
        }
    };
    std::process::exit(code.code());
}
