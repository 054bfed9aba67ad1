// jmap-cli/src/commands/mod.rs
pub mod init;
pub mod keyword;
pub mod listen;
pub mod mailboxes;
pub mod messages;
pub mod send;

pub use init::run_init;
pub use keyword::{handle_keyword, handle_move, KeywordArgs};
pub use listen::{handle_listen, ListenArgs};
pub use mailboxes::handle_mailboxes;
pub use messages::{handle_message, handle_messages, MessagesArgs};
pub use send::{handle_send, SendArgs};

use crate::config::Config;
use jmap_client::{JmapClient, ReqwestClient};

pub type Client = JmapClient<ReqwestClient>;

/// Client for the configured server; fails fast on missing settings
pub fn connect(config: &Config) -> anyhow::Result<Client> {
    let base_url = config.base_url()?;
    let credentials = config.credentials()?;
    Ok(JmapClient::new(ReqwestClient::new(), base_url, credentials)?)
}
