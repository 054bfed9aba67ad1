// jmap-client/src/session.rs
use crate::error::{JmapError, Result};
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const CAPABILITY_CORE: &str = "urn:ietf:params:jmap:core";
pub const CAPABILITY_MAIL: &str = "urn:ietf:params:jmap:mail";
pub const CAPABILITY_SUBMISSION: &str = "urn:ietf:params:jmap:submission";
pub const CAPABILITY_WEBSOCKET: &str = "urn:ietf:params:jmap:websocket";

/// Well-known discovery path, relative to the service base URL.
pub const DISCOVERY_PATH: &str = "/.well-known/jmap";

/// JMAP Session response (RFC 8620 Section 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Capability URN -> capability object. Presence means supported.
    pub capabilities: HashMap<String, serde_json::Value>,
    /// The accounts available to the user
    #[serde(default)]
    pub accounts: HashMap<String, AccountData>,
    /// Capability URN -> primary account id
    #[serde(rename = "primaryAccounts")]
    #[serde(default)]
    pub primary_accounts: HashMap<String, String>,
    #[serde(default)]
    pub username: Option<String>,
    /// The URL to use for JMAP API requests
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    /// Download URL template for binary data
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    /// Upload URL template for files
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(default)]
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    pub name: Option<String>,
    #[serde(rename = "isPersonal")]
    pub is_personal: Option<bool>,
    #[serde(rename = "isReadOnly")]
    pub is_read_only: Option<bool>,
    #[serde(rename = "accountCapabilities")]
    pub account_capabilities: Option<HashMap<String, serde_json::Value>>,
}

/// WebSocket capability object (RFC 8887)
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketCapability {
    pub url: String,
    #[serde(rename = "supportsPush")]
    #[serde(default)]
    pub supports_push: bool,
}

impl Session {
    /// Fetch and parse the session document from `<base_url>/.well-known/jmap`.
    pub async fn discover<C: HttpClient + ?Sized>(
        http: &C,
        base_url: &str,
        auth: &str,
    ) -> Result<Self> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), DISCOVERY_PATH);
        debug!(url = %url, "discovering session");

        let resp = http
            .get(&url, Some(auth))
            .await
            .map_err(|e| JmapError::Discovery(format!("{} ({})", e, url)))?;

        let session: Session = serde_json::from_slice(&resp)
            .map_err(|e| JmapError::Discovery(format!("invalid session document: {}", e)))?;

        debug!(
            api_url = %session.api_url,
            capabilities = session.capabilities.len(),
            "session discovered"
        );
        Ok(session)
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.contains_key(capability)
    }

    /// Primary account for `capability`, or a `Capability` error if the
    /// server offers none.
    pub fn account_id_for(&self, capability: &str) -> Result<&str> {
        self.primary_accounts
            .get(capability)
            .map(String::as_str)
            .ok_or_else(|| JmapError::Capability(capability.to_string()))
    }

    pub fn websocket(&self) -> Option<WebSocketCapability> {
        self.capabilities
            .get(CAPABILITY_WEBSOCKET)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Push endpoint advertised by the WebSocket capability
    pub fn push_url(&self) -> Option<String> {
        self.websocket().map(|cap| cap.url)
    }
}
