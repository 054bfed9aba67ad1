// jmap-client/src/auth.rs
use crate::error::{JmapError, Result};
use crate::http::HttpClient;
use base64::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Path of the username/password to bearer token exchange, relative to the base URL.
pub const AUTHENTICATION_PATH: &str = "/jmap/authentication";

enum Scheme {
    Basic(String),
    Bearer(String),
    Exchange {
        url: String,
        username: String,
        password: String,
        token: Mutex<Option<String>>,
    },
}

/// Produces the `Authorization` header for every request.
///
/// Owned by the caller; an exchanged bearer token lives only as long as
/// the provider and is never written anywhere.
pub struct CredentialProvider {
    scheme: Scheme,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(JmapError::Configuration(format!("{} is not set", what))),
    }
}

impl CredentialProvider {
    /// HTTP Basic authentication with username and password
    pub fn basic(username: Option<&str>, password: Option<&str>) -> Result<Self> {
        let username = require(username, "username")?;
        let password = require(password, "password")?;
        let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, password));
        Ok(Self {
            scheme: Scheme::Basic(format!("Basic {}", encoded)),
        })
    }

    /// Bearer authentication with a token obtained elsewhere
    pub fn bearer(token: Option<&str>) -> Result<Self> {
        let token = require(token, "token")?;
        Ok(Self {
            scheme: Scheme::Bearer(token.to_string()),
        })
    }

    /// Bearer authentication where the token is obtained once from the
    /// server's authentication endpoint on first use.
    pub fn bearer_exchange(
        base_url: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let base_url = require(base_url, "base URL")?;
        let username = require(username, "username")?;
        let password = require(password, "password")?;
        Ok(Self {
            scheme: Scheme::Exchange {
                url: format!("{}{}", base_url.trim_end_matches('/'), AUTHENTICATION_PATH),
                username: username.to_string(),
                password: password.to_string(),
                token: Mutex::new(None),
            },
        })
    }

    pub fn scheme_name(&self) -> &'static str {
        match self.scheme {
            Scheme::Basic(_) => "basic",
            Scheme::Bearer(_) | Scheme::Exchange { .. } => "bearer",
        }
    }

    /// Value for the `Authorization` header.
    pub async fn header_value<C: HttpClient + ?Sized>(&self, http: &C) -> Result<String> {
        match &self.scheme {
            Scheme::Basic(header) => Ok(header.clone()),
            Scheme::Bearer(token) => Ok(format!("Bearer {}", token)),
            Scheme::Exchange {
                url,
                username,
                password,
                token,
            } => {
                // Held across the exchange so only one request is ever in flight.
                let mut cached = token.lock().await;
                if let Some(token) = cached.as_ref() {
                    return Ok(format!("Bearer {}", token));
                }

                debug!(url = %url, "exchanging credentials for bearer token");
                let body = serde_json::to_vec(&json!({
                    "username": username,
                    "password": password,
                }))
                .map_err(|e| JmapError::Authentication(e.to_string()))?;

                let resp = http
                    .post_json(url, None, body)
                    .await
                    .map_err(|e| JmapError::Authentication(format!("{} ({})", e, url)))?;

                let parsed: TokenResponse = serde_json::from_slice(&resp).map_err(|e| {
                    JmapError::Authentication(format!("invalid token response: {}", e))
                })?;

                info!("obtained bearer token");
                let header = format!("Bearer {}", parsed.access_token);
                *cached = Some(parsed.access_token);
                Ok(header)
            }
        }
    }

    /// Drop a cached exchanged token so the next request re-authenticates.
    pub async fn invalidate(&self) {
        if let Scheme::Exchange { token, .. } = &self.scheme {
            if token.lock().await.take().is_some() {
                debug!("cached bearer token invalidated");
            }
        }
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("scheme", &self.scheme_name())
            .finish_non_exhaustive()
    }
}
