// jmap-client/src/client.rs
use crate::auth::CredentialProvider;
use crate::error::{JmapError, Result};
use crate::http::{HttpClient, HttpError};
use crate::request::{MethodCall, Request, RequestBuilder};
use crate::response::Response;
use crate::session::Session;
use tracing::{debug, warn};

/// Client for one JMAP service.
///
/// Owns the transport and the credential provider. Holds no session:
/// every operation discovers a fresh one.
pub struct JmapClient<C: HttpClient> {
    http: C,
    base_url: String,
    credentials: CredentialProvider,
}

impl<C: HttpClient> JmapClient<C> {
    pub fn new(http: C, base_url: &str, credentials: CredentialProvider) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(JmapError::Configuration("base URL is not set".to_string()));
        }
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    pub(crate) fn http(&self) -> &C {
        &self.http
    }

    /// Current `Authorization` header value
    pub async fn auth_header(&self) -> Result<String> {
        self.credentials.header_value(&self.http).await
    }

    /// Discover the session document
    pub async fn session(&self) -> Result<Session> {
        let auth = self.auth_header().await?;
        Session::discover(&self.http, &self.base_url, &auth).await
    }

    /// Whether the server accepts the configured credentials
    pub async fn verify_credentials(&self) -> bool {
        match self.session().await {
            Ok(session) => !session.primary_accounts.is_empty(),
            Err(e) => {
                debug!(error = %e, "credential check failed");
                false
            }
        }
    }

    pub(crate) async fn on_http_error(&self, error: &HttpError) {
        if error.is_unauthorized() {
            warn!("server rejected credentials");
            self.credentials.invalidate().await;
        }
    }

    /// Send one batch to the session's API endpoint.
    ///
    /// Returns the full response list; correlating entries with calls is
    /// left to the caller.
    pub async fn send(&self, session: &Session, request: &Request) -> Result<Response> {
        let auth = self.auth_header().await?;
        let body = serde_json::to_vec(request)
            .map_err(|e| JmapError::Protocol(format!("cannot encode request: {}", e)))?;

        debug!(
            api_url = %session.api_url,
            calls = request.method_calls.len(),
            "sending batch"
        );

        let resp_bytes = match self.http.post_json(&session.api_url, Some(&auth), body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.on_http_error(&e).await;
                return Err(JmapError::Protocol(e.to_string()));
            }
        };

        let resp: Response = serde_json::from_slice(&resp_bytes)
            .map_err(|e| JmapError::Protocol(format!("invalid response body: {}", e)))?;

        debug!(responses = resp.method_responses.len(), "batch answered");
        Ok(resp)
    }

    /// Send a batch holding a single call
    pub async fn call(&self, session: &Session, call: MethodCall) -> Result<Response> {
        let mut builder = RequestBuilder::new();
        builder.call(call)?;
        self.send(session, &builder.build()).await
    }
}
