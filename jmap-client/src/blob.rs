// jmap-client/src/blob.rs
use crate::client::JmapClient;
use crate::error::{JmapError, Result};
use crate::http::HttpClient;
use crate::session::Session;
use crate::types::UploadResponse;
use tracing::debug;

/// Fallback for the `{name}` template variable
pub const DEFAULT_BLOB_NAME: &str = "blob";

/// Fill `{var}` placeholders of a level-1 URI template, percent-encoding
/// each value. Unknown placeholders are left as they are.
pub fn expand_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |url, (name, value)| {
        url.replace(&format!("{{{}}}", name), &urlencoding::encode(value))
    })
}

pub fn upload_url(session: &Session, account_id: &str) -> String {
    expand_template(&session.upload_url, &[("accountId", account_id)])
}

pub fn download_url(
    session: &Session,
    account_id: &str,
    blob_id: &str,
    media_type: &str,
    name: Option<&str>,
) -> String {
    expand_template(
        &session.download_url,
        &[
            ("accountId", account_id),
            ("blobId", blob_id),
            ("type", media_type),
            ("name", name.unwrap_or(DEFAULT_BLOB_NAME)),
        ],
    )
}

impl<C: HttpClient> JmapClient<C> {
    /// Upload raw bytes; returns the new blob id
    pub async fn upload(
        &self,
        session: &Session,
        account_id: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        let url = upload_url(session, account_id);
        let auth = self.auth_header().await?;
        let size = data.len();

        let resp = match self.http().post(&url, Some(&auth), media_type, data).await {
            Ok(resp) => resp,
            Err(e) => {
                self.on_http_error(&e).await;
                return Err(JmapError::Blob(format!("upload to {}: {}", url, e)));
            }
        };

        let uploaded: UploadResponse = serde_json::from_slice(&resp)
            .map_err(|e| JmapError::Blob(format!("invalid upload response: {}", e)))?;

        debug!(blob_id = %uploaded.blob_id, size, "blob uploaded");
        Ok(uploaded.blob_id)
    }

    /// Download a blob's raw content
    pub async fn download(
        &self,
        session: &Session,
        account_id: &str,
        blob_id: &str,
        media_type: &str,
        name: Option<&str>,
    ) -> Result<Vec<u8>> {
        let url = download_url(session, account_id, blob_id, media_type, name);
        let auth = self.auth_header().await?;

        match self.http().get(&url, Some(&auth)).await {
            Ok(data) => {
                debug!(blob_id, size = data.len(), "blob downloaded");
                Ok(data)
            }
            Err(e) => {
                self.on_http_error(&e).await;
                Err(JmapError::Blob(format!("download of {}: {}", blob_id, e)))
            }
        }
    }

    /// Download a blob and decode it as UTF-8 (invalid sequences replaced)
    pub async fn download_text(
        &self,
        session: &Session,
        account_id: &str,
        blob_id: &str,
        media_type: &str,
    ) -> Result<String> {
        let data = self
            .download(session, account_id, blob_id, media_type, None)
            .await?;
        Ok(String::from_utf8(data)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }
}
