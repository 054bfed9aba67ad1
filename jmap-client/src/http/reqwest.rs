// jmap-client/src/http/reqwest.rs
use super::{HttpClient, HttpError};
use async_trait::async_trait;

#[cfg(feature = "reqwest")]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Wrap a preconfigured client (timeouts, proxies, custom roots)
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<Vec<u8>, HttpError> {
        let resp = req.send().await.map_err(|e| HttpError {
            status: None,
            message: e.to_string(),
        })?;

        let status = resp.status();
        let is_success = status.is_success();
        let status_code = status.as_u16();

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| HttpError {
                status: Some(status_code),
                message: e.to_string(),
            })?
            .to_vec();

        if !is_success {
            return Err(HttpError {
                status: Some(status_code),
                message: String::from_utf8_lossy(&bytes).to_string(),
            });
        }

        Ok(bytes)
    }
}

#[cfg(feature = "reqwest")]
impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "reqwest")]
fn authorized(req: reqwest::RequestBuilder, auth: Option<&str>) -> reqwest::RequestBuilder {
    match auth {
        Some(value) => req.header(reqwest::header::AUTHORIZATION, value),
        None => req,
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(
        &self,
        url: &str,
        auth: Option<&str>,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, HttpError> {
        let req = authorized(self.inner.post(url), auth)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        self.execute(req).await
    }

    async fn get(&self, url: &str, auth: Option<&str>) -> Result<Vec<u8>, HttpError> {
        self.execute(authorized(self.inner.get(url), auth)).await
    }
}
