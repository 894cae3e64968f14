//! Authenticated request executor for the KoboToolbox v2 API

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::debug;

use crate::config::KoboConfig;
use crate::error::{HttpError, Result};

/// Timeout for metadata-sized reads and deployment calls
const SHORT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for submission-sized reads, binary downloads, and file uploads
const LONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Content type for uploaded XLSForm workbooks
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// HTTP executor shared by every tool operation.
///
/// Issues one request per call with the `Token` authorization header and a
/// per-call timeout. Non-2xx responses become [`HttpError::Status`] carrying
/// the status code and body text. No retries: a failed call is a terminal
/// failure for that tool invocation.
pub struct KoboClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl KoboClient {
    pub fn new(config: &KoboConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LONG_TIMEOUT)
            .build()
            .map_err(HttpError::ClientInit)?;

        Ok(Self {
            http,
            base_url: config.server.clone(),
            auth_header: format!("Token {}", config.api_token),
        })
    }

    /// Base URL of the configured instance, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        method: &'static str,
        path: &str,
    ) -> Result<reqwest::Response> {
        debug!(method, path, "issuing request");

        let response = builder
            .header(AUTHORIZATION, &self.auth_header)
            .send()
            .await
            .map_err(|source| HttpError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn json_body(&self, response: reqwest::Response, path: &str) -> Result<Value> {
        response
            .json()
            .await
            .map_err(|source| {
                HttpError::Transport {
                    path: path.to_string(),
                    source,
                }
                .into()
            })
    }

    /// GET a JSON document (metadata-sized responses)
    pub async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let builder = self
            .http
            .get(self.url(path))
            .query(params)
            .timeout(SHORT_TIMEOUT);
        let response = self.execute(builder, "GET", path).await?;
        self.json_body(response, path).await
    }

    /// GET a JSON document with the long timeout (submission pages can be large)
    pub async fn get_json_long(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let builder = self
            .http
            .get(self.url(path))
            .query(params)
            .timeout(LONG_TIMEOUT);
        let response = self.execute(builder, "GET", path).await?;
        self.json_body(response, path).await
    }

    /// GET raw bytes (binary form representations)
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let builder = self.http.get(self.url(path)).timeout(LONG_TIMEOUT);
        let response = self.execute(builder, "GET", path).await?;
        let bytes = response.bytes().await.map_err(|source| HttpError::Transport {
            path: path.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    /// POST a JSON body, returning the JSON response
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self
            .http
            .post(self.url(path))
            .json(body)
            .timeout(SHORT_TIMEOUT);
        let response = self.execute(builder, "POST", path).await?;
        self.json_body(response, path).await
    }

    /// PATCH a JSON body, returning the JSON response
    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value> {
        let builder = self
            .http
            .patch(self.url(path))
            .json(body)
            .timeout(SHORT_TIMEOUT);
        let response = self.execute(builder, "PATCH", path).await?;
        self.json_body(response, path).await
    }

    /// POST a multipart form carrying one XLSForm file part plus text fields
    pub async fn post_multipart(
        &self,
        path: &str,
        file_name: &str,
        bytes: Vec<u8>,
        fields: &[(&str, String)],
    ) -> Result<Value> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(XLSX_MIME)
            .map_err(|source| HttpError::BuildRequest {
                path: path.to_string(),
                source,
            })?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }

        let builder = self
            .http
            .post(self.url(path))
            .multipart(form)
            .timeout(LONG_TIMEOUT);
        let response = self.execute(builder, "POST", path).await?;
        self.json_body(response, path).await
    }
}
