//! HTTP media access: plain fetches of attachment URLs and rehosting of
//! oversized media on Imgur.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use truthcord_core::contract::{MediaError, MediaFetcher, MediaHost};
use truthcord_core::post::MediaKind;

pub const DEFAULT_IMGUR_BASE_URL: &str = "https://api.imgur.com";

/// Declared body length, `0` when the header is absent or unreadable.
fn declared_length(headers: &HeaderMap) -> u64 {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}

pub struct HttpMediaFetcher {
    http: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn head_size(&self, url: &str) -> Result<u64, MediaError> {
        let response = self.http.head(url).send().await.map_err(|e| MediaError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let size = declared_length(response.headers());
        debug!(url, size, "Probed attachment size");
        Ok(size)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let request_error = |e: reqwest::Error| MediaError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self.http.get(url).send().await.map_err(request_error)?;
        if !response.status().is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(request_error)?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct ImgurResponse {
    #[serde(default)]
    success: bool,
    data: Option<ImgurData>,
}

#[derive(Debug, Deserialize)]
struct ImgurData {
    link: Option<String>,
}

/// Anonymous Imgur uploads. Without a client id every rehost is declined.
pub struct ImgurHost {
    http: reqwest::Client,
    base_url: String,
    client_id: Option<String>,
}

impl ImgurHost {
    pub fn new(
        base_url: impl Into<String>,
        client_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        if client_id.is_none() {
            info!("No image host client id configured, large media will be linked");
        }
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id,
        })
    }
}

#[async_trait]
impl MediaHost for ImgurHost {
    async fn rehost(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<Option<String>, MediaError> {
        let Some(client_id) = &self.client_id else {
            return Ok(None);
        };
        let field = match kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            _ => return Ok(None),
        };
        let size = bytes.len();
        let encoded = STANDARD.encode(bytes);

        let response = self
            .http
            .post(format!("{}/3/upload", self.base_url))
            .header("Authorization", format!("Client-ID {client_id}"))
            .form(&[(field, encoded.as_str()), ("type", "base64")])
            .send()
            .await
            .map_err(|e| MediaError::Host(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Host(format!("status {status}: {body}")));
        }
        let parsed: ImgurResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Host(e.to_string()))?;

        match parsed.data.and_then(|d| d.link).filter(|_| parsed.success) {
            Some(link) => {
                info!(size, link = %link, "Rehosted attachment");
                Ok(Some(link))
            }
            None => {
                warn!(size, "Image host accepted the upload without returning a link");
                Ok(None)
            }
        }
    }
}
