//! Discord webhook delivery.
//!
//! Messages are always sent as `multipart/form-data`: a `payload_json` part with
//! the sender name and content, plus one `files[n]` part per attachment.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error};
use truthcord_core::contract::{ComposedMessage, Deliverer, DeliveryError};

pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

fn build_form(username: &str, message: &ComposedMessage) -> Form {
    let payload = json!({
        "username": username,
        "content": message.content,
    });
    message
        .files
        .iter()
        .enumerate()
        .fold(
            Form::new().text("payload_json", payload.to_string()),
            |form, (index, file)| {
                let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
                form.part(format!("files[{index}]"), part)
            },
        )
}

#[async_trait]
impl Deliverer for DiscordWebhook {
    async fn deliver(&self, username: &str, message: &ComposedMessage) -> Result<(), DeliveryError> {
        debug!(username, files = message.files.len(), "Executing webhook");
        let response = self
            .http
            .post(&self.url)
            .multipart(build_form(username, message))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "Webhook rejected message");
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
