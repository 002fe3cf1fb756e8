//! Azure Translator (v3 REST) implementation of [`Translator`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};
use truthcord_core::contract::{TranslateError, TranslationLanguages, Translator};
use uuid::Uuid;

pub const DEFAULT_AZURE_ENDPOINT: &str = "https://api.cognitive.microsofttranslator.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureCredentials {
    pub key: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslatorResponse {
    Batch(Vec<TranslatedItem>),
    Failure { error: ServiceError },
    Single(TranslatedItem),
}

#[derive(Debug, Deserialize)]
struct TranslatedItem {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Value,
    message: String,
}

impl TranslatedItem {
    fn into_text(self) -> Result<String, TranslateError> {
        self.translations
            .into_iter()
            .last()
            .map(|t| t.text)
            .ok_or_else(|| TranslateError::Service("item carried no translations".to_string()))
    }
}

pub struct AzureTranslator {
    http: reqwest::Client,
    endpoint: String,
    credentials: Option<AzureCredentials>,
}

impl AzureTranslator {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: Option<AzureCredentials>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl Translator for AzureTranslator {
    async fn translate(
        &self,
        texts: &[String],
        languages: &TranslationLanguages,
    ) -> Result<Vec<String>, TranslateError> {
        let Some(credentials) = &self.credentials else {
            return Err(TranslateError::NotConfigured(
                "Azure Translator API details missing.".to_string(),
            ));
        };
        let trace_id = Uuid::new_v4().to_string();
        let payload: Vec<Value> = texts.iter().map(|text| json!({ "Text": text })).collect();
        debug!(trace_id = %trace_id, count = texts.len(), from = %languages.from, to = %languages.to, "Requesting translation");

        let response = self
            .http
            .post(format!("{}/translate", self.endpoint))
            .query(&[
                ("api-version", "3.0"),
                ("from", languages.from.as_str()),
                ("to", languages.to.as_str()),
            ])
            .header("Ocp-Apim-Subscription-Key", &credentials.key)
            .header("Ocp-Apim-Subscription-Region", &credentials.location)
            .header("X-ClientTraceId", &trace_id)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TranslateError::Request(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| TranslateError::Request(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        let value: Value =
            serde_json::from_str(&body).map_err(|e| TranslateError::Request(e.to_string()))?;
        if value.is_null() {
            return Err(TranslateError::EmptyResponse);
        }

        match serde_json::from_value::<TranslatorResponse>(value) {
            Ok(TranslatorResponse::Batch(items)) if items.is_empty() => {
                Err(TranslateError::EmptyResponse)
            }
            Ok(TranslatorResponse::Batch(items)) => {
                items.into_iter().map(TranslatedItem::into_text).collect()
            }
            Ok(TranslatorResponse::Single(item)) => Ok(vec![item.into_text()?]),
            Ok(TranslatorResponse::Failure { error }) => {
                let code = match error.code {
                    Value::String(code) => code,
                    other => other.to_string(),
                };
                error!(trace_id = %trace_id, code = %code, message = %error.message, "Translator reported an error");
                Err(TranslateError::Service(format!("{code}: {}", error.message)))
            }
            Err(e) => Err(TranslateError::Request(format!("unexpected response: {e}"))),
        }
    }
}
