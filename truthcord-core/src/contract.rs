#![allow(unused)]

//! # contract: interfaces to the outside world
//!
//! The core never talks to the network itself. Everything it consumes is one
//! of the traits below, implemented by the HTTP clients in the `truthcord`
//! crate and by `mockall` mocks in tests.
//!
//! ## Interface & Extensibility
//! - All methods are async and return a typed error from this module.
//! - Failures are reported, never retried here; each caller decides how to degrade.
//!
//! ## Mocking & Testing
//! - Every trait is annotated with `automock` under `cfg(test)` or the
//!   `test-export-mocks` feature, so downstream crates and integration tests
//!   get `MockPostSource`, `MockMediaFetcher`, and so on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::post::{MediaKind, Post};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("account lookup failed for {account}: {reason}")]
    Lookup { account: String, reason: String },
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream returned an error: {0}")]
    Upstream(String),
    #[error("invalid upstream payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("media host rejected upload: {0}")]
    Host(String),
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translator is not configured: {0}")]
    NotConfigured(String),
    #[error("translation request failed: {0}")]
    Request(String),
    #[error("{0}")]
    Service(String),
    #[error("No response from translator")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(String),
    #[error("webhook answered with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source and destination language codes for a translation request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TranslationLanguages {
    pub from: String,
    pub to: String,
}

/// One file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Final output of the pipeline for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub content: String,
    pub files: Vec<FileAttachment>,
}

/// Upstream post client.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Posts by `account` created strictly after `created_after`, newest first.
    async fn fetch_posts(
        &self,
        account: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<Post>, FetchError>;
}

/// Plain HTTP access to attachment URLs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Size in bytes as reported by a lightweight probe (no body download).
    async fn head_size(&self, url: &str) -> Result<u64, MediaError>;

    /// Full payload.
    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

/// Third-party host for files too large to attach directly.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload and return a short public URL, or `None` when the host declined.
    async fn rehost(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<Option<String>, MediaError>;
}

/// Batch translation service. Response order must match request order.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        texts: &[String],
        languages: &TranslationLanguages,
    ) -> Result<Vec<String>, TranslateError>;
}

/// Outbound chat webhook.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, username: &str, message: &ComposedMessage) -> Result<(), DeliveryError>;
}
