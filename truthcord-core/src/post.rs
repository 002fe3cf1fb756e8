//! Post data model, validated at the ingestion boundary.
//!
//! Posts arrive as upstream JSON. Deserialising into [`Post`] is the only
//! validation step: a record missing `id`, `created_at`, `account` or `content`
//! is rejected here with a deserialisation error instead of failing
//! later inside composition. Optional upstream fields default to empty values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One unit of social-media content, possibly wrapping a reblog and/or a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub account: Account,
    /// Raw HTML body.
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reblog: Option<Box<Post>>,
    #[serde(default)]
    pub quote: Option<Box<Post>>,
    #[serde(default)]
    pub media_attachments: Vec<Attachment>,
    /// Local observability stamp, never sent upstream.
    #[serde(skip)]
    pub pulled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    pub username: String,
    /// Handle as displayed (`user` or `user@instance`).
    #[serde(default)]
    pub acct: String,
    #[serde(default)]
    pub display_name: String,
    /// Profile URL.
    #[serde(default)]
    pub url: String,
}

impl Account {
    /// Handle used in the message top line; falls back to `username`.
    pub fn handle(&self) -> &str {
        if self.acct.is_empty() {
            &self.username
        } else {
            &self.acct
        }
    }

    /// Name shown as the webhook sender; falls back to the handle.
    pub fn sender_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.handle()
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gifv,
    Audio,
    #[serde(other)]
    Unknown,
}

impl MediaKind {
    /// Kinds the image host accepts for rehosting.
    pub fn is_rehostable(self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    /// Size advertised upstream. Not trusted: the resolver always probes.
    #[serde(default, alias = "size")]
    pub declared_size: Option<u64>,
}

impl Post {
    /// Media of this post, then of its reblog, then of its quote.
    pub fn attachments_in_order(&self) -> Vec<&Attachment> {
        let mut all: Vec<&Attachment> = self.media_attachments.iter().collect();
        if let Some(reblog) = &self.reblog {
            all.extend(reblog.media_attachments.iter());
        }
        if let Some(quote) = &self.quote {
            all.extend(quote.media_attachments.iter());
        }
        all
    }

    pub fn mark_pulled(&mut self, now: DateTime<Utc>) {
        self.pulled_at = Some(now);
    }
}

/// Chronological ordering of platform ids (numeric strings of varying length).
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
