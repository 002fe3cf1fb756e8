//! Polling orchestration: fetch → compose → deliver, one post at a time.
//!
//! The relay owns the "last seen" watermark. Each cycle asks the upstream
//! source for posts newer than the watermark, processes them oldest first and
//! moves the watermark past every post that was delivered.
//!
//! # Error Handling
//! - A failed fetch ends the cycle with nothing processed; the next cycle retries.
//! - A failed delivery skips that post and logs it. The watermark stops moving for
//!   the rest of the cycle, so the post is fetched again next cycle.
//! - Attachment and translation failures never reach this level; the composer
//!   degrades them into the message itself.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::attachments::AttachmentLimits;
use crate::compose::{build_message, Collaborators, ComposeSettings};
use crate::contract::{Deliverer, MediaFetcher, MediaHost, PostSource, Translator};
use crate::post::Post;

/// Counts for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Relay {
    account: String,
    watermark: DateTime<Utc>,
    settings: ComposeSettings,
    limits: AttachmentLimits,
    source: Box<dyn PostSource>,
    fetcher: Box<dyn MediaFetcher>,
    host: Box<dyn MediaHost>,
    translator: Box<dyn Translator>,
    deliverer: Box<dyn Deliverer>,
}

/// Everything a [`Relay`] talks to.
pub struct RelayClients {
    pub source: Box<dyn PostSource>,
    pub fetcher: Box<dyn MediaFetcher>,
    pub host: Box<dyn MediaHost>,
    pub translator: Box<dyn Translator>,
    pub deliverer: Box<dyn Deliverer>,
}

impl Relay {
    pub fn new(
        account: impl Into<String>,
        pull_since: DateTime<Utc>,
        settings: ComposeSettings,
        limits: AttachmentLimits,
        clients: RelayClients,
    ) -> Self {
        let account = account.into();
        info!(account = %account, since = %pull_since, "Set to monitor posts published since");
        Self {
            account,
            watermark: pull_since,
            settings,
            limits,
            source: clients.source,
            fetcher: clients.fetcher,
            host: clients.host,
            translator: clients.translator,
            deliverer: clients.deliverer,
        }
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// One polling cycle.
    pub async fn check_once(&mut self) -> RelayReport {
        let mut posts = match self.source.fetch_posts(&self.account, self.watermark).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(account = %self.account, error = %e, "Error fetching new posts");
                return RelayReport::default();
            }
        };

        let mut report = RelayReport {
            fetched: posts.len(),
            ..RelayReport::default()
        };

        // Upstream pages are newest first.
        posts.reverse();
        for post in &posts {
            if self.process_post(post).await {
                report.delivered += 1;
                // Moving past a failed post would hide it from the next fetch.
                if report.failed == 0 && post.created_at > self.watermark {
                    self.watermark = post.created_at;
                }
            } else {
                report.failed += 1;
            }
        }
        if report.failed > 0 {
            warn!(
                failed = report.failed,
                watermark = %self.watermark,
                "Holding watermark at the first failed post"
            );
        }

        info!(
            found = report.fetched,
            sent = report.delivered,
            failed = report.failed,
            "Polling cycle finished"
        );
        report
    }

    async fn process_post(&self, post: &Post) -> bool {
        let collaborators = Collaborators {
            fetcher: self.fetcher.as_ref(),
            host: self.host.as_ref(),
            translator: self.translator.as_ref(),
        };
        let message = build_message(post, collaborators, &self.settings, &self.limits).await;
        debug!(post_id = %post.id, chars = message.content.chars().count(), files = message.files.len(), "Message built");

        let delivery = self
            .deliverer
            .deliver(post.account.sender_name(), &message)
            .await;
        match delivery {
            Ok(()) => {
                info!(post_id = %post.id, "New post sent");
                true
            }
            Err(e) => {
                error!(post_id = %post.id, account = %self.account, error = %e, "Error delivering post");
                false
            }
        }
    }

    /// Runs cycles every `poll_interval` until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, poll_interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(account = %self.account, interval_secs = poll_interval.as_secs(), "Relay running");
        tokio::pin!(shutdown);
        loop {
            self.check_once().await;
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping relay");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
