//! Attachment Resolver: decides, per media item, whether it is attached to the
//! outgoing message, rehosted, or only linked.
//!
//! Tiers, in order:
//! 1. probed size above `large_attachment_threshold`: never downloaded, linked only;
//! 2. downloaded size within `file_limit`: attached;
//! 3. larger: rehosted (images and videos), linked through the host's short URL;
//! 4. anything that fails along the way: linked to the original URL.
//!
//! One attachment's failure never affects the others.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::contract::{FileAttachment, MediaError, MediaFetcher, MediaHost};
use crate::post::{Attachment, MediaKind, Post};

const MIB: u64 = 1024 * 1024;

/// Byte ceilings for attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentLimits {
    /// Largest file attached directly to the message.
    pub file_limit: u64,
    /// Probed sizes above this are never downloaded.
    pub large_attachment_threshold: u64,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            file_limit: 10 * MIB - 1,
            large_attachment_threshold: 15 * MIB,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAttachments {
    pub files: Vec<FileAttachment>,
    pub inline_links: Vec<String>,
}

/// Generic link markup for an attachment that could not be attached.
pub fn attachment_markup(attachment: &Attachment) -> String {
    match attachment.kind {
        MediaKind::Video => format!(
            ":small_blue_diamond: [Click here to watch the video]({})",
            attachment.url
        ),
        _ => format!(
            ":small_blue_diamond: [Click here to view the image]({})",
            attachment.url
        ),
    }
}

/// Last path segment of `url` without query or fragment.
pub fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "attachment".to_string(),
    }
}

enum Outcome {
    Attach(FileAttachment),
    Link(String),
}

/// Resolves the media of `post` and of its reblog and quote, in that order.
pub async fn resolve(
    post: &Post,
    fetcher: &dyn MediaFetcher,
    host: &dyn MediaHost,
    limits: &AttachmentLimits,
) -> ResolvedAttachments {
    let mut resolved = ResolvedAttachments::default();
    let attachments = post.attachments_in_order();
    if attachments.is_empty() {
        debug!(post_id = %post.id, "No attachments found");
        return resolved;
    }

    for attachment in attachments {
        debug!(url = %attachment.url, kind = ?attachment.kind, "Processing attachment");
        match resolve_one(attachment, fetcher, host, limits).await {
            Ok(Outcome::Attach(file)) => resolved.files.push(file),
            Ok(Outcome::Link(link)) => resolved.inline_links.push(link),
            Err(e) => {
                error!(url = %attachment.url, error = %e, "Failed to handle attachment");
                resolved.inline_links.push(attachment_markup(attachment));
            }
        }
    }
    resolved
}

async fn resolve_one(
    attachment: &Attachment,
    fetcher: &dyn MediaFetcher,
    host: &dyn MediaHost,
    limits: &AttachmentLimits,
) -> Result<Outcome, MediaError> {
    let probed = fetcher.head_size(&attachment.url).await?;
    if probed > limits.large_attachment_threshold {
        debug!(
            url = %attachment.url,
            size_mb = probed as f64 / MIB as f64,
            "Attachment too large, skipped"
        );
        return Ok(Outcome::Link(attachment_markup(attachment)));
    }

    let bytes = fetcher.download(&attachment.url).await?;
    let size = bytes.len() as u64;
    info!(url = %attachment.url, size_mb = size as f64 / MIB as f64, "Attachment downloaded");

    if size <= limits.file_limit {
        return Ok(Outcome::Attach(FileAttachment {
            filename: filename_from_url(&attachment.url),
            bytes,
        }));
    }

    if !attachment.kind.is_rehostable() {
        return Ok(Outcome::Link(attachment_markup(attachment)));
    }

    // A failed rehost still leaves a usable link to the original.
    let link = match host.rehost(bytes, attachment.kind).await {
        Ok(Some(url)) => {
            info!(original = %attachment.url, rehosted = %url, "Attachment rehosted");
            url
        }
        Ok(None) => {
            error!(url = %attachment.url, "Media host declined the upload");
            attachment_markup(attachment)
        }
        Err(e) => {
            error!(url = %attachment.url, error = %e, "Error uploading to media host");
            attachment_markup(attachment)
        }
    };
    Ok(Outcome::Link(link))
}
