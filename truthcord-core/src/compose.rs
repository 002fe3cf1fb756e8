//! Content Composer: assembles the final message text for one post.
//!
//! Three renderings exist:
//! - **no content**: the post has no text anywhere (media-only or a bare repost),
//!   so only the top line and attribution are shown;
//! - **translated**: translated text first, then the original below a divider;
//! - **original**: the post in its own language, with a visible notice when a
//!   configured translation could not be produced.
//!
//! Every rendering goes through [`governor::bound`] with the inline-links block
//! kept outside the budget, so links are never cut mid-URL.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, warn};

use crate::attachments::{resolve, AttachmentLimits};
use crate::contract::{
    ComposedMessage, MediaFetcher, MediaHost, TranslateError, TranslationLanguages, Translator,
};
use crate::governor;
use crate::markup::{add_line_prefix, MessageBuilder};
use crate::normalize::{normalize, NormalizedContent};
use crate::post::Post;

const LINK_SEPARATOR: &str = " ｜ ";
const LINKS_PREFIX: &str = "> -# ";
const SUB_NOTE_PREFIX: &str = "-# ";
const QUOTE_PREFIX: &str = "> ";
const QUOTED_SUB_NOTE_PREFIX: &str = "> -# ";

/// User-visible wording in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub reposted_from: String,
    pub quoted_from: String,
    /// Replaces anchor text that is a bare URL.
    pub external_link: String,
    /// Divider above the original text in translated messages, with its own
    /// trailing punctuation.
    pub original_text: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            reposted_from: "Reposted from".into(),
            quoted_from: "Quoted from".into(),
            external_link: "External link".into(),
            original_text: "Original text:".into(),
        }
    }
}

impl Labels {
    pub fn chinese() -> Self {
        Self {
            reposted_from: "转发自".into(),
            quoted_from: "引用自".into(),
            external_link: "外部链接".into(),
            original_text: "原文：".into(),
        }
    }

    fn header(&self, card: &str) -> String {
        format!("{} {}", self.reposted_from, card)
    }

    fn footer(&self, link: &str) -> String {
        format!("{} {}", self.quoted_from, link)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    /// Hard ceiling for the whole message, links included.
    pub character_limit: usize,
    /// Headroom kept free below the ceiling.
    pub safety_margin: usize,
    /// Translation is enabled only when both languages are set.
    #[serde(deserialize_with = "configured_languages")]
    pub translation: Option<TranslationLanguages>,
    pub source_labels: Labels,
    pub destination_labels: Labels,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            character_limit: 1800,
            safety_margin: 200,
            translation: None,
            source_labels: Labels::default(),
            destination_labels: Labels::chinese(),
        }
    }
}

/// Both language codes, or nothing: a half-set or blank pair disables translation.
fn configured_languages<'de, D>(deserializer: D) -> Result<Option<TranslationLanguages>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct PartialLanguages {
        from: Option<String>,
        to: Option<String>,
    }

    let non_blank = |code: Option<String>| {
        code.map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
    };
    let Some(partial) = Option::<PartialLanguages>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match (non_blank(partial.from), non_blank(partial.to)) {
        (Some(from), Some(to)) => Ok(Some(TranslationLanguages { from, to })),
        (from, to) => {
            warn!(?from, ?to, "Translation needs both languages, leaving it off");
            Ok(None)
        }
    }
}

impl ComposeSettings {
    /// Wording for text that is not part of a translated section.
    pub fn display_labels(&self) -> &Labels {
        if self.translation.is_some() {
            &self.destination_labels
        } else {
            &self.source_labels
        }
    }
}

/// Outcome of the batch translation of `[main, reblog, quote]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Translated {
        main: String,
        reblog: String,
        quote: String,
    },
    Unavailable(String),
}

impl Translation {
    /// Checks the batch size before mapping positions back to sections.
    pub fn from_response(response: Result<Vec<String>, TranslateError>) -> Self {
        match response {
            Ok(texts) if texts.len() == 3 => {
                let mut it = texts.into_iter();
                match (it.next(), it.next(), it.next()) {
                    (Some(main), Some(reblog), Some(quote)) => {
                        Translation::Translated { main, reblog, quote }
                    }
                    _ => Translation::Unavailable("incomplete translation batch".into()),
                }
            }
            Ok(texts) => Translation::Unavailable(format!(
                "expected 3 translations, got {}",
                texts.len()
            )),
            Err(e) => Translation::Unavailable(e.to_string()),
        }
    }
}

/// Collaborators needed to build one message.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fetcher: &'a dyn MediaFetcher,
    pub host: &'a dyn MediaHost,
    pub translator: &'a dyn Translator,
}

/// Resolves attachments and composes the text for `post`.
pub async fn build_message(
    post: &Post,
    collaborators: Collaborators<'_>,
    settings: &ComposeSettings,
    limits: &AttachmentLimits,
) -> ComposedMessage {
    debug!(post_id = %post.id, "Building message");
    let resolved = resolve(post, collaborators.fetcher, collaborators.host, limits).await;
    let content = compose(post, resolved.inline_links, collaborators.translator, settings).await;
    ComposedMessage {
        content,
        files: resolved.files,
    }
}

/// Composes the message text. `inline_links` come from the attachment resolver;
/// the post's own external links are appended after them.
pub async fn compose(
    post: &Post,
    mut inline_links: Vec<String>,
    translator: &dyn Translator,
    settings: &ComposeSettings,
) -> String {
    let display = settings.display_labels();
    let main = normalize(&post.content, &display.external_link);
    inline_links.extend(main.external_links.iter().cloned());
    let links_block = links_block(inline_links, settings);

    let top = top_line(post);
    let reblog_text = nested_text(post.reblog.as_deref(), &display.external_link);
    let quote_text = nested_text(post.quote.as_deref(), &display.external_link);
    let texts = SectionTexts {
        main: &main,
        reblog: &reblog_text,
        quote: &quote_text,
    };

    if !main.has_text() && reblog_text.is_empty() && quote_text.is_empty() {
        debug!(post_id = %post.id, "No real contents found");
        let mut body = MessageBuilder::new();
        if let Some(card) = &main.header {
            body.prefixed_line(&display.header(card), SUB_NOTE_PREFIX);
        } else if let Some(link) = &main.footer {
            body.prefixed_line(&display.footer(link), SUB_NOTE_PREFIX);
        }
        return finalize(&top, &body.finish(), &links_block, settings);
    }

    let body = match &settings.translation {
        None => render_original(&texts, &settings.source_labels, None),
        Some(languages) => {
            let request = vec![main.joined(), reblog_text.clone(), quote_text.clone()];
            debug!(post_id = %post.id, "Translating content");
            match Translation::from_response(translator.translate(&request, languages).await) {
                Translation::Translated {
                    main: main_tr,
                    reblog: reblog_tr,
                    quote: quote_tr,
                } => render_translated(
                    &texts,
                    [&main_tr, &reblog_tr, &quote_tr],
                    settings,
                ),
                Translation::Unavailable(reason) => {
                    error!(post_id = %post.id, reason = %reason, "Translation failed, showing original text");
                    render_original(&texts, &settings.source_labels, Some(&reason))
                }
            }
        }
    };

    finalize(&top, &body, &links_block, settings)
}

struct SectionTexts<'a> {
    main: &'a NormalizedContent,
    reblog: &'a str,
    quote: &'a str,
}

/// `-# :loudspeaker: [@handle](profile) • <t:epoch>` followed by a newline.
pub fn top_line(post: &Post) -> String {
    let profile = if post.account.url.is_empty() {
        post.url.as_deref().unwrap_or_default()
    } else {
        post.account.url.as_str()
    };
    format!(
        "-# :loudspeaker: [@{}]({}) • <t:{}>\n",
        post.account.handle(),
        profile,
        post.created_at.timestamp()
    )
}

fn nested_text(post: Option<&Post>, external_link_label: &str) -> String {
    post.map(|p| normalize(&p.content, external_link_label).joined())
        .unwrap_or_default()
}

fn render_original(texts: &SectionTexts<'_>, labels: &Labels, failure: Option<&str>) -> String {
    let mut body = MessageBuilder::new();
    if let Some(reason) = failure {
        let notice = if reason.is_empty() {
            "-# :small_orange_diamond: Translation failed".to_string()
        } else {
            format!("-# :small_orange_diamond: Translation failed: {reason}")
        };
        body.line(&notice);
    }
    if let Some(card) = &texts.main.header {
        body.prefixed_block(&labels.header(card), SUB_NOTE_PREFIX);
    }
    body.block(&texts.main.joined());
    if let Some(link) = &texts.main.footer {
        body.prefixed_block(&labels.footer(link), SUB_NOTE_PREFIX);
    }
    // Reblog wins; the quote is shown only when there is no reblog text.
    let attached = if texts.reblog.is_empty() {
        texts.quote
    } else {
        texts.reblog
    };
    body.block(attached);
    body.finish()
}

fn render_translated(
    texts: &SectionTexts<'_>,
    [main_tr, reblog_tr, quote_tr]: [&str; 3],
    settings: &ComposeSettings,
) -> String {
    let dst = &settings.destination_labels;
    let src = &settings.source_labels;
    let header = texts.main.header.as_deref();
    let footer = texts.main.footer.as_deref();

    let mut body = MessageBuilder::new();
    if let Some(card) = header {
        body.prefixed_line(&dst.header(card), SUB_NOTE_PREFIX);
    }
    body.block(main_tr);
    if let Some(link) = footer {
        body.prefixed_line(&dst.footer(link), SUB_NOTE_PREFIX);
    }
    body.prefixed_block(reblog_tr, QUOTE_PREFIX)
        .prefixed_block(quote_tr, QUOTE_PREFIX)
        .line(&format!("-# :small_blue_diamond:{}", dst.original_text));
    if let Some(card) = header {
        body.prefixed_line(&src.header(card), SUB_NOTE_PREFIX);
    }
    body.prefixed_block(&texts.main.joined(), SUB_NOTE_PREFIX);
    if let Some(link) = footer {
        body.prefixed_line(&src.footer(link), SUB_NOTE_PREFIX);
    }
    body.prefixed_line(texts.reblog, QUOTED_SUB_NOTE_PREFIX)
        .prefixed_line(texts.quote, QUOTED_SUB_NOTE_PREFIX);
    body.finish()
}

/// Renders the trailing links block, dropping whole links from the end when
/// the block alone would take more than half of the usable space.
fn links_block(mut links: Vec<String>, settings: &ComposeSettings) -> String {
    let allowance = settings
        .character_limit
        .saturating_sub(settings.safety_margin)
        / 2;
    loop {
        if links.is_empty() {
            return String::new();
        }
        let block = add_line_prefix(&links.join(LINK_SEPARATOR), LINKS_PREFIX);
        // One extra character for the separating newline.
        if block.chars().count() + 1 <= allowance {
            return block;
        }
        if let Some(dropped) = links.pop() {
            warn!(link = %dropped, allowance, "Inline links exceed their share of the message, dropping link");
        }
    }
}

fn finalize(top: &str, body: &str, links_block: &str, settings: &ComposeSettings) -> String {
    let links_cost = if links_block.is_empty() {
        0
    } else {
        links_block.chars().count() + 1
    };
    let budget = settings
        .character_limit
        .saturating_sub(links_cost)
        .saturating_sub(settings.safety_margin);

    let mut content = governor::bound(&format!("{top}{body}"), budget);
    if !links_block.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(links_block);
    }
    content
}
