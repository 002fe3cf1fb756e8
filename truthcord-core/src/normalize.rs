//! HTML Normalizer: turns a post's rich-text body into paragraphs, attribution
//! strings and a list of out-of-band links.
//!
//! Normalisation never fails. Malformed markup is handled by the HTML5 parser's
//! error recovery, and anything ambiguous (a second header card, a second
//! inline quote) is logged and dropped.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::markup::markdown_link;

const HEADER_CARD_CLASS: &str = "h-card";
const QUOTE_INLINE_CLASS: &str = "quote-inline";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:users/|@)([^/\s?#]+)").expect("valid handle regex"));

/// Mis-decoded UTF-8 seen in upstream bodies. Order matters: the bare `â€`
/// prefix must go last.
const MOJIBAKE_FIXES: [(&str, &str); 5] = [
    ("â€™", "'"),
    ("Â", ""),
    ("â€œ", "\u{201C}"),
    ("â€¦", "..."),
    ("â€", "\u{201D}"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedContent {
    /// Non-blank paragraphs in document order.
    pub paragraphs: Vec<String>,
    /// Text of the first header card: the account this post reposts.
    pub header: Option<String>,
    /// Markdown link to the account of the first inline quotation.
    pub footer: Option<String>,
    /// Markdown links kept out of the body, in document order.
    pub external_links: Vec<String>,
}

impl NormalizedContent {
    /// Paragraphs joined by blank lines.
    pub fn joined(&self) -> String {
        self.paragraphs.join("\n\n")
    }

    pub fn has_text(&self) -> bool {
        !self.paragraphs.is_empty()
    }
}

/// Normalises `html`. Anchors whose text is a bare URL are relabelled with
/// `external_link_label`.
pub fn normalize(html: &str, external_link_label: &str) -> NormalizedContent {
    let document = Html::parse_fragment(html);
    let root = document.root_element();

    let mut walker = Walker {
        external_link_label,
        header: None,
        footer: None,
    };

    let external_links: Vec<String> = elements_named(root, "a")
        .filter(|a| !inside_quote_inline(*a))
        .filter_map(|a| {
            let (label, href) = walker.anchor_parts(a);
            (!label.starts_with('@')).then(|| markdown_link(&label, &href))
        })
        .collect();

    let mut blocks: Vec<ElementRef<'_>> = elements_named(root, "p").collect();
    if blocks.is_empty() {
        // No paragraph markup: the whole fragment is one paragraph.
        blocks.push(root);
    }

    let mut paragraphs = Vec::new();
    for block in blocks {
        let mut text = String::new();
        walker.render_children(block, &mut text);

        // Everything from the header card on belongs to the reposted post.
        if walker.header.is_some() {
            continue;
        }

        let text = fix_mojibake(&text);
        let text = text.trim();
        if !text.is_empty() {
            paragraphs.push(text.to_string());
        }
    }

    let normalized = NormalizedContent {
        paragraphs,
        header: walker.header,
        footer: walker.footer,
        external_links,
    };
    debug!(
        paragraphs = normalized.paragraphs.len(),
        external_links = normalized.external_links.len(),
        header = ?normalized.header,
        footer = ?normalized.footer,
        "Parsed HTML"
    );
    normalized
}

struct Walker<'l> {
    external_link_label: &'l str,
    header: Option<String>,
    footer: Option<String>,
}

impl Walker<'_> {
    /// Visible label and target of an anchor, with bare URLs relabelled.
    fn anchor_parts(&self, a: ElementRef<'_>) -> (String, String) {
        let href = a.value().attr("href").unwrap_or_default().to_string();
        let text: String = a.text().collect();
        let text = text.trim();
        let label = if text.starts_with("http") {
            self.external_link_label.to_string()
        } else {
            text.to_string()
        };
        (label, href)
    }

    fn render_children(&mut self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.render_element(el, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn render_element(&mut self, element: ElementRef<'_>, out: &mut String) {
        match element.value().name() {
            "br" => out.push('\n'),
            "a" => {
                // Mentions stay inline, every other link is already listed.
                let (label, href) = self.anchor_parts(element);
                if label.starts_with('@') {
                    out.push_str(&markdown_link(&label, &href));
                }
            }
            "span" if has_class(element, HEADER_CARD_CLASS) => {
                let mut card = String::new();
                self.render_children(element, &mut card);
                self.capture_header(card.trim().to_string());
            }
            "span" if has_class(element, QUOTE_INLINE_CLASS) => {
                let text: String = element.text().collect();
                self.capture_footer(quote_attribution(&text));
            }
            _ => self.render_children(element, out),
        }
    }

    fn capture_header(&mut self, card: String) {
        match &self.header {
            Some(existing) => {
                warn!(kept = %existing, discarded = %card, "Multiple header cards found, skipping");
            }
            None => self.header = Some(card),
        }
    }

    fn capture_footer(&mut self, footer: String) {
        match &self.footer {
            Some(existing) => {
                warn!(kept = %existing, discarded = %footer, "Multiple quote in lines found, skipping");
            }
            None => self.footer = Some(footer),
        }
    }
}

/// `[handle](url)` for the first URL in an inline quotation.
fn quote_attribution(text: &str) -> String {
    let Some(url) = URL_RE.find(text).map(|m| m.as_str()) else {
        return text.trim().to_string();
    };
    let handle = HANDLE_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(url);
    markdown_link(handle, url)
}

fn fix_mojibake(text: &str) -> String {
    MOJIBAKE_FIXES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn elements_named<'a>(
    root: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn inside_quote_inline(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| has_class(el, QUOTE_INLINE_CLASS))
}
