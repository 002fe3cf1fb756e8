//! Discord-flavoured markdown helpers and the message accumulator.

/// Placed after a prefix on blank lines so a quote block does not break apart.
const BLANK_LINE_FILLER: &str = " \u{180E}";

pub fn markdown_link(text: &str, href: &str) -> String {
    format!("[{text}]({href})")
}

/// Prefixes every line of `text`; blank lines keep the prefix with a filler.
pub fn add_line_prefix(text: &str, prefix: &str) -> String {
    if !text.contains('\n') {
        return format!("{prefix}{text}");
    }
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                format!("{prefix}{BLANK_LINE_FILLER}")
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ordered accumulator for message sections. Empty sections are skipped, the
/// text is joined once in [`MessageBuilder::finish`].
#[derive(Debug, Default)]
pub struct MessageBuilder {
    parts: Vec<String>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Section followed by a single line break.
    pub fn line(&mut self, text: &str) -> &mut Self {
        self.push(text, "\n")
    }

    /// Section followed by a blank line.
    pub fn block(&mut self, text: &str) -> &mut Self {
        self.push(text, "\n\n")
    }

    /// Section with no break after it.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.push(text, "")
    }

    pub fn prefixed_line(&mut self, text: &str, prefix: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        let prefixed = add_line_prefix(text, prefix);
        self.line(&prefixed)
    }

    pub fn prefixed_block(&mut self, text: &str, prefix: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        let prefixed = add_line_prefix(text, prefix);
        self.block(&prefixed)
    }

    fn push(&mut self, text: &str, separator: &str) -> &mut Self {
        if !text.is_empty() {
            self.parts.push(format!("{text}{separator}"));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Joined text with trailing whitespace removed.
    pub fn finish(&self) -> String {
        self.parts.concat().trim_end().to_string()
    }
}
