//! Hard character ceiling for outgoing messages.
//!
//! Lengths are counted in Unicode scalar values (`char`s), the unit chat
//! platforms use for their message limits.

/// Appended to any text the governor had to cut.
pub const WORD_LIMIT_MARKER: &str = " ...\n-# :small_orange_diamond: Word limit";

pub fn marker_len() -> usize {
    WORD_LIMIT_MARKER.chars().count()
}

/// Returns `text` unchanged when it fits in `limit` characters, otherwise a
/// cut-down copy ending in [`WORD_LIMIT_MARKER`] that is exactly `limit` long
/// (or shorter, when trailing whitespace was stripped before the marker).
///
/// A `limit` smaller than the marker itself yields a plain cut with no marker.
pub fn bound(text: &str, limit: usize) -> String {
    let len = text.chars().count();
    if len <= limit {
        return text.to_string();
    }

    let marker = marker_len();
    if limit < marker {
        tracing::warn!(limit, marker, "Character budget smaller than the word limit marker");
        return text.chars().take(limit).collect();
    }

    let kept: String = text.chars().take(limit - marker).collect();
    let mut out = kept.trim_end().to_string();
    out.push_str(WORD_LIMIT_MARKER);
    tracing::debug!(original = len, bounded = out.chars().count(), limit, "Truncated message body");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_unchanged() {
        assert_eq!(bound("hello", 5), "hello");
        assert_eq!(bound("", 0), "");
    }

    #[test]
    fn long_text_is_cut_to_exactly_the_limit() {
        let text = "x".repeat(500);
        let out = bound(&text, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.ends_with(WORD_LIMIT_MARKER));
    }

    #[test]
    fn multibyte_text_is_counted_in_chars() {
        let text = "界".repeat(300);
        let out = bound(&text, 120);
        assert_eq!(out.chars().count(), 120);
        assert!(out.starts_with("界界"));
    }

    #[test]
    fn trailing_whitespace_before_marker_is_stripped() {
        let limit = marker_len() + 6;
        let text = format!("hello     {}", "y".repeat(50));
        let out = bound(&text, limit);
        assert_eq!(out, format!("hello{WORD_LIMIT_MARKER}"));
        assert!(out.chars().count() <= limit);
    }

    #[test]
    fn bounding_twice_is_a_no_op() {
        let text = "word ".repeat(1000);
        let once = bound(&text, 300);
        assert_eq!(bound(&once, 300), once);
    }

    #[test]
    fn tiny_limit_cuts_without_marker() {
        assert_eq!(bound("abcdefghijklmnopqrstuvwxyz", 3), "abc");
    }
}
