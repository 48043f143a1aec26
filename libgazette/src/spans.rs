//! Rich-text span extraction over composed post text
//!
//! Spans are byte ranges into the UTF-8 encoding of the exact post text,
//! which is what the publishing platform's rich-text annotations expect.
//! Offsets measured in characters would drift as soon as the text contains
//! a multi-byte character, so all scanning happens on the byte buffer.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;

// Handle syntax follows DNS label rules: labels of 1-63 alphanumeric or
// hyphen characters, letters-only TLD.
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|\W)(@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)",
    )
    .unwrap()
});

// The final character class excludes sentence punctuation and closing
// parentheses, so "https://example.com." and "(https://example.com/)"
// end at the URL proper.
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|\W)(https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_+.~#?&/=]*[-a-zA-Z0-9@%_+~#/=])?)",
    )
    .unwrap()
});

static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\W)(#\w{1,30})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpanKind {
    Link,
    Mention,
    Hashtag,
}

/// A byte-range annotation over a post's UTF-8 encoding.
///
/// `value` is the resolved target: the URL for links, the bare handle (or,
/// after resolution, the platform identifier) for mentions, and the bare
/// tag name for hashtags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    pub value: String,
}

/// Maps a mention handle to a platform identifier.
///
/// Resolution is a network concern supplied by the publishing collaborator;
/// `None` means the handle stays plain text.
#[async_trait]
pub trait MentionResolver: Send + Sync {
    async fn resolve(&self, handle: &str) -> Option<String>;
}

fn scan(text: &str, re: &Regex, kind: SpanKind, strip_sigil: bool) -> Vec<Span> {
    let bytes = text.as_bytes();
    re.captures_iter(bytes)
        .filter_map(|caps| {
            let m = caps.get(1)?;
            let matched = std::str::from_utf8(&bytes[m.start()..m.end()]).ok()?;
            let value = if strip_sigil { &matched[1..] } else { matched };
            Some(Span {
                start: m.start(),
                end: m.end(),
                kind,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Mention spans: `@` followed by a dot-delimited handle
pub fn extract_mentions(text: &str) -> Vec<Span> {
    scan(text, &MENTION_RE, SpanKind::Mention, true)
}

/// Link spans: `http(s)://` URLs, trailing punctuation excluded
pub fn extract_links(text: &str) -> Vec<Span> {
    scan(text, &URL_RE, SpanKind::Link, false)
}

/// Hashtag spans: `#` followed by 1-30 word characters
pub fn extract_hashtags(text: &str) -> Vec<Span> {
    scan(text, &HASHTAG_RE, SpanKind::Hashtag, true)
}

/// All spans in `text`, ordered by byte offset.
///
/// The three patterns are scanned independently against the same byte
/// buffer.
pub fn extract_spans(text: &str) -> Vec<Span> {
    let mut spans = extract_links(text);
    spans.extend(extract_mentions(text));
    spans.extend(extract_hashtags(text));
    spans.sort_by_key(|s| (s.start, s.end));
    spans
}

/// Extract spans and resolve mention handles through `resolver`.
///
/// Mentions the resolver cannot map (or all of them, when no resolver is
/// supplied) are dropped, leaving the handle as plain text in the post.
pub async fn resolve_spans(text: &str, resolver: Option<&dyn MentionResolver>) -> Vec<Span> {
    let mut resolved = Vec::new();
    for span in extract_spans(text) {
        match span.kind {
            SpanKind::Mention => {
                if let Some(resolver) = resolver {
                    if let Some(identifier) = resolver.resolve(&span.value).await {
                        resolved.push(Span {
                            value: identifier,
                            ..span
                        });
                    }
                }
            }
            _ => resolved.push(span),
        }
    }
    resolved
}
