//! Post composition: length-bounded publishable text
//!
//! Renders the final post body (external summary or headline + description
//! fallback) plus the tag suffix, inside a hard character budget. Character
//! counts are Unicode scalar values, a documented approximation of the
//! target platform's grapheme counting.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Article, ComposedPost};

static A_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<\s*a\b[^>]*href=["']([^"']+)["'][^>]*>(.*?)</\s*a\s*>"#).unwrap()
});
static BLOCK_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(?:br|p|div|li|tr|h[1-6])\b[^>]*>").unwrap());
static BLOCK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</\s*(?:p|div|li|tr|h[1-6])\s*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Renders final post text within a hard character budget
pub struct Composer {
    max_chars: usize,
}

impl Composer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Compose the publishable text for `article`.
    ///
    /// A non-empty `summary` is used verbatim as the body; otherwise the
    /// body is synthesized from headline and description. Truncation only
    /// ever shortens the body; the tag suffix is preserved verbatim.
    pub fn compose(&self, article: &Article, summary: Option<&str>, tags: &[String]) -> ComposedPost {
        let body = match summary {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => self.fallback_body(article),
        };

        if tags.is_empty() {
            return ComposedPost {
                text: self.cap_bare_body(body),
                tags: Vec::new(),
            };
        }

        let suffix: String = tags.iter().map(|t| format!("#{} ", t)).collect();
        let suffix_chars = suffix.chars().count();

        let mut body = body;
        if body.chars().count() + suffix_chars > self.max_chars {
            let allowed = self.max_chars.saturating_sub(suffix_chars + 4);
            let truncated: String = body.chars().take(allowed).collect();
            body = format!("{}…", truncated.trim_end());
        }

        ComposedPost {
            text: format!("{}\n{}", body.trim_end(), suffix.trim_end()),
            tags: tags.to_vec(),
        }
    }

    /// Headline + blank line + description, cleaned of markup
    fn fallback_body(&self, article: &Article) -> String {
        clean_html(&format!("{}\n\n{}", article.headline, article.description))
    }

    /// With no tags the body alone is capped, reserving three characters
    /// for the ellipsis once it exceeds the budget.
    fn cap_bare_body(&self, body: String) -> String {
        if body.chars().count() > self.max_chars {
            let truncated: String = body
                .chars()
                .take(self.max_chars.saturating_sub(3))
                .collect();
            format!("{}...", truncated)
        } else {
            body
        }
    }
}

/// Reduce an HTML fragment to plain text.
///
/// Entities are decoded, anchors become `inner (url)`, block-level tags
/// become newlines, remaining tags are stripped, and whitespace is
/// normalized: no carriage returns, at most two consecutive newlines,
/// single spaces for horizontal runs.
pub fn clean_html(text: &str) -> String {
    let text = html_escape::decode_html_entities(text).into_owned();

    let text = A_TAG.replace_all(&text, |caps: &regex::Captures| {
        let href = &caps[1];
        let inner = ANY_TAG.replace_all(caps.get(2).map_or("", |m| m.as_str()), "");
        format!("{} ({})", inner, href)
    });

    let text = BLOCK_OPEN.replace_all(&text, "\n");
    let text = BLOCK_CLOSE.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");

    let text = text.replace('\r', "");
    let text = MULTI_NEWLINE.replace_all(&text, "\n\n");
    let text = HSPACE.replace_all(&text, " ");
    text.trim().to_string()
}
