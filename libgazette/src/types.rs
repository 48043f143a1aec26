//! Core types for Gazette

use serde::{Deserialize, Serialize};
use url::Url;

/// A fetched news item that has not yet been filtered or composed.
///
/// Identity is the canonical link: two articles with the same canonical
/// link are the same article for all dedup/exclusion purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub source_name: String,
    pub headline: String,
    pub description: String,
    /// Canonical link: query string and fragment stripped
    pub link: String,
    #[serde(default)]
    pub img_url: Option<String>,
    /// Fixed tag assigned by the source this article was fetched from
    pub tag: String,
    /// Publication time as a Unix timestamp, when the source provided one
    #[serde(default)]
    pub published_at: Option<i64>,
}

impl Article {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_name: String,
        headline: String,
        description: String,
        link: String,
        img_url: Option<String>,
        tag: String,
        published_at: Option<i64>,
    ) -> Self {
        Self {
            source_name,
            headline,
            description,
            link: canonical_link(&link),
            img_url,
            tag,
            published_at,
        }
    }

    /// Return this article with its link reduced to canonical form.
    ///
    /// Candidates arriving from external fetchers may still carry query
    /// strings or fragments; the pipeline canonicalizes at intake.
    pub fn canonicalized(mut self) -> Self {
        self.link = canonical_link(&self.link);
        self
    }

    /// An article without a headline or link cannot be gated or composed.
    pub fn is_well_formed(&self) -> bool {
        !self.headline.trim().is_empty() && !self.link.trim().is_empty()
    }
}

/// Strip the query string and fragment from a URL, keeping everything else.
///
/// Unparseable links are returned unchanged so they can still be matched
/// against the history store byte-for-byte.
pub fn canonical_link(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

/// Final publishable text plus the ordered tags appended to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedPost {
    pub text: String,
    pub tags: Vec<String>,
}

/// An article that survived filtering, carrying its composed post.
///
/// Ready for the publishing collaborator to extract spans and submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostableArticle {
    pub article: Article,
    pub post: ComposedPost,
}
