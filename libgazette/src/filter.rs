//! Keyword filter engine
//!
//! Classifies candidate articles as kept or removed per the configured word
//! lists, across three independent fields (body, URL, headline), plus an
//! optional custom filter strategy and a good-word restore pass.
//!
//! Removals come in two tiers: restorable (a `bad_words` match, eligible for
//! the restore pass) and permanent (a `super_bad_words` match or a custom
//! filter's permanent set, never restored).

use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::types::Article;

/// The three-way partition produced by a filter stage
#[derive(Debug, Default)]
pub struct FilterSplit {
    pub kept: Vec<Article>,
    pub restorable: Vec<Article>,
    pub permanent: Vec<Article>,
}

impl FilterSplit {
    fn kept(kept: Vec<Article>) -> Self {
        Self {
            kept,
            restorable: Vec::new(),
            permanent: Vec::new(),
        }
    }
}

/// Pluggable filter strategy applied after the keyword stages.
///
/// Selected explicitly at startup; the default is [`NoopFilter`]. A failing
/// implementation never aborts the pipeline: the stage degrades to identity.
pub trait ArticleFilter: Send + Sync {
    fn name(&self) -> &str;

    /// Partition `articles` into kept, removed-restorable and
    /// removed-permanent sets.
    fn filter(&self, articles: &[Article]) -> anyhow::Result<FilterSplit>;
}

/// Identity filter: keeps everything, removes nothing
pub struct NoopFilter;

impl ArticleFilter for NoopFilter {
    fn name(&self) -> &str {
        "noop"
    }

    fn filter(&self, articles: &[Article]) -> anyhow::Result<FilterSplit> {
        Ok(FilterSplit::kept(articles.to_vec()))
    }
}

/// Which field a keyword stage inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Body,
    Url,
    Headline,
}

impl FilterField {
    fn label(&self) -> &'static str {
        match self {
            FilterField::Body => "body",
            FilterField::Url => "URL",
            FilterField::Headline => "headline",
        }
    }
}

/// Word-list driven filter over a single run's survivor set
pub struct KeywordFilter {
    bad_words: Vec<String>,
    good_words: Vec<String>,
    super_bad_words: Vec<String>,
}

impl KeywordFilter {
    /// Build a filter from a configuration value. Word lists are lowercased
    /// once here; all matching is case-insensitive substring matching.
    pub fn new(config: &FilterConfig) -> Self {
        let lower = |list: &[String]| list.iter().map(|w| w.to_lowercase()).collect();
        Self {
            bad_words: lower(&config.bad_words),
            good_words: lower(&config.good_words),
            super_bad_words: lower(&config.super_bad_words),
        }
    }

    /// Run one keyword stage over `articles`, partitioning by the given field
    pub fn filter_field(&self, articles: Vec<Article>, field: FilterField) -> FilterSplit {
        let mut split = FilterSplit::default();
        for article in articles {
            let haystack = match field {
                FilterField::Body => article.description.to_lowercase(),
                FilterField::Url => normalize_link(&article.link),
                FilterField::Headline => article.headline.to_lowercase(),
            };

            if contains_any(&haystack, &self.super_bad_words) {
                info!(
                    headline = %article.headline,
                    "excluding permanently due to {} filter",
                    field.label()
                );
                split.permanent.push(article);
            } else if contains_any(&haystack, &self.bad_words) {
                info!(
                    headline = %article.headline,
                    "excluding due to {} filter",
                    field.label()
                );
                split.restorable.push(article);
            } else {
                split.kept.push(article);
            }
        }
        split
    }

    /// Apply the custom filter strategy to the current survivor set.
    ///
    /// On failure the stage behaves as identity: nothing removed.
    pub fn apply_custom(&self, articles: Vec<Article>, custom: &dyn ArticleFilter) -> FilterSplit {
        match custom.filter(&articles) {
            Ok(split) => {
                debug!(
                    filter = custom.name(),
                    kept = split.kept.len(),
                    restorable = split.restorable.len(),
                    permanent = split.permanent.len(),
                    "custom filter applied"
                );
                split
            }
            Err(e) => {
                warn!(
                    filter = custom.name(),
                    error = %e,
                    "custom filter failed, keeping all articles"
                );
                FilterSplit::kept(articles)
            }
        }
    }

    /// Restore pass: removed-restorable articles whose headline contains a
    /// good word move back to kept. Built by partition, never by removing
    /// from a list mid-iteration. Permanent removals are not offered here.
    pub fn restore(&self, restorable: Vec<Article>) -> (Vec<Article>, Vec<Article>) {
        let mut restored = Vec::new();
        let mut removed = Vec::new();
        for article in restorable {
            if contains_any(&article.headline.to_lowercase(), &self.good_words) {
                info!(headline = %article.headline, "restoring due to good-word match");
                restored.push(article);
            } else {
                removed.push(article);
            }
        }
        (restored, removed)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Lowercase a link and normalize path separators, dots and hyphens to
/// spaces, so a bad word that is itself hyphen- or dot-delimited in the URL
/// still matches as a substring.
fn normalize_link(link: &str) -> String {
    link.to_lowercase()
        .replace(['/', '.', '-'], " ")
}
