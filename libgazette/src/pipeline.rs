//! Pipeline orchestration: from candidate batch to postable set
//!
//! Sequences the dedup/exclusion gate, keyword stages, custom filter,
//! restore pass, exclusion write-back, tag assignment and composition over
//! one batch of candidates. Processing is single-threaded and sequential;
//! the only suspension points are History Oracle and summarizer calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compose::Composer;
use crate::config::Config;
use crate::error::Result;
use crate::filter::{ArticleFilter, FilterField, KeywordFilter, NoopFilter};
use crate::history::History;
use crate::tags::TagAssigner;
use crate::types::{Article, PostableArticle};

/// Optional summarization collaborator.
///
/// An empty string means "use fallback composition"; implementations are
/// expected to swallow their own failures and return empty.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, article: &Article) -> String;
}

/// One run's decision and composition pipeline
pub struct Pipeline {
    history: Arc<dyn History>,
    keyword_filter: KeywordFilter,
    custom_filter: Box<dyn ArticleFilter>,
    tag_assigner: TagAssigner,
    composer: Composer,
    summarizer: Option<Box<dyn Summarizer>>,
    max_articles_per_source: usize,
}

impl Pipeline {
    pub fn new(config: &Config, history: Arc<dyn History>) -> Self {
        Self {
            history,
            keyword_filter: KeywordFilter::new(&config.filter),
            custom_filter: Box::new(NoopFilter),
            tag_assigner: TagAssigner::new(&config.tags),
            composer: Composer::new(config.limits.max_post_chars),
            summarizer: None,
            max_articles_per_source: config.limits.max_articles_per_source,
        }
    }

    /// Install a custom filter strategy (replaces the no-op default)
    pub fn with_custom_filter(mut self, filter: Box<dyn ArticleFilter>) -> Self {
        self.custom_filter = filter;
        self
    }

    /// Install a summarization collaborator
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer.into();
        self
    }

    /// Run the pipeline over one batch of candidates.
    ///
    /// Returns the postable set; every article removed by a filter stage is
    /// recorded as excluded exactly once. A History Oracle read failure
    /// aborts the run before any write; exclusion write failures are logged
    /// and do not block the postable set.
    pub async fn run(&self, candidates: Vec<Article>) -> Result<Vec<PostableArticle>> {
        let received = candidates.len();

        let candidates = self.drop_malformed(candidates);
        let candidates = self.cap_per_source(candidates);
        let working = self.gate(candidates).await?;
        let gated = working.len();

        // Keyword stages, each consuming the survivors of the prior one
        let mut restorable = Vec::new();
        let mut permanent = Vec::new();
        let mut kept = working;
        for field in [FilterField::Body, FilterField::Url, FilterField::Headline] {
            let split = self.keyword_filter.filter_field(kept, field);
            restorable.extend(split.restorable);
            permanent.extend(split.permanent);
            kept = split.kept;
        }

        let split = self.keyword_filter.apply_custom(kept, &*self.custom_filter);
        restorable.extend(split.restorable);
        permanent.extend(split.permanent);
        kept = split.kept;

        // Good-word restore pass; permanent removals are never offered
        let (restored, still_removed) = self.keyword_filter.restore(restorable);
        let restored_count = restored.len();
        kept.extend(restored);

        self.record_exclusions(still_removed.iter().chain(permanent.iter()))
            .await;

        let mut postable = Vec::with_capacity(kept.len());
        for article in kept {
            let tags = self.tag_assigner.assign(&article);
            let summary = self.summarize(&article).await;
            let post = self.composer.compose(&article, summary.as_deref(), &tags);
            postable.push(PostableArticle { article, post });
        }

        info!(
            received,
            gated,
            removed = still_removed.len() + permanent.len(),
            restored = restored_count,
            postable = postable.len(),
            "pipeline run complete"
        );
        Ok(postable)
    }

    /// Drop candidates missing a headline or link, with a diagnostic;
    /// canonicalize the links of the rest.
    fn drop_malformed(&self, candidates: Vec<Article>) -> Vec<Article> {
        candidates
            .into_iter()
            .filter(|article| {
                let ok = article.is_well_formed();
                if !ok {
                    warn!(
                        source = %article.source_name,
                        link = %article.link,
                        "dropping malformed candidate"
                    );
                }
                ok
            })
            .map(Article::canonicalized)
            .collect()
    }

    /// Keep at most `max_articles_per_source` candidates per source, in
    /// batch order
    fn cap_per_source(&self, candidates: Vec<Article>) -> Vec<Article> {
        if self.max_articles_per_source == 0 {
            return candidates;
        }
        let mut counts: HashMap<String, usize> = HashMap::new();
        candidates
            .into_iter()
            .filter(|article| {
                let count = counts.entry(article.source_name.clone()).or_insert(0);
                *count += 1;
                if *count > self.max_articles_per_source {
                    debug!(
                        source = %article.source_name,
                        headline = %article.headline,
                        "per-source cap reached, skipping candidate"
                    );
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// Dedup/exclusion gate. Read-only and idempotent: running twice with
    /// no oracle mutation yields the same partition.
    async fn gate(&self, candidates: Vec<Article>) -> Result<Vec<Article>> {
        let mut working = Vec::with_capacity(candidates.len());
        let mut skipped = 0usize;
        for article in candidates {
            if self.history.has_posted(&article.link).await?
                || self.history.is_excluded(&article.link).await?
            {
                skipped += 1;
                continue;
            }
            working.push(article);
        }
        if skipped > 0 {
            info!(skipped, "skipped candidates already posted or excluded");
        }
        Ok(working)
    }

    /// Record every finally-removed link as excluded, once per link.
    ///
    /// Best-effort relative to the kept-set guarantee: failures are logged
    /// as a bookkeeping discrepancy and do not abort the run.
    async fn record_exclusions<'a>(&self, removed: impl Iterator<Item = &'a Article>) {
        let mut seen: HashSet<&str> = HashSet::new();
        for article in removed {
            if !seen.insert(article.link.as_str()) {
                continue;
            }
            if let Err(e) = self.history.record_excluded(&article.link).await {
                warn!(
                    link = %article.link,
                    error = %e,
                    "failed to record exclusion, link may be re-filtered next run"
                );
            }
        }
    }

    async fn summarize(&self, article: &Article) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        let summary = summarizer.summarize(article).await;
        if summary.trim().is_empty() {
            debug!(headline = %article.headline, "empty summary, using fallback composition");
            None
        } else {
            Some(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, FilterConfig, LimitsConfig, TagRule};
    use crate::error::HistoryError;
    use crate::filter::FilterSplit;
    use crate::history::MemoryHistory;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_error(message: &str) -> crate::error::GazetteError {
        HistoryError::IoError(std::io::Error::new(std::io::ErrorKind::Other, message.to_string()))
            .into()
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn test_config(bad: &[&str], good: &[&str], super_bad: &[&str]) -> Config {
        Config {
            database: DatabaseConfig {
                path: ":memory:".to_string(),
            },
            filter: FilterConfig {
                bad_words: words(bad),
                good_words: words(good),
                super_bad_words: words(super_bad),
            },
            tags: vec![TagRule {
                name: "weather".to_string(),
                keywords: words(&["storm"]),
            }],
            limits: LimitsConfig::default(),
            log_level: "info".to_string(),
        }
    }

    fn article(headline: &str, description: &str, link: &str) -> Article {
        Article::new(
            "Example Times".to_string(),
            headline.to_string(),
            description.to_string(),
            link.to_string(),
            None,
            "local".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_already_posted_never_in_output() {
        let history = Arc::new(MemoryHistory::with_posted(&["https://example.com/seen"]));
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history);

        let out = pipeline
            .run(vec![
                article("Seen before", "body", "https://example.com/seen"),
                article("Fresh", "body", "https://example.com/fresh"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].article.headline, "Fresh");
    }

    #[tokio::test]
    async fn test_already_excluded_never_in_output() {
        let history = Arc::new(MemoryHistory::with_excluded(&["https://example.com/bad"]));
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history);

        let out = pipeline
            .run(vec![article("Old offender", "body", "https://example.com/bad")])
            .await
            .unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_gate_matches_on_canonical_link() {
        let history = Arc::new(MemoryHistory::with_posted(&["https://example.com/seen"]));
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history);

        // same article, refetched with a tracking query string
        let out = pipeline
            .run(vec![article(
                "Seen before",
                "body",
                "https://example.com/seen?utm_source=feed",
            )])
            .await
            .unwrap();

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_removed_article_recorded_excluded_once() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&["casino"], &[], &[]), history.clone());

        // bad word in body, URL and headline; only one exclusion write
        let out = pipeline
            .run(vec![article(
                "Casino opens",
                "The casino is here.",
                "https://example.com/casino-opens",
            )])
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(history.excluded_count(), 1);
        assert!(history
            .is_excluded("https://example.com/casino-opens")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_candidate_links_recorded_once() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&["casino"], &[], &[]), history.clone());

        pipeline
            .run(vec![
                article("Casino opens", "body", "https://example.com/dupe"),
                article("Casino opens again", "body", "https://example.com/dupe"),
            ])
            .await
            .unwrap();

        assert_eq!(history.excluded_count(), 1);
    }

    #[tokio::test]
    async fn test_kept_articles_not_recorded_excluded() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&["casino"], &[], &[]), history.clone());

        let out = pipeline
            .run(vec![article("Bridge reopens", "body", "https://example.com/bridge")])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(history.excluded_count(), 0);
    }

    #[tokio::test]
    async fn test_good_word_restores_matching_headline_only() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(
            &test_config(&["casino"], &["charity"], &[]),
            history.clone(),
        );

        let out = pipeline
            .run(vec![
                article("Charity casino night", "body", "https://example.com/charity"),
                article("Casino opens", "body", "https://example.com/plain"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].article.headline, "Charity casino night");
        // only the unrestored article is recorded excluded
        assert_eq!(history.excluded_count(), 1);
        assert!(history
            .is_excluded("https://example.com/plain")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_super_bad_removal_never_restored() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(
            // the good word matches the headline, but the super-bad tier wins
            &test_config(&[], &["charity"], &["scam"]),
            history.clone(),
        );

        let out = pipeline
            .run(vec![article(
                "Charity scam warning",
                "body",
                "https://example.com/scam",
            )])
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(history.excluded_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_filter_permanent_never_restored() {
        struct RejectAll;
        impl ArticleFilter for RejectAll {
            fn name(&self) -> &str {
                "reject-all"
            }
            fn filter(&self, articles: &[Article]) -> anyhow::Result<FilterSplit> {
                Ok(FilterSplit {
                    kept: Vec::new(),
                    restorable: Vec::new(),
                    permanent: articles.to_vec(),
                })
            }
        }

        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &["charity"], &[]), history.clone())
            .with_custom_filter(Box::new(RejectAll));

        let out = pipeline
            .run(vec![article("Charity gala", "body", "https://example.com/gala")])
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(history.excluded_count(), 1);
    }

    #[tokio::test]
    async fn test_custom_filter_restorable_goes_through_restore_pass() {
        struct DemoteAll;
        impl ArticleFilter for DemoteAll {
            fn name(&self) -> &str {
                "demote-all"
            }
            fn filter(&self, articles: &[Article]) -> anyhow::Result<FilterSplit> {
                Ok(FilterSplit {
                    kept: Vec::new(),
                    restorable: articles.to_vec(),
                    permanent: Vec::new(),
                })
            }
        }

        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &["charity"], &[]), history.clone())
            .with_custom_filter(Box::new(DemoteAll));

        let out = pipeline
            .run(vec![
                article("Charity gala", "body", "https://example.com/gala"),
                article("Plain story", "body", "https://example.com/plain"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].article.headline, "Charity gala");
        assert_eq!(history.excluded_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_candidates_dropped_others_continue() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history);

        let mut missing_link = article("No link", "body", "https://example.com/x");
        missing_link.link = String::new();

        let out = pipeline
            .run(vec![
                missing_link,
                article("Good", "body", "https://example.com/good"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].article.headline, "Good");
    }

    #[tokio::test]
    async fn test_per_source_cap() {
        let history = Arc::new(MemoryHistory::new());
        let mut config = test_config(&[], &[], &[]);
        config.limits.max_articles_per_source = 2;
        let pipeline = Pipeline::new(&config, history);

        let out = pipeline
            .run(vec![
                article("One", "body", "https://example.com/1"),
                article("Two", "body", "https://example.com/2"),
                article("Three", "body", "https://example.com/3"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_tags_and_composition_flow_through() {
        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history);

        let out = pipeline
            .run(vec![article(
                "Storm warning issued",
                "High winds expected.",
                "https://example.com/storm",
            )])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].post.tags, vec!["weather", "local"]);
        assert_eq!(
            out[0].post.text,
            "Storm warning issued\n\nHigh winds expected.\n#weather #local"
        );
    }

    #[tokio::test]
    async fn test_summarizer_replaces_fallback_body() {
        struct FixedSummarizer;
        #[async_trait]
        impl Summarizer for FixedSummarizer {
            async fn summarize(&self, _article: &Article) -> String {
                "Summarized body.".to_string()
            }
        }

        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history)
            .with_summarizer(Box::new(FixedSummarizer));

        let out = pipeline
            .run(vec![article("Headline", "Long body.", "https://example.com/a")])
            .await
            .unwrap();

        assert!(out[0].post.text.starts_with("Summarized body."));
    }

    #[tokio::test]
    async fn test_empty_summary_falls_back_to_composition() {
        struct EmptySummarizer;
        #[async_trait]
        impl Summarizer for EmptySummarizer {
            async fn summarize(&self, _article: &Article) -> String {
                String::new()
            }
        }

        let history = Arc::new(MemoryHistory::new());
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history)
            .with_summarizer(Box::new(EmptySummarizer));

        let out = pipeline
            .run(vec![article("Headline", "Body.", "https://example.com/a")])
            .await
            .unwrap();

        assert!(out[0].post.text.starts_with("Headline\n\nBody."));
    }

    #[tokio::test]
    async fn test_gate_read_failure_aborts_before_any_write() {
        struct UnreachableStore {
            exclusion_writes: AtomicUsize,
        }

        #[async_trait]
        impl History for UnreachableStore {
            async fn has_posted(&self, _link: &str) -> Result<bool> {
                Err(store_error("history store unreachable"))
            }
            async fn record_posted(&self, _link: &str) -> Result<()> {
                Ok(())
            }
            async fn is_excluded(&self, _link: &str) -> Result<bool> {
                Ok(false)
            }
            async fn record_excluded(&self, _link: &str) -> Result<()> {
                self.exclusion_writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let history = Arc::new(UnreachableStore {
            exclusion_writes: AtomicUsize::new(0),
        });
        let pipeline = Pipeline::new(&test_config(&["casino"], &[], &[]), history.clone());

        let result = pipeline
            .run(vec![article("Casino opens", "body", "https://example.com/casino")])
            .await;

        assert!(result.is_err());
        // the run aborted at the gate, so the removal was never recorded
        assert_eq!(history.exclusion_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exclusion_write_failure_does_not_block_postable_set() {
        struct ReadOnlyStore;

        #[async_trait]
        impl History for ReadOnlyStore {
            async fn has_posted(&self, _link: &str) -> Result<bool> {
                Ok(false)
            }
            async fn record_posted(&self, _link: &str) -> Result<()> {
                Err(store_error("read-only store"))
            }
            async fn is_excluded(&self, _link: &str) -> Result<bool> {
                Ok(false)
            }
            async fn record_excluded(&self, _link: &str) -> Result<()> {
                Err(store_error("read-only store"))
            }
        }

        let pipeline = Pipeline::new(&test_config(&["casino"], &[], &[]), Arc::new(ReadOnlyStore));

        let out = pipeline
            .run(vec![
                article("Casino opens", "body", "https://example.com/casino"),
                article("Bridge reopens", "body", "https://example.com/bridge"),
            ])
            .await
            .unwrap();

        // the failed exclusion write is logged, the kept set still composes
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].article.headline, "Bridge reopens");
    }

    #[tokio::test]
    async fn test_gate_is_idempotent_without_oracle_mutation() {
        // the gate itself writes nothing, so two runs over a clean batch
        // partition identically
        let history = Arc::new(MemoryHistory::with_posted(&["https://example.com/seen"]));
        let pipeline = Pipeline::new(&test_config(&[], &[], &[]), history.clone());

        let batch = || {
            vec![
                article("Seen", "body", "https://example.com/seen"),
                article("Fresh", "body", "https://example.com/fresh"),
            ]
        };

        let first = pipeline.run(batch()).await.unwrap();
        let second = pipeline.run(batch()).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].article.link, second[0].article.link);
    }
}
