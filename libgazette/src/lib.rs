//! Gazette - turns fetched news items into at most one social post each
//!
//! This library is the decision and composition pipeline: dedup/exclusion
//! gating against the history store, keyword filtering with a good-word
//! restore pass, keyword-driven tag assignment, length-bounded text
//! composition, and byte-offset rich-text span extraction. Fetching,
//! platform authentication and publishing live outside this crate.

pub mod compose;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod spans;
pub mod tags;
pub mod types;

// Re-export commonly used types
pub use compose::Composer;
pub use config::{Config, FilterConfig, TagRule};
pub use error::{GazetteError, Result};
pub use filter::{ArticleFilter, FilterSplit, KeywordFilter, NoopFilter};
pub use history::{History, MemoryHistory, SqliteHistory};
pub use pipeline::{Pipeline, Summarizer};
pub use spans::{MentionResolver, Span, SpanKind};
pub use tags::TagAssigner;
pub use types::{Article, ComposedPost, PostableArticle};
