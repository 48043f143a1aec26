//! Keyword-driven tag assignment

use crate::config::TagRule;
use crate::types::Article;

/// Maps article text to topical labels via keyword membership.
///
/// Rules are checked in configured order; the source's own fixed tag is
/// always appended last, even when a keyword already assigned the same
/// label (duplicate hashtags are tolerated downstream).
pub struct TagAssigner {
    rules: Vec<(String, Vec<String>)>,
}

impl TagAssigner {
    /// Build an assigner from ordered tag rules. Keywords are lowercased
    /// once here.
    pub fn new(rules: &[TagRule]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|rule| {
                    (
                        rule.name.clone(),
                        rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Assigned tags for `article`, in rule order, source tag last
    pub fn assign(&self, article: &Article) -> Vec<String> {
        let text = normalize_text(article);

        let mut tags = Vec::new();
        for (name, keywords) in &self.rules {
            // first matching keyword is sufficient for a rule
            if keywords.iter().any(|k| text.contains(k.as_str())) {
                tags.push(name.clone());
            }
        }
        tags.push(article.tag.clone());
        tags
    }
}

/// Concatenate headline, description and link, fold separator punctuation
/// to spaces, and lowercase, so delimited keywords match as substrings.
fn normalize_text(article: &Article) -> String {
    format!(
        "{} {} {}",
        article.headline, article.description, article.link
    )
    .replace('\n', " ")
    .replace(['-', '_', '/', '.', ',', ':'], " ")
    .to_lowercase()
}
