use crate::feed::aggregate::Article;
use serde::Deserialize;

/// Narrowing criteria applied to an aggregated article list.
///
/// Every criterion is optional; an empty query keeps everything. Matching
/// never reorders, it only drops articles and then pages the remainder.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArticleQuery {
    /// Keep articles carrying at least one of these tags (case-insensitive).
    pub tags: Vec<String>,
    /// Case-insensitive substring of the title or summary.
    pub search: Option<String>,
    /// Case-insensitive substring of the source name.
    pub source: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ArticleQuery {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && non_blank(&self.search).is_none()
            && non_blank(&self.source).is_none()
            && self.offset == 0
            && self.limit.is_none()
    }

    /// Returns true when `article` satisfies every criterion except paging.
    pub fn matches(&self, article: &Article) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| article.has_tag(tag.trim())) {
            return false;
        }

        if let Some(needle) = non_blank(&self.search) {
            let needle = needle.to_lowercase();
            if !article.title.to_lowercase().contains(&needle)
                && !article.summary.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(needle) = non_blank(&self.source) {
            if !article
                .source_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Filters and pages `articles` according to `query`, preserving order.
pub fn apply(articles: Vec<Article>, query: &ArticleQuery) -> Vec<Article> {
    if query.is_empty() {
        return articles;
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    articles
        .into_iter()
        .filter(|article| query.matches(article))
        .skip(query.offset)
        .take(limit)
        .collect()
}

/// Drops every article that came from `feed_url`.
///
/// The server keeps no aggregated state, so `DELETE /feeds` only edits the
/// registry. This is for library callers that hold an aggregated list and
/// want a removed feed's articles gone without refetching the rest.
pub fn without_feed(articles: Vec<Article>, feed_url: &str) -> Vec<Article> {
    let feed_url = feed_url.trim();
    articles
        .into_iter()
        .filter(|article| article.feed_url != feed_url)
        .collect()
}
