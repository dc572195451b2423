//! Search query builder
//!
//! Composes the web-search string for an item: active tag words (when the
//! global setting asks for them), then the item's own tag words, then the
//! item text. The result is safe to percent-encode into a search URL.

use crate::config::WEB_SEARCH_URL;
use crate::database::Repository;
use crate::error::Result;
use crate::services::SettingsService;

/// Replace control characters with spaces
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Search-engine URL carrying `query` as the percent-encoded `q` parameter
pub fn web_search_url(query: &str) -> String {
    format!("{}?q={}", WEB_SEARCH_URL, urlencoding::encode(query))
}

/// Ordered, duplicate-free list of words placed before the search text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPrefix {
    words: Vec<String>,
}

impl SearchPrefix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `word` unless it is blank or already present. Returns whether it was added.
    pub fn push(&mut self, word: &str) -> bool {
        let word = sanitize(word);
        let word = word.trim();

        if word.is_empty() || self.words.iter().any(|existing| existing == word) {
            return false;
        }

        self.words.push(word.to_string());
        true
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Prefix words joined by spaces, then `base_text`
    pub fn apply(&self, base_text: &str) -> String {
        let base_text = sanitize(base_text);

        if self.words.is_empty() {
            return base_text;
        }

        format!("{} {}", self.words.join(" "), base_text)
    }
}

/// Service building web-search queries from tags and settings
#[derive(Clone)]
pub struct SearchService {
    repo: Repository,
    settings: SettingsService,
}

impl SearchService {
    pub fn new(repo: Repository, settings: SettingsService) -> Self {
        Self { repo, settings }
    }

    /// Build the final query for `base_text`.
    ///
    /// Unknown ids in `item_tag_ids` are skipped.
    pub async fn build_search_query(&self, base_text: &str, item_tag_ids: &[i64]) -> Result<String> {
        let settings = self.settings.load().await?;
        let mut prefix = SearchPrefix::new();

        if settings.use_search_words {
            for tag in self.repo.list_active_tags().await? {
                prefix.push(&tag.word);
            }
        }

        if !item_tag_ids.is_empty() {
            let tags = self.repo.list_tags().await?;

            for id in item_tag_ids {
                match tags.iter().find(|tag| tag.id == *id) {
                    Some(tag) => {
                        prefix.push(&tag.word);
                    }
                    None => tracing::debug!("Skipping unknown tag {} in search query", id),
                }
            }
        }

        let query = prefix.apply(base_text);
        tracing::debug!("Built search query: {}", query);
        Ok(query)
    }

    /// Fallback URL for an item when the platform cannot open the query itself
    pub async fn web_search_url(&self, base_text: &str, item_tag_ids: &[i64]) -> Result<String> {
        let query = self.build_search_query(base_text, item_tag_ids).await?;
        Ok(web_search_url(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, memory_pool, CreateTagRequest, Tag};

    async fn create_test_service() -> (SearchService, Repository) {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let service = SearchService::new(repo.clone(), SettingsService::new(repo.clone()));
        (service, repo)
    }

    async fn tag(repo: &Repository, word: &str) -> Tag {
        repo.create_tag(CreateTagRequest {
            word: word.to_string(),
            color: None,
        })
        .await
        .unwrap()
    }

    async fn clear_tags(repo: &Repository) {
        for existing in repo.list_tags().await.unwrap() {
            repo.delete_tag(existing.id).await.unwrap();
        }
    }

    #[test]
    fn test_prefix_suppresses_duplicates() {
        let mut prefix = SearchPrefix::new();

        assert!(prefix.push("X"));
        assert!(prefix.push("Y"));
        assert!(!prefix.push("X"));
        assert!(!prefix.push("  "));

        assert_eq!(prefix.words(), ["X", "Y"]);
        assert_eq!(prefix.apply("123"), "X Y 123");
    }

    #[test]
    fn test_empty_prefix_leaves_text_unchanged() {
        assert_eq!(SearchPrefix::new().apply("1234567"), "1234567");
    }

    #[test]
    fn test_control_characters_replaced() {
        let mut prefix = SearchPrefix::new();
        prefix.push("A\tB");

        assert_eq!(prefix.apply("12\n34"), "A B 12 34");
    }

    #[test]
    fn test_web_search_url_encodes_query() {
        assert_eq!(
            web_search_url("X 12&3"),
            "https://www.google.com/search?q=X%2012%263"
        );
    }

    #[tokio::test]
    async fn test_no_prefix_when_disabled() {
        let (service, repo) = create_test_service().await;
        clear_tags(&repo).await;
        service.settings.set_use_search_words(false).await.unwrap();

        let query = service.build_search_query("1234567", &[]).await.unwrap();
        assert_eq!(query, "1234567");
    }

    #[tokio::test]
    async fn test_active_tags_then_item_tags() {
        let (service, repo) = create_test_service().await;
        clear_tags(&repo).await;

        let y = tag(&repo, "Y").await;
        let x = tag(&repo, "X").await;
        let item_tag = tag(&repo, "Z").await;
        repo.set_tag_active(item_tag.id, false).await.unwrap();

        // Newest active tag lists first
        let query = service
            .build_search_query("1234567", &[item_tag.id, x.id, 999])
            .await
            .unwrap();
        assert_eq!(query, "X Y Z 1234567");

        let query = service.build_search_query("1234567", &[y.id]).await.unwrap();
        assert_eq!(query, "X Y 1234567");
    }

    #[tokio::test]
    async fn test_item_tags_used_when_global_prefix_disabled() {
        let (service, repo) = create_test_service().await;
        let own = tag(&repo, "Vimeo").await;
        service.settings.set_use_search_words(false).await.unwrap();

        let url = service.web_search_url("abc", &[own.id]).await.unwrap();
        assert_eq!(url, "https://www.google.com/search?q=Vimeo%20abc");
    }
}
