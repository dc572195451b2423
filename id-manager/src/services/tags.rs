//! Tags service
//!
//! Business logic for search tags: creation with color validation,
//! activation, and deletion with a usage lookup for confirmation prompts.

use crate::database::{CreateTagRequest, Item, Repository, Tag};
use crate::error::{AppError, Result};

/// Whether `color` is `#RGB` or `#RRGGBB`
pub fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Service for managing tags
#[derive(Clone)]
pub struct TagsService {
    repo: Repository,
}

impl TagsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a tag, rejecting malformed colors and words already in use
    pub async fn create_tag(&self, word: String, color: Option<String>) -> Result<Tag> {
        let trimmed = word.trim();

        if let Some(color) = color.as_deref() {
            if !is_hex_color(color) {
                return Err(AppError::Validation(format!("Invalid tag color: {}", color)));
            }
        }

        let lowered = trimmed.to_lowercase();
        let taken = self
            .repo
            .list_tags()
            .await?
            .iter()
            .any(|tag| !lowered.is_empty() && tag.word.to_lowercase() == lowered);
        if taken {
            return Err(AppError::DuplicateTag(trimmed.to_string()));
        }

        let tag = self
            .repo
            .create_tag(CreateTagRequest {
                word: trimmed.to_string(),
                color,
            })
            .await?;

        tracing::info!("Tag created: {} ({})", tag.word, tag.id);
        Ok(tag)
    }

    /// List all tags, newest first
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.repo.list_tags().await
    }

    /// List active tags, newest first
    pub async fn list_active_tags(&self) -> Result<Vec<Tag>> {
        self.repo.list_active_tags().await
    }

    pub async fn set_tag_active(&self, id: i64, is_active: bool) -> Result<()> {
        self.repo.set_tag_active(id, is_active).await
    }

    /// Items that lose this tag if it is deleted
    pub async fn items_using_tag(&self, id: i64) -> Result<Vec<Item>> {
        self.repo.items_using_tag(id).await
    }

    /// Delete a tag; it is detached from every item first
    pub async fn delete_tag(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting tag: {}", id);

        self.repo.delete_tag(id).await?;

        tracing::info!("Tag deleted successfully: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TAG_COLOR;
    use crate::database::{initialize_database, memory_pool};

    async fn create_test_service() -> TagsService {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();
        TagsService::new(Repository::new(pool))
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#FF6B6B"));
        assert!(is_hex_color("#abc"));
        assert!(!is_hex_color("FF6B6B"));
        assert!(!is_hex_color("#GG0000"));
        assert!(!is_hex_color("#1234"));
    }

    #[tokio::test]
    async fn test_create_tag_with_color() {
        let service = create_test_service().await;

        let tag = service
            .create_tag("  YouTube ".to_string(), Some("#4ECDC4".to_string()))
            .await
            .unwrap();
        assert_eq!(tag.word, "YouTube");
        assert_eq!(tag.color, "#4ECDC4");

        let plain = service.create_tag("Vimeo".to_string(), None).await.unwrap();
        assert_eq!(plain.color, DEFAULT_TAG_COLOR);
    }

    #[tokio::test]
    async fn test_create_tag_rejects_bad_input() {
        let service = create_test_service().await;

        assert!(matches!(
            service.create_tag("".to_string(), None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_tag("x".to_string(), Some("red".to_string())).await,
            Err(AppError::Validation(_))
        ));
        // Seeded default tag
        assert!(matches!(
            service.create_tag("id".to_string(), None).await,
            Err(AppError::DuplicateTag(_))
        ));
    }
}
