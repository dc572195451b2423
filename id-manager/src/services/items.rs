//! Items service
//!
//! High-level business logic for item operations.
//! Handles item lifecycle, manual ordering and list filtering.

use crate::database::{
    CreateItemRequest, Item, ItemFilter, Repository, UpdateItemRequest,
};
use crate::error::{AppError, Result};
use crate::services::SettingsService;
use std::collections::HashSet;

/// Keep the items matching `filter`, preserving their order
pub fn filter_items(items: Vec<Item>, filter: &ItemFilter) -> Vec<Item> {
    items.into_iter().filter(|item| filter.matches(item)).collect()
}

/// Service for managing items
#[derive(Clone)]
pub struct ItemsService {
    repo: Repository,
    settings: SettingsService,
}

impl ItemsService {
    pub fn new(repo: Repository, settings: SettingsService) -> Self {
        Self { repo, settings }
    }

    /// Create a new item at the top of the list
    pub async fn create_item(
        &self,
        title: String,
        notes: Option<String>,
        tag_ids: Vec<i64>,
    ) -> Result<Item> {
        tracing::info!("Creating new item: {}", title);

        let req = CreateItemRequest {
            title,
            notes,
            tag_ids,
        };

        let item = self.repo.create_item(req).await?;

        tracing::info!("Item created successfully: {}", item.id);

        Ok(item)
    }

    /// Get an item by ID
    pub async fn get_item(&self, id: i64) -> Result<Item> {
        self.repo.get_item(id).await
    }

    /// List all items in display order
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.repo.list_items().await
    }

    /// Update an item, replacing its tag set
    pub async fn update_item(
        &self,
        id: i64,
        title: String,
        notes: Option<String>,
        tag_ids: Vec<i64>,
    ) -> Result<Item> {
        tracing::debug!("Updating item: {}", id);

        let req = UpdateItemRequest {
            id,
            title,
            notes,
            tag_ids,
        };

        let item = self.repo.update_item(req).await?;

        tracing::debug!("Item updated successfully: {}", item.id);

        Ok(item)
    }

    /// Delete an item
    pub async fn delete_item(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting item: {}", id);

        self.repo.delete_item(id).await?;

        tracing::info!("Item deleted successfully: {}", id);

        Ok(())
    }

    /// Persist a drag-reordered list
    pub async fn reorder_items(&self, ordered_ids: &[i64]) -> Result<()> {
        let mut seen = HashSet::new();
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::Validation(format!(
                "Item {} appears more than once in the new order",
                dup
            )));
        }

        self.repo.reorder_items(ordered_ids).await?;

        tracing::info!("Saved new order for {} items", ordered_ids.len());
        Ok(())
    }

    /// Search items by title, and by notes when the memo setting allows it.
    ///
    /// Results keep the display order of the list.
    pub async fn search_items(&self, query: &str) -> Result<Vec<Item>> {
        let settings = self.settings.load().await?;

        let filter = ItemFilter {
            text: query.to_string(),
            tag_ids: Vec::new(),
            include_notes: settings.search_in_memo,
        };

        let items = self.list_items().await?;
        Ok(filter_items(items, &filter))
    }
}
