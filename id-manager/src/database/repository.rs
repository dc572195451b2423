//! Repository layer for database operations
//!
//! This module provides CRUD operations for items, tags, their
//! associations and the global settings map. Every multi-statement
//! write runs in a transaction so a failure leaves prior state intact.

use super::models::*;
use crate::config::DEFAULT_TAG_COLOR;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

const ITEM_COLUMNS: &str = "id, title, notes, sortOrder, createdAt, updatedAt";
const TAG_COLUMNS: &str = "id, word, color, isActive, createdAt";

/// Manual order first, unordered rows last, most recently updated first on ties
const DISPLAY_ORDER: &str = "sortOrder IS NULL, sortOrder ASC, updatedAt DESC, id DESC";
const TAG_ORDER: &str = "createdAt DESC, id DESC";

/// `value` exactly as given, rejecting blank input
fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}

/// Blank text is stored as NULL, anything else verbatim
fn optional_text(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Attach each tag to the item, failing on the first unknown tag id
async fn attach_tags(conn: &mut SqliteConnection, item_id: i64, tag_ids: &[i64]) -> Result<()> {
    for tag_id in tag_ids {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ?")
            .bind(tag_id)
            .fetch_one(&mut *conn)
            .await?;

        if exists == 0 {
            return Err(AppError::TagNotFound(*tag_id));
        }

        sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn tag_ids_of(&self, item_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM item_tags WHERE item_id = ? ORDER BY tag_id")
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Fill in the tag ids of every item, one lookup per item
    async fn with_tag_ids(&self, mut items: Vec<Item>) -> Result<Vec<Item>> {
        for item in &mut items {
            item.tag_ids = self.tag_ids_of(item.id).await?;
        }
        Ok(items)
    }

    // ===== Items =====

    /// List all items in display order
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items ORDER BY {}",
            ITEM_COLUMNS, DISPLAY_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        self.with_tag_ids(items).await
    }

    /// Get an item by ID
    pub async fn get_item(&self, id: i64) -> Result<Item> {
        let mut item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::ItemNotFound(id))?;

        item.tag_ids = self.tag_ids_of(id).await?;
        Ok(item)
    }

    /// Create a new item above every existing one
    pub async fn create_item(&self, req: CreateItemRequest) -> Result<Item> {
        let title = required("Title", &req.title)?;
        let notes = optional_text(req.notes.as_deref());
        let now = timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        let min_order: i64 = sqlx::query_scalar("SELECT COALESCE(MIN(sortOrder), 0) FROM items")
            .fetch_one(&mut *tx)
            .await?;

        let id = sqlx::query(
            r#"
            INSERT INTO items (title, notes, sortOrder, createdAt, updatedAt)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(notes)
        .bind(min_order - 1)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        attach_tags(&mut *tx, id, &req.tag_ids).await?;

        tx.commit().await?;

        tracing::debug!("Created item: {}", id);
        self.get_item(id).await
    }

    /// Update an item and replace its whole tag set
    pub async fn update_item(&self, req: UpdateItemRequest) -> Result<Item> {
        let title = required("Title", &req.title)?;
        let notes = optional_text(req.notes.as_deref());
        let now = timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("UPDATE items SET title = ?, notes = ?, updatedAt = ? WHERE id = ?")
            .bind(title)
            .bind(notes)
            .bind(&now)
            .bind(req.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(req.id));
        }

        sqlx::query("DELETE FROM item_tags WHERE item_id = ?")
            .bind(req.id)
            .execute(&mut *tx)
            .await?;

        attach_tags(&mut *tx, req.id, &req.tag_ids).await?;

        tx.commit().await?;

        tracing::debug!("Updated item: {}", req.id);
        self.get_item(req.id).await
    }

    /// Delete an item together with its tag associations
    pub async fn delete_item(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Explicit so removal does not depend on foreign key enforcement
        sqlx::query("DELETE FROM item_tags WHERE item_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted item: {}", id);
        Ok(())
    }

    /// Case-insensitive substring search over title or notes, newest update first.
    ///
    /// Uses the same predicate as the in-memory list filter so both agree.
    pub async fn search_items(&self, query: &str) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items ORDER BY updatedAt DESC, id DESC",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let matching = items
            .into_iter()
            .filter(|item| item.matches_text(query, true))
            .collect();

        self.with_tag_ids(matching).await
    }

    /// Assign sort positions 0..n in list order, all or nothing
    pub async fn reorder_items(&self, ordered_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (position, id) in ordered_ids.iter().enumerate() {
            let rows = sqlx::query("UPDATE items SET sortOrder = ? WHERE id = ?")
                .bind(position as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if rows == 0 {
                return Err(AppError::ItemNotFound(*id));
            }
        }

        tx.commit().await?;

        tracing::debug!("Reordered {} items", ordered_ids.len());
        Ok(())
    }

    /// Items carrying the given tag
    pub async fn items_using_tag(&self, tag_id: i64) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items \
             WHERE id IN (SELECT item_id FROM item_tags WHERE tag_id = ?) \
             ORDER BY {}",
            ITEM_COLUMNS, DISPLAY_ORDER
        ))
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_tag_ids(items).await
    }

    // ===== Tags =====

    /// List all tags, newest first
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {} FROM tags ORDER BY {}",
            TAG_COLUMNS, TAG_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// List tags that join the global search prefix, newest first
    pub async fn list_active_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!(
            "SELECT {} FROM tags WHERE isActive = 1 ORDER BY {}",
            TAG_COLUMNS, TAG_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// Get a tag by ID
    pub async fn get_tag(&self, id: i64) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TagNotFound(id))?;

        Ok(tag)
    }

    /// Create an active tag. Words are not deduplicated here.
    pub async fn create_tag(&self, req: CreateTagRequest) -> Result<Tag> {
        let word = required("Tag word", &req.word)?;
        let color = optional_text(req.color.as_deref())
            .map(str::trim)
            .unwrap_or(DEFAULT_TAG_COLOR);

        let id = sqlx::query("INSERT INTO tags (word, color, isActive, createdAt) VALUES (?, ?, 1, ?)")
            .bind(word)
            .bind(color)
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        tracing::debug!("Created tag: {} ({})", id, word);
        self.get_tag(id).await
    }

    /// Flip whether a tag joins the global search prefix
    pub async fn set_tag_active(&self, id: i64, is_active: bool) -> Result<()> {
        let rows = sqlx::query("UPDATE tags SET isActive = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TagNotFound(id));
        }

        tracing::debug!("Set tag {} active = {}", id, is_active);
        Ok(())
    }

    /// Delete a tag after detaching it from every item
    pub async fn delete_tag(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("DELETE FROM item_tags WHERE tag_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let rows = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TagNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted tag: {} (detached from {} items)", id, detached);
        Ok(())
    }

    // ===== Settings =====

    /// Get/set settings
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Set setting: {} = {}", key, value);
        Ok(())
    }

    /// Read the global settings map, coercing stored strings
    pub async fn get_global_settings(&self) -> Result<GlobalSettings> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(GlobalSettings::from_stored(rows))
    }

    /// Store one global setting after checking the value fits the key
    pub async fn set_global_setting(&self, key: SettingKey, value: &str) -> Result<()> {
        let value = key.normalize(value)?;
        self.set_setting(key.as_str(), &value).await
    }
}
