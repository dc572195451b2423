//! Database schema and migrations
//!
//! Every launch brings the on-disk schema up to the current shape no matter
//! which earlier release left it behind. Each step first checks whether the
//! table already satisfies its shape, so running initialization repeatedly
//! is safe. Steps that only preserve legacy data are best-effort: a failure
//! is logged and startup continues.

use crate::config::{DEFAULT_TAG_COLOR, DEFAULT_TAG_WORD};
use crate::database::models::{timestamp, SettingKey};
use crate::error::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Connection;
use std::future::Future;

/// A column of a managed table
#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    /// Type clause for `ALTER TABLE ADD COLUMN`, or `None` when the column
    /// can only appear through a rebuild
    pub add_definition: Option<&'static str>,
}

const fn fixed(name: &'static str) -> Column {
    Column {
        name,
        add_definition: None,
    }
}

const fn addable(name: &'static str, definition: &'static str) -> Column {
    Column {
        name,
        add_definition: Some(definition),
    }
}

/// Target shape of a managed table
#[derive(Debug)]
pub struct TableShape {
    pub name: &'static str,
    /// Column and constraint definitions between the parentheses of `CREATE TABLE`
    pub body: &'static str,
    pub columns: &'static [Column],
}

/// What a migration did to a table
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: bool,
    pub rebuilt: bool,
    /// Columns that did not exist before this run
    pub added: Vec<&'static str>,
}

impl MigrationReport {
    pub fn gained(&self, column: &str) -> bool {
        self.added.iter().any(|name| *name == column)
    }

    pub fn is_unchanged(&self) -> bool {
        !self.created && !self.rebuilt && self.added.is_empty()
    }
}

pub const ITEMS: TableShape = TableShape {
    name: "items",
    body: "id INTEGER PRIMARY KEY AUTOINCREMENT, \
           title TEXT NOT NULL, \
           notes TEXT, \
           sortOrder INTEGER, \
           createdAt TEXT NOT NULL, \
           updatedAt TEXT NOT NULL",
    columns: &[
        fixed("id"),
        fixed("title"),
        addable("notes", "TEXT"),
        addable("sortOrder", "INTEGER"),
        fixed("createdAt"),
        fixed("updatedAt"),
    ],
};

// The color default must match DEFAULT_TAG_COLOR.
pub const TAGS: TableShape = TableShape {
    name: "tags",
    body: "id INTEGER PRIMARY KEY AUTOINCREMENT, \
           word TEXT NOT NULL, \
           color TEXT NOT NULL DEFAULT '#007AFF', \
           isActive INTEGER NOT NULL DEFAULT 1, \
           createdAt TEXT NOT NULL",
    columns: &[
        fixed("id"),
        fixed("word"),
        addable("color", "TEXT NOT NULL DEFAULT '#007AFF'"),
        addable("isActive", "INTEGER NOT NULL DEFAULT 1"),
        fixed("createdAt"),
    ],
};

pub const ITEM_TAGS: TableShape = TableShape {
    name: "item_tags",
    body: "item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE, \
           tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE, \
           PRIMARY KEY (item_id, tag_id)",
    columns: &[fixed("item_id"), fixed("tag_id")],
};

pub const SETTINGS: TableShape = TableShape {
    name: "settings",
    body: "key TEXT PRIMARY KEY, value TEXT NOT NULL",
    columns: &[fixed("key"), fixed("value")],
};

/// Table names used by earlier releases, renamed in place
const LEGACY_TABLE_NAMES: &[(&str, &str)] = &[("ids", "items"), ("search_words", "tags")];

/// Per-item search word column of an abandoned release
const LEGACY_SEARCH_WORD_COLUMN: &str = "searchWord";

/// Key under which the legacy settings table kept its single search prefix
const LEGACY_PREFIX_KEY: &str = "search_prefix";

impl TableShape {
    fn create_sql(&self, table: &str) -> String {
        format!("CREATE TABLE IF NOT EXISTS {} ({})", table, self.body)
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Create the table if it does not exist. Returns whether it was created.
    pub async fn ensure(&self, conn: &mut SqliteConnection) -> Result<bool> {
        if table_exists(conn, self.name).await? {
            return Ok(false);
        }

        sqlx::query(&self.create_sql(self.name))
            .execute(&mut *conn)
            .await?;

        tracing::info!("Created table {}", self.name);
        Ok(true)
    }

    /// Bring an existing table to this shape.
    ///
    /// Obsolete columns (or a missing column that cannot be added in place)
    /// force a rebuild that keeps every column still present in the shape.
    /// Otherwise missing columns are added without touching existing rows.
    pub async fn upgrade(&self, conn: &mut SqliteConnection) -> Result<MigrationReport> {
        let existing = table_columns(conn, self.name).await?;
        let present = |name: &str| existing.iter().any(|column| column == name);

        let obsolete: Vec<&str> = existing
            .iter()
            .map(String::as_str)
            .filter(|name| !self.has_column(name))
            .collect();
        let missing: Vec<&Column> = self
            .columns
            .iter()
            .filter(|column| !present(column.name))
            .collect();

        let mut report = MigrationReport {
            added: missing.iter().map(|column| column.name).collect(),
            ..MigrationReport::default()
        };

        if obsolete.is_empty() && missing.is_empty() {
            return Ok(report);
        }

        if !obsolete.is_empty() || missing.iter().any(|column| column.add_definition.is_none()) {
            let preserved: Vec<&str> = self
                .columns
                .iter()
                .map(|column| column.name)
                .filter(|name| present(*name))
                .collect();

            tracing::info!(
                "Rebuilding table {} (dropping {:?}, keeping {:?})",
                self.name,
                obsolete,
                preserved
            );
            self.rebuild(conn, &preserved).await?;
            report.rebuilt = true;
            return Ok(report);
        }

        for column in missing {
            if let Some(definition) = column.add_definition {
                sqlx::query(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    self.name, column.name, definition
                ))
                .execute(&mut *conn)
                .await?;

                tracing::info!("Added column {}.{}", self.name, column.name);
            }
        }

        Ok(report)
    }

    /// Create the table when absent, otherwise upgrade it
    pub async fn migrate(&self, conn: &mut SqliteConnection) -> Result<MigrationReport> {
        if self.ensure(conn).await? {
            return Ok(MigrationReport {
                created: true,
                ..MigrationReport::default()
            });
        }

        self.upgrade(conn).await
    }

    /// Replace the table with a fresh one of this shape, copying `preserved` columns.
    ///
    /// Foreign keys are off for the duration so dropping the original cannot
    /// cascade into tables that reference it.
    async fn rebuild(&self, conn: &mut SqliteConnection, preserved: &[&str]) -> Result<()> {
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let copied = self.copy_through_shadow(conn, preserved).await;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;

        copied
    }

    async fn copy_through_shadow(
        &self,
        conn: &mut SqliteConnection,
        preserved: &[&str],
    ) -> Result<()> {
        let shadow = format!("{}__rebuild", self.name);
        let columns = preserved.join(", ");

        let mut tx = conn.begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", shadow))
            .execute(&mut *tx)
            .await?;

        sqlx::query(&self.create_sql(&shadow))
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            shadow, columns, columns, self.name
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!("DROP TABLE {}", self.name))
            .execute(&mut *tx)
            .await?;

        sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", shadow, self.name))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Whether a table exists in the main schema
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&mut *conn)
            .await?;

    Ok(count > 0)
}

/// Column names of a table, in declaration order
pub async fn table_columns(conn: &mut SqliteConnection, table: &str) -> Result<Vec<String>> {
    let columns: Vec<String> =
        sqlx::query_scalar(&format!("SELECT name FROM pragma_table_info('{}')", table))
            .fetch_all(&mut *conn)
            .await?;

    Ok(columns)
}

async fn best_effort<T, F>(step: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Migration step '{}' failed, continuing: {}", step, e);
            None
        }
    }
}

/// Initialize database with schema
///
/// All steps run on one connection so connection-scoped PRAGMAs hold
/// for the whole migration.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool.acquire().await?;
    initialize_connection(&mut conn).await
}

async fn initialize_connection(conn: &mut SqliteConnection) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Enable WAL mode for better performance and crash safety
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&mut *conn)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    best_effort("rename legacy tables", rename_legacy_tables(conn)).await;

    TAGS.ensure(conn).await?;
    best_effort("upgrade tags", TAGS.upgrade(conn)).await;

    ITEMS.ensure(conn).await?;
    ITEM_TAGS.ensure(conn).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id)")
        .execute(&mut *conn)
        .await?;

    // Must run before the items upgrade drops the column
    best_effort("carry legacy search words", carry_legacy_search_words(conn)).await;

    best_effort("upgrade items", ITEMS.upgrade(conn)).await;
    best_effort("backfill sort order", backfill_sort_order(conn)).await;
    best_effort("upgrade item_tags", ITEM_TAGS.upgrade(conn)).await;

    seed_default_tag(conn).await?;

    best_effort("migrate legacy settings", migrate_legacy_settings(conn)).await;
    SETTINGS.ensure(conn).await?;
    best_effort("upgrade settings", SETTINGS.upgrade(conn)).await;
    seed_settings(conn).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

async fn rename_legacy_tables(conn: &mut SqliteConnection) -> Result<()> {
    for (legacy, current) in LEGACY_TABLE_NAMES {
        if table_exists(conn, legacy).await? && !table_exists(conn, current).await? {
            sqlx::query(&format!("ALTER TABLE {} RENAME TO {}", legacy, current))
                .execute(&mut *conn)
                .await?;

            tracing::info!("Renamed legacy table {} to {}", legacy, current);
        }
    }

    Ok(())
}

/// Id of the oldest tag with `word`, inserting one when none exists
async fn find_or_create_tag(conn: &mut SqliteConnection, word: &str, active: bool) -> Result<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM tags WHERE word = ? ORDER BY id LIMIT 1")
            .bind(word)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query(
        "INSERT INTO tags (word, color, isActive, createdAt) VALUES (?, ?, ?, ?)",
    )
    .bind(word)
    .bind(DEFAULT_TAG_COLOR)
    .bind(active)
    .bind(timestamp(Utc::now()))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    tracing::info!("Created tag {:?} from legacy data", word);
    Ok(id)
}

/// Turn the abandoned per-item search word into tag associations
async fn carry_legacy_search_words(conn: &mut SqliteConnection) -> Result<usize> {
    let columns = table_columns(conn, ITEMS.name).await?;
    if !columns.iter().any(|column| column == LEGACY_SEARCH_WORD_COLUMN) {
        return Ok(0);
    }

    let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
        "SELECT id, {col} FROM items WHERE {col} IS NOT NULL AND TRIM({col}) <> ''",
        col = LEGACY_SEARCH_WORD_COLUMN
    ))
    .fetch_all(&mut *conn)
    .await?;

    let mut tx = conn.begin().await?;

    for (item_id, word) in &rows {
        // Per-item words never joined the global prefix
        let tag_id = find_or_create_tag(&mut *tx, word.trim(), false).await?;

        sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Carried {} legacy search words into tags", rows.len());
    Ok(rows.len())
}

/// Give every row without a position one below all positioned rows,
/// most recently updated first. A fresh `sortOrder` column numbers 0, 1, 2, ...
async fn backfill_sort_order(conn: &mut SqliteConnection) -> Result<usize> {
    let unordered: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM items WHERE sortOrder IS NULL ORDER BY updatedAt DESC, id DESC",
    )
    .fetch_all(&mut *conn)
    .await?;

    if unordered.is_empty() {
        return Ok(0);
    }

    let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(sortOrder) + 1, 0) FROM items")
        .fetch_one(&mut *conn)
        .await?;

    let mut tx = conn.begin().await?;

    for (offset, id) in unordered.iter().enumerate() {
        sqlx::query("UPDATE items SET sortOrder = ? WHERE id = ?")
            .bind(next + offset as i64)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!("Backfilled sort order for {} items", unordered.len());
    Ok(unordered.len())
}

async fn seed_default_tag(conn: &mut SqliteConnection) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&mut *conn)
        .await?;

    if count == 0 {
        sqlx::query("INSERT INTO tags (word, color, isActive, createdAt) VALUES (?, ?, 1, ?)")
            .bind(DEFAULT_TAG_WORD)
            .bind(DEFAULT_TAG_COLOR)
            .bind(timestamp(Utc::now()))
            .execute(&mut *conn)
            .await?;

        tracing::info!("Seeded default tag {:?}", DEFAULT_TAG_WORD);
    }

    Ok(())
}

/// Convert the single-prefix settings table of early releases into a tag.
///
/// The legacy table is recognized by its prefix key; it is dropped afterwards
/// so the key/value settings table can be created in its place.
async fn migrate_legacy_settings(conn: &mut SqliteConnection) -> Result<bool> {
    if !table_exists(conn, SETTINGS.name).await? {
        return Ok(false);
    }

    let prefix: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(LEGACY_PREFIX_KEY)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(prefix) = prefix else {
        return Ok(false);
    };

    let mut tx = conn.begin().await?;

    let word = prefix.unwrap_or_default();
    let word = word.trim();
    if !word.is_empty() && word != DEFAULT_TAG_WORD {
        find_or_create_tag(&mut *tx, word, true).await?;
    }

    sqlx::query("DROP TABLE settings").execute(&mut *tx).await?;
    tx.commit().await?;

    tracing::info!("Migrated legacy settings table");
    Ok(true)
}

async fn seed_settings(conn: &mut SqliteConnection) -> Result<()> {
    for key in SettingKey::ALL {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key.as_str())
            .bind(key.default_value())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
