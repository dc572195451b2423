//! Settings service
//!
//! Typed access to the global settings map stored in the database.
//! Screens receive this object instead of reading a shared global.

use crate::database::{DarkMode, GlobalSettings, Repository, SettingKey};
use crate::error::Result;

/// Service for managing global settings
#[derive(Clone)]
pub struct SettingsService {
    repo: Repository,
}

impl SettingsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Load the current settings
    pub async fn load(&self) -> Result<GlobalSettings> {
        self.repo.get_global_settings().await
    }

    /// Store a raw value for `key`; it must coerce to the key's type
    pub async fn set(&self, key: SettingKey, value: &str) -> Result<()> {
        self.repo.set_global_setting(key, value).await?;
        tracing::info!("Setting {} updated", key);
        Ok(())
    }

    /// Toggle automatic prepending of active tags to web searches
    pub async fn set_use_search_words(&self, enabled: bool) -> Result<()> {
        self.set(SettingKey::UseSearchWords, &enabled.to_string()).await
    }

    /// Toggle whether notes take part in text search
    pub async fn set_search_in_memo(&self, enabled: bool) -> Result<()> {
        self.set(SettingKey::SearchInMemo, &enabled.to_string()).await
    }

    pub async fn set_dark_mode(&self, mode: DarkMode) -> Result<()> {
        self.set(SettingKey::DarkMode, mode.as_str()).await
    }
}
