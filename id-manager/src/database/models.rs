//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to a frontend; column names on
//! disk are camelCase, so rows and JSON share the same field names.

use crate::config::{DEFAULT_SEARCH_IN_MEMO, DEFAULT_USE_SEARCH_WORDS};
use crate::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Render a timestamp the way it is stored: RFC 3339, UTC, millisecond precision.
///
/// The fixed width keeps lexical `ORDER BY` equal to chronological order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A stored identifier with optional notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub notes: Option<String>,
    /// Manual position; lower sorts first, `None` sorts last
    pub sort_order: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ids of every tag attached to this item, ascending
    #[sqlx(skip)]
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl Item {
    /// Case-insensitive substring match against the title and, optionally, the notes.
    ///
    /// A blank query matches every item.
    pub fn matches_text(&self, query: &str, include_notes: bool) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        if self.title.to_lowercase().contains(&needle) {
            return true;
        }

        include_notes
            && self
                .notes
                .as_deref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle))
    }

    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tag_ids.contains(&tag_id)
    }
}

/// Create item request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Update item request; `tag_ids` replaces the full tag set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// A colored keyword ("search word") that can be attached to items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub word: String,
    /// Hex color, e.g. `#FF6B6B`
    pub color: String,
    /// Whether the tag joins the global search prefix
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create tag request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub word: String,
    /// Defaults to the accent color
    #[serde(default)]
    pub color: Option<String>,
}

/// Client-side list filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemFilter {
    pub text: String,
    /// The item must carry every one of these tags
    pub tag_ids: Vec<i64>,
    /// Defaults to the `searchInMemo` default
    pub include_notes: bool,
}

impl Default for ItemFilter {
    fn default() -> Self {
        Self {
            text: String::new(),
            tag_ids: Vec::new(),
            include_notes: DEFAULT_SEARCH_IN_MEMO,
        }
    }
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        item.matches_text(&self.text, self.include_notes)
            && self.tag_ids.iter().all(|id| item.has_tag(*id))
    }
}

/// Display mode preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DarkMode {
    #[default]
    System,
    Light,
    Dark,
}

impl DarkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DarkMode::System => "system",
            DarkMode::Light => "light",
            DarkMode::Dark => "dark",
        }
    }
}

impl fmt::Display for DarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DarkMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "system" => Ok(DarkMode::System),
            "light" => Ok(DarkMode::Light),
            "dark" => Ok(DarkMode::Dark),
            other => Err(AppError::InvalidSetting {
                key: SettingKey::DarkMode.as_str().to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Keys of the global settings map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    UseSearchWords,
    SearchInMemo,
    DarkMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [
        SettingKey::UseSearchWords,
        SettingKey::SearchInMemo,
        SettingKey::DarkMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::UseSearchWords => "useSearchWords",
            SettingKey::SearchInMemo => "searchInMemo",
            SettingKey::DarkMode => "darkMode",
        }
    }

    /// Stored form of the documented default
    pub fn default_value(&self) -> String {
        let defaults = GlobalSettings::default();
        match self {
            SettingKey::UseSearchWords => defaults.use_search_words.to_string(),
            SettingKey::SearchInMemo => defaults.search_in_memo.to_string(),
            SettingKey::DarkMode => defaults.dark_mode.to_string(),
        }
    }

    /// Check that `value` coerces for this key and return its canonical stored form
    pub fn normalize(&self, value: &str) -> Result<String, AppError> {
        match self {
            SettingKey::UseSearchWords | SettingKey::SearchInMemo => parse_flag(value)
                .map(|flag| flag.to_string())
                .ok_or_else(|| AppError::InvalidSetting {
                    key: self.as_str().to_string(),
                    value: value.to_string(),
                }),
            SettingKey::DarkMode => value.parse::<DarkMode>().map(|mode| mode.to_string()),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| AppError::Generic(format!("Unknown setting key: {}", s)))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Process-wide search and display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub use_search_words: bool,
    pub search_in_memo: bool,
    pub dark_mode: DarkMode,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            use_search_words: DEFAULT_USE_SEARCH_WORDS,
            search_in_memo: DEFAULT_SEARCH_IN_MEMO,
            dark_mode: DarkMode::System,
        }
    }
}

impl GlobalSettings {
    /// Build settings from stored key/value rows.
    ///
    /// Missing keys and values that do not coerce keep their default.
    pub fn from_stored<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Self::default();

        for (key, value) in rows {
            let Ok(key) = key.parse::<SettingKey>() else {
                continue;
            };

            match key {
                SettingKey::UseSearchWords => match parse_flag(&value) {
                    Some(flag) => settings.use_search_words = flag,
                    None => tracing::warn!("Ignoring stored {} = {:?}", key, value),
                },
                SettingKey::SearchInMemo => match parse_flag(&value) {
                    Some(flag) => settings.search_in_memo = flag,
                    None => tracing::warn!("Ignoring stored {} = {:?}", key, value),
                },
                SettingKey::DarkMode => match value.parse::<DarkMode>() {
                    Ok(mode) => settings.dark_mode = mode,
                    Err(_) => tracing::warn!("Ignoring stored {} = {:?}", key, value),
                },
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, notes: Option<&str>, tag_ids: Vec<i64>) -> Item {
        let now = Utc::now();
        Item {
            id: 1,
            title: title.to_string(),
            notes: notes.map(str::to_string),
            sort_order: Some(0),
            created_at: now,
            updated_at: now,
            tag_ids,
        }
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(timestamp(at), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn test_item_serializes_with_stored_field_names() {
        let it = item("1234567", Some("memo"), vec![3]);

        let json = serde_json::to_value(&it).unwrap();
        assert_eq!(json["sortOrder"], 0);
        assert_eq!(json["tagIds"], serde_json::json!([3]));
        assert_eq!(json["notes"], "memo");

        let settings = serde_json::to_value(GlobalSettings::default()).unwrap();
        assert_eq!(
            settings,
            serde_json::json!({
                "useSearchWords": true,
                "searchInMemo": true,
                "darkMode": "system"
            })
        );
    }

    #[test]
    fn test_error_serializes_as_message() {
        let json = serde_json::to_string(&AppError::ItemNotFound(7)).unwrap();
        assert_eq!(json, "\"Item not found: 7\"");
    }

    #[test]
    fn test_matches_text_is_case_insensitive() {
        let it = item("AbC-123", Some("Puppy Video"), vec![]);

        assert!(it.matches_text("abc", false));
        assert!(it.matches_text("PUPPY", true));
        assert!(!it.matches_text("puppy", false));
        assert!(it.matches_text("   ", false));
    }

    #[test]
    fn test_filter_requires_every_tag() {
        let it = item("1234567", None, vec![1, 2]);

        let filter = ItemFilter {
            text: "234".to_string(),
            tag_ids: vec![1, 2],
            include_notes: true,
        };
        assert!(filter.matches(&it));

        let filter = ItemFilter {
            tag_ids: vec![1, 3],
            ..ItemFilter::default()
        };
        assert!(!filter.matches(&it));
    }

    #[test]
    fn test_filter_default_searches_notes() {
        let it = item("1234567", Some("Puppy video"), vec![]);

        let filter = ItemFilter {
            text: "puppy".to_string(),
            ..ItemFilter::default()
        };
        assert!(filter.include_notes);
        assert!(filter.matches(&it));

        let parsed: ItemFilter = serde_json::from_str(r#"{"text":"puppy"}"#).unwrap();
        assert!(parsed.include_notes);
        assert_eq!(parsed.include_notes, GlobalSettings::default().search_in_memo);
    }

    #[test]
    fn test_settings_from_stored_coerces_values() {
        let settings = GlobalSettings::from_stored(vec![
            ("useSearchWords".to_string(), "0".to_string()),
            ("searchInMemo".to_string(), "false".to_string()),
            ("darkMode".to_string(), "dark".to_string()),
        ]);

        assert!(!settings.use_search_words);
        assert!(!settings.search_in_memo);
        assert_eq!(settings.dark_mode, DarkMode::Dark);
    }

    #[test]
    fn test_settings_from_stored_falls_back_to_defaults() {
        let settings = GlobalSettings::from_stored(vec![
            ("useSearchWords".to_string(), "maybe".to_string()),
            ("darkMode".to_string(), "sepia".to_string()),
            ("unrelated".to_string(), "x".to_string()),
        ]);

        assert_eq!(settings, GlobalSettings::default());
    }

    #[test]
    fn test_setting_key_normalize() {
        assert_eq!(SettingKey::SearchInMemo.normalize("1").unwrap(), "true");
        assert_eq!(SettingKey::DarkMode.normalize("light").unwrap(), "light");
        assert!(SettingKey::UseSearchWords.normalize("yes").is_err());
        assert!(SettingKey::DarkMode.normalize("blue").is_err());
    }
}
