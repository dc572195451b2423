//! Application configuration constants
//!
//! Central location for file names, seed data, setting defaults
//! and the web-search endpoint used throughout the application.

// ===== Storage =====

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE_NAME: &str = "idmanager.db";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "IDMANAGER_DATA_DIR";

/// Sub-directory created under the platform data dir
pub const APP_DIR_NAME: &str = "idmanager";

/// Fallback data directory when the platform has none
pub const FALLBACK_DATA_DIR: &str = "idmanager-data";

// ===== Tags =====

/// Word of the tag seeded into an empty tag table
pub const DEFAULT_TAG_WORD: &str = "ID";

/// Accent color assigned to tags created without an explicit color
pub const DEFAULT_TAG_COLOR: &str = "#007AFF";

// ===== Global Settings Defaults =====

/// Active tags are prepended to every web search
pub const DEFAULT_USE_SEARCH_WORDS: bool = true;

/// Notes take part in local text filtering
pub const DEFAULT_SEARCH_IN_MEMO: bool = true;

// ===== Web Search =====

/// Search engine endpoint used when the platform cannot open the query directly.
/// The composed query is appended as the percent-encoded `q` parameter.
pub const WEB_SEARCH_URL: &str = "https://www.google.com/search";
