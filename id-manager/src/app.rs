//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{APP_DIR_NAME, DATABASE_FILE_NAME, DATA_DIR_ENV, FALLBACK_DATA_DIR};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{ItemsService, SearchService, SettingsService, TagsService};
use std::path::PathBuf;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub items_service: ItemsService,
    pub tags_service: TagsService,
    pub settings_service: SettingsService,
    pub search_service: SearchService,
}

impl AppState {
    pub fn new(app_data_dir: PathBuf, repo: Repository) -> Self {
        let settings_service = SettingsService::new(repo.clone());

        Self {
            app_data_dir,
            items_service: ItemsService::new(repo.clone(), settings_service.clone()),
            tags_service: TagsService::new(repo.clone()),
            search_service: SearchService::new(repo, settings_service.clone()),
            settings_service,
        }
    }
}

/// Resolve the data directory: environment override, platform data dir, then a local fallback
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

/// Application setup - called once on startup.
///
/// The schema is fully migrated before the returned state can issue any query.
pub async fn setup(app_data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    std::fs::create_dir_all(&app_data_dir)?;

    let pool = create_pool(&app_data_dir.join(DATABASE_FILE_NAME)).await?;
    let state = AppState::new(app_data_dir, Repository::new(pool));

    tracing::info!("Application initialized successfully");

    Ok(state)
}
