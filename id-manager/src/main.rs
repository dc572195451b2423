// ID manager - headless bootstrap
// Opens (and migrates) the local database and reports what it holds.

use anyhow::Context;
use idmanager::app;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idmanager=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ID manager");

    let data_dir = app::resolve_data_dir();
    let state = app::setup(data_dir.clone())
        .await
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    let items = state.items_service.list_items().await?;
    let tags = state.tags_service.list_tags().await?;
    let settings = state.settings_service.load().await?;

    tracing::info!(
        "Ready: {} items, {} tags, search words {}, memo search {}, display {}",
        items.len(),
        tags.len(),
        if settings.use_search_words { "on" } else { "off" },
        if settings.search_in_memo { "on" } else { "off" },
        settings.dark_mode
    );

    Ok(())
}
