//! Wiring of client, storage and renderer from the loaded configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use teamup_core::Config;

use crate::cache::{Freshness, ScheduleCache};
use crate::client::TeamupClient;
use crate::db::Database;
use crate::error::TeamupError;
use crate::options::SqliteOptions;
use crate::render::Renderer;
use crate::shortcode::{ShortcodeError, TemplateTag};
use crate::store::EventStore;
use crate::types::EventRecord;

/// Schema version recorded next to the events table.
pub const DB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The schedule as the host page sees it: one handle that answers template
/// tags from the weekly cache.
pub struct TeamupService {
    renderer: Renderer<TeamupClient>,
}

impl TeamupService {
    /// Open the database, create missing tables and run the version check.
    pub fn open(config: &Config) -> Result<Self> {
        let database = Database::open(&config.storage.database_path).with_context(|| {
            format!(
                "Failed to open schedule database at {}",
                config.storage.database_path.display()
            )
        })?;
        Self::with_database(config, database)
    }

    /// Same as [`TeamupService::open`] on a caller-provided database.
    pub fn with_database(config: &Config, database: Database) -> Result<Self> {
        let client = TeamupClient::new(
            &config.teamup.api_key,
            &config.teamup.base_url,
            Duration::from_secs(config.teamup.timeout_secs),
        )
        .context("Failed to build Teamup HTTP client")?;

        let store = EventStore::new(database.clone())?;
        let options = Arc::new(SqliteOptions::new(database)?);
        let cache = ScheduleCache::new(client, &config.teamup.calendar_id, store, options);

        if cache.check_database(DB_VERSION)? {
            tracing::info!(version = DB_VERSION, "Schedule table recreated for new version");
        }

        Ok(Self {
            renderer: Renderer::new(cache),
        })
    }

    pub fn renderer(&self) -> &Renderer<TeamupClient> {
        &self.renderer
    }

    /// Render the HTML for a template tag.
    pub async fn handle(&self, tag: &TemplateTag) -> String {
        self.renderer.render(tag).await
    }

    /// Parse tag text and render it.
    pub async fn handle_text(&self, text: &str) -> Result<String, ShortcodeError> {
        let tag = TemplateTag::parse(text)?;
        Ok(self.handle(&tag).await)
    }

    pub async fn ensure_fresh(&self) -> Freshness {
        self.renderer.cache().ensure_fresh().await
    }

    /// Refetch the current week even if the snapshot is fresh.
    pub async fn refresh_now(&self) -> Result<usize, TeamupError> {
        self.renderer
            .cache()
            .refresh_on(Local::now().date_naive())
            .await
    }

    /// The cached events after a freshness check.
    pub async fn events(&self) -> Result<Vec<EventRecord>> {
        self.ensure_fresh().await;
        Ok(self.renderer.cache().store().query_all()?)
    }

    /// Drop the events table and every stored option.
    pub fn uninstall(self) -> Result<()> {
        self.renderer.cache().uninstall()?;
        Ok(())
    }
}
