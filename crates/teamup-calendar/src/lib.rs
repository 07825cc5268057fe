//! Teamup weekly schedule for the `[teamup]` template tag.
//!
//! Fetches the current week's recurring events from the Teamup API at most
//! once per calendar week, keeps them in SQLite and renders them as HTML.

pub mod cache;
pub mod client;
pub mod db;
pub mod error;
pub mod notes;
pub mod options;
pub mod render;
pub mod service;
pub mod shortcode;
pub mod store;
pub mod types;
pub mod week;

pub use cache::{Freshness, ScheduleCache};
pub use client::{CalendarSource, TeamupClient};
pub use db::{Database, StoreResult};
pub use error::TeamupError;
pub use options::{OptionStore, SqliteOptions, DB_VERSION_KEY, LAST_FETCH_KEY};
pub use render::Renderer;
pub use service::TeamupService;
pub use shortcode::{ShortcodeError, TemplateTag};
pub use store::EventStore;
pub use types::{ApiEvent, EventRecord, NewEvent};
