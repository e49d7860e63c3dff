//! Country event dashboard: resolves backend country labels against a
//! geocoding table, keeps the map markers and the country panel in step with
//! the selected date, and loads per-country event feeds.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod feed;
pub mod gate;
pub mod markers;
pub mod source;
pub mod style;
pub mod timeline;

pub use catalog::{CountryCatalog, CountryKey, CountryResolver, Resolution};
pub use config::Settings;
pub use dashboard::{Dashboard, PanelSurface};
pub use error::{ConfigError, FetchError};
pub use feed::{EventFeed, EventFeedLoader, FeedOutcome};
pub use markers::{MapSurface, MarkerSetManager, RefreshSummary};
pub use source::{DataSource, Resource, SiteSource};
pub use style::{DeviceClass, MarkerStyle};
pub use timeline::{DateSelector, TimelineStore};
