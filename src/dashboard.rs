use std::cell::{Ref, RefCell};
use std::rc::Rc;

use futures_util::future::join;
use tracing::{debug, info, warn};

use crate::catalog::{CountryCatalog, CountryKey};
use crate::error::FetchError;
use crate::feed::{EventFeedLoader, FeedOutcome};
use crate::gate::RequestGate;
use crate::markers::{MapSurface, MarkerSetManager};
use crate::source::DataSource;
use crate::style::DeviceClass;
use crate::timeline::{DateChange, DateSelector, TimelineStore};

/// Country detail panel. The dashboard only hands it data.
pub trait PanelSurface {
    fn open(&self, country: &CountryKey);

    fn close(&self);

    fn show_loading(&self);

    fn render(&self, outcome: &FeedOutcome);

    fn sync_dates(&self, options: &[DateSelector], selected: Option<&DateSelector>);
}

/// Invoked with the canonical key of a clicked marker.
pub type SelectHandler = Rc<dyn Fn(CountryKey)>;

/// Session state shared by the map and the panel.
pub struct Dashboard<S, M: MapSurface, P> {
    source: S,
    catalog: CountryCatalog,
    timeline: RefCell<TimelineStore>,
    markers: RefCell<MarkerSetManager<M>>,
    panel: P,
    marker_gate: RequestGate,
    feed_gate: RequestGate,
    // Read at click time, so markers drawn before a handler is installed
    // still reach it.
    select_handler: Rc<RefCell<Option<SelectHandler>>>,
}

impl<S, M, P> Dashboard<S, M, P>
where
    S: DataSource,
    M: MapSurface,
    P: PanelSurface,
{
    pub fn new(source: S, catalog: CountryCatalog, map: M, panel: P, device: DeviceClass) -> Self {
        Self {
            source,
            catalog,
            timeline: RefCell::new(TimelineStore::new()),
            markers: RefCell::new(MarkerSetManager::new(map, device)),
            panel,
            marker_gate: RequestGate::new(),
            feed_gate: RequestGate::new(),
            select_handler: Rc::new(RefCell::new(None)),
        }
    }

    /// Loads the catalog and the date list, then draws the first marker set.
    /// Only a missing or unreadable catalog is fatal.
    pub async fn bootstrap(source: S, map: M, panel: P, device: DeviceClass) -> Result<Self, FetchError> {
        let dashboard = Self::open(source, map, panel, device).await?;
        dashboard.load_timeline().await;
        Ok(dashboard)
    }

    /// Loads only the catalog. The selectors stay untouched until
    /// [`load_timeline`](Self::load_timeline), so callers can install their
    /// handlers first.
    pub async fn open(source: S, map: M, panel: P, device: DeviceClass) -> Result<Self, FetchError> {
        let catalog = source.catalog().await?;
        info!("Country catalog loaded: {} countries", catalog.len());
        Ok(Self::new(source, catalog, map, panel, device))
    }

    /// Loads the date list, fills both selectors and draws the first marker
    /// set. A failed date fetch leaves only ALL.
    pub async fn load_timeline(&self) {
        let dates = match self.source.dates().await {
            Ok(dates) => dates,
            Err(e) => {
                warn!("Failed to load available dates: {}", e);
                Vec::new()
            }
        };
        self.timeline.borrow_mut().load(dates);
        self.sync_selectors();
        self.refresh_markers().await;
    }

    pub fn set_select_handler(&self, handler: SelectHandler) {
        *self.select_handler.borrow_mut() = Some(handler);
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn catalog(&self) -> &CountryCatalog {
        &self.catalog
    }

    pub fn timeline(&self) -> Ref<'_, TimelineStore> {
        self.timeline.borrow()
    }

    pub fn markers(&self) -> Ref<'_, MarkerSetManager<M>> {
        self.markers.borrow()
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub async fn select_global_date(&self, date: DateSelector) {
        let change = self.timeline.borrow_mut().set_global_date(date);
        self.apply_date_change(change).await;
    }

    pub async fn select_panel_date(&self, date: DateSelector) {
        let change = self.timeline.borrow_mut().set_panel_date(date);
        self.apply_date_change(change).await;
    }

    async fn apply_date_change(&self, change: DateChange) {
        info!("Date set to {} from {:?} selector", change.date, change.origin);
        self.sync_selectors();

        let feed = async {
            if change.feed.is_some() {
                self.reload_feed().await;
            }
        };
        join(self.refresh_markers(), feed).await;
    }

    pub async fn open_country(&self, country: CountryKey) {
        info!("Opening panel for {}", country);
        self.timeline.borrow_mut().open_country(country.clone());
        self.panel.open(&country);
        self.sync_selectors();
        self.reload_feed().await;
    }

    /// Hides the panel. The selected country is kept, so later date changes
    /// still refresh its feed.
    pub fn close_panel(&self) {
        self.panel.close();
    }

    /// Replaces the marker set with the active countries for the current
    /// global date. On failure the previous markers stay up.
    pub async fn refresh_markers(&self) {
        let date = self.timeline.borrow().global_date().cloned();
        let Some(date) = date else {
            debug!("No date selected yet, skipping marker refresh");
            return;
        };

        let ticket = self.marker_gate.issue();
        let result = self.source.active_countries(&date).await;
        if !self.marker_gate.is_current(ticket) {
            debug!("Dropping superseded active-country set for {}", date);
            return;
        }

        match result {
            Ok(active) => {
                let handler = self.select_handler.clone();
                let mut markers = self.markers.borrow_mut();
                let summary = markers.refresh(&active, &self.catalog, |key| {
                    let handler = handler.clone();
                    let key = key.clone();
                    Box::new(move || {
                        let select = handler.borrow().clone();
                        match select {
                            Some(select) => select(key.clone()),
                            None => debug!("Marker {} clicked before a handler was set", key),
                        }
                    })
                });
                info!(
                    "{} countries on the map for {} ({} unplaced, {} ignored)",
                    summary.resolved,
                    date,
                    summary.missing.len(),
                    summary.ignored.len()
                );
                markers.surface().show_alert(summary.alert_text().as_deref());
            }
            Err(e) => {
                warn!("Failed to load active countries for {}: {}", date, e);
                let message = format!("⚠️ Could not load active countries: {e}");
                self.markers.borrow().surface().show_alert(Some(&message));
            }
        }
    }

    /// Loads the selected country's feed for the current panel date.
    pub async fn reload_feed(&self) {
        let (country, date) = {
            let timeline = self.timeline.borrow();
            (
                timeline.selected_country().cloned(),
                timeline.panel_date().cloned(),
            )
        };
        let Some(country) = country else {
            return;
        };

        let ticket = self.feed_gate.issue();
        self.panel.show_loading();
        let outcome = EventFeedLoader::new(&self.source)
            .load(&country, date.as_ref())
            .await;
        if !self.feed_gate.is_current(ticket) {
            debug!("Dropping superseded feed for {}", country);
            return;
        }

        if let FeedOutcome::Loaded(feed) = &outcome {
            if let Some(feed_date) = feed.date.as_deref() {
                let sync = self.timeline.borrow_mut().sync_panel_to_feed(feed_date);
                if sync.inserted_at.is_some() {
                    info!("Added {} to the date list", feed_date);
                }
                if sync.changed {
                    self.sync_selectors();
                }
            }
        }
        self.panel.render(&outcome);
    }

    fn sync_selectors(&self) {
        let (options, global, panel) = {
            let timeline = self.timeline.borrow();
            (
                timeline.options(),
                timeline.global_date().cloned(),
                timeline.panel_date().cloned(),
            )
        };
        self.markers
            .borrow()
            .surface()
            .sync_dates(&options, global.as_ref());
        self.panel.sync_dates(&options, panel.as_ref());
    }
}
