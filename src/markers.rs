use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::{Coordinates, CountryCatalog, CountryKey, Resolution};
use crate::data::ActiveCountries;
use crate::style::{style_for, DeviceClass, MarkerStyle};
use crate::timeline::DateSelector;

/// Callback bound to a marker; fires when the user activates it.
pub type ClickHandler = Box<dyn Fn()>;

/// Everything a surface needs to draw one country marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPlacement {
    pub key: CountryKey,
    pub position: Coordinates,
    pub style: MarkerStyle,
    pub events_count: u64,
}

/// Map widget the dashboard draws onto. Markers are opaque handles owned by
/// the caller until handed back to `remove_marker`.
pub trait MapSurface {
    type Marker;

    fn add_marker(&self, placement: &MarkerPlacement, on_click: ClickHandler) -> Self::Marker;

    fn remove_marker(&self, marker: Self::Marker);

    /// Shows or hides (`None`) the warning banner above the map.
    fn show_alert(&self, message: Option<&str>);

    fn sync_dates(&self, options: &[DateSelector], selected: Option<&DateSelector>);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshSummary {
    pub resolved: usize,
    /// Labels that could not be placed on the map, each listed once.
    pub missing: Vec<String>,
    /// Labels the backend flagged as unrecognized.
    pub ignored: Vec<String>,
    /// Records dropped because they were malformed.
    pub rejected: usize,
}

impl RefreshSummary {
    /// Banner text, or `None` when there is nothing to warn about.
    pub fn alert_text(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("⚠️ Countries without coordinates: {}", self.missing.join(", ")));
        }
        if !self.ignored.is_empty() {
            parts.push(format!(
                "⚠️ Countries not recognised by the backend: {}",
                self.ignored.join(", ")
            ));
        }
        if self.rejected > 0 {
            parts.push(format!("⚠️ {} malformed records skipped", self.rejected));
        }
        (!parts.is_empty()).then(|| parts.join(" | "))
    }
}

/// Owns the markers currently on the map, one per canonical country.
pub struct MarkerSetManager<S: MapSurface> {
    surface: S,
    device: DeviceClass,
    index: BTreeMap<CountryKey, S::Marker>,
}

impl<S: MapSurface> MarkerSetManager<S> {
    pub fn new(surface: S, device: DeviceClass) -> Self {
        Self {
            surface,
            device,
            index: BTreeMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CountryKey> {
        self.index.keys()
    }

    pub fn clear(&mut self) {
        for (_, marker) in std::mem::take(&mut self.index) {
            self.surface.remove_marker(marker);
        }
    }

    /// Replaces the whole marker set with `active`. `on_select` builds the
    /// click handler for each country that gets a marker.
    pub fn refresh<F>(
        &mut self,
        active: &ActiveCountries,
        catalog: &CountryCatalog,
        on_select: F,
    ) -> RefreshSummary
    where
        F: Fn(&CountryKey) -> ClickHandler,
    {
        self.clear();

        let mut resolver = catalog.resolver();
        for record in &active.countries {
            let key = match resolver.resolve(&record.country) {
                Resolution::Resolved(key) => key,
                Resolution::Unresolved => continue,
            };
            if self.index.contains_key(&key) {
                debug!("{:?} collapses onto existing marker {}", record.country, key);
                continue;
            }
            let Some(position) = catalog.coordinates(key.as_str()) else {
                warn!("catalog returned {} without coordinates", key);
                resolver.report_missing(&record.country);
                continue;
            };

            let placement = MarkerPlacement {
                style: style_for(record.events_count, self.device),
                events_count: record.events_count,
                position,
                key,
            };
            let marker = self.surface.add_marker(&placement, on_select(&placement.key));
            self.index.insert(placement.key, marker);
        }

        RefreshSummary {
            resolved: self.index.len(),
            missing: resolver.into_missing(),
            ignored: active.ignored.clone(),
            rejected: active.rejected.len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    /// Records what was drawn. Clones share state.
    #[derive(Clone, Default)]
    pub struct RecordingMap {
        pub live: Rc<RefCell<Vec<(u32, MarkerPlacement)>>>,
        pub clicks: Rc<RefCell<Vec<(CountryKey, ClickHandler)>>>,
        pub alert: Rc<RefCell<Option<String>>>,
        pub selector: Rc<RefCell<(Vec<DateSelector>, Option<DateSelector>)>>,
        next_id: Rc<Cell<u32>>,
    }

    impl RecordingMap {
        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<_> = self
                .live
                .borrow()
                .iter()
                .map(|(_, p)| p.key.to_string())
                .collect();
            keys.sort();
            keys
        }

        pub fn click(&self, key: &str) {
            let clicks = self.clicks.borrow();
            let (_, handler) = clicks
                .iter()
                .rev()
                .find(|(k, _)| k.as_str() == key)
                .expect("no marker for key");
            handler();
        }
    }

    impl MapSurface for RecordingMap {
        type Marker = u32;

        fn add_marker(&self, placement: &MarkerPlacement, on_click: ClickHandler) -> u32 {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.live.borrow_mut().push((id, placement.clone()));
            self.clicks.borrow_mut().push((placement.key.clone(), on_click));
            id
        }

        fn remove_marker(&self, marker: u32) {
            self.live.borrow_mut().retain(|(id, _)| *id != marker);
        }

        fn show_alert(&self, message: Option<&str>) {
            *self.alert.borrow_mut() = message.map(str::to_string);
        }

        fn sync_dates(&self, options: &[DateSelector], selected: Option<&DateSelector>) {
            *self.selector.borrow_mut() = (options.to_vec(), selected.cloned());
        }
    }
}
