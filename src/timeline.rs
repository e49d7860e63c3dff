use std::fmt;

use tracing::debug;

use crate::catalog::CountryKey;
use crate::data::ALL_DATES;

/// Value of either date selector: the "all dates" sentinel or one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateSelector {
    All,
    Day(String),
}

impl DateSelector {
    pub fn parse(value: &str) -> Self {
        if value == ALL_DATES {
            DateSelector::All
        } else {
            DateSelector::Day(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DateSelector::All => ALL_DATES,
            DateSelector::Day(day) => day,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DateSelector::All)
    }
}

impl fmt::Display for DateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOrigin {
    Global,
    Panel,
}

/// Re-fetches owed after a user picked a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateChange {
    pub date: DateSelector,
    pub origin: SelectorOrigin,
    /// Country whose feed must be reloaded, if one is selected.
    pub feed: Option<CountryKey>,
}

/// Result of aligning the panel selector with a loaded feed's own date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedDateSync {
    pub changed: bool,
    /// Index in [`TimelineStore::dates`] where the date was inserted.
    pub inserted_at: Option<usize>,
}

/// Date filter state for one session.
///
/// Both selectors observe a single current date. The panel may additionally
/// show the concrete date of an aggregate feed it is displaying; that display
/// value is dropped as soon as the user picks a date in either selector or
/// opens another country.
#[derive(Debug, Default)]
pub struct TimelineStore {
    dates: Vec<String>,
    current: Option<DateSelector>,
    panel_display: Option<DateSelector>,
    selected_country: Option<CountryKey>,
}

impl TimelineStore {
    /// An empty store with no date selected.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dates(dates: Vec<String>) -> Self {
        let mut store = Self::new();
        store.load(dates);
        store
    }

    /// Installs the available dates and resets both selectors to ALL.
    pub fn load(&mut self, dates: Vec<String>) {
        self.dates = dates;
        self.current = Some(DateSelector::All);
        self.panel_display = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Selector entries in display order: ALL first, then the dates.
    pub fn options(&self) -> Vec<DateSelector> {
        std::iter::once(DateSelector::All)
            .chain(self.dates.iter().cloned().map(DateSelector::Day))
            .collect()
    }

    pub fn global_date(&self) -> Option<&DateSelector> {
        self.current.as_ref()
    }

    pub fn panel_date(&self) -> Option<&DateSelector> {
        self.panel_display.as_ref().or(self.current.as_ref())
    }

    pub fn selected_country(&self) -> Option<&CountryKey> {
        self.selected_country.as_ref()
    }

    pub fn set_global_date(&mut self, date: DateSelector) -> DateChange {
        self.select(date, SelectorOrigin::Global)
    }

    pub fn set_panel_date(&mut self, date: DateSelector) -> DateChange {
        self.select(date, SelectorOrigin::Panel)
    }

    fn select(&mut self, date: DateSelector, origin: SelectorOrigin) -> DateChange {
        debug!("date selected from {:?} selector: {}", origin, date);
        self.current = Some(date.clone());
        self.panel_display = None;
        DateChange {
            date,
            origin,
            feed: self.selected_country.clone(),
        }
    }

    /// Marks `country` as selected and seeds the panel with the map's date.
    pub fn open_country(&mut self, country: CountryKey) -> Option<&DateSelector> {
        self.selected_country = Some(country);
        self.panel_display = None;
        self.panel_date()
    }

    /// Points the panel selector at the date a feed reports for itself,
    /// adding it right after ALL when the list does not have it yet. The
    /// insertion is positional, not date-sorted.
    pub fn sync_panel_to_feed(&mut self, feed_date: &str) -> FeedDateSync {
        let shown = DateSelector::parse(feed_date);
        if self.panel_date() == Some(&shown) {
            return FeedDateSync::default();
        }

        let inserted_at = match &shown {
            DateSelector::Day(day) if !self.dates.iter().any(|d| d == day) => {
                self.dates.insert(0, day.clone());
                Some(0)
            }
            _ => None,
        };
        self.panel_display = Some(shown);

        FeedDateSync {
            changed: true,
            inserted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(d: &str) -> DateSelector {
        DateSelector::Day(d.to_string())
    }

    fn store() -> TimelineStore {
        TimelineStore::with_dates(vec!["2024-01-02".into(), "2024-01-01".into()])
    }

    #[test]
    fn unloaded_store_has_no_dates_selected() {
        let store = TimelineStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.global_date(), None);
        assert_eq!(store.panel_date(), None);
    }

    #[test]
    fn both_selectors_default_to_all() {
        let store = store();
        assert_eq!(store.global_date(), Some(&DateSelector::All));
        assert_eq!(store.panel_date(), Some(&DateSelector::All));
        assert_eq!(
            store.options(),
            vec![DateSelector::All, day("2024-01-02"), day("2024-01-01")]
        );
    }

    #[test]
    fn global_change_propagates_to_panel() {
        let mut store = store();
        let change = store.set_global_date(day("2024-01-01"));
        assert_eq!(store.panel_date(), Some(&day("2024-01-01")));
        assert_eq!(change.origin, SelectorOrigin::Global);
        assert_eq!(change.feed, None);

        store.set_panel_date(DateSelector::All);
        assert_eq!(store.global_date(), Some(&DateSelector::All));
    }

    #[test]
    fn date_change_reports_selected_country() {
        let mut store = store();
        store.open_country(CountryKey::new("🇫🇷 France"));
        let change = store.set_panel_date(day("2024-01-02"));
        assert_eq!(change.feed, Some(CountryKey::new("🇫🇷 France")));
        assert_eq!(change.date, day("2024-01-02"));
        // Selection survives date changes.
        store.set_global_date(DateSelector::All);
        assert_eq!(store.selected_country(), Some(&CountryKey::new("🇫🇷 France")));
    }

    #[test]
    fn opening_country_seeds_panel_with_global_date() {
        let mut store = store();
        store.set_global_date(day("2024-01-02"));
        let seeded = store.open_country(CountryKey::new("🇲🇱 Mali")).cloned();
        assert_eq!(seeded, Some(day("2024-01-02")));
    }

    #[test]
    fn feed_date_is_inserted_after_all_once() {
        let mut store = store();
        store.open_country(CountryKey::new("🇫🇷 France"));

        let sync = store.sync_panel_to_feed("2023-12-30");
        assert_eq!(
            sync,
            FeedDateSync {
                changed: true,
                inserted_at: Some(0)
            }
        );
        assert_eq!(store.panel_date(), Some(&day("2023-12-30")));
        assert_eq!(store.global_date(), Some(&DateSelector::All));
        assert_eq!(store.dates(), ["2023-12-30", "2024-01-02", "2024-01-01"]);

        assert_eq!(store.sync_panel_to_feed("2023-12-30"), FeedDateSync::default());
        assert_eq!(store.dates().len(), 3);
    }

    #[test]
    fn known_feed_date_only_moves_the_panel() {
        let mut store = store();
        let sync = store.sync_panel_to_feed("2024-01-01");
        assert_eq!(sync.inserted_at, None);
        assert!(sync.changed);
        assert_eq!(store.dates().len(), 2);
    }

    #[test]
    fn user_choice_clears_feed_display_date() {
        let mut store = store();
        store.sync_panel_to_feed("2024-01-01");
        store.set_global_date(DateSelector::All);
        assert_eq!(store.panel_date(), Some(&DateSelector::All));

        store.sync_panel_to_feed("2024-01-01");
        store.open_country(CountryKey::new("🇲🇱 Mali"));
        assert_eq!(store.panel_date(), Some(&DateSelector::All));
    }
}
