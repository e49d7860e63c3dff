use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::CountryKey;
use crate::data::{is_day, SchemaIssue, ALL_DATES};
use crate::source::DataSource;
use crate::timeline::DateSelector;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct EventMessage {
    pub id: i64,
    #[serde(default)]
    pub telegram_message_id: Option<i64>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub event_timestamp: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl EventMessage {
    pub fn display_title(&self) -> &str {
        non_blank(&self.title).unwrap_or("(Untitled)")
    }

    pub fn body(&self) -> &str {
        non_blank(&self.translated_text)
            .or(non_blank(&self.preview))
            .unwrap_or("")
    }

    /// Source name followed by the orientation tag, if any.
    pub fn attribution(&self) -> String {
        let source = self.source.as_deref().unwrap_or("");
        match non_blank(&self.orientation) {
            Some(orientation) => format!("{source} • {orientation}"),
            None => source.to_string(),
        }
    }

    pub fn link_label(&self) -> Option<String> {
        self.url.as_ref()?;
        Some(match self.telegram_message_id {
            Some(id) => format!("post #{id}"),
            None => "open post".to_string(),
        })
    }

    /// Event time, falling back to ingestion time, rendered in `tz`.
    pub fn display_time(&self, tz: &Tz) -> Option<String> {
        let raw = non_blank(&self.event_timestamp).or(non_blank(&self.created_at))?;
        let utc = parse_timestamp(raw)?;
        Some(utc.with_timezone(tz).format("%Y-%m-%d %H:%M %Z").to_string())
    }
}

/// Accepts RFC 3339 and the offset-less ISO form the site builder writes
/// (interpreted as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Zone {
    pub region: Option<String>,
    pub location: Option<String>,
    pub messages_count: usize,
    pub messages: Vec<EventMessage>,
}

impl Zone {
    pub fn header(&self) -> String {
        let parts: Vec<&str> = [non_blank(&self.region), non_blank(&self.location)]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            "Unknown zone".to_string()
        } else {
            parts.join(" – ")
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawZone {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    messages_count: usize,
    #[serde(default)]
    messages: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawEventFeed {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    zones: Vec<Value>,
}

/// One `events/{date}/{country}.json` document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventFeed {
    /// Date the feed reports for itself. Aggregate feeds carry their latest day.
    pub date: Option<String>,
    pub country: Option<String>,
    pub zones: Vec<Zone>,
    pub rejected: Vec<SchemaIssue>,
}

impl EventFeed {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawEventFeed = serde_json::from_slice(bytes)?;
        let mut feed = EventFeed {
            country: raw.country,
            ..Default::default()
        };

        // The date ends up in the selectors and in resource paths.
        feed.date = match raw.date {
            Some(date) if date == ALL_DATES || is_day(&date) => Some(date),
            Some(date) => {
                feed.rejected
                    .push(SchemaIssue::new("date", format!("not a date: {date:?}")));
                None
            }
            None => None,
        };

        for (z, value) in raw.zones.into_iter().enumerate() {
            let raw_zone = match serde_json::from_value::<RawZone>(value) {
                Ok(raw_zone) => raw_zone,
                Err(e) => {
                    feed.rejected
                        .push(SchemaIssue::new(format!("zones[{z}]"), e.to_string()));
                    continue;
                }
            };

            let mut zone = Zone {
                region: raw_zone.region,
                location: raw_zone.location,
                messages_count: raw_zone.messages_count,
                messages: Vec::with_capacity(raw_zone.messages.len()),
            };
            for (m, value) in raw_zone.messages.into_iter().enumerate() {
                match serde_json::from_value::<EventMessage>(value) {
                    Ok(message) => zone.messages.push(message),
                    Err(e) => feed.rejected.push(SchemaIssue::new(
                        format!("zones[{z}].messages[{m}]"),
                        e.to_string(),
                    )),
                }
            }
            feed.zones.push(zone);
        }
        Ok(feed)
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn total_messages(&self) -> usize {
        self.zones.iter().map(|z| z.messages_count).sum()
    }

    /// Warning line for records that were dropped while parsing.
    pub fn rejection_note(&self) -> Option<String> {
        (!self.rejected.is_empty())
            .then(|| format!("⚠️ {} malformed records skipped", self.rejected.len()))
    }
}

/// What the panel should show for a (country, date) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Loaded(EventFeed),
    NoDateSelected,
    NotFound(DateSelector),
    Failed(String),
}

impl FeedOutcome {
    /// Inline text for outcomes that have no feed to render.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            FeedOutcome::Loaded(feed) if feed.is_empty() && feed.rejected.is_empty() => {
                Some("No events.")
            }
            FeedOutcome::Loaded(feed) if feed.is_empty() => Some("No events could be shown."),
            FeedOutcome::Loaded(_) => None,
            FeedOutcome::NoDateSelected => Some("No date selected."),
            FeedOutcome::NotFound(DateSelector::All) => Some("No events for this country."),
            FeedOutcome::NotFound(DateSelector::Day(_)) => Some("No events for this date."),
            FeedOutcome::Failed(_) => Some("Could not load events."),
        }
    }

    /// Status line for the panel: the message above plus any rejection
    /// warning from a loaded feed.
    pub fn status_text(&self) -> Option<String> {
        let note = match self {
            FeedOutcome::Loaded(feed) => feed.rejection_note(),
            _ => None,
        };
        match (self.message(), note) {
            (Some(message), Some(note)) => Some(format!("{message} {note}")),
            (Some(message), None) => Some(message.to_string()),
            (None, note) => note,
        }
    }
}

/// Picks the feed document for a country and classifies the answer.
pub struct EventFeedLoader<'s, S> {
    source: &'s S,
}

impl<'s, S: DataSource> EventFeedLoader<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self { source }
    }

    pub async fn load(&self, country: &CountryKey, panel_date: Option<&DateSelector>) -> FeedOutcome {
        let Some(date) = panel_date else {
            return FeedOutcome::NoDateSelected;
        };

        match self.source.events(date, country).await {
            Ok(feed) => {
                for issue in &feed.rejected {
                    warn!("feed {} / {}: {} {}", country, date, issue.location, issue.reason);
                }
                debug!("loaded {} zones for {} ({})", feed.zones.len(), country, date);
                FeedOutcome::Loaded(feed)
            }
            Err(e) if e.is_not_found() => FeedOutcome::NotFound(date.clone()),
            Err(e) => {
                warn!("failed to load events for {} ({}): {}", country, date, e);
                FeedOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::MemorySource;
    use pretty_assertions::assert_eq;

    const FRANCE_ALL: &str = "static/data/generated/events/ALL/🇫🇷 France.json";
    const FRANCE_DAY: &str = "static/data/generated/events/2024-01-01/🇫🇷 France.json";

    fn france() -> CountryKey {
        CountryKey::new("🇫🇷 France")
    }

    fn day(d: &str) -> DateSelector {
        DateSelector::Day(d.to_string())
    }

    #[tokio::test]
    async fn unset_date_is_not_fetched() {
        let source = MemorySource::default();
        let outcome = EventFeedLoader::new(&source).load(&france(), None).await;
        assert_eq!(outcome, FeedOutcome::NoDateSelected);
        assert!(source.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn all_routes_to_aggregate_resource() {
        let source = MemorySource::default();
        source.insert(
            FRANCE_ALL,
            r#"{"date": "2024-01-02", "country": "🇫🇷 France", "zones": [
                {"region": "Paris", "location": null, "messages_count": 2, "messages": [
                    {"id": 1, "title": "A"}, {"id": 2}
                ]}
            ]}"#,
        );

        let outcome = EventFeedLoader::new(&source)
            .load(&france(), Some(&DateSelector::All))
            .await;

        let FeedOutcome::Loaded(feed) = outcome else {
            panic!("expected a feed");
        };
        assert_eq!(feed.date.as_deref(), Some("2024-01-02"));
        assert_eq!(feed.total_messages(), 2);
        assert_eq!(feed.zones[0].messages[1].display_title(), "(Untitled)");
        assert_eq!(*source.requests.borrow(), vec![FRANCE_ALL.to_string()]);
    }

    #[tokio::test]
    async fn day_routes_to_dated_resource() {
        let source = MemorySource::default();
        source.insert(FRANCE_DAY, r#"{"date": "2024-01-01", "zones": []}"#);

        let outcome = EventFeedLoader::new(&source)
            .load(&france(), Some(&day("2024-01-01")))
            .await;

        assert!(matches!(&outcome, FeedOutcome::Loaded(feed) if feed.is_empty()));
        assert_eq!(outcome.message(), Some("No events."));
        assert_eq!(*source.requests.borrow(), vec![FRANCE_DAY.to_string()]);
    }

    #[tokio::test]
    async fn not_found_messages_depend_on_scope() {
        let source = MemorySource::default();
        let loader = EventFeedLoader::new(&source);

        let all = loader.load(&france(), Some(&DateSelector::All)).await;
        let dated = loader.load(&france(), Some(&day("2024-01-01"))).await;

        assert_eq!(all, FeedOutcome::NotFound(DateSelector::All));
        assert_eq!(dated, FeedOutcome::NotFound(day("2024-01-01")));
        assert_ne!(all.message(), dated.message());
    }

    #[tokio::test]
    async fn server_errors_are_load_failures() {
        let source = MemorySource::default();
        source.fail(FRANCE_DAY, 503);

        let outcome = EventFeedLoader::new(&source)
            .load(&france(), Some(&day("2024-01-01")))
            .await;

        assert!(matches!(outcome, FeedOutcome::Failed(_)));
        assert_eq!(outcome.message(), Some("Could not load events."));
    }

    #[tokio::test]
    async fn malformed_zone_is_dropped_not_fatal() {
        let source = MemorySource::default();
        source.insert(
            FRANCE_DAY,
            r#"{"date": "2024-01-01", "zones": [{"messages": "oops"}, {"region": "Lyon"}]}"#,
        );

        let outcome = EventFeedLoader::new(&source)
            .load(&france(), Some(&day("2024-01-01")))
            .await;

        let FeedOutcome::Loaded(feed) = outcome else {
            panic!("expected a feed");
        };
        assert_eq!(feed.zones.len(), 1);
        assert_eq!(feed.rejected.len(), 1);
    }

    #[tokio::test]
    async fn bad_message_drops_only_itself() {
        let source = MemorySource::default();
        source.insert(
            FRANCE_DAY,
            r#"{"date": "2024-01-01", "zones": [{"region": "Paris", "messages_count": 2,
                "messages": [{"id": 1, "title": "ok"}, {"title": "no id"}]}]}"#,
        );

        let outcome = EventFeedLoader::new(&source)
            .load(&france(), Some(&day("2024-01-01")))
            .await;

        let FeedOutcome::Loaded(feed) = &outcome else {
            panic!("expected a feed");
        };
        assert_eq!(feed.zones.len(), 1);
        assert_eq!(feed.zones[0].messages.len(), 1);
        assert_eq!(feed.zones[0].messages[0].display_title(), "ok");
        assert_eq!(feed.rejected[0].location, "zones[0].messages[1]");
        assert_eq!(outcome.message(), None);
        assert_eq!(
            outcome.status_text().as_deref(),
            Some("⚠️ 1 malformed records skipped")
        );
    }

    #[test]
    fn fully_rejected_feed_is_not_reported_as_empty() {
        let feed = EventFeed::from_slice(br#"{"zones": [{"messages": "oops"}]}"#).unwrap();
        let outcome = FeedOutcome::Loaded(feed);

        assert_ne!(outcome.message(), Some("No events."));
        assert_eq!(
            outcome.status_text().as_deref(),
            Some("No events could be shown. ⚠️ 1 malformed records skipped")
        );
    }

    #[test]
    fn empty_feed_status_is_plain_no_events() {
        let outcome = FeedOutcome::Loaded(EventFeed::default());
        assert_eq!(outcome.status_text().as_deref(), Some("No events."));
    }

    #[test]
    fn embedded_date_must_be_a_day_or_all() {
        let docs = [
            r#"{"date": "", "zones": []}"#,
            r#"{"date": "yesterday"}"#,
            r#"{"date": "../2024-01-01"}"#,
        ];
        for doc in docs {
            let feed = EventFeed::from_slice(doc.as_bytes()).unwrap();
            assert_eq!(feed.date, None, "{doc}");
            assert_eq!(feed.rejected[0].location, "date");
        }

        let all = EventFeed::from_slice(br#"{"date": "ALL"}"#).unwrap();
        assert_eq!(all.date.as_deref(), Some("ALL"));
        let dated = EventFeed::from_slice(br#"{"date": "2024-01-01"}"#).unwrap();
        assert_eq!(dated.date.as_deref(), Some("2024-01-01"));
        assert!(dated.rejected.is_empty());
    }

    #[test]
    fn zone_header_joins_region_and_location() {
        let zone = |region: Option<&str>, location: Option<&str>| Zone {
            region: region.map(str::to_string),
            location: location.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(zone(Some("Kharkiv"), Some("Izium")).header(), "Kharkiv – Izium");
        assert_eq!(zone(None, Some("Izium")).header(), "Izium");
        assert_eq!(zone(Some(" "), None).header(), "Unknown zone");
    }

    #[test]
    fn message_text_fallbacks() {
        let message = EventMessage {
            id: 1,
            translated_text: Some("  ".into()),
            preview: Some("short".into()),
            source: Some("Channel".into()),
            orientation: Some("pro".into()),
            url: Some("https://t.me/chan/5".into()),
            telegram_message_id: Some(5),
            ..Default::default()
        };
        assert_eq!(message.body(), "short");
        assert_eq!(message.attribution(), "Channel • pro");
        assert_eq!(message.link_label().as_deref(), Some("post #5"));
    }

    #[test]
    fn timestamps_render_in_local_zone() {
        let message = EventMessage {
            id: 1,
            created_at: Some("2024-01-01T12:30:00.123456".into()),
            ..Default::default()
        };
        assert_eq!(
            message.display_time(&chrono_tz::Europe::Paris).as_deref(),
            Some("2024-01-01 13:30 CET")
        );

        let with_event = EventMessage {
            event_timestamp: Some("2024-06-01T08:00:00+00:00".into()),
            ..message
        };
        assert_eq!(
            with_event.display_time(&chrono_tz::UTC).as_deref(),
            Some("2024-06-01 08:00 UTC")
        );
    }
}
