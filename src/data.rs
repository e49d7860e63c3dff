use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

pub const APP_ID: &str = "com.toasterrepair.Eventmap";

/// Selector value meaning "aggregate across every date".
pub const ALL_DATES: &str = "ALL";

/// A record that was present in a document but did not have the expected
/// shape. The record is dropped; the issue is surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaIssue {
    pub location: String,
    pub reason: String,
}

impl SchemaIssue {
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

/// `countries.json` as it comes off the wire. Values stay untyped so that one
/// bad entry does not reject the whole table.
#[derive(Debug, Deserialize, Default)]
pub struct CatalogDocument {
    #[serde(default)]
    pub coordinates: HashMap<String, Value>,
    #[serde(default)]
    pub aliases: HashMap<String, Value>,
}

/// True for a `YYYY-MM-DD` calendar day.
pub fn is_day(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

#[derive(Debug, Deserialize)]
struct RawDates {
    #[serde(default)]
    dates: Vec<Value>,
}

/// Parses `dates.json`, keeping the backend's order (newest first). Entries
/// that are not `YYYY-MM-DD` strings are dropped.
pub fn parse_dates(bytes: &[u8]) -> Result<(Vec<String>, Vec<SchemaIssue>), serde_json::Error> {
    let raw: RawDates = serde_json::from_slice(bytes)?;
    let mut dates = Vec::with_capacity(raw.dates.len());
    let mut issues = Vec::new();

    for (idx, value) in raw.dates.into_iter().enumerate() {
        let location = format!("dates[{idx}]");
        match value.as_str() {
            Some(s) if is_day(s) => {
                if dates.iter().any(|d| d == s) {
                    issues.push(SchemaIssue::new(location, format!("duplicate date {s}")));
                } else {
                    dates.push(s.to_string());
                }
            }
            Some(s) => issues.push(SchemaIssue::new(location, format!("not a date: {s:?}"))),
            None => issues.push(SchemaIssue::new(location, "expected a string")),
        }
    }

    Ok((dates, issues))
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ActiveCountry {
    pub country: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub events_count: u64,
    #[serde(default)]
    pub last_date: Option<String>,
}

/// Missing, null and negative counts read as zero; the marker style floors
/// them at one event.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let count = Option::<i64>::deserialize(deserializer)?;
    Ok(count.unwrap_or(0).max(0) as u64)
}

#[derive(Debug, Deserialize)]
struct RawActiveCountries {
    #[serde(default)]
    countries: Vec<Value>,
    #[serde(default)]
    ignored_countries: Vec<Value>,
}

/// One `active/{date}.json` document after validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveCountries {
    pub countries: Vec<ActiveCountry>,
    /// Labels the backend itself could not map to a country.
    pub ignored: Vec<String>,
    pub rejected: Vec<SchemaIssue>,
}

impl ActiveCountries {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawActiveCountries = serde_json::from_slice(bytes)?;
        let mut out = ActiveCountries::default();

        for (idx, value) in raw.countries.into_iter().enumerate() {
            match serde_json::from_value::<ActiveCountry>(value) {
                Ok(record) if !record.country.trim().is_empty() => out.countries.push(record),
                Ok(_) => out
                    .rejected
                    .push(SchemaIssue::new(format!("countries[{idx}]"), "empty country label")),
                Err(e) => out
                    .rejected
                    .push(SchemaIssue::new(format!("countries[{idx}]"), e.to_string())),
            }
        }

        for (idx, value) in raw.ignored_countries.into_iter().enumerate() {
            match value {
                Value::String(label) => out.ignored.push(label),
                _ => out.rejected.push(SchemaIssue::new(
                    format!("ignored_countries[{idx}]"),
                    "expected a string",
                )),
            }
        }

        Ok(out)
    }

    pub fn from_records<I, L>(records: I) -> Self
    where
        I: IntoIterator<Item = (L, u64)>,
        L: Into<String>,
    {
        Self {
            countries: records
                .into_iter()
                .map(|(country, events_count)| ActiveCountry {
                    country: country.into(),
                    events_count,
                    last_date: None,
                })
                .collect(),
            ..Default::default()
        }
    }
}
