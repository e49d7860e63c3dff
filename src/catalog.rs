use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::data::{CatalogDocument, SchemaIssue};

/// Normalized country identifier, e.g. `"🇫🇷 France"`. Used as the coordinate
/// lookup key and as the marker index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryKey(String);

impl CountryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading flag glyph, when the key carries one.
    pub fn flag(&self) -> Option<&str> {
        let (first, _) = self.0.split_once(' ')?;
        if first.chars().any(|c| c.is_alphanumeric()) {
            None
        } else {
            Some(first)
        }
    }

    /// Key without its flag glyph.
    pub fn display_name(&self) -> &str {
        match self.flag() {
            Some(flag) => self.0[flag.len()..].trim_start(),
            None => &self.0,
        }
    }
}

impl fmt::Display for CountryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CountryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Static geocoding table plus alternate labels. Immutable once loaded.
#[derive(Debug, Default, Clone)]
pub struct CountryCatalog {
    coordinates: HashMap<CountryKey, Coordinates>,
    aliases: HashMap<String, CountryKey>,
    issues: Vec<SchemaIssue>,
}

impl CountryCatalog {
    pub fn new<C, A, K, L>(coordinates: C, aliases: A) -> Self
    where
        C: IntoIterator<Item = (K, (f64, f64))>,
        A: IntoIterator<Item = (L, K)>,
        K: Into<String>,
        L: Into<String>,
    {
        Self {
            coordinates: coordinates
                .into_iter()
                .map(|(k, (lat, lon))| (CountryKey::new(k), Coordinates { lat, lon }))
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|(raw, k)| (raw.into(), CountryKey::new(k)))
                .collect(),
            issues: Vec::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let doc: CatalogDocument = serde_json::from_slice(bytes)?;
        Ok(Self::from_document(doc))
    }

    /// Builds the catalog, dropping entries that are not `[lat, lon]` pairs or
    /// string aliases. Dropped entries are kept in [`CountryCatalog::issues`].
    pub fn from_document(doc: CatalogDocument) -> Self {
        let mut catalog = CountryCatalog::default();

        for (key, value) in doc.coordinates {
            match parse_lat_lon(&value) {
                Some(coords) => {
                    catalog.coordinates.insert(CountryKey::new(key), coords);
                }
                None => catalog.issues.push(SchemaIssue::new(
                    format!("coordinates[{key:?}]"),
                    format!("expected [lat, lon], got {value}"),
                )),
            }
        }

        for (raw, value) in doc.aliases {
            match value {
                Value::String(target) => {
                    catalog.aliases.insert(raw, CountryKey::new(target));
                }
                other => catalog.issues.push(SchemaIssue::new(
                    format!("aliases[{raw:?}]"),
                    format!("expected a country key, got {other}"),
                )),
            }
        }

        for (raw, target) in catalog.dangling_aliases() {
            warn!("alias {:?} points at {:?}, which has no coordinates", raw, target.as_str());
        }

        catalog
    }

    pub fn coordinates(&self, key: &str) -> Option<Coordinates> {
        self.coordinates.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.coordinates.contains_key(key)
    }

    pub fn alias_target(&self, raw: &str) -> Option<&CountryKey> {
        self.aliases.get(raw)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Aliases whose target has no coordinates, sorted by alias label.
    pub fn dangling_aliases(&self) -> Vec<(&str, &CountryKey)> {
        let mut dangling: Vec<_> = self
            .aliases
            .iter()
            .filter(|(_, target)| !self.coordinates.contains_key(*target))
            .map(|(raw, target)| (raw.as_str(), target))
            .collect();
        dangling.sort();
        dangling
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    /// A resolver for one refresh cycle.
    pub fn resolver(&self) -> CountryResolver<'_> {
        CountryResolver::new(self)
    }
}

fn parse_lat_lon(value: &Value) -> Option<Coordinates> {
    match value.as_array()?.as_slice() {
        [lat, lon] => {
            let (lat, lon) = (lat.as_f64()?, lon.as_f64()?);
            let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
            in_range.then_some(Coordinates { lat, lon })
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(CountryKey),
    Unresolved,
}

/// Maps raw backend labels to canonical keys and collects the ones it could
/// not place. The missing report lists each label once, in first-seen order.
pub struct CountryResolver<'a> {
    catalog: &'a CountryCatalog,
    missing: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> CountryResolver<'a> {
    pub fn new(catalog: &'a CountryCatalog) -> Self {
        Self {
            catalog,
            missing: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, raw: &str) -> Resolution {
        // A direct hit never consults the alias table.
        if let Some((key, _)) = self.catalog.coordinates.get_key_value(raw) {
            return Resolution::Resolved(key.clone());
        }

        match self.catalog.alias_target(raw) {
            Some(target) if self.catalog.contains(target.as_str()) => {
                Resolution::Resolved(target.clone())
            }
            _ => {
                self.report_missing(raw);
                Resolution::Unresolved
            }
        }
    }

    /// Records a label as unplaceable without resolving it.
    pub fn report_missing(&mut self, raw: &str) {
        if self.seen.insert(raw.to_string()) {
            self.missing.push(raw.to_string());
        }
    }

    pub fn catalog(&self) -> &'a CountryCatalog {
        self.catalog
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn into_missing(self) -> Vec<String> {
        self.missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn catalog() -> CountryCatalog {
        CountryCatalog::new(
            [
                ("🇫🇷 France", (46.0, 2.0)),
                ("🇲🇱 Mali", (17.0, -4.0)),
                ("Ukraine", (49.0, 32.0)),
            ],
            [
                ("France", "🇫🇷 France"),
                ("Ukraine", "🇺🇦 Ukraine"),
                ("Atlantis", "🏝 Atlantis"),
            ],
        )
    }

    #[test]
    fn direct_hit_is_returned_unchanged() {
        let catalog = catalog();
        let mut resolver = catalog.resolver();
        assert_eq!(
            resolver.resolve("🇲🇱 Mali"),
            Resolution::Resolved(CountryKey::new("🇲🇱 Mali"))
        );
        assert!(resolver.missing().is_empty());
    }

    #[test]
    fn direct_hit_bypasses_alias_table() {
        // "Ukraine" is both a coordinate key and an alias to a missing key.
        let catalog = catalog();
        let mut resolver = catalog.resolver();
        assert_eq!(
            resolver.resolve("Ukraine"),
            Resolution::Resolved(CountryKey::new("Ukraine"))
        );
        assert!(resolver.missing().is_empty());
    }

    #[test]
    fn alias_resolves_to_target() {
        let catalog = catalog();
        let mut resolver = catalog.resolver();
        assert_eq!(
            resolver.resolve("France"),
            Resolution::Resolved(CountryKey::new("🇫🇷 France"))
        );
    }

    #[test]
    fn dangling_alias_is_unresolved() {
        let catalog = catalog();
        let mut resolver = catalog.resolver();
        assert_eq!(resolver.resolve("Atlantis"), Resolution::Unresolved);
        assert_eq!(resolver.missing(), ["Atlantis".to_string()]);
    }

    #[test]
    fn missing_report_lists_each_label_once() {
        let catalog = catalog();
        let mut resolver = catalog.resolver();
        for raw in ["Narnia", "Oz", "Narnia", "France", "Oz"] {
            resolver.resolve(raw);
        }
        assert_eq!(resolver.into_missing(), vec!["Narnia".to_string(), "Oz".to_string()]);
    }

    #[test]
    fn reports_dangling_aliases() {
        let catalog = catalog();
        let dangling: Vec<_> = catalog
            .dangling_aliases()
            .into_iter()
            .map(|(raw, target)| (raw, target.as_str()))
            .collect();
        assert_eq!(
            dangling,
            vec![("Atlantis", "🏝 Atlantis"), ("Ukraine", "🇺🇦 Ukraine")]
        );
    }

    #[test]
    fn document_with_malformed_entries_keeps_the_rest() {
        let doc = r#"{
            "coordinates": {
                "🇫🇷 France": [46, 2],
                "Nowhere": [1],
                "Mars": [400, 10],
                "Text": "north"
            },
            "aliases": {"France": "🇫🇷 France", "Bad": 3}
        }"#;
        let catalog = CountryCatalog::from_slice(doc.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.coordinates("🇫🇷 France"),
            Some(Coordinates { lat: 46.0, lon: 2.0 })
        );
        assert_eq!(catalog.alias_target("France").map(CountryKey::as_str), Some("🇫🇷 France"));
        assert_eq!(catalog.issues().len(), 4);
    }

    #[test]
    fn key_splits_flag_from_name() {
        let key = CountryKey::new("🇫🇷 France");
        assert_eq!(key.flag(), Some("🇫🇷"));
        assert_eq!(key.display_name(), "France");

        let plain = CountryKey::new("South Sudan");
        assert_eq!(plain.flag(), None);
        assert_eq!(plain.display_name(), "South Sudan");
    }
}
