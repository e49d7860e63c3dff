use std::path::PathBuf;

use tracing::{debug, warn};

use crate::catalog::{CountryCatalog, CountryKey};
use crate::data::{parse_dates, ActiveCountries};
use crate::error::FetchError;
use crate::feed::EventFeed;
use crate::timeline::DateSelector;

const CATALOG_PATH: &str = "static/data/countries.json";
const GENERATED_DIR: &str = "static/data/generated";

/// One of the JSON documents the dashboard reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Catalog,
    Dates,
    ActiveCountries(DateSelector),
    Events {
        date: DateSelector,
        country: CountryKey,
    },
}

impl Resource {
    /// Path segments below the site root, unencoded.
    fn segments(&self) -> Vec<String> {
        let generated = GENERATED_DIR.split('/').map(str::to_string);
        match self {
            Resource::Catalog => CATALOG_PATH.split('/').map(str::to_string).collect(),
            Resource::Dates => generated.chain(["dates.json".to_string()]).collect(),
            Resource::ActiveCountries(date) => generated
                .chain(["active".to_string(), format!("{}.json", date.as_str())])
                .collect(),
            Resource::Events { date, country } => generated
                .chain([
                    "events".to_string(),
                    date.as_str().to_string(),
                    country_file_name(country),
                ])
                .collect(),
        }
    }

    pub fn relative_path(&self) -> String {
        self.segments().join("/")
    }

    /// Path with every segment percent-encoded, for use in URLs.
    pub fn url_path(&self) -> String {
        self.segments()
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Feed files are named after the country key, with `/` made path-safe.
fn country_file_name(country: &CountryKey) -> String {
    format!("{}.json", country.as_str().replace('/', "-"))
}

/// Where the generated documents live. Implementations report a missing
/// document as [`FetchError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError>;

    async fn catalog(&self) -> Result<CountryCatalog, FetchError> {
        let bytes = self.fetch(&Resource::Catalog).await?;
        let catalog = CountryCatalog::from_slice(&bytes)?;
        for issue in catalog.issues() {
            warn!("country catalog {}: {}", issue.location, issue.reason);
        }
        Ok(catalog)
    }

    async fn dates(&self) -> Result<Vec<String>, FetchError> {
        let bytes = self.fetch(&Resource::Dates).await?;
        let (dates, issues) = parse_dates(&bytes)?;
        for issue in issues {
            warn!("dates {}: {}", issue.location, issue.reason);
        }
        Ok(dates)
    }

    async fn active_countries(&self, date: &DateSelector) -> Result<ActiveCountries, FetchError> {
        let bytes = self
            .fetch(&Resource::ActiveCountries(date.clone()))
            .await?;
        Ok(ActiveCountries::from_slice(&bytes)?)
    }

    async fn events(&self, date: &DateSelector, country: &CountryKey) -> Result<EventFeed, FetchError> {
        let resource = Resource::Events {
            date: date.clone(),
            country: country.clone(),
        };
        let bytes = self.fetch(&resource).await?;
        Ok(EventFeed::from_slice(&bytes)?)
    }
}

/// Reads the generated site over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, resource: &Resource) -> String {
        format!("{}/{}", self.base_url, resource.url_path())
    }
}

impl DataSource for HttpSource {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(resource);
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(response.status(), resource)?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// 404 is a missing document; any other non-2xx is a failed fetch.
fn check_status(status: reqwest::StatusCode, resource: &Resource) -> Result<(), FetchError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(resource.relative_path()));
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            path: resource.relative_path(),
        });
    }
    Ok(())
}

/// Reads the generated site straight from a local directory.
#[derive(Debug, Clone)]
pub struct SiteDirSource {
    root: PathBuf,
}

impl SiteDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, resource: &Resource) -> PathBuf {
        resource
            .segments()
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl DataSource for SiteDirSource {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        let path = self.path_for(resource);
        debug!("Reading {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(resource.relative_path()))
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

/// Source picked at startup from the settings.
#[derive(Debug, Clone)]
pub enum SiteSource {
    Http(HttpSource),
    Directory(SiteDirSource),
}

impl SiteSource {
    /// URLs with an `http(s)://` scheme are fetched, anything else is a
    /// directory.
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SiteSource::Http(HttpSource::new(location))
        } else {
            SiteSource::Directory(SiteDirSource::new(location))
        }
    }
}

impl DataSource for SiteSource {
    async fn fetch(&self, resource: &Resource) -> Result<Vec<u8>, FetchError> {
        match self {
            SiteSource::Http(source) => source.fetch(resource).await,
            SiteSource::Directory(source) => source.fetch(resource).await,
        }
    }
}
