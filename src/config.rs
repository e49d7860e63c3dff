use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::style::DeviceClass;

const SOURCE_ENV: &str = "EVENTMAP_SOURCE";
const COMPACT_ENV: &str = "EVENTMAP_COMPACT";

/// User settings, read from `config.toml` in the platform config directory.
///
/// ```toml
/// source = "https://events.example.org"   # or a local site directory
/// compact = false
/// log_filter = "eventmap=info"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source: String,
    pub compact: bool,
    pub log_filter: String,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: "http://localhost:8000".to_string(),
            compact: false,
            log_filter: "eventmap=info".to_string(),
            origin: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("eventmap").join("config.toml"))
    }

    /// Config file (when present) overlaid with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path(), std::env::vars())
    }

    pub fn load_from<I>(path: Option<PathBuf>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                let mut settings = Self::from_toml_str(&text)?;
                settings.origin = Some(path);
                settings
            }
            _ => Self::default(),
        };
        settings.apply_env(vars)?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        if settings.source.trim().is_empty() {
            return Err(ConfigError::Invalid("source must not be empty".to_string()));
        }
        Ok(settings)
    }

    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            match name.as_str() {
                SOURCE_ENV if !value.trim().is_empty() => self.source = value,
                COMPACT_ENV => self.compact = parse_flag(&value)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn device_class(&self) -> DeviceClass {
        if self.compact {
            DeviceClass::Compact
        } else {
            DeviceClass::Full
        }
    }
}

fn parse_flag(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid(format!("{COMPACT_ENV}={other} is not a boolean"))),
    }
}
