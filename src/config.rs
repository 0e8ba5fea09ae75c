use crate::error::{LocatorError, Result};
use crate::viewport::nearest::DEFAULT_NEAREST_COUNT;

pub const DEFAULT_NOCODB_URL: &str = "http://localhost:8080";
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_COUNTRY: &str = "za";
pub const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_USER_AGENT: &str = concat!("officemap/", env!("CARGO_PKG_VERSION"));

/// Settings for the backend table holding the office records.
#[derive(Debug, Clone, PartialEq)]
pub struct NocoDbConfig {
    pub api_url: String,
    pub api_token: String,
    pub base_id: Option<String>,
    pub table_id: Option<String>,
}

impl NocoDbConfig {
    /// Both ids are needed to address a table. Without them the demo data is served.
    pub fn table(&self) -> Option<(&str, &str)> {
        match (self.base_id.as_deref(), self.table_id.as_deref()) {
            (Some(base), Some(table)) => Some((base, table)),
            _ => None,
        }
    }
}

impl Default for NocoDbConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_NOCODB_URL.to_string(),
            api_token: String::new(),
            base_id: None,
            table_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub nocodb: NocoDbConfig,
    pub tile_url: String,
    pub geocoder_url: String,
    pub geocoder_country: String,
    pub geolocation_url: String,
    pub user_agent: String,
    pub nearest_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nocodb: NocoDbConfig::default(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            geocoder_country: DEFAULT_GEOCODER_COUNTRY.to_string(),
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            nearest_count: DEFAULT_NEAREST_COUNT,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let nearest_count = match var("NEAREST_OFFICE_COUNT") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                LocatorError::Config(format!("NEAREST_OFFICE_COUNT={raw:?}: {e}"))
            })?,
            None => defaults.nearest_count,
        };

        let tile_url = var("TILE_URL").unwrap_or(defaults.tile_url);
        if !(tile_url.contains("{z}") && tile_url.contains("{x}") && tile_url.contains("{y}")) {
            return Err(LocatorError::Config(format!(
                "TILE_URL must contain {{z}}, {{x}} and {{y}}: {tile_url}"
            )));
        }

        Ok(Self {
            nocodb: NocoDbConfig {
                api_url: var("NOCODB_API_URL").unwrap_or(defaults.nocodb.api_url),
                api_token: var("NOCODB_API_TOKEN").unwrap_or_default(),
                base_id: var("NOCODB_BASE_ID"),
                table_id: var("NOCODB_TABLE_ID"),
            },
            tile_url,
            geocoder_url: var("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            geocoder_country: var("GEOCODER_COUNTRY").unwrap_or(defaults.geocoder_country),
            geolocation_url: var("GEOLOCATION_URL").unwrap_or(defaults.geolocation_url),
            user_agent: var("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
            nearest_count,
        })
    }
}

/// One-shot action requested on the command line, run after the first
/// successful data load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupTrigger {
    NearMe,
    Address(String),
}

impl StartupTrigger {
    /// Recognises `--near-me` and `--address <text>` (or `--address=<text>`).
    /// Unknown arguments are ignored; the last trigger wins.
    pub fn from_args(args: &[String]) -> Option<Self> {
        let mut trigger = None;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--near-me" => trigger = Some(StartupTrigger::NearMe),
                "--address" => {
                    if let Some(text) = iter.next() {
                        trigger = Some(StartupTrigger::Address(text.clone()));
                    }
                }
                other => {
                    if let Some(text) = other.strip_prefix("--address=") {
                        trigger = Some(StartupTrigger::Address(text.to_string()));
                    }
                }
            }
        }
        trigger.filter(|t| !matches!(t, StartupTrigger::Address(a) if a.trim().is_empty()))
    }
}
