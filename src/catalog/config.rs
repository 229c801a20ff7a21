use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use directories::BaseDirs;
use reqwest::Url;
use serde::Deserialize;

/// Folder name used beneath the user's home directory for configuration and
/// the log file.
const DATA_DIR_NAME: &str = ".code-search";
/// Optional JSON configuration file inside the data directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Catalog list endpoint of the reference server when nothing else is set.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/codes";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENDPOINT_ENV: &str = "CODE_SEARCH_ENDPOINT";
pub const MARKET_ENV: &str = "CODE_SEARCH_MARKET";
pub const TIMEOUT_ENV: &str = "CODE_SEARCH_TIMEOUT_SECS";

/// Which market the server should list. `All` leaves the query parameter off.
/// Both the config file and the environment go through [`FromStr`], so they
/// accept the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum MarketScope {
    #[default]
    All,
    Kospi,
    Kosdaq,
}

impl MarketScope {
    /// Value of the `market` query parameter understood by the server.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            MarketScope::All => None,
            MarketScope::Kospi => Some("1"),
            MarketScope::Kosdaq => Some("2"),
        }
    }
}

impl FromStr for MarketScope {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "0" => Ok(MarketScope::All),
            "kospi" | "1" => Ok(MarketScope::Kospi),
            "kosdaq" | "2" => Ok(MarketScope::Kosdaq),
            other => Err(anyhow!("unknown market scope `{other}`")),
        }
    }
}

impl TryFrom<String> for MarketScope {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Where and how the catalog gets fetched. Built once at startup and handed
/// to the HTTP source; nothing else in the crate knows the address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint: String,
    pub market: MarketScope,
    /// Per-request timeout. Zero disables it.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            market: MarketScope::All,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CatalogConfig {
    /// Resolve the effective configuration: defaults, then
    /// `~/.code-search/config.json` if it exists, then environment variables.
    pub fn load() -> Result<Self> {
        let path = data_dir()?.join(CONFIG_FILE_NAME);
        Self::from_file(&path)?.apply_env(|key| std::env::var(key).ok())
    }

    /// Read a configuration file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()
    }

    /// Override fields from environment-style lookups. Taking the lookup as a
    /// closure keeps tests away from the real process environment.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(market) = lookup(MARKET_ENV) {
            self.market = market
                .parse()
                .with_context(|| format!("invalid {MARKET_ENV}"))?;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("invalid {TIMEOUT_ENV}"))?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self> {
        let url = Url::parse(self.endpoint.trim())
            .with_context(|| format!("invalid catalog endpoint `{}`", self.endpoint))?;
        if url.cannot_be_a_base() {
            bail!("catalog endpoint `{}` cannot carry a path", self.endpoint);
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// List URL including the market scope, if any.
    pub fn catalog_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.endpoint.trim())
            .with_context(|| format!("invalid catalog endpoint `{}`", self.endpoint))?;
        if let Some(market) = self.market.query_value() {
            url.query_pairs_mut().append_pair("market", market);
        }
        Ok(url)
    }

    /// `<endpoint>/<code>` with the code escaped as a single path segment.
    pub fn detail_url(&self, code: &str) -> Result<Url> {
        let mut url = Url::parse(self.endpoint.trim())
            .with_context(|| format!("invalid catalog endpoint `{}`", self.endpoint))?;
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| anyhow!("catalog endpoint `{}` cannot carry a path", self.endpoint))?
            .pop_if_empty()
            .push(code);
        Ok(url)
    }
}

/// Resolve the absolute path of the application data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CatalogConfig::from_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn file_values_are_read_and_env_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"endpoint": "http://10.0.0.5:5000/codes", "market": "kospi", "timeout_secs": 0}"#,
        )
        .unwrap();

        let config = CatalogConfig::from_file(&path).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.5:5000/codes");
        assert_eq!(config.market, MarketScope::Kospi);
        assert_eq!(config.timeout(), None);

        let config = config
            .apply_env(env(&[(MARKET_ENV, "2"), (TIMEOUT_ENV, "5")]))
            .unwrap();
        assert_eq!(config.market, MarketScope::Kosdaq);
        assert_eq!(config.endpoint, "http://10.0.0.5:5000/codes");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn file_market_accepts_the_same_spellings_as_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        for (raw, expected) in [
            ("2", MarketScope::Kosdaq),
            ("KOSPI", MarketScope::Kospi),
            ("0", MarketScope::All),
        ] {
            fs::write(&path, format!(r#"{{"market": "{raw}"}}"#)).unwrap();
            let config = CatalogConfig::from_file(&path).unwrap();
            assert_eq!(config.market, expected, "market {raw}");
        }

        fs::write(&path, r#"{"market": "nasdaq"}"#).unwrap();
        assert!(CatalogConfig::from_file(&path).is_err());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(CatalogConfig::default()
            .apply_env(env(&[(ENDPOINT_ENV, "not a url")]))
            .is_err());
        assert!(CatalogConfig::default()
            .apply_env(env(&[(MARKET_ENV, "nasdaq")]))
            .is_err());
        assert!(CatalogConfig::default()
            .apply_env(env(&[(TIMEOUT_ENV, "soon")]))
            .is_err());
    }

    #[test]
    fn urls_carry_market_and_code() {
        let mut config = CatalogConfig::default();
        assert_eq!(
            config.catalog_url().unwrap().as_str(),
            "http://127.0.0.1:5000/codes"
        );

        config.market = MarketScope::Kosdaq;
        assert_eq!(
            config.catalog_url().unwrap().as_str(),
            "http://127.0.0.1:5000/codes?market=2"
        );
        assert_eq!(
            config.detail_url("005930").unwrap().as_str(),
            "http://127.0.0.1:5000/codes/005930"
        );

        config.endpoint = "http://127.0.0.1:5000/codes/".to_string();
        assert_eq!(
            config.detail_url("A B").unwrap().as_str(),
            "http://127.0.0.1:5000/codes/A%20B"
        );
    }
}
