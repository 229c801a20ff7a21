use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::config::CatalogConfig;
use super::payload::{parse_catalog, ParsedCatalog};
use crate::error::LoadError;
use crate::models::CodeDetail;

/// Anything that can produce the catalog and per-code details. The store only
/// talks to this trait, so tests swap in canned data and the worker threads
/// share one source behind an `Arc`.
pub trait CatalogSource: Send + Sync {
    /// Fetch and decode the whole catalog. Blocks the calling thread.
    fn fetch_catalog(&self) -> Result<ParsedCatalog, LoadError>;

    /// Fetch the detail record of one code. Blocks the calling thread.
    fn fetch_detail(&self, code: &str) -> Result<CodeDetail, LoadError>;
}

/// Catalog source backed by the HTTP API.
pub struct HttpCatalogSource {
    client: Client,
    config: CatalogConfig,
    catalog_url: Url,
}

impl HttpCatalogSource {
    /// Build the HTTP client once; the configured timeout applies to every
    /// request it sends.
    pub fn new(config: CatalogConfig) -> anyhow::Result<Self> {
        let catalog_url = config.catalog_url()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            catalog_url,
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn get_text(&self, url: &Url) -> Result<(StatusCode, String), LoadError> {
        debug!(%url, "sending request");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| transport_error(url, err))?;
        let status = response.status();
        let body = response.text().map_err(|err| transport_error(url, err))?;
        Ok((status, body))
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch_catalog(&self) -> Result<ParsedCatalog, LoadError> {
        let (status, body) = self.get_text(&self.catalog_url)?;
        if !status.is_success() {
            return Err(LoadError::Status {
                url: self.catalog_url.to_string(),
                status: status.as_u16(),
            });
        }
        parse_catalog(&body)
    }

    fn fetch_detail(&self, code: &str) -> Result<CodeDetail, LoadError> {
        let url = self
            .config
            .detail_url(code)
            .map_err(|err| LoadError::Transport {
                url: self.config.endpoint.clone(),
                message: format!("{err:#}"),
            })?;
        let (status, body) = self.get_text(&url)?;
        if status == StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound {
                code: code.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        serde_json::from_str(&body).map_err(|err| LoadError::payload(err.to_string()))
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> LoadError {
    LoadError::Transport {
        url: url.to_string(),
        message: err.without_url().to_string(),
    }
}
