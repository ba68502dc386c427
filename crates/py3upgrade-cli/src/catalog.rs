use std::time::Duration;

use anyhow::{Context, Result};
use py3upgrade_core::{parse_catalog_json, CatalogEntry};

pub(crate) trait PluginCatalogSource {
    fn fetch(&self) -> Result<Vec<CatalogEntry>>;
}

/// Downloads the plugin repository listing. No request timeout is applied.
#[derive(Debug, Clone)]
pub(crate) struct HttpCatalog {
    url: String,
}

impl HttpCatalog {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PluginCatalogSource for HttpCatalog {
    fn fetch(&self) -> Result<Vec<CatalogEntry>> {
        tracing::debug!(url = %self.url, "fetching plugin catalog");
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("py3upgrade/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .context("failed to build http client")?;
        let body = client
            .get(&self.url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("failed to fetch plugin catalog from {}", self.url))?;

        let entries = parse_catalog_json(&body)
            .with_context(|| format!("unexpected plugin catalog format at {}", self.url))?;
        tracing::debug!(entries = entries.len(), "plugin catalog fetched");
        Ok(entries)
    }
}
