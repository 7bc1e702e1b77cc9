// src/pricing/http.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::{header::ACCEPT, Client, Url};

use super::{decode_quote, PriceLookup, PriceQuote};
use crate::config::SyncConfig;
use crate::error::LookupError;

pub const DEFAULT_CURRENCY: &str = "CLP";

/// Provider client issuing `GET {base_url}/{sku}` per lookup.
#[derive(Clone)]
pub struct HttpPriceLookup {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    default_currency: String,
}

impl HttpPriceLookup {
    /// `timeout` bounds the whole request; connecting is capped at 5s.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("parsing provider base url {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("provider base url {base_url} cannot carry a path");
        }
        let client = Client::builder()
            .user_agent(concat!("price-sync-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()
            .context("building provider http client")?;
        Ok(Self {
            client,
            base_url,
            api_key: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        let base = cfg
            .provider_base_url
            .as_deref()
            .context("PROVIDER_BASE_URL is not configured")?;
        Ok(Self::new(base, Duration::from_secs(cfg.provider_timeout_secs))?
            .with_api_key(cfg.provider_api_key.clone())
            .with_default_currency(&cfg.default_currency))
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.default_currency = currency.to_string();
        self
    }

    fn quote_url(&self, sku: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| LookupError::Transport("provider url cannot carry a path".into()))?;
            segs.pop_if_empty().push(sku);
        }
        Ok(url)
    }
}

#[async_trait]
impl PriceLookup for HttpPriceLookup {
    async fn fetch_quote(&self, sku: &str) -> Result<PriceQuote, LookupError> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(LookupError::InvalidSku);
        }
        let url = self.quote_url(sku)?;
        tracing::debug!(target: "pricing", %url, "provider lookup");

        let t0 = Instant::now();
        let mut req = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await?;
        histogram!("price_sync_lookup_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        decode_quote(&body, sku, &self.default_currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_is_a_single_encoded_segment() {
        let c = HttpPriceLookup::new("https://prices.example.test/api/v1/", Duration::from_secs(1))
            .unwrap();
        let url = c.quote_url("AB/12 X").unwrap();
        assert_eq!(
            url.as_str(),
            "https://prices.example.test/api/v1/AB%2F12%20X"
        );
    }

    #[test]
    fn base_without_trailing_slash_works() {
        let c = HttpPriceLookup::new("https://prices.example.test/quote", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            c.quote_url("SKU1").unwrap().as_str(),
            "https://prices.example.test/quote/SKU1"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpPriceLookup::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpPriceLookup::new("mailto:x@example.test", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn blank_sku_fails_without_io() {
        let c = HttpPriceLookup::new("http://127.0.0.1:9/", Duration::from_secs(1)).unwrap();
        assert!(matches!(
            c.fetch_quote("   ").await,
            Err(LookupError::InvalidSku)
        ));
    }
}
