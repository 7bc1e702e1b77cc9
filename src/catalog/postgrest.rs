// src/catalog/postgrest.rs
//! Hosted catalog adapter speaking the PostgREST dialect (Supabase `rest/v1`).

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{syncable_item, CatalogItem, CatalogRepository, ItemId};
use crate::config::SyncConfig;
use crate::error::RepositoryError;
use crate::pricing::PriceQuote;

/// Hosted tables cap responses (1000 rows on Supabase); listing pages through
/// by id (keyset) so rows inserted or deleted mid-listing cannot shift a page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone)]
pub struct PostgrestCatalogRepository {
    client: Client,
    table_url: Url,
    api_key: String,
    page_size: usize,
}

#[derive(Deserialize)]
struct ListedRow {
    id: ItemId,
    sku: Option<String>,
}

#[derive(Serialize)]
struct PriceUpdate<'a> {
    price: &'a Decimal,
    net_price: &'a Decimal,
    stock: u64,
    price_updated_at: DateTime<Utc>,
}

impl PostgrestCatalogRepository {
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> Result<Self> {
        let mut table_url = Url::parse(base_url)
            .with_context(|| format!("parsing catalog url {base_url:?}"))?;
        table_url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("catalog url {base_url} cannot carry a path"))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);

        let client = Client::builder()
            .user_agent(concat!("price-sync-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()
            .context("building catalog http client")?;

        Ok(Self {
            client,
            table_url,
            api_key: api_key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        let url = cfg
            .catalog_url
            .as_deref()
            .context("SUPABASE_URL is not configured")?;
        let key = cfg
            .catalog_key
            .as_deref()
            .context("SUPABASE_SERVICE_ROLE_KEY is not configured")?;
        Self::new(
            url,
            key,
            &cfg.catalog_table,
            Duration::from_secs(cfg.catalog_timeout_secs),
        )
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_page(&self, after: Option<&ItemId>) -> Result<Vec<ListedRow>, RepositoryError> {
        let mut url = self.table_url.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("select", "id,sku")
                .append_pair("sku", "not.is.null")
                .append_pair("order", "id.asc")
                .append_pair("limit", &self.page_size.to_string());
            if let Some(last) = after {
                q.append_pair("id", &format!("gt.{last}"));
            }
        }

        let resp = self.authed(self.client.get(url)).send().await?;
        let resp = ensure_success(resp).await?;
        resp.json::<Vec<ListedRow>>()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

async fn ensure_success(resp: Response) -> Result<Response, RepositoryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let cut = (0..=ERROR_BODY_LIMIT)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    Err(RepositoryError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CatalogRepository for PostgrestCatalogRepository {
    async fn list_syncable_items(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let mut items = Vec::new();
        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut cursor: Option<ItemId> = None;
        loop {
            let page = self.fetch_page(cursor.as_ref()).await?;
            let n = page.len();
            let last = page.last().map(|r| r.id.clone());
            for row in page {
                if !seen.insert(row.id.clone()) {
                    tracing::warn!(target: "catalog", id = %row.id, "row listed twice; skipping repeat");
                    continue;
                }
                items.extend(syncable_item(row.id, row.sku.as_deref()));
            }
            // Stop when the page is short or the cursor did not advance.
            if n < self.page_size || last.is_none() || last == cursor {
                break;
            }
            cursor = last;
        }
        tracing::debug!(target: "catalog", count = items.len(), "listed syncable items");
        Ok(items)
    }

    async fn apply_quote(&self, id: &ItemId, quote: &PriceQuote) -> Result<(), RepositoryError> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("select", "id");

        let body = PriceUpdate {
            price: &quote.gross_price,
            net_price: &quote.net_price,
            stock: quote.stock_available,
            price_updated_at: Utc::now(),
        };

        let resp = self
            .authed(self.client.patch(url))
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        // An empty representation means the filter matched no row.
        let touched: Vec<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        if touched.is_empty() {
            return Err(RepositoryError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}
