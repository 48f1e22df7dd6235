//! PostgREST Index Client - Market Table over HTTP
//!
//! Wraps reqwest with service-role authentication and bounded retries
//! for the off-chain market index. Filters render to PostgREST
//! operators (`col=eq.value`, `col=lte.value`); row updates are
//! `PATCH ?market_address=eq.<addr>` returning the touched keys, so a
//! patch that matched no row is reported as a failure.
//!
//! Both reads and row patches are idempotent, so transient failures
//! (transport errors, 429, 5xx) are retried with exponential backoff.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::config::{IndexConfig, Secret};
use crate::domain::market::IndexMarket;
use crate::ports::index::{Filter, IndexRepository, MarketPatch};

/// Column every row update is keyed by.
const ADDRESS_COLUMN: &str = "market_address";

/// Retry policy for index requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      base_delay: Duration::from_millis(200),
    }
  }
}

/// PostgREST-backed market index.
pub struct PostgrestIndex {
  http: Client,
  /// `<url>/rest/v1/<table>`
  endpoint: String,
  service_key: Secret,
  retry: RetryPolicy,
}

impl PostgrestIndex {
  /// Create a new index client.
  pub fn new(config: &IndexConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_millis(config.timeout_ms))
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      http,
      endpoint: table_endpoint(&config.url, &config.table),
      service_key: config.service_key.clone(),
      retry: RetryPolicy::default(),
    })
  }

  #[must_use]
  pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
    let key = self.service_key.expose();
    request
      .header("apikey", key)
      .bearer_auth(key)
  }

  /// Execute request with authentication and retries.
  async fn execute_with_retry(&self, request: RequestBuilder, op: &str) -> Result<Response> {
    let mut last_error = None;

    for attempt in 0..=self.retry.max_retries {
      if attempt > 0 {
        let delay = self.retry.base_delay * 2u32.pow(attempt - 1);
        debug!(op, attempt, delay_ms = delay.as_millis(), "Retrying index request");
        sleep(delay).await;
      }

      let req = self
        .authorized(request.try_clone().context("Failed to clone request")?);

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(op, "Rate limited by index, backing off");
            last_error = Some(anyhow::anyhow!("{op}: rate limited"));
          }
          status if status.is_server_error() => {
            warn!(op, status = %status, "Index server error, retrying");
            last_error = Some(anyhow::anyhow!("{op}: server error {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{op}: index error {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(op, error = %e, attempt, "Index request failed");
          last_error = Some(anyhow::Error::new(e).context(op.to_string()));
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("{op}: max retries exceeded")))
  }
}

fn table_endpoint(url: &str, table: &str) -> String {
  format!("{}/rest/v1/{table}", url.trim_end_matches('/'))
}

/// Render filters and limit as PostgREST query parameters.
pub fn query_params(filters: &[Filter], limit: usize) -> Vec<(String, String)> {
  let mut params = vec![("select".to_string(), "*".to_string())];
  params.extend(filters.iter().map(|f| {
    let (op, value) = match f {
      Filter::Eq(_, v) => ("eq", v),
      Filter::Lte(_, v) => ("lte", v),
    };
    (f.column().to_string(), format!("{op}.{}", value.render()))
  }));
  params.push(("limit".to_string(), limit.to_string()));
  params
}

/// A 2xx PATCH that touched zero rows reconciled nothing.
fn ensure_row_matched(address: &str, touched: &[serde_json::Value]) -> Result<()> {
  anyhow::ensure!(
    !touched.is_empty(),
    "index update matched no row for {ADDRESS_COLUMN}={address}"
  );
  Ok(())
}

#[async_trait]
impl IndexRepository for PostgrestIndex {
  #[instrument(skip(self, filters))]
  async fn query(&self, filters: &[Filter], limit: usize) -> Result<Vec<IndexMarket>> {
    let request = self
      .http
      .get(&self.endpoint)
      .query(&query_params(filters, limit));

    let response = self.execute_with_retry(request, "index query").await?;
    let rows: Vec<IndexMarket> = response
      .json()
      .await
      .context("Failed to decode index rows")?;

    debug!(rows = rows.len(), "Index query returned");
    Ok(rows)
  }

  #[instrument(skip(self, patch))]
  async fn update_by_address(&self, address: &str, patch: &MarketPatch) -> Result<()> {
    let request = self
      .http
      .patch(&self.endpoint)
      .query(&[
        (ADDRESS_COLUMN, format!("eq.{address}")),
        ("select", ADDRESS_COLUMN.to_string()),
      ])
      .header("Prefer", "return=representation")
      .json(patch);

    let response = self.execute_with_retry(request, "index update").await?;
    let touched: Vec<serde_json::Value> = response
      .json()
      .await
      .context("Failed to decode index update response")?;
    ensure_row_matched(address, &touched)
  }

  async fn is_healthy(&self) -> bool {
    let request = self
      .http
      .get(&self.endpoint)
      .query(&[("select", ADDRESS_COLUMN), ("limit", "1")]);

    self
      .authorized(request)
      .send()
      .await
      .is_ok_and(|r| r.status().is_success())
  }
}
