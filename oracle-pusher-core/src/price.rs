use crate::{
    error::{PushError, PushResult},
    types::{PriceTick, PRICE_SCALE},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Deserialize;
use std::{collections::HashMap, fmt::Debug, str::FromStr, time::Duration};
use tracing::{debug, info, instrument};

/// Market-data source the pusher reads its price from.
#[async_trait]
pub trait PriceSource: Send + Sync + Debug {
    /// Fetches the latest trade price for `pair` and normalizes it into a [`PriceTick`].
    ///
    /// Never returns a partial or zero tick: any transport, parse, or upstream
    /// error yields [`PushError::PriceFetch`].
    async fn fetch(&self, pair: &str) -> PushResult<PriceTick>;
}

/// Converts a decimal price string into the oracle's fixed-point integer.
///
/// The price is multiplied by [`PRICE_SCALE`] and truncated toward zero,
/// so `2.34569` becomes `23456`. Non-positive results are rejected.
pub fn to_fixed_point(price: &str) -> Result<i64> {
    let decimal = BigDecimal::from_str(price.trim())
        .with_context(|| format!("Price is not a decimal number: {:?}", price))?;
    let scaled = (decimal * BigDecimal::from(PRICE_SCALE)).with_scale(0);
    let value = scaled
        .to_i64()
        .ok_or_else(|| anyhow!("Scaled price does not fit in 64 bits: {}", price))?;
    if value <= 0 {
        anyhow::bail!("Normalized price must be positive, got {} from {:?}", value, price);
    }
    Ok(value)
}

// --- Kraken public ticker ---

#[derive(Debug, Deserialize)]
struct TickerResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, TickerInfo>,
}

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// Last trade closed: `[price, lot volume]`.
    c: Vec<String>,
}

/// Extracts the last trade price for `pair` from a ticker response.
fn last_trade_price(pair: &str, response: &TickerResponse) -> Result<String> {
    if !response.error.is_empty() {
        anyhow::bail!("Ticker returned error: {}", response.error.join(", "));
    }

    let info = match response.result.get(pair) {
        Some(info) => info,
        // Kraken may key the result by its own pair name (e.g. XXBTZUSD for XBTUSD).
        None if response.result.len() == 1 => {
            let (name, info) = response
                .result
                .iter()
                .next()
                .ok_or_else(|| anyhow!("Ticker result is empty"))?;
            debug!(requested = %pair, returned = %name, "Ticker returned an alternate pair name");
            info
        }
        None => anyhow::bail!("Ticker result does not contain pair {}", pair),
    };

    info.c
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Ticker entry for {} has no last trade price", pair))
}

/// Client for the Kraken public `Ticker` endpoint.
#[derive(Debug, Clone)]
pub struct KrakenClient {
    http: reqwest::Client,
    base_url: String,
}

impl KrakenClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for ticker")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_last_price(&self, pair: &str) -> Result<String> {
        let url = format!("{}/0/public/Ticker", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("pair", pair)])
            .send()
            .await
            .with_context(|| format!("Failed to request ticker from {}", url))?
            .json::<TickerResponse>()
            .await
            .context("Failed to parse ticker response")?;

        last_trade_price(pair, &response)
    }
}

#[async_trait]
impl PriceSource for KrakenClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, pair: &str) -> PushResult<PriceTick> {
        if pair.trim().is_empty() {
            return Err(PushError::PriceFetch(anyhow!("Currency pair must not be empty")));
        }

        let price = self.fetch_last_price(pair).await.map_err(PushError::PriceFetch)?;
        let value = to_fixed_point(&price).map_err(PushError::PriceFetch)?;

        info!(%pair, %price, value, "Fetched last trade price");
        Ok(PriceTick::new(pair, value))
    }
}
