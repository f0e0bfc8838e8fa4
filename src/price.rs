//! ETH price lookup backing the daily check-in cost.

use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;

/// Used whenever no live quote is available; the check-in must stay
/// purchasable offline.
pub const FALLBACK_ETH_PRICE: f64 = 2000.0;
pub const CHECKIN_COST_USD: f64 = 0.01;
pub const PRICE_POLL_SECS: u64 = 5 * 60;

const PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd";

pub trait PriceOracle {
    fn fetch_usd_price(&self) -> Result<f64>;
}

#[derive(Deserialize)]
struct PriceResponse {
    ethereum: QuotedPrice,
}

#[derive(Deserialize)]
struct QuotedPrice {
    usd: f64,
}

pub struct CoinGecko {
    client: reqwest::blocking::Client,
}

impl CoinGecko {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

impl PriceOracle for CoinGecko {
    fn fetch_usd_price(&self) -> Result<f64> {
        let response = self.client.get(PRICE_URL).send()?;
        if !response.status().is_success() {
            bail!("price lookup failed: HTTP {}", response.status());
        }
        let quote: PriceResponse = response.json()?;
        Ok(quote.ethereum.usd)
    }
}

/// Fixed USD check-in cost expressed in ETH at the given price.
pub fn checkin_cost_eth(eth_price: Option<f64>) -> f64 {
    let price = match eth_price {
        Some(p) if p > 0.0 => p,
        _ => FALLBACK_ETH_PRICE,
    };
    CHECKIN_COST_USD / price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_uses_fallback_without_a_quote() {
        assert_eq!(checkin_cost_eth(None), 0.000_005);
        assert_eq!(checkin_cost_eth(Some(0.0)), 0.000_005);
        assert_eq!(checkin_cost_eth(Some(-10.0)), 0.000_005);
    }

    #[test]
    fn cost_tracks_a_live_quote() {
        assert_eq!(checkin_cost_eth(Some(2500.0)), 0.000_004);
    }

    #[test]
    fn quote_payload_parses() {
        let quote: PriceResponse =
            serde_json::from_str(r#"{"ethereum":{"usd":3150.25}}"#).unwrap();
        assert_eq!(quote.ethereum.usd, 3150.25);
    }
}
