//! Binance REST access
//!
//! Two endpoints drive the monitor: `/api/v3/exchangeInfo` once at startup
//! for the symbol -> quote asset map, and `/api/v3/ticker/24hr` per pair per
//! cycle. Binance signals throttling with HTTP 429 and an outright IP ban
//! with HTTP 418; both map to a [`FetchError`] variant carrying a mandatory
//! cooldown so the caller backs off before touching the API again.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Base URL used when `BINANCE_API_BASE` is unset.
pub const DEFAULT_API_BASE: &str = "https://api.binance.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);
const IP_BAN_COOLDOWN: Duration = Duration::from_secs(300);

/// Quote asset of a trading pair, as reported by `exchangeInfo`.
///
/// Determines price precision and the volume scale used when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAsset {
    Btc,
    Eth,
    Bnb,
    Usdt,
    Other,
}

impl QuoteAsset {
    pub fn from_name(name: &str) -> Self {
        match name {
            "BTC" => QuoteAsset::Btc,
            "ETH" => QuoteAsset::Eth,
            "BNB" => QuoteAsset::Bnb,
            "USDT" => QuoteAsset::Usdt,
            _ => QuoteAsset::Other,
        }
    }

    /// Decimal places shown for prices quoted in this asset.
    pub fn price_precision(&self) -> usize {
        match self {
            QuoteAsset::Btc => 8,
            QuoteAsset::Eth => 7,
            QuoteAsset::Bnb => 6,
            QuoteAsset::Usdt => 4,
            QuoteAsset::Other => 6,
        }
    }

    /// Divisor and unit letter for 24h quote volume.
    ///
    /// BTC-quoted volume is shown in thousands, everything else in
    /// millions.
    pub fn volume_scale(&self) -> (f64, char) {
        match self {
            QuoteAsset::Btc => (1e3, 'K'),
            _ => (1e6, 'M'),
        }
    }
}

/// 24-hour ticker snapshot for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub last: f64,
    pub low: f64,
    pub high: f64,
    pub open: f64,
    pub quote_volume: f64,
    pub base_volume: f64,
}

impl Quote {
    /// Percent change of the last price against the 24h open.
    pub fn change_24h(&self) -> f64 {
        100.0 * (self.last - self.open) / self.open
    }
}

/// Why a request produced no usable quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limited by exchange (HTTP 429)")]
    RateLimited,

    #[error("IP banned by exchange (HTTP 418)")]
    IpBanned,

    #[error("unexpected HTTP status {code} ({reason})")]
    Status { code: u16, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    /// The exchange answered but the ticker carries a zero price in one of
    /// last/low/high/open, which would poison the percentage math
    /// downstream.
    #[error("{symbol} has zero values")]
    ZeroValues { symbol: String },
}

impl FetchError {
    /// Cooldown the caller must observe before issuing another request.
    pub fn cooldown(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited => Some(RATE_LIMIT_COOLDOWN),
            FetchError::IpBanned => Some(IP_BAN_COOLDOWN),
            _ => None,
        }
    }
}

/// Market data source consumed by the monitor loop.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Symbol -> quote asset map for every pair the exchange lists.
    async fn fetch_pairs(&self) -> Result<HashMap<String, QuoteAsset>, FetchError>;

    /// 24h ticker for one symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    last_price: String,
    low_price: String,
    high_price: String,
    open_price: String,
    quote_volume: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    quote_asset: String,
}

fn parse_price(field: &str, value: &str) -> Result<f64, FetchError> {
    value
        .parse()
        .map_err(|_| FetchError::Decode(format!("{field}: not a number: {value:?}")))
}

impl TryFrom<Ticker24h> for Quote {
    type Error = FetchError;

    fn try_from(ticker: Ticker24h) -> Result<Self, FetchError> {
        let quote = Quote {
            last: parse_price("lastPrice", &ticker.last_price)?,
            low: parse_price("lowPrice", &ticker.low_price)?,
            high: parse_price("highPrice", &ticker.high_price)?,
            open: parse_price("openPrice", &ticker.open_price)?,
            quote_volume: parse_price("quoteVolume", &ticker.quote_volume)?,
            base_volume: parse_price("volume", &ticker.volume)?,
            symbol: ticker.symbol,
        };
        let prices = [quote.last, quote.low, quote.high, quote.open];
        if prices.iter().any(|price| *price == 0.0) {
            return Err(FetchError::ZeroValues {
                symbol: quote.symbol,
            });
        }
        Ok(quote)
    }
}

/// Binance REST base URL, overridable through `BINANCE_API_BASE`.
pub fn api_base_url() -> String {
    env::var("BINANCE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
}

/// [`MarketApi`] backed by the public Binance REST endpoints.
#[derive(Debug, Clone)]
pub struct BinanceApi {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceApi {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(api_base_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FetchError::RateLimited),
            StatusCode::IM_A_TEAPOT => return Err(FetchError::IpBanned),
            status => {
                return Err(FetchError::Status {
                    code: status.as_u16(),
                    reason: status
                        .canonical_reason()
                        .unwrap_or("unknown")
                        .to_string(),
                })
            }
        }

        response
            .json()
            .await
            .map_err(|error| FetchError::Decode(error.to_string()))
    }
}

#[async_trait]
impl MarketApi for BinanceApi {
    async fn fetch_pairs(&self) -> Result<HashMap<String, QuoteAsset>, FetchError> {
        let info: ExchangeInfo = self.get_json("/api/v3/exchangeInfo", &[]).await?;
        Ok(info
            .symbols
            .into_iter()
            .map(|s| (s.symbol, QuoteAsset::from_name(&s.quote_asset)))
            .collect())
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let ticker: Ticker24h = self
            .get_json("/api/v3/ticker/24hr", &[("symbol", symbol)])
            .await?;
        Quote::try_from(ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKER_JSON: &str = r#"{
        "symbol": "ETHBTC",
        "priceChange": "-0.00013000",
        "priceChangePercent": "-0.351",
        "lastPrice": "0.03690000",
        "lowPrice": "0.03650000",
        "highPrice": "0.03720000",
        "openPrice": "0.03703000",
        "volume": "12345.6",
        "quoteVolume": "455.78912345",
        "openTime": 1724457600000,
        "closeTime": 1724543999999
    }"#;

    #[test]
    fn ticker_decodes_and_converts() {
        let ticker: Ticker24h = serde_json::from_str(TICKER_JSON).unwrap();
        let quote = Quote::try_from(ticker).unwrap();
        assert_eq!(quote.symbol, "ETHBTC");
        assert_eq!(quote.last, 0.0369);
        assert_eq!(quote.low, 0.0365);
        assert_eq!(quote.high, 0.0372);
        assert_eq!(quote.open, 0.03703);
        assert_eq!(quote.quote_volume, 455.78912345);
        assert_eq!(quote.base_volume, 12345.6);
    }

    #[test]
    fn any_zero_price_is_rejected() {
        // last, low, high, open in turn.
        for original in ["0.03690000", "0.03650000", "0.03720000", "0.03703000"] {
            let zeroed = TICKER_JSON.replace(
                &format!("\"{original}\""),
                "\"0.00000000\"",
            );
            let ticker: Ticker24h = serde_json::from_str(&zeroed).unwrap();
            assert_eq!(
                Quote::try_from(ticker),
                Err(FetchError::ZeroValues {
                    symbol: "ETHBTC".to_string()
                }),
                "zeroing {original} should invalidate the quote"
            );
        }

        // Volumes may legitimately be zero on a dead market.
        let zeroed = TICKER_JSON.replace("\"455.78912345\"", "\"0.00000000\"");
        let ticker: Ticker24h = serde_json::from_str(&zeroed).unwrap();
        assert!(Quote::try_from(ticker).is_ok());
    }

    #[test]
    fn unparseable_price_is_a_decode_error() {
        let broken = TICKER_JSON.replace("\"0.03650000\"", "\"n/a\"");
        let ticker: Ticker24h = serde_json::from_str(&broken).unwrap();
        match Quote::try_from(ticker) {
            Err(FetchError::Decode(message)) => assert!(message.contains("lowPrice")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn exchange_info_maps_symbols_to_quote_assets() {
        let json = r#"{
            "timezone": "UTC",
            "symbols": [
                {"symbol": "ETHBTC", "baseAsset": "ETH", "quoteAsset": "BTC"},
                {"symbol": "BTCUSDT", "baseAsset": "BTC", "quoteAsset": "USDT"},
                {"symbol": "XRPEUR", "baseAsset": "XRP", "quoteAsset": "EUR"}
            ]
        }"#;
        let info: ExchangeInfo = serde_json::from_str(json).unwrap();
        let pairs: HashMap<String, QuoteAsset> = info
            .symbols
            .into_iter()
            .map(|s| (s.symbol, QuoteAsset::from_name(&s.quote_asset)))
            .collect();
        assert_eq!(pairs["ETHBTC"], QuoteAsset::Btc);
        assert_eq!(pairs["BTCUSDT"], QuoteAsset::Usdt);
        assert_eq!(pairs["XRPEUR"], QuoteAsset::Other);
    }

    #[test]
    fn change_is_relative_to_open() {
        let quote = Quote {
            symbol: "BTCUSDT".to_string(),
            last: 105.0,
            low: 90.0,
            high: 110.0,
            open: 100.0,
            quote_volume: 1.0,
            base_volume: 1.0,
        };
        assert!((quote.change_24h() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn precision_follows_quote_asset() {
        assert_eq!(QuoteAsset::from_name("BTC").price_precision(), 8);
        assert_eq!(QuoteAsset::from_name("ETH").price_precision(), 7);
        assert_eq!(QuoteAsset::from_name("BNB").price_precision(), 6);
        assert_eq!(QuoteAsset::from_name("USDT").price_precision(), 4);
        assert_eq!(QuoteAsset::from_name("EUR").price_precision(), 6);
    }

    #[test]
    fn volume_scale_follows_quote_asset() {
        assert_eq!(QuoteAsset::Btc.volume_scale(), (1e3, 'K'));
        assert_eq!(QuoteAsset::Usdt.volume_scale(), (1e6, 'M'));
    }

    #[test]
    fn throttle_errors_carry_cooldowns() {
        assert_eq!(
            FetchError::RateLimited.cooldown(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            FetchError::IpBanned.cooldown(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(FetchError::Transport("timeout".into()).cooldown(), None);
        assert_eq!(
            FetchError::ZeroValues {
                symbol: "X".into()
            }
            .cooldown(),
            None
        );
    }
}
