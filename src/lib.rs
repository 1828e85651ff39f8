//! Live Binance price monitor for the terminal.
//!
//! Polls the public REST API on a fixed interval, keeps a bounded price
//! history per trading pair, derives least-squares hourly trends and a
//! stochastic oscillator from it, and redraws a coloured table every
//! cycle. Pairs come from the command line or from a file re-read each
//! cycle, and rows order themselves by latest price.

pub mod api;
pub mod args;
pub mod clock;
pub mod history;
pub mod monitor;
pub mod render;
pub mod trend;
pub mod watchlist;

pub use api::{BinanceApi, FetchError, MarketApi, Quote, QuoteAsset};
pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{CycleOutput, Monitor, MonitorConfig};
pub use watchlist::{PairSource, Watchlist};
