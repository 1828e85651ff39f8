//! Polling loop
//!
//! Owns every piece of cycle state: the validated pair map, per-pair price
//! history, display order, and trend spans. One `run_cycle` performs the
//! reload -> fetch -> update -> format sequence and returns the finished
//! frame plus a drift-corrected sleep; `run` draws and sleeps forever.

use std::collections::HashMap;
use std::env;
use std::io;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::{FetchError, MarketApi, QuoteAsset};
use crate::args::CliArgs;
use crate::clock::Clock;
use crate::history::{PriceHistory, PricePoint};
use crate::render::{self, RowStats, TableRenderer};
use crate::trend;
use crate::watchlist::Watchlist;

/// Default per-pair history bound, overridable through `MAX_HISTORY`.
pub const DEFAULT_MAX_HISTORY: usize = 5000;

/// Fraction of the polling interval added to explicit trend windows, so a
/// sample pushed just outside the nominal window by timing jitter still
/// lands inside it.
pub const WINDOW_PAD: f64 = 0.49;

const MIN_SLEEP_SECS: f64 = 0.5;

/// Runtime configuration derived from the command line and environment.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Target seconds between cycles.
    pub interval_secs: f64,
    /// Long trend look-back in seconds; 0 disables the column.
    pub long_window_secs: f64,
    /// Short trend look-back in seconds; 0 disables the column.
    pub short_window_secs: f64,
    /// Per-pair history bound.
    pub max_history: usize,
}

impl MonitorConfig {
    /// Explicit trend windows are padded by [`WINDOW_PAD`] of the interval.
    /// Without a long token the long window defaults to 24 intervals,
    /// unpadded; without a short token the short column stays off. The
    /// history bound is raised when the long window spans more polls than
    /// the default holds.
    pub fn from_cli(args: &CliArgs) -> Self {
        let interval_secs = args.interval_secs;
        let long_window_secs = match args.long_trend_secs {
            Some(secs) => secs + WINDOW_PAD * interval_secs,
            None => 24.0 * interval_secs,
        };
        let short_window_secs = match args.short_trend_secs {
            Some(secs) => secs + WINDOW_PAD * interval_secs,
            None => 0.0,
        };
        let max_history =
            raised_capacity(default_max_history(), long_window_secs, interval_secs);

        Self {
            interval_secs,
            long_window_secs,
            short_window_secs,
            max_history,
        }
    }

    pub fn long_enabled(&self) -> bool {
        self.long_window_secs > 0.0
    }

    pub fn short_enabled(&self) -> bool {
        self.short_window_secs > 0.0
    }
}

fn default_max_history() -> usize {
    env::var("MAX_HISTORY")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_MAX_HISTORY)
}

/// Grow `base` when the long window spans more polls than it can hold.
fn raised_capacity(base: usize, long_window_secs: f64, interval_secs: f64) -> usize {
    if interval_secs > 0.0 && long_window_secs / interval_secs > base as f64 {
        (long_window_secs / interval_secs).round() as usize + 10
    } else {
        base
    }
}

fn window_duration(secs: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((secs * 1e3).round() as i64)
}

/// Product of one polling cycle.
#[derive(Debug)]
pub struct CycleOutput {
    /// Fully formatted frame, ready to draw.
    pub frame: String,
    /// Drift-corrected pause before the next cycle.
    pub sleep: Duration,
}

/// Long-lived cycle state and the loop that drives it.
pub struct Monitor<A, C> {
    api: A,
    clock: C,
    config: MonitorConfig,
    renderer: TableRenderer,
    watchlist: Watchlist,
    valid_pairs: HashMap<String, QuoteAsset>,
    history: HashMap<String, PriceHistory>,
    long_span_secs: f64,
    short_span_secs: f64,
    // Pair whose history drives footer timing and drift correction: the
    // most recently updated one.
    reference: Option<String>,
}

impl<A, C> Monitor<A, C>
where
    A: MarketApi,
    C: Clock,
{
    /// Fetch exchange metadata and assemble the cycle state.
    ///
    /// A metadata failure is fatal to the caller; it is never retried.
    pub async fn init(
        api: A,
        clock: C,
        config: MonitorConfig,
        watchlist: Watchlist,
    ) -> Result<Self, FetchError> {
        let valid_pairs = api.fetch_pairs().await?;
        debug!(pairs = valid_pairs.len(), "exchange metadata loaded");

        let renderer = TableRenderer::new(
            config.interval_secs,
            config.long_enabled(),
            config.short_enabled(),
        );
        Ok(Self {
            api,
            clock,
            config,
            renderer,
            watchlist,
            valid_pairs,
            history: HashMap::new(),
            long_span_secs: 0.0,
            short_span_secs: 0.0,
            reference: None,
        })
    }

    /// One full cycle: reload the pair list, fetch each pair in display
    /// order, fold quotes into history, and format the frame.
    pub async fn run_cycle(&mut self) -> CycleOutput {
        let mut frame = self.renderer.header(self.clock.now());
        frame.push_str("\n\n");

        self.watchlist.reload();

        for symbol in self.watchlist.ordered() {
            if symbol.is_empty() {
                continue;
            }

            let Some(&asset) = self.valid_pairs.get(&symbol) else {
                frame.push_str(&self.renderer.invalid_pair_row(&symbol));
                frame.push('\n');
                continue;
            };

            let quote = match self.api.fetch_quote(&symbol).await {
                Ok(quote) => quote,
                Err(FetchError::ZeroValues { symbol: reported }) => {
                    frame.push_str(&self.renderer.zero_values_row(&reported));
                    frame.push('\n');
                    continue;
                }
                Err(error) => {
                    warn!(pair = %symbol, %error, "quote fetch failed");
                    if let Some(cooldown) = error.cooldown() {
                        warn!(
                            pair = %symbol,
                            secs = cooldown.as_secs(),
                            "cooling down after throttle response"
                        );
                        self.clock.sleep(cooldown).await;
                    }
                    continue;
                }
            };

            let now = self.clock.now();
            let max_history = self.config.max_history;
            let history = self
                .history
                .entry(symbol.clone())
                .or_insert_with(|| PriceHistory::new(max_history));
            history.push(PricePoint {
                time: now,
                price: quote.last,
            });
            self.watchlist.record_key(&symbol, quote.last);
            self.reference = Some(symbol.clone());

            let mut stats = RowStats {
                stoch_k: trend::stochastic_k(quote.last, quote.low, quote.high),
                ..RowStats::default()
            };
            if history.len() > 1 {
                if self.config.long_enabled() {
                    let cutoff = now - window_duration(self.config.long_window_secs);
                    if let Some(first) = history.since(cutoff).next() {
                        self.long_span_secs =
                            (now - first.time).num_milliseconds() as f64 / 1e3;
                    }
                    stats.long_trend =
                        trend::hourly_trend_pct(history.since(cutoff), quote.last);
                }
                if self.config.short_enabled() {
                    let cutoff = now - window_duration(self.config.short_window_secs);
                    if let Some(first) = history.since(cutoff).next() {
                        self.short_span_secs =
                            (now - first.time).num_milliseconds() as f64 / 1e3;
                    }
                    stats.short_trend =
                        trend::hourly_trend_pct(history.since(cutoff), quote.last);
                }
            }

            frame.push_str(&self.renderer.quote_row(&quote, asset, stats));
            frame.push('\n');
        }

        let (avg_secs, sleep_secs) = self.cycle_timing();
        frame.push('\n');
        frame.push_str(&self.renderer.footer(
            self.long_span_secs,
            self.short_span_secs,
            avg_secs,
        ));

        CycleOutput {
            frame,
            sleep: Duration::from_secs_f64(sleep_secs),
        }
    }

    /// Draw frames and sleep until interrupted.
    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            let output = self.run_cycle().await;
            render::draw(&output.frame)?;
            self.clock.sleep(output.sleep).await;
        }
    }

    /// Footer average and next sleep, from the reference pair's history.
    ///
    /// Sleep compensates for accumulated fetch latency: the ideal span of
    /// the last N-1 intervals minus the observed span is added to the
    /// nominal interval. A negative result falls back to half a second.
    fn cycle_timing(&self) -> (Option<f64>, f64) {
        let history = self
            .reference
            .as_ref()
            .and_then(|symbol| self.history.get(symbol));

        match history {
            Some(history) if history.len() > 1 => {
                let actual = history.span_secs();
                let intervals = (history.len() - 1) as f64;
                let wanted = self.config.interval_secs * intervals;
                let mut sleep = self.config.interval_secs + (wanted - actual);
                if sleep < 0.0 {
                    sleep = MIN_SLEEP_SECS;
                }
                (Some(actual / intervals), sleep)
            }
            _ => (None, self.config.interval_secs),
        }
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub fn history(&self, symbol: &str) -> Option<&PriceHistory> {
        self.history.get(symbol)
    }
}
