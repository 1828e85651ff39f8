//! ANSI table rendering
//!
//! One frame per cycle: a header carrying the interval and wall-clock time,
//! one row per pair, and a footer with trend spans and cycle timing. Colour
//! is plain SGR escapes and every cycle clears the screen and redraws the
//! whole frame rather than diffing.
//!
//! Column formats are fixed: symbol left-padded to 11, prices width 10 with
//! quote-asset precision, volume scaled to K/M, signed percentages. The
//! nominal table width is 92 columns plus 10 for a long-trend column and 11
//! for a short-trend column; header and footer pad to that width.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

use crate::api::{Quote, QuoteAsset};

pub const RED: &str = "\x1b[0;31m";
pub const GREEN: &str = "\x1b[0;32m";
pub const YELLOW: &str = "\x1b[0;33m";
pub const CYAN: &str = "\x1b[0;36m";
pub const BOLD: &str = "\x1b[0;1m";
pub const RESET: &str = "\x1b[0;0m";

const BASE_WIDTH: usize = 92;
const LONG_TREND_WIDTH: usize = 10;
const SHORT_TREND_WIDTH: usize = 11;
const TIMESTAMP_WIDTH: usize = 19; // "%Y-%m-%d %H:%M:%S"

/// Statistics rendered alongside a quote row.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowStats {
    pub long_trend: f64,
    pub short_trend: f64,
    pub stoch_k: f64,
}

/// Formats header, rows and footer for one table layout.
#[derive(Debug, Clone)]
pub struct TableRenderer {
    interval_secs: f64,
    long_enabled: bool,
    short_enabled: bool,
    width: usize,
}

impl TableRenderer {
    pub fn new(interval_secs: f64, long_enabled: bool, short_enabled: bool) -> Self {
        let mut width = BASE_WIDTH;
        if long_enabled {
            width += LONG_TREND_WIDTH;
        }
        if short_enabled {
            width += SHORT_TREND_WIDTH;
        }
        Self {
            interval_secs,
            long_enabled,
            short_enabled,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Header line: interval on the left, timestamp right-aligned.
    pub fn header(&self, now: DateTime<Utc>) -> String {
        let banner = format!("Every {:.1} seconds:", self.interval_secs);
        let pad = self.width.saturating_sub(banner.len() + TIMESTAMP_WIDTH);
        format!(
            "{banner}{}{}",
            " ".repeat(pad),
            now.format("%Y-%m-%d %H:%M:%S")
        )
    }

    pub fn invalid_pair_row(&self, symbol: &str) -> String {
        format!("{BOLD}{symbol:<11}{RESET} {RED}Invalid trading pair{RESET}")
    }

    pub fn zero_values_row(&self, symbol: &str) -> String {
        format!("{BOLD}{symbol:<11}{RESET} {RED}Unexpected zero values returned.{RESET}")
    }

    /// One table row for a successfully fetched quote.
    pub fn quote_row(&self, quote: &Quote, asset: QuoteAsset, stats: RowStats) -> String {
        let precision = asset.price_precision();
        let (divisor, unit) = asset.volume_scale();
        let volume = quote.quote_volume / divisor;
        let change = quote.change_24h();
        let change_colour = if change < 0.0 { RED } else { GREEN };

        let mut row = format!(
            "{BOLD}{symbol:<11}{RESET} {CYAN}{last:>10.precision$}{RESET} ",
            symbol = quote.symbol,
            last = quote.last,
        );
        row.push_str(&format!(
            "{YELLOW}(L:{low:>10.precision$} H:{high:>10.precision$} \
             O:{open:>10.precision$} V:{volume:>7.2}{unit}){RESET} ",
            low = quote.low,
            high = quote.high,
            open = quote.open,
        ));
        row.push_str(&format!("{change_colour}{change:+7.2}%{RESET}"));
        row.push_str("  ");
        if self.long_enabled {
            row.push_str(&trend_cell('L', stats.long_trend, ""));
        }
        if self.short_enabled {
            row.push_str(&trend_cell('S', stats.short_trend, " "));
        }
        row.push_str(&stochastic_cell(stats.stoch_k));
        row
    }

    /// Footer: trend spans on the left, average cycle time right-aligned.
    pub fn footer(
        &self,
        long_span_secs: f64,
        short_span_secs: f64,
        avg_secs: Option<f64>,
    ) -> String {
        let mut trends = String::from("Hourly Trends: ");
        if long_span_secs > 0.0 {
            trends.push_str(&format!("L:{}", fmt_hms(long_span_secs.round() as i64)));
        }
        if short_span_secs > 0.0 {
            trends.push_str(&format!(", S:{}", fmt_hms(short_span_secs.round() as i64)));
        }
        if long_span_secs + short_span_secs == 0.0 {
            trends.push_str("00:00:00");
        }
        trends.push_str(". Stochastic Osc. 24h.");

        let timing = match avg_secs {
            Some(avg) => format!("Avg. Time: {avg:.2} seconds"),
            None => String::new(),
        };
        let pad = self.width.saturating_sub(trends.len() + timing.len());
        format!("{trends}{}{timing}", " ".repeat(pad))
    }
}

/// Trend percentage cell, clipped to `<99.99%` / `>99.99%` text outside the
/// printable range. Negative trends are red, the rest green.
fn trend_cell(label: char, trend: f64, lead: &str) -> String {
    if trend < -99.99 {
        format!("{lead}{RED}{label}:<99.99%{RESET}")
    } else if trend < 0.0 {
        format!("{lead}{RED}{label}:{trend:+6.2}%{RESET}")
    } else if trend < 100.0 {
        format!("{lead}{GREEN}{label}:{trend:+6.2}%{RESET}")
    } else {
        format!("{lead}{GREEN}{label}:>99.99%{RESET}")
    }
}

/// %K cell. Colour tiers mark the overbought and oversold bands; anything
/// at or below zero renders a literal ` 0.0`.
fn stochastic_cell(k: f64) -> String {
    let (colour, text) = if k >= 99.9 {
        (RED, "99.9".to_string())
    } else if k >= 90.0 {
        (RED, format!("{k:4.1}"))
    } else if k >= 75.0 {
        (YELLOW, format!("{k:4.1}"))
    } else if k >= 25.0 {
        (GREEN, format!("{k:4.1}"))
    } else if k >= 10.0 {
        (YELLOW, format!("{k:4.1}"))
    } else if k > 0.0 {
        (RED, format!("{k:4.1}"))
    } else {
        (RED, " 0.0".to_string())
    };
    format!("  {colour}%K:{text}{RESET}")
}

/// `HH:MM:SS` with hours left uncapped.
pub fn fmt_hms(total_secs: i64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        total_secs % 3600 / 60,
        total_secs % 60
    )
}

/// Clear the terminal and print one frame.
pub fn draw(frame: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    writeln!(stdout, "{frame}")?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Strip SGR escapes, leaving the visible text.
    fn visible(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn quote() -> Quote {
        Quote {
            symbol: "BTCUSDT".to_string(),
            last: 123.4567,
            low: 100.0,
            high: 200.0,
            open: 150.0,
            quote_volume: 12_345_678.0,
            base_volume: 98.0,
        }
    }

    #[test]
    fn width_adapts_to_enabled_trend_columns() {
        assert_eq!(TableRenderer::new(10.0, false, false).width(), 92);
        assert_eq!(TableRenderer::new(10.0, true, false).width(), 102);
        assert_eq!(TableRenderer::new(10.0, true, true).width(), 113);
    }

    #[test]
    fn header_right_aligns_timestamp_to_width() {
        let renderer = TableRenderer::new(10.0, false, false);
        let now = Utc.with_ymd_and_hms(2024, 8, 24, 12, 0, 0).unwrap();
        let header = renderer.header(now);
        assert_eq!(header.len(), 92);
        assert!(header.starts_with("Every 10.0 seconds:"));
        assert!(header.ends_with("2024-08-24 12:00:00"));
    }

    #[test]
    fn quote_row_layout_without_trend_columns() {
        let renderer = TableRenderer::new(10.0, false, false);
        let stats = RowStats {
            stoch_k: 23.4567,
            ..RowStats::default()
        };
        let row = renderer.quote_row(&quote(), QuoteAsset::Usdt, stats);
        assert_eq!(
            visible(&row),
            "BTCUSDT       123.4567 \
             (L:  100.0000 H:  200.0000 O:  150.0000 V:  12.35M)  \
             -17.70%    %K:23.5"
        );
        // Down day, so the change cell is red.
        assert!(row.contains(&format!("{RED} -17.70%{RESET}")));
        assert!(row.contains(CYAN));
        assert!(row.contains(BOLD));
    }

    #[test]
    fn btc_quoted_rows_use_eight_decimals_and_thousands() {
        let renderer = TableRenderer::new(10.0, false, false);
        let quote = Quote {
            symbol: "ETHBTC".to_string(),
            last: 0.0369,
            low: 0.0365,
            high: 0.0372,
            open: 0.0360,
            quote_volume: 4557.0,
            base_volume: 1.0,
        };
        let row = visible(&renderer.quote_row(&quote, QuoteAsset::Btc, RowStats::default()));
        assert!(row.contains("0.03690000"), "row: {row}");
        assert!(row.contains("V:   4.56K"), "row: {row}");
        // Up day renders a plus sign.
        assert!(row.contains("  +2.50%"), "row: {row}");
    }

    #[test]
    fn trend_cells_follow_sign_and_clip_bounds() {
        assert_eq!(
            trend_cell('L', -150.0, ""),
            format!("{RED}L:<99.99%{RESET}")
        );
        assert_eq!(
            trend_cell('L', -99.99, ""),
            format!("{RED}L:-99.99%{RESET}")
        );
        assert_eq!(trend_cell('L', -0.01, ""), format!("{RED}L: -0.01%{RESET}"));
        assert_eq!(trend_cell('L', 0.0, ""), format!("{GREEN}L: +0.00%{RESET}"));
        assert_eq!(
            trend_cell('L', 99.99, ""),
            format!("{GREEN}L:+99.99%{RESET}")
        );
        assert_eq!(
            trend_cell('L', 100.0, ""),
            format!("{GREEN}L:>99.99%{RESET}")
        );
        // Short-trend cells carry a separating space.
        assert_eq!(
            trend_cell('S', 1.5, " "),
            format!(" {GREEN}S: +1.50%{RESET}")
        );
    }

    #[test]
    fn stochastic_tiers_at_documented_boundaries() {
        let cases = [
            (100.5, RED, "99.9"),
            (99.9, RED, "99.9"),
            (95.0, RED, "95.0"),
            (90.0, RED, "90.0"),
            (89.9, YELLOW, "89.9"),
            (75.0, YELLOW, "75.0"),
            (74.9, GREEN, "74.9"),
            (25.0, GREEN, "25.0"),
            (24.9, YELLOW, "24.9"),
            (10.0, YELLOW, "10.0"),
            (9.9, RED, " 9.9"),
            (0.1, RED, " 0.1"),
            (0.0, RED, " 0.0"),
        ];
        for (k, colour, text) in cases {
            assert_eq!(
                stochastic_cell(k),
                format!("  {colour}%K:{text}{RESET}"),
                "k = {k}"
            );
        }
    }

    #[test]
    fn footer_shows_spans_and_average_cycle_time() {
        let renderer = TableRenderer::new(10.0, true, true);
        let footer = renderer.footer(3725.4, 61.0, Some(10.013));
        assert_eq!(footer.len(), renderer.width());
        assert!(footer.starts_with(
            "Hourly Trends: L:01:02:05, S:00:01:01. Stochastic Osc. 24h."
        ));
        assert!(footer.ends_with("Avg. Time: 10.01 seconds"));
    }

    #[test]
    fn footer_with_no_spans_shows_zero_placeholder() {
        let renderer = TableRenderer::new(10.0, false, false);
        let footer = renderer.footer(0.0, 0.0, None);
        assert_eq!(
            footer.trim_end(),
            "Hourly Trends: 00:00:00. Stochastic Osc. 24h."
        );
    }

    #[test]
    fn diagnostic_rows_keep_the_symbol_column() {
        let renderer = TableRenderer::new(10.0, false, false);
        assert_eq!(
            visible(&renderer.invalid_pair_row("NOPE")),
            "NOPE        Invalid trading pair"
        );
        assert_eq!(
            visible(&renderer.zero_values_row("DEADUSDT")),
            "DEADUSDT    Unexpected zero values returned."
        );
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(fmt_hms(0), "00:00:00");
        assert_eq!(fmt_hms(3661), "01:01:01");
        assert_eq!(fmt_hms(100_000), "27:46:40");
    }
}
