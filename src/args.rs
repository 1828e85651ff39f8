//! Command-line argument parsing
//!
//! Invocation shape: `binance-rates <interval>[/<longTrend>][/<shortTrend>]
//! <PAIR...|pairFile>`. Duration tokens are a number suffixed with `s`, `m`
//! or `h`. A malformed token exits 0 after a parse diagnostic; missing pair
//! arguments exit 1 after the full usage text.

use thiserror::Error;

/// Hint printed under a duration parse diagnostic.
pub const DURATION_FORMAT_HINT: &str = "       Format is 00s, 00m or 00h";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Error: Could not parse time string '{0}'")]
    BadDuration(String),

    #[error("Error: No currency pair specified")]
    MissingPairs,
}

impl UsageError {
    /// Process exit code mandated for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            UsageError::BadDuration(_) => 0,
            UsageError::MissingPairs => 1,
        }
    }
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Polling interval in seconds.
    pub interval_secs: f64,
    /// Long trend look-back in seconds, when a second token was given.
    pub long_trend_secs: Option<f64>,
    /// Short trend look-back in seconds, when a third token was given.
    pub short_trend_secs: Option<f64>,
    /// Pair symbols, or a single path to a pair file.
    pub pairs: Vec<String>,
}

impl CliArgs {
    /// Parse `argv` (including the program name at index 0).
    pub fn parse(argv: &[String]) -> Result<Self, UsageError> {
        if argv.len() < 3 {
            return Err(UsageError::MissingPairs);
        }

        // "10s/24h/1h" style: interval, then up to two trend windows.
        // Anything past the third token is ignored.
        let mut tokens = argv[1].split('/');
        let interval_secs = parse_duration_secs(tokens.next().unwrap_or(""))?;
        let long_trend_secs = tokens.next().map(parse_duration_secs).transpose()?;
        let short_trend_secs = tokens.next().map(parse_duration_secs).transpose()?;

        Ok(Self {
            interval_secs,
            long_trend_secs,
            short_trend_secs,
            pairs: argv[2..].to_vec(),
        })
    }
}

/// Parse a duration token (`10s`, `30m`, `1.5h`) into seconds.
///
/// The number may be fractional. Anything without a recognized unit suffix,
/// shorter than two characters, negative, or non-finite is rejected.
pub fn parse_duration_secs(token: &str) -> Result<f64, UsageError> {
    duration_secs(token).ok_or_else(|| UsageError::BadDuration(token.to_string()))
}

fn duration_secs(token: &str) -> Option<f64> {
    if token.len() < 2 {
        return None;
    }
    let unit = token.chars().next_back()?;
    let scale = match unit {
        's' => 1.0,
        'm' => 60.0,
        'h' => 3600.0,
        _ => return None,
    };
    let value: f64 = token[..token.len() - unit.len_utf8()].parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value * scale)
}

/// Full usage text, printed when no pairs are given.
pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [interval]/[trend]/[trend] PAIR1 PAIR2 ...\n\
         \x20      {prog} [interval]/[trend]/[trend] pairFile.dat\n\
         Where: [interval] is the refresh time in units of s, m or h. E.g. 10s\n\
         \x20      [trend]    is optionally the time to calculate hourly trends\n\
         \x20                 over, in units of s, m or h. Two such trend times\n\
         \x20                 can be calculated. It is assumed that the second\n\
         \x20                 one is shorter than the first. These are labelled\n\
         \x20                 ST and LT for Short and Long Trend.\n\
         \x20      PAIR1...n  are the exchange pairs. See Binance exchange for\n\
         \x20                 valid pairs. Alternatively, a file of pairs to\n\
         \x20                 monitor that will be read every cycle.\n"
    )
}
