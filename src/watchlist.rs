//! Watched pairs and display order
//!
//! Pairs come either from the command line (fixed for the session) or from
//! a pair file that is re-read every cycle, so the set can be edited while
//! the monitor runs. Rows render in descending last-price order; a pair's
//! sort key is refreshed only on a successful fetch, so a pair that errors
//! keeps its place instead of jumping around.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::warn;

/// Where the pair list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairSource {
    /// Fixed list given on the command line.
    Static,
    /// File re-read every cycle, one symbol per line.
    File(PathBuf),
}

/// The set of monitored pairs plus their display-order keys.
#[derive(Debug, Clone)]
pub struct Watchlist {
    source: PairSource,
    order: IndexMap<String, f64>,
}

impl Watchlist {
    /// Build from the positional pair arguments.
    ///
    /// When the first argument names an existing file the list is
    /// file-backed and any further arguments are ignored. Static pairs are
    /// seeded with descending keys (0, -1, -2, ..) so the first render
    /// keeps the order they were given in.
    pub fn from_args(pairs: &[String]) -> Self {
        if let Some(first) = pairs.first() {
            if Path::new(first).is_file() {
                if pairs.len() > 1 {
                    warn!(
                        file = %first,
                        ignored = pairs.len() - 1,
                        "pair file given, ignoring extra pair arguments"
                    );
                }
                return Self {
                    source: PairSource::File(PathBuf::from(first)),
                    order: IndexMap::new(),
                };
            }
        }

        let order = pairs
            .iter()
            .enumerate()
            .map(|(i, symbol)| (symbol.clone(), -(i as f64)))
            .collect();
        Self {
            source: PairSource::Static,
            order,
        }
    }

    pub fn source(&self) -> &PairSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Re-read the pair file, keeping keys of surviving pairs.
    ///
    /// Lines are trimmed; blank lines, comments (`#`) and anything shorter
    /// than five characters are skipped. New pairs join with key 0, pairs
    /// no longer listed are dropped. A static list never changes, and a
    /// read failure keeps the previous list.
    pub fn reload(&mut self) {
        let PairSource::File(path) = &self.source else {
            return;
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "could not read pair file, keeping previous list"
                );
                return;
            }
        };

        let wanted: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| line.len() >= 5 && !line.starts_with('#'))
            .collect();

        for &symbol in &wanted {
            if !self.order.contains_key(symbol) {
                self.order.insert(symbol.to_string(), 0.0);
            }
        }
        let wanted: HashSet<&str> = wanted.into_iter().collect();
        self.order
            .retain(|symbol, _| wanted.contains(symbol.as_str()));
    }

    /// Update a pair's sort key after a successful fetch.
    pub fn record_key(&mut self, symbol: &str, key: f64) {
        if let Some(entry) = self.order.get_mut(symbol) {
            *entry = key;
        }
    }

    /// Symbols in render order: descending key, ties in insertion order.
    pub fn ordered(&self) -> Vec<String> {
        self.order
            .iter()
            .sorted_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(Ordering::Equal))
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }
}
