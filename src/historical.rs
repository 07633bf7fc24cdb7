// 📜 Historical-Majority Index
// identifier (usually an event name) → the territory it was most often filed under
//
// Built once per batch from previously labeled records, then shared
// read-only. Building is the barrier: nothing resolves through history
// until `build` has returned.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trim, lowercase and collapse internal whitespace
pub fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntry {
    pub territory: String,
    /// Records filed under the winning territory
    pub votes: usize,
    /// All labeled records seen for this identifier
    pub total: usize,
}

impl HistoricalEntry {
    pub fn share(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.votes as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalIndex {
    entries: HashMap<String, HistoricalEntry>,
}

impl HistoricalIndex {
    pub fn new() -> Self {
        HistoricalIndex {
            entries: HashMap::new(),
        }
    }

    /// Scan (identifier, territory) pairs and keep the majority territory per
    /// identifier. Ties go to the territory seen first.
    pub fn build<I, S, T>(labeled: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        // Per identifier: territories in first-seen order with counts
        let mut tallies: HashMap<String, Vec<(String, usize)>> = HashMap::new();
        let mut scanned = 0usize;

        for (identifier, territory) in labeled {
            let key = normalize_identifier(identifier.as_ref());
            let territory = territory.as_ref().trim();
            if key.is_empty() || territory.is_empty() {
                continue;
            }
            scanned += 1;

            let counts = tallies.entry(key).or_default();
            match counts.iter_mut().find(|(t, _)| t == territory) {
                Some((_, n)) => *n += 1,
                None => counts.push((territory.to_string(), 1)),
            }
        }

        let entries: HashMap<String, HistoricalEntry> = tallies
            .into_iter()
            .filter_map(|(key, counts)| {
                let total: usize = counts.iter().map(|(_, n)| n).sum();
                let mut best: Option<&(String, usize)> = None;
                for candidate in &counts {
                    // Strictly greater keeps the first-seen territory on ties
                    if best.map(|b| candidate.1 > b.1).unwrap_or(true) {
                        best = Some(candidate);
                    }
                }
                best.map(|(territory, votes)| {
                    (
                        key,
                        HistoricalEntry {
                            territory: territory.clone(),
                            votes: *votes,
                            total,
                        },
                    )
                })
            })
            .collect();

        info!(
            "historical index built: {} labeled records, {} identifiers",
            scanned,
            entries.len()
        );

        HistoricalIndex { entries }
    }

    pub fn lookup(&self, identifier: &str) -> Option<&HistoricalEntry> {
        self.entries.get(&normalize_identifier(identifier))
    }

    pub fn territory_for(&self, identifier: &str) -> Option<&str> {
        self.lookup(identifier).map(|e| e.territory.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
