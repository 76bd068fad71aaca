//! Per-category, per-day minute ledger.
//!
//! Serialized as `{"mission_0": {"2025-01-01": 42}, ...}`. Entries are
//! created on first increment and never removed, including for categories
//! that were later deleted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Ledger key for a category index.
pub fn category_key(index: usize) -> String {
    format!("mission_{index}")
}

/// Ledger key for a calendar day.
pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one minute to `index` on `day`, returning the day's new count.
    pub fn increment(&mut self, index: usize, day: NaiveDate) -> u64 {
        let count = self
            .entries
            .entry(category_key(index))
            .or_default()
            .entry(day_key(day))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Lifetime minutes for a category, summed over every recorded day.
    pub fn total_minutes(&self, index: usize) -> u64 {
        self.entries
            .get(&category_key(index))
            .map(|days| days.values().sum())
            .unwrap_or(0)
    }

    pub fn minutes_on(&self, index: usize, day: NaiveDate) -> u64 {
        self.entries
            .get(&category_key(index))
            .and_then(|days| days.get(&day_key(day)))
            .copied()
            .unwrap_or(0)
    }

    /// Recorded days for a category, oldest first.
    pub fn days(&self, index: usize) -> impl Iterator<Item = (&str, u64)> {
        self.entries
            .get(&category_key(index))
            .into_iter()
            .flat_map(|days| days.iter().map(|(day, minutes)| (day.as_str(), *minutes)))
    }
}
