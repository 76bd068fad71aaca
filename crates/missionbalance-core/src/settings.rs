//! User settings: categories ("missions"), target shares, tolerance and
//! interval durations.
//!
//! Settings are persisted inside the state file together with the timer and
//! ledger (see [`crate::storage::Store`]); the TOML [`crate::Config`] only
//! holds application-level knobs.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::balance::normalize_percentages;

/// Upper bound on the number of categories.
pub const MAX_CATEGORIES: usize = 8;

/// Longest interval accepted, in minutes.
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub target_percent: u32,
    /// Excluded from balance (a catch-all bucket).
    #[serde(default)]
    pub untracked: bool,
    /// Soft-deleted: never selectable again, history kept in the ledger.
    #[serde(default)]
    pub deleted: bool,
}

impl Category {
    pub fn new(name: impl Into<String>, theme: impl Into<String>, target_percent: u32) -> Self {
        Self {
            name: name.into(),
            theme: theme.into(),
            target_percent,
            untracked: false,
            deleted: false,
        }
    }

    /// Counted in balance computation and percentage normalization.
    pub fn is_tracked(&self) -> bool {
        !self.untracked && !self.deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

impl Durations {
    pub fn minutes_for(&self, is_break: bool) -> u32 {
        if is_break {
            self.break_minutes
        } else {
            self.work_minutes
        }
    }

    pub fn seconds_for(&self, is_break: bool) -> u64 {
        u64::from(self.minutes_for(is_break)) * 60
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default = "default_tolerance_hours")]
    pub tolerance_hours: u32,
    #[serde(default)]
    pub durations: Durations,
}

fn default_theme() -> String {
    "neutral".into()
}
fn default_work_minutes() -> u32 {
    30
}
fn default_break_minutes() -> u32 {
    3
}
fn default_tolerance_hours() -> u32 {
    6
}
fn default_categories() -> Vec<Category> {
    vec![
        Category::new("Pink Mission", "pink", 50),
        Category::new("Green Mission", "green", 50),
        Category {
            untracked: true,
            ..Category::new("Other", "neutral", 0)
        },
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            tolerance_hours: default_tolerance_hours(),
            durations: Durations::default(),
        }
    }
}

/// Partial settings update as sent by a presentation layer.
///
/// Numeric fields arrive as floats because callers are not trusted to send
/// integers; they are clamped, never rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    #[serde(default)]
    pub tolerance_hours: Option<f64>,
    #[serde(default)]
    pub durations: Option<DurationsPatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DurationsPatch {
    #[serde(default)]
    pub work_minutes: Option<f64>,
    #[serde(default)]
    pub break_minutes: Option<f64>,
}

impl Settings {
    /// Merge `patch` into these settings and re-normalize target shares.
    pub fn apply_patch(&mut self, patch: SettingsPatch) {
        if let Some(categories) = patch.categories {
            if categories.is_empty() {
                warn!("ignoring settings update with an empty category list");
            } else {
                self.categories = categories;
            }
        }
        if let Some(hours) = patch.tolerance_hours {
            if hours.is_finite() {
                self.tolerance_hours = hours.round().clamp(0.0, f64::from(u32::MAX)) as u32;
            }
        }
        if let Some(durations) = patch.durations {
            if let Some(work) = durations.work_minutes.and_then(clamp_minutes) {
                self.durations.work_minutes = work;
            }
            if let Some(brk) = durations.break_minutes.and_then(clamp_minutes) {
                self.durations.break_minutes = brk;
            }
        }
        self.sanitize();
    }

    /// Bring settings from any source back within bounds: at most
    /// [`MAX_CATEGORIES`] categories (defaults if none), durations in
    /// `1..=MAX_INTERVAL_MINUTES`, tracked targets summing to 100.
    pub fn sanitize(&mut self) {
        if self.categories.is_empty() {
            warn!("no categories, restoring defaults");
            self.categories = default_categories();
        }
        if self.categories.len() > MAX_CATEGORIES {
            warn!(
                given = self.categories.len(),
                max = MAX_CATEGORIES,
                "truncating category list"
            );
            self.categories.truncate(MAX_CATEGORIES);
        }
        for minutes in [
            &mut self.durations.work_minutes,
            &mut self.durations.break_minutes,
        ] {
            *minutes = (*minutes).clamp(1, MAX_INTERVAL_MINUTES);
        }
        self.normalize_targets();
    }

    /// Rewrite the target shares of tracked categories so they sum to 100.
    pub fn normalize_targets(&mut self) {
        let weights: Vec<u32> = self
            .categories
            .iter()
            .filter(|c| c.is_tracked())
            .map(|c| c.target_percent)
            .collect();
        let mut shares = normalize_percentages(&weights).into_iter();
        for category in self.categories.iter_mut().filter(|c| c.is_tracked()) {
            if let Some(share) = shares.next() {
                category.target_percent = share;
            }
        }
    }

    /// Indices of tracked categories in list order.
    pub fn tracked_indices(&self) -> Vec<usize> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_tracked())
            .map(|(i, _)| i)
            .collect()
    }

    /// Clamp `requested` into the category list, falling back to the first
    /// non-deleted category when it lands on a deleted one.
    pub fn resolve_category_index(&self, requested: i64) -> usize {
        let max = self.categories.len().saturating_sub(1);
        let clamped = requested.clamp(0, max as i64) as usize;
        match self.categories.get(clamped) {
            Some(category) if category.deleted => self
                .categories
                .iter()
                .position(|c| !c.deleted)
                .unwrap_or(clamped),
            _ => clamped,
        }
    }
}

fn clamp_minutes(minutes: f64) -> Option<u32> {
    if !minutes.is_finite() {
        return None;
    }
    Some(minutes.round().clamp(1.0, f64::from(MAX_INTERVAL_MINUTES)) as u32)
}
