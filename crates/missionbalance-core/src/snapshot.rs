//! Read model handed to presentation layers.
//!
//! `remaining_seconds` is the live, wall-clock derived value, and
//! `computed` is recalculated on every build; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::BalanceStatus;
use crate::ledger::Ledger;
use crate::settings::Settings;
use crate::timer::{LastEnded, TimerPhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub settings: Settings,
    pub state: StateView,
    pub computed: Computed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    pub current_category_index: usize,
    pub timer: TimerView,
    pub last_ended: Option<LastEnded>,
    pub daily_minutes: Ledger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    pub phase: TimerPhase,
    pub running: bool,
    pub is_break: bool,
    pub remaining_seconds: u64,
    pub end_at: Option<DateTime<Utc>>,
    pub initial_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    #[serde(flatten)]
    pub balance: BalanceStatus,
    /// All-time minutes of the current category.
    pub lifetime_minutes: u64,
    /// Today's minutes of the current category.
    pub today_minutes: u64,
    pub indicator: Indicator,
}

/// Values the tray/icon renderer paints from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub minutes_left: u64,
    /// Elapsed fraction of the current interval, 0.0 ..= 1.0.
    pub progress: f64,
    pub is_break: bool,
    pub running: bool,
    pub tint: IndicatorTint,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorTint {
    /// Within tolerance.
    Neutral,
    /// Out of balance; colored after the category that needs more time.
    Category { index: usize, theme: String },
}

impl Indicator {
    pub fn build(
        settings: &Settings,
        ledger: &Ledger,
        balance: &BalanceStatus,
        timer: &TimerView,
        progress: f64,
    ) -> Self {
        let tint = if balance.is_balanced {
            IndicatorTint::Neutral
        } else {
            let theme = settings
                .categories
                .get(balance.needs_more_index)
                .map(|c| c.theme.clone())
                .unwrap_or_default();
            IndicatorTint::Category {
                index: balance.needs_more_index,
                theme,
            }
        };

        let tooltip = settings
            .tracked_indices()
            .into_iter()
            .map(|i| {
                let hours = (ledger.total_minutes(i) as f64 / 60.0).round() as u64;
                format!("{}: {}h", settings.categories[i].name, hours)
            })
            .collect::<Vec<_>>()
            .join(" | ");

        Self {
            minutes_left: timer.remaining_seconds / 60,
            progress,
            is_break: timer.is_break,
            running: timer.running,
            tint,
            tooltip,
        }
    }
}
