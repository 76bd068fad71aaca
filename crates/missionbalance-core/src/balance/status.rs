//! Balance calculator: actual share versus target share per tracked
//! category, and whether the worst deficit is within tolerance.

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;
use crate::settings::Settings;

/// One tracked category's standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub index: usize,
    pub minutes: u64,
    pub target_percent: u32,
    pub actual_percent: f64,
    /// Positive when the category is under its target.
    pub deficit_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceStatus {
    /// Hours the neediest category is behind, rounded half away from zero.
    pub deficit_hours: u64,
    pub deficit_percent: f64,
    /// Category that needs more time (the first tracked one when balanced).
    pub needs_more_index: usize,
    pub is_balanced: bool,
    pub total_minutes: u64,
    pub shares: Vec<CategoryShare>,
}

impl BalanceStatus {
    fn balanced(needs_more_index: usize, total_minutes: u64, shares: Vec<CategoryShare>) -> Self {
        Self {
            deficit_hours: 0,
            deficit_percent: 0.0,
            needs_more_index,
            is_balanced: true,
            total_minutes,
            shares,
        }
    }
}

/// Compute the balance verdict from the ledger and current settings.
pub fn balance_status(settings: &Settings, ledger: &Ledger) -> BalanceStatus {
    let tracked = settings.tracked_indices();
    let Some(&first) = tracked.first() else {
        return BalanceStatus::balanced(0, 0, Vec::new());
    };

    let minutes: Vec<u64> = tracked.iter().map(|&i| ledger.total_minutes(i)).collect();
    let total: u64 = minutes.iter().sum();
    if total == 0 {
        let shares = tracked
            .iter()
            .map(|&index| CategoryShare {
                index,
                minutes: 0,
                target_percent: settings.categories[index].target_percent,
                actual_percent: 0.0,
                deficit_percent: 0.0,
            })
            .collect();
        return BalanceStatus::balanced(first, 0, shares);
    }

    let shares: Vec<CategoryShare> = tracked
        .iter()
        .zip(&minutes)
        .map(|(&index, &m)| {
            let target_percent = settings.categories[index].target_percent;
            let actual_percent = 100.0 * m as f64 / total as f64;
            CategoryShare {
                index,
                minutes: m,
                target_percent,
                actual_percent,
                deficit_percent: f64::from(target_percent) - actual_percent,
            }
        })
        .collect();

    let mut worst: Option<&CategoryShare> = None;
    for share in &shares {
        if share.deficit_percent > worst.map_or(0.0, |w| w.deficit_percent) {
            worst = Some(share);
        }
    }

    let Some(worst) = worst else {
        return BalanceStatus::balanced(first, total, shares);
    };

    let deficit_minutes = worst.deficit_percent * total as f64 / 100.0;
    let deficit_hours = (deficit_minutes / 60.0).round().max(0.0) as u64;

    BalanceStatus {
        deficit_hours,
        deficit_percent: worst.deficit_percent,
        needs_more_index: worst.index,
        is_balanced: deficit_hours <= u64::from(settings.tolerance_hours),
        total_minutes: total,
        shares,
    }
}
