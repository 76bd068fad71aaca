use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Every observable change in the engine produces an Event.
/// Presentation layers subscribe to them through the engine's broadcast
/// channel; each one carries the full snapshot after the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Any command, a visible countdown change, or a sampled minute.
    StateChanged {
        snapshot: Box<Snapshot>,
        at: DateTime<Utc>,
    },
    /// A countdown ran out.
    IntervalEnded {
        is_break: bool,
        category_index: usize,
        snapshot: Box<Snapshot>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Event::StateChanged { snapshot, .. } | Event::IntervalEnded { snapshot, .. } => snapshot,
        }
    }

    pub fn is_interval_end(&self) -> bool {
        matches!(self, Event::IntervalEnded { .. })
    }
}
