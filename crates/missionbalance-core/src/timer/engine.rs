//! Countdown state machine.
//!
//! The countdown is wall-clock based. It has no internal thread and never
//! decrements a counter: while running, remaining time is always derived
//! from the absolute `end_at` instant, so it stays correct across process
//! suspension or sleep. The caller is responsible for calling `tick()`
//! periodically to notice expiry.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --resume--> Running
//! Running --tick (0s)--> Ended --extend(+n)--> Running
//! Paused --extend(+n)--> Paused
//! any --stop--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut countdown = Countdown::default();
//! countdown.start(false, 30 * 60, now);
//! // Every second:
//! let outcome = countdown.tick(now, current_category);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Derived phase of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    /// Counted down to zero; waiting for the user.
    Ended,
}

/// Raw timer fields as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub is_break: bool,
    /// Only meaningful while not running.
    #[serde(default)]
    pub remaining_seconds: u64,
    /// Authoritative while running, `None` otherwise.
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    /// Length the current interval started with; 0 means unset.
    #[serde(default)]
    pub initial_seconds: u64,
}

/// Record of the interval that most recently ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEnded {
    pub is_break: bool,
    pub category_index: usize,
    pub ended_at: DateTime<Utc>,
}

/// Result of one `tick()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The displayed remaining seconds moved.
    pub changed: bool,
    /// Set on the tick that hit zero.
    pub ended: Option<LastEnded>,
}

/// Countdown timer plus the "ended" marker that distinguishes an expired
/// interval from a paused one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    #[serde(default)]
    pub timer: TimerState,
    #[serde(default)]
    pub last_ended: Option<LastEnded>,
}

impl Countdown {
    pub fn new(timer: TimerState, last_ended: Option<LastEnded>) -> Self {
        Self { timer, last_ended }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Live remaining seconds: `max(0, floor((end_at - now) / 1s))` while
    /// running, the stored value otherwise.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        if !self.timer.running {
            return self.timer.remaining_seconds;
        }
        match self.timer.end_at {
            Some(end_at) => {
                let ms = (end_at - now).num_milliseconds();
                if ms <= 0 {
                    0
                } else {
                    (ms / 1000) as u64
                }
            }
            None => 0,
        }
    }

    pub fn phase(&self, now: DateTime<Utc>) -> TimerPhase {
        if self.timer.running {
            TimerPhase::Running
        } else if self.remaining_seconds(now) > 0 {
            TimerPhase::Paused
        } else if self.last_ended.is_some() {
            TimerPhase::Ended
        } else {
            TimerPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.running
    }

    pub fn is_break(&self) -> bool {
        self.timer.is_break
    }

    /// 0.0 .. 1.0 elapsed fraction of the current interval.
    ///
    /// `fallback_seconds` is used when `initial_seconds` was never set.
    pub fn progress(&self, now: DateTime<Utc>, fallback_seconds: u64) -> f64 {
        let total = if self.timer.initial_seconds > 0 {
            self.timer.initial_seconds
        } else {
            fallback_seconds
        };
        if total == 0 {
            return 0.0;
        }
        let remaining = self.remaining_seconds(now).min(total);
        (1.0 - remaining as f64 / total as f64).clamp(0.0, 1.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh interval of `duration_seconds`. Valid from any phase.
    pub fn start(&mut self, is_break: bool, duration_seconds: u64, now: DateTime<Utc>) {
        self.timer = TimerState {
            running: true,
            is_break,
            remaining_seconds: duration_seconds,
            end_at: Some(now + seconds(duration_seconds as i64)),
            initial_seconds: duration_seconds,
        };
        self.last_ended = None;
    }

    /// Force `Idle`.
    pub fn stop(&mut self) {
        self.timer.running = false;
        self.timer.end_at = None;
        self.timer.remaining_seconds = 0;
        self.last_ended = None;
    }

    /// Returns `false` when not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if !self.timer.running {
            return false;
        }
        self.timer.remaining_seconds = self.remaining_seconds(now);
        self.timer.running = false;
        self.timer.end_at = None;
        true
    }

    /// Returns `false` when already running or nothing is left to run.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.timer.running || self.timer.remaining_seconds == 0 {
            return false;
        }
        self.run_from(now);
        true
    }

    /// Shift the interval by `delta_seconds` (may be negative).
    ///
    /// Extending an ended interval puts it back into `Running`; extending a
    /// paused one leaves it paused.
    pub fn extend(&mut self, delta_seconds: i64, now: DateTime<Utc>) {
        if self.timer.running {
            if let Some(end_at) = self.timer.end_at {
                self.timer.end_at =
                    Some(end_at.checked_add_signed(seconds(delta_seconds)).unwrap_or(end_at));
            }
            self.timer.remaining_seconds = self.remaining_seconds(now);
            return;
        }

        let next = (self.timer.remaining_seconds as i64).saturating_add(delta_seconds).max(0) as u64;
        self.timer.remaining_seconds = next;
        if next > 0 && self.last_ended.is_some() {
            self.run_from(now);
        } else {
            self.timer.end_at = None;
        }
    }

    /// Re-evaluate remaining time; transitions to `Ended` at zero.
    pub fn tick(&mut self, now: DateTime<Utc>, category_index: usize) -> TickOutcome {
        if !self.timer.running {
            return TickOutcome::default();
        }
        let remaining = self.remaining_seconds(now);
        let changed = remaining != self.timer.remaining_seconds;
        self.timer.remaining_seconds = remaining;
        if remaining > 0 {
            return TickOutcome { changed, ended: None };
        }

        self.timer.running = false;
        self.timer.end_at = None;
        let ended = LastEnded {
            is_break: self.timer.is_break,
            category_index,
            ended_at: now,
        };
        self.last_ended = Some(ended);
        TickOutcome {
            changed,
            ended: Some(ended),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn run_from(&mut self, now: DateTime<Utc>) {
        let remaining = self.timer.remaining_seconds;
        self.timer.end_at = Some(now + seconds(remaining as i64));
        self.timer.running = true;
        self.last_ended = None;
        if self.timer.initial_seconds == 0 {
            self.timer.initial_seconds = remaining;
        }
    }
}

/// Offsets are capped at a century so instant arithmetic cannot overflow.
const MAX_OFFSET_SECS: i64 = 100 * 365 * 24 * 60 * 60;

fn seconds(secs: i64) -> Duration {
    Duration::seconds(secs.clamp(-MAX_OFFSET_SECS, MAX_OFFSET_SECS))
}
