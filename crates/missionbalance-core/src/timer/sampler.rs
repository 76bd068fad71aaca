//! Minute sampler.
//!
//! Rather than counting minutes from process start, the sampler polls at a
//! low rate and attributes a minute whenever a poll lands inside a short
//! window near the start of a real minute (seconds 5..=15 by default). A
//! missed window (system sleep, a stalled loop) just loses that minute
//! instead of skewing every later one. This is a deliberate approximation;
//! the guard on `last_attributed` makes sure one calendar minute is never
//! counted twice, even if polls arrive early or close together.

use std::time::Duration;

use chrono::{DateTime, DurationRound, Local, TimeDelta, Timelike};

use crate::storage::SamplerConfig;

/// What a single poll decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoll {
    /// Credit one minute to the current category.
    pub attribute: bool,
    /// Delay before the next poll.
    pub next_check: Duration,
}

#[derive(Debug, Clone)]
pub struct MinuteSampler {
    window_start_sec: u32,
    window_end_sec: u32,
    outside_poll: Duration,
    cooldown: Duration,
    last_attributed: Option<DateTime<Local>>,
}

impl MinuteSampler {
    pub fn new(config: &SamplerConfig) -> Self {
        let start = config.window_start_sec.min(59);
        let end = config.window_end_sec.clamp(start, 59);
        Self {
            window_start_sec: start,
            window_end_sec: end,
            outside_poll: Duration::from_secs(config.outside_poll_secs.max(1)),
            cooldown: Duration::from_secs(config.cooldown_secs.max(1)),
            last_attributed: None,
        }
    }

    pub fn in_window(&self, now: DateTime<Local>) -> bool {
        (self.window_start_sec..=self.window_end_sec).contains(&now.second())
    }

    /// Decide whether `now` earns a minute. `eligible` is true while a work
    /// interval is running.
    pub fn poll(&mut self, now: DateTime<Local>, eligible: bool) -> SamplePoll {
        if !self.in_window(now) {
            return SamplePoll {
                attribute: false,
                next_check: self.outside_poll,
            };
        }

        let minute = now
            .duration_trunc(TimeDelta::minutes(1))
            .unwrap_or(now);
        let fresh = self.last_attributed != Some(minute);
        let attribute = eligible && fresh;
        if attribute {
            self.last_attributed = Some(minute);
        }
        SamplePoll {
            attribute,
            next_check: self.cooldown,
        }
    }
}

impl Default for MinuteSampler {
    fn default() -> Self {
        Self::new(&SamplerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn outside_window_rechecks_soon() {
        let mut sampler = MinuteSampler::default();
        let poll = sampler.poll(at(10, 0, 30), true);
        assert!(!poll.attribute);
        assert_eq!(poll.next_check, Duration::from_secs(5));
    }

    #[test]
    fn inside_window_attributes_and_cools_down() {
        let mut sampler = MinuteSampler::default();
        let poll = sampler.poll(at(10, 0, 5), true);
        assert!(poll.attribute);
        assert_eq!(poll.next_check, Duration::from_secs(30));
        assert!(sampler.poll(at(10, 1, 15), true).attribute);
    }

    #[test]
    fn same_minute_is_never_counted_twice() {
        let mut sampler = MinuteSampler::default();
        assert!(sampler.poll(at(10, 0, 6), true).attribute);
        assert!(!sampler.poll(at(10, 0, 12), true).attribute);
        assert!(sampler.poll(at(10, 1, 6), true).attribute);
    }

    #[test]
    fn ineligible_poll_does_not_consume_the_minute() {
        let mut sampler = MinuteSampler::default();
        let poll = sampler.poll(at(10, 0, 7), false);
        assert!(!poll.attribute);
        assert_eq!(poll.next_check, Duration::from_secs(30));
        assert!(sampler.poll(at(10, 0, 14), true).attribute);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let sampler = MinuteSampler::default();
        assert!(!sampler.in_window(at(9, 0, 4)));
        assert!(sampler.in_window(at(9, 0, 5)));
        assert!(sampler.in_window(at(9, 0, 15)));
        assert!(!sampler.in_window(at(9, 0, 16)));
    }

    #[test]
    fn polling_a_simulated_hour_counts_each_minute_once() {
        let mut sampler = MinuteSampler::default();
        let mut now = at(9, 0, 0);
        let end = at(10, 0, 0);
        let mut minutes = 0;
        while now < end {
            let poll = sampler.poll(now, true);
            if poll.attribute {
                minutes += 1;
            }
            now += TimeDelta::from_std(poll.next_check).unwrap();
        }
        assert_eq!(minutes, 60);
    }
}
