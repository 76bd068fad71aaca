//! The engine object: owns settings, countdown, ledger and sampler, applies
//! commands, and publishes an [`Event`] for every observable change.
//!
//! The engine never performs I/O. The [`crate::runtime`] driver (or a
//! one-shot CLI command) decides when to persist `engine.persisted()`.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::balance::{balance_status, BalanceStatus};
use crate::clock::{Clock, SystemClock};
use crate::events::Event;
use crate::ledger::Ledger;
use crate::settings::{Settings, SettingsPatch};
use crate::snapshot::{Computed, Indicator, Snapshot, StateView, TimerView};
use crate::storage::{PersistedSnapshot, PersistedState};
use crate::timer::{Countdown, LastEnded, MinuteSampler, SamplePoll, TickOutcome};

const EVENT_CAPACITY: usize = 64;

/// Commands a presentation layer can issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    GetState,
    StartWork,
    StartBreak,
    Stop,
    Pause,
    Resume,
    Extend { seconds: i64 },
    SwitchCategory { index: i64 },
    SaveSettings { settings: SettingsPatch },
}

impl Command {
    /// Settings changes are written out immediately.
    pub fn flushes_immediately(&self) -> bool {
        matches!(self, Command::SaveSettings { .. })
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::GetState)
    }
}

pub struct Engine<C: Clock = SystemClock> {
    settings: Settings,
    countdown: Countdown,
    current_category_index: usize,
    ledger: Ledger,
    sampler: MinuteSampler,
    clock: C,
    events: broadcast::Sender<Event>,
}

impl Engine<SystemClock> {
    pub fn with_system_clock(snapshot: PersistedSnapshot) -> Self {
        Self::new(snapshot, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    /// Build an engine from a loaded snapshot. Settings are sanitized and
    /// the current category is re-validated against them.
    pub fn new(snapshot: PersistedSnapshot, clock: C) -> Self {
        let PersistedSnapshot { mut settings, state } = snapshot;
        settings.sanitize();
        let current_category_index =
            settings.resolve_category_index(state.current_category_index as i64);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            countdown: Countdown::new(state.timer, state.last_ended),
            current_category_index,
            ledger: state.daily_minutes,
            sampler: MinuteSampler::default(),
            clock,
            events,
        }
    }

    pub fn with_sampler(mut self, sampler: MinuteSampler) -> Self {
        self.sampler = sampler;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Local calendar day used for ledger keys and backups.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn current_category_index(&self) -> usize {
        self.current_category_index
    }

    pub fn total_minutes(&self, index: usize) -> u64 {
        self.ledger.total_minutes(index)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining_seconds(self.now_utc())
    }

    pub fn balance(&self) -> BalanceStatus {
        balance_status(&self.settings, &self.ledger)
    }

    /// Full read model with live remaining time and computed fields.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.now_utc();
        let timer = &self.countdown.timer;
        let timer_view = TimerView {
            phase: self.countdown.phase(now),
            running: timer.running,
            is_break: timer.is_break,
            remaining_seconds: self.countdown.remaining_seconds(now),
            end_at: timer.end_at,
            initial_seconds: timer.initial_seconds,
        };
        let balance = self.balance();
        let fallback = self.settings.durations.seconds_for(timer.is_break);
        let indicator = Indicator::build(
            &self.settings,
            &self.ledger,
            &balance,
            &timer_view,
            self.countdown.progress(now, fallback),
        );
        let current = self.current_category_index;

        Snapshot {
            settings: self.settings.clone(),
            state: StateView {
                current_category_index: current,
                timer: timer_view,
                last_ended: self.countdown.last_ended,
                daily_minutes: self.ledger.clone(),
            },
            computed: Computed {
                balance,
                lifetime_minutes: self.ledger.total_minutes(current),
                today_minutes: self.ledger.minutes_on(current, self.today()),
                indicator,
            },
        }
    }

    /// Document to write to the store.
    pub fn persisted(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            settings: self.settings.clone(),
            state: PersistedState {
                current_category_index: self.current_category_index,
                timer: self.countdown.timer.clone(),
                last_ended: self.countdown.last_ended,
                daily_minutes: self.ledger.clone(),
            },
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply one command. An interval that ran out since the last tick is
    /// recorded as ended first.
    pub fn apply(&mut self, command: Command) -> Snapshot {
        self.settle_expired();
        match command {
            Command::GetState => self.snapshot(),
            Command::StartWork => self.start_work(),
            Command::StartBreak => self.start_break(),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Extend { seconds } => self.extend(seconds),
            Command::SwitchCategory { index } => self.switch_category(index),
            Command::SaveSettings { settings } => self.save_settings(settings),
        }
    }

    pub fn start_work(&mut self) -> Snapshot {
        self.start(false)
    }

    pub fn start_break(&mut self) -> Snapshot {
        self.start(true)
    }

    pub fn stop(&mut self) -> Snapshot {
        self.settle_expired();
        self.countdown.stop();
        info!("timer stopped");
        self.notify()
    }

    pub fn pause(&mut self) -> Snapshot {
        self.settle_expired();
        if self.countdown.pause(self.now_utc()) {
            info!(remaining = self.countdown.timer.remaining_seconds, "timer paused");
        }
        self.notify()
    }

    pub fn resume(&mut self) -> Snapshot {
        self.settle_expired();
        if self.countdown.resume(self.now_utc()) {
            info!(remaining = self.countdown.timer.remaining_seconds, "timer resumed");
        }
        self.notify()
    }

    pub fn extend(&mut self, delta_seconds: i64) -> Snapshot {
        self.settle_expired();
        self.countdown.extend(delta_seconds, self.now_utc());
        info!(delta_seconds, running = self.countdown.is_running(), "timer extended");
        self.notify()
    }

    /// Select the category that earns sampled minutes. Out-of-range
    /// indices are clamped; deleted ones fall back to the first live one.
    pub fn switch_category(&mut self, index: i64) -> Snapshot {
        // Attribute the ended interval to the category it ran under.
        self.settle_expired();
        self.current_category_index = self.settings.resolve_category_index(index);
        info!(requested = index, index = self.current_category_index, "switched category");
        self.notify()
    }

    pub fn save_settings(&mut self, patch: SettingsPatch) -> Snapshot {
        self.settle_expired();
        self.settings.apply_patch(patch);
        self.current_category_index = self
            .settings
            .resolve_category_index(self.current_category_index as i64);
        info!(categories = self.settings.categories.len(), "settings saved");
        self.notify()
    }

    // ── Drivers ──────────────────────────────────────────────────────

    /// One countdown evaluation. Publishes only when the displayed value
    /// moved or the interval ended.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.now_utc();
        let outcome = self.countdown.tick(now, self.current_category_index);
        if let Some(ended) = outcome.ended {
            self.announce_end(ended, now);
        } else if outcome.changed {
            self.notify();
        }
        outcome
    }

    /// Record a running interval whose end has already passed as ended,
    /// without waiting for the next tick. Publishes `IntervalEnded` and
    /// returns the record when it did.
    pub fn settle_expired(&mut self) -> Option<LastEnded> {
        let now = self.now_utc();
        if !self.countdown.is_running() || self.countdown.remaining_seconds(now) > 0 {
            return None;
        }
        let ended = self.countdown.tick(now, self.current_category_index).ended?;
        self.announce_end(ended, now);
        Some(ended)
    }

    /// One minute-sampler poll; credits the current category when it hits.
    pub fn sample(&mut self) -> SamplePoll {
        self.settle_expired();
        let now = self.now();
        let eligible = self.countdown.is_running() && !self.countdown.is_break();
        let poll = self.sampler.poll(now, eligible);
        if poll.attribute {
            let today = now.date_naive();
            let count = self.ledger.increment(self.current_category_index, today);
            debug!(
                category = self.current_category_index,
                day = %today,
                minutes_today = count,
                "minute attributed"
            );
            self.notify();
        }
        poll
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start(&mut self, is_break: bool) -> Snapshot {
        self.settle_expired();
        let seconds = self.settings.durations.seconds_for(is_break);
        self.countdown.start(is_break, seconds, self.now_utc());
        info!(is_break, seconds, category = self.current_category_index, "interval started");
        self.notify()
    }

    fn announce_end(&self, ended: LastEnded, now: DateTime<Utc>) {
        info!(
            is_break = ended.is_break,
            category = ended.category_index,
            "interval ended"
        );
        self.publish(Event::IntervalEnded {
            is_break: ended.is_break,
            category_index: ended.category_index,
            snapshot: Box::new(self.snapshot()),
            at: now,
        });
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn notify(&self) -> Snapshot {
        let snapshot = self.snapshot();
        self.publish(Event::StateChanged {
            snapshot: Box::new(snapshot.clone()),
            at: self.now_utc(),
        });
        snapshot
    }

    fn publish(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::settings::Category;
    use crate::timer::TimerPhase;
    use chrono::{Duration, TimeZone};

    fn clock() -> ManualClock {
        ManualClock::new(Local.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap())
    }

    fn engine(clock: &ManualClock) -> Engine<ManualClock> {
        Engine::new(PersistedSnapshot::default(), clock.clone())
    }

    #[test]
    fn start_work_reads_work_duration() {
        let clock = clock();
        let mut engine = engine(&clock);
        let snap = engine.start_work();
        assert_eq!(snap.state.timer.remaining_seconds, 30 * 60);
        assert_eq!(snap.state.timer.phase, TimerPhase::Running);
        assert!(!snap.state.timer.is_break);
    }

    #[test]
    fn start_break_reads_break_duration() {
        let clock = clock();
        let mut engine = engine(&clock);
        let snap = engine.start_break();
        assert_eq!(snap.state.timer.remaining_seconds, 3 * 60);
        assert!(snap.state.timer.is_break);
    }

    #[test]
    fn tick_ends_interval_and_publishes() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.start_work();
        let mut rx = engine.subscribe();

        clock.advance(Duration::minutes(30));
        let outcome = engine.tick();
        assert!(outcome.ended.is_some());

        let event = rx.try_recv().unwrap();
        assert!(event.is_interval_end());
        let snap = event.snapshot();
        assert_eq!(snap.state.timer.phase, TimerPhase::Ended);
        assert_eq!(snap.state.last_ended.map(|l| l.is_break), Some(false));
    }

    #[test]
    fn quiet_tick_publishes_nothing() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.start_work();
        let mut rx = engine.subscribe();
        engine.tick();
        assert!(rx.try_recv().is_err());

        clock.advance(Duration::seconds(1));
        engine.tick();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn every_command_publishes_a_state_change() {
        let clock = clock();
        let mut engine = engine(&clock);
        let mut rx = engine.subscribe();
        for command in [
            Command::StartWork,
            Command::Pause,
            Command::Resume,
            Command::Extend { seconds: 60 },
            Command::SwitchCategory { index: 1 },
            Command::Stop,
        ] {
            engine.apply(command);
            assert!(matches!(rx.try_recv(), Ok(Event::StateChanged { .. })));
        }
        engine.apply(Command::GetState);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sampler_credits_only_running_work() {
        let clock = clock();
        let mut engine = engine(&clock);

        clock.set(Local.with_ymd_and_hms(2025, 1, 1, 9, 0, 6).unwrap());
        assert!(!engine.sample().attribute);

        engine.start_break();
        clock.set(Local.with_ymd_and_hms(2025, 1, 1, 9, 1, 6).unwrap());
        assert!(!engine.sample().attribute);

        engine.switch_category(1);
        engine.start_work();
        clock.set(Local.with_ymd_and_hms(2025, 1, 1, 9, 2, 6).unwrap());
        assert!(engine.sample().attribute);
        assert_eq!(engine.total_minutes(1), 1);
        assert_eq!(engine.snapshot().computed.today_minutes, 1);
        assert_eq!(engine.snapshot().computed.lifetime_minutes, 1);
    }

    #[test]
    fn switch_to_deleted_falls_back() {
        let clock = clock();
        let mut snapshot = PersistedSnapshot::default();
        snapshot.settings.categories[0].deleted = true;
        let mut engine = Engine::new(snapshot, clock.clone());
        assert_eq!(engine.current_category_index(), 1);
        assert_eq!(engine.switch_category(0).state.current_category_index, 1);
        assert_eq!(engine.switch_category(-3).state.current_category_index, 1);
        assert_eq!(engine.switch_category(40).state.current_category_index, 2);
    }

    #[test]
    fn save_settings_revalidates_current_category() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.switch_category(1);
        let snap = engine.save_settings(SettingsPatch {
            categories: Some(vec![
                Category::new("A", "pink", 3),
                Category {
                    deleted: true,
                    ..Category::new("B", "green", 1)
                },
            ]),
            ..Default::default()
        });
        assert_eq!(snap.state.current_category_index, 0);
        assert_eq!(snap.settings.categories[0].target_percent, 100);
    }

    #[test]
    fn indicator_follows_balance() {
        let clock = clock();
        let mut snapshot = PersistedSnapshot::default();
        snapshot.settings.tolerance_hours = 0;
        for _ in 0..120 {
            snapshot.state.daily_minutes.increment(0, clock.now().date_naive());
        }
        let engine = Engine::new(snapshot, clock.clone());
        let snap = engine.snapshot();
        assert!(!snap.computed.balance.is_balanced);
        assert_eq!(
            snap.computed.indicator.tint,
            crate::snapshot::IndicatorTint::Category {
                index: 1,
                theme: "green".into()
            }
        );
        assert_eq!(snap.computed.indicator.tooltip, "Pink Mission: 2h | Green Mission: 0h");
    }

    #[test]
    fn persisted_round_trips_through_new() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.switch_category(1);
        engine.start_work();
        clock.advance(Duration::seconds(90));
        engine.pause();
        let persisted = engine.persisted();
        let again = Engine::new(persisted.clone(), clock.clone());
        assert_eq!(again.persisted(), persisted);
        assert_eq!(again.remaining_seconds(), 30 * 60 - 90);
    }

    #[test]
    fn extend_after_unnoticed_expiry_restarts() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.start_break();
        clock.advance(Duration::minutes(10));
        let mut rx = engine.subscribe();

        let snap = engine.extend(60);
        assert!(rx.try_recv().unwrap().is_interval_end());
        assert_eq!(snap.state.timer.phase, TimerPhase::Running);
        assert_eq!(snap.state.timer.remaining_seconds, 60);
        assert!(snap.state.last_ended.is_none());
    }

    #[test]
    fn pause_after_unnoticed_expiry_reports_ended() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.start_work();
        clock.advance(Duration::minutes(31));

        let snap = engine.pause();
        assert_eq!(snap.state.timer.phase, TimerPhase::Ended);
        assert_eq!(snap.state.last_ended.map(|l| l.is_break), Some(false));
        assert_eq!(engine.settle_expired(), None);
    }

    #[test]
    fn sampler_ignores_interval_that_already_ran_out() {
        let clock = clock();
        let mut engine = engine(&clock);
        engine.start_work();
        clock.advance(Duration::minutes(45));
        clock.advance(Duration::seconds(6));

        let poll = engine.sample();
        assert!(!poll.attribute);
        assert_eq!(engine.total_minutes(0), 0);
        assert_eq!(engine.snapshot().state.timer.phase, TimerPhase::Ended);
    }

    #[test]
    fn loaded_settings_are_sanitized() {
        let clock = clock();
        let mut snapshot = PersistedSnapshot::default();
        snapshot.settings.durations.work_minutes = 0;
        snapshot.settings.categories[0].target_percent = 90;
        let mut engine = Engine::new(snapshot, clock.clone());

        assert_eq!(engine.settings().durations.work_minutes, 1);
        let targets: Vec<u32> = engine
            .settings()
            .categories
            .iter()
            .map(|c| c.target_percent)
            .collect();
        assert_eq!(targets, vec![64, 36, 0]);
        assert_eq!(engine.start_work().state.timer.remaining_seconds, 60);
    }

    #[test]
    fn command_json_shape() {
        let cmd: Command = serde_json::from_str(r#"{"command":"extend","seconds":-30}"#).unwrap();
        assert!(matches!(cmd, Command::Extend { seconds: -30 }));
        let cmd: Command = serde_json::from_str(r#"{"command":"start_work"}"#).unwrap();
        assert!(cmd.is_mutating());
        assert!(!cmd.flushes_immediately());
    }
}
