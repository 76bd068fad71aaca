//! End-to-end engine flows against a manual clock and a temporary store.

use chrono::{Duration, Local, TimeZone};
use missionbalance_core::settings::Category;
use missionbalance_core::{
    Clock, Command, Engine, ManualClock, PersistedSnapshot, Persistence, SettingsPatch, Store, TimerPhase,
};
use tempfile::TempDir;

fn clock() -> ManualClock {
    ManualClock::new(Local.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap())
}

fn fresh(clock: &ManualClock) -> Engine<ManualClock> {
    Engine::new(PersistedSnapshot::default(), clock.clone())
}

// ============================================================================
// Countdown
// ============================================================================

#[test]
fn work_interval_runs_to_ended() {
    let clock = clock();
    let mut engine = fresh(&clock);

    let snap = engine.apply(Command::StartWork);
    assert_eq!(snap.state.timer.remaining_seconds, 30 * 60);

    clock.advance(Duration::seconds(30 * 60));
    engine.tick();

    let snap = engine.snapshot();
    assert_eq!(snap.state.timer.phase, TimerPhase::Ended);
    assert_eq!(snap.state.timer.remaining_seconds, 0);
    let last = snap.state.last_ended.expect("last ended recorded");
    assert!(!last.is_break);
    assert_eq!(last.category_index, 0);
}

#[test]
fn paused_time_does_not_drain() {
    let clock = clock();
    let mut engine = fresh(&clock);
    engine.start_work();
    clock.advance(Duration::seconds(100));
    engine.pause();
    let captured = engine.remaining_seconds();
    assert_eq!(captured, 30 * 60 - 100);

    clock.advance(Duration::hours(5));
    assert_eq!(engine.remaining_seconds(), captured);

    engine.extend(45);
    clock.advance(Duration::hours(1));
    assert_eq!(engine.remaining_seconds(), captured + 45);

    engine.extend(-10);
    assert_eq!(engine.remaining_seconds(), captured + 35);
    assert_eq!(engine.snapshot().state.timer.phase, TimerPhase::Paused);
}

#[test]
fn extend_after_end_restarts() {
    let clock = clock();
    let mut engine = fresh(&clock);
    engine.start_break();
    clock.advance(Duration::minutes(3));
    engine.tick();
    assert_eq!(engine.snapshot().state.timer.phase, TimerPhase::Ended);

    let snap = engine.extend(60);
    assert_eq!(snap.state.timer.phase, TimerPhase::Running);
    assert_eq!(snap.state.timer.remaining_seconds, 60);
    assert!(snap.state.last_ended.is_none());
}

#[test]
fn stop_reads_zero_and_idle() {
    let clock = clock();
    let mut engine = fresh(&clock);
    engine.start_work();
    let snap = engine.stop();
    assert_eq!(snap.state.timer.phase, TimerPhase::Idle);
    assert_eq!(snap.state.timer.remaining_seconds, 0);
    assert!(snap.state.timer.end_at.is_none());
}

// ============================================================================
// Sampling and balance
// ============================================================================

#[test]
fn an_hour_of_work_earns_sixty_minutes() {
    let clock = clock();
    let mut engine = fresh(&clock);
    engine.save_settings(SettingsPatch {
        durations: Some(missionbalance_core::DurationsPatch {
            work_minutes: Some(90.0),
            break_minutes: None,
        }),
        ..Default::default()
    });
    engine.start_work();

    // Poll every second for an hour, as a tight driver would.
    for _ in 0..3600 {
        engine.sample();
        clock.advance(Duration::seconds(1));
    }
    assert_eq!(engine.total_minutes(0), 60);
    assert_eq!(engine.total_minutes(1), 0);
}

#[test]
fn minutes_across_days_are_summed() {
    let clock = clock();
    let mut engine = fresh(&clock);
    clock.set(Local.with_ymd_and_hms(2025, 1, 1, 8, 0, 6).unwrap());
    engine.start_work();
    for _ in 0..3 {
        engine.sample();
        clock.advance(Duration::minutes(1));
    }
    engine.stop();

    clock.set(Local.with_ymd_and_hms(2025, 1, 2, 8, 0, 6).unwrap());
    engine.start_work();
    for _ in 0..4 {
        engine.sample();
        clock.advance(Duration::minutes(1));
    }

    assert_eq!(engine.total_minutes(0), 7);
    assert_eq!(engine.ledger().days(0).count(), 2);
    assert_eq!(engine.snapshot().computed.today_minutes, 4);
}

#[test]
fn balance_boundary_depends_on_tolerance() {
    let clock = clock();
    let mut snapshot = PersistedSnapshot::default();
    let today = clock.now().date_naive();
    for _ in 0..120 {
        snapshot.state.daily_minutes.increment(0, today);
    }

    let engine = Engine::new(snapshot.clone(), clock.clone());
    let balance = engine.balance();
    assert_eq!(balance.deficit_hours, 1);
    assert_eq!(balance.needs_more_index, 1);
    assert!(balance.is_balanced);

    snapshot.settings.tolerance_hours = 0;
    let engine = Engine::new(snapshot.clone(), clock.clone());
    assert!(!engine.balance().is_balanced);

    snapshot.settings.tolerance_hours = 1;
    let engine = Engine::new(snapshot, clock.clone());
    assert!(engine.balance().is_balanced);
}

// ============================================================================
// Settings and categories
// ============================================================================

#[test]
fn switching_to_deleted_category_falls_back() {
    let clock = clock();
    let mut engine = fresh(&clock);
    engine.save_settings(SettingsPatch {
        categories: Some(vec![
            Category {
                deleted: true,
                ..Category::new("Old", "pink", 50)
            },
            Category::new("New", "green", 50),
            Category::new("Side", "blue", 0),
        ]),
        ..Default::default()
    });

    let snap = engine.switch_category(0);
    assert_eq!(snap.state.current_category_index, 1);
    assert_eq!(snap.settings.categories[1].target_percent, 100);
    assert_eq!(snap.settings.categories[2].target_percent, 0);
}

#[test]
fn settings_patch_is_clamped() {
    let clock = clock();
    let mut engine = fresh(&clock);
    let patch: SettingsPatch = serde_json::from_str(
        r#"{"tolerance_hours": -3.7, "durations": {"work_minutes": 0.2, "break_minutes": 99999}}"#,
    )
    .unwrap();
    let snap = engine.save_settings(patch);
    assert_eq!(snap.settings.tolerance_hours, 0);
    assert_eq!(snap.settings.durations.work_minutes, 1);
    assert_eq!(snap.settings.durations.break_minutes, 1440);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn state_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(Local.with_ymd_and_hms(2025, 1, 1, 8, 0, 10).unwrap());
    let today = clock.now().date_naive();

    let mut persistence = Persistence::new(Store::in_dir(dir.path()));
    let mut engine = Engine::new(persistence.load(today), clock.clone());
    engine.switch_category(1);
    engine.start_work();
    for _ in 0..5 {
        engine.sample();
        clock.advance(Duration::minutes(1));
    }
    engine.pause();
    assert!(persistence.flush(&engine.persisted(), today, "test"));

    let mut reopened = Persistence::new(Store::in_dir(dir.path()));
    let restored = Engine::new(reopened.load(today), clock.clone());
    assert_eq!(restored.current_category_index(), 1);
    assert_eq!(restored.total_minutes(1), 5);
    assert_eq!(restored.remaining_seconds(), engine.remaining_seconds());
    assert_eq!(restored.snapshot().state.timer.phase, TimerPhase::Paused);
}

#[test]
fn running_timer_keeps_counting_while_closed() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let today = clock.now().date_naive();

    let mut persistence = Persistence::new(Store::in_dir(dir.path()));
    let mut engine = Engine::new(persistence.load(today), clock.clone());
    engine.start_work();
    persistence.flush(&engine.persisted(), today, "test");

    clock.advance(Duration::minutes(10));
    let restored = Engine::new(
        Persistence::new(Store::in_dir(dir.path())).load(today),
        clock.clone(),
    );
    assert_eq!(restored.remaining_seconds(), 20 * 60);
}

#[test]
fn expired_interval_on_disk_is_settled_before_extend() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("balance.json"),
        r#"{
  "state": {
    "timer": {
      "running": true,
      "is_break": true,
      "remaining_seconds": 180,
      "end_at": "2025-01-01T00:00:00Z",
      "initial_seconds": 180
    }
  }
}"#,
    )
    .unwrap();

    let clock = clock();
    let today = clock.now().date_naive();
    let mut engine = Engine::new(
        Persistence::new(Store::in_dir(dir.path())).load(today),
        clock.clone(),
    );
    let snap = engine.apply(Command::Extend { seconds: 60 });
    assert_eq!(snap.state.timer.phase, TimerPhase::Running);
    assert_eq!(snap.state.timer.remaining_seconds, 60);
}

#[test]
fn hand_edited_settings_are_repaired_on_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("balance.json"),
        r#"{
  "settings": {
    "categories": [
      {"name": "A", "target_percent": 10},
      {"name": "B", "target_percent": 10},
      {"name": "C", "target_percent": 10},
      {"name": "D", "target_percent": 10},
      {"name": "E", "target_percent": 10},
      {"name": "F", "target_percent": 10},
      {"name": "G", "target_percent": 10},
      {"name": "H", "target_percent": 10},
      {"name": "I", "target_percent": 10}
    ],
    "tolerance_hours": 4,
    "durations": {"work_minutes": 0, "break_minutes": 9000}
  }
}"#,
    )
    .unwrap();

    let clock = clock();
    let today = clock.now().date_naive();
    let mut engine = Engine::new(
        Persistence::new(Store::in_dir(dir.path())).load(today),
        clock.clone(),
    );
    let settings = engine.settings();
    assert_eq!(settings.categories.len(), 8);
    assert_eq!(
        settings.categories.iter().map(|c| c.target_percent).sum::<u32>(),
        100
    );
    assert_eq!(settings.durations.work_minutes, 1);
    assert_eq!(settings.durations.break_minutes, 1440);

    let snap = engine.start_work();
    assert_eq!(snap.state.timer.remaining_seconds, 60);
}
