//! # Mission Balance Core Library
//!
//! Time tracking across a small set of user-defined categories ("missions")
//! with a target share for each. A work/break countdown drives a minute
//! sampler that credits the active category; the balance calculator then
//! reports which category is behind its target, and by how many hours.
//!
//! ## Architecture
//!
//! - **Countdown**: wall-clock state machine (`idle`, `running`, `paused`,
//!   `ended`); remaining time is always derived from the stored end instant
//! - **Ledger**: minutes per category per local calendar day
//! - **Balance**: largest-remainder target normalization and deficit report
//! - **Storage**: one JSON state file with daily backups, plus a TOML
//!   application config
//! - **Runtime**: a single tokio task multiplexing commands, the countdown
//!   tick, the sampler, autosave and the post-end flush
//!
//! ## Key Components
//!
//! - [`Engine`]: owns all state and applies [`Command`]s
//! - [`EngineRuntime`] / [`EngineHandle`]: async driver and its handle
//! - [`Store`] / [`Persistence`]: state file and flush coordinator
//! - [`Config`]: application configuration management

pub mod balance;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod runtime;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod timer;

pub use balance::{balance_status, normalize_percentages, BalanceStatus, CategoryShare};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Command, Engine};
pub use error::{ConfigError, CoreError};
pub use events::Event;
pub use ledger::Ledger;
pub use runtime::{EngineHandle, EngineRuntime};
pub use settings::{Category, Durations, DurationsPatch, Settings, SettingsPatch};
pub use snapshot::{Indicator, IndicatorTint, Snapshot};
pub use storage::{data_dir, Config, PersistedSnapshot, PersistedState, Persistence, Store};
pub use timer::{Countdown, LastEnded, MinuteSampler, TimerPhase, TimerState};
