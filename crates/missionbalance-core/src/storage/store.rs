//! JSON state file and the persistence coordinator.
//!
//! The whole `{settings, state}` document is rewritten on every save. Once
//! per local calendar day, before the file is first overwritten, the
//! previous contents are copied to `config_backups/balance-YYYY-MM-DD.json`
//! with a create-only open, so there is never more than one backup per day.

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::data_dir;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::settings::Settings;
use crate::timer::{LastEnded, TimerState};

const STATE_FILE: &str = "balance.json";
const BACKUP_DIR: &str = "config_backups";

/// Everything except settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub current_category_index: usize,
    #[serde(default)]
    pub timer: TimerState,
    #[serde(default)]
    pub last_ended: Option<LastEnded>,
    #[serde(default)]
    pub daily_minutes: Ledger,
}

/// On-disk document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub state: PersistedState,
}

/// Location of the state file and its backups.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    backup_dir: PathBuf,
    backups_enabled: bool,
    last_backup_day: Option<NaiveDate>,
}

impl Store {
    /// Store rooted at the default data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::in_dir(&data_dir()?))
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(STATE_FILE),
            backup_dir: dir.join(BACKUP_DIR),
            backups_enabled: true,
            last_backup_day: None,
        }
    }

    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.backups_enabled = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self, day: NaiveDate) -> PathBuf {
        self.backup_dir
            .join(format!("balance-{}.json", day.format("%Y-%m-%d")))
    }

    /// Read and parse the state file. `Ok(None)` when it does not exist.
    pub fn read(&self) -> Result<Option<PersistedSnapshot>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the snapshot, falling back to defaults.
    ///
    /// A missing file is created with defaults. An unreadable one is kept
    /// aside as `balance.json.corrupt` and replaced by defaults on the next
    /// save.
    pub fn load(&mut self, today: NaiveDate) -> PersistedSnapshot {
        match self.read() {
            Ok(Some(snapshot)) => {
                info!(path = %self.path.display(), "loaded state");
                snapshot
            }
            Ok(None) => {
                info!(path = %self.path.display(), "no state file, starting from defaults");
                let snapshot = PersistedSnapshot::default();
                if let Err(e) = self.write(&snapshot, today) {
                    warn!(error = %e, "failed to write initial state");
                }
                snapshot
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, using defaults");
                let aside = self.path.with_extension("json.corrupt");
                if let Err(e) = fs::copy(&self.path, &aside) {
                    warn!(error = %e, "failed to preserve unreadable state file");
                }
                PersistedSnapshot::default()
            }
        }
    }

    /// Rewrite the state file, taking the day's backup first.
    pub fn write(&mut self, snapshot: &PersistedSnapshot, today: NaiveDate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        if self.backups_enabled {
            if let Err(e) = self.backup_once(today) {
                warn!(error = %e, "daily backup failed");
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    /// Copy the current file to today's backup slot unless that slot is
    /// already taken. Returns whether a new backup was written.
    pub fn backup_once(&mut self, today: NaiveDate) -> Result<bool> {
        if self.last_backup_day == Some(today) || !self.path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.backup_dir)?;
        let dest = self.backup_path(today);
        match OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(mut out) => {
                let mut src = fs::File::open(&self.path)?;
                io::copy(&mut src, &mut out)?;
                self.last_backup_day = Some(today);
                info!(path = %dest.display(), "daily backup written");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                self.last_backup_day = Some(today);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Persistence coordinator: flushes never fail from the caller's point of
/// view. Errors are logged and the in-memory state stays authoritative.
#[derive(Debug)]
pub struct Persistence {
    store: Store,
    flushes: u64,
    failures: u64,
}

impl Persistence {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            flushes: 0,
            failures: 0,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn load(&mut self, today: NaiveDate) -> PersistedSnapshot {
        self.store.load(today)
    }

    /// Write `snapshot`; returns whether the write succeeded.
    pub fn flush(&mut self, snapshot: &PersistedSnapshot, today: NaiveDate, reason: &str) -> bool {
        match self.store.write(snapshot, today) {
            Ok(()) => {
                self.flushes += 1;
                debug!(reason, "flushed state");
                true
            }
            Err(e) => {
                self.failures += 1;
                warn!(reason, error = %e, "failed to flush state");
                false
            }
        }
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn failure_count(&self) -> u64 {
        self.failures
    }
}
