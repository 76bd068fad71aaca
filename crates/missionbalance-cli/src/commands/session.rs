//! Load-apply-save wrapper for one-shot commands.

use missionbalance_core::{Config, CoreError, Engine, MinuteSampler, Persistence, Store};

pub struct Session {
    engine: Engine,
    persistence: Persistence,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self, CoreError> {
        let store = Store::open_default()?.with_backups(config.persistence.daily_backup);
        let mut persistence = Persistence::new(store);
        let today = chrono::Local::now().date_naive();
        let mut engine = Engine::with_system_clock(persistence.load(today))
            .with_sampler(MinuteSampler::new(&config.sampler));
        // No driver ran while the process was down.
        engine.settle_expired();
        Ok(Self {
            engine,
            persistence,
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Write the state back; unlike the long-running driver, a failed
    /// write is reported to the user.
    pub fn save(&mut self) -> Result<(), CoreError> {
        let today = self.engine.today();
        if self.persistence.flush(&self.engine.persisted(), today, "cli") {
            Ok(())
        } else {
            Err(CoreError::Custom(format!(
                "failed to save state to {}",
                self.persistence.store().path().display()
            )))
        }
    }

    /// Hand the loaded state over to the async driver.
    pub fn into_parts(self) -> (Engine, Persistence) {
        (self.engine, self.persistence)
    }
}
