//! Async driver for the engine.
//!
//! A single task owns the [`Engine`] and the [`Persistence`] coordinator and
//! multiplexes everything that can change them: commands from handles, the
//! countdown tick, the minute sampler, the autosave interval and the one-shot
//! flush scheduled after an interval ends. Nothing else touches engine state,
//! so there are no locks.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior, Sleep};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::{Command, Engine};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::snapshot::Snapshot;
use crate::storage::{Config, Persistence};
use crate::timer::MinuteSampler;

const COMMAND_CAPACITY: usize = 32;

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running engine task.
#[derive(Clone)]
pub struct EngineHandle {
    requests: mpsc::Sender<Request>,
    events: broadcast::Sender<Event>,
}

impl EngineHandle {
    /// Apply a command and wait for the resulting snapshot.
    pub async fn send(&self, command: Command) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| CoreError::RuntimeStopped)?;
        rx.await.map_err(|_| CoreError::RuntimeStopped)
    }

    pub async fn state(&self) -> Result<Snapshot> {
        self.send(Command::GetState).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the drivers and write the final snapshot. Returns once the
    /// flush is done; calling it again (or after the task is gone) is a
    /// no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self.requests.send(Request::Shutdown { reply }).await.is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}

/// Timing knobs for the driver loop.
#[derive(Debug, Clone)]
struct Schedule {
    tick: Duration,
    autosave: Duration,
    end_flush_delay: Duration,
}

pub struct EngineRuntime;

impl EngineRuntime {
    /// Spawn the driver task on the current tokio runtime.
    pub fn spawn<C: Clock>(
        engine: Engine<C>,
        persistence: Persistence,
        config: &Config,
    ) -> EngineHandle {
        let (requests, rx) = mpsc::channel(COMMAND_CAPACITY);
        let events = engine.event_sender();
        let engine = engine.with_sampler(MinuteSampler::new(&config.sampler));
        let schedule = Schedule {
            tick: config.timer.tick_period(),
            autosave: config.persistence.autosave_period(),
            end_flush_delay: config.persistence.end_flush_delay(),
        };
        tokio::spawn(drive(engine, persistence, schedule, rx));
        EngineHandle { requests, events }
    }
}

async fn drive<C: Clock>(
    mut engine: Engine<C>,
    mut persistence: Persistence,
    schedule: Schedule,
    mut requests: mpsc::Receiver<Request>,
) {
    info!(tick = ?schedule.tick, autosave = ?schedule.autosave, "engine runtime started");

    let mut ticker = time::interval(schedule.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut autosave = time::interval_at(Instant::now() + schedule.autosave, schedule.autosave);
    autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let sampler = time::sleep(Duration::ZERO);
    tokio::pin!(sampler);
    let mut end_flush: Option<Pin<Box<Sleep>>> = None;

    let shutdown_reply = loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(Request::Command { command, reply }) => {
                    // The command may arrive before the tick that notices expiry.
                    if engine.settle_expired().is_some() {
                        end_flush = Some(Box::pin(time::sleep(schedule.end_flush_delay)));
                    }
                    let flush = command.flushes_immediately();
                    let snapshot = engine.apply(command);
                    if flush {
                        persistence.flush(&engine.persisted(), engine.today(), "settings");
                    }
                    let _ = reply.send(snapshot);
                }
                Some(Request::Shutdown { reply }) => break Some(reply),
                None => break None,
            },
            _ = ticker.tick() => {
                if engine.tick().ended.is_some() {
                    end_flush = Some(Box::pin(time::sleep(schedule.end_flush_delay)));
                }
            }
            _ = &mut sampler => {
                if engine.settle_expired().is_some() {
                    end_flush = Some(Box::pin(time::sleep(schedule.end_flush_delay)));
                }
                let poll = engine.sample();
                sampler.as_mut().reset(Instant::now() + poll.next_check);
            }
            _ = autosave.tick() => {
                persistence.flush(&engine.persisted(), engine.today(), "autosave");
            }
            _ = fire(&mut end_flush) => {
                end_flush = None;
                persistence.flush(&engine.persisted(), engine.today(), "interval_end");
            }
        }
    };

    // Leaving the loop drops every pending schedule before the last write.
    requests.close();
    persistence.flush(&engine.persisted(), engine.today(), "shutdown");
    debug!(
        flushes = persistence.flush_count(),
        failures = persistence.failure_count(),
        "engine runtime stopped"
    );
    if let Some(reply) = shutdown_reply {
        let _ = reply.send(());
    }
}

/// Resolves when the optional one-shot sleep fires; never, if unset.
async fn fire(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
