use clap::Subcommand;
use missionbalance_core::{Command, Config};

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a work interval
    Start,
    /// Start a break interval
    Break,
    /// Stop and reset to idle
    Stop,
    /// Pause the running interval
    Pause,
    /// Resume a paused interval
    Resume,
    /// Evaluate the countdown once (records an ended interval)
    Tick,
    /// Add (or with a negative value, remove) seconds
    Extend {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
}

pub fn run(action: TimerAction, config: &Config) -> CliResult {
    let mut session = Session::open(config)?;
    let engine = session.engine_mut();
    let snapshot = match action {
        TimerAction::Start => engine.apply(Command::StartWork),
        TimerAction::Break => engine.apply(Command::StartBreak),
        TimerAction::Stop => engine.apply(Command::Stop),
        TimerAction::Pause => engine.apply(Command::Pause),
        TimerAction::Resume => engine.apply(Command::Resume),
        TimerAction::Extend { seconds } => engine.apply(Command::Extend { seconds }),
        TimerAction::Tick => {
            if let Some(ended) = engine.tick().ended {
                eprintln!(
                    "{} interval ended",
                    if ended.is_break { "break" } else { "work" }
                );
            }
            engine.snapshot()
        }
    };
    session.save()?;
    print_json(&snapshot)
}
