mod engine;
mod sampler;

pub use engine::{Countdown, LastEnded, TickOutcome, TimerPhase, TimerState};
pub use sampler::{MinuteSampler, SamplePoll};
