pub mod category;
pub mod config;
pub mod run;
pub mod settings;
pub mod timer;

mod session;

use missionbalance_core::Config;
use serde::Serialize;

pub use session::Session;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status(config: &Config) -> CliResult {
    let session = Session::open(config)?;
    print_json(&session.engine().snapshot())
}

pub fn balance(config: &Config) -> CliResult {
    let session = Session::open(config)?;
    print_json(&session.engine().balance())
}

pub fn data_dir() -> CliResult {
    println!("{}", missionbalance_core::data_dir()?.display());
    Ok(())
}
