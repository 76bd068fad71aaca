use clap::Subcommand;
use missionbalance_core::{Command, Config, SettingsPatch};

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Merge a partial JSON update, e.g. '{"tolerance_hours": 4}'
    Save {
        /// JSON object with any of: categories, tolerance_hours, durations
        patch: String,
    },
}

pub fn run(action: SettingsAction, config: &Config) -> CliResult {
    let mut session = Session::open(config)?;
    match action {
        SettingsAction::Show => print_json(session.engine().settings()),
        SettingsAction::Save { patch } => {
            let settings: SettingsPatch = serde_json::from_str(&patch)?;
            let snapshot = session
                .engine_mut()
                .apply(Command::SaveSettings { settings });
            session.save()?;
            print_json(&snapshot.settings)
        }
    }
}
