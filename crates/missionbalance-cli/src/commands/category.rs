use clap::Subcommand;
use missionbalance_core::{Command, Config};
use serde::Serialize;

use super::{print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories with their minutes
    List,
    /// Select the category that earns minutes
    Switch {
        #[arg(allow_hyphen_values = true)]
        index: i64,
    },
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    index: usize,
    name: &'a str,
    theme: &'a str,
    target_percent: u32,
    untracked: bool,
    deleted: bool,
    total_minutes: u64,
    current: bool,
}

pub fn run(action: CategoryAction, config: &Config) -> CliResult {
    let mut session = Session::open(config)?;
    match action {
        CategoryAction::List => {
            let engine = session.engine();
            let rows: Vec<CategoryRow> = engine
                .settings()
                .categories
                .iter()
                .enumerate()
                .map(|(index, c)| CategoryRow {
                    index,
                    name: &c.name,
                    theme: &c.theme,
                    target_percent: c.target_percent,
                    untracked: c.untracked,
                    deleted: c.deleted,
                    total_minutes: engine.total_minutes(index),
                    current: index == engine.current_category_index(),
                })
                .collect();
            print_json(&rows)
        }
        CategoryAction::Switch { index } => {
            let snapshot = session
                .engine_mut()
                .apply(Command::SwitchCategory { index });
            session.save()?;
            print_json(&snapshot)
        }
    }
}
