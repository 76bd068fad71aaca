use clap::{Parser, Subcommand};
use missionbalance_core::{logging, Config};

mod commands;

#[derive(Parser)]
#[command(name = "missionbalance", version, about = "Mission Balance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full state snapshot as JSON
    Status,
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Category selection
    Category {
        #[command(subcommand)]
        action: commands::category::CategoryAction,
    },
    /// Categories, targets, tolerance and durations
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Print the balance verdict as JSON
    Balance,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Host the timer and minute sampler in the foreground
    Run,
    /// Print the data directory
    DataDir,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init(&config.logging);

    let result = match cli.command {
        Commands::Status => commands::status(&config),
        Commands::Timer { action } => commands::timer::run(action, &config),
        Commands::Category { action } => commands::category::run(action, &config),
        Commands::Settings { action } => commands::settings::run(action, &config),
        Commands::Balance => commands::balance(&config),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run => commands::run::run(&config),
        Commands::DataDir => commands::data_dir(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
