//! ptm CLI - personal goal and task metrics from a Workflowy outline.

use std::process;

use clap::Parser;
use ptm::cli::{Cli, Commands, ConfigCommands, GoalsCommands, SnapshotCommands, StatsCommands};
use ptm::commands::{self, Output};
use ptm::config::Config;
use ptm::storage::FileStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG; default off.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let human = cli.human_readable;

    if let Err(e) = run_command(cli) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(r#"{{"error": "{}"}}"#, e);
        }
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> Result<(), ptm::Error> {
    let human = cli.human_readable;
    let cached = cli.cached;

    let config = Config::load(cli.config_path.as_deref())?;
    let data_dir = config.data_dir(cli.data_dir.as_deref());
    let store = FileStore::new(&data_dir);

    match cli.command {
        Commands::Fetch { snapshot } => {
            output(&commands::fetch(&config, &store, cached, snapshot)?, human);
        }
        Commands::Today => {
            output(&commands::today(&config, &store, cached)?, human);
        }
        Commands::Goals { command } => match command {
            GoalsCommands::Active { all } => {
                output(&commands::goals_active(&config, &store, cached, all)?, human);
            }
            GoalsCommands::Finished { recent } => {
                output(
                    &commands::goals_finished(&config, &store, cached, recent)?,
                    human,
                );
            }
        },
        Commands::Stats { command } => match command {
            StatsCommands::Daily { days } => {
                output(&commands::stats_daily(&config, &store, cached, days)?, human);
            }
            StatsCommands::Weekly {
                completed_only,
                include_future,
                recent,
                goals,
            } => {
                output(
                    &commands::stats_weekly(
                        &config,
                        &store,
                        cached,
                        completed_only,
                        include_future,
                        recent,
                        goals,
                    )?,
                    human,
                );
            }
            StatsCommands::Monthly { goals } => {
                output(&commands::stats_monthly(&config, &store, cached, goals)?, human);
            }
        },
        Commands::Export => {
            output(&commands::export(&config, &store, cached)?, human);
        }
        Commands::Delta => {
            output(&commands::delta(&config, &store, cached)?, human);
        }
        Commands::Snapshot { command } => match command {
            SnapshotCommands::Save => {
                output(&commands::snapshot_save(&config, &store, cached)?, human);
            }
            SnapshotCommands::List => {
                output(&commands::snapshot_list(&store)?, human);
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                output(&commands::config_path(cli.config_path.as_deref()), human);
            }
            ConfigCommands::Show => {
                output(&commands::config_show(&config, &data_dir), human);
            }
        },
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
