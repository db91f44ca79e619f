//! CLI argument definitions for ptm.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ptm - personal goal and task metrics from a Workflowy outline.
///
/// Start with `ptm fetch` to pull the outline, then `ptm goals active`
/// or `ptm stats daily` to see where things stand.
#[derive(Parser, Debug)]
#[command(name = "ptm")]
#[command(author, version, about = "Personal goal and task metrics from a Workflowy outline", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (", env!("PTM_GIT_COMMIT"), " ", env!("PTM_BUILD_TIMESTAMP"), ")"
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Serve from the cached endpoint responses instead of the network
    #[arg(long, global = true)]
    pub cached: bool,

    /// Data directory for cached responses and snapshots.
    /// Can also be set via the PTM_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "PTM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file path.
    /// Can also be set via the PTM_CONFIG environment variable.
    #[arg(long = "config", global = true, env = "PTM_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh the cached endpoint responses from the service
    Fetch {
        /// Also save a history snapshot of the tree response
        #[arg(long)]
        snapshot: bool,
    },

    /// Active tasks due today or earlier
    Today,

    /// Goal views
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },

    /// Completion statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },

    /// Flattened per-task rows for table export
    Export,

    /// Compare the current outline against the most recent snapshot
    Delta,

    /// Snapshot history management
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Goal view commands
#[derive(Subcommand, Debug)]
pub enum GoalsCommands {
    /// Goals without a completion date, ordered by due date
    Active {
        /// Include goals due beyond the coming Sunday (and undated ones)
        #[arg(long)]
        all: bool,
    },

    /// Completed goals grouped by week
    Finished {
        /// How many recent weeks to show
        #[arg(long, default_value_t = 8)]
        recent: usize,
    },
}

/// Statistics commands
#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Zero-filled trailing daily window of due tasks
    Daily {
        /// Window length in days, ending today
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Weekly bucket counts and story-point sums
    Weekly {
        /// Only count tasks with a completion date
        #[arg(long)]
        completed_only: bool,

        /// Keep weeks that start after today
        #[arg(long)]
        include_future: bool,

        /// How many recent weeks to show
        #[arg(long, default_value_t = 8)]
        recent: usize,

        /// Restrict to goal tasks
        #[arg(long)]
        goals: bool,
    },

    /// Monthly completed counts and story-point sums
    Monthly {
        /// Restrict to goal tasks
        #[arg(long)]
        goals: bool,
    },
}

/// Snapshot commands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Save a snapshot of the current tree response
    Save,

    /// List saved snapshot keys, most recent first
    List,
}

/// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print where the config file is read from
    Path,

    /// Print the effective configuration (cookie redacted)
    Show,
}
