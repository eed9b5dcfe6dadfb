//! presence-card: renders status cards for a tracked set of users.
//!
//! Reads newline-delimited presence events, keeps the latest snapshot per
//! tracked user and writes a PNG card whenever one changes.
//!
//! ## Subcommands
//!
//! - `run`: Consume a presence feed (file or stdin) and write cards
//! - `render`: Render one snapshot JSON file to a PNG
//! - `template`: Export the generated background template

mod logging;
mod run;

use clap::{Parser, Subcommand};
use presence_core::{load_config, PresenceConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "presence-card")]
#[command(about = "Presence card renderer")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.presence-card/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to presence-card.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Skip profile lookups and avatar downloads
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume a presence feed and write a card per changed user
    Run {
        /// JSON array of user IDs to track
        #[arg(long, value_name = "FILE")]
        users: Option<PathBuf>,

        /// Newline-delimited presence events; `-` or absent reads stdin
        #[arg(long, value_name = "FILE")]
        feed: Option<PathBuf>,

        /// Directory cards are written to
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Render a single snapshot JSON file
    Render {
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Write the generated card template
    Template {
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn load_or_exit(path: Option<&Path>) -> PresenceConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let _logging_guard = match logging::init(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("presence-card: failed to initialize logging: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Run {
            users,
            feed,
            output_dir,
        } => {
            let config = load_or_exit(cli.config.as_deref());
            let options = run::RunOptions {
                users_file: users.unwrap_or_else(|| config.tracking.users_file.clone()),
                feed: feed.filter(|path| path.as_os_str() != "-"),
                output_dir: output_dir.unwrap_or_else(|| config.tracking.output_dir.clone()),
                offline: cli.offline,
                config,
            };
            if let Err(e) = run::run(options) {
                tracing::error!(error = %e, "presence-card run failed");
                std::process::exit(1);
            }
        }
        Commands::Render { snapshot, output } => {
            let config = load_or_exit(cli.config.as_deref());
            if let Err(e) = run::render_one(&config, &snapshot, &output, cli.offline) {
                tracing::error!(error = %e, "presence-card render failed");
                std::process::exit(1);
            }
        }
        Commands::Template { output } => {
            if let Err(e) = run::write_template(&output) {
                tracing::error!(error = %e, "presence-card template failed");
                std::process::exit(1);
            }
        }
    }
}
