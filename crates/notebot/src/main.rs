// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notebot - turns chat messages into notes.
//!
//! This is the binary entry point. `serve` runs the whole pipeline in one
//! process; `dealer` and `downloader` run one consumer each against a
//! shared database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod failures;
mod local_notes;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use failures::ReplayTarget;
use serve::Role;

/// Notebot - turns chat messages into notes.
#[derive(Parser, Debug)]
#[command(name = "notebot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dealer and the downloader in one process.
    Serve,
    /// Run only the dealer.
    Dealer,
    /// Run only the downloader.
    Downloader,
    /// Inspect and replay dead-lettered events.
    Failures {
        #[command(subcommand)]
        action: FailuresCommands,
    },
    /// Show queue counts.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FailuresCommands {
    /// List failed events, newest first.
    List {
        /// Show at most this many.
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Re-enqueue a failed event.
    Replay {
        /// Failure id from `failures list`.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<i64>,
        /// Replay every failure.
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => notebot_config::load_and_validate_path(path),
        None => notebot_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            notebot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config, Role::All).await,
        Some(Commands::Dealer) => serve::run_serve(config, Role::Dealer).await,
        Some(Commands::Downloader) => serve::run_serve(config, Role::Downloader).await,
        Some(Commands::Failures { action }) => match action {
            FailuresCommands::List { limit, json } => {
                failures::run_list(&config, limit, json).await
            }
            FailuresCommands::Replay { id, all } => {
                let target = match id {
                    Some(id) if !all => ReplayTarget::One(id),
                    _ => ReplayTarget::All,
                };
                failures::run_replay(&config, target).await
            }
        },
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("notebot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = notebot_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "notebot");
    }

    #[test]
    fn replay_needs_an_id_or_all() {
        assert!(Cli::try_parse_from(["notebot", "failures", "replay"]).is_err());
        assert!(Cli::try_parse_from(["notebot", "failures", "replay", "7", "--all"]).is_err());

        let cli = Cli::try_parse_from(["notebot", "failures", "replay", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Failures {
                action: FailuresCommands::Replay { id: Some(7), all: false }
            })
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["notebot", "status", "--json", "--config", "/etc/nb.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/nb.toml")));
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
    }
}
