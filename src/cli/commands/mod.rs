use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::CONFIG_FILE;

pub mod config;
pub mod modules;
pub mod run;
pub mod tui;

/// Log file used while the wizard owns the terminal
pub const TUI_LOG_FILE: &str = "scoutdoc.log";

#[derive(Parser)]
#[command(
    name = "scoutdoc",
    version = crate::VERSION,
    about = "Turn ScoutSuite reports into Pwndoc findings",
    long_about = "scoutdoc scans ScoutSuite result files for affected cloud assets, shows live \
                  progress per check and uploads narratives, screenshots and findings to a \
                  Pwndoc audit."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive wizard (default)
    Tui(tui::TuiArgs),
    /// Run modules without the wizard and print their results
    Run(run::RunArgs),
    /// List available modules
    Modules(modules::ModulesArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let command = self.command.unwrap_or(Commands::Tui(tui::TuiArgs::default()));

        match command {
            Commands::Tui(args) => {
                let target = LogTarget::File(PathBuf::from(TUI_LOG_FILE));
                setup_logging(self.verbose, self.quiet, target);
                tui::execute(args, &self.config).await
            }
            Commands::Run(args) => {
                setup_logging(self.verbose, self.quiet, LogTarget::Stderr);
                run::execute(args, &self.config, self.quiet).await
            }
            Commands::Modules(args) => {
                setup_logging(self.verbose, self.quiet, LogTarget::Stderr);
                modules::execute(args).await
            }
            Commands::Config(args) => {
                setup_logging(self.verbose, self.quiet, LogTarget::Stderr);
                config::execute(args, &self.config, self.quiet).await
            }
        }
    }
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn setup_logging(verbose: u8, quiet: bool, target: LogTarget) {
    if quiet {
        return;
    }

    // Keep the directory walker quiet below -vvv
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info,ignore=warn,reqwest=warn"),
        2 => EnvFilter::new("debug,ignore=warn,hyper_util=info"),
        _ => EnvFilter::new("trace"),
    });

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => match File::create(&path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            Err(e) => eprintln!("Logging disabled, cannot create {}: {}", path.display(), e),
        },
    }
}
