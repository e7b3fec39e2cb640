//! Command-line interface for scoutdoc
//!
//! clap derive parsing with one module per subcommand; the wizard is the
//! default when no subcommand is given.

pub mod commands;
mod output;

pub use commands::Cli;
pub use output::Output;
