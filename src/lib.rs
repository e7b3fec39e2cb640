//! # scoutdoc
//!
//! Turns ScoutSuite cloud audit results into Pwndoc findings.
//!
//! ## Features
//!
//! - **Report scanning**: discovers `scoutsuite_results_*.js` files and
//!   resolves the resources behind each finding
//! - **Live progress**: one worker thread per check feeding a single event bus
//! - **Interactive wizard**: configuration form, module selection and a
//!   gradient progress view in the terminal
//! - **Pwndoc upload**: narrative placeholders, screenshots and findings
//!   pushed to an existing audit
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the wizard
//! scoutdoc
//!
//! # Headless run of one check
//! scoutdoc run --module access-key-age --reports ./scout --format json
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod report;
pub mod tui;
pub mod upload;

pub use cli::{Cli, Output};
pub use config::WizardConfig;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
