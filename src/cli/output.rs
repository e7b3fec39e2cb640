//! Styled terminal output for the headless commands

use console::style;

/// Output handler for consistent CLI formatting
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are shown even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<30} {}", style(key).dim(), value);
        }
    }

    pub fn indent(&self, message: &str) {
        if !self.quiet {
            println!("    {}", message);
        }
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            println!();
        }
    }
}
