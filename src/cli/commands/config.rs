use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use crate::cli::Output;
use crate::config::{FIELDS, WizardConfig};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Display the merged configuration (defaults, file, environment)
    Show {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Print passwords and keys instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
    /// Validate every configuration field
    Validate,
}

pub async fn execute(args: ConfigArgs, config_path: &Path, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);

    match args.command {
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, pass --force to overwrite it",
                    config_path.display()
                );
            }
            WizardConfig::default().save_to_file(config_path)?;
            output.success(&format!("Created {} with default settings", config_path.display()));
        }
        ConfigCommand::Show { format, show_secrets } => {
            let config = WizardConfig::load(config_path)?;

            match format.to_lowercase().as_str() {
                "json" => {
                    let mut value = serde_json::to_value(&config)?;
                    if !show_secrets {
                        if let Some(object) = value.as_object_mut() {
                            for field in FIELDS.iter().filter(|f| f.secret) {
                                if let Some(entry) = object.get_mut(field.key_name) {
                                    *entry = mask(&config.value(field.key)).into();
                                }
                            }
                        }
                    }
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                "text" => {
                    output.header(&format!("Configuration ({})", config_path.display()));
                    for field in FIELDS {
                        let value = config.value(field.key);
                        let hidden = field.secret && !show_secrets;
                        let shown = if hidden { mask(&value) } else { value };
                        output.table_row(field.label, &shown);
                    }
                }
                other => anyhow::bail!("Unsupported format: {}. Use text or json", other),
            }
        }
        ConfigCommand::Validate => {
            let config = WizardConfig::load(config_path)?;
            match config.validate() {
                Ok(()) => output.success("Configuration is valid"),
                Err(e) => {
                    output.error("Configuration is invalid");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}

fn mask(value: &str) -> String {
    "*".repeat(value.chars().count())
}
