use anyhow::Result;
use clap::Args;

use crate::cli::Output;
use crate::engine::builtin_modules;
use crate::engine::catalog::ModuleProcedure;

#[derive(Args)]
pub struct ModulesArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn execute(args: ModulesArgs) -> Result<()> {
    let modules = builtin_modules();

    match args.format.to_lowercase().as_str() {
        "json" => {
            let listing: Vec<serde_json::Value> = modules
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "name": m.name,
                        "description": m.description,
                        "finding_template": m.finding_template,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        "text" => {
            let output = Output::new(false);
            output.header("Available modules");
            for module in &modules {
                let source = match module.procedure {
                    ModuleProcedure::ReportScan { .. } => "reports",
                    ModuleProcedure::Simulated { .. } => "simulated",
                };
                output.table_row(module.id, &format!("{} ({})", module.name, source));
                output.indent(module.description);
            }
        }
        other => anyhow::bail!("Unsupported format: {}. Use text or json", other),
    }
    Ok(())
}
