use anyhow::Result;
use clap::Args;
use std::path::Path;

#[derive(Args, Default)]
pub struct TuiArgs {
    /// Open the configuration form even when a config file exists
    #[arg(long)]
    pub reconfigure: bool,
}

pub async fn execute(args: TuiArgs, config_path: &Path) -> Result<()> {
    let runtime = tokio::runtime::Handle::current();
    tokio::task::block_in_place(|| crate::tui::run(config_path, args.reconfigure, runtime))
}
