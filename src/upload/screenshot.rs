//! Screenshot capture through the `freeze` renderer

use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};

use crate::engine::catalog::AffectedAsset;

/// Renderer binary looked up on `PATH`
pub const RENDERER: &str = "freeze";

pub struct ScreenshotRenderer {
    program: PathBuf,
}

impl ScreenshotRenderer {
    /// None when the renderer is not installed
    pub fn locate() -> Option<Self> {
        which::which(RENDERER).ok().map(Self::new)
    }

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Render `input` as a windowed JSON code image at `output`
    pub async fn render(&self, input: &Path, output: &Path) -> Result<()> {
        let result = tokio::process::Command::new(&self.program)
            .arg(input)
            .arg("-o")
            .arg(output)
            .args(["--window", "--language", "json", "--border.radius", "8"])
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!("{} exited with {}: {}", RENDERER, result.status, stderr.trim());
        }
        Ok(())
    }
}

/// Write the asset list the screenshot is rendered from
pub fn write_assets(path: &Path, assets: &[AffectedAsset]) -> Result<()> {
    let content = serde_json::to_string_pretty(assets).context("Failed to serialize assets")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write screenshot input: {}", path.display()))
}

/// `data:` URI for a PNG image
pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}
