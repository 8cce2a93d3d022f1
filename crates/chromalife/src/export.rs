use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use automaton::Grid;
use image::{ImageFormat, RgbImage};

/// Writes `grid` as an 8-bit RGB PNG, row 0 at the top.
pub fn write_png(grid: &Grid, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create export directory {}", parent.display()))?;
    }
    let image = RgbImage::from_raw(grid.width(), grid.height(), grid.to_rgb8())
        .ok_or_else(|| anyhow!("grid buffer does not match {}", grid.extent()))?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write PNG to {}", path.display()))?;
    tracing::info!(path = %path.display(), extent = %grid.extent(), "exported grid");
    Ok(())
}
