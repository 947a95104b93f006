use std::path::Path;

use anyhow::{Context, Result};
use mocorr_core::deform::{Coefficients, DeformationModel};
use serde::{Deserialize, Serialize};

/// On-disk form of a deformation model: `coefficients = [[c0..c8], [c0..c8]]`,
/// y row first.
#[derive(Serialize, Deserialize)]
struct CoefficientsFile {
    coefficients: Coefficients,
}

pub fn save(model: &DeformationModel, path: &Path) -> Result<()> {
    let coefficients = *model
        .coefficients()
        .context("Deformation model has no coefficients to save")?;
    let toml_str = toml::to_string_pretty(&CoefficientsFile { coefficients })?;
    std::fs::write(path, toml_str)
        .with_context(|| format!("Failed to write coefficients to {}", path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<DeformationModel> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read coefficients {}", path.display()))?;
    let file: CoefficientsFile = toml::from_str(&contents).context("Invalid coefficients file")?;
    Ok(DeformationModel::from_coefficients(file.coefficients))
}
