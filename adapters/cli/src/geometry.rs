//! Tissue geometry files consumed by the driver.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use lungsim_core::{GridShape, TissueGrid};
use serde::Deserialize;

/// Tissue codes laid out x-fastest over a `[x, y, z]` grid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GeometryFile {
    shape: [u32; 3],
    codes: Vec<i32>,
}

impl GeometryFile {
    pub(crate) fn parse(document: &str) -> Result<Self> {
        serde_json::from_str(document).context("geometry is not a valid `{ shape, codes }` document")
    }

    pub(crate) fn into_tissue(self) -> Result<TissueGrid> {
        let [x, y, z] = self.shape;
        TissueGrid::from_codes(GridShape::new(x, y, z), &self.codes)
            .context("geometry does not describe a valid tissue grid")
    }
}

pub(crate) fn load(path: &Path) -> Result<TissueGrid> {
    let document = fs::read_to_string(path)
        .with_context(|| format!("failed to read geometry {}", path.display()))?;
    GeometryFile::parse(&document)?
        .into_tissue()
        .with_context(|| format!("invalid geometry {}", path.display()))
}
