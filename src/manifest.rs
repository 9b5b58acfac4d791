use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::util;

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Run name -> run entry. BTreeMap keeps key order stable between regenerations.
pub type Manifest = BTreeMap<String, RunEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub folder: String,
    pub frames: Vec<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,
    pub start_frame: i64,
    pub end_frame: i64,
}

pub fn to_json(manifest: &Manifest) -> Result<String> {
    // serde_json's pretty printer indents with two spaces.
    serde_json::to_string_pretty(manifest).context("failed to serialize manifest")
}

pub fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let json = to_json(manifest)?;
    util::write_replace(path, json.as_bytes())
        .with_context(|| format!("failed to write manifest {:?}", path))
}

pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {:?}", path))?;
    serde_json::from_str(&data).with_context(|| format!("invalid manifest JSON in {:?}", path))
}
