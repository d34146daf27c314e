//! Turns OpenStreetMap edit streams into a numeric feature table for a gradient-boosted
//! classifier and a node/edge/label export for a graph model.
//!
//! Every edit is compared against the version right before it: tag changes, how the geometry
//! moved or resized, and the authoring context around it.

pub mod context;
pub mod data;
pub mod errors;
pub mod etl;
pub mod extract;
pub mod geometry;
pub mod graph;
pub mod index;

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Result;

fn default_current_file() -> String {
    "objects.jsonl".to_string()
}

fn default_prior_file() -> String {
    "object_versions.jsonl".to_string()
}

fn default_feature_file() -> String {
    "lgbm_features.csv".to_string()
}

fn default_export_graph() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub data_dir: String,
    #[serde(default = "default_current_file")]
    pub current_file: String,
    #[serde(default = "default_prior_file")]
    pub prior_file: String,
    pub output_dir: String,
    #[serde(default = "default_feature_file")]
    pub feature_file: String,
    #[serde(default = "default_export_graph")]
    pub export_graph: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub show_progress: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl UserConfig {
    pub fn current_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.current_file)
    }

    pub fn prior_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.prior_file)
    }
}

pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)
        .map_err(|err| format!("Could not open config file {}: {}", path.display(), err))?;
    Ok(serde_json::from_reader(file)?)
}
