use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};

use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_edit_features::errors::Result;
use osm_edit_features::etl::feature_table::FeatureTableEtl;
use osm_edit_features::etl::graph_export::GraphExportEtl;
use osm_edit_features::etl::Etl;
use osm_edit_features::{load_user_config, UserConfig};

const DEFAULT_CONFIG_PATH: &str = "config/features.json";

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = Path::new(&config.output_dir).to_path_buf();
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn run_stage<E: Etl>(etl: &mut E, dir: &Path, overwrite: bool) -> Result<()> {
    if overwrite {
        etl.clean(dir)?;
    }
    etl.process(dir)
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let user_config = load_user_config(Path::new(&config_path))?;
    setup_logging(&user_config.log_level);

    let output_dir = create_output_dir(&user_config)?;

    run_stage(&mut FeatureTableEtl::new(&user_config), &output_dir, user_config.overwrite)?;
    if user_config.export_graph {
        run_stage(&mut GraphExportEtl::new(&user_config), &output_dir, user_config.overwrite)?;
    }

    Ok(())
}
