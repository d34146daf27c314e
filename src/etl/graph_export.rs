use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::info;

use crate::data::EditStreams;
use crate::errors::Result;
use crate::etl::feature_table::extract_streams;
use crate::etl::{progress, remove_if_exists, Etl};
use crate::extract::FeatureExtractor;
use crate::graph::{build_edges, write_edges, GraphTables};
use crate::index::EditIndex;
use crate::UserConfig;

pub const ETL_NAME: &str = "graph_export";
pub const NODES_FILE_NAME: &str = "nodes.csv";
pub const EDGES_FILE_NAME: &str = "edges.csv";
pub const LABELS_FILE_NAME: &str = "labels.csv";

static OUTPUT_FILE_NAMES: [&str; 3] = [NODES_FILE_NAME, EDGES_FILE_NAME, LABELS_FILE_NAME];

pub struct GraphExportEtl<'a> {
    config: &'a UserConfig,
}

impl GraphExportEtl<'_> {
    pub fn new(config: &UserConfig) -> GraphExportEtl {
        GraphExportEtl { config }
    }

    fn output_paths(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
        OUTPUT_FILE_NAMES.iter().map(move |name| dir.join(name))
    }

    pub fn build_tables(streams: EditStreams, show_progress: bool) -> GraphTables {
        let index = EditIndex::build(streams.prior, &streams.current);
        let extractor = FeatureExtractor::new(&index);

        let mut tables = GraphTables::new();
        for record in progress(&streams.current, show_progress) {
            tables.push(&extractor.diff(record));
        }
        tables.edges = build_edges(&streams.current);
        tables
    }
}

impl Etl for GraphExportEtl<'_> {
    type Input = EditStreams;
    type Output = GraphTables;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        for path in Self::output_paths(dir) {
            if !path.try_exists()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        for path in Self::output_paths(dir) {
            remove_if_exists(&path)?;
        }
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        extract_streams(self.config)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        Ok(Self::build_tables(input, self.config.show_progress))
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        output.nodes.write_csv(BufWriter::new(File::create(dir.join(NODES_FILE_NAME))?))?;
        write_edges(&output.edges, BufWriter::new(File::create(dir.join(EDGES_FILE_NAME))?))?;
        output.labels.write_csv(BufWriter::new(File::create(dir.join(LABELS_FILE_NAME))?))?;
        info!(
            etl_name = ETL_NAME,
            nodes = output.nodes.len(),
            edges = output.edges.len();
            "Wrote graph tables"
        );
        Ok(())
    }
}
