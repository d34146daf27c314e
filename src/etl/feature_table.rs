use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::data::table::{Table, FEATURE_COLUMNS};
use crate::data::EditStreams;
use crate::errors::Result;
use crate::etl::read_records::{read_stream_file, StreamKind};
use crate::etl::{progress, remove_if_exists, Etl};
use crate::extract::FeatureExtractor;
use crate::index::EditIndex;
use crate::UserConfig;

pub const ETL_NAME: &str = "feature_table";

/// Reads both edit streams, whichever stage needs them. A missing current stream aborts the
/// run; a missing prior stream only means no edit has a predecessor.
pub fn extract_streams(config: &UserConfig) -> Result<EditStreams> {
    let current_path = config.current_path();
    if !current_path.try_exists()? {
        return Err(format!("Current-version input {} not found", current_path.display()).into());
    }
    let current = read_stream_file(&current_path, StreamKind::Current)?.records;

    let prior_path = config.prior_path();
    let prior = if prior_path.try_exists()? {
        read_stream_file(&prior_path, StreamKind::Prior)?.records
    } else {
        warn!(path = prior_path.display().to_string().as_str(); "Prior-version input not found, treating every edit as unmatched");
        Vec::new()
    };

    Ok(EditStreams { current, prior })
}

pub struct FeatureTableEtl<'a> {
    config: &'a UserConfig,
}

impl FeatureTableEtl<'_> {
    pub fn new(config: &UserConfig) -> FeatureTableEtl {
        FeatureTableEtl { config }
    }

    fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.config.feature_file)
    }

    /// Builds the sanitized feature table for already-read streams.
    pub fn build_table(streams: EditStreams, show_progress: bool) -> Table {
        let index = EditIndex::build(streams.prior, &streams.current);
        let extractor = FeatureExtractor::new(&index);

        let mut table = Table::new(&FEATURE_COLUMNS);
        for record in progress(&streams.current, show_progress) {
            table.push(&extractor.extract_row(record));
        }
        table
    }
}

impl Etl for FeatureTableEtl<'_> {
    type Input = EditStreams;
    type Output = Table;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(self.output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        remove_if_exists(&self.output_path(dir))
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        extract_streams(self.config)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        Ok(Self::build_table(input, self.config.show_progress))
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let path = self.output_path(dir);
        output.write_csv(BufWriter::new(File::create(&path)?))?;
        info!(etl_name = ETL_NAME, rows = output.len(), columns = output.columns().len(); "Wrote feature table");
        Ok(())
    }
}
