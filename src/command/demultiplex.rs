// This software is released under the MIT license.
// See file LICENSE for full license details.
use anyhow::{bail, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use crate::common::{DEFAULT_BARCODE_LENGTH, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PATH_RESULTS};
use crate::demux::{write_read_summary, Demultiplexer};
use crate::fileformat::{verify_input_fq_file, FastqReads, SampleTable};
use crate::runtime::{ExperimentLayout, OutputCompression, RunConfig};

#[derive(Args)]
pub struct DemultiplexCMD {
    #[arg(short = 'i', value_parser)]
    /// FASTQ file with pooled reads, optionally compressed
    pub path_in: PathBuf,

    #[arg(short = 's', value_parser)]
    /// Sample table: tab-separated sample name and barcode
    pub path_samples: PathBuf,

    #[arg(short = 'e', value_parser)]
    /// Experiment name; output goes to <output root>/<experiment>
    pub experiment: String,

    #[arg(short = 'o', value_parser = clap::value_parser!(PathBuf), default_value = DEFAULT_PATH_RESULTS)]
    /// Output root directory
    pub path_out: PathBuf,

    #[arg(long = "barcode-length", value_parser = clap::value_parser!(usize), default_value_t = DEFAULT_BARCODE_LENGTH)]
    pub barcode_length: usize,

    #[arg(long = "flush-every", value_parser = clap::value_parser!(usize), default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    /// Write buffered reads to disk after this many reads
    pub flush_threshold: usize,

    #[arg(long = "uncompressed")]
    /// Write plain FASTQ instead of gzip
    pub uncompressed: bool,
}

impl DemultiplexCMD {
    /// Run the commandline option.
    /// Splits the reads into one FASTQ per sample, by exact barcode prefix
    pub fn try_execute(&mut self) -> Result<()> {
        verify_input_fq_file(&self.path_in)?;

        let samples = SampleTable::from_path(&self.path_samples)?;
        if samples.is_empty() {
            bail!("No samples in {}", self.path_samples.display());
        }

        let config = RunConfig {
            barcode_length: self.barcode_length,
            flush_threshold: self.flush_threshold,
            compression: if self.uncompressed {
                OutputCompression::Plain
            } else {
                OutputCompression::Gzip
            },
            ..RunConfig::default()
        };
        let layout = ExperimentLayout::new(&self.path_out, &self.experiment)?;

        let reads = FastqReads::from_path(&self.path_in)?;
        let summary = Demultiplexer::to_files(&config, &samples, &layout)?.run(reads)?;
        write_read_summary(&layout.summary_path(), &summary, &samples)?;

        info!(
            "Demultiplex has finished succesfully: {} reads into {}",
            summary.processed,
            layout.raw_data_dir().display()
        );
        Ok(())
    }
}
