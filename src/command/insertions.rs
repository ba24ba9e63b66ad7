// This software is released under the MIT license.
// See file LICENSE for full license details.
use anyhow::Result;
use clap::Args;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::{DEFAULT_BARCODE_LENGTH, DEFAULT_PATH_RESULTS, DEFAULT_TN_ANCHOR};
use crate::fileformat::{
    verify_input_fq_file, write_insertion_table, write_segment_queries, ConstructFromPath,
    FastqAppenderFactory, FastqReads, SampleTable,
};
use crate::insertions::{extract_parallel, ExtractionResult, InsertionExtractor};
use crate::runtime::{ExperimentLayout, OutputCompression, RunConfig};
use crate::utils::convert_to_filename;

#[derive(Args)]
pub struct InsertionsCMD {
    #[arg(short = 'i', value_parser)]
    /// FASTQ file with reads, optionally compressed
    pub path_in: PathBuf,

    #[arg(short = 's', value_parser)]
    /// Optional sample table, to name barcodes and write aligner queries per sample
    pub path_samples: Option<PathBuf>,

    #[arg(short = 'e', value_parser)]
    /// Experiment name; output goes to <output root>/<experiment>
    pub experiment: String,

    #[arg(short = 'o', value_parser = clap::value_parser!(PathBuf), default_value = DEFAULT_PATH_RESULTS)]
    /// Output root directory
    pub path_out: PathBuf,

    #[arg(long = "barcode-length", value_parser = clap::value_parser!(usize), default_value_t = DEFAULT_BARCODE_LENGTH)]
    pub barcode_length: usize,

    #[arg(long = "tn-left", default_value = DEFAULT_TN_ANCHOR)]
    /// Flank of the left transposon end, following the TA
    pub tn_left: String,

    #[arg(long = "tn-right", default_value = DEFAULT_TN_ANCHOR)]
    /// Flank of the right transposon end, following the TA
    pub tn_right: String,

    #[arg(long = "trimmed")]
    /// Also write the genomic segment of every accepted read as FASTQ
    pub trimmed: bool,

    #[arg(short = '@', value_parser = clap::value_parser!(usize), default_value_t = 1)]
    /// Number of worker threads
    pub threads_work: usize,
}

impl InsertionsCMD {
    /// Run the commandline option.
    /// Counts transposon junctions per barcode and writes the insertion table
    pub fn try_execute(&mut self) -> Result<()> {
        verify_input_fq_file(&self.path_in)?;

        let samples = match &self.path_samples {
            Some(p) => Some(SampleTable::from_path(p)?),
            None => None,
        };

        let config = RunConfig {
            barcode_length: self.barcode_length,
            ..RunConfig::default()
        }
        .with_tn_ends(&self.tn_left, &self.tn_right)?;
        if let Some(samples) = &samples {
            samples.check_barcode_length(config.barcode_length)?;
        }
        let layout = ExperimentLayout::new(&self.path_out, &self.experiment)?;
        std::fs::create_dir_all(layout.experiment_dir())?;

        let extractor = Arc::new(InsertionExtractor::new(&config)?);
        let reads = FastqReads::from_path(&self.path_in)?;

        let result: ExtractionResult = if self.trimmed {
            if self.threads_work > 1 {
                warn!("Trimmed reads are written in input order; using a single thread");
            }
            let path_trimmed = layout.trimmed_path(&input_stem(&self.path_in));
            let sink = FastqAppenderFactory::new(OutputCompression::Plain)
                .new_from_path(&path_trimmed)?;
            info!("Writing trimmed reads to {}", path_trimmed.display());
            extractor.run_with_trimmed(reads, sink)?
        } else if self.threads_work > 1 {
            extract_parallel(&extractor, reads, self.threads_work)?
        } else {
            extractor.run(reads)?
        };

        write_insertion_table(&layout.insertions_path(), &result, samples.as_ref())?;
        if let Some(samples) = &samples {
            write_segment_queries(&layout, &result, samples)?;
        }

        info!("Insertions has finished succesfully");
        Ok(())
    }
}

/// File name without directory and extensions, made file-name safe
fn input_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = convert_to_filename(name.split('.').next().unwrap_or(""));
    if stem.is_empty() {
        "reads".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(dir: &Path, samples: &str) -> InsertionsCMD {
        let path_in = dir.join("reads.fastq");
        let seq = "ACGTAAAAAAAAAAAAAATAACAGGTTG";
        std::fs::write(
            &path_in,
            format!("@r1\n{}\n+\n{}\n", seq, "I".repeat(seq.len())),
        )
        .unwrap();
        let path_samples = dir.join("samples.txt");
        std::fs::write(&path_samples, samples).unwrap();
        InsertionsCMD {
            path_in,
            path_samples: Some(path_samples),
            experiment: "exp".to_string(),
            path_out: dir.join("results"),
            barcode_length: 4,
            tn_left: DEFAULT_TN_ANCHOR.to_string(),
            tn_right: DEFAULT_TN_ANCHOR.to_string(),
            trimmed: false,
            threads_work: 1,
        }
    }

    #[test]
    fn test_sample_barcode_length_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = cmd(dir.path(), "s1\tACGTA\n");
        let err = cmd.try_execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::runtime::Error>(),
            Some(crate::runtime::Error::InvalidConfig { .. })
        ));
        assert!(!dir.path().join("results/exp/insertions.tsv").exists());
    }

    #[test]
    fn test_samples_label_insertions() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = cmd(dir.path(), "s1\tACGT\n");
        cmd.try_execute().unwrap();
        let table =
            std::fs::read_to_string(dir.path().join("results/exp/insertions.tsv")).unwrap();
        assert!(table.contains("TnL\tACGT\ts1\tAAAAAAAAAAAAAATA\t16\t1\n"));
        assert!(dir.path().join("results/exp/s1_segments.fasta").exists());
    }

    #[test]
    fn test_input_stem() {
        assert_eq!(input_stem(Path::new("data/E001_01.fastq.gz")), "E001_01");
        assert_eq!(input_stem(Path::new("reads 2.fq")), "reads_2");
        assert_eq!(input_stem(Path::new(".fastq")), "reads");
    }
}
