use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::{
    DEFAULT_BARCODE_LENGTH, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_TN_ANCHOR, DIR_RAW_DATA, FILENAME_INSERTIONS, FILENAME_SUMMARY, MAX_ANCHOR_LENGTH,
};
use crate::runtime::{Error, Result};
use crate::utils::convert_to_filename;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputCompression {
    Gzip,
    Plain,
}

impl OutputCompression {
    pub fn fastq_extension(&self) -> &'static str {
        match self {
            OutputCompression::Gzip => "fastq.gz",
            OutputCompression::Plain => "fastq",
        }
    }
}

///////////////////////////////
/// Settings for one run. Built once, then only ever borrowed
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub barcode_length: usize,
    pub flush_threshold: usize,
    pub progress_interval: u64,
    pub tn_left: String,
    pub tn_right: String,
    pub compression: OutputCompression,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            barcode_length: DEFAULT_BARCODE_LENGTH,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            tn_left: DEFAULT_TN_ANCHOR.to_string(),
            tn_right: DEFAULT_TN_ANCHOR.to_string(),
            compression: OutputCompression::Gzip,
        }
    }
}

impl RunConfig {
    /// Set both transposon ends; anchors are stored uppercase
    pub fn with_tn_ends(mut self, left: &str, right: &str) -> Result<RunConfig> {
        self.tn_left = left.trim().to_uppercase();
        self.tn_right = right.trim().to_uppercase();
        self.validate()?;
        Ok(self)
    }

    pub fn same_tn_ends(&self) -> bool {
        self.tn_left == self.tn_right
    }

    pub fn validate(&self) -> Result<()> {
        if self.barcode_length == 0 {
            return Err(Error::invalid_config("barcode length must be at least 1"));
        }
        if self.flush_threshold == 0 {
            return Err(Error::invalid_config("flush threshold must be at least 1"));
        }
        if self.progress_interval == 0 {
            return Err(Error::invalid_config("progress interval must be at least 1"));
        }
        for (end, anchor) in [("left", &self.tn_left), ("right", &self.tn_right)] {
            if anchor.is_empty() {
                return Err(Error::invalid_config(format!(
                    "{} transposon end is empty",
                    end
                )));
            }
            if anchor.len() > MAX_ANCHOR_LENGTH {
                return Err(Error::invalid_config(format!(
                    "{} transposon end is longer than {} bases",
                    end, MAX_ANCHOR_LENGTH
                )));
            }
            if let Some(c) = anchor.chars().find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T')) {
                return Err(Error::invalid_config(format!(
                    "unexpected non-DNA base '{}' in {} transposon end {}",
                    c, end, anchor
                )));
            }
        }
        Ok(())
    }
}

///////////////////////////////
/// All output paths of one experiment: <root>/<experiment>/...
#[derive(Clone, Debug)]
pub struct ExperimentLayout {
    root: PathBuf,
    experiment: String,
}

impl ExperimentLayout {
    pub fn new<P: AsRef<Path>>(root: P, experiment_name: &str) -> Result<ExperimentLayout> {
        let experiment = convert_to_filename(experiment_name);
        if experiment.is_empty() {
            return Err(Error::invalid_config(format!(
                "experiment name '{}' has no usable characters",
                experiment_name
            )));
        }
        Ok(ExperimentLayout {
            root: root.as_ref().to_path_buf(),
            experiment,
        })
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    pub fn raw_data_dir(&self) -> PathBuf {
        self.experiment_dir().join(DIR_RAW_DATA)
    }

    pub fn demultiplexed_path(&self, sample: &str, compression: OutputCompression) -> PathBuf {
        self.raw_data_dir()
            .join(format!("{}.{}", sample, compression.fastq_extension()))
    }

    pub fn trimmed_path(&self, stem: &str) -> PathBuf {
        self.experiment_dir().join(format!("{}_trimmed.fastq", stem))
    }

    pub fn segments_path(&self, stem: &str) -> PathBuf {
        self.experiment_dir().join(format!("{}_segments.fasta", stem))
    }

    pub fn insertions_path(&self) -> PathBuf {
        self.experiment_dir().join(FILENAME_INSERTIONS)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.experiment_dir().join(FILENAME_SUMMARY)
    }
}

///////////////////////////////
/// Shared flag asking a streaming loop to stop pulling reads
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.same_tn_ends());
        assert_eq!(config.barcode_length, 4);
        assert_eq!(config.flush_threshold, 1_000_000);
    }

    #[test]
    fn test_tn_ends_are_checked() {
        let config = RunConfig::default().with_tn_ends("acaggttg", "ACAGGTTA").unwrap();
        assert_eq!(config.tn_left, "ACAGGTTG");
        assert!(!config.same_tn_ends());

        assert!(RunConfig::default().with_tn_ends("ACAGNTTG", "ACAGGTTG").is_err());
        assert!(RunConfig::default().with_tn_ends("", "ACAGGTTG").is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = RunConfig {
            flush_threshold: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_layout_paths() {
        let layout = ExperimentLayout::new("results", "My experiment!").unwrap();
        assert_eq!(layout.experiment(), "My_experiment");
        assert_eq!(
            layout.demultiplexed_path("E001_01", OutputCompression::Gzip),
            PathBuf::from("results/My_experiment/raw_data/E001_01.fastq.gz")
        );
        assert_eq!(
            layout.trimmed_path("E001_01"),
            PathBuf::from("results/My_experiment/E001_01_trimmed.fastq")
        );
        assert!(ExperimentLayout::new("results", "???").is_err());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }
}
