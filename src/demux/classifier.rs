use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::fs;

use super::buckets::BucketSet;
use super::flush::{FlushController, FlushEvent};
use crate::common::{FastqRead, BUCKET_OTHER};
use crate::fileformat::{
    BucketSink, ConstructFromPath, FastqAppender, FastqAppenderFactory, SampleTable,
};
use crate::runtime::{CancelToken, Error, ExperimentLayout, Result, RunConfig};

/// Outcome of matching one read against the sample barcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Classified(usize),
    Unmatched,
}

///////////////////////////////
/// Exact-prefix lookup barcode -> bucket. Bucket i is sample i of the table; the last bucket
/// is `_other`
#[derive(Debug, Clone)]
pub struct BarcodeIndex {
    barcode_length: usize,
    map_barcode_to_bucket: FxHashMap<Vec<u8>, usize>,
    bucket_names: Vec<String>,
}

impl BarcodeIndex {
    pub fn new(samples: &SampleTable, barcode_length: usize) -> Result<BarcodeIndex> {
        samples.check_barcode_length(barcode_length)?;

        let mut map_barcode_to_bucket = FxHashMap::default();
        let mut bucket_names = Vec::with_capacity(samples.len() + 1);
        for (i, sample) in samples.iter().enumerate() {
            map_barcode_to_bucket.insert(sample.barcode.as_bytes().to_vec(), i);
            bucket_names.push(sample.name.clone());
        }
        bucket_names.push(BUCKET_OTHER.to_string());

        Ok(BarcodeIndex {
            barcode_length,
            map_barcode_to_bucket,
            bucket_names,
        })
    }

    /// Reads shorter than the barcode are unmatched
    pub fn classify(&self, seq: &[u8]) -> Classification {
        match seq
            .get(..self.barcode_length)
            .and_then(|bc| self.map_barcode_to_bucket.get(bc))
        {
            Some(&bucket) => Classification::Classified(bucket),
            None => Classification::Unmatched,
        }
    }

    pub fn bucket_of(&self, classification: Classification) -> usize {
        match classification {
            Classification::Classified(bucket) => bucket,
            Classification::Unmatched => self.other_bucket(),
        }
    }

    pub fn other_bucket(&self) -> usize {
        self.bucket_names.len() - 1
    }

    pub fn bucket_names(&self) -> &[String] {
        &self.bucket_names
    }
}

///////////////////////////////
/// What happened during one demultiplexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxSummary {
    pub processed: u64,
    /// (bucket name, reads) in sample-table order, `_other` last
    pub bucket_counts: Vec<(String, u64)>,
    pub flushes: Vec<FlushEvent>,
    /// Stopped early on request; the output holds every read pulled before that
    pub cancelled: bool,
}

impl DemuxSummary {
    pub fn count_for(&self, bucket: &str) -> Option<u64> {
        self.bucket_counts
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, n)| *n)
    }
}

///////////////////////////////
/// Routes each read to the bucket of its barcode and flushes buckets to their sinks
pub struct Demultiplexer<'a, S: BucketSink> {
    config: &'a RunConfig,
    index: BarcodeIndex,
    buckets: BucketSet<S>,
    cancel: Option<CancelToken>,
}

impl<'a> Demultiplexer<'a, FastqAppender> {
    /// One FASTQ per sample plus `_other`, under the raw data directory of the experiment.
    /// Existing outputs are truncated
    pub fn to_files(
        config: &'a RunConfig,
        samples: &SampleTable,
        layout: &ExperimentLayout,
    ) -> Result<Self> {
        let dir = layout.raw_data_dir();
        fs::create_dir_all(&dir).map_err(|e| Error::file_not_valid(&dir, Some(e.to_string())))?;

        let factory = FastqAppenderFactory::new(config.compression);
        Demultiplexer::with_sinks(config, samples, |name| {
            let path = layout.demultiplexed_path(name, config.compression);
            debug!("Output for bucket {}: {}", name, path.display());
            factory.new_from_path(&path)
        })
    }
}

impl<'a, S: BucketSink> Demultiplexer<'a, S> {
    /// `make_sink` is called once per bucket name, samples first, then `_other`
    pub fn with_sinks<F>(
        config: &'a RunConfig,
        samples: &SampleTable,
        mut make_sink: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Result<S>,
    {
        config.validate()?;
        let index = BarcodeIndex::new(samples, config.barcode_length)?;

        let mut buckets = BucketSet::new();
        for name in index.bucket_names() {
            buckets.add_bucket(name, make_sink(name)?);
        }

        Ok(Demultiplexer {
            config,
            index,
            buckets,
            cancel: None,
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn index(&self) -> &BarcodeIndex {
        &self.index
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.is_cancelled())
    }

    /// Classify every read of the stream. The stream is consumed once; buckets are flushed
    /// every `flush_threshold` reads and once at the end
    pub fn run<I>(mut self, reads: I) -> Result<DemuxSummary>
    where
        I: IntoIterator<Item = Result<FastqRead>>,
    {
        info!(
            "Demultiplexing into {} buckets, flushing every {} reads",
            self.buckets.len(),
            self.config.flush_threshold
        );
        let mut controller = FlushController::new(self.config.flush_threshold)?;
        let mut reads = reads.into_iter();
        let mut cancelled = false;

        loop {
            if self.is_cancelled() {
                warn!(
                    "Demultiplexing cancelled after {} reads; output is partial",
                    controller.processed()
                );
                cancelled = true;
                break;
            }
            let read = match reads.next() {
                Some(read) => read?,
                None => break,
            };

            let bucket = self.index.bucket_of(self.index.classify(read.seq()));
            self.buckets.push(bucket, read);
            controller.record(&mut self.buckets)?;
        }
        controller.finish(&mut self.buckets)?;

        let summary = DemuxSummary {
            processed: controller.processed(),
            bucket_counts: self.buckets.totals(),
            flushes: controller.into_history(),
            cancelled,
        };
        for (name, n) in summary.bucket_counts.iter() {
            info!("{}: {} reads", name, n);
        }
        Ok(summary)
    }
}
