use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::Range;

use super::junction::{JunctionFinder, JunctionOutcome};
use crate::common::FastqRead;
use crate::demux::{BucketSet, FlushController, FlushEvent};
use crate::fileformat::BucketSink;
use crate::runtime::{CancelToken, Result, RunConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TnEnd {
    Left,
    Right,
}

impl TnEnd {
    pub fn label(&self) -> &'static str {
        match self {
            TnEnd::Left => "TnL",
            TnEnd::Right => "TnR",
        }
    }
}

impl std::fmt::Display for TnEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

///////////////////////////////
/// barcode -> genomic segment -> number of reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertionCounts {
    map_barcode_segments: FxHashMap<Vec<u8>, FxHashMap<Vec<u8>, u64>>,
}

impl InsertionCounts {
    pub fn new() -> InsertionCounts {
        InsertionCounts::default()
    }

    pub fn increment(&mut self, barcode: &[u8], segment: &[u8]) {
        self.add(barcode, segment, 1);
    }

    fn add(&mut self, barcode: &[u8], segment: &[u8], n: u64) {
        //Avoid allocating keys for entries that already exist; this is the hot path
        let segments = match self.map_barcode_segments.get_mut(barcode) {
            Some(segments) => segments,
            None => self
                .map_barcode_segments
                .entry(barcode.to_vec())
                .or_default(),
        };
        match segments.get_mut(segment) {
            Some(count) => *count += n,
            None => {
                segments.insert(segment.to_vec(), n);
            }
        }
    }

    pub fn get(&self, barcode: &[u8], segment: &[u8]) -> u64 {
        self.map_barcode_segments
            .get(barcode)
            .and_then(|s| s.get(segment))
            .copied()
            .unwrap_or(0)
    }

    pub fn num_barcodes(&self) -> usize {
        self.map_barcode_segments.len()
    }

    pub fn num_distinct(&self) -> usize {
        self.map_barcode_segments.values().map(|s| s.len()).sum()
    }

    pub fn total(&self) -> u64 {
        self.map_barcode_segments
            .values()
            .flat_map(|s| s.values())
            .sum()
    }

    pub fn contains_barcode(&self, barcode: &[u8]) -> bool {
        self.map_barcode_segments.contains_key(barcode)
    }

    /// (segment, count) of one barcode, sorted by segment
    pub fn segments(&self, barcode: &[u8]) -> Vec<(&[u8], u64)> {
        let mut out: Vec<(&[u8], u64)> = self
            .map_barcode_segments
            .get(barcode)
            .map(|s| s.iter().map(|(seg, n)| (seg.as_slice(), *n)).collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Barcodes in sorted order
    pub fn barcodes(&self) -> Vec<&[u8]> {
        let mut out: Vec<&[u8]> = self
            .map_barcode_segments
            .keys()
            .map(|b| b.as_slice())
            .collect();
        out.sort();
        out
    }

    /// Fold another count map into this one
    pub fn merge(&mut self, other: InsertionCounts) {
        for (barcode, segments) in other.map_barcode_segments {
            for (segment, n) in segments {
                self.add(&barcode, &segment, n);
            }
        }
    }

    /// Ordered, string-keyed copy; handy for reporting and comparisons
    pub fn to_sorted(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        self.map_barcode_segments
            .iter()
            .map(|(barcode, segments)| {
                (
                    String::from_utf8_lossy(barcode).into_owned(),
                    segments
                        .iter()
                        .map(|(s, n)| (String::from_utf8_lossy(s).into_owned(), *n))
                        .collect(),
                )
            })
            .collect()
    }
}

/// Reads that did not yield a junction, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectCounts {
    pub too_short: u64,
    pub no_anchor: u64,
    pub outside_window: u64,
}

///////////////////////////////
/// Aggregated junctions of one pass over a read stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub left: InsertionCounts,
    /// Only kept when the two transposon ends differ
    pub right: Option<InsertionCounts>,
    pub processed: u64,
    pub accepted: u64,
    pub rejected: RejectCounts,
    pub flushes: Vec<FlushEvent>,
    pub cancelled: bool,
}

impl ExtractionResult {
    pub fn new(same_tn_ends: bool) -> ExtractionResult {
        ExtractionResult {
            left: InsertionCounts::new(),
            right: if same_tn_ends {
                None
            } else {
                Some(InsertionCounts::new())
            },
            processed: 0,
            accepted: 0,
            rejected: RejectCounts::default(),
            flushes: Vec::new(),
            cancelled: false,
        }
    }

    pub fn counts(&self, end: TnEnd) -> Option<&InsertionCounts> {
        match end {
            TnEnd::Left => Some(&self.left),
            TnEnd::Right => self.right.as_ref(),
        }
    }

    fn counts_mut(&mut self, end: TnEnd) -> &mut InsertionCounts {
        match (end, self.right.as_mut()) {
            (TnEnd::Right, Some(right)) => right,
            _ => &mut self.left,
        }
    }

    /// Each kept end with its counts
    pub fn ends(&self) -> Vec<(TnEnd, &InsertionCounts)> {
        let mut out = vec![(TnEnd::Left, &self.left)];
        if let Some(right) = &self.right {
            out.push((TnEnd::Right, right));
        }
        out
    }

    pub fn is_asymmetric(&self) -> bool {
        self.right.is_some()
    }

    /// Combine the partial result of another worker
    pub fn merge(&mut self, other: ExtractionResult) {
        self.left.merge(other.left);
        if let (Some(mine), Some(theirs)) = (self.right.as_mut(), other.right) {
            mine.merge(theirs);
        }
        self.processed += other.processed;
        self.accepted += other.accepted;
        self.rejected.too_short += other.rejected.too_short;
        self.rejected.no_anchor += other.rejected.no_anchor;
        self.rejected.outside_window += other.rejected.outside_window;
        self.cancelled |= other.cancelled;
    }
}

///////////////////////////////
/// Locates transposon junctions and counts genomic segments per barcode
pub struct InsertionExtractor {
    finders: Vec<(TnEnd, JunctionFinder)>,
    barcode_length: usize,
    same_tn_ends: bool,
    flush_threshold: usize,
    progress_interval: u64,
    cancel: Option<CancelToken>,
}

impl InsertionExtractor {
    pub fn new(config: &RunConfig) -> Result<InsertionExtractor> {
        config.validate()?;
        let mut finders = vec![(
            TnEnd::Left,
            JunctionFinder::new(config.barcode_length, &config.tn_left),
        )];
        if !config.same_tn_ends() {
            finders.push((
                TnEnd::Right,
                JunctionFinder::new(config.barcode_length, &config.tn_right),
            ));
        }
        Ok(InsertionExtractor {
            finders,
            barcode_length: config.barcode_length,
            same_tn_ends: config.same_tn_ends(),
            flush_threshold: config.flush_threshold,
            progress_interval: config.progress_interval,
            cancel: None,
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn barcode_length(&self) -> usize {
        self.barcode_length
    }

    pub fn same_tn_ends(&self) -> bool {
        self.same_tn_ends
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |c| c.is_cancelled())
    }

    /// Try the ends in order; the first one accepting the read wins. Otherwise the rejection
    /// of the last end tried is reported
    pub fn examine<'a>(&self, seq: &'a [u8]) -> (TnEnd, JunctionOutcome<'a>) {
        let mut last = (TnEnd::Left, JunctionOutcome::NoAnchor);
        for (end, finder) in self.finders.iter() {
            let outcome = finder.find(seq);
            if outcome.is_accepted() {
                return (*end, outcome);
            }
            last = (*end, outcome);
        }
        last
    }

    /// Count one read into `result`; returns the segment position if it was accepted
    pub fn tally(&self, seq: &[u8], result: &mut ExtractionResult) -> Option<Range<usize>> {
        result.processed += 1;
        match self.examine(seq) {
            (end, JunctionOutcome::Accepted(junction)) => {
                result
                    .counts_mut(end)
                    .increment(junction.barcode, junction.segment);
                result.accepted += 1;
                Some(junction.range)
            }
            (_, JunctionOutcome::TooShort) => {
                result.rejected.too_short += 1;
                None
            }
            (_, JunctionOutcome::NoAnchor) => {
                result.rejected.no_anchor += 1;
                None
            }
            (_, JunctionOutcome::OutsideWindow { .. }) => {
                result.rejected.outside_window += 1;
                None
            }
        }
    }

    /// One pass over the stream, aggregating only
    pub fn run<I>(&self, reads: I) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = Result<FastqRead>>,
    {
        self.run_inner::<I, Box<dyn BucketSink>>(reads, None)
    }

    /// One pass over the stream, also writing the trimmed genomic segment of every accepted
    /// read (sequence and quality) to `trimmed`
    pub fn run_with_trimmed<I, S>(&self, reads: I, trimmed: S) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = Result<FastqRead>>,
        S: BucketSink,
    {
        self.run_inner(reads, Some(trimmed))
    }

    fn run_inner<I, S>(&self, reads: I, trimmed: Option<S>) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = Result<FastqRead>>,
        S: BucketSink,
    {
        let mut result = ExtractionResult::new(self.same_tn_ends);

        //Without trimmed output the bucket set is empty and flushes only report progress
        let mut buffers: BucketSet<S> = BucketSet::new();
        let trimmed_bucket = trimmed.map(|sink| buffers.add_bucket("trimmed", sink));
        let mut controller = FlushController::new(self.flush_threshold)?;

        let mut reads = reads.into_iter();
        loop {
            if self.is_cancelled() {
                warn!(
                    "Junction extraction cancelled after {} reads; counts are partial",
                    result.processed
                );
                result.cancelled = true;
                break;
            }
            let read = match reads.next() {
                Some(read) => read?,
                None => break,
            };

            let accepted = self.tally(read.seq(), &mut result);
            if let (Some(bucket), Some(range)) = (trimmed_bucket, accepted) {
                if let Some(trimmed_read) = read.slice(range) {
                    buffers.push(bucket, trimmed_read);
                }
            }
            controller.record(&mut buffers)?;
        }
        controller.finish(&mut buffers)?;
        result.flushes = controller.into_history();

        info!(
            "Junctions: {} of {} reads accepted, {} distinct segments",
            result.accepted,
            result.processed,
            result.ends().iter().map(|(_, c)| c.num_distinct()).sum::<usize>()
        );
        debug!("Rejected reads: {:?}", result.rejected);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn read(id: &str, seq: &str) -> Result<FastqRead> {
        FastqRead::new(id.into(), seq.into(), "I".repeat(seq.len()).into())
    }

    #[derive(Default, Clone)]
    struct MemSink(Rc<RefCell<Vec<FastqRead>>>);

    impl BucketSink for MemSink {
        fn append(&mut self, reads: &[FastqRead]) -> std::io::Result<()> {
            self.0.borrow_mut().extend_from_slice(reads);
            Ok(())
        }
    }

    #[test]
    fn test_same_read_three_times() {
        let extractor = InsertionExtractor::new(&RunConfig::default()).unwrap();
        let seq = "ACGT".to_string() + "AAAAAAAAAAAAAATA" + "ACAGGTTG";
        let reads = vec![read("r1", &seq), read("r1", &seq), read("r1", &seq)];
        let result = extractor.run(reads).unwrap();

        let mut expected = BTreeMap::new();
        expected.insert(
            "ACGT".to_string(),
            BTreeMap::from([("AAAAAAAAAAAAAATA".to_string(), 3)]),
        );
        assert_eq!(result.left.to_sorted(), expected);
        assert!(result.right.is_none());
        assert_eq!(result.accepted, 3);
        assert_eq!(result.processed, 3);
    }

    #[test]
    fn test_rejections_are_counted_not_errors() {
        let extractor = InsertionExtractor::new(&RunConfig::default()).unwrap();
        let reads = vec![
            read("ok", "ACGTAAAAAAAAAAAAAATAACAGGTTG"),
            read("short", "ACG"),
            read("noanchor", "ACGTAAAAAAAAAAAAAAAAAAAAAAAA"),
            read("len15", "ACGTAAAAAAAAAAAAATAACAGGTTG"),
            read("len18", "ACGTAAAAAAAAAAAAAAAATAACAGGTTG"),
        ];
        let result = extractor.run(reads).unwrap();
        assert_eq!(result.processed, 5);
        assert_eq!(result.accepted, 1);
        assert_eq!(
            result.rejected,
            RejectCounts {
                too_short: 1,
                no_anchor: 1,
                outside_window: 2
            }
        );
        assert_eq!(result.left.total(), 1);
    }

    #[test]
    fn test_asymmetric_ends() {
        let config = RunConfig::default()
            .with_tn_ends("ACAGGTTG", "CCGGAAAT")
            .unwrap();
        let extractor = InsertionExtractor::new(&config).unwrap();
        let reads = vec![
            read("l", "ACGTAAAAAAAAAAAAAATAACAGGTTG"),
            read("r", "ACGTCCCCCCCCCCCCCCTACCGGAAAT"),
        ];
        let result = extractor.run(reads).unwrap();
        assert!(result.is_asymmetric());
        assert_eq!(result.left.get(b"ACGT", b"AAAAAAAAAAAAAATA"), 1);
        assert_eq!(result.left.get(b"ACGT", b"CCCCCCCCCCCCCCTA"), 0);
        let right = result.counts(TnEnd::Right).unwrap();
        assert_eq!(right.get(b"ACGT", b"CCCCCCCCCCCCCCTA"), 1);
        assert_eq!(result.ends().len(), 2);
    }

    #[test]
    fn test_trimmed_reads_flushed() {
        let config = RunConfig {
            flush_threshold: 2,
            ..RunConfig::default()
        };
        let extractor = InsertionExtractor::new(&config).unwrap();
        let reads = vec![
            FastqRead::new(
                b"r1".to_vec(),
                b"ACGTAAAAAAAAAAAAAATAACAGGTTG".to_vec(),
                b"0123456789ABCDEFGHIJKLMNOPQR".to_vec(),
            ),
            read("r2", "ACGT"),
            read("r3", "TTTTCAAAAAAAAAAAAAATAACAGGTTGG"),
        ];
        let sink = MemSink::default();
        let result = extractor.run_with_trimmed(reads, sink.clone()).unwrap();

        let written = sink.0.borrow();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].id(), b"r1");
        assert_eq!(written[0].seq(), b"AAAAAAAAAAAAAATA");
        assert_eq!(written[0].qual(), b"456789ABCDEFGHIJ");
        assert_eq!(written[1].seq(), b"CAAAAAAAAAAAAAATA");

        let per_flush: Vec<usize> = result.flushes.iter().map(|f| f.written).collect();
        assert_eq!(per_flush, vec![1, 1]);
    }

    #[test]
    fn test_parse_error_propagates() {
        let extractor = InsertionExtractor::new(&RunConfig::default()).unwrap();
        let reads = vec![
            read("r1", "ACGT"),
            Err(Error::parse_error("FASTQ record 2", Some("truncated"))),
        ];
        assert!(extractor.run(reads).is_err());
    }

    #[test]
    fn test_cancel_gives_partial_counts() {
        let cancel = CancelToken::new();
        let extractor = InsertionExtractor::new(&RunConfig::default())
            .unwrap()
            .with_cancel(cancel.clone());
        let trigger = cancel;
        let reads = (0..10).map(move |i| {
            if i == 2 {
                trigger.cancel();
            }
            read("r", "ACGTAAAAAAAAAAAAAATAACAGGTTG")
        });
        let result = extractor.run(reads).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.left.total(), 3);
    }

    #[test]
    fn test_merge_counts() {
        let mut a = InsertionCounts::new();
        a.increment(b"ACGT", b"AAAA");
        let mut b = InsertionCounts::new();
        b.increment(b"ACGT", b"AAAA");
        b.increment(b"TTTT", b"CCCC");
        a.merge(b);
        assert_eq!(a.get(b"ACGT", b"AAAA"), 2);
        assert_eq!(a.get(b"TTTT", b"CCCC"), 1);
        assert_eq!(a.num_barcodes(), 2);
        assert_eq!(a.num_distinct(), 2);
        assert_eq!(a.barcodes(), vec![&b"ACGT"[..], &b"TTTT"[..]]);
    }
}
