// This software is released under the MIT license.
// See file LICENSE for full license details.
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use inseq::demux::{write_read_summary, Demultiplexer};
use inseq::fileformat::{
    write_insertion_table, write_segment_queries, FastqReads, SampleTable,
};
use inseq::insertions::{extract_parallel, InsertionExtractor};
use inseq::runtime::{ExperimentLayout, OutputCompression, RunConfig};

const SAMPLES: &str = "# name\tbarcode\nE001_01\tACGT\nE001 02\tTTGC\n";

fn write_fastq(path: &Path, seqs: &[&str]) {
    let mut file = fs::File::create(path).unwrap();
    for (i, seq) in seqs.iter().enumerate() {
        writeln!(file, "@read{}\n{}\n+\n{}", i, seq, "I".repeat(seq.len())).unwrap();
    }
}

fn pooled_reads() -> Vec<&'static str> {
    vec![
        "ACGTAAAAAAAAAAAAAATAACAGGTTGCCCC",
        "TTGCCAAAAAAAAAAAAAATAACAGGTTGCCC",
        "ACGTAAAAAAAAAAAAAATAACAGGTTGCCCC",
        "GGGGAAAAAAAAAAAAAATAACAGGTTGCCCC",
        "ACG",
        "TTGCAAAAAAAAAAAAATAACAGGTTGCCCCC",
        "ACGTAAAAAAAAAAAAAATAACAGGTTGCCCC",
    ]
}

#[test]
fn demultiplex_then_count_insertions() {
    let dir = tempfile::tempdir().unwrap();
    let path_reads = dir.path().join("pool.fastq");
    let path_samples = dir.path().join("samples.txt");
    write_fastq(&path_reads, &pooled_reads());
    fs::write(&path_samples, SAMPLES).unwrap();

    let samples = SampleTable::from_path(&path_samples).unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.get("E001_02").is_some());

    let config = RunConfig {
        flush_threshold: 2,
        ..RunConfig::default()
    };
    let layout = ExperimentLayout::new(dir.path().join("results"), "run 1").unwrap();

    let reads = FastqReads::from_path(&path_reads).unwrap();
    let summary = Demultiplexer::to_files(&config, &samples, &layout)
        .unwrap()
        .run(reads)
        .unwrap();
    assert_eq!(summary.processed, 7);
    assert_eq!(summary.count_for("E001_01"), Some(3));
    assert_eq!(summary.count_for("E001_02"), Some(2));
    assert_eq!(summary.count_for("_other"), Some(2));
    write_read_summary(&layout.summary_path(), &summary, &samples).unwrap();

    //Gzip members from every flush read back as one stream, in input order
    let path_sample = layout.demultiplexed_path("E001_01", OutputCompression::Gzip);
    let ids: Vec<Vec<u8>> = FastqReads::from_path(&path_sample)
        .unwrap()
        .map(|r| r.unwrap().id().to_vec())
        .collect();
    assert_eq!(ids, vec![b"read0".to_vec(), b"read2".to_vec(), b"read6".to_vec()]);

    let path_other = layout.demultiplexed_path("_other", OutputCompression::Gzip);
    assert_eq!(FastqReads::from_path(&path_other).unwrap().count(), 2);

    //Junctions of one demultiplexed sample
    let extractor = InsertionExtractor::new(&config).unwrap();
    let result = extractor
        .run(FastqReads::from_path(&path_sample).unwrap())
        .unwrap();
    assert_eq!(result.left.get(b"ACGT", b"AAAAAAAAAAAAAATA"), 3);

    //And of the whole pool, with worker threads
    let extractor = Arc::new(extractor);
    let pooled = extract_parallel(&extractor, FastqReads::from_path(&path_reads).unwrap(), 2)
        .unwrap();
    assert_eq!(pooled.processed, 7);
    assert_eq!(pooled.accepted, 5);
    assert_eq!(pooled.rejected.too_short, 1);
    assert_eq!(pooled.rejected.outside_window, 1);

    write_insertion_table(&layout.insertions_path(), &pooled, Some(&samples)).unwrap();
    let table = fs::read_to_string(layout.insertions_path()).unwrap();
    assert_eq!(
        table,
        "end\tbarcode\tsample\tsegment\tlength\tcount\n\
         TnL\tACGT\tE001_01\tAAAAAAAAAAAAAATA\t16\t3\n\
         TnL\tGGGG\t\tAAAAAAAAAAAAAATA\t16\t1\n\
         TnL\tTTGC\tE001_02\tCAAAAAAAAAAAAAATA\t17\t1\n"
    );

    let queries = write_segment_queries(&layout, &pooled, &samples).unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        fs::read_to_string(layout.segments_path("E001_02")).unwrap(),
        ">E001_02_1_count=1\nCAAAAAAAAAAAAAATA\n"
    );

    let summary_tsv = fs::read_to_string(layout.summary_path()).unwrap();
    assert!(summary_tsv.starts_with("sample\tbarcode\treads\nE001_01\tACGT\t3\n"));
}

#[test]
fn rerun_truncates_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let path_reads = dir.path().join("pool.fq");
    write_fastq(&path_reads, &pooled_reads());
    let samples = SampleTable::from_reader(SAMPLES.as_bytes()).unwrap();
    let config = RunConfig {
        compression: OutputCompression::Plain,
        ..RunConfig::default()
    };
    let layout = ExperimentLayout::new(dir.path(), "exp").unwrap();

    for _ in 0..2 {
        let reads = FastqReads::from_path(&path_reads).unwrap();
        Demultiplexer::to_files(&config, &samples, &layout)
            .unwrap()
            .run(reads)
            .unwrap();
    }
    let path_sample = layout.demultiplexed_path("E001_01", OutputCompression::Plain);
    assert_eq!(FastqReads::from_path(&path_sample).unwrap().count(), 3);
}

#[test]
fn empty_input_creates_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let path_reads = dir.path().join("empty.fastq");
    fs::write(&path_reads, "").unwrap();
    let samples = SampleTable::from_reader(SAMPLES.as_bytes()).unwrap();
    let config = RunConfig::default();
    let layout = ExperimentLayout::new(dir.path(), "exp").unwrap();

    let summary = Demultiplexer::to_files(&config, &samples, &layout)
        .unwrap()
        .run(FastqReads::from_path(&path_reads).unwrap())
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.flushes.len(), 1);
    for name in ["E001_01", "E001_02", "_other"] {
        let path = layout.demultiplexed_path(name, OutputCompression::Gzip);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
