mod detect_fileformat;
pub mod fastq;
pub mod insertion_table;
pub mod sample_table;

use std::path::Path;

use crate::common::FastqRead;
use crate::runtime::Result;

pub use detect_fileformat::detect_fileformat;
pub use detect_fileformat::verify_input_fq_file;
pub use detect_fileformat::DetectedFileformat;

pub use fastq::open_fastq;
pub use fastq::write_fastq_read;
pub use fastq::FastqAppender;
pub use fastq::FastqAppenderFactory;
pub use fastq::FastqReads;

pub use insertion_table::write_insertion_table;
pub use insertion_table::write_segment_queries;
pub use insertion_table::write_segments_fasta;

pub use sample_table::SampleEntry;
pub use sample_table::SampleTable;

///////////////////////////////
/// Builds a writer of type W for a given output path
pub trait ConstructFromPath<W> {
    fn new_from_path(&self, fname: &Path) -> Result<W>;
}

///////////////////////////////
/// Durable, append-only destination for the reads of one bucket
pub trait BucketSink {
    /// Append all reads in order. An empty slice must not touch the destination
    fn append(&mut self, reads: &[FastqRead]) -> std::io::Result<()>;
}
