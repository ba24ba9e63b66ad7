
// probably not necessary as consts but reads better than literals
pub const U8_CHAR_TAB: u8 = b'\t';
pub const U8_CHAR_COMMENT: u8 = b'#';
pub const U8_CHAR_NEWLINE: u8 = b'\n';
pub const U8_CHAR_FASTA_RECORD: u8 = b'>';
pub const U8_CHAR_FASTQ_RECORD: u8 = b'@';
pub const U8_CHAR_FASTQ_SEPERATOR: u8 = b'+';

pub const DEFAULT_BARCODE_LENGTH: usize = 4;
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1_000_000;
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;
pub const DEFAULT_TN_ANCHOR: &str = "ACAGGTTG";

/// Dinucleotide preceding the anchor; counted as part of the genomic segment
pub const JUNCTION_TA: &[u8] = b"TA";

/// Accepted genomic-segment lengths, half-open
pub const SEGMENT_LEN_MIN: usize = 16;
pub const SEGMENT_LEN_MAX_EXCLUSIVE: usize = 18;

pub const BUCKET_OTHER: &str = "_other";
pub const DIR_RAW_DATA: &str = "raw_data";
pub const DEFAULT_PATH_RESULTS: &str = "results";
pub const FILENAME_INSERTIONS: &str = "insertions.tsv";
pub const FILENAME_SUMMARY: &str = "summary.tsv";

/// TA + anchor must fit the 64-bit shift-and matcher
pub const MAX_ANCHOR_LENGTH: usize = 62;
