use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use seq_io::fastq::Reader as FastqReader;
use seq_io::fastq::Record as FastqRecord;

use super::{BucketSink, ConstructFromPath};
use crate::common::{
    FastqRead, U8_CHAR_FASTQ_RECORD, U8_CHAR_FASTQ_SEPERATOR, U8_CHAR_NEWLINE,
};
use crate::runtime::{Error, OutputCompression, Result};

pub fn open_fastq(file_handle: &Path) -> Result<FastqReader<Box<dyn std::io::Read>>> {
    let opened_handle = File::open(file_handle).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::file_not_found(file_handle),
        _ => Error::file_not_valid(file_handle, Some(e.to_string())),
    })?;

    //niffler cannot sniff an empty file; it simply has no records
    if opened_handle.metadata()?.len() == 0 {
        debug!("Input file {} is empty", &file_handle.display());
        let empty: Box<dyn std::io::Read> = Box::new(std::io::empty());
        return Ok(FastqReader::new(empty));
    }

    let (reader, compression) = niffler::get_reader(Box::new(opened_handle))
        .map_err(|e| Error::file_not_valid(file_handle, Some(e.to_string())))?;

    debug!(
        "Opened file {} with compression {:?}",
        &file_handle.display(),
        &compression
    );
    Ok(FastqReader::new(reader))
}

///////////////////////////////
/// Pull-based stream of owned reads over any FASTQ source
pub struct FastqReads<R: std::io::Read> {
    reader: FastqReader<R>,
    num_parsed: u64,
    failed: bool,
}

impl FastqReads<Box<dyn std::io::Read>> {
    /// Plain or compressed FASTQ; compression is sniffed from the content
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(FastqReads::new_from_reader(open_fastq(path)?))
    }
}

impl<R: std::io::Read> FastqReads<R> {
    pub fn new(reader: R) -> Self {
        FastqReads::new_from_reader(FastqReader::new(reader))
    }

    fn new_from_reader(reader: FastqReader<R>) -> Self {
        FastqReads {
            reader,
            num_parsed: 0,
            failed: false,
        }
    }
}

impl<R: std::io::Read> Iterator for FastqReads<R> {
    type Item = Result<FastqRead>;

    fn next(&mut self) -> Option<Self::Item> {
        //A parse error ends the stream
        if self.failed {
            return None;
        }
        let record = match self.reader.next()? {
            Ok(record) => record,
            Err(e) => {
                self.failed = true;
                return Some(Err(Error::parse_error(
                    format!("FASTQ record {}", self.num_parsed + 1),
                    Some(e.to_string()),
                )))
            }
        };
        self.num_parsed += 1;
        Some(FastqRead::new(
            record.head().to_vec(),
            record.seq().to_vec(),
            record.qual().to_vec(),
        ))
    }
}

////////// Write one FASTQ read
pub fn write_fastq_read<W: Write>(writer: &mut W, read: &FastqRead) -> std::io::Result<()> {
    writer.write_all(&[U8_CHAR_FASTQ_RECORD])?;
    writer.write_all(read.id())?;
    writer.write_all(&[U8_CHAR_NEWLINE])?;
    writer.write_all(read.seq())?;
    writer.write_all(&[U8_CHAR_NEWLINE, U8_CHAR_FASTQ_SEPERATOR, U8_CHAR_NEWLINE])?;
    writer.write_all(read.qual())?;
    writer.write_all(&[U8_CHAR_NEWLINE])?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FastqAppenderFactory {
    compression: OutputCompression,
}
impl FastqAppenderFactory {
    pub fn new(compression: OutputCompression) -> FastqAppenderFactory {
        FastqAppenderFactory { compression }
    }
}
impl ConstructFromPath<FastqAppender> for FastqAppenderFactory {
    /// Creates (or truncates) the file so every run starts from an empty output
    fn new_from_path(&self, fname: &Path) -> Result<FastqAppender> {
        File::create(fname).map_err(|e| Error::file_not_valid(fname, Some(e.to_string())))?;
        Ok(FastqAppender {
            path: fname.to_path_buf(),
            compression: self.compression,
        })
    }
}

///////////////////////////////
/// Appends batches of reads to one FASTQ file. The file is only open while a batch is written;
/// with gzip every batch becomes its own gzip member, which readers concatenate transparently
#[derive(Debug)]
pub struct FastqAppender {
    path: PathBuf,
    compression: OutputCompression,
}

impl FastqAppender {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BucketSink for FastqAppender {
    fn append(&mut self, reads: &[FastqRead]) -> std::io::Result<()> {
        //Nothing to write must leave the file untouched
        if reads.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let out = BufWriter::new(file);

        let mut out = match self.compression {
            OutputCompression::Gzip => {
                let mut writer = GzEncoder::new(out, Compression::default());
                for read in reads {
                    write_fastq_read(&mut writer, read)?;
                }
                writer.finish()?
            }
            OutputCompression::Plain => {
                let mut writer = out;
                for read in reads {
                    write_fastq_read(&mut writer, read)?;
                }
                writer
            }
        };
        out.flush()?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(id: &str, seq: &str) -> FastqRead {
        let qual = "I".repeat(seq.len());
        FastqRead::new(id.into(), seq.into(), qual.into()).unwrap()
    }

    #[test]
    fn test_write_then_parse_gives_same_read() {
        let read = FastqRead::new(
            b"M03699:250:1102:5914 1:N:0".to_vec(),
            b"ACGTNACGTA".to_vec(),
            b"II#IIABCDE".to_vec(),
        )
        .unwrap();

        let mut buf: Vec<u8> = Vec::new();
        write_fastq_read(&mut buf, &read).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "@M03699:250:1102:5914 1:N:0\nACGTNACGTA\n+\nII#IIABCDE\n"
        );

        let parsed: Vec<FastqRead> = FastqReads::new(buf.as_slice())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(parsed, vec![read]);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let broken = b"@r1\nACGT\n+\nIII\n".to_vec();
        let parsed: Vec<Result<FastqRead>> = FastqReads::new(broken.as_slice()).collect();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].is_err());
    }

    #[test]
    fn test_gzip_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.fastq.gz");
        let factory = FastqAppenderFactory::new(OutputCompression::Gzip);
        let mut appender = factory.new_from_path(&path).unwrap();

        appender.append(&[read("r1", "ACGT"), read("r2", "TTTT")]).unwrap();
        appender.append(&[]).unwrap();
        appender.append(&[read("r3", "GGGG")]).unwrap();

        let ids: Vec<Vec<u8>> = FastqReads::from_path(&path)
            .unwrap()
            .map(|r| r.unwrap().id().to_vec())
            .collect();
        assert_eq!(ids, vec![b"r1".to_vec(), b"r2".to_vec(), b"r3".to_vec()]);
    }

    #[test]
    fn test_empty_append_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.fastq");
        let factory = FastqAppenderFactory::new(OutputCompression::Plain);
        let mut appender = factory.new_from_path(&path).unwrap();

        appender.append(&[read("r1", "ACGT")]).unwrap();
        let before = std::fs::read(&path).unwrap();
        appender.append(&[]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_empty_input_file_has_no_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fastq");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(FastqReads::from_path(&path).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = FastqReads::from_path(&dir.path().join("absent.fastq"));
        assert!(matches!(res, Err(Error::FileNotFound { .. })));
    }
}
