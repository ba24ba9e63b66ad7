use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::common::{U8_CHAR_FASTA_RECORD, U8_CHAR_NEWLINE, U8_CHAR_TAB};
use crate::fileformat::SampleTable;
use crate::insertions::{ExtractionResult, TnEnd};
use crate::runtime::{Error, ExperimentLayout, Result};

#[derive(Debug, Serialize)]
struct InsertionRow<'a> {
    end: &'a str,
    barcode: &'a str,
    sample: &'a str,
    segment: &'a str,
    length: usize,
    count: u64,
}

///////////////////////////////
/// All counted junctions as TSV: end, barcode, sample, segment, length, count.
/// Rows are sorted by barcode, then segment. Barcodes without a sample get an empty sample
pub fn write_insertion_table(
    path: &Path,
    result: &ExtractionResult,
    samples: Option<&SampleTable>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(U8_CHAR_TAB)
        .from_path(path)
        .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;

    let rows = result
        .ends()
        .into_iter()
        .flat_map(|(end, counts)| {
            counts.barcodes().into_iter().flat_map(move |barcode| {
                counts
                    .segments(barcode)
                    .into_iter()
                    .map(move |(segment, count)| (barcode, segment, end, count))
            })
        })
        .sorted();

    let mut num_rows = 0;
    for (barcode, segment, end, count) in rows {
        let barcode = String::from_utf8_lossy(barcode);
        let segment = String::from_utf8_lossy(segment);
        let sample = samples
            .and_then(|s| s.get_by_barcode(&barcode))
            .map(|s| s.name.as_str())
            .unwrap_or("");
        writer
            .serialize(InsertionRow {
                end: end.label(),
                barcode: &barcode,
                sample,
                segment: &segment,
                length: segment.len(),
                count,
            })
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        num_rows += 1;
    }
    writer.flush()?;
    info!("Wrote {} insertions to {}", num_rows, path.display());
    Ok(())
}

/// One FASTA record per distinct segment, sorted, headers `>{sample}_{n}_count={count}`
pub fn write_segments_fasta<W: Write>(
    writer: &mut W,
    sample: &str,
    segments: &[(&[u8], u64)],
) -> std::io::Result<()> {
    for (n, (segment, count)) in segments.iter().enumerate() {
        writer.write_all(&[U8_CHAR_FASTA_RECORD])?;
        write!(writer, "{}_{}_count={}", sample, n + 1, count)?;
        writer.write_all(&[U8_CHAR_NEWLINE])?;
        writer.write_all(segment)?;
        writer.write_all(&[U8_CHAR_NEWLINE])?;
    }
    Ok(())
}

///////////////////////////////
/// Aligner query files: for every sample with at least one junction, its distinct segments.
/// Named `<sample>_segments.fasta`, or `<sample>_<end>_segments.fasta` when the transposon ends
/// differ. Returns the files written
pub fn write_segment_queries(
    layout: &ExperimentLayout,
    result: &ExtractionResult,
    samples: &SampleTable,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (end, counts) in result.ends() {
        for sample in samples.iter() {
            let segments = counts.segments(sample.barcode.as_bytes());
            if segments.is_empty() {
                continue;
            }
            let stem = segment_file_stem(&sample.name, end, result.is_asymmetric());
            let path = layout.segments_path(&stem);

            let file = File::create(&path)
                .map_err(|e| Error::file_not_valid(&path, Some(e.to_string())))?;
            let mut writer = BufWriter::new(file);
            write_segments_fasta(&mut writer, &sample.name, &segments)?;
            writer.flush()?;
            debug!(
                "Wrote {} segments of sample {} to {}",
                segments.len(),
                sample.name,
                path.display()
            );
            written.push(path);
        }
    }
    info!("Wrote {} segment query files", written.len());
    Ok(written)
}

fn segment_file_stem(sample: &str, end: TnEnd, asymmetric: bool) -> String {
    if asymmetric {
        format!("{}_{}", sample, end.label())
    } else {
        sample.to_string()
    }
}
