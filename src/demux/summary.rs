use log::info;
use serde::Serialize;
use std::path::Path;

use super::classifier::DemuxSummary;
use crate::common::U8_CHAR_TAB;
use crate::fileformat::SampleTable;
use crate::runtime::{Error, Result};

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    sample: &'a str,
    barcode: &'a str,
    reads: u64,
}

/// Reads per sample as TSV: sample, barcode, reads. `_other` has an empty barcode
pub fn write_read_summary(path: &Path, summary: &DemuxSummary, samples: &SampleTable) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(U8_CHAR_TAB)
        .from_path(path)
        .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;

    for (name, reads) in summary.bucket_counts.iter() {
        let barcode = samples.get(name).map(|s| s.barcode.as_str()).unwrap_or("");
        writer
            .serialize(SummaryRow {
                sample: name,
                barcode,
                reads: *reads,
            })
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
    }
    writer.flush()?;
    info!("Read summary written to {}", path.display());
    Ok(())
}
