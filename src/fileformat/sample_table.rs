use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::common::{BUCKET_OTHER, U8_CHAR_COMMENT, U8_CHAR_TAB};
use crate::runtime::{Error, Result};
use crate::utils::convert_to_filename;

///////////////////////////////
/// One sample: a file-name safe name and its uppercase barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub name: String,
    pub barcode: String,
}

///////////////////////////////
/// Samples in file order, with unique names and unique, equal-length barcodes
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    entries: Vec<SampleEntry>,
    map_name_to_index: HashMap<String, usize>,
    map_barcode_to_index: HashMap<String, usize>,
}

impl SampleTable {
    pub fn new() -> SampleTable {
        SampleTable::default()
    }

    /// Tab-separated file: name, barcode. Lines starting with # are comments
    pub fn from_path(path: &Path) -> Result<SampleTable> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::file_not_found(path),
            _ => Error::file_not_valid(path, Some(e.to_string())),
        })?;
        let table = SampleTable::from_reader(BufReader::new(file))?;
        info!(
            "Read {} samples from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<SampleTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(U8_CHAR_TAB)
            .has_headers(false)
            .flexible(true)
            .comment(Some(U8_CHAR_COMMENT))
            .from_reader(reader);

        let mut table = SampleTable::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| Error::parse_error("sample table", Some(e.to_string())))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            match (record.get(0), record.get(1)) {
                (Some(name), Some(barcode)) => {
                    table.add_sample(name, barcode).map_err(|e| match e {
                        Error::ParseError { msg, .. } => Error::ParseError {
                            context: format!("sample table line {}", line),
                            msg,
                        },
                        other => other,
                    })?
                }
                _ => {
                    return Err(Error::parse_error(
                        format!("sample table line {}", line),
                        Some("expected two tab-separated columns: name, barcode"),
                    ))
                }
            }
        }
        Ok(table)
    }

    /// Normalize and add one sample, enforcing the uniqueness invariants
    pub fn add_sample(&mut self, raw_name: &str, raw_barcode: &str) -> Result<()> {
        let name = convert_to_filename(raw_name);
        let barcode = raw_barcode.trim().to_uppercase();

        if name.is_empty() {
            return Err(Error::parse_error(
                "sample name",
                Some(format!("'{}' has no usable characters", raw_name)),
            ));
        }
        if barcode.is_empty() {
            return Err(Error::parse_error(
                "barcode",
                Some(format!("sample '{}' has an empty barcode", name)),
            ));
        }
        //The unmatched bucket owns this name
        if name == BUCKET_OTHER || self.map_name_to_index.contains_key(&name) {
            return Err(Error::DuplicateSample { name });
        }
        if let Some(&existing) = self.map_barcode_to_index.get(&barcode) {
            return Err(Error::DuplicateBarcode {
                barcode,
                name,
                existing: self.entries[existing].name.clone(),
            });
        }
        if let Some(expected) = self.barcode_length() {
            if barcode.len() != expected {
                return Err(Error::InconsistentBarcodeLength {
                    found: barcode.len(),
                    barcode,
                    expected,
                });
            }
        }

        debug!("Sample {} has barcode {}", name, barcode);
        let index = self.entries.len();
        self.map_name_to_index.insert(name.clone(), index);
        self.map_barcode_to_index.insert(barcode.clone(), index);
        self.entries.push(SampleEntry { name, barcode });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length shared by all barcodes; None for an empty table
    pub fn barcode_length(&self) -> Option<usize> {
        self.entries.first().map(|e| e.barcode.len())
    }

    /// Barcodes must be as long as the barcode prefix read from each read
    pub fn check_barcode_length(&self, barcode_length: usize) -> Result<()> {
        match self.barcode_length() {
            Some(table_length) if table_length != barcode_length => {
                Err(Error::invalid_config(format!(
                    "barcode length is set to {} but the sample table has barcodes of length {}",
                    barcode_length, table_length
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SampleEntry> {
        self.map_name_to_index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_by_barcode(&self, barcode: &str) -> Option<&SampleEntry> {
        self.map_barcode_to_index
            .get(barcode)
            .map(|&i| &self.entries[i])
    }

    /// Samples in file order
    pub fn iter(&self) -> std::slice::Iter<'_, SampleEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a SampleTable {
    type Item = &'a SampleEntry;
    type IntoIter = std::slice::Iter<'a, SampleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
