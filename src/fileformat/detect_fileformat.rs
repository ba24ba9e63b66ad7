use log::warn;
use std::fs::File;
use std::path::Path;

use crate::runtime::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedFileformat {
    FASTQ,
    Other,
}

pub fn detect_fileformat(p: &Path) -> DetectedFileformat {
    let p_string = match p.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return DetectedFileformat::Other,
    };

    // compression is sniffed when opening, so any common suffix is accepted here
    let p_string = p_string
        .trim_end_matches(".gz")
        .trim_end_matches(".bz2")
        .trim_end_matches(".xz")
        .trim_end_matches(".zst");

    if p_string.ends_with(".fq") | p_string.ends_with(".fastq") {
        DetectedFileformat::FASTQ
    } else {
        DetectedFileformat::Other
    }
}

/////// Check that the specified file is a FASTQ file that can be opened
pub fn verify_input_fq_file(path_in: &Path) -> Result<()> {
    if detect_fileformat(path_in) != DetectedFileformat::FASTQ {
        return Err(Error::file_not_valid(
            path_in,
            Some("input file must be a fastq file (.fq/.fastq, optionally compressed)"),
        ));
    }
    match File::open(path_in) {
        Ok(file) => {
            if file.metadata()?.len() == 0 {
                warn!("Input file {} is empty", path_in.display());
            }
            Ok(())
        }
        Err(_) => Err(Error::file_not_found(path_in)),
    }
}
