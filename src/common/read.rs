use std::ops::Range;

use crate::runtime::{Error, Result};

///////////////////////////////
/// One FASTQ record. Immutable once built; sequence and quality always have equal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqRead {
    id: Vec<u8>,
    seq: Vec<u8>,
    qual: Vec<u8>,
}

impl FastqRead {
    pub fn new(id: Vec<u8>, seq: Vec<u8>, qual: Vec<u8>) -> Result<FastqRead> {
        if seq.len() != qual.len() {
            return Err(Error::parse_error(
                format!("read {}", String::from_utf8_lossy(&id)),
                Some(format!(
                    "sequence length {} differs from quality length {}",
                    seq.len(),
                    qual.len()
                )),
            ));
        }
        Ok(FastqRead { id, seq, qual })
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn qual(&self) -> &[u8] {
        &self.qual
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// First `len` bases, or None if the read is shorter than that
    pub fn prefix(&self, len: usize) -> Option<&[u8]> {
        self.seq.get(..len)
    }

    /// Same read restricted to `range` of sequence and quality
    pub fn slice(&self, range: Range<usize>) -> Option<FastqRead> {
        let seq = self.seq.get(range.clone())?;
        let qual = self.qual.get(range)?;
        Some(FastqRead {
            id: self.id.clone(),
            seq: seq.to_vec(),
            qual: qual.to_vec(),
        })
    }
}

impl std::fmt::Display for FastqRead {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({}, {})",
            String::from_utf8_lossy(&self.id),
            String::from_utf8_lossy(&self.seq)
        )
    }
}
