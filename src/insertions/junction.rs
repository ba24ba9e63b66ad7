use std::ops::Range;

use bio::pattern_matching::shift_and::ShiftAnd;

use crate::common::{JUNCTION_TA, SEGMENT_LEN_MAX_EXCLUSIVE, SEGMENT_LEN_MIN};

/// Barcode and genomic segment of an accepted read, borrowed from the read sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Junction<'a> {
    pub barcode: &'a [u8],
    pub segment: &'a [u8],
    /// Position of the segment in the read
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JunctionOutcome<'a> {
    Accepted(Junction<'a>),
    /// Cannot hold barcode, TA and anchor
    TooShort,
    NoAnchor,
    OutsideWindow { length: usize },
}

impl<'a> JunctionOutcome<'a> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, JunctionOutcome::Accepted(_))
    }
}

///////////////////////////////
/// Finds `TA` + transposon anchor after the barcode. The segment runs from the end of the
/// barcode up to and including the `TA`
pub struct JunctionFinder {
    barcode_length: usize,
    motif_len: usize,
    pattern: ShiftAnd,
}

impl JunctionFinder {
    /// `anchor` must be uppercase ACGT and at most 62 bases; see RunConfig::validate
    pub fn new(barcode_length: usize, anchor: &str) -> JunctionFinder {
        let mut motif = JUNCTION_TA.to_vec();
        motif.extend_from_slice(anchor.as_bytes());
        JunctionFinder {
            barcode_length,
            motif_len: motif.len(),
            pattern: ShiftAnd::new(&motif),
        }
    }

    pub fn find<'a>(&self, seq: &'a [u8]) -> JunctionOutcome<'a> {
        let b = self.barcode_length;
        if seq.len() < b + self.motif_len {
            return JunctionOutcome::TooShort;
        }

        //First occurrence only, counted from the end of the barcode
        let offset = match self.pattern.find_all(&seq[b..]).next() {
            Some(offset) => offset,
            None => return JunctionOutcome::NoAnchor,
        };

        let length = offset + JUNCTION_TA.len();
        if !(SEGMENT_LEN_MIN..SEGMENT_LEN_MAX_EXCLUSIVE).contains(&length) {
            return JunctionOutcome::OutsideWindow { length };
        }

        let range = b..b + length;
        JunctionOutcome::Accepted(Junction {
            barcode: &seq[..b],
            segment: &seq[range.clone()],
            range,
        })
    }
}
