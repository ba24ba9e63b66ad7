use log::warn;

use super::flush::FlushTarget;
use crate::common::FastqRead;
use crate::fileformat::BucketSink;
use crate::runtime::{BucketFailure, Error, Result};

impl<S: BucketSink + ?Sized> BucketSink for &mut S {
    fn append(&mut self, reads: &[FastqRead]) -> std::io::Result<()> {
        (**self).append(reads)
    }
}

impl<S: BucketSink + ?Sized> BucketSink for Box<S> {
    fn append(&mut self, reads: &[FastqRead]) -> std::io::Result<()> {
        (**self).append(reads)
    }
}

#[derive(Debug)]
struct Bucket<S> {
    name: String,
    reads: Vec<FastqRead>,
    sink: S,
    total: u64,
}

///////////////////////////////
/// Named read buffers, each draining into its own sink
#[derive(Debug)]
pub struct BucketSet<S: BucketSink> {
    buckets: Vec<Bucket<S>>,
    buffered: usize,
}

impl<S: BucketSink> Default for BucketSet<S> {
    fn default() -> Self {
        BucketSet {
            buckets: Vec::new(),
            buffered: 0,
        }
    }
}

impl<S: BucketSink> BucketSet<S> {
    pub fn new() -> BucketSet<S> {
        BucketSet::default()
    }

    /// Returns the index of the new bucket
    pub fn add_bucket(&mut self, name: &str, sink: S) -> usize {
        self.buckets.push(Bucket {
            name: name.to_string(),
            reads: Vec::new(),
            sink,
            total: 0,
        });
        self.buckets.len() - 1
    }

    pub fn push(&mut self, bucket: usize, read: FastqRead) {
        let b = &mut self.buckets[bucket];
        b.reads.push(read);
        b.total += 1;
        self.buffered += 1;
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// (bucket name, reads ever pushed) in bucket order
    pub fn totals(&self) -> Vec<(String, u64)> {
        self.buckets
            .iter()
            .map(|b| (b.name.clone(), b.total))
            .collect()
    }
}

impl<S: BucketSink> FlushTarget for BucketSet<S> {
    fn buffered(&self) -> usize {
        self.buffered
    }

    /// Every bucket is attempted even if an earlier one fails
    fn flush_buffers(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut failures = Vec::new();
        for bucket in self.buckets.iter_mut() {
            match bucket.sink.append(&bucket.reads) {
                Ok(()) => {
                    written += bucket.reads.len();
                    bucket.reads.clear();
                }
                Err(e) => {
                    warn!(
                        "Failed to write {} reads of bucket {}: {}",
                        bucket.reads.len(),
                        bucket.name,
                        e
                    );
                    failures.push(BucketFailure {
                        bucket: bucket.name.clone(),
                        unwritten: bucket.reads.len(),
                        source: e,
                    });
                }
            }
        }
        self.buffered = self.buckets.iter().map(|b| b.reads.len()).sum();

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(Error::Flush { failures })
        }
    }
}
