use crossbeam::channel::Sender;
use log::{debug, info, warn};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::extractor::{ExtractionResult, InsertionExtractor};
use crate::common::FastqRead;
use crate::runtime::{Error, Result};

/// Reads handed to a worker at a time
const BATCH_SIZE: usize = 4096;
/// Batches waiting per worker
const QUEUE_SIZE: usize = 4;

///////////////////////////////
/// Tally junctions over several worker threads. The calling thread parses the stream and routes
/// each read by its barcode, so every worker owns a disjoint set of barcodes; the partial counts
/// are merged once the stream ends. Gives the same counts as InsertionExtractor::run
pub fn extract_parallel<I>(
    extractor: &Arc<InsertionExtractor>,
    reads: I,
    threads_work: usize,
) -> Result<ExtractionResult>
where
    I: IntoIterator<Item = Result<FastqRead>>,
{
    if threads_work == 0 {
        return Err(Error::invalid_config("need at least one worker thread"));
    }
    let thread_pool = threadpool::ThreadPool::new(threads_work);
    let (tx_result, rx_result) = crossbeam::channel::bounded::<ExtractionResult>(threads_work);

    let mut list_tx = Vec::with_capacity(threads_work);
    for tidx in 0..threads_work {
        let (tx, rx) = crossbeam::channel::bounded::<Option<Vec<FastqRead>>>(QUEUE_SIZE);
        list_tx.push(tx);
        let tx_result = tx_result.clone();
        let extractor = Arc::clone(extractor);

        thread_pool.execute(move || {
            debug!("Worker {} started", tidx);
            let mut partial = ExtractionResult::new(extractor.same_tn_ends());
            while let Ok(Some(batch)) = rx.recv() {
                for read in batch.iter() {
                    extractor.tally(read.seq(), &mut partial);
                }
            }
            debug!("Worker {} done after {} reads", tidx, partial.processed);
            let _ = tx_result.send(partial);
        });
    }
    drop(tx_result);

    let fed = route_batches(extractor, reads, &list_tx);

    //Workers are always released, also when the stream failed
    for tx in list_tx.iter() {
        let _ = tx.send(None);
    }
    thread_pool.join();

    let (num_sent, cancelled) = fed?;

    let mut result = ExtractionResult::new(extractor.same_tn_ends());
    let mut num_partial = 0;
    for partial in rx_result.try_iter() {
        result.merge(partial);
        num_partial += 1;
    }
    if num_partial != threads_work || thread_pool.panic_count() > 0 {
        return Err(Error::worker(format!(
            "{} of {} junction workers did not finish",
            threads_work - num_partial.min(threads_work),
            threads_work
        )));
    }
    if result.processed != num_sent {
        return Err(Error::worker(format!(
            "workers tallied {} reads but {} were read",
            result.processed, num_sent
        )));
    }
    result.cancelled = cancelled;

    info!(
        "Junctions: {} of {} reads accepted over {} threads",
        result.accepted, result.processed, threads_work
    );
    Ok(result)
}

/// Worker owning a barcode. Reads too short for a barcode hash whatever they have
fn worker_for(seq: &[u8], barcode_length: usize, threads_work: usize) -> usize {
    let barcode = &seq[..barcode_length.min(seq.len())];
    let mut hasher = FxHasher::default();
    barcode.hash(&mut hasher);
    (hasher.finish() % threads_work as u64) as usize
}

/// Returns the number of reads sent, and if the stream was cut short by cancellation
fn route_batches<I>(
    extractor: &InsertionExtractor,
    reads: I,
    list_tx: &[Sender<Option<Vec<FastqRead>>>],
) -> Result<(u64, bool)>
where
    I: IntoIterator<Item = Result<FastqRead>>,
{
    let threads_work = list_tx.len();
    let progress_interval = extractor.progress_interval();
    let mut batches: Vec<Vec<FastqRead>> = (0..threads_work)
        .map(|_| Vec::with_capacity(BATCH_SIZE))
        .collect();

    let mut num_sent: u64 = 0;
    let mut cancelled = false;
    let mut reads = reads.into_iter();
    loop {
        if extractor.is_cancelled() {
            warn!(
                "Junction extraction cancelled after {} reads; counts are partial",
                num_sent
            );
            cancelled = true;
            break;
        }
        let read = match reads.next() {
            Some(read) => read?,
            None => break,
        };
        let tidx = worker_for(read.seq(), extractor.barcode_length(), threads_work);
        batches[tidx].push(read);
        num_sent += 1;
        if num_sent % progress_interval == 0 {
            info!("Processed {} reads", num_sent);
        }
        if batches[tidx].len() == BATCH_SIZE {
            let full = std::mem::replace(&mut batches[tidx], Vec::with_capacity(BATCH_SIZE));
            send_batch(&list_tx[tidx], full)?;
        }
    }
    for (tx, batch) in list_tx.iter().zip(batches) {
        if !batch.is_empty() {
            send_batch(tx, batch)?;
        }
    }
    Ok((num_sent, cancelled))
}

fn send_batch(tx: &Sender<Option<Vec<FastqRead>>>, batch: Vec<FastqRead>) -> Result<()> {
    tx.send(Some(batch)).map_err(|_| {
        Error::worker("junction worker stopped before the end of the stream")
    })
}
