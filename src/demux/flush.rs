use log::{debug, info};

use crate::runtime::{Error, Result};

///////////////////////////////
/// Anything that buffers reads in memory and can append them to durable storage
pub trait FlushTarget {
    /// Reads currently buffered, over all buckets
    fn buffered(&self) -> usize;

    /// Append every buffered read and clear the buffers. Returns the number of reads written.
    /// On failure, the error names each bucket that could not be written
    fn flush_buffers(&mut self) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Streaming,
    Flushing,
    FinalFlush,
    Done,
}

/// One completed flush: reads processed so far and reads written by this flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushEvent {
    pub processed: u64,
    pub written: usize,
    pub is_final: bool,
}

///////////////////////////////
/// Counts processed reads and flushes its target every `threshold` reads, then once more at the
/// end of the stream whatever is left (possibly nothing)
#[derive(Debug)]
pub struct FlushController {
    threshold: usize,
    since_flush: usize,
    processed: u64,
    state: FlushState,
    history: Vec<FlushEvent>,
}

impl FlushController {
    pub fn new(threshold: usize) -> Result<FlushController> {
        if threshold == 0 {
            return Err(Error::invalid_config("flush threshold must be at least 1"));
        }
        Ok(FlushController {
            threshold,
            since_flush: 0,
            processed: 0,
            state: FlushState::Streaming,
            history: Vec::new(),
        })
    }

    /// Register one processed read; flushes when the threshold is reached
    pub fn record<T: FlushTarget + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        self.ensure_streaming()?;
        self.processed += 1;
        self.since_flush += 1;
        if self.since_flush >= self.threshold {
            self.state = FlushState::Flushing;
            self.flush(target, false)?;
            self.state = FlushState::Streaming;
            info!("Records processed ... {}", self.processed);
        }
        Ok(())
    }

    /// Stream exhausted: unconditional last flush
    pub fn finish<T: FlushTarget + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        self.ensure_streaming()?;
        self.state = FlushState::FinalFlush;
        self.flush(target, true)?;
        self.state = FlushState::Done;
        info!("Records processed ... {} (done)", self.processed);
        Ok(())
    }

    fn flush<T: FlushTarget + ?Sized>(&mut self, target: &mut T, is_final: bool) -> Result<()> {
        let pending = target.buffered();
        debug!(
            "Flushing {} buffered reads after {} processed",
            pending, self.processed
        );
        let written = target.flush_buffers()?;
        self.history.push(FlushEvent {
            processed: self.processed,
            written,
            is_final,
        });
        self.since_flush = 0;
        Ok(())
    }

    fn ensure_streaming(&self) -> Result<()> {
        if self.state != FlushState::Streaming {
            return Err(Error::invalid_state(format!(
                "flush controller used in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn history(&self) -> &[FlushEvent] {
        &self.history
    }

    pub fn into_history(self) -> Vec<FlushEvent> {
        self.history
    }
}
