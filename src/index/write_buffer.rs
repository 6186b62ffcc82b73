// Per-worker k-mer buffer in front of a KmerIndex.

use crate::error::Result;
use crate::graph::KmerMatch;

use super::KmerIndex;

/// Ordered k-mer matches waiting for one atomic batch write.
///
/// Owned by exactly one worker while k-mers are being enumerated.
#[derive(Debug)]
pub struct WriteBuffer {
    kmers: Vec<KmerMatch>,
    max_size: usize,
    flushes: usize,
}

impl WriteBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            kmers: Vec::new(),
            max_size,
            flushes: 0,
        }
    }

    /// Append a match; once the buffer holds more than `max_size` matches it
    /// is written to `index` as one batch and cleared. Returns whether that
    /// happened.
    pub fn push<I: KmerIndex + ?Sized>(&mut self, kmer: KmerMatch, index: &I) -> Result<bool> {
        self.kmers.push(kmer);
        if self.kmers.len() > self.max_size {
            self.flush(index)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Write everything buffered as one batch. An empty buffer writes nothing.
    pub fn flush<I: KmerIndex + ?Sized>(&mut self, index: &I) -> Result<()> {
        if self.kmers.is_empty() {
            return Ok(());
        }
        index.write_kmer_batch(&self.kmers)?;
        log::trace!("flushed {} kmers", self.kmers.len());
        self.kmers.clear();
        self.flushes += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// Number of batches written so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}
