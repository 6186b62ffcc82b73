//! K-mer extraction over a graph set: bulk indexing, callbacks and export.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use crate::defaults::{END_MARKER, START_MARKER};
use crate::error::{GraphSetError, Result};
use crate::graph::{KmerParams, KmerPosition, NodeId, VariationGraph};
use crate::index::{KmerIndex, WriteBuffer};
use crate::io::stream::MessageWriter;
use crate::kmer_opt::KmerOpt;
use crate::utils::all_atgc;

use super::GraphSet;

/// Output layout of [`GraphSet::export_kmers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KmerExportFormat {
    /// Tab-separated records, boundaries rendered as placeholders.
    Text,
    /// Stream frames of `KmerPosition`, graphs wrapped in marker nodes.
    Binary,
    /// Tab-separated records, graphs wrapped in marker nodes.
    MarkedText,
}

impl GraphSet {
    /// Enumerate the k-mers of every graph and write them to `index` in
    /// batches. Each graph gets a pool of `opt.threads` workers, and each
    /// worker fills its own buffer, so a batch only ever holds one worker's
    /// matches. Only k-mers spelled entirely with `A`, `C`, `G`, `T` are kept,
    /// and only from the forward strand unless `opt.allow_negatives` is set.
    pub fn index_kmers<I: KmerIndex + ?Sized>(&self, index: &I, opt: &KmerOpt) -> Result<()> {
        let params = opt.params();
        let threads = opt.threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        self.for_each(|graph| {
            let graph: &VariationGraph = graph;
            let buffers: Vec<Mutex<WriteBuffer>> = (0..threads)
                .map(|_| Mutex::new(WriteBuffer::new(opt.buffer_max_size)))
                .collect();
            let kept = AtomicUsize::new(0);

            pool.install(|| -> Result<()> {
                graph.try_for_each_kmer_position(&params, |kp| -> Result<()> {
                    if !all_atgc(kp.kmer.as_bytes()) {
                        return Ok(());
                    }
                    let worker = rayon::current_thread_index().unwrap_or(0);
                    let mut buffer = buffers[worker]
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    buffer.push(kp.to_match(), index)?;
                    kept.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })?;

                buffers.into_par_iter().try_for_each(|buffer| {
                    let mut buffer = buffer.into_inner().unwrap_or_else(PoisonError::into_inner);
                    buffer.flush(index)
                })
            })?;

            log::info!(
                "{}: indexed {} kmers of length {}",
                graph.name,
                kept.load(Ordering::Relaxed),
                params.kmer_size
            );
            Ok(())
        })?;

        index.remember_kmer_size(opt.kmer_size)
    }

    /// Call `handler` for every k-mer occurrence, one graph at a time in list
    /// order. Calls within a graph come from rayon workers in no fixed order.
    pub fn for_each_kmer<F>(&self, params: &KmerParams, handler: F) -> Result<()>
    where
        F: Fn(&KmerPosition) + Sync + Send,
    {
        self.for_each(|graph| {
            graph.for_each_kmer_position(params, |kp| handler(&kp));
            Ok(())
        })
    }

    /// Write every k-mer occurrence of the set to `out` in `format`.
    ///
    /// `head_id` and `tail_id` name the marker nodes added for the binary and
    /// marked text formats; plain text uses `head_id` for k-mers with no next
    /// position. Records are never interleaved, but their order across
    /// workers is unspecified.
    pub fn export_kmers<W: Write + Send>(
        &self,
        out: W,
        format: KmerExportFormat,
        params: &KmerParams,
        head_id: NodeId,
        tail_id: NodeId,
    ) -> Result<W> {
        let add_markers = |graph: &mut VariationGraph| {
            let (head, tail) = graph.add_start_end_markers(
                params.kmer_size,
                START_MARKER,
                END_MARKER,
                head_id,
                tail_id,
            );
            log::debug!("{}: head marker {}, tail marker {}", graph.name, head, tail);
        };

        match format {
            KmerExportFormat::Text | KmerExportFormat::MarkedText => {
                let out = Mutex::new(out);
                self.for_each(|graph| {
                    if format == KmerExportFormat::MarkedText {
                        add_markers(graph);
                    }
                    graph.try_for_each_kmer_position(params, |kp| {
                        let record = kp.to_text_record(head_id);
                        let mut out = out.lock().unwrap_or_else(PoisonError::into_inner);
                        writeln!(out, "{}", record)?;
                        Ok(())
                    })
                })?;
                let mut out = out.into_inner().unwrap_or_else(PoisonError::into_inner);
                out.flush()?;
                Ok(out)
            }
            KmerExportFormat::Binary => {
                let writer = Mutex::new(MessageWriter::new(out));
                self.for_each(|graph| {
                    add_markers(graph);
                    graph.try_for_each_kmer_position(params, |kp| {
                        writer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .write_message(&kp)
                    })
                })?;
                let writer = writer.into_inner().unwrap_or_else(PoisonError::into_inner);
                log::info!("exported {} kmer positions", writer.written());
                writer.finish()
            }
        }
    }

    /// Write each graph's binary k-mer stream to its own file in `dir` and
    /// return the file names in set order. The files outlive the call; the
    /// caller removes them once they are consumed.
    pub fn export_kmers_to_temp_files(
        &self,
        params: &KmerParams,
        head_id: NodeId,
        tail_id: NodeId,
        dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        self.fold(Vec::new(), |mut spilled, graph| {
            graph.add_start_end_markers(
                params.kmer_size,
                START_MARKER,
                END_MARKER,
                head_id,
                tail_id,
            );

            let file = tempfile::Builder::new()
                .prefix("kmers-")
                .suffix(".bin")
                .tempfile_in(dir)?;
            let writer = Mutex::new(MessageWriter::new(BufWriter::new(file.as_file())));
            graph.try_for_each_kmer_position(params, |kp| {
                writer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .write_message(&kp)
            })?;
            let writer = writer.into_inner().unwrap_or_else(PoisonError::into_inner);
            let written = writer.written();
            writer.finish()?.flush()?;

            let (_, path) = file.keep().map_err(|e| e.error)?;
            log::info!("{}: {} kmer positions -> {}", graph.name, written, path.display());
            spilled.push(path);
            Ok(spilled)
        })
    }

    /// Resolve the marker node ids for export. Missing ids default to the
    /// largest id in the set plus one (head) and two (tail), which takes an
    /// extra pass, so a set that reads standard input must name both.
    pub fn marker_ids(
        &self,
        head_id: Option<NodeId>,
        tail_id: Option<NodeId>,
    ) -> Result<(NodeId, NodeId)> {
        if let (Some(head), Some(tail)) = (head_id, tail_id) {
            return Ok((head, tail));
        }
        if self.files.iter().any(|f| f.is_stdin()) {
            return Err(GraphSetError::MarkerIdsRequired);
        }
        let max_id = self.max_node_id()?.unwrap_or(0);
        Ok((head_id.unwrap_or(max_id + 1), tail_id.unwrap_or(max_id + 2)))
    }
}
