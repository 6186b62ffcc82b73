//! Succinct full-text indexes built from a stream of graph chunks.
//!
//! A builder never sees files. It hands a sink to a producer callback and
//! receives every chunk, in order, through that sink.

use std::io::Write;

use bio::alphabets::dna;
use bio::data_structures::bwt::{bwt, less, Less, Occ, BWT};
use bio::data_structures::fmindex::{BackwardSearchResult, FMIndex, FMIndexable};
use bio::data_structures::suffix_array::suffix_array;

use crate::error::Result;
use crate::graph::{Graph, NodeId, Position};
use crate::io::stream::MessageWriter;
use crate::utils::all_atgc;

/// Receives chunks from a producer.
pub type ChunkSink<'a> = dyn FnMut(Graph) -> Result<()> + 'a;

pub trait SuccinctIndexBuilder {
    /// Run `produce`, which pushes every chunk into the sink it is given,
    /// and build the index from what arrives. A sink error aborts `produce`.
    fn build_from_chunks(
        &mut self,
        produce: &mut dyn FnMut(&mut ChunkSink<'_>) -> Result<()>,
    ) -> Result<()>;
}

const SEPARATOR: u8 = b'N';
const SENTINEL: u8 = b'$';
const OCC_SAMPLING_RATE: u32 = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SuccinctStats {
    pub chunks: usize,
    pub nodes: usize,
    pub edges: usize,
    pub paths: usize,
    pub path_steps: usize,
    pub text_len: usize,
}

struct BuiltIndex {
    fm: FMIndex<BWT, Less, Occ>,
    sa: Vec<usize>,
    // (text offset, node id), ascending by offset
    node_starts: Vec<(usize, NodeId)>,
}

/// FM index over node sequences.
///
/// The text is every node's forward sequence followed by an `N`, in arrival
/// order, terminated by `$`. Bases outside `ACGT` are indexed as `N`, so a
/// match never spans two nodes.
#[derive(Default)]
pub struct FmIndexBuilder {
    built: Option<BuiltIndex>,
    stats: SuccinctStats,
    path_names: Vec<String>,
}

impl FmIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SuccinctStats {
        self.stats
    }

    /// Names of the paths seen in the chunk stream, in arrival order.
    pub fn path_names(&self) -> &[String] {
        &self.path_names
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Number of occurrences of `pattern` across all node sequences.
    pub fn count(&self, pattern: &[u8]) -> usize {
        match self.search(pattern) {
            Some((lower, upper)) => upper - lower,
            None => 0,
        }
    }

    /// Node positions of every occurrence of `pattern`, sorted.
    pub fn locate(&self, pattern: &[u8]) -> Vec<Position> {
        let built = match &self.built {
            Some(built) => built,
            None => return Vec::new(),
        };
        let (lower, upper) = match self.search(pattern) {
            Some(interval) => interval,
            None => return Vec::new(),
        };

        let mut found: Vec<Position> = built.sa[lower..upper]
            .iter()
            .filter_map(|&offset| {
                let i = built
                    .node_starts
                    .partition_point(|&(start, _)| start <= offset)
                    .checked_sub(1)?;
                let (start, node_id) = built.node_starts[i];
                Some(Position::new(node_id, offset - start, false))
            })
            .collect();
        found.sort();
        found
    }

    fn search(&self, pattern: &[u8]) -> Option<(usize, usize)> {
        let built = self.built.as_ref()?;
        if pattern.is_empty() || !all_atgc(pattern) {
            return None;
        }
        match built.fm.backward_search(pattern.iter()) {
            BackwardSearchResult::Complete(sai) => Some((sai.lower, sai.upper)),
            BackwardSearchResult::Partial(..) | BackwardSearchResult::Absent => None,
        }
    }
}

impl SuccinctIndexBuilder for FmIndexBuilder {
    fn build_from_chunks(
        &mut self,
        produce: &mut dyn FnMut(&mut ChunkSink<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut text = Vec::new();
        let mut node_starts = Vec::new();
        let mut stats = SuccinctStats::default();
        let mut path_names = Vec::new();

        {
            let mut sink = |chunk: Graph| -> Result<()> {
                stats.chunks += 1;
                stats.nodes += chunk.nodes.len();
                stats.edges += chunk.edges.len();
                for node in &chunk.nodes {
                    node_starts.push((text.len(), node.id));
                    text.extend(node.sequence.bytes().map(|b| {
                        match b.to_ascii_uppercase() {
                            base @ (b'A' | b'C' | b'G' | b'T') => base,
                            _ => SEPARATOR,
                        }
                    }));
                    text.push(SEPARATOR);
                }
                for path in &chunk.paths {
                    stats.path_steps += path.mappings.len();
                    if !path_names.contains(&path.name) {
                        path_names.push(path.name.clone());
                    }
                }
                Ok(())
            };
            produce(&mut sink)?;
        }
        text.push(SENTINEL);
        stats.paths = path_names.len();
        stats.text_len = text.len();

        // Chunks may arrive out of node order
        node_starts.sort_unstable();

        let alphabet = dna::n_alphabet();
        let sa = suffix_array(&text);
        let bwt = bwt(&text, &sa);
        let less = less(&bwt, &alphabet);
        let occ = Occ::new(&bwt, OCC_SAMPLING_RATE, &alphabet);

        log::info!(
            "built FM index over {} nodes ({} bp of text) from {} chunks",
            stats.nodes,
            stats.text_len,
            stats.chunks
        );

        self.built = Some(BuiltIndex {
            fm: FMIndex::new(bwt, less, occ),
            sa,
            node_starts,
        });
        self.stats = stats;
        self.path_names = path_names;
        Ok(())
    }
}

/// Re-serializes the chunk stream it is fed, unchanged, as a graph stream.
pub struct ChunkStreamWriter<W: Write> {
    writer: MessageWriter<W>,
}

impl<W: Write> ChunkStreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: MessageWriter::new(inner),
        }
    }

    pub fn written(&self) -> usize {
        self.writer.written()
    }

    pub fn finish(self) -> Result<W> {
        self.writer.finish()
    }
}

impl<W: Write> SuccinctIndexBuilder for ChunkStreamWriter<W> {
    fn build_from_chunks(
        &mut self,
        produce: &mut dyn FnMut(&mut ChunkSink<'_>) -> Result<()>,
    ) -> Result<()> {
        let writer = &mut self.writer;
        let mut sink = |chunk: Graph| writer.write_message(&chunk);
        produce(&mut sink)
    }
}
