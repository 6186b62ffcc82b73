//! K-mer walk enumeration over one graph.
//!
//! Every k-mer occurrence starts at an oriented position of a node and follows
//! successor handles until `kmer_size` symbols are collected. Walks from the
//! same start that spell the same k-mer are merged into one [`KmerPosition`],
//! carrying the union of their successor characters and next positions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::defaults::{EDGE_MAX, KMER_STRIDE, NO_PREDECESSOR, NO_SUCCESSOR};

use super::types::{Handle, NodeId, Position};
use super::vg::VariationGraph;

#[cfg(test)]
#[path = "kmer_test.rs"]
mod kmer_test;

/// Parameters of one enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerParams {
    pub kmer_size: usize,
    /// Only every `stride`-th offset of a node starts a k-mer.
    pub stride: usize,
    /// Start only on path-covered nodes and follow only edges a path takes.
    pub path_only: bool,
    /// Drop walks crossing more than this many branching points (0 = unbounded).
    pub edge_max: usize,
    /// Skip the reverse strand.
    pub forward_only: bool,
}

impl KmerParams {
    pub fn new(kmer_size: usize) -> Self {
        Self {
            kmer_size,
            stride: KMER_STRIDE,
            path_only: false,
            edge_max: EDGE_MAX,
            forward_only: false,
        }
    }
}

/// A k-mer occurrence as stored in the key-value index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KmerMatch {
    pub sequence: String,
    pub node_id: NodeId,
    pub position: usize,
    pub backward: bool,
}

/// A k-mer occurrence with its neighbourhood, as consumed by suffix-array
/// index construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerPosition {
    pub kmer: String,
    pub pos: Position,
    pub prev_chars: BTreeSet<char>,
    pub next_chars: BTreeSet<char>,
    pub next_positions: BTreeSet<Position>,
}

impl KmerPosition {
    pub fn to_match(&self) -> KmerMatch {
        KmerMatch {
            sequence: self.kmer.clone(),
            node_id: self.pos.node_id,
            position: self.pos.offset,
            backward: self.pos.is_reverse,
        }
    }

    /// Tab-separated record: k-mer, start, predecessors, successors, next
    /// positions. Missing predecessors render as `$`, missing successors as
    /// `#`, and a k-mer with nowhere to go points at `boundary_id:0`.
    pub fn to_text_record(&self, boundary_id: NodeId) -> String {
        let prev = join_or(&self.prev_chars, NO_PREDECESSOR);
        let next = join_or(&self.next_chars, NO_SUCCESSOR);
        let positions = if self.next_positions.is_empty() {
            Position::new(boundary_id, 0, false).to_string()
        } else {
            join(self.next_positions.iter())
        };
        format!("{}\t{}\t{}\t{}\t{}", self.kmer, self.pos, prev, next, positions)
    }
}

// Same layout as `to_text_record`, for graphs whose boundaries are real marker
// nodes; an empty column stays empty.
impl fmt::Display for KmerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.kmer,
            self.pos,
            join(self.prev_chars.iter()),
            join(self.next_chars.iter()),
            join(self.next_positions.iter())
        )
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn join_or(chars: &BTreeSet<char>, empty: char) -> String {
    if chars.is_empty() {
        empty.to_string()
    } else {
        join(chars.iter())
    }
}

/// Oriented adjacency with the node sequences in both orientations, built
/// once per enumeration.
struct Topology {
    sequences: HashMap<Handle, Vec<u8>>,
    successors: HashMap<Handle, Vec<Handle>>,
    predecessors: HashMap<Handle, Vec<Handle>>,
    starts: Vec<NodeId>,
}

impl Topology {
    fn build(graph: &VariationGraph, path_only: bool) -> Self {
        let mut sequences = HashMap::with_capacity(graph.node_count() * 2);
        for id in graph.node_ids() {
            for handle in [Handle::forward(id), Handle::reverse(id)] {
                sequences.insert(handle, graph.oriented_sequence(handle));
            }
        }

        let mut links: HashSet<(Handle, Handle)> = HashSet::new();
        let mut starts: BTreeSet<NodeId> = BTreeSet::new();
        if path_only {
            for (_, ranked) in graph.ranked_paths() {
                let steps: Vec<Handle> = ranked
                    .iter()
                    .map(|m| m.handle())
                    .filter(|h| graph.has_node(h.id))
                    .collect();
                starts.extend(steps.iter().map(|h| h.id));
                for pair in steps.windows(2) {
                    links.insert((pair[0], pair[1]));
                    links.insert((pair[1].flip(), pair[0].flip()));
                }
            }
        } else {
            starts.extend(graph.node_ids());
            for edge in graph.edges() {
                if !graph.has_node(edge.from) || !graph.has_node(edge.to) {
                    continue;
                }
                links.extend(edge.traversals());
            }
        }

        let mut successors: HashMap<Handle, Vec<Handle>> = HashMap::new();
        let mut predecessors: HashMap<Handle, Vec<Handle>> = HashMap::new();
        for (from, to) in links {
            // Empty nodes carry no symbols and could cycle forever
            if sequences.get(&to).map_or(true, |s| s.is_empty()) {
                continue;
            }
            if sequences.get(&from).map_or(true, |s| s.is_empty()) {
                continue;
            }
            successors.entry(from).or_default().push(to);
            predecessors.entry(to).or_default().push(from);
        }
        for list in successors.values_mut().chain(predecessors.values_mut()) {
            list.sort();
        }

        Self {
            sequences,
            successors,
            predecessors,
            starts: starts.into_iter().collect(),
        }
    }

    fn sequence(&self, handle: Handle) -> &[u8] {
        self.sequences.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }

    fn successors(&self, handle: Handle) -> &[Handle] {
        self.successors.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }

    fn predecessors(&self, handle: Handle) -> &[Handle] {
        self.predecessors.get(&handle).map(Vec::as_slice).unwrap_or(&[])
    }
}

// State shared by all walks leaving one start position
struct WalkStart<'a> {
    topology: &'a Topology,
    params: &'a KmerParams,
    start: Position,
    prev_chars: BTreeSet<char>,
    found: BTreeMap<Vec<u8>, KmerPosition>,
}

impl WalkStart<'_> {
    fn extend(&mut self, handle: Handle, from: usize, kmer: &mut Vec<u8>, branches: usize) {
        let topology = self.topology;
        let seq = topology.sequence(handle);
        let need = self.params.kmer_size - kmer.len();
        let mark = kmer.len();

        if seq.len() - from >= need {
            kmer.extend_from_slice(&seq[from..from + need]);
            let last = from + need - 1;
            let mut next_chars = BTreeSet::new();
            let mut next_positions = BTreeSet::new();
            if last + 1 < seq.len() {
                next_chars.insert(seq[last + 1] as char);
                next_positions.insert(Position::new(handle.id, last + 1, handle.backward));
            } else {
                for &next in topology.successors(handle) {
                    if let Some(&c) = topology.sequence(next).first() {
                        next_chars.insert(c as char);
                    }
                    next_positions.insert(Position::new(next.id, 0, next.backward));
                }
            }

            let start = self.start;
            let prev_chars = &self.prev_chars;
            let entry = self.found.entry(kmer.clone()).or_insert_with(|| KmerPosition {
                kmer: String::from_utf8_lossy(kmer).into_owned(),
                pos: start,
                prev_chars: prev_chars.clone(),
                next_chars: BTreeSet::new(),
                next_positions: BTreeSet::new(),
            });
            entry.next_chars.extend(next_chars);
            entry.next_positions.extend(next_positions);
        } else {
            kmer.extend_from_slice(&seq[from..]);
            let successors = topology.successors(handle);
            let branches = if successors.len() > 1 { branches + 1 } else { branches };
            if self.params.edge_max == 0 || branches <= self.params.edge_max {
                for &next in successors {
                    self.extend(next, 0, kmer, branches);
                }
            }
        }

        kmer.truncate(mark);
    }
}

impl VariationGraph {
    /// Enumerate every k-mer occurrence, in parallel over start nodes.
    ///
    /// `handle` is called once per distinct (start, k-mer) pair from whichever
    /// rayon worker found it. The first error stops the enumeration and is
    /// returned.
    pub fn try_for_each_kmer_position<F, E>(&self, params: &KmerParams, handle: F) -> Result<(), E>
    where
        F: Fn(KmerPosition) -> Result<(), E> + Sync + Send,
        E: Send,
    {
        if params.kmer_size == 0 {
            return Ok(());
        }
        let topology = Topology::build(self, params.path_only);
        let stride = params.stride.max(1);
        let strands: &[bool] = if params.forward_only {
            &[false]
        } else {
            &[false, true]
        };

        topology.starts.par_iter().try_for_each(|&id| {
            for &backward in strands {
                let start_handle = Handle { id, backward };
                let seq = topology.sequence(start_handle);
                for offset in (0..seq.len()).step_by(stride) {
                    let prev_chars: BTreeSet<char> = if offset > 0 {
                        std::iter::once(seq[offset - 1] as char).collect()
                    } else {
                        topology
                            .predecessors(start_handle)
                            .iter()
                            .filter_map(|&p| topology.sequence(p).last().map(|&c| c as char))
                            .collect()
                    };
                    let mut walk = WalkStart {
                        topology: &topology,
                        params,
                        start: Position::new(id, offset, backward),
                        prev_chars,
                        found: BTreeMap::new(),
                    };
                    let mut kmer = Vec::with_capacity(params.kmer_size);
                    walk.extend(start_handle, offset, &mut kmer, 0);
                    for (_, position) in walk.found {
                        handle(position)?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Infallible form of [`Self::try_for_each_kmer_position`].
    pub fn for_each_kmer_position<F>(&self, params: &KmerParams, handle: F)
    where
        F: Fn(KmerPosition) + Sync + Send,
    {
        let _ = self.try_for_each_kmer_position::<_, ()>(params, |kp| {
            handle(kp);
            Ok(())
        });
    }

    /// Collect every occurrence; mostly useful for small graphs and tests.
    pub fn kmer_positions(&self, params: &KmerParams) -> Vec<KmerPosition> {
        let out = std::sync::Mutex::new(Vec::new());
        self.for_each_kmer_position(params, |kp| {
            out.lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(kp)
        });
        let mut positions = out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        positions.sort_by(|a, b| (a.pos, &a.kmer).cmp(&(b.pos, &b.kmer)));
        positions
    }
}
