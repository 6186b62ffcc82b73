//! In-memory variation graph assembled from stream chunks.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Read, Write};

use crate::error::Result;
use crate::io::stream;
use crate::utils::reverse_complement;

use super::types::{Edge, Graph, Handle, Mapping, Node, NodeId, Path, RankedPath};

#[cfg(test)]
#[path = "vg_test.rs"]
mod vg_test;

/// A fully loaded graph.
///
/// Paths are kept rank-keyed, so chunks may carry their mappings in any
/// order and unranked mappings are numbered as they arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationGraph {
    /// Name of the file this graph was loaded from, if any.
    pub name: String,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeSet<Edge>,
    paths: BTreeMap<String, RankedPath>,
}

impl VariationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a whole graph from a chunked stream.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut graph = Self::new();
        let chunks = stream::for_each_message(reader, |chunk: Graph| {
            graph.extend_from_chunk(chunk);
            Ok(())
        })?;
        log::debug!(
            "assembled graph from {} chunks: {} nodes, {} edges, {} paths",
            chunks,
            graph.node_count(),
            graph.edge_count(),
            graph.path_count()
        );
        Ok(graph)
    }

    /// Serialize as a chunked stream with at most `chunk_size` nodes per chunk.
    pub fn write_to<W: Write>(&self, writer: W, chunk_size: usize) -> Result<W> {
        let chunks = self.to_chunks(chunk_size);
        stream::write_messages(writer, &chunks)
    }

    pub fn extend_from_chunk(&mut self, chunk: Graph) {
        for node in chunk.nodes {
            self.nodes.insert(node.id, node);
        }
        self.edges.extend(chunk.edges);
        for path in chunk.paths {
            let ranked = self.paths.entry(path.name).or_default();
            for mapping in path.mappings {
                ranked.insert(mapping);
            }
        }
    }

    /// Split into chunks of `chunk_size` nodes in id order.
    ///
    /// Edges travel with their `from` node and mappings with the node they
    /// visit; every mapping is written with an explicit rank. References to
    /// ids outside the graph land in the nearest chunk.
    pub fn to_chunks(&self, chunk_size: usize) -> Vec<Graph> {
        let chunk_size = chunk_size.max(1);
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        let first_ids: Vec<NodeId> = ids.chunks(chunk_size).map(|c| c[0]).collect();
        let mut chunks: Vec<Graph> = vec![Graph::default(); first_ids.len().max(1)];

        let chunk_of = |id: NodeId| first_ids.partition_point(|&first| first <= id).saturating_sub(1);

        for node in self.nodes.values() {
            chunks[chunk_of(node.id)].nodes.push(node.clone());
        }
        for edge in &self.edges {
            chunks[chunk_of(edge.from)].edges.push(*edge);
        }
        for (name, ranked) in &self.paths {
            // Fragment index per chunk, so each chunk holds at most one piece of this path
            let mut fragments: HashMap<usize, usize> = HashMap::new();
            for mapping in ranked.iter() {
                let c = chunk_of(mapping.position.node_id);
                let paths = &mut chunks[c].paths;
                let slot = *fragments.entry(c).or_insert_with(|| {
                    paths.push(Path::new(name.clone()));
                    paths.len() - 1
                });
                paths[slot].mappings.push(*mapping);
            }
            if ranked.is_empty() {
                chunks[0].paths.push(Path::new(name.clone()));
            }
        }

        chunks
    }

    pub fn add_node(&mut self, id: NodeId, sequence: impl Into<String>) {
        self.nodes.insert(id, Node::new(id, sequence));
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.insert(edge);
    }

    /// Append a mapping to the named path, creating the path if needed.
    pub fn append_mapping(&mut self, path_name: &str, mapping: Mapping) -> i64 {
        self.paths
            .entry(path_name.to_string())
            .or_default()
            .insert(mapping)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Total sequence length over all nodes.
    pub fn length(&self) -> usize {
        self.nodes.values().map(|n| n.sequence.len()).sum()
    }

    pub fn path_names(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// The named path in rank order.
    pub fn path(&self, name: &str) -> Option<Path> {
        self.paths
            .get(name)
            .map(|ranked| ranked.clone().into_path(name))
    }

    pub fn paths(&self) -> impl Iterator<Item = Path> + '_ {
        self.paths
            .iter()
            .map(|(name, ranked)| ranked.clone().into_path(name.as_str()))
    }

    pub(crate) fn ranked_paths(&self) -> impl Iterator<Item = (&str, &RankedPath)> {
        self.paths.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    pub fn min_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next().copied()
    }

    /// Shift every node identifier, and every reference to one, up by `delta`.
    pub fn increment_node_ids(&mut self, delta: NodeId) {
        if delta == 0 {
            return;
        }
        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_values()
            .map(|mut node| {
                node.id += delta;
                (node.id, node)
            })
            .collect();

        let edges = std::mem::take(&mut self.edges);
        self.edges = edges
            .into_iter()
            .map(|mut edge| {
                edge.from += delta;
                edge.to += delta;
                edge
            })
            .collect();

        for ranked in self.paths.values_mut() {
            for mapping in ranked.iter_mut() {
                mapping.position.node_id += delta;
            }
        }
    }

    /// Sequence of a node as read in the handle's orientation.
    pub fn oriented_sequence(&self, handle: Handle) -> Vec<u8> {
        match self.nodes.get(&handle.id) {
            Some(node) if handle.backward => reverse_complement(node.sequence.as_bytes()),
            Some(node) => node.sequence.as_bytes().to_vec(),
            None => Vec::new(),
        }
    }

    /// Nodes with nothing entering their start on the forward strand.
    pub fn head_nodes(&self) -> Vec<NodeId> {
        let entered: BTreeSet<NodeId> = self
            .edges
            .iter()
            .flat_map(Edge::traversals)
            .filter(|(_, to)| !to.backward)
            .map(|(_, to)| to.id)
            .collect();
        self.nodes
            .keys()
            .copied()
            .filter(|id| !entered.contains(id))
            .collect()
    }

    /// Nodes with nothing leaving their end on the forward strand.
    pub fn tail_nodes(&self) -> Vec<NodeId> {
        let left: BTreeSet<NodeId> = self
            .edges
            .iter()
            .flat_map(Edge::traversals)
            .filter(|(from, _)| !from.backward)
            .map(|(from, _)| from.id)
            .collect();
        self.nodes
            .keys()
            .copied()
            .filter(|id| !left.contains(id))
            .collect()
    }

    /// Add boundary marker nodes: a head of `length` copies of `start_char`
    /// feeding every head node, and a tail of `length` copies of `end_char`
    /// fed by every tail node.
    ///
    /// An id of 0 picks the next free identifier. A graph with no heads (or
    /// no tails) is attached at its lowest (or highest) node. Returns the
    /// marker ids.
    pub fn add_start_end_markers(
        &mut self,
        length: usize,
        start_char: u8,
        end_char: u8,
        head_id: NodeId,
        tail_id: NodeId,
    ) -> (NodeId, NodeId) {
        let mut heads = self.head_nodes();
        let mut tails = self.tail_nodes();
        if heads.is_empty() {
            heads.extend(self.min_node_id());
        }
        if tails.is_empty() {
            tails.extend(self.max_node_id());
        }

        let next_free = self.max_node_id().unwrap_or(0) + 1;
        let head_id = if head_id == 0 { next_free } else { head_id };
        let tail_id = if tail_id == 0 {
            next_free.max(head_id) + 1
        } else {
            tail_id
        };

        let head_seq = String::from_utf8_lossy(&vec![start_char; length]).into_owned();
        let tail_seq = String::from_utf8_lossy(&vec![end_char; length]).into_owned();
        self.add_node(head_id, head_seq);
        self.add_node(tail_id, tail_seq);

        for id in heads {
            self.add_edge(Edge::simple(head_id, id));
        }
        for id in tails {
            self.add_edge(Edge::simple(id, tail_id));
        }

        log::debug!(
            "{}: added start/end markers {} and {}",
            self.name,
            head_id,
            tail_id
        );
        (head_id, tail_id)
    }
}
