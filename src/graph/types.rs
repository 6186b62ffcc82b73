//! Wire-level graph types.
//!
//! `Graph` is the message stored in each frame of a graph file. A whole graph
//! may be spread over many of them; see [`crate::graph::VariationGraph`] for
//! the assembled form.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type NodeId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub sequence: String,
}

impl Node {
    pub fn new(id: NodeId, sequence: impl Into<String>) -> Self {
        Self {
            id,
            sequence: sequence.into(),
        }
    }
}

/// Edge between two node sides.
///
/// `from_start` leaves `from` through its start instead of its end; `to_end`
/// enters `to` through its end instead of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub from_start: bool,
    pub to_end: bool,
}

impl Edge {
    /// End of `from` to start of `to`.
    pub fn simple(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            from_start: false,
            to_end: false,
        }
    }

    /// The two oriented steps this edge allows: leaving `from` into `to`,
    /// and the same step read along the opposite strand.
    pub fn traversals(&self) -> [(Handle, Handle); 2] {
        let from = Handle {
            id: self.from,
            backward: self.from_start,
        };
        let to = Handle {
            id: self.to,
            backward: self.to_end,
        };
        [(from, to), (to.flip(), from.flip())]
    }
}

/// A node in a particular orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    pub id: NodeId,
    pub backward: bool,
}

impl Handle {
    pub fn forward(id: NodeId) -> Self {
        Self { id, backward: false }
    }

    pub fn reverse(id: NodeId) -> Self {
        Self { id, backward: true }
    }

    #[inline]
    pub fn flip(self) -> Self {
        Self {
            id: self.id,
            backward: !self.backward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub node_id: NodeId,
    pub offset: usize,
    pub is_reverse: bool,
}

impl Position {
    pub fn new(node_id: NodeId, offset: usize, is_reverse: bool) -> Self {
        Self {
            node_id,
            offset,
            is_reverse,
        }
    }
}

// `id:offset`, with the offset negated on the reverse strand
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reverse {
            write!(f, "{}:-{}", self.node_id, self.offset)
        } else {
            write!(f, "{}:{}", self.node_id, self.offset)
        }
    }
}

/// One step of a path. A rank of 0 means "unranked".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mapping {
    pub position: Position,
    pub rank: i64,
}

impl Mapping {
    pub fn new(node_id: NodeId, is_reverse: bool, rank: i64) -> Self {
        Self {
            position: Position::new(node_id, 0, is_reverse),
            rank,
        }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            id: self.position.node_id,
            backward: self.position.is_reverse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Path {
    pub name: String,
    pub mappings: Vec<Mapping>,
}

impl Path {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
        }
    }
}

/// Rank-keyed mappings of one path, accumulated across chunks.
///
/// An unranked mapping is filed one past the current highest rank (or at 1
/// when nothing is filed yet) at the moment it is inserted, so its final place
/// depends on arrival order. A mapping with an explicit rank replaces any
/// earlier one holding that rank.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankedPath {
    mappings: BTreeMap<i64, Mapping>,
}

impl RankedPath {
    /// File `mapping` under its rank, assigning one if it is unranked.
    /// Returns the rank used.
    pub fn insert(&mut self, mut mapping: Mapping) -> i64 {
        if mapping.rank == 0 {
            mapping.rank = match self.mappings.keys().next_back() {
                Some(&last) => last + 1,
                None => 1,
            };
        }
        let rank = mapping.rank;
        self.mappings.insert(rank, mapping);
        rank
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mapping> {
        self.mappings.values_mut()
    }

    /// Flatten into a `Path` in ascending rank order.
    pub fn into_path(self, name: impl Into<String>) -> Path {
        Path {
            name: name.into(),
            mappings: self.mappings.into_values().collect(),
        }
    }
}

/// One frame of a graph stream: a whole graph or a piece of one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub paths: Vec<Path>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.paths.is_empty()
    }
}
