//! Variation graphs: wire chunks, the assembled in-memory graph and k-mer
//! enumeration over it.

pub mod kmer;
pub mod types;
pub mod vg;

pub use kmer::{KmerMatch, KmerParams, KmerPosition};
pub use types::{Edge, Graph, Handle, Mapping, Node, NodeId, Path, Position, RankedPath};
pub use vg::VariationGraph;
