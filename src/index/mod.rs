//! Index collaborators fed by graph-set operations.
//!
//! - `KmerIndex`: disk-backed key-value index taking atomic k-mer batches
//!   (implemented by `KmerDb`)
//! - `SuccinctIndexBuilder`: full-text index built from a chunk stream
//!   (implemented by `FmIndexBuilder` and `ChunkStreamWriter`)

pub mod kmer_db;
pub mod succinct;
pub mod write_buffer;

pub use kmer_db::KmerDb;
pub use succinct::{ChunkSink, ChunkStreamWriter, FmIndexBuilder, SuccinctIndexBuilder};
pub use write_buffer::WriteBuffer;

use crate::error::Result;
use crate::graph::{KmerMatch, VariationGraph};

/// A key-value index for k-mer occurrences.
///
/// Implementations must make each `write_kmer_batch` call atomic: either the
/// whole batch becomes visible or none of it does. Calls may arrive from
/// several threads at once.
pub trait KmerIndex: Sync {
    fn write_kmer_batch(&self, batch: &[KmerMatch]) -> Result<()>;

    /// Record the k-mer length the index was built with.
    fn remember_kmer_size(&self, kmer_size: usize) -> Result<()>;

    /// Store the nodes and edges of a graph.
    fn load_graph(&self, graph: &VariationGraph) -> Result<()>;

    /// Store the paths of a graph.
    fn load_paths(&self, graph: &VariationGraph) -> Result<()>;
}
