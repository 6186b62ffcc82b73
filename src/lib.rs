pub mod defaults;
pub mod error;
pub mod graph; // Variation graphs, chunks and k-mer walks
pub mod index; // KV k-mer index and succinct index builders
pub mod io; // Graph files and the chunked stream container
pub mod kmer_opt;
pub mod set; // Operations over a list of graph files
pub mod utils;

pub use error::{GraphSetError, Result};
pub use set::GraphSet;
