pub mod graph_file;
pub mod stream;

pub use graph_file::GraphFile;
