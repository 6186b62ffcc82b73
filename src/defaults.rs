// src/defaults.rs

// K-mer extraction
pub const KMER_SIZE: usize = 11;
pub const KMER_STRIDE: usize = 1;
pub const EDGE_MAX: usize = 0; // 0 = no bound on branching points per walk
pub const KMER_BUFFER_MAX: usize = 100_000;

// Streaming container
pub const CHUNK_SIZE: usize = 1000; // nodes per serialized chunk
pub const MAX_FRAME_LEN: u64 = 1 << 30;

// Start/end marker characters for boundary nodes
pub const START_MARKER: u8 = b'#';
pub const END_MARKER: u8 = b'$';

// Text export placeholders for missing neighbours
pub const NO_PREDECESSOR: char = '$';
pub const NO_SUCCESSOR: char = '#';

// Other Constants
pub const VERBOSITY: i32 = 3;
pub const STDIN_NAME: &str = "-";
