use clap::Args;

use crate::defaults;
use crate::graph::KmerParams;

/// K-mer enumeration and indexing options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmerOpt {
    pub kmer_size: usize, // Length of every emitted k-mer
    pub stride: usize,    // Start a walk every `stride` bases of a node
    pub path_only: bool,  // Only follow edges that some path crosses
    pub edge_max: usize,  // Branch points a walk may cross (0 = unbounded)
    pub allow_negatives: bool, // Also index reverse-strand k-mers

    pub buffer_max_size: usize, // Matches per worker buffer before a batch write
    pub threads: usize,         // Workers per graph
}

impl Default for KmerOpt {
    fn default() -> Self {
        KmerOpt {
            kmer_size: defaults::KMER_SIZE,
            stride: defaults::KMER_STRIDE,
            path_only: false,
            edge_max: defaults::EDGE_MAX,
            allow_negatives: false,
            buffer_max_size: defaults::KMER_BUFFER_MAX,
            threads: num_cpus::get(),
        }
    }
}

impl KmerOpt {
    pub fn params(&self) -> KmerParams {
        KmerParams {
            kmer_size: self.kmer_size,
            stride: self.stride,
            path_only: self.path_only,
            edge_max: self.edge_max,
            forward_only: !self.allow_negatives,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.kmer_size == 0 {
            errors.push("kmer size must be positive".to_string());
        }
        if self.stride == 0 {
            errors.push("stride must be positive".to_string());
        }
        if self.buffer_max_size == 0 {
            errors.push("write buffer size must be positive".to_string());
        }
        if self.threads == 0 {
            errors.push("thread count must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct KmerCliOptions {
    /// K-mer length
    #[arg(short = 'k', long, value_name = "INT", default_value_t = defaults::KMER_SIZE)]
    pub kmer_size: usize,

    /// Start a k-mer every INT bases
    #[arg(short = 'j', long, value_name = "INT", default_value_t = defaults::KMER_STRIDE)]
    pub stride: usize,

    /// Only walk edges covered by a path
    #[arg(short = 'P', long)]
    pub path_only: bool,

    /// Cross at most INT branch points per k-mer (0 = unbounded)
    #[arg(short = 'e', long, value_name = "INT", default_value_t = defaults::EDGE_MAX)]
    pub edge_max: usize,

    /// Matches buffered per worker before a batch write
    #[arg(long, value_name = "INT", default_value_t = defaults::KMER_BUFFER_MAX)]
    pub buffer_size: usize,

    /// Number of threads (default: all cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,
}

impl KmerCliOptions {
    /// Options for a forward-strand walk; callers opt in to the reverse strand.
    pub fn to_opt(&self) -> KmerOpt {
        KmerOpt {
            kmer_size: self.kmer_size,
            stride: self.stride,
            path_only: self.path_only,
            edge_max: self.edge_max,
            allow_negatives: false,
            buffer_max_size: self.buffer_size,
            threads: self.threads.unwrap_or_else(num_cpus::get),
        }
    }
}
