//! Error type shared by every graph-set operation.
//!
//! None of these are retried. An open or decode failure halts the running
//! operation, and files already rewritten by a mutating traversal stay
//! rewritten.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphSetError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Standard input can only be consumed once per traversal.
    #[error("standard input ('-') is listed more than once in the graph set")]
    RepeatedStdin,

    #[error("malformed graph stream: {0}")]
    Decode(#[from] bincode::Error),

    /// Marker ids can't default to the set maximum without a second pass.
    #[error("head and tail marker ids must be given when reading standard input")]
    MarkerIdsRequired,

    #[error("stream frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(u64),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("kmer index: {0}")]
    Index(#[from] redb::Error),

    #[error("invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, GraphSetError>;
