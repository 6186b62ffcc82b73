// Graph file references: a named file or standard input.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::defaults::STDIN_NAME;
use crate::error::{GraphSetError, Result};
use crate::graph::VariationGraph;

const FILE_BUFFER_SIZE: usize = 4 * 1024 * 1024; // 4MB

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphFile {
    Named(PathBuf),
    Stdin,
}

impl GraphFile {
    /// `-` means standard input, anything else is a path.
    pub fn from_arg(arg: impl AsRef<Path>) -> Self {
        let path = arg.as_ref();
        if path.to_str() == Some(STDIN_NAME) {
            GraphFile::Stdin
        } else {
            GraphFile::Named(path.to_path_buf())
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, GraphFile::Stdin)
    }

    /// Open for reading. Failure names the offending path.
    pub fn open(&self) -> Result<Box<dyn Read>> {
        match self {
            GraphFile::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            GraphFile::Named(path) => {
                let file = File::open(path).map_err(|source| GraphSetError::Open {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufReader::with_capacity(FILE_BUFFER_SIZE, file)))
            }
        }
    }

    /// Load the whole graph and name it after this file.
    pub fn load(&self) -> Result<VariationGraph> {
        let mut graph = VariationGraph::read_from(self.open()?)?;
        graph.name = self.to_string();
        Ok(graph)
    }

    /// Serialize `graph` over this file. A graph read from standard input is
    /// written to standard output.
    pub fn store(&self, graph: &VariationGraph, chunk_size: usize) -> Result<()> {
        match self {
            GraphFile::Stdin => {
                let out = BufWriter::new(io::stdout().lock());
                graph.write_to(out, chunk_size)?.flush()?;
            }
            GraphFile::Named(path) => {
                let file = File::create(path).map_err(|source| GraphSetError::Create {
                    path: path.clone(),
                    source,
                })?;
                let out = BufWriter::with_capacity(FILE_BUFFER_SIZE, file);
                graph.write_to(out, chunk_size)?.flush()?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for GraphFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFile::Named(path) => write!(f, "{}", path.display()),
            GraphFile::Stdin => f.write_str(STDIN_NAME),
        }
    }
}
