//! A set of independently stored graphs treated as one graph space.
//!
//! Graphs are visited one at a time in list order. Each visit loads one file
//! fully, hands the graph to the action as `&mut`, and either drops it
//! (read-only traversal) or writes it back over its file first (mutating
//! traversal). Any failure aborts the whole traversal; files already
//! rewritten stay rewritten.

pub mod kmers;
pub mod paths;

pub use kmers::KmerExportFormat;
pub use paths::PathSplitter;

use std::path::Path;

use crate::defaults::CHUNK_SIZE;
use crate::error::{GraphSetError, Result};
use crate::graph::{NodeId, VariationGraph};
use crate::index::KmerIndex;
use crate::io::GraphFile;
use crate::utils::{plural, realtime};


#[derive(Debug, Clone)]
pub struct GraphSet {
    files: Vec<GraphFile>,
    show_progress: bool,
    chunk_size: usize,
}

impl GraphSet {
    /// Build a set from file names, `-` meaning standard input.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        Self::from_files(names.into_iter().map(GraphFile::from_arg).collect())
    }

    /// Standard input may appear at most once.
    pub fn from_files(files: Vec<GraphFile>) -> Result<Self> {
        if files.iter().filter(|f| f.is_stdin()).count() > 1 {
            return Err(GraphSetError::RepeatedStdin);
        }
        Ok(Self {
            files,
            show_progress: false,
            chunk_size: CHUNK_SIZE,
        })
    }

    /// Log each file as it is visited.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Nodes per chunk when graphs are written back.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn files(&self) -> &[GraphFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Read-only traversal threading an accumulator through every graph.
    pub fn fold<A, F>(&self, init: A, action: F) -> Result<A>
    where
        F: FnMut(A, &mut VariationGraph) -> Result<A>,
    {
        self.traverse(init, action, false)
    }

    /// Like [`fold`](Self::fold), but each graph is written back over its
    /// file after the action runs.
    pub fn transform_fold<A, F>(&self, init: A, action: F) -> Result<A>
    where
        F: FnMut(A, &mut VariationGraph) -> Result<A>,
    {
        self.traverse(init, action, true)
    }

    pub fn for_each<F>(&self, mut action: F) -> Result<()>
    where
        F: FnMut(&mut VariationGraph) -> Result<()>,
    {
        self.fold((), |(), graph| action(graph))
    }

    pub fn transform<F>(&self, mut action: F) -> Result<()>
    where
        F: FnMut(&mut VariationGraph) -> Result<()>,
    {
        self.transform_fold((), |(), graph| action(graph))
    }

    fn traverse<A, F>(&self, init: A, mut action: F, store: bool) -> Result<A>
    where
        F: FnMut(A, &mut VariationGraph) -> Result<A>,
    {
        let mut acc = init;
        let total = self.files.len();
        for (i, file) in self.files.iter().enumerate() {
            let start = realtime();
            let mut graph = file.load()?;
            if self.show_progress {
                log::info!(
                    "[{}/{}] {}: {} {}, {} {}",
                    i + 1,
                    total,
                    file,
                    graph.node_count(),
                    plural(graph.node_count(), "node", "nodes"),
                    graph.edge_count(),
                    plural(graph.edge_count(), "edge", "edges")
                );
            }

            acc = action(acc, &mut graph)?;

            if store {
                file.store(&graph, self.chunk_size)?;
            }
            log::debug!("{} done in {:.3} sec", file, realtime() - start);
        }
        Ok(acc)
    }

    /// Give every graph its own id range: each graph is shifted up past the
    /// largest id of the graphs before it, and rewritten. Returns the largest
    /// id in the set afterwards, or `None` when the set holds no nodes.
    pub fn merge_id_space(&self) -> Result<Option<NodeId>> {
        let max_id = self.transform_fold(None, |max_so_far: Option<NodeId>, graph| {
            if let Some(delta) = max_so_far {
                graph.increment_node_ids(delta);
            }
            Ok(graph.max_node_id().or(max_so_far))
        })?;
        log::info!(
            "merged id space of {} {}, max node id {}",
            self.len(),
            plural(self.len(), "graph", "graphs"),
            max_id.unwrap_or(0)
        );
        Ok(max_id)
    }

    /// Largest node id across the set.
    pub fn max_node_id(&self) -> Result<Option<NodeId>> {
        self.fold(None, |max_so_far: Option<NodeId>, graph| {
            Ok(max_so_far.max(graph.max_node_id()))
        })
    }

    /// Load the nodes and edges of every graph into `index`.
    pub fn store_in_index<I: KmerIndex + ?Sized>(&self, index: &I) -> Result<()> {
        self.for_each(|graph| index.load_graph(graph))
    }

    /// Load the paths of every graph into `index`.
    pub fn store_paths_in_index<I: KmerIndex + ?Sized>(&self, index: &I) -> Result<()> {
        self.for_each(|graph| index.load_paths(graph))
    }
}
