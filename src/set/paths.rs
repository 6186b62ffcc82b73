//! Splitting selected paths out of a chunk stream.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::Result;
use crate::graph::{Graph, Path, RankedPath};
use crate::index::{ChunkSink, SuccinctIndexBuilder};
use crate::io::stream;

use super::GraphSet;

/// Takes the paths whose whole name matches a pattern out of each chunk and
/// reassembles them by rank.
///
/// Without a pattern nothing is taken.
#[derive(Debug, Default)]
pub struct PathSplitter {
    pattern: Option<Regex>,
    taken: BTreeMap<String, RankedPath>,
}

impl PathSplitter {
    pub fn new(pattern: Option<&Regex>) -> Result<Self> {
        let pattern = match pattern {
            Some(re) => Some(Regex::new(&format!("^(?:{})$", re.as_str()))?),
            None => None,
        };
        Ok(Self {
            pattern,
            taken: BTreeMap::new(),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Move matching paths out of `chunk` into the rank tables. The paths
    /// left behind keep their relative order.
    pub fn filter_chunk(&mut self, chunk: &mut Graph) {
        if self.pattern.is_none() {
            return;
        }
        let paths = std::mem::take(&mut chunk.paths);
        for path in paths {
            if self.matches(&path.name) {
                let table = self.taken.entry(path.name).or_default();
                for mapping in path.mappings {
                    table.insert(mapping);
                }
            } else {
                chunk.paths.push(path);
            }
        }
    }

    /// Number of distinct path names taken so far.
    pub fn taken_count(&self) -> usize {
        self.taken.len()
    }

    /// Flatten every table into a path in ascending rank order.
    pub fn finish(self) -> BTreeMap<String, Path> {
        self.taken
            .into_iter()
            .map(|(name, table)| {
                let path = table.into_path(name.clone());
                (name, path)
            })
            .collect()
    }
}

impl GraphSet {
    /// Stream every file's chunks into `builder`, holding back the paths
    /// whose names match `pattern`. Returns the held-back paths by name.
    pub fn to_succinct<B>(
        &self,
        builder: &mut B,
        pattern: Option<&Regex>,
    ) -> Result<BTreeMap<String, Path>>
    where
        B: SuccinctIndexBuilder + ?Sized,
    {
        let mut splitter = PathSplitter::new(pattern)?;
        let files = self.files();

        builder.build_from_chunks(&mut |sink: &mut ChunkSink<'_>| {
            for file in files {
                let chunks = stream::for_each_message(file.open()?, |mut chunk: Graph| {
                    splitter.filter_chunk(&mut chunk);
                    sink(chunk)
                })?;
                log::debug!("{}: forwarded {} chunks", file, chunks);
            }
            Ok(())
        })?;

        log::info!(
            "held back {} of the paths in {} files",
            splitter.taken_count(),
            files.len()
        );
        Ok(splitter.finish())
    }
}
