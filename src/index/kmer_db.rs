//! redb-backed key-value index.
//!
//! Tables:
//! - `kmers`: `kmer \0 node_id(BE) offset(BE) backward` -> ()
//! - `nodes`: node id -> sequence
//! - `edges`: `from(BE) to(BE) from_start to_end` -> ()
//! - `paths`: `name \0 rank(BE, sign-flipped)` -> bincode `Mapping`
//! - `meta`: name -> u64
//!
//! Every write goes through its own write transaction, so a batch is either
//! fully visible or not at all. redb admits one writer at a time; concurrent
//! batches queue up behind each other.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{GraphSetError, Result};
use crate::graph::{Edge, KmerMatch, Mapping, NodeId, VariationGraph};

use super::KmerIndex;

const KMERS: TableDefinition<&[u8], ()> = TableDefinition::new("kmers");
const NODES: TableDefinition<u64, &str> = TableDefinition::new("nodes");
const EDGES: TableDefinition<&[u8], ()> = TableDefinition::new("edges");
const PATHS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("paths");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const KMER_SIZE_KEY: &str = "kmer_size";

// separator + node id + offset + strand
const KMER_KEY_TAIL: usize = 1 + 8 + 8 + 1;

fn db_err<E: Into<redb::Error>>(e: E) -> GraphSetError {
    GraphSetError::Index(e.into())
}

fn kmer_key(kmer: &KmerMatch) -> Vec<u8> {
    let mut key = Vec::with_capacity(kmer.sequence.len() + KMER_KEY_TAIL);
    key.extend_from_slice(kmer.sequence.as_bytes());
    key.push(0);
    key.extend_from_slice(&kmer.node_id.to_be_bytes());
    key.extend_from_slice(&(kmer.position as u64).to_be_bytes());
    key.push(kmer.backward as u8);
    key
}

fn decode_kmer_key(key: &[u8]) -> Option<KmerMatch> {
    let split = key.len().checked_sub(KMER_KEY_TAIL)?;
    let (sequence, tail) = key.split_at(split);
    let node_id = u64::from_be_bytes(tail[1..9].try_into().ok()?);
    let position = u64::from_be_bytes(tail[9..17].try_into().ok()?) as usize;
    Some(KmerMatch {
        sequence: String::from_utf8_lossy(sequence).into_owned(),
        node_id,
        position,
        backward: tail[17] != 0,
    })
}

fn edge_key(edge: &Edge) -> [u8; 18] {
    let mut key = [0u8; 18];
    key[..8].copy_from_slice(&edge.from.to_be_bytes());
    key[8..16].copy_from_slice(&edge.to.to_be_bytes());
    key[16] = edge.from_start as u8;
    key[17] = edge.to_end as u8;
    key
}

fn path_prefix(name: &str, terminator: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 9);
    key.extend_from_slice(name.as_bytes());
    key.push(terminator);
    key
}

// Sign bit flipped so negative ranks sort before positive ones
fn path_key(name: &str, rank: i64) -> Vec<u8> {
    let mut key = path_prefix(name, 0);
    key.extend_from_slice(&((rank as u64) ^ (1 << 63)).to_be_bytes());
    key
}

pub struct KmerDb {
    db: Database,
    path: PathBuf,
}

impl KmerDb {
    /// Open the database at `path`, creating it and its tables if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(db_err)?;

        let txn = db.begin_write().map_err(db_err)?;
        txn.open_table(KMERS).map_err(db_err)?;
        txn.open_table(NODES).map_err(db_err)?;
        txn.open_table(EDGES).map_err(db_err)?;
        txn.open_table(PATHS).map_err(db_err)?;
        txn.open_table(META).map_err(db_err)?;
        txn.commit().map_err(db_err)?;

        log::debug!("opened kmer index {}", path.display());
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kmer_size(&self) -> Result<Option<usize>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(META).map_err(db_err)?;
        let value = table.get(KMER_SIZE_KEY).map_err(db_err)?;
        Ok(value.map(|v| v.value() as usize))
    }

    /// All stored occurrences of `kmer`, ordered by node, offset and strand.
    pub fn find_kmer(&self, kmer: &str) -> Result<Vec<KmerMatch>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(KMERS).map_err(db_err)?;
        let mut start = kmer.as_bytes().to_vec();
        start.push(0);
        let mut end = kmer.as_bytes().to_vec();
        end.push(1);

        let mut found = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice()).map_err(db_err)? {
            let (key, _) = entry.map_err(db_err)?;
            found.extend(decode_kmer_key(key.value()));
        }
        Ok(found)
    }

    pub fn kmer_count(&self) -> Result<usize> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(KMERS).map_err(db_err)?;
        let mut count = 0;
        for entry in table.iter().map_err(db_err)? {
            entry.map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn node_sequence(&self, id: NodeId) -> Result<Option<String>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(NODES).map_err(db_err)?;
        let value = table.get(id).map_err(db_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    pub fn has_edge(&self, edge: &Edge) -> Result<bool> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(EDGES).map_err(db_err)?;
        let key = edge_key(edge);
        Ok(table.get(key.as_slice()).map_err(db_err)?.is_some())
    }

    /// Mappings of the named path in rank order.
    pub fn path_mappings(&self, name: &str) -> Result<Vec<Mapping>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(PATHS).map_err(db_err)?;
        let start = path_prefix(name, 0);
        let end = path_prefix(name, 1);

        let mut mappings = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice()).map_err(db_err)? {
            let (_, value) = entry.map_err(db_err)?;
            mappings.push(bincode::deserialize(value.value())?);
        }
        Ok(mappings)
    }
}

impl KmerIndex for KmerDb {
    fn write_kmer_batch(&self, batch: &[KmerMatch]) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(KMERS).map_err(db_err)?;
            for kmer in batch {
                table.insert(kmer_key(kmer).as_slice(), ()).map_err(db_err)?;
            }
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    fn remember_kmer_size(&self, kmer_size: usize) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(META).map_err(db_err)?;
            table
                .insert(KMER_SIZE_KEY, kmer_size as u64)
                .map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    fn load_graph(&self, graph: &VariationGraph) -> Result<()> {
        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut nodes = txn.open_table(NODES).map_err(db_err)?;
            for node in graph.nodes() {
                nodes
                    .insert(node.id, node.sequence.as_str())
                    .map_err(db_err)?;
            }
            let mut edges = txn.open_table(EDGES).map_err(db_err)?;
            for edge in graph.edges() {
                edges.insert(edge_key(edge).as_slice(), ()).map_err(db_err)?;
            }
        }
        txn.commit().map_err(db_err)?;
        log::debug!(
            "{}: stored {} nodes and {} edges",
            graph.name,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    fn load_paths(&self, graph: &VariationGraph) -> Result<()> {
        // Encode before opening the transaction so a bad mapping aborts cleanly
        let mut rows = Vec::new();
        for path in graph.paths() {
            for mapping in &path.mappings {
                rows.push((path_key(&path.name, mapping.rank), bincode::serialize(mapping)?));
            }
        }

        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(PATHS).map_err(db_err)?;
            for (key, value) in &rows {
                table
                    .insert(key.as_slice(), value.as_slice())
                    .map_err(db_err)?;
            }
        }
        txn.commit().map_err(db_err)?;
        log::debug!("{}: stored {} path steps", graph.name, rows.len());
        Ok(())
    }
}
