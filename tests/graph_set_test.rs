// End-to-end tests over graph files on disk

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path as FsPath, PathBuf};

use ferrous_graphset::graph::{
    Edge, Graph, KmerParams, KmerPosition, Mapping, Node, Path, Position, VariationGraph,
};
use ferrous_graphset::index::{ChunkStreamWriter, FmIndexBuilder, KmerDb};
use ferrous_graphset::io::stream::{for_each_message, write_messages};
use ferrous_graphset::io::GraphFile;
use ferrous_graphset::kmer_opt::KmerOpt;
use ferrous_graphset::set::KmerExportFormat;
use ferrous_graphset::{GraphSet, Result};
use regex::Regex;

// ACG -> T -> AA
fn linear_graph() -> VariationGraph {
    let mut g = VariationGraph::new();
    g.add_node(1, "ACG");
    g.add_node(2, "T");
    g.add_node(3, "AA");
    g.add_edge(Edge::simple(1, 2));
    g.add_edge(Edge::simple(2, 3));
    g
}

fn store(dir: &FsPath, name: &str, graph: &VariationGraph) -> Result<PathBuf> {
    let path = dir.join(name);
    GraphFile::Named(path.clone()).store(graph, 1000)?;
    Ok(path)
}

fn store_chunks(dir: &FsPath, name: &str, chunks: &[Graph]) -> Result<PathBuf> {
    let path = dir.join(name);
    let bytes = write_messages(Vec::new(), chunks)?;
    std::fs::write(&path, bytes)?;
    Ok(path)
}

fn path_chunk(node_id: u64, paths: &[(&str, i64)]) -> Graph {
    Graph {
        nodes: vec![Node::new(node_id, "ACGT")],
        edges: Vec::new(),
        paths: paths
            .iter()
            .map(|&(name, rank)| Path {
                name: name.to_string(),
                mappings: vec![Mapping::new(node_id, false, rank)],
            })
            .collect(),
    }
}

fn index_opt(kmer_size: usize) -> KmerOpt {
    KmerOpt {
        kmer_size,
        threads: 2,
        ..KmerOpt::default()
    }
}

#[test]
fn test_index_kmers_into_db() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let set = GraphSet::new([&file])?;
    let db = KmerDb::create(dir.path().join("kmers.db"))?;

    set.index_kmers(&db, &index_opt(2))?;

    assert_eq!(db.kmer_size()?, Some(2));
    assert_eq!(db.kmer_count()?, 5);
    let expected = [("AC", 1, 0), ("CG", 1, 1), ("GT", 1, 2), ("TA", 2, 0), ("AA", 3, 0)];
    for (kmer, node_id, offset) in expected {
        let found = db.find_kmer(kmer)?;
        assert_eq!(found.len(), 1, "{kmer}");
        assert_eq!((found[0].node_id, found[0].position), (node_id, offset));
        assert!(!found[0].backward);
    }
    Ok(())
}

#[test]
fn test_index_kmers_defaults_to_forward_strand() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let db = KmerDb::create(dir.path().join("kmers.db"))?;

    let opt = KmerOpt {
        kmer_size: 2,
        threads: 2,
        ..KmerOpt::default()
    };
    GraphSet::new([&file])?.index_kmers(&db, &opt)?;

    assert_eq!(db.kmer_count()?, 5);
    assert!(db.find_kmer("TT")?.is_empty());
    Ok(())
}

#[test]
fn test_index_kmers_allow_negatives() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let db = KmerDb::create(dir.path().join("kmers.db"))?;

    let opt = KmerOpt {
        allow_negatives: true,
        ..index_opt(2)
    };
    GraphSet::new([&file])?.index_kmers(&db, &opt)?;

    assert_eq!(db.kmer_count()?, 10);
    let tt = db.find_kmer("TT")?;
    assert_eq!(tt.len(), 1);
    assert_eq!((tt[0].node_id, tt[0].position, tt[0].backward), (3, 0, true));
    let ac: BTreeSet<(u64, bool)> = db
        .find_kmer("AC")?
        .iter()
        .map(|k| (k.node_id, k.backward))
        .collect();
    assert_eq!(ac, BTreeSet::from([(1, false), (2, true)]));
    Ok(())
}

#[test]
fn test_index_kmers_skips_ambiguous_bases() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut g = VariationGraph::new();
    g.add_node(1, "ACNGT");
    let file = store(dir.path(), "n.vg", &g)?;
    let db = KmerDb::create(dir.path().join("kmers.db"))?;

    // Buffer of 1 forces inline flushes
    let opt = KmerOpt {
        buffer_max_size: 1,
        ..index_opt(2)
    };
    GraphSet::new([&file])?.index_kmers(&db, &opt)?;

    let stored: BTreeSet<String> = ["AC", "GT", "CN", "NG"]
        .iter()
        .filter(|k| db.find_kmer(k).map(|v| !v.is_empty()).unwrap_or(false))
        .map(|k| k.to_string())
        .collect();
    let expected: BTreeSet<String> = ["AC", "GT"].iter().map(|k| k.to_string()).collect();
    assert_eq!(stored, expected);
    assert_eq!(db.kmer_count()?, 2);
    Ok(())
}

#[test]
fn test_index_kmers_over_merged_set() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = vec![
        store(dir.path(), "a.vg", &linear_graph())?,
        store(dir.path(), "b.vg", &linear_graph())?,
    ];
    let set = GraphSet::new(&files)?;
    assert_eq!(set.merge_id_space()?, Some(6));

    let db = KmerDb::create(dir.path().join("kmers.db"))?;
    set.index_kmers(&db, &index_opt(2))?;

    let ids: Vec<u64> = db.find_kmer("TA")?.iter().map(|k| k.node_id).collect();
    assert_eq!(ids, vec![2, 5]);
    Ok(())
}

#[test]
fn test_for_each_kmer_visits_every_graph() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = vec![
        store(dir.path(), "a.vg", &linear_graph())?,
        store(dir.path(), "b.vg", &linear_graph())?,
    ];
    let set = GraphSet::new(&files)?;

    let seen = std::sync::Mutex::new(Vec::new());
    set.for_each_kmer(&index_opt(2).params(), |kp| {
        seen.lock().unwrap().push(kp.kmer.clone());
    })?;
    assert_eq!(seen.into_inner().unwrap().len(), 10);
    Ok(())
}

#[test]
fn test_export_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let set = GraphSet::new([&file])?;

    let params = index_opt(2).params();
    let out = set.export_kmers(Vec::new(), KmerExportFormat::Text, &params, 4, 5)?;
    let text = String::from_utf8(out).unwrap();
    let lines: BTreeSet<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines.contains("AC\t1:0\t$\tG\t1:2"));
    assert!(lines.contains("GT\t1:2\tC\tA\t3:0"));
    assert!(lines.contains("AA\t3:0\tT\t#\t4:0"));
    for line in &lines {
        assert_eq!(line.split('\t').count(), 5);
        assert!(!line.contains(",\t") && !line.ends_with(','));
    }
    Ok(())
}

#[test]
fn test_export_text_lists_every_successor() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut g = VariationGraph::new();
    g.add_node(1, "GG");
    g.add_node(2, "A");
    g.add_node(3, "C");
    g.add_edge(Edge::simple(1, 2));
    g.add_edge(Edge::simple(1, 3));
    let file = store(dir.path(), "fork.vg", &g)?;

    let params = KmerParams {
        forward_only: true,
        ..KmerParams::new(2)
    };
    let set = GraphSet::new([&file])?;
    let out = set.export_kmers(Vec::new(), KmerExportFormat::Text, &params, 9, 10)?;
    let text = String::from_utf8(out).unwrap();
    let gg = text.lines().find(|l| l.starts_with("GG\t")).unwrap();
    assert_eq!(gg, "GG\t1:0\t$\tA,C\t2:0,3:0");
    Ok(())
}

#[test]
fn test_export_binary_with_markers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let set = GraphSet::new([&file])?;

    let params = index_opt(2).params();
    let bytes = set.export_kmers(Vec::new(), KmerExportFormat::Binary, &params, 4, 5)?;

    let mut positions = Vec::new();
    for_each_message(bytes.as_slice(), |kp: KmerPosition| {
        positions.push(kp);
        Ok(())
    })?;

    let found = |kmer: &str, pos: Position| {
        positions.iter().any(|kp| kp.kmer == kmer && kp.pos == pos)
    };
    assert!(found("##", Position::new(4, 0, false)));
    assert!(found("#A", Position::new(4, 1, false)));
    assert!(found("A$", Position::new(3, 1, false)));
    assert!(found("$$", Position::new(5, 0, false)));
    assert!(found("AC", Position::new(1, 0, false)));
    assert!(positions.iter().all(|kp| kp.kmer.len() == 2));

    // The graph file itself is untouched
    assert_eq!(GraphFile::Named(file).load()?.node_count(), 3);
    Ok(())
}

#[test]
fn test_export_kmers_to_temp_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut fork = VariationGraph::new();
    fork.add_node(7, "GG");
    fork.add_node(8, "A");
    fork.add_edge(Edge::simple(7, 8));
    let files = vec![
        store(dir.path(), "linear.vg", &linear_graph())?,
        store(dir.path(), "fork.vg", &fork)?,
    ];
    let spill = tempfile::tempdir()?;
    let params = index_opt(2).params();

    let set = GraphSet::new(&files)?;
    let spilled = set.export_kmers_to_temp_files(&params, 20, 21, spill.path())?;
    assert_eq!(spilled.len(), 2);
    assert_ne!(spilled[0], spilled[1]);

    let mut per_file = Vec::new();
    for path in &spilled {
        assert_eq!(path.parent(), Some(spill.path()));
        let mut positions = Vec::new();
        for_each_message(File::open(path)?, |kp: KmerPosition| {
            positions.push(kp);
            Ok(())
        })?;
        per_file.push(positions);
    }

    let has = |positions: &[KmerPosition], kmer: &str, pos: Position| {
        positions.iter().any(|kp| kp.kmer == kmer && kp.pos == pos)
    };
    assert!(has(&per_file[0], "AC", Position::new(1, 0, false)));
    assert!(has(&per_file[0], "##", Position::new(20, 0, false)));
    assert!(!per_file[0].iter().any(|kp| kp.pos.node_id == 7));
    assert!(has(&per_file[1], "GA", Position::new(7, 1, false)));
    assert!(has(&per_file[1], "$$", Position::new(21, 0, false)));
    assert!(!per_file[1].iter().any(|kp| kp.pos.node_id == 1));
    Ok(())
}

#[test]
fn test_export_marked_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store(dir.path(), "linear.vg", &linear_graph())?;
    let set = GraphSet::new([&file])?;

    let params = index_opt(2).params();
    let out = set.export_kmers(Vec::new(), KmerExportFormat::MarkedText, &params, 4, 5)?;
    let text = String::from_utf8(out).unwrap();

    // AC now has the head marker in front of it
    assert!(text.lines().any(|l| l == "AC\t1:0\t#\tG\t1:2"));
    assert!(text.lines().any(|l| l.starts_with("##\t4:0\t")));
    Ok(())
}

#[test]
fn test_to_succinct_splits_paths() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store_chunks(
        dir.path(),
        "paths.vg",
        &[
            path_chunk(1, &[("P1", 2), ("P2", 1)]),
            path_chunk(2, &[("P1", 1), ("P2", 2)]),
        ],
    )?;
    let set = GraphSet::new([&file])?;

    let pattern = Regex::new("P1")?;
    let mut writer = ChunkStreamWriter::new(Vec::new());
    let taken = set.to_succinct(&mut writer, Some(&pattern))?;
    let bytes = writer.finish()?;

    assert_eq!(taken.keys().collect::<Vec<_>>(), vec!["P1"]);
    let p1: Vec<(i64, u64)> = taken["P1"]
        .mappings
        .iter()
        .map(|m| (m.rank, m.position.node_id))
        .collect();
    assert_eq!(p1, vec![(1, 2), (2, 1)]);

    let mut forwarded = Vec::new();
    for_each_message(bytes.as_slice(), |chunk: Graph| {
        forwarded.push(chunk);
        Ok(())
    })?;
    assert_eq!(forwarded.len(), 2);
    for chunk in &forwarded {
        assert_eq!(chunk.nodes.len(), 1);
        assert_eq!(chunk.paths.len(), 1);
        assert_eq!(chunk.paths[0].name, "P2");
    }
    Ok(())
}

#[test]
fn test_to_succinct_ranks_by_arrival_across_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let files = vec![
        store_chunks(dir.path(), "a.vg", &[path_chunk(30, &[("P", 0)])])?,
        store_chunks(dir.path(), "b.vg", &[path_chunk(10, &[("P", 0)])])?,
        store_chunks(dir.path(), "c.vg", &[path_chunk(20, &[("P", 0)])])?,
    ];
    let set = GraphSet::new(&files)?;

    let pattern = Regex::new("P")?;
    let mut fm = FmIndexBuilder::new();
    let taken = set.to_succinct(&mut fm, Some(&pattern))?;

    let ranked: Vec<(i64, u64)> = taken["P"]
        .mappings
        .iter()
        .map(|m| (m.rank, m.position.node_id))
        .collect();
    assert_eq!(ranked, vec![(1, 30), (2, 10), (3, 20)]);

    assert_eq!(fm.stats().nodes, 3);
    assert_eq!(fm.stats().paths, 0);
    assert_eq!(fm.count(b"ACGT"), 3);
    Ok(())
}

#[test]
fn test_to_succinct_without_pattern_forwards_everything() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = store_chunks(dir.path(), "p.vg", &[path_chunk(1, &[("P1", 1), ("P2", 1)])])?;
    let mut fm = FmIndexBuilder::new();
    let taken = GraphSet::new([&file])?.to_succinct(&mut fm, None)?;
    assert!(taken.is_empty());
    assert_eq!(fm.path_names(), &["P1".to_string(), "P2".to_string()]);
    Ok(())
}
