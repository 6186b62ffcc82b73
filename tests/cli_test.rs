// Command-line behaviour of the ferrous-graphset binary

use std::io::{ErrorKind, Write};
use std::process::{Command, Output, Stdio};

use ferrous_graphset::graph::{Edge, Graph, VariationGraph};
use ferrous_graphset::io::stream::for_each_message;
use ferrous_graphset::io::GraphFile;
use ferrous_graphset::Result;

const BINARY: &str = env!("CARGO_BIN_EXE_ferrous-graphset");

fn graph_bytes(dir: &std::path::Path, graph: &VariationGraph) -> Result<Vec<u8>> {
    let path = dir.join("input.vg");
    GraphFile::Named(path.clone()).store(graph, 1000)?;
    Ok(std::fs::read(path)?)
}

// Run the binary with `input` piped to its standard input
fn run_with_stdin(args: &[&str], input: &[u8]) -> std::io::Result<Output> {
    let mut child = Command::new(BINARY)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        // The binary may reject its arguments before reading anything
        if let Err(e) = stdin.write_all(input) {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(e);
            }
        }
    }
    child.wait_with_output()
}

#[test]
fn test_ids_over_stdin_keeps_stdout_decodable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut g = VariationGraph::new();
    g.add_node(1, "ACGT");
    let input = graph_bytes(dir.path(), &g)?;

    let output = run_with_stdin(&["-v", "3", "ids", "-"], &input)?;
    assert!(output.status.success(), "ids failed: {output:?}");

    let mut nodes = 0;
    for_each_message(output.stdout.as_slice(), |chunk: Graph| {
        nodes += chunk.nodes.len();
        Ok(())
    })?;
    assert_eq!(nodes, 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("max node id 1"));
    Ok(())
}

#[test]
fn test_ids_over_files_prints_max_id() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut g = VariationGraph::new();
    g.add_node(1, "AC");
    g.add_node(2, "GT");
    g.add_edge(Edge::simple(1, 2));
    let a = dir.path().join("a.vg");
    let b = dir.path().join("b.vg");
    GraphFile::Named(a.clone()).store(&g, 1000)?;
    GraphFile::Named(b.clone()).store(&g, 1000)?;

    let output = Command::new(BINARY)
        .arg("ids")
        .arg(&a)
        .arg(&b)
        .output()?;
    assert!(output.status.success(), "ids failed: {output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "4\n");
    Ok(())
}

#[test]
fn test_kmers_over_stdin_requires_marker_ids() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut g = VariationGraph::new();
    g.add_node(1, "ACGT");
    let input = graph_bytes(dir.path(), &g)?;

    let output = run_with_stdin(&["kmers", "-k", "2", "-"], &input)?;
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("marker ids"));

    let output = run_with_stdin(&["kmers", "-k", "2", "-H", "5", "-T", "6", "-"], &input)?;
    assert!(output.status.success(), "kmers failed: {output:?}");
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.lines().any(|l| l == "GT\t1:2\tC\t#\t5:0"));
    Ok(())
}
