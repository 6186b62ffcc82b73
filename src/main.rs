use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;

use ferrous_graphset::graph::{KmerParams, Mapping, NodeId};
use ferrous_graphset::index::{ChunkStreamWriter, FmIndexBuilder, KmerDb};
use ferrous_graphset::kmer_opt::{KmerCliOptions, KmerOpt};
use ferrous_graphset::set::KmerExportFormat;
use ferrous_graphset::{defaults, GraphSet};

#[derive(Parser)]
#[command(name = "ferrous-graphset")]
#[command(about = "Operations over sets of on-disk variation graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY, global = true)]
    verbosity: i32,

    /// Log each graph as it is visited
    #[arg(short = 'p', long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shift node ids so every graph owns a disjoint id range (rewrites the files)
    Ids {
        /// Graph files, '-' for standard input
        #[arg(value_name = "GRAPH.VG", required = true)]
        graphs: Vec<PathBuf>,
    },

    /// Build a k-mer index database
    Index {
        /// Index database to create or extend
        #[arg(short = 'd', long, value_name = "DB")]
        db: PathBuf,

        /// Also store nodes and edges
        #[arg(short = 'N', long)]
        store_graph: bool,

        /// Also store paths
        #[arg(short = 'S', long)]
        store_paths: bool,

        /// Also index reverse-strand k-mers
        #[arg(short = 'n', long)]
        allow_negatives: bool,

        #[command(flatten)]
        kmer: KmerCliOptions,

        #[arg(value_name = "GRAPH.VG", required = true)]
        graphs: Vec<PathBuf>,
    },

    /// Pull paths matching a pattern out of the graphs
    Paths {
        /// Regular expression that must match the whole path name
        #[arg(short = 'x', long, value_name = "REGEX")]
        pattern: String,

        /// Write the remaining chunk stream here
        #[arg(short = 'r', long, value_name = "FILE")]
        rest: Option<PathBuf>,

        /// Output file for the extracted paths (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(value_name = "GRAPH.VG", required = true)]
        graphs: Vec<PathBuf>,
    },

    /// Build an FM index over node sequences and count query occurrences
    Succinct {
        /// Hold back paths matching this expression
        #[arg(short = 'x', long, value_name = "REGEX")]
        pattern: Option<String>,

        /// Sequences to look up once the index is built
        #[arg(short = 'q', long, value_name = "SEQ")]
        query: Vec<String>,

        #[arg(value_name = "GRAPH.VG", required = true)]
        graphs: Vec<PathBuf>,
    },

    /// Export k-mer positions for suffix-array index construction
    Kmers {
        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        /// Id of the head marker node (default: largest id in the set + 1;
        /// required with '-')
        #[arg(short = 'H', long, value_name = "ID")]
        head_id: Option<NodeId>,

        /// Id of the tail marker node (default: largest id in the set + 2)
        #[arg(short = 'T', long, value_name = "ID")]
        tail_id: Option<NodeId>,

        /// Output file (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write one binary k-mer file per graph into DIR and list their names
        #[arg(short = 's', long, value_name = "DIR", conflicts_with_all = ["format", "output"])]
        spill_dir: Option<PathBuf>,

        /// Skip the reverse strand
        #[arg(short = 'F', long)]
        forward_only: bool,

        #[command(flatten)]
        kmer: KmerCliOptions,

        #[arg(value_name = "GRAPH.VG", required = true)]
        graphs: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Text,
    Binary,
    MarkedText,
}

impl From<ExportFormat> for KmerExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Text => KmerExportFormat::Text,
            ExportFormat::Binary => KmerExportFormat::Binary,
            ExportFormat::MarkedText => KmerExportFormat::MarkedText,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace)
    let log_level = match cli.verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let progress = cli.progress;
    let open_set = |graphs: &[PathBuf]| -> anyhow::Result<GraphSet> {
        Ok(GraphSet::new(graphs)?.with_progress(progress))
    };

    match cli.command {
        Commands::Ids { graphs } => {
            let set = open_set(&graphs)?;
            let max_id = set.merge_id_space()?.unwrap_or(0);
            // A graph read from stdin is written back to stdout
            if set.files().iter().any(|f| f.is_stdin()) {
                log::info!("max node id {}", max_id);
            } else {
                println!("{}", max_id);
            }
        }

        Commands::Index {
            db,
            store_graph,
            store_paths,
            allow_negatives,
            kmer,
            graphs,
        } => {
            let set = open_set(&graphs)?;
            let opt = KmerOpt {
                allow_negatives,
                ..kmer.to_opt()
            };
            if let Err(errors) = opt.validate() {
                anyhow::bail!("invalid k-mer options: {}", errors.join("; "));
            }
            let index = KmerDb::create(&db)
                .with_context(|| format!("opening index {}", db.display()))?;

            if store_graph {
                set.store_in_index(&index)?;
            }
            if store_paths {
                set.store_paths_in_index(&index)?;
            }
            log::info!(
                "indexing {}-mers with {} threads into {}",
                opt.kmer_size,
                opt.threads,
                index.path().display()
            );
            set.index_kmers(&index, &opt)?;
        }

        Commands::Paths {
            pattern,
            rest,
            output,
            graphs,
        } => {
            let set = open_set(&graphs)?;
            let pattern = Regex::new(&pattern)?;

            let paths = match rest {
                Some(rest) => {
                    let file = File::create(&rest)
                        .with_context(|| format!("creating {}", rest.display()))?;
                    let mut writer = ChunkStreamWriter::new(BufWriter::new(file));
                    let paths = set.to_succinct(&mut writer, Some(&pattern))?;
                    writer.finish()?.flush()?;
                    paths
                }
                None => {
                    let mut writer = ChunkStreamWriter::new(io::sink());
                    set.to_succinct(&mut writer, Some(&pattern))?
                }
            };

            let mut out = open_output(output.as_ref())?;
            for (name, path) in &paths {
                let steps: Vec<String> = path.mappings.iter().map(format_step).collect();
                writeln!(out, "{}\t{}", name, steps.join(","))?;
            }
            out.flush()?;
        }

        Commands::Succinct {
            pattern,
            query,
            graphs,
        } => {
            let set = open_set(&graphs)?;
            let pattern = pattern.as_deref().map(Regex::new).transpose()?;

            let mut fm = FmIndexBuilder::new();
            let held_back = set.to_succinct(&mut fm, pattern.as_ref())?;
            let stats = fm.stats();
            log::info!(
                "{} nodes, {} edges, {} paths ({} held back)",
                stats.nodes,
                stats.edges,
                stats.paths,
                held_back.len()
            );

            for q in &query {
                let hits = fm.locate(q.to_ascii_uppercase().as_bytes());
                let hits: Vec<String> = hits.iter().map(|p| p.to_string()).collect();
                println!("{}\t{}\t{}", q, hits.len(), hits.join(","));
            }
        }

        Commands::Kmers {
            format,
            head_id,
            tail_id,
            output,
            spill_dir,
            forward_only,
            kmer,
            graphs,
        } => {
            let set = open_set(&graphs)?;
            let opt = kmer.to_opt();
            if let Err(errors) = opt.validate() {
                anyhow::bail!("invalid k-mer options: {}", errors.join("; "));
            }
            let params = KmerParams {
                forward_only,
                ..opt.params()
            };
            let (head_id, tail_id) = set.marker_ids(head_id, tail_id)?;

            if let Some(dir) = spill_dir {
                for path in set.export_kmers_to_temp_files(&params, head_id, tail_id, &dir)? {
                    println!("{}", path.display());
                }
                return Ok(());
            }

            let out = open_output(output.as_ref())?;
            let mut out = set.export_kmers(out, format.into(), &params, head_id, tail_id)?;
            out.flush()?;
        }
    }

    Ok(())
}

fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

// `id+` or `id-`
fn format_step(mapping: &Mapping) -> String {
    let strand = if mapping.position.is_reverse { '-' } else { '+' };
    format!("{}{}", mapping.position.node_id, strand)
}
