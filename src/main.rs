//! # intermediate-edges CLI
//!
//! Command-line interface for the intermediate-edges library.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use intermediate_edges::{
    describe_rows, read_matrix, rows_for, AggregateOptions, Config, EdgeId, EdgeIndexFile,
    StrategyKind,
};
use log::{error, info};

mod cli;

/// Command-line interface for intermediate-edges
#[derive(Parser)]
#[command(name = "intermediate-edges")]
#[command(about = "Most frequent intermediate road segment between segment pairs")]
#[command(long_about = "Builds a sparse edge-to-edge matrix from vehicle trip histories:
  intermediate-edges sub-edges              # node pair -> way table
  intermediate-edges index                  # way -> dense index
  intermediate-edges build                  # count trips and write the matrix
  intermediate-edges query 28473421 9933    # print matrix rows

Paths default to the [paths] section of --config, then to the standard
output/ layout.")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive the sub-edge table from the way table
    SubEdges {
        #[arg(long)]
        ways: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Assign a dense index to every edge of the way table
    Index {
        #[arg(long)]
        ways: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count the trip corpus and write the intermediate-edge matrix
    Build {
        #[arg(long)]
        corpus: Option<PathBuf>,
        #[arg(long)]
        sub_edges: Option<PathBuf>,
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum hop distance between the two edges of a pair
        #[arg(long, conflicts_with = "exact")]
        window: Option<usize>,

        /// Count every pair of the trip regardless of distance
        #[arg(long)]
        exact: bool,

        /// Worker threads, 0 for one per CPU
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Print the matrix rows of the given edges
    Query {
        /// Binary matrix, or its `.mtx` copy
        #[arg(long)]
        matrix: Option<PathBuf>,
        #[arg(long)]
        index: Option<PathBuf>,

        /// Print raw indices as JSON
        #[arg(long)]
        json: bool,

        #[arg(required = true)]
        edges: Vec<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::SubEdges { ways, output } => {
            let ways = ways.unwrap_or(config.paths.ways);
            let output = output.unwrap_or(config.paths.sub_edges);
            let resolver = intermediate_edges::build_sub_edges(&ways, &output)
                .with_context(|| format!("failed to build sub-edges from {}", ways.display()))?;
            info!("Wrote {} sub-edges to {}", resolver.len(), output.display());
        }
        Command::Index { ways, output } => {
            let ways = ways.unwrap_or(config.paths.ways);
            let output = output.unwrap_or(config.paths.index);
            let index = intermediate_edges::build_index(&ways, &output)
                .with_context(|| format!("failed to build edge index from {}", ways.display()))?;
            info!("Indexed {} edges", index.len());
        }
        Command::Build {
            corpus,
            sub_edges,
            index,
            output,
            window,
            exact,
            threads,
        } => {
            if exact {
                config.counting.strategy = StrategyKind::Exact;
            }
            if let Some(window) = window {
                config.counting.window = window;
            }
            if let Some(threads) = threads {
                config.counting.threads = threads;
            }
            config.validate()?;

            let paths = config.paths;
            let corpus = corpus.unwrap_or(paths.corpus);
            let sub_edges = sub_edges.unwrap_or(paths.sub_edges);
            let index = index.unwrap_or(paths.index);
            let output = output.unwrap_or(paths.matrix);
            build(&config.counting, &corpus, &sub_edges, &index, &output)?;
        }
        Command::Query {
            matrix,
            index,
            json,
            edges,
        } => {
            let matrix = matrix.unwrap_or(config.paths.matrix);
            let index = index.unwrap_or(config.paths.index);
            let edges: Vec<EdgeId> = edges.into_iter().map(EdgeId::from).collect();
            query(&matrix, &index, &edges, json)?;
        }
    }

    Ok(())
}

fn build(
    counting: &intermediate_edges::CountingConfig,
    corpus: &Path,
    sub_edges: &Path,
    index: &Path,
    output: &Path,
) -> Result<()> {
    let strategy = counting.strategy();
    info!("Counting with {strategy:?}");

    let progress = cli::ProgressManager::new(&format!("Counting trips from {}", corpus.display()));
    let options = AggregateOptions {
        strategy,
        threads: counting.threads,
        progress: Some(progress.callback()),
    };

    let report = intermediate_edges::build_matrix(corpus, sub_edges, index, output, &options)
        .context("matrix build failed");
    progress.finish();
    let report = report?;

    eprintln!(
        "Wrote {} cells for {} edge pairs from {} trips of {} vehicles to {}",
        report.cells,
        report.pairs,
        report.trips,
        report.vehicles,
        output.display()
    );
    eprintln!("Matrix Market copy: {}", report.matrix_market.display());
    Ok(())
}

fn query(matrix: &Path, index: &Path, edges: &[EdgeId], json: bool) -> Result<()> {
    let index = EdgeIndexFile::read(index)
        .with_context(|| format!("failed to load edge index {}", index.display()))?;
    let matrix = read_matrix(matrix)
        .with_context(|| format!("failed to load matrix {}", matrix.display()))?;

    if json {
        let rows = rows_for(edges, &matrix, &index);
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let described = describe_rows(edges, &matrix, &index);
    for edge in edges {
        match described.get(edge) {
            None => println!("{edge}: unknown edge"),
            Some(cells) if cells.is_empty() => println!("{edge}: no data"),
            Some(cells) => {
                println!("{edge}:");
                for (to, via) in cells {
                    println!("  -> {to} via {via}");
                }
            }
        }
    }
    Ok(())
}
