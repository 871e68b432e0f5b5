//! # intermediate-edges
//!
//! Builds, from a corpus of vehicle trips over an OpenStreetMap road graph,
//! a sparse matrix answering "which road segment most often lies between
//! segment A and segment B?".
//!
//! A trip is a sequence of traversed node pairs (sub-edges). Each sub-edge
//! resolves to a canonical edge (a way), giving an ordered list of distinct
//! edges per trip. For every pair of edges seen within a bounded number of
//! hops, the edges in between are tallied; the tallies of all trips are
//! merged and, for each pair, the most frequent intermediate is stored.
//!
//! ## Pipeline
//!
//! ```rust,no_run
//! use intermediate_edges::{AggregateOptions, CountingStrategy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Once per map extract
//!     intermediate_edges::build_sub_edges("output/total_edges", "output/total_sub_edges")?;
//!     intermediate_edges::build_index("output/total_edges", "output/edge_index.bin")?;
//!
//!     // Once per corpus
//!     let options = AggregateOptions {
//!         strategy: CountingStrategy::Windowed { window: 10 },
//!         ..Default::default()
//!     };
//!     let report = intermediate_edges::build_matrix(
//!         "jsonFiles/bus_history.json",
//!         "output/total_sub_edges",
//!         "output/edge_index.bin",
//!         "output/inter_edges_matrix.bin",
//!         &options,
//!     )?;
//!     println!("{} trips, {} cells", report.trips, report.cells);
//!     println!("Matrix Market copy: {}", report.matrix_market.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Querying
//!
//! ```rust,no_run
//! use intermediate_edges::EdgeId;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rows = intermediate_edges::query_rows(
//!         "output/inter_edges_matrix.bin",
//!         "output/edge_index.bin",
//!         &[EdgeId::from("28473421")],
//!     )?;
//!     for (row, cells) in rows {
//!         println!("Row {row}: {cells:?}");
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::info;

pub use crate::core::aggregate::{
    aggregate, merge_histograms, AggregateOptions, AggregateOutcome, ProgressCallback,
};
pub use crate::core::config::{Config, CountingConfig, PathsConfig, StrategyKind};
pub use crate::core::corpus::{load_corpus, Trip, VehicleRecord};
pub use crate::core::counter::{count_trip, CountingStrategy, IntermediateCounts, PairHistogram};
pub use crate::core::edge::{EdgeId, NodeId, SubEdge, VehicleId};
pub use crate::core::error::{Error, Result};
pub use crate::core::formats::{
    matrix_market_path, read_matrix, EdgeIndexFile, MatrixFile, MatrixMarketFile,
};
pub use crate::core::index::EdgeIndex;
pub use crate::core::matrix::{assemble, IntermediateMatrix};
pub use crate::core::query::{describe_rows, intermediate_between, rows_for, Rows};
pub use crate::core::resolver::SubEdgeResolver;
pub use crate::core::ways::WayTable;

// Internal modules
mod core;

/// Summary of a matrix build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub vehicles: usize,
    pub trips: usize,
    /// Distinct `(from, to)` pairs counted
    pub pairs: usize,
    /// Cells written to the matrix
    pub cells: usize,
    /// Matrix Market copy of the matrix
    pub matrix_market: PathBuf,
    /// Wall time of counting and merging
    pub counting_time: Duration,
    pub total_time: Duration,
}

/// Derive the sub-edge table from a way table and persist it
pub fn build_sub_edges<P: AsRef<Path>, Q: AsRef<Path>>(ways: P, output: Q) -> Result<SubEdgeResolver> {
    let table = WayTable::load_json(ways)?;
    let resolver = SubEdgeResolver::from_ways(&table);
    resolver.save_json(output)?;
    Ok(resolver)
}

/// Assign edge indices in way-table order and persist them
pub fn build_index<P: AsRef<Path>, Q: AsRef<Path>>(ways: P, output: Q) -> Result<EdgeIndex> {
    let table = WayTable::load_json(ways)?;
    let index = EdgeIndex::build(table.edges());
    EdgeIndexFile::write(output, &index)?;
    Ok(index)
}

/// Run the full pipeline: load, count in parallel, merge, assemble, persist.
///
/// The matrix is written to `output` and, in Matrix Market form, next to it
/// (see [`matrix_market_path`]). A failure while loading or counting aborts
/// the run before either file is written.
pub fn build_matrix<C, S, I, O>(
    corpus: C,
    sub_edges: S,
    index: I,
    output: O,
    options: &AggregateOptions,
) -> Result<BuildReport>
where
    C: AsRef<Path>,
    S: AsRef<Path>,
    I: AsRef<Path>,
    O: AsRef<Path>,
{
    let start = Instant::now();
    let output = output.as_ref();
    let matrix_market = matrix_market_path(output);
    if matrix_market == output {
        return Err(Error::InvalidConfig(format!(
            "matrix output {} would be overwritten by its Matrix Market copy",
            output.display()
        )));
    }

    // Inputs are checked before any processing starts
    let index = EdgeIndexFile::read(index)?;
    let resolver = SubEdgeResolver::load_json(sub_edges)?;
    let vehicles = load_corpus(corpus)?;

    let outcome = aggregate(&vehicles, &resolver, options)?;
    let matrix = assemble(&outcome.histogram, &index)?;
    MatrixFile::write(output, &matrix)?;
    MatrixMarketFile::write(&matrix_market, &matrix)?;

    let report = BuildReport {
        vehicles: vehicles.len(),
        trips: outcome.trips_processed,
        pairs: outcome.histogram.len(),
        cells: matrix.nnz(),
        matrix_market,
        counting_time: outcome.elapsed,
        total_time: start.elapsed(),
    };
    info!(
        "Built matrix from {} trips in {:.2}s (counting {:.2}s)",
        report.trips,
        report.total_time.as_secs_f64(),
        report.counting_time.as_secs_f64()
    );
    Ok(report)
}

/// Load a matrix (binary or `.mtx`) and its index and return the rows of
/// `edges`
pub fn query_rows<M: AsRef<Path>, I: AsRef<Path>>(matrix: M, index: I, edges: &[EdgeId]) -> Result<Rows> {
    let index = EdgeIndexFile::read(index)?;
    let matrix = read_matrix(matrix)?;
    Ok(rows_for(edges, &matrix, &index))
}
