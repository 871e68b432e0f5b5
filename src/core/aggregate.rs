//! Parallel map/reduce over the trip corpus
//!
//! Workers each resolve and count one trip and hand back an owned
//! histogram. Only the calling thread merges, so nothing shared is ever
//! mutated concurrently. The first worker failure aborts the batch and
//! nothing is salvaged.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use rayon::prelude::*;

use crate::core::corpus::{Trip, VehicleRecord};
use crate::core::counter::{count_trip, CountingStrategy, PairHistogram};
use crate::core::edge::{EdgeId, VehicleId};
use crate::core::error::{Error, Result};
use crate::core::resolver::SubEdgeResolver;

/// Progress callback: `(trips_done, trips_total)`
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Options for an aggregation run
#[derive(Clone, Default)]
pub struct AggregateOptions {
    pub strategy: CountingStrategy,

    /// Worker count, 0 means one per available CPU
    pub threads: usize,

    pub progress: Option<ProgressCallback>,
}

impl AggregateOptions {
    pub fn worker_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

/// Merged result of one run
#[derive(Debug)]
pub struct AggregateOutcome<'a> {
    pub histogram: PairHistogram<&'a EdgeId>,
    pub trips_processed: usize,
    pub elapsed: Duration,
}

struct TripTask<'v> {
    vehicle: &'v VehicleId,
    ordinal: usize,
    trip: &'v Trip,
}

/// Count every trip of the corpus in parallel and merge the results
pub fn aggregate<'a>(
    vehicles: &[VehicleRecord],
    resolver: &'a SubEdgeResolver,
    options: &AggregateOptions,
) -> Result<AggregateOutcome<'a>> {
    let strategy = options.strategy;
    aggregate_with(vehicles, resolver, options, move |edges| {
        count_trip(edges, strategy)
    })
}

fn aggregate_with<'a, F>(
    vehicles: &[VehicleRecord],
    resolver: &'a SubEdgeResolver,
    options: &AggregateOptions,
    count: F,
) -> Result<AggregateOutcome<'a>>
where
    F: Fn(&[&'a EdgeId]) -> PairHistogram<&'a EdgeId> + Sync,
{
    let start = Instant::now();

    let tasks: Vec<TripTask> = vehicles
        .iter()
        .flat_map(|record| {
            record
                .trips
                .iter()
                .enumerate()
                .map(move |(ordinal, trip)| TripTask {
                    vehicle: &record.vehicle,
                    ordinal,
                    trip,
                })
        })
        .collect();
    let total = tasks.len() as u64;
    let workers = options.worker_count();
    info!(
        "Counting {} trips from {} vehicles on {} workers",
        total,
        vehicles.len(),
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::InvalidConfig(format!("failed to start worker pool: {e}")))?;

    let done = AtomicU64::new(0);
    let unresolved = AtomicU64::new(0);
    let per_trip: Result<Vec<PairHistogram<&'a EdgeId>>> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let counted = panic::catch_unwind(AssertUnwindSafe(|| {
                    let sub_edges = &task.trip.sub_edges;
                    let missing = sub_edges
                        .iter()
                        .filter(|s| resolver.resolve(s).is_none())
                        .count();
                    if missing > 0 {
                        unresolved.fetch_add(missing as u64, Ordering::Relaxed);
                    }
                    let edges = resolver.canonical_edges(sub_edges);
                    count(&edges)
                }));

                if let Some(progress) = &options.progress {
                    progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                }

                counted.map_err(|payload| Error::WorkerFailure {
                    vehicle: task.vehicle.to_string(),
                    trip: task.ordinal,
                    message: panic_message(payload.as_ref()),
                })
            })
            .collect()
    });

    let per_trip = per_trip.inspect_err(|e| error!("Aborting aggregation: {e}"))?;
    let trips_processed = per_trip.len();
    info!("Processed {} trips", trips_processed);
    let unresolved = unresolved.into_inner();
    if unresolved > 0 {
        warn!("Dropped {} sub-edges with no known edge", unresolved);
    }

    let histogram = merge_histograms(per_trip);
    let elapsed = start.elapsed();
    info!(
        "Merged {} edge pairs in {:.2}s",
        histogram.len(),
        elapsed.as_secs_f64()
    );

    Ok(AggregateOutcome {
        histogram,
        trips_processed,
        elapsed,
    })
}

/// Fold per-trip histograms into one. Order does not affect the result.
pub fn merge_histograms<E, I>(histograms: I) -> PairHistogram<E>
where
    E: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = PairHistogram<E>>,
{
    histograms
        .into_iter()
        .fold(PairHistogram::new(), |mut merged, local| {
            merged.merge(local);
            merged
        })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}
