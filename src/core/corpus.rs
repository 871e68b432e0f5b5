//! Trip corpus: one JSON vehicle record per line
//!
//! Parsing is strict. A single unparsable line fails the whole load, there is
//! no skip-and-continue mode.

use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;

use crate::core::edge::{SubEdge, VehicleId};
use crate::core::error::{open_input, Error, Result};

/// One vehicle run as recorded by the tracker
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    /// Traversed node pairs, in order
    #[serde(rename = "edgesOfPath2")]
    pub sub_edges: Vec<SubEdge>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "vehicleNumber")]
    pub vehicle: VehicleId,
    #[serde(rename = "tripList")]
    pub trips: Vec<Trip>,
}

impl VehicleRecord {
    pub fn new(vehicle: impl Into<VehicleId>, trips: Vec<Trip>) -> Self {
        Self {
            vehicle: vehicle.into(),
            trips,
        }
    }
}

/// Load every vehicle record of a line-delimited JSON corpus
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<VehicleRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(open_input(path)?);

    let mut vehicles = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: VehicleRecord = serde_json::from_str(line)
            .map_err(|e| Error::malformed(path, Some(line_no + 1), e.to_string()))?;
        vehicles.push(record);
    }

    let trips: usize = vehicles.iter().map(|v| v.trips.len()).sum();
    info!("Loaded {} vehicles from {}", vehicles.len(), path.display());
    debug!("Corpus holds {} trips", trips);
    Ok(vehicles)
}
