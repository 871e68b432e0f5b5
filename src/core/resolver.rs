//! Sub-edge resolution
//!
//! Maps raw adjacent-node pairs from trip traces onto the canonical edge that
//! contains them, and normalises a trip into its ordered list of distinct
//! edges.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::edge::{EdgeId, NodeId, SubEdge};
use crate::core::error::{open_input, Error, Result};
use crate::core::ways::WayTable;

/// Read-only sub-edge -> edge mapping, shared by all counting workers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubEdgeResolver {
    map: FxHashMap<SubEdge, EdgeId>,
}

impl SubEdgeResolver {
    /// Register both directions of every consecutive node pair of every way.
    ///
    /// A node pair shared by two ways resolves to the way seen last.
    pub fn from_ways(ways: &WayTable) -> Self {
        let mut map = FxHashMap::default();
        for (edge, nodes) in ways.iter() {
            for pair in nodes.windows(2) {
                map.insert((pair[0].clone(), pair[1].clone()), edge.clone());
                map.insert((pair[1].clone(), pair[0].clone()), edge.clone());
            }
        }
        debug!("Resolved {} ways into {} sub-edges", ways.len(), map.len());
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn resolve(&self, sub_edge: &SubEdge) -> Option<&EdgeId> {
        self.map.get(sub_edge)
    }

    /// Distinct edges of a trip in first-traversal order.
    ///
    /// Unresolvable sub-edges are dropped. Revisiting an edge later in the
    /// trip does not add it again.
    pub fn canonical_edges<'a>(&'a self, trip: &[SubEdge]) -> Vec<&'a EdgeId> {
        let mut seen = FxHashSet::default();
        trip.iter()
            .filter_map(|sub_edge| self.resolve(sub_edge))
            .filter(|edge| seen.insert(*edge))
            .collect()
    }

    /// Persist as a JSON object keyed by `("n1", "n2")`.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let keyed: BTreeMap<String, &EdgeId> = self
            .map
            .iter()
            .map(|((from, to), edge)| (format_pair_key(from, to), edge))
            .collect();

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &keyed)?;
        writer.flush()?;

        info!("Saved {} sub-edges to {}", keyed.len(), path.display());
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(open_input(path)?);
        let keyed: FxHashMap<String, EdgeId> = serde_json::from_reader(reader)
            .map_err(|e| Error::malformed(path, Some(e.line()), e.to_string()))?;

        let mut map = FxHashMap::with_capacity_and_hasher(keyed.len(), Default::default());
        for (key, edge) in keyed {
            let sub_edge = parse_pair_key(&key).ok_or_else(|| {
                Error::malformed(path, None, format!("sub-edge key {key:?} is not a node pair"))
            })?;
            map.insert(sub_edge, edge);
        }

        info!("Loaded {} sub-edges from {}", map.len(), path.display());
        Ok(Self { map })
    }
}

fn format_pair_key(from: &NodeId, to: &NodeId) -> String {
    format!("(\"{from}\", \"{to}\")")
}

fn parse_pair_key(key: &str) -> Option<SubEdge> {
    let inner = key.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (first, second) = inner.split_once(',')?;
    let unquote = |s: &str| {
        let s = s.trim().trim_matches(|c| c == '"' || c == '\'');
        (!s.is_empty()).then(|| NodeId::from(s))
    };
    Some((unquote(first)?, unquote(second)?))
}
