//! Way table: canonical edge id -> ordered node list
//!
//! Produced by graph construction (one entry per `highway` way). Entry order
//! is the edge discovery order used to assign edge indices, so the loader
//! keeps file order instead of collecting into a hash map.

use std::fmt;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::core::edge::{EdgeId, NodeId};
use crate::core::error::{open_input, Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WayTable {
    ways: Vec<(EdgeId, Vec<NodeId>)>,
}

impl WayTable {
    pub fn new(ways: Vec<(EdgeId, Vec<NodeId>)>) -> Self {
        Self { ways }
    }

    /// Load a way table from a JSON object, keeping key order
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(open_input(path)?);
        let table: WayTable = serde_json::from_reader(reader)
            .map_err(|e| Error::malformed(path, Some(e.line()), e.to_string()))?;
        info!("Loaded {} ways from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.ways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeId, &[NodeId])> {
        self.ways.iter().map(|(edge, nodes)| (edge, nodes.as_slice()))
    }

    /// Edge ids in discovery order
    pub fn edges(&self) -> impl Iterator<Item = &EdgeId> {
        self.ways.iter().map(|(edge, _)| edge)
    }
}

impl<'de> Deserialize<'de> for WayTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedWays;

        impl<'de> Visitor<'de> for OrderedWays {
            type Value = WayTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of way id to node list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<WayTable, A::Error> {
                let mut ways = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((edge, nodes)) = map.next_entry::<EdgeId, Vec<NodeId>>()? {
                    ways.push((edge, nodes));
                }
                Ok(WayTable { ways })
            }
        }

        deserializer.deserialize_map(OrderedWays)
    }
}
