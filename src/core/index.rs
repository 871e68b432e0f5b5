//! Edge index: edge id <-> dense matrix coordinate
//!
//! Indices start at 1; coordinate 0 is reserved as padding so that row and
//! column 0 of the matrix are never populated. An index and the matrix built
//! against it are only meaningful as a pair.

use rustc_hash::FxHashMap;

use crate::core::edge::EdgeId;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeIndex {
    forward: FxHashMap<EdgeId, u32>,
    /// `edges[i - 1]` is the edge with index `i`
    edges: Vec<EdgeId>,
}

impl EdgeIndex {
    /// Assign 1, 2, 3, ... to edges in the order they are first discovered.
    pub fn build<'a, I>(edges_in_discovery_order: I) -> Self
    where
        I: IntoIterator<Item = &'a EdgeId>,
    {
        let mut index = Self::default();
        for edge in edges_in_discovery_order {
            if !index.forward.contains_key(edge) {
                index.push(edge.clone());
            }
        }
        index
    }

    /// Rebuild from edges already listed in index order (index 1 first).
    ///
    /// Fails if an edge appears twice.
    pub fn from_ordered(edges: Vec<EdgeId>) -> Result<Self> {
        let mut index = Self {
            forward: FxHashMap::with_capacity_and_hasher(edges.len(), Default::default()),
            edges: Vec::with_capacity(edges.len()),
        };
        for edge in edges {
            if index.forward.contains_key(&edge) {
                return Err(Error::DuplicateEdge { edge });
            }
            index.push(edge);
        }
        Ok(index)
    }

    fn push(&mut self, edge: EdgeId) {
        self.edges.push(edge.clone());
        self.forward.insert(edge, self.edges.len() as u32);
    }

    /// Strict lookup used on the build path
    pub fn index(&self, edge: &EdgeId) -> Result<u32> {
        self.get(edge).ok_or_else(|| Error::UnknownEdge { edge: edge.clone() })
    }

    /// Best-effort lookup used on the query path
    pub fn get(&self, edge: &EdgeId) -> Option<u32> {
        self.forward.get(edge).copied()
    }

    pub fn edge_of(&self, index: u32) -> Option<&EdgeId> {
        let slot = (index as usize).checked_sub(1)?;
        self.edges.get(slot)
    }

    /// Number of indexed edges (K)
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Matrix dimension for this index, K + 1 to account for padding row 0
    pub fn matrix_dim(&self) -> u32 {
        self.edges.len() as u32 + 1
    }

    /// `(index, edge)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &EdgeId)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(slot, edge)| (slot as u32 + 1, edge))
    }
}
