//! Intermediate-edge matrix
//!
//! A `(K + 1) x (K + 1)` sparse matrix in CSR layout. Cell `(i, j)` holds the
//! edge index of the intermediate edge seen most often between edges `i` and
//! `j`. Values are edge indices, not counts, so this must never be read as a
//! weighted adjacency matrix.

use std::hash::Hash;

use log::info;

use crate::core::counter::{IntermediateCounts, PairHistogram};
use crate::core::edge::EdgeId;
use crate::core::error::{Error, Result};
use crate::core::index::EdgeIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateMatrix {
    dim: u32,
    /// `indptr[r]..indptr[r + 1]` spans row `r` in `indices`/`values`
    indptr: Vec<u64>,
    /// Column of each stored cell, ascending within a row
    indices: Vec<u32>,
    /// Edge index of the most frequent intermediate
    values: Vec<u32>,
}

impl IntermediateMatrix {
    /// Empty matrix of the given dimension
    pub fn empty(dim: u32) -> Self {
        Self {
            dim,
            indptr: vec![0; dim as usize + 1],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets in any order.
    ///
    /// Each cell may appear at most once, every coordinate must be below
    /// `dim` and every value must be a real edge index (`1..dim`).
    pub fn from_triplets(dim: u32, mut triplets: Vec<(u32, u32, u32)>) -> Result<Self> {
        triplets.sort_unstable_by_key(|&(row, col, _)| (row, col));

        let mut indptr = vec![0u64; dim as usize + 1];
        let mut indices = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());

        let mut previous: Option<(u32, u32)> = None;
        for &(row, col, value) in &triplets {
            if row >= dim || col >= dim {
                return Err(Error::InvalidMatrix(format!(
                    "cell ({row}, {col}) is outside a {dim}x{dim} matrix"
                )));
            }
            check_value(dim, row, col, value)?;
            if previous == Some((row, col)) {
                return Err(Error::InvalidMatrix(format!(
                    "cell ({row}, {col}) assigned more than once"
                )));
            }
            previous = Some((row, col));

            indptr[row as usize + 1] += 1;
            indices.push(col);
            values.push(value);
        }

        // Prefix sum to get row offsets
        for r in 1..indptr.len() {
            indptr[r] += indptr[r - 1];
        }

        Ok(Self {
            dim,
            indptr,
            indices,
            values,
        })
    }

    /// Reassemble from raw CSR arrays, validating their shape
    pub fn from_csr(dim: u32, indptr: Vec<u64>, indices: Vec<u32>, values: Vec<u32>) -> Result<Self> {
        if indptr.len() != dim as usize + 1 {
            return Err(Error::InvalidMatrix(format!(
                "expected {} row offsets, found {}",
                dim as usize + 1,
                indptr.len()
            )));
        }
        if indices.len() != values.len() {
            return Err(Error::InvalidMatrix(format!(
                "{} column indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if indptr.first() != Some(&0) || indptr.last() != Some(&(indices.len() as u64)) {
            return Err(Error::InvalidMatrix("row offsets do not span the cells".to_string()));
        }
        if let Some(row) = indptr.windows(2).position(|b| b[0] > b[1]) {
            return Err(Error::InvalidMatrix(format!("row {row} has negative length")));
        }
        for (row, bounds) in indptr.windows(2).enumerate() {
            let span = bounds[0] as usize..bounds[1] as usize;
            let cols = &indices[span.clone()];
            if cols.iter().any(|&c| c >= dim) || cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidMatrix(format!(
                    "row {row} has unsorted or out-of-range columns"
                )));
            }
            for (&col, &value) in cols.iter().zip(&values[span]) {
                check_value(dim, row as u32, col, value)?;
            }
        }

        Ok(Self {
            dim,
            indptr,
            indices,
            values,
        })
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Number of stored cells
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn indptr(&self) -> &[u64] {
        &self.indptr
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// `(col, value)` cells of a row; empty for rows outside the matrix
    pub fn row(&self, row: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        let span = if row < self.dim {
            let r = row as usize;
            self.indptr[r] as usize..self.indptr[r + 1] as usize
        } else {
            0..0
        };
        self.indices[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    pub fn get(&self, row: u32, col: u32) -> Option<u32> {
        if row >= self.dim {
            return None;
        }
        let r = row as usize;
        let span = self.indptr[r] as usize..self.indptr[r + 1] as usize;
        let cols = &self.indices[span.clone()];
        cols.binary_search(&col)
            .ok()
            .map(|pos| self.values[span.start + pos])
    }

    /// All `(row, col, value)` cells in row-major order
    pub fn triplets(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..self.dim).flat_map(move |row| self.row(row).map(move |(col, value)| (row, col, value)))
    }
}

/// Index 0 is padding, so a stored value must name a real edge
fn check_value(dim: u32, row: u32, col: u32, value: u32) -> Result<()> {
    if value == 0 || value >= dim {
        return Err(Error::InvalidMatrix(format!(
            "cell ({row}, {col}) holds {value}, not an edge index below {dim}"
        )));
    }
    Ok(())
}

/// Pick the most frequent intermediate for every pair and lay the result
/// out as a matrix over `index`.
///
/// Ties on count go to the intermediate with the lowest edge index. Any edge
/// missing from `index` aborts with [`Error::UnknownEdge`].
pub fn assemble<E>(histogram: &PairHistogram<E>, index: &EdgeIndex) -> Result<IntermediateMatrix>
where
    E: Eq + Hash + Clone + AsRef<EdgeId>,
{
    let mut triplets = Vec::with_capacity(histogram.len());
    for ((from, to), counts) in histogram.iter() {
        let row = index.index(from.as_ref())?;
        let col = index.index(to.as_ref())?;
        if let Some(value) = most_frequent(counts, index)? {
            triplets.push((row, col, value));
        }
    }

    let matrix = IntermediateMatrix::from_triplets(index.matrix_dim(), triplets)?;
    info!(
        "Assembled {}x{} intermediate matrix with {} cells",
        matrix.dim(),
        matrix.dim(),
        matrix.nnz()
    );
    Ok(matrix)
}

/// Edge index of the highest count, lowest index on ties
fn most_frequent<E>(counts: &IntermediateCounts<E>, index: &EdgeIndex) -> Result<Option<u32>>
where
    E: Eq + Hash + AsRef<EdgeId>,
{
    let mut best: Option<(u64, u32)> = None;
    for (edge, &count) in counts {
        let candidate = index.index(edge.as_ref())?;
        best = match best {
            Some((best_count, best_idx))
                if best_count > count || (best_count == count && best_idx < candidate) =>
            {
                Some((best_count, best_idx))
            }
            _ => Some((count, candidate)),
        };
    }
    Ok(best.map(|(_, idx)| idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counter::{count_trip, CountingStrategy};

    fn edge(name: &str) -> EdgeId {
        EdgeId::from(name)
    }

    fn index_of(names: &[&str]) -> EdgeIndex {
        let edges: Vec<EdgeId> = names.iter().map(|n| edge(n)).collect();
        EdgeIndex::build(&edges)
    }

    #[test]
    fn test_from_triplets_builds_sorted_rows() {
        let matrix =
            IntermediateMatrix::from_triplets(5, vec![(3, 4, 2), (1, 4, 2), (1, 2, 3), (3, 1, 1)]).unwrap();

        assert_eq!(matrix.nnz(), 4);
        assert_eq!(matrix.indptr(), &[0, 0, 2, 2, 4, 4]);
        assert_eq!(matrix.row(1).collect::<Vec<_>>(), vec![(2, 3), (4, 2)]);
        assert_eq!(matrix.row(3).collect::<Vec<_>>(), vec![(1, 1), (4, 2)]);
        assert_eq!(matrix.row(0).count(), 0);
        assert_eq!(matrix.row(99).count(), 0);
        assert_eq!(matrix.get(3, 4), Some(2));
        assert_eq!(matrix.get(3, 3), None);
        assert_eq!(matrix.get(42, 0), None);
    }

    #[test]
    fn test_from_triplets_rejects_duplicates_and_out_of_bounds() {
        assert!(matches!(
            IntermediateMatrix::from_triplets(4, vec![(1, 2, 3), (1, 2, 1)]),
            Err(Error::InvalidMatrix(_))
        ));
        assert!(matches!(
            IntermediateMatrix::from_triplets(4, vec![(1, 4, 3)]),
            Err(Error::InvalidMatrix(_))
        ));
        // Padding and past-the-end values name no edge
        assert!(IntermediateMatrix::from_triplets(4, vec![(1, 2, 0)]).is_err());
        assert!(IntermediateMatrix::from_triplets(4, vec![(1, 2, 4)]).is_err());
    }

    #[test]
    fn test_from_csr_validates_shape() {
        let matrix = IntermediateMatrix::from_triplets(4, vec![(1, 3, 2), (2, 1, 3)]).unwrap();
        let rebuilt = IntermediateMatrix::from_csr(
            4,
            matrix.indptr().to_vec(),
            matrix.indices().to_vec(),
            matrix.values().to_vec(),
        )
        .unwrap();
        assert_eq!(rebuilt, matrix);

        assert!(IntermediateMatrix::from_csr(4, vec![0, 0, 1], vec![1], vec![1]).is_err());
        assert!(IntermediateMatrix::from_csr(2, vec![0, 2, 2], vec![1, 1], vec![1, 1]).is_err());
        assert!(IntermediateMatrix::from_csr(2, vec![0, 1, 1], vec![1], vec![]).is_err());
        // Offsets past the cell count must not be sliced
        assert!(IntermediateMatrix::from_csr(2, vec![0, 5, 1], vec![1], vec![1]).is_err());

        for value in [0, 4, 99] {
            assert!(matches!(
                IntermediateMatrix::from_csr(4, vec![0, 0, 1, 1, 1], vec![2], vec![value]),
                Err(Error::InvalidMatrix(_))
            ));
        }
        assert!(IntermediateMatrix::from_csr(4, vec![0, 0, 1, 1, 1], vec![2], vec![3]).is_ok());
    }

    #[test]
    fn test_assemble_picks_most_frequent() {
        let index = index_of(&["A", "B", "C", "D", "E"]);
        let mut histogram = PairHistogram::new();
        histogram.add(edge("A"), edge("E"), edge("B"), 1);
        histogram.add(edge("A"), edge("E"), edge("D"), 4);
        histogram.add(edge("A"), edge("E"), edge("C"), 2);
        histogram.add(edge("B"), edge("D"), edge("C"), 1);

        let matrix = assemble(&histogram, &index).unwrap();
        assert_eq!(matrix.dim(), 6);
        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.get(1, 5), Some(4));
        assert_eq!(matrix.get(2, 4), Some(3));
    }

    #[test]
    fn test_assemble_ties_go_to_lowest_index() {
        // C is discovered before B, so C has the lower index
        let index = index_of(&["A", "C", "B", "D"]);
        let histogram = count_trip(&[edge("A"), edge("B"), edge("C"), edge("D")], CountingStrategy::default());

        let matrix = assemble(&histogram, &index).unwrap();
        let c = index.index(&edge("C")).unwrap();
        assert_eq!(matrix.get(1, 4), Some(c));
    }

    #[test]
    fn test_assemble_is_deterministic() {
        use crate::core::aggregate::merge_histograms;
        use crate::core::formats::MatrixFile;
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let index = index_of(&["A", "B", "C", "D", "E", "F"]);
        // D and E tie between C and F; B leads C between A and D
        let trips: Vec<Vec<EdgeId>> = [
            &["A", "B", "C", "D"][..],
            &["A", "C", "B", "D"],
            &["C", "D", "E", "F"],
            &["C", "E", "D", "F"],
            &["F", "A", "E", "B", "D", "C"],
        ]
        .iter()
        .map(|trip| trip.iter().map(|n| edge(n)).collect())
        .collect();
        let per_trip: Vec<_> = trips
            .iter()
            .map(|trip| count_trip(trip, CountingStrategy::default()))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("reference.bin");
        let matrix = assemble(&merge_histograms(per_trip.clone()), &index).unwrap();
        MatrixFile::write(&reference, &matrix).unwrap();
        assert_eq!(matrix.get(1, 4), Some(2));
        assert_eq!(matrix.get(3, 6), Some(4));

        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..8 {
            let mut shuffled = per_trip.clone();
            shuffled.shuffle(&mut rng);
            shuffled.reverse();
            let merged = merge_histograms(shuffled);

            let path = dir.path().join(format!("round-{round}.bin"));
            MatrixFile::write(&path, &assemble(&merged, &index).unwrap()).unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&reference).unwrap());
        }
    }

    #[test]
    fn test_assemble_unknown_edge_aborts() {
        let index = index_of(&["A", "B"]);
        let histogram = count_trip(&[edge("A"), edge("X"), edge("B")], CountingStrategy::default());

        match assemble(&histogram, &index) {
            Err(Error::UnknownEdge { edge: missing }) => assert_eq!(missing, edge("X")),
            other => panic!("Expected UnknownEdge, got {other:?}"),
        }
    }
}
