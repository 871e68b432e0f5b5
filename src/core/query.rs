//! Read path over a persisted matrix and its index
//!
//! Lookups here are best-effort: an edge missing from the index simply has
//! no data.

use std::collections::BTreeMap;

use crate::core::edge::EdgeId;
use crate::core::index::EdgeIndex;
use crate::core::matrix::IntermediateMatrix;

/// Row index -> (column index -> intermediate edge index)
pub type Rows = BTreeMap<u32, BTreeMap<u32, u32>>;

/// Stored cells of the rows for `edges`.
///
/// Known edges with an empty row map to an empty inner map; unknown edges
/// are left out.
pub fn rows_for<'e, I>(edges: I, matrix: &IntermediateMatrix, index: &EdgeIndex) -> Rows
where
    I: IntoIterator<Item = &'e EdgeId>,
{
    edges
        .into_iter()
        .filter_map(|edge| index.get(edge))
        .map(|row| (row, matrix.row(row).collect()))
        .collect()
}

/// Most frequent intermediate between `from` and `to`, decoded back to an
/// edge id
pub fn intermediate_between<'i>(
    from: &EdgeId,
    to: &EdgeId,
    matrix: &IntermediateMatrix,
    index: &'i EdgeIndex,
) -> Option<&'i EdgeId> {
    let row = index.get(from)?;
    let col = index.get(to)?;
    let value = matrix.get(row, col)?;
    index.edge_of(value)
}

/// Same data as [`rows_for`] with every coordinate decoded to its edge id:
/// `edge -> [(destination edge, intermediate edge)]`
pub fn describe_rows<'e, 'i, I>(
    edges: I,
    matrix: &IntermediateMatrix,
    index: &'i EdgeIndex,
) -> BTreeMap<&'i EdgeId, Vec<(&'i EdgeId, &'i EdgeId)>>
where
    I: IntoIterator<Item = &'e EdgeId>,
{
    rows_for(edges, matrix, index)
        .into_iter()
        .filter_map(|(row, cells)| {
            let edge = index.edge_of(row)?;
            let decoded = cells
                .into_iter()
                .filter_map(|(col, value)| Some((index.edge_of(col)?, index.edge_of(value)?)))
                .collect();
            Some((edge, decoded))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(name: &str) -> EdgeId {
        EdgeId::from(name)
    }

    /// Index A=1, B=2, C=3, D=4; row A holds (A, C) -> B and (A, D) -> B
    fn fixture() -> (IntermediateMatrix, EdgeIndex) {
        let edges: Vec<EdgeId> = ["A", "B", "C", "D"].iter().map(|n| edge(n)).collect();
        let index = EdgeIndex::build(&edges);
        let matrix =
            IntermediateMatrix::from_triplets(index.matrix_dim(), vec![(1, 3, 2), (1, 4, 2), (2, 4, 3)])
                .unwrap();
        (matrix, index)
    }

    #[test]
    fn test_rows_for_known_edges() {
        let (matrix, index) = fixture();
        let rows = rows_for(&[edge("A"), edge("B")], &matrix, &index);

        let expected: Rows = [
            (1, [(3, 2), (4, 2)].into_iter().collect()),
            (2, [(4, 3)].into_iter().collect()),
        ]
        .into_iter()
        .collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_rows_for_empty_row_and_unknown_edge() {
        let (matrix, index) = fixture();
        let rows = rows_for(&[edge("D"), edge("nowhere")], &matrix, &index);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get(&4), Some(&BTreeMap::new()));
    }

    #[test]
    fn test_intermediate_between() {
        let (matrix, index) = fixture();

        assert_eq!(
            intermediate_between(&edge("B"), &edge("D"), &matrix, &index),
            Some(&edge("C"))
        );
        assert_eq!(intermediate_between(&edge("D"), &edge("A"), &matrix, &index), None);
        assert_eq!(intermediate_between(&edge("X"), &edge("A"), &matrix, &index), None);
    }

    #[test]
    fn test_describe_rows_decodes_ids() {
        let (matrix, index) = fixture();
        let described = describe_rows(&[edge("A")], &matrix, &index);

        let a = edge("A");
        let (b, c, d) = (edge("B"), edge("C"), edge("D"));
        assert_eq!(described.get(&a), Some(&vec![(&c, &b), (&d, &b)]));
    }
}
