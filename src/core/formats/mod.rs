//! On-disk formats for the edge index and the intermediate matrix

use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::matrix::IntermediateMatrix;

pub mod crc;
pub mod index_file;
pub mod matrix_file;
pub mod matrix_market;

pub use index_file::EdgeIndexFile;
pub use matrix_file::MatrixFile;
pub use matrix_market::MatrixMarketFile;

const MATRIX_MARKET_EXTENSION: &str = "mtx";

/// Matrix Market path written next to a binary matrix file
pub fn matrix_market_path(matrix: &Path) -> PathBuf {
    matrix.with_extension(MATRIX_MARKET_EXTENSION)
}

/// Read a matrix in either format, chosen by file extension
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<IntermediateMatrix> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(MATRIX_MARKET_EXTENSION) => MatrixMarketFile::read(path),
        _ => MatrixFile::read(path),
    }
}
