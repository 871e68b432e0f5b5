//! Matrix Market export of the intermediate-edge matrix
//!
//! `matrix coordinate integer general`, readable by `scipy.io.mmread` and
//! other sparse tooling. Coordinates are 1-based on disk, so matrix cell
//! `(r, c)` is written as `r+1 c+1`. The shape is `(K + 1) x (K + 1)`,
//! padding row and column included, and each value is an edge index.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::core::error::{open_input, Error, Result};
use crate::core::matrix::IntermediateMatrix;

const BANNER: &str = "%%MatrixMarket matrix coordinate integer general";

pub struct MatrixMarketFile;

impl MatrixMarketFile {
    /// Write every stored cell in row-major order
    pub fn write<P: AsRef<Path>>(path: P, matrix: &IntermediateMatrix) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);

        writeln!(writer, "{BANNER}")?;
        writeln!(writer, "% value = edge index of the most frequent intermediate edge")?;
        writeln!(writer, "{} {} {}", matrix.dim(), matrix.dim(), matrix.nnz())?;
        for (row, col, value) in matrix.triplets() {
            writeln!(writer, "{} {} {}", row + 1, col + 1, value)?;
        }
        writer.flush()?;

        info!(
            "Exported {} cells in Matrix Market form to {}",
            matrix.nnz(),
            path.display()
        );
        Ok(())
    }

    /// Read a file written by [`MatrixMarketFile::write`].
    ///
    /// Only square integer coordinate matrices are accepted, and the entry
    /// count must match the size line exactly.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<IntermediateMatrix> {
        let path = path.as_ref();
        let reader = BufReader::new(open_input(path)?);
        let mut lines = reader.lines().enumerate();

        let banner = match lines.next() {
            Some((_, line)) => line?,
            None => return Err(Error::malformed(path, Some(1), "empty file")),
        };
        let tokens: Vec<&str> = banner.split_whitespace().collect();
        let supported = tokens.len() == 5
            && tokens[0] == "%%MatrixMarket"
            && tokens[1].eq_ignore_ascii_case("matrix")
            && tokens[2].eq_ignore_ascii_case("coordinate")
            && tokens[3].eq_ignore_ascii_case("integer")
            && tokens[4].eq_ignore_ascii_case("general");
        if !supported {
            return Err(Error::malformed(
                path,
                Some(1),
                format!("expected '{BANNER}', found '{}'", banner.trim()),
            ));
        }

        let mut size: Option<(u32, usize)> = None;
        let mut triplets = Vec::new();
        for (line_no, line) in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let fields = parse_fields(line)
                .ok_or_else(|| Error::malformed(path, Some(line_no + 1), "expected three integers"))?;

            let Some((dim, nnz)) = size else {
                let [rows, cols, nnz] = fields;
                if rows != cols {
                    return Err(Error::malformed(
                        path,
                        Some(line_no + 1),
                        format!("matrix is {rows}x{cols}, expected square"),
                    ));
                }
                let dim = u32::try_from(rows).map_err(|_| {
                    Error::malformed(path, Some(line_no + 1), format!("dimension {rows} too large"))
                })?;
                let nnz = usize::try_from(nnz).map_err(|_| {
                    Error::malformed(path, Some(line_no + 1), format!("{nnz} cells too many"))
                })?;
                size = Some((dim, nnz));
                continue;
            };

            if triplets.len() == nnz {
                return Err(Error::malformed(
                    path,
                    Some(line_no + 1),
                    format!("more than the declared {nnz} cells"),
                ));
            }
            let [row, col, value] = fields;
            let coordinate = |one_based: u64| {
                one_based
                    .checked_sub(1)
                    .and_then(|c| u32::try_from(c).ok())
                    .filter(|&c| c < dim)
            };
            let (Some(row), Some(col), Ok(value)) = (coordinate(row), coordinate(col), u32::try_from(value))
            else {
                return Err(Error::malformed(
                    path,
                    Some(line_no + 1),
                    format!("cell ({row}, {col}) = {value} is outside a {dim}x{dim} matrix"),
                ));
            };
            triplets.push((row, col, value));
        }

        let Some((dim, nnz)) = size else {
            return Err(Error::malformed(path, None, "missing size line"));
        };
        if triplets.len() != nnz {
            return Err(Error::malformed(
                path,
                None,
                format!("declared {nnz} cells, found {}", triplets.len()),
            ));
        }

        let matrix = IntermediateMatrix::from_triplets(dim, triplets)
            .map_err(|e| Error::malformed(path, None, e.to_string()))?;
        info!(
            "Loaded {}x{} matrix ({} cells) from {}",
            matrix.dim(),
            matrix.dim(),
            matrix.nnz(),
            path.display()
        );
        Ok(matrix)
    }
}

fn parse_fields(line: &str) -> Option<[u64; 3]> {
    let mut fields = line.split_whitespace().map(|f| f.parse::<u64>().ok());
    let parsed = [fields.next()??, fields.next()??, fields.next()??];
    fields.next().is_none().then_some(parsed)
}
