//! inter_edges_matrix.bin format - CSR intermediate-edge matrix
//!
//! Layout (little-endian):
//! - header (32 bytes): magic u32, version u16, flags u16, dim u32,
//!   reserved u32, nnz u64, payload_len u64
//! - payload: zstd frame of the body `indptr (u64 x dim+1)`,
//!   `indices (u32 x nnz)`, `values (u32 x nnz)`
//! - footer: CRC-64 of the uncompressed body, CRC-64 of header + body

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use super::crc::{checksum, ChecksumWriter};
use crate::core::error::{open_input, Error, Result};
use crate::core::matrix::IntermediateMatrix;

const MAGIC: u32 = 0x49454D58; // "IEMX"
const VERSION: u16 = 1;
const HEADER_LEN: usize = 32;
const FOOTER_LEN: usize = 16;
const FLAG_ZSTD: u16 = 0x0001;
const ZSTD_LEVEL: i32 = 3;

pub struct MatrixFile;

impl MatrixFile {
    /// Write a matrix to file
    pub fn write<P: AsRef<Path>>(path: P, matrix: &IntermediateMatrix) -> Result<()> {
        let path = path.as_ref();

        let body = encode_body(matrix);
        let body_crc = checksum(&body);
        let payload = zstd::bulk::compress(&body, ZSTD_LEVEL)?;

        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.extend_from_slice(&VERSION.to_le_bytes());
        header.extend_from_slice(&FLAG_ZSTD.to_le_bytes());
        header.extend_from_slice(&matrix.dim().to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&(matrix.nnz() as u64).to_le_bytes());
        header.extend_from_slice(&(payload.len() as u64).to_le_bytes());

        let mut file_digest = ChecksumWriter::new(std::io::sink());
        file_digest.write_all(&header)?;
        file_digest.write_all(&body)?;
        let (_, file_crc) = file_digest.finish();

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&header)?;
        writer.write_all(&payload)?;
        writer.write_all(&body_crc.to_le_bytes())?;
        writer.write_all(&file_crc.to_le_bytes())?;
        writer.flush()?;

        debug!(
            "Matrix body {} bytes, compressed to {} bytes",
            body.len(),
            payload.len()
        );
        info!(
            "Saved {}x{} matrix ({} cells) to {}",
            matrix.dim(),
            matrix.dim(),
            matrix.nnz(),
            path.display()
        );
        Ok(())
    }

    /// Read a matrix, verifying header, checksums and CSR shape.
    ///
    /// Header sizes are checked against the file length before anything is
    /// allocated from them.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<IntermediateMatrix> {
        let path = path.as_ref();
        let file = open_input(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let truncated = |e: std::io::Error| Error::corrupt(path, format!("truncated: {e}"));

        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header).map_err(truncated)?;

        let magic = u32::from_le_bytes(le_array(&header[0..4]));
        if magic != MAGIC {
            return Err(Error::corrupt(path, format!("bad magic {magic:#010x}")));
        }
        let version = u16::from_le_bytes(le_array(&header[4..6]));
        if version != VERSION {
            return Err(Error::corrupt(path, format!("unsupported version {version}")));
        }
        let flags = u16::from_le_bytes(le_array(&header[6..8]));
        if flags != FLAG_ZSTD {
            return Err(Error::corrupt(path, format!("unsupported flags {flags:#06x}")));
        }
        let dim = u32::from_le_bytes(le_array(&header[8..12]));
        let nnz = u64::from_le_bytes(le_array(&header[16..24]));
        let payload_len = u64::from_le_bytes(le_array(&header[24..32]));

        let expected_len = payload_len.checked_add((HEADER_LEN + FOOTER_LEN) as u64);
        if expected_len != Some(file_len) {
            return Err(Error::corrupt(
                path,
                format!("payload of {payload_len} bytes does not fit a {file_len} byte file"),
            ));
        }
        let body_len = body_len(dim, nnz).ok_or_else(|| {
            Error::corrupt(path, format!("impossible size: dim {dim}, {nnz} cells"))
        })?;

        let mut payload = vec![0u8; payload_len as usize];
        reader.read_exact(&mut payload).map_err(truncated)?;
        let mut footer = [0u8; FOOTER_LEN];
        reader.read_exact(&mut footer).map_err(truncated)?;
        let stored_body_crc = u64::from_le_bytes(le_array(&footer[0..8]));
        let stored_file_crc = u64::from_le_bytes(le_array(&footer[8..16]));

        // Decode at most one byte past the declared size
        let mut body = Vec::new();
        zstd::stream::read::Decoder::new(payload.as_slice())
            .and_then(|decoder| {
                decoder
                    .take((body_len as u64).saturating_add(1))
                    .read_to_end(&mut body)
            })
            .map_err(|e| Error::corrupt(path, format!("payload does not decompress: {e}")))?;
        if body.len() != body_len {
            return Err(Error::corrupt(
                path,
                format!("body is {} bytes, expected {body_len}", body.len()),
            ));
        }
        if checksum(&body) != stored_body_crc {
            return Err(Error::corrupt(path, "body checksum mismatch"));
        }
        let mut file_digest = ChecksumWriter::new(std::io::sink());
        file_digest.write_all(&header)?;
        file_digest.write_all(&body)?;
        if file_digest.finish().1 != stored_file_crc {
            return Err(Error::corrupt(path, "file checksum mismatch"));
        }

        let (indptr, indices, values) = decode_body(&body, dim as usize, nnz as usize);
        let matrix = IntermediateMatrix::from_csr(dim, indptr, indices, values)
            .map_err(|e| Error::corrupt(path, e.to_string()))?;

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

/// Uncompressed body size, `None` if it cannot be addressed
fn body_len(dim: u32, nnz: u64) -> Option<usize> {
    let offsets = (u64::from(dim) + 1).checked_mul(8)?;
    let cells = nnz.checked_mul(8)?;
    usize::try_from(offsets.checked_add(cells)?).ok()
}

fn encode_body(matrix: &IntermediateMatrix) -> Vec<u8> {
    let mut body = Vec::with_capacity(matrix.indptr().len() * 8 + matrix.nnz() * 8);
    for &offset in matrix.indptr() {
        body.extend_from_slice(&offset.to_le_bytes());
    }
    for &col in matrix.indices() {
        body.extend_from_slice(&col.to_le_bytes());
    }
    for &value in matrix.values() {
        body.extend_from_slice(&value.to_le_bytes());
    }
    body
}

/// Split a body whose length has already been checked
fn decode_body(body: &[u8], dim: usize, nnz: usize) -> (Vec<u64>, Vec<u32>, Vec<u32>) {
    let (indptr_bytes, rest) = body.split_at((dim + 1) * 8);
    let (indices_bytes, values_bytes) = rest.split_at(nnz * 4);

    let indptr = indptr_bytes
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes(le_array(c)))
        .collect();
    let indices = indices_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(le_array(c)))
        .collect();
    let values = values_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(le_array(c)))
        .collect();
    (indptr, indices, values)
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> IntermediateMatrix {
        IntermediateMatrix::from_triplets(
            7,
            vec![(1, 3, 2), (1, 6, 4), (2, 5, 3), (4, 6, 5), (6, 1, 2)],
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");

        let matrix = sample_matrix();
        MatrixFile::write(&path, &matrix).unwrap();
        let loaded = MatrixFile::read(&path).unwrap();

        assert_eq!(loaded, matrix);
        assert_eq!(loaded.get(4, 6), Some(5));
    }

    #[test]
    fn test_empty_matrix_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");

        let matrix = IntermediateMatrix::empty(1);
        MatrixFile::write(&path, &matrix).unwrap();
        assert_eq!(MatrixFile::read(&path).unwrap(), matrix);
    }

    #[test]
    fn test_writes_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");

        MatrixFile::write(&first, &sample_matrix()).unwrap();
        MatrixFile::write(&second, &sample_matrix()).unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_detects_header_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");
        MatrixFile::write(&path, &sample_matrix()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(MatrixFile::read(&path), Err(Error::CorruptFile { .. })));

        bytes[0] ^= 0xFF;
        bytes.truncate(bytes.len() - 4);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(MatrixFile::read(&path), Err(Error::CorruptFile { .. })));
    }

    fn overwrite_header(path: &Path, range: std::ops::Range<usize>, value: u64) {
        let mut bytes = std::fs::read(path).unwrap();
        bytes[range].copy_from_slice(&value.to_le_bytes());
        std::fs::write(path, &bytes).unwrap();
    }

    #[test]
    fn test_rejects_impossible_cell_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");

        for nnz in [u64::MAX, u64::MAX / 8, 1 << 40, 6] {
            MatrixFile::write(&path, &sample_matrix()).unwrap();
            overwrite_header(&path, 16..24, nnz);
            assert!(
                matches!(MatrixFile::read(&path), Err(Error::CorruptFile { .. })),
                "nnz {nnz} was accepted"
            );
        }
    }

    #[test]
    fn test_rejects_payload_length_beyond_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");

        for payload_len in [u64::MAX, u64::MAX - 40, 1 << 40, 0] {
            MatrixFile::write(&path, &sample_matrix()).unwrap();
            overwrite_header(&path, 24..32, payload_len);
            assert!(
                matches!(MatrixFile::read(&path), Err(Error::CorruptFile { .. })),
                "payload length {payload_len} was accepted"
            );
        }
    }

    #[test]
    fn test_rejects_oversized_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inter_edges_matrix.bin");
        MatrixFile::write(&path, &sample_matrix()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(MatrixFile::read(&path), Err(Error::CorruptFile { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MatrixFile::read("/no/such/inter_edges_matrix.bin"),
            Err(Error::MissingInput { .. })
        ));
    }
}
