//! edge_index.bin format - edge id <-> dense index
//!
//! Layout (little-endian):
//! - header (16 bytes): magic u32, version u16, reserved u16, count u64
//! - body: `count` records of `index u32, len u32, len bytes of UTF-8`,
//!   in index order starting at 1
//! - footer: CRC-64 of header and body

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;

use super::crc::{ChecksumReader, ChecksumWriter};
use crate::core::edge::EdgeId;
use crate::core::error::{open_input, Error, Result};
use crate::core::index::EdgeIndex;

const MAGIC: u32 = 0x45494458; // "EIDX"
const VERSION: u16 = 1;

pub struct EdgeIndexFile;

impl EdgeIndexFile {
    /// Write an edge index to file
    pub fn write<P: AsRef<Path>>(path: P, index: &EdgeIndex) -> Result<()> {
        let path = path.as_ref();
        let mut writer = ChecksumWriter::new(BufWriter::new(File::create(path)?));

        writer.write_all(&MAGIC.to_le_bytes())?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u16.to_le_bytes())?;
        writer.write_all(&(index.len() as u64).to_le_bytes())?;

        for (i, edge) in index.iter() {
            let bytes = edge.as_str().as_bytes();
            writer.write_all(&i.to_le_bytes())?;
            writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
            writer.write_all(bytes)?;
        }

        let (mut inner, file_crc) = writer.finish();
        inner.write_all(&file_crc.to_le_bytes())?;
        inner.flush()?;

        info!("Saved edge index ({} edges) to {}", index.len(), path.display());
        Ok(())
    }

    /// Read an edge index, verifying magic, version, ordering and checksum
    pub fn read<P: AsRef<Path>>(path: P) -> Result<EdgeIndex> {
        let path = path.as_ref();
        let mut reader = ChecksumReader::new(BufReader::new(open_input(path)?));
        let truncated = |e: std::io::Error| Error::corrupt(path, format!("truncated: {e}"));

        let mut header = [0u8; 16];
        reader.read_exact(&mut header).map_err(truncated)?;

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != MAGIC {
            return Err(Error::corrupt(path, format!("bad magic {magic:#010x}")));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Error::corrupt(path, format!("unsupported version {version}")));
        }
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[8..16]);
        let count = u64::from_le_bytes(count_bytes);

        let mut edges = Vec::new();
        for expected in 1..=count {
            let mut record = [0u8; 8];
            reader.read_exact(&mut record).map_err(truncated)?;
            let index = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
            let len = u32::from_le_bytes([record[4], record[5], record[6], record[7]]);
            if u64::from(index) != expected {
                return Err(Error::corrupt(
                    path,
                    format!("expected index {expected}, found {index}"),
                ));
            }

            // Grows with the bytes actually present, not the declared length
            let mut name = Vec::new();
            (&mut reader)
                .take(u64::from(len))
                .read_to_end(&mut name)
                .map_err(truncated)?;
            if name.len() != len as usize {
                return Err(Error::corrupt(
                    path,
                    format!("edge {index} declares {len} bytes, {} present", name.len()),
                ));
            }
            let name = String::from_utf8(name)
                .map_err(|_| Error::corrupt(path, format!("edge {index} is not UTF-8")))?;
            edges.push(EdgeId::from(name));
        }

        let (mut inner, computed) = reader.finish();
        let mut footer = [0u8; 8];
        inner.read_exact(&mut footer).map_err(truncated)?;
        let stored = u64::from_le_bytes(footer);
        if stored != computed {
            return Err(Error::corrupt(
                path,
                format!("checksum mismatch (stored {stored:#x}, computed {computed:#x})"),
            ));
        }

        let index = EdgeIndex::from_ordered(edges).map_err(|e| Error::corrupt(path, e.to_string()))?;
        info!("Loaded edge index ({} edges) from {}", index.len(), path.display());
        Ok(index)
    }
}
