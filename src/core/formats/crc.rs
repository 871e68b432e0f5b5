//! CRC-64 (GO-ISO) checksumming readers and writers

use std::io::{self, Read, Write};

use crc::{Crc, CRC_64_GO_ISO};

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// Checksum of a byte slice
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Writer that checksums every byte passed through it
pub struct ChecksumWriter<W> {
    inner: W,
    digest: crc::Digest<'static, u64>,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
        }
    }

    /// Hand back the inner writer and the checksum of everything written
    pub fn finish(self) -> (W, u64) {
        (self.inner, self.digest.finalize())
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.digest.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that checksums every byte read through it
pub struct ChecksumReader<R> {
    inner: R,
    digest: crc::Digest<'static, u64>,
}

impl<R: Read> ChecksumReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
        }
    }

    pub fn finish(self) -> (R, u64) {
        (self.inner, self.digest.finalize())
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.digest.update(&buf[..read]);
        Ok(read)
    }
}
