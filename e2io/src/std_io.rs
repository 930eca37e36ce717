// SPDX-License-Identifier: MIT

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{BlockIO, BlockIOResult};

/// File-backed implementation of [`BlockIO`].
///
/// Owns a file (or block device) opened read-write. An optional base offset
/// shifts every access, so a filesystem embedded in a partitioned image can
/// be addressed as if it started at byte 0.
#[derive(Debug)]
pub struct FileBlockIO {
    file: File,
    base: u64,
}

impl FileBlockIO {
    /// Opens `path` for read-write access.
    pub fn open<P: AsRef<Path>>(path: P) -> BlockIOResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file, base: 0 })
    }

    /// Opens `path` with every access shifted by `base` bytes.
    pub fn open_at<P: AsRef<Path>>(path: P, base: u64) -> BlockIOResult<Self> {
        let mut io = Self::open(path)?;
        io.base = base;
        Ok(io)
    }

    /// Wraps an already-open file.
    pub fn from_file(file: File) -> Self {
        Self { file, base: 0 }
    }

    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }
}

impl BlockIO for FileBlockIO {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        self.file.seek(SeekFrom::Start(self.base + offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        self.file.seek(SeekFrom::Start(self.base + offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> BlockIOResult {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let mut io = FileBlockIO::from_file(tempfile().unwrap());
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_primitive_rw() {
        let mut io = FileBlockIO::from_file(tempfile().unwrap());

        io.write_u32_at(0, 0xDEAD_BEEF).unwrap();
        io.write_u16_at(4, 0xEF53).unwrap();

        assert_eq!(io.read_u32_at(0).unwrap(), 0xDEAD_BEEF);
        assert_eq!(io.read_u16_at(4).unwrap(), 0xEF53);
        assert_eq!(io.read_u8_at(4).unwrap(), 0x53);
    }

    #[test]
    fn test_zero_fill() {
        let mut io = FileBlockIO::from_file(tempfile().unwrap());

        io.write_at(42, &[0xFF; 8]).unwrap();
        io.zero_fill(42, 8).unwrap();

        let mut buf = [0xAA; 8];
        io.read_at(42, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn test_read_past_end_fails() {
        let mut io = FileBlockIO::from_file(tempfile().unwrap());
        io.write_at(0, &[0u8; 16]).unwrap();

        let mut buf = [0u8; 8];
        assert!(io.read_at(12, &mut buf).is_err());
    }
}
