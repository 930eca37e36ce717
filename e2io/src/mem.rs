// SPDX-License-Identifier: MIT

use crate::{BlockIO, BlockIOError, BlockIOResult};

/// In-memory implementation of [`BlockIO`].
///
/// Useful for tests and RAM-backed images.
#[derive(Debug)]
pub struct MemBlockIO<'a> {
    buffer: &'a mut [u8],
    base: u64,
}

impl<'a> MemBlockIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, base: 0 }
    }

    #[inline]
    pub fn new_at(buffer: &'a mut [u8], base: u64) -> Self {
        Self { buffer, base }
    }

    #[inline]
    fn span(&self, offset: u64, len: usize) -> BlockIOResult<(usize, usize)> {
        let start = self
            .base
            .checked_add(offset)
            .ok_or(BlockIOError::OutOfBounds)?;
        let end = start
            .checked_add(len as u64)
            .ok_or(BlockIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(BlockIOError::OutOfBounds);
        }
        Ok((start as usize, end as usize))
    }
}

impl<'a> BlockIO for MemBlockIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult {
        let (start, end) = self.span(offset, data.len())?;
        self.buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult {
        let (start, end) = self.span(offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[start..end]);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> BlockIOResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemBlockIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_bounds() {
        let mut buf = [0u8; 16];
        let mut io = MemBlockIO::new(&mut buf);

        assert!(io.write_at(12, &[0u8; 8]).is_err());
        let mut out = [0u8; 4];
        assert!(io.read_at(14, &mut out).is_err());
        assert!(io.read_at(u64::MAX, &mut out).is_err());
    }

    #[test]
    fn test_base_offset() {
        let mut buf = [0u8; 64];
        {
            let mut io = MemBlockIO::new_at(&mut buf, 32);
            io.write_at(0, &[0xAB; 4]).unwrap();
        }
        assert_eq!(&buf[32..36], &[0xAB; 4]);
    }

    #[test]
    fn test_primitive_rw() {
        let mut buf = [0u8; 32];
        let mut io = MemBlockIO::new(&mut buf);

        io.write_u16_at(6, 0xEF53).unwrap();
        assert_eq!(io.read_u16_at(6).unwrap(), 0xEF53);
        assert_eq!(buf[6], 0x53);
        assert_eq!(buf[7], 0xEF);
    }
}
