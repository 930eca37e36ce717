// SPDX-License-Identifier: MIT

pub mod error;
mod macros;

mod mem;
mod std_io;

pub mod prelude {
    pub use super::error::*;
    pub use super::mem::MemBlockIO;
    pub use super::std_io::FileBlockIO;
    pub use super::BlockIO;
    pub use super::BlockIOExt;
    pub use super::BlockIOStructExt;
}

use error::*;
pub use mem::MemBlockIO;
pub use std_io::FileBlockIO;

/// Scratch buffer size for chunked helpers (zero fill).
const SCRATCH_BUF_SIZE: usize = 8192;

/// Block I/O abstraction trait.
///
/// Positioned read/write/flush at arbitrary byte offsets, with no implicit
/// seek state. Implementations may target regular files, block devices or
/// RAM buffers.
pub trait BlockIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> BlockIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BlockIOResult;

    /// Forces outstanding writes to stable storage (may be a no-op).
    fn flush(&mut self) -> BlockIOResult;
}

/// Extension helpers for BlockIO.
///
/// Little-endian primitive reads/writes and region zeroing.
pub trait BlockIOExt: BlockIO {
    /// Fills a region with zeroes.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: usize) -> BlockIOResult {
        const ZERO_BUF: [u8; SCRATCH_BUF_SIZE] = [0u8; SCRATCH_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    // Implements read/write helpers for primitive types (u8, u16, u32)
    blockio_primitive_rw!(u8, u16, u32);
}

impl<T: BlockIO + ?Sized> BlockIOExt for T {}

/// Extension trait for reading and writing fixed-layout structs via zerocopy.
pub trait BlockIOStructExt: BlockIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> BlockIOResult<T> {
        let size = core::mem::size_of::<T>();
        assert!(size <= SCRATCH_BUF_SIZE, "read_struct: type too large");
        let mut buf = [0u8; SCRATCH_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| BlockIOError::Device("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::Immutable + ?Sized>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> BlockIOResult {
        self.write_at(offset, val.as_bytes())
    }
}

impl<T: BlockIO + ?Sized> BlockIOStructExt for T {}
