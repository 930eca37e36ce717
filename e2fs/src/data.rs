// SPDX-License-Identifier: MIT

//! Byte-addressed reads and writes across block boundaries.
//!
//! Transfers are split at block granularity: a partial first block, then
//! full blocks until the buffer is exhausted. Neither function touches
//! `inode.size`; raising it after a write is the caller's responsibility.

use e2io::prelude::*;

use crate::block_map;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::types::Ext2Inode;

/// Maps a continuation block, treating a hole as the end of the data run.
///
/// Only the first block of a transfer is allowed to fault on a hole; a null
/// mapping encountered while continuing ends the transfer cleanly.
fn map_continuation<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    inode: &Ext2Inode,
    logical: u32,
) -> Ext2Result<Option<u32>> {
    match block_map::map_logical(io, meta, inode, logical) {
        Ok(block) => Ok(Some(block)),
        Err(Ext2Error::HoleOrOutOfRange) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reads at most `buf.len()` bytes of `inode`'s content starting at byte
/// offset `off`.
///
/// Returns the byte count produced and whether the end of file was reached:
/// `(0, true)` when `off` is at or past `inode.size`, `(n, true)` when the
/// read ran up to it. The count is not clamped to the file size; readers
/// that need the clamp apply it themselves.
pub fn read_data<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    inode: &Ext2Inode,
    buf: &mut [u8],
    off: u64,
) -> Ext2Result<(usize, bool)> {
    if buf.is_empty() {
        return Ok((0, false));
    }

    let size = inode.i_size as u64;
    if off >= size {
        return Ok((0, true));
    }

    let bs = meta.block_size as u64;
    let first_block = (off / bs) as u32;
    let inner = (off % bs) as usize;
    let blocks = 1 + ((off + buf.len() as u64) / bs) as u32 - first_block;

    let block_no = block_map::map_logical(io, meta, inode, first_block)?;

    let mut n = buf.len().min(bs as usize - inner);
    io.read_at(meta.block_offset(block_no) + inner as u64, &mut buf[..n])?;

    if off + n as u64 >= size {
        return Ok((n, true));
    }

    for i in 1..blocks {
        if n == buf.len() {
            break;
        }

        let block_no = match map_continuation(io, meta, inode, first_block + i)? {
            Some(block) => block,
            None => return Ok((n, true)),
        };

        let chunk = (buf.len() - n).min(bs as usize);
        io.read_at(meta.block_offset(block_no), &mut buf[n..n + chunk])?;
        n += chunk;

        if off + n as u64 >= size {
            return Ok((n, true));
        }
    }

    Ok((n, false))
}

/// Writes `buf` into `inode`'s already-mapped blocks starting at byte
/// offset `off`, returning the byte count stored.
///
/// Does not extend the file: a null mapping while continuing ends the write
/// with the bytes stored so far, and `inode.size` is never updated here.
pub fn write_data<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    inode: &Ext2Inode,
    buf: &[u8],
    off: u64,
) -> Ext2Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }

    let bs = meta.block_size as u64;
    let first_block = (off / bs) as u32;
    let inner = (off % bs) as usize;
    let blocks = 1 + ((off + buf.len() as u64) / bs) as u32 - first_block;

    let block_no = block_map::map_logical(io, meta, inode, first_block)?;

    let mut n = buf.len().min(bs as usize - inner);
    io.write_at(meta.block_offset(block_no) + inner as u64, &buf[..n])?;

    for i in 1..blocks {
        if n == buf.len() {
            break;
        }

        let block_no = match map_continuation(io, meta, inode, first_block + i)? {
            Some(block) => block,
            None => return Ok(n),
        };

        let chunk = (buf.len() - n).min(bs as usize);
        io.write_at(meta.block_offset(block_no), &buf[n..n + chunk])?;
        n += chunk;
    }

    Ok(n)
}
