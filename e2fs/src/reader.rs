// SPDX-License-Identifier: MIT

use std::io::{self, Read};

use e2io::BlockIO;

use crate::data;
use crate::meta::Ext2Meta;
use crate::types::Ext2Inode;

/// Forward byte stream over one inode's content.
///
/// Unlike the raw data layer, the returned byte counts are clamped so the
/// stream never runs past `inode.size`; the tail of the final block is not
/// file content. Implements [`std::io::Read`], so an inode can be drained
/// with `io::copy`.
pub struct InodeReader<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    meta: &'a Ext2Meta,
    inode: Ext2Inode,
    pos: u64,
}

impl<'a, IO: BlockIO + ?Sized> InodeReader<'a, IO> {
    pub fn new(io: &'a mut IO, meta: &'a Ext2Meta, inode: Ext2Inode) -> Self {
        Self {
            io,
            meta,
            inode,
            pos: 0,
        }
    }

    /// Reads the next chunk into `buf`, returning the clamped byte count
    /// and whether the end of the file has been reached.
    pub fn read_next(&mut self, buf: &mut [u8]) -> crate::error::Ext2Result<(usize, bool)> {
        let (n, eof) = data::read_data(self.io, self.meta, &self.inode, buf, self.pos)?;

        let size = self.inode.i_size as u64;
        let n = if self.pos + n as u64 > size {
            (size - self.pos) as usize
        } else {
            n
        };

        self.pos += n as u64;
        Ok((n, eof))
    }
}

impl<'a, IO: BlockIO + ?Sized> Read for InodeReader<'a, IO> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (n, _) = self.read_next(buf).map_err(io::Error::other)?;
        Ok(n)
    }
}
