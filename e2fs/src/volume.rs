// SPDX-License-Identifier: MIT

use e2io::BlockIO;
use zerocopy::{Immutable, IntoBytes};

use crate::checker::{self, CheckReport};
use crate::error::Ext2Result;
use crate::meta::Ext2Meta;
use crate::reader::InodeReader;
use crate::types::{Ext2DirEntry, Ext2GroupDesc, Ext2Inode, Ext2Superblock};
use crate::{allocator, block_map, injector, parser};

/// One opened filesystem: the exclusive I/O handle plus its geometry.
///
/// The geometry is fixed for the life of the handle; everything mutable
/// (counters, bitmaps, inodes) is re-read from disk on each operation.
/// Nothing here is safe for concurrent callers: one volume, one caller.
pub struct Ext2Volume<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    meta: Ext2Meta,
}

impl<'a, IO: BlockIO + ?Sized> Ext2Volume<'a, IO> {
    /// Reads and validates the superblock, deriving the geometry.
    pub fn open(io: &'a mut IO) -> Ext2Result<Self> {
        let meta = Ext2Meta::from_io(io)?;
        Ok(Self { io, meta })
    }

    pub fn meta(&self) -> &Ext2Meta {
        &self.meta
    }

    pub fn superblock(&mut self) -> Ext2Result<Ext2Superblock> {
        parser::read_superblock(self.io)
    }

    pub fn group_descriptor(&mut self, index: u32) -> Ext2Result<Ext2GroupDesc> {
        parser::read_group_descriptor(self.io, &self.meta, index)
    }

    pub fn inode(&mut self, ino: u32) -> Ext2Result<Ext2Inode> {
        parser::read_inode(self.io, &self.meta, ino)
    }

    /// Live entries of directory `ino`, in on-disk order.
    pub fn list_entries(&mut self, ino: u32) -> Ext2Result<Vec<Ext2DirEntry>> {
        parser::read_dir_entries(self.io, &self.meta, ino)
    }

    /// Inode number for a slash-separated path, or the null inode.
    pub fn resolve_path(&mut self, path: &str) -> Ext2Result<u32> {
        parser::resolve_path(self.io, &self.meta, path)
    }

    /// Streaming reader over `inode`'s content.
    pub fn reader(&mut self, inode: Ext2Inode) -> InodeReader<'_, IO> {
        InodeReader::new(self.io, &self.meta, inode)
    }

    pub fn map_logical(&mut self, inode: &Ext2Inode, logical: u32) -> Ext2Result<u32> {
        block_map::map_logical(self.io, &self.meta, inode, logical)
    }

    pub fn allocate_inode(&mut self, prefer_group: u32) -> Ext2Result<u32> {
        allocator::allocate_inode(self.io, &self.meta, prefer_group)
    }

    pub fn allocate_block(&mut self, prefer_group: u32) -> Ext2Result<u32> {
        allocator::allocate_block(self.io, &self.meta, prefer_group)
    }

    pub fn create_dir_inode(&mut self, parent: u32, ino: u32) -> Ext2Result<Ext2Inode> {
        injector::create_dir_inode(self.io, &self.meta, parent, ino)
    }

    pub fn create_file_inode(&mut self, ino: u32) -> Ext2Result<Ext2Inode> {
        injector::create_file_inode(self.io, &self.meta, ino)
    }

    pub fn append_dir_entry(&mut self, ino: u32, entry: &Ext2DirEntry) -> Ext2Result {
        injector::append_dir_entry(self.io, &self.meta, ino, entry)
    }

    pub fn write_file_data(&mut self, ino: u32, data: &[u8]) -> Ext2Result<usize> {
        injector::write_file_data(self.io, &self.meta, ino, data)
    }

    pub fn update_inode<T: IntoBytes + Immutable>(
        &mut self,
        ino: u32,
        value: T,
        field_offset: u64,
    ) -> Ext2Result {
        injector::update_inode(self.io, &self.meta, ino, value, field_offset)
    }

    pub fn check(&mut self) -> Ext2Result<CheckReport> {
        checker::check_image(self.io, &self.meta)
    }

    pub fn flush(&mut self) -> Ext2Result {
        self.io.flush()?;
        Ok(())
    }
}
