// SPDX-License-Identifier: MIT

use e2io::prelude::*;

use crate::constant::*;
use crate::error::Ext2Result;
use crate::types::Ext2Superblock;

/// Filesystem geometry carried through from the superblock.
///
/// A snapshot taken at open; the free counters are deliberately absent
/// because they change under mutation and must be re-read each time.
#[derive(Debug, Clone)]
pub struct Ext2Meta {
    pub block_size: u32,
    pub inode_size: u16,
    pub block_groups_count: u32,
    pub blocks_count: u32,
    pub inodes_count: u32,
    pub blocks_per_group: u32,
    pub inodes_per_group: u32,
    /// First block of the group descriptor table
    pub gdt_block: u32,
    pub first_data_block: u32,
    pub first_ino: u32,
}

impl Ext2Meta {
    /// Derives the geometry from a validated superblock.
    pub fn from_superblock(sb: &Ext2Superblock) -> Self {
        Self {
            block_size: sb.block_size(),
            inode_size: sb.s_inode_size,
            block_groups_count: sb.block_groups_count(),
            blocks_count: sb.s_blocks_count,
            inodes_count: sb.s_inodes_count,
            blocks_per_group: sb.s_blocks_per_group,
            inodes_per_group: sb.s_inodes_per_group,
            gdt_block: sb.s_first_data_block + 1,
            first_data_block: sb.s_first_data_block,
            first_ino: sb.s_first_ino,
        }
    }

    /// Reads and validates the superblock, then derives the geometry.
    pub fn from_io<IO: BlockIO + ?Sized>(io: &mut IO) -> Ext2Result<Self> {
        let sb = crate::parser::read_superblock(io)?;
        Ok(Self::from_superblock(&sb))
    }

    /// Byte offset of block `block`.
    #[inline]
    pub fn block_offset(&self, block: u32) -> u64 {
        block as u64 * self.block_size as u64
    }

    /// Byte offset of inode record `index` inside the table at `inode_table`.
    #[inline]
    pub fn inode_offset(&self, inode_table: u32, index: u32) -> u64 {
        self.block_offset(inode_table) + index as u64 * self.inode_size as u64
    }

    /// Byte offset of group descriptor `index` in the GDT.
    #[inline]
    pub fn group_desc_offset(&self, index: u32) -> u64 {
        self.block_offset(self.gdt_block) + index as u64 * EXT2_GROUP_DESC_SIZE as u64
    }

    /// Block group that owns inode `ino` (inode numbers are 1-based).
    #[inline]
    pub fn inode_group(&self, ino: u32) -> u32 {
        (ino - 1) / self.inodes_per_group
    }

    /// Index of inode `ino` inside its group's inode table.
    #[inline]
    pub fn inode_index(&self, ino: u32) -> u32 {
        (ino - 1) % self.inodes_per_group
    }

    /// Pointer entries per indirect block.
    #[inline]
    pub fn pointers_per_block(&self) -> u32 {
        self.block_size / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_1k() -> Ext2Meta {
        let mut sb = Ext2Superblock::default();
        sb.s_blocks_count = 512;
        sb.s_inodes_count = 64;
        sb.s_blocks_per_group = 256;
        sb.s_inodes_per_group = 32;
        Ext2Meta::from_superblock(&sb)
    }

    #[test]
    fn test_geometry() {
        let meta = meta_1k();
        assert_eq!(meta.block_size, 1024);
        assert_eq!(meta.block_groups_count, 2);
        assert_eq!(meta.gdt_block, 2);
        assert_eq!(meta.pointers_per_block(), 256);
    }

    #[test]
    fn test_offsets() {
        let meta = meta_1k();
        assert_eq!(meta.block_offset(0), 0);
        assert_eq!(meta.block_offset(3), 3072);
        assert_eq!(meta.inode_offset(5, 0), 5120);
        assert_eq!(meta.inode_offset(5, 3), 5120 + 3 * 128);
        assert_eq!(meta.group_desc_offset(0), 2048);
        assert_eq!(meta.group_desc_offset(1), 2048 + 32);
    }

    #[test]
    fn test_inode_group_split() {
        let meta = meta_1k();
        assert_eq!(meta.inode_group(1), 0);
        assert_eq!(meta.inode_index(1), 0);
        assert_eq!(meta.inode_group(32), 0);
        assert_eq!(meta.inode_index(32), 31);
        assert_eq!(meta.inode_group(33), 1);
        assert_eq!(meta.inode_index(33), 0);
    }
}
