// SPDX-License-Identifier: MIT
//! EXT2 block group descriptor structure

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::*;

/// EXT2 block group descriptor (32 bytes, one per group in the GDT).
#[derive(Debug, Clone, Copy, Default, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct Ext2GroupDesc {
    /// Block number of the block bitmap
    pub bg_block_bitmap: u32,
    /// Block number of the inode bitmap
    pub bg_inode_bitmap: u32,
    /// First block of the inode table
    pub bg_inode_table: u32,
    /// Free blocks in this group
    pub bg_free_blocks_count: u16,
    /// Free inodes in this group
    pub bg_free_inodes_count: u16,
    /// Directories allocated in this group
    pub bg_used_dirs_count: u16,
    pub bg_pad: u16,
    pub bg_reserved: [u32; 3],
}

impl Ext2GroupDesc {
    pub fn new(
        block_bitmap: u32,
        inode_bitmap: u32,
        inode_table: u32,
        free_blocks: u16,
        free_inodes: u16,
        used_dirs: u16,
    ) -> Self {
        Self {
            bg_block_bitmap: block_bitmap,
            bg_inode_bitmap: inode_bitmap,
            bg_inode_table: inode_table,
            bg_free_blocks_count: free_blocks,
            bg_free_inodes_count: free_inodes,
            bg_used_dirs_count: used_dirs,
            ..Default::default()
        }
    }
}

// Ensure the struct is exactly 32 bytes
const _: () = assert!(core::mem::size_of::<Ext2GroupDesc>() == EXT2_GROUP_DESC_SIZE);
