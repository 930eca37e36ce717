// SPDX-License-Identifier: MIT

//! Inode and block allocation across the group bitmaps.
//!
//! Both resources follow the same algorithm: check the superblock's global
//! free counter, scan the preferred group's bitmap for the lowest free bit,
//! wrap forward through the remaining groups, then persist the single
//! mutated bitmap byte and decrement the group and superblock free counters.

use e2io::prelude::*;

use crate::bitmap::BitmapOps;
use crate::constant::*;
use crate::ensure;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::parser;

/// Loads `size` bitmap bytes starting at `offset`.
fn load_bitmap<IO: BlockIO + ?Sized>(
    io: &mut IO,
    size: u32,
    offset: u64,
) -> Ext2Result<Vec<u8>> {
    let mut bmp = vec![0u8; size as usize];
    io.read_at(offset, &mut bmp)?;
    Ok(bmp)
}

/// Loads group `group`'s inode bitmap (`inodesPerGroup / 8` bytes).
pub fn load_inode_bitmap<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    group: u32,
) -> Ext2Result<Vec<u8>> {
    let desc = parser::read_group_descriptor(io, meta, group)?;
    load_bitmap(
        io,
        meta.inodes_per_group / 8,
        meta.block_offset(desc.bg_inode_bitmap),
    )
}

/// Loads group `group`'s block bitmap (`blocksPerGroup / 8` bytes).
pub fn load_block_bitmap<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    group: u32,
) -> Ext2Result<Vec<u8>> {
    let desc = parser::read_group_descriptor(io, meta, group)?;
    load_bitmap(
        io,
        meta.blocks_per_group / 8,
        meta.block_offset(desc.bg_block_bitmap),
    )
}

/// Finds the first group with a free bit, starting at `prefer` and wrapping
/// through `(prefer+1) mod G, ...`. The lowest free bit of the preferred
/// group wins before any other group is considered.
fn next_free<IO, F>(
    io: &mut IO,
    meta: &Ext2Meta,
    prefer: u32,
    mut load: F,
) -> Ext2Result<Option<(Vec<u8>, u32, u32)>>
where
    IO: BlockIO + ?Sized,
    F: FnMut(&mut IO, &Ext2Meta, u32) -> Ext2Result<Vec<u8>>,
{
    let bmp = load(io, meta, prefer)?;
    if let Some(index) = bmp.find_first_free() {
        return Ok(Some((bmp, index, prefer)));
    }

    let groups = meta.block_groups_count;
    let mut group = (prefer + 1) % groups;
    while group != prefer {
        let bmp = load(io, meta, group)?;
        if let Some(index) = bmp.find_first_free() {
            return Ok(Some((bmp, index, group)));
        }
        group = (group + 1) % groups;
    }

    Ok(None)
}

/// Allocates one inode, preferring `prefer`'s group.
///
/// Returns the 1-based global inode number, or the null inode when no group
/// has a free bit (distinct from the `OutOfSpace` counter precheck).
pub fn allocate_inode<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    prefer: u32,
) -> Ext2Result<u32> {
    let sb = parser::read_superblock(io)?;
    let free = sb.s_free_inodes_count;
    ensure!(free != 0, Ext2Error::OutOfSpace);

    let Some((mut bmp, index, group)) =
        next_free(io, meta, prefer, load_inode_bitmap)?
    else {
        return Ok(EXT2_NULL_INO);
    };

    let desc = parser::read_group_descriptor(io, meta, group)?;
    bmp.alloc(index);

    io.write_u8_at(
        meta.block_offset(desc.bg_inode_bitmap) + index as u64 / 8,
        bmp[index as usize / 8],
    )?;
    io.write_u16_at(
        meta.group_desc_offset(group) + BG_FREE_INODES_COUNT,
        desc.bg_free_inodes_count - 1,
    )?;
    io.write_u32_at(EXT2_SUPERBLOCK_OFFSET + S_FREE_INODES_COUNT, free - 1)?;
    io.flush()?;

    Ok(meta.inodes_per_group * group + index + 1)
}

/// Allocates one data block, preferring `prefer`'s group.
///
/// Returns the 1-based global block number, or the null block when no group
/// has a free bit.
pub fn allocate_block<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    prefer: u32,
) -> Ext2Result<u32> {
    let sb = parser::read_superblock(io)?;
    let free = sb.s_free_blocks_count;
    ensure!(free != 0, Ext2Error::OutOfSpace);

    let Some((mut bmp, index, group)) =
        next_free(io, meta, prefer, load_block_bitmap)?
    else {
        return Ok(EXT2_NULL_BLOCK);
    };

    let desc = parser::read_group_descriptor(io, meta, group)?;
    bmp.alloc(index);

    io.write_u8_at(
        meta.block_offset(desc.bg_block_bitmap) + index as u64 / 8,
        bmp[index as usize / 8],
    )?;
    io.write_u16_at(
        meta.group_desc_offset(group) + BG_FREE_BLOCKS_COUNT,
        desc.bg_free_blocks_count - 1,
    )?;
    io.write_u32_at(EXT2_SUPERBLOCK_OFFSET + S_FREE_BLOCKS_COUNT, free - 1)?;
    io.flush()?;

    Ok(meta.blocks_per_group * group + index + 1)
}

/// `allocate_inode` that turns the null sentinel into `OutOfSpace`.
pub fn allocate_inode_strict<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    prefer: u32,
) -> Ext2Result<u32> {
    let ino = allocate_inode(io, meta, prefer)?;
    ensure!(ino != EXT2_NULL_INO, Ext2Error::OutOfSpace);
    Ok(ino)
}

/// `allocate_block` that turns the null sentinel into `OutOfSpace`.
pub fn allocate_block_strict<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    prefer: u32,
) -> Ext2Result<u32> {
    let block = allocate_block(io, meta, prefer)?;
    ensure!(block != EXT2_NULL_BLOCK, Ext2Error::OutOfSpace);
    Ok(block)
}
