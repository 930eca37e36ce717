// SPDX-License-Identifier: MIT

//! Logical-to-physical block mapping through the inode's direct and
//! indirect pointer tree, and on-demand extension of that tree.

use e2io::prelude::*;

use crate::constant::*;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::types::Ext2Inode;
use crate::{allocator, ensure, parser};

/// Position of a logical file-block index inside the pointer tree.
///
/// With `n` pointers per indirect block, logical indices map as
/// `[0, 12)` direct, `[12, 12+n)` single, `[12+n, 12+n+n^2)` double and
/// `[12+n+n^2, 12+n+n^2+n^3)` triple indirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPath {
    Direct(u32),
    Single { single: u32 },
    Double { double: u32, single: u32 },
    Triple { triple: u32, double: u32, single: u32 },
}

impl BlockPath {
    /// Classifies `logical` for a filesystem with `pointers_per_block`
    /// entries per indirect block.
    pub fn classify(logical: u32, pointers_per_block: u32) -> Ext2Result<Self> {
        if logical < EXT2_NDIR_BLOCKS {
            return Ok(BlockPath::Direct(logical));
        }

        let n = pointers_per_block as u64;
        let mut rest = (logical - EXT2_NDIR_BLOCKS) as u64;

        if rest < n {
            return Ok(BlockPath::Single { single: rest as u32 });
        }
        rest -= n;

        if rest < n * n {
            return Ok(BlockPath::Double {
                double: (rest / n) as u32,
                single: (rest % n) as u32,
            });
        }
        rest -= n * n;

        if rest < n * n * n {
            return Ok(BlockPath::Triple {
                triple: (rest / (n * n)) as u32,
                double: ((rest / n) % n) as u32,
                single: (rest % n) as u32,
            });
        }

        Err(Ext2Error::HoleOrOutOfRange)
    }
}

/// Reads pointer `index` out of indirect block `block`.
///
/// The null block is not dereferenceable; holes are faults here.
fn extract_block<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    block: u32,
    index: u32,
) -> Ext2Result<u32> {
    ensure!(block != EXT2_NULL_BLOCK, Ext2Error::HoleOrOutOfRange);
    Ok(io.read_u32_at(meta.block_offset(block) + 4 * index as u64)?)
}

/// Resolves logical file-block `logical` of `inode` to a physical block.
///
/// Fails with `HoleOrOutOfRange` when the leaf or any intermediate pointer
/// is the null block; this engine does not represent sparse files.
pub fn map_logical<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    inode: &Ext2Inode,
    logical: u32,
) -> Ext2Result<u32> {
    let i_block = inode.i_block;

    let leaf = match BlockPath::classify(logical, meta.pointers_per_block())? {
        BlockPath::Direct(idx) => i_block[idx as usize],
        BlockPath::Single { single } => {
            extract_block(io, meta, i_block[EXT2_IND_BLOCK as usize], single)?
        }
        BlockPath::Double { double, single } => {
            let ind = extract_block(io, meta, i_block[EXT2_DIND_BLOCK as usize], double)?;
            extract_block(io, meta, ind, single)?
        }
        BlockPath::Triple {
            triple,
            double,
            single,
        } => {
            let dind = extract_block(io, meta, i_block[EXT2_TIND_BLOCK as usize], triple)?;
            let ind = extract_block(io, meta, dind, double)?;
            extract_block(io, meta, ind, single)?
        }
    };

    ensure!(leaf != EXT2_NULL_BLOCK, Ext2Error::HoleOrOutOfRange);
    Ok(leaf)
}

/// Allocates one block and zeroes it, for use as an indirect block.
///
/// Zeroing keeps the invariant that unused pointer slots equal the null
/// block before any child is published into them.
fn alloc_indirect<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    group: u32,
) -> Ext2Result<u32> {
    let block = allocator::allocate_block_strict(io, meta, group)?;
    io.zero_fill(meta.block_offset(block), meta.block_size as usize)?;
    Ok(block)
}

/// Walks one indirect level: returns the existing child of `parent` at
/// `index`, or allocates a zeroed one and publishes its number there.
fn ensure_child<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    group: u32,
    parent: u32,
    index: u32,
) -> Ext2Result<u32> {
    let child = extract_block(io, meta, parent, index)?;
    if child != EXT2_NULL_BLOCK {
        return Ok(child);
    }

    let child = alloc_indirect(io, meta, group)?;
    io.write_u32_at(meta.block_offset(parent) + 4 * index as u64, child)?;
    Ok(child)
}

/// Extends `ino`'s block tree by one data block and returns its number.
///
/// The logical index is `inode.size / blockSize`: the caller has already
/// raised the size to cover the new block's position. Missing indirect
/// levels are allocated (zero-filled) from the inode outward, then the leaf
/// data block is allocated and published in its parent's slot.
pub fn create_logical<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
) -> Ext2Result<u32> {
    let inode = parser::read_inode(io, meta, ino)?;
    let group = meta.inode_group(ino);
    let desc = parser::read_group_descriptor(io, meta, group)?;
    let inode_off = meta.inode_offset(desc.bg_inode_table, meta.inode_index(ino));

    let i_block = inode.i_block;
    let logical = inode.i_size / meta.block_size;
    let path = BlockPath::classify(logical, meta.pointers_per_block())?;

    // Slot in the inode's own block[] array for the relevant root pointer.
    let root_slot = |idx: u32| inode_off + I_BLOCK + 4 * idx as u64;

    // Resolve (allocating as needed) down to the indirect block that will
    // hold the new leaf pointer, plus the leaf's index inside it. A direct
    // slot short-circuits: the leaf lands in the inode itself.
    let (parent, leaf_idx) = match path {
        BlockPath::Direct(idx) => {
            let block = allocator::allocate_block_strict(io, meta, group)?;
            io.write_u32_at(root_slot(idx), block)?;
            io.flush()?;
            return Ok(block);
        }
        BlockPath::Single { single } => {
            let mut ind = i_block[EXT2_IND_BLOCK as usize];
            if ind == EXT2_NULL_BLOCK {
                ind = alloc_indirect(io, meta, group)?;
                io.write_u32_at(root_slot(EXT2_IND_BLOCK), ind)?;
            }
            (ind, single)
        }
        BlockPath::Double { double, single } => {
            let mut dind = i_block[EXT2_DIND_BLOCK as usize];
            if dind == EXT2_NULL_BLOCK {
                dind = alloc_indirect(io, meta, group)?;
                io.write_u32_at(root_slot(EXT2_DIND_BLOCK), dind)?;
            }
            let ind = ensure_child(io, meta, group, dind, double)?;
            (ind, single)
        }
        BlockPath::Triple {
            triple,
            double,
            single,
        } => {
            let mut tind = i_block[EXT2_TIND_BLOCK as usize];
            if tind == EXT2_NULL_BLOCK {
                tind = alloc_indirect(io, meta, group)?;
                io.write_u32_at(root_slot(EXT2_TIND_BLOCK), tind)?;
            }
            let dind = ensure_child(io, meta, group, tind, triple)?;
            let ind = ensure_child(io, meta, group, dind, double)?;
            (ind, single)
        }
    };

    let block = allocator::allocate_block_strict(io, meta, group)?;
    io.write_u32_at(meta.block_offset(parent) + 4 * leaf_idx as u64, block)?;
    io.flush()?;

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: u32 = 256; // pointers per 1 KiB block

    #[test]
    fn test_classify_direct() {
        assert_eq!(BlockPath::classify(0, N).unwrap(), BlockPath::Direct(0));
        assert_eq!(BlockPath::classify(11, N).unwrap(), BlockPath::Direct(11));
    }

    #[test]
    fn test_classify_single() {
        assert_eq!(
            BlockPath::classify(12, N).unwrap(),
            BlockPath::Single { single: 0 }
        );
        assert_eq!(
            BlockPath::classify(12 + N - 1, N).unwrap(),
            BlockPath::Single { single: N - 1 }
        );
    }

    #[test]
    fn test_classify_double() {
        // First double-indirect index sits at double[0][0].
        assert_eq!(
            BlockPath::classify(12 + N, N).unwrap(),
            BlockPath::Double {
                double: 0,
                single: 0
            }
        );
        // One full indirect block later: double[1][0].
        assert_eq!(
            BlockPath::classify(12 + N + N, N).unwrap(),
            BlockPath::Double {
                double: 1,
                single: 0
            }
        );
        assert_eq!(
            BlockPath::classify(12 + N + 2 * N + 5, N).unwrap(),
            BlockPath::Double {
                double: 2,
                single: 5
            }
        );
        assert_eq!(
            BlockPath::classify(12 + N + N * N - 1, N).unwrap(),
            BlockPath::Double {
                double: N - 1,
                single: N - 1
            }
        );
    }

    #[test]
    fn test_classify_triple() {
        let base = 12 + N + N * N;
        assert_eq!(
            BlockPath::classify(base, N).unwrap(),
            BlockPath::Triple {
                triple: 0,
                double: 0,
                single: 0
            }
        );
        assert_eq!(
            BlockPath::classify(base + N * N + N + 1, N).unwrap(),
            BlockPath::Triple {
                triple: 1,
                double: 1,
                single: 1
            }
        );
    }

    #[test]
    fn test_classify_out_of_range() {
        let past_end = 12u64 + N as u64 + (N as u64).pow(2) + (N as u64).pow(3);
        assert!(u32::try_from(past_end)
            .map(|l| BlockPath::classify(l, N).is_err())
            .unwrap_or(true));

        // Small pointer count keeps the arithmetic testable without overflow.
        let tiny = 4u32;
        assert!(BlockPath::classify(12 + 4 + 16 + 64, tiny).is_err());
        assert!(BlockPath::classify(12 + 4 + 16 + 63, tiny).is_ok());
    }
}
