// SPDX-License-Identifier: MIT

//! Consistency validation: bitmap popcounts against the free counters, and
//! the record-length partition of every directory block.

use std::collections::HashSet;

use e2io::prelude::*;

use crate::bitmap::BitmapOps;
use crate::constant::*;
use crate::ensure;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::{allocator, data, parser};

/// What a full check covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckReport {
    pub groups: u32,
    pub directories: u32,
}

/// Verifies that every group's bitmap popcounts match its descriptor's free
/// counters, and that the descriptor sums match the superblock's.
pub fn check_counters<IO: BlockIO + ?Sized>(io: &mut IO, meta: &Ext2Meta) -> Ext2Result {
    let sb = parser::read_superblock(io)?;
    let mut free_blocks_sum = 0u32;
    let mut free_inodes_sum = 0u32;

    for group in 0..meta.block_groups_count {
        let desc = parser::read_group_descriptor(io, meta, group)?;
        let free_blocks = desc.bg_free_blocks_count as u32;
        let free_inodes = desc.bg_free_inodes_count as u32;

        let block_bits = allocator::load_block_bitmap(io, meta, group)?;
        ensure!(
            block_bits.count_used() == meta.blocks_per_group - free_blocks,
            Ext2Error::Corrupt("Block bitmap population does not match the group's free count")
        );

        let inode_bits = allocator::load_inode_bitmap(io, meta, group)?;
        ensure!(
            inode_bits.count_used() == meta.inodes_per_group - free_inodes,
            Ext2Error::Corrupt("Inode bitmap population does not match the group's free count")
        );

        free_blocks_sum += free_blocks;
        free_inodes_sum += free_inodes;
    }

    ensure!(
        free_blocks_sum == sb.s_free_blocks_count,
        Ext2Error::Corrupt("Group free-block counts do not sum to the superblock's")
    );
    ensure!(
        free_inodes_sum == sb.s_free_inodes_count,
        Ext2Error::Corrupt("Group free-inode counts do not sum to the superblock's")
    );

    Ok(())
}

/// Verifies that the records of each of `ino`'s data blocks partition the
/// block exactly, with no record crossing the boundary.
pub fn check_directory_blocks<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
) -> Ext2Result {
    let inode = parser::read_inode(io, meta, ino)?;
    ensure!(inode.is_dir(), Ext2Error::NotADirectory);

    let bs = meta.block_size;
    let blocks = inode.i_size / bs;
    let mut block = vec![0u8; bs as usize];

    for i in 0..blocks {
        data::read_data(io, meta, &inode, &mut block, (i * bs) as u64)?;

        let mut pos = 0u32;
        while pos < bs {
            ensure!(
                bs - pos >= EXT2_DIRENT_HEADER_SIZE as u32,
                Ext2Error::Corrupt("Directory record tail shorter than a record header")
            );
            let rec_len =
                u16::from_le_bytes(block[pos as usize + 4..pos as usize + 6].try_into().unwrap())
                    as u32;
            let name_len = block[pos as usize + 6] as u32;

            ensure!(
                rec_len != 0 && pos + rec_len <= bs,
                Ext2Error::Corrupt("Directory record crosses its block boundary")
            );
            ensure!(
                EXT2_DIRENT_HEADER_SIZE as u32 + name_len <= rec_len,
                Ext2Error::Corrupt("Directory record name overruns its record")
            );

            pos += rec_len;
        }
        ensure!(
            pos == bs,
            Ext2Error::Corrupt("Directory records do not partition the block")
        );
    }

    Ok(())
}

/// Runs the counter checks, then walks every directory reachable from the
/// root and validates its record structure.
pub fn check_image<IO: BlockIO + ?Sized>(io: &mut IO, meta: &Ext2Meta) -> Ext2Result<CheckReport> {
    check_counters(io, meta)?;

    let mut report = CheckReport {
        groups: meta.block_groups_count,
        directories: 0,
    };

    let mut visited = HashSet::new();
    let mut pending = vec![EXT2_ROOT_INO];

    while let Some(ino) = pending.pop() {
        if !visited.insert(ino) {
            continue;
        }

        check_directory_blocks(io, meta, ino)?;
        report.directories += 1;

        for entry in parser::read_dir_entries(io, meta, ino)? {
            if entry.file_type == EXT2_FT_DIR
                && entry.name != b"."
                && entry.name != b".."
            {
                pending.push(entry.inode);
            }
        }
    }

    Ok(report)
}
