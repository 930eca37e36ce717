// SPDX-License-Identifier: MIT

//! Minimal revision-1 mkfs.
//!
//! Lays out a fresh filesystem: superblock, one-block GDT, per-group block
//! and inode bitmaps and inode tables, the reserved inodes 1-10, the root
//! directory (inode 2) and `lost+found` (inode 11). Only primary metadata
//! is written; no superblock or GDT backups.

use e2io::prelude::*;

use crate::bitmap::BitmapOps;
use crate::constant::*;
use crate::ensure;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::types::{Ext2DirEntry, Ext2GroupDesc, Ext2Inode, Ext2Superblock};

/// Geometry of the filesystem to create.
///
/// The backing store must cover `groups * blocks_per_group` blocks.
#[derive(Debug, Clone)]
pub struct Ext2FormatParams {
    /// Power of two, 1024..=4096
    pub block_size: u32,
    /// Multiple of 8; the bitmap must fit one block
    pub blocks_per_group: u32,
    /// Multiple of 8; the inode table must fill whole blocks
    pub inodes_per_group: u32,
    pub groups: u32,
    pub volume_label: Option<String>,
    /// Random when absent
    pub volume_id: Option<[u8; 16]>,
}

impl Default for Ext2FormatParams {
    fn default() -> Self {
        Self {
            block_size: 1024,
            blocks_per_group: 8192,
            inodes_per_group: 2048,
            groups: 1,
            volume_label: None,
            volume_id: None,
        }
    }
}

impl Ext2FormatParams {
    fn validate(&self) -> Ext2Result {
        let bs = self.block_size;
        // Above 4 KiB a block-filling record length would no longer fit in
        // a directory entry's 16-bit rec_len.
        ensure!(
            bs.is_power_of_two() && (EXT2_MIN_BLOCK_SIZE..=4096).contains(&bs),
            Ext2Error::Corrupt("Unsupported block size")
        );
        ensure!(
            self.blocks_per_group > 0
                && self.blocks_per_group % 8 == 0
                && self.blocks_per_group <= bs * 8,
            Ext2Error::Corrupt("Blocks per group must fill at most one bitmap block")
        );
        ensure!(
            self.inodes_per_group > 0
                && self.inodes_per_group % 8 == 0
                && (self.inodes_per_group * EXT2_GOOD_OLD_INODE_SIZE as u32) % bs == 0,
            Ext2Error::Corrupt("Inode table must fill whole blocks")
        );
        ensure!(
            self.inodes_per_group > EXT2_FIRST_INO,
            Ext2Error::Corrupt("Too few inodes for the reserved range")
        );
        ensure!(
            self.groups >= 1 && self.groups * EXT2_GROUP_DESC_SIZE as u32 <= bs,
            Ext2Error::Corrupt("Group descriptor table must fit one block")
        );

        let itb = self.inode_table_blocks();
        ensure!(
            6 + itb < self.blocks_per_group,
            Ext2Error::Corrupt("Group too small for its own metadata")
        );
        Ok(())
    }

    fn inode_table_blocks(&self) -> u32 {
        self.inodes_per_group * EXT2_GOOD_OLD_INODE_SIZE as u32 / self.block_size
    }
}

pub struct Ext2Formatter<'a, IO: BlockIO + ?Sized> {
    io: &'a mut IO,
    params: Ext2FormatParams,
}

impl<'a, IO: BlockIO + ?Sized> Ext2Formatter<'a, IO> {
    pub fn new(io: &'a mut IO, params: Ext2FormatParams) -> Self {
        Self { io, params }
    }

    /// Writes the filesystem and returns its geometry.
    pub fn format(&mut self) -> Ext2Result<Ext2Meta> {
        self.params.validate()?;

        let p = &self.params;
        let bs = p.block_size;
        let bpg = p.blocks_per_group;
        let ipg = p.inodes_per_group;
        let groups = p.groups;
        let itb = p.inode_table_blocks();

        let fdb = if bs == EXT2_MIN_BLOCK_SIZE { 1 } else { 0 };
        let blocks_count = groups * bpg;
        let gdt_block = fdb + 1;
        let root_block = fdb + 4 + itb;
        let lf_block = root_block + 1;

        // Block numbering follows the allocator: bit i of group g is block
        // g*bpg + i + 1, so block 0 (boot record / wide-block superblock)
        // lives outside every bitmap.
        let group_first = |g: u32| g * bpg + 1;
        let metadata_of = |g: u32| -> (u32, u32, u32) {
            if g == 0 {
                (fdb + 2, fdb + 3, fdb + 4)
            } else {
                (group_first(g), group_first(g) + 1, group_first(g) + 2)
            }
        };

        let now = time::OffsetDateTime::now_utc().unix_timestamp() as u32;
        let mut free_blocks_total = 0u32;
        let mut free_inodes_total = 0u32;
        let mut descs = Vec::with_capacity(groups as usize);

        for g in 0..groups {
            let (bbm, ibm, itable) = metadata_of(g);

            // Block bitmap: metadata blocks of this group, the root and
            // lost+found blocks in group 0, and every trailing bit whose
            // block number falls outside the filesystem.
            let mut block_bits = vec![0u8; bs as usize];
            let used_range = if g == 0 {
                1..=lf_block
            } else {
                group_first(g)..=itable + itb - 1
            };
            for block in used_range {
                block_bits.alloc(block - 1 - g * bpg);
            }
            for i in 0..bpg {
                if g * bpg + i + 1 >= blocks_count {
                    block_bits.alloc(i);
                }
            }
            let used = block_bits[..(bpg / 8) as usize].count_used();
            let free_blocks = bpg - used;

            // Inode bitmap: the reserved inodes 1-10 and lost+found (11)
            // occupy group 0.
            let mut inode_bits = vec![0u8; bs as usize];
            if g == 0 {
                for i in 0..EXT2_FIRST_INO {
                    inode_bits.alloc(i);
                }
            }
            let free_inodes = ipg - inode_bits[..(ipg / 8) as usize].count_used();

            self.io.write_at(self.meta_offset(bbm), &block_bits)?;
            self.io.write_at(self.meta_offset(ibm), &inode_bits)?;
            self.io
                .zero_fill(self.meta_offset(itable), (itb * bs) as usize)?;

            free_blocks_total += free_blocks;
            free_inodes_total += free_inodes;
            descs.push(Ext2GroupDesc::new(
                bbm,
                ibm,
                itable,
                free_blocks as u16,
                free_inodes as u16,
                if g == 0 { 2 } else { 0 },
            ));
        }

        // Group descriptor table
        self.io.zero_fill(self.meta_offset(gdt_block), bs as usize)?;
        for (g, desc) in descs.iter().enumerate() {
            self.io.write_struct(
                self.meta_offset(gdt_block) + (g * EXT2_GROUP_DESC_SIZE) as u64,
                desc,
            )?;
        }

        // Root directory (inode 2) and lost+found (inode 11)
        let (_, _, itable0) = metadata_of(0);
        let mut root = Ext2Inode::new_dir(0, 0, bs, root_block);
        root.i_links_count = 3; // ".", and lost+found's ".."
        let mut lf = Ext2Inode::new_dir(0, 0, bs, lf_block);
        lf.i_links_count = 2;

        let itable0_off = self.meta_offset(itable0);
        let record_size = EXT2_GOOD_OLD_INODE_SIZE as u64;
        self.io
            .write_struct(itable0_off + (EXT2_ROOT_INO - 1) as u64 * record_size, &root)?;
        self.io
            .write_struct(itable0_off + (EXT2_FIRST_INO - 1) as u64 * record_size, &lf)?;

        self.write_dir_block(
            root_block,
            &[
                Ext2DirEntry::dot(EXT2_ROOT_INO),
                Ext2DirEntry::dotdot(EXT2_ROOT_INO),
                Ext2DirEntry::new(EXT2_FIRST_INO, b"lost+found", EXT2_FT_DIR),
            ],
        )?;
        self.write_dir_block(
            lf_block,
            &[
                Ext2DirEntry::dot(EXT2_FIRST_INO),
                Ext2DirEntry::dotdot(EXT2_ROOT_INO),
            ],
        )?;

        // Superblock last: a torn format leaves no valid magic behind.
        let sb = self.build_superblock(blocks_count, free_blocks_total, free_inodes_total, now);
        self.io.write_struct(EXT2_SUPERBLOCK_OFFSET, &sb)?;
        self.io.flush()?;

        Ok(Ext2Meta::from_superblock(&sb))
    }

    #[inline]
    fn meta_offset(&self, block: u32) -> u64 {
        block as u64 * self.params.block_size as u64
    }

    /// Encodes `entries` into one directory block, the final record
    /// claiming the remainder.
    fn write_dir_block(&mut self, block: u32, entries: &[Ext2DirEntry]) -> Ext2Result {
        let bs = self.params.block_size;
        let mut buf = Vec::with_capacity(bs as usize);

        for (i, entry) in entries.iter().enumerate() {
            let mut record = entry.clone();
            if i == entries.len() - 1 {
                record.set_rec_len((bs - buf.len() as u32) as u16);
            }
            buf.extend_from_slice(&record.to_bytes());
        }
        debug_assert_eq!(buf.len(), bs as usize);

        self.io.write_at(self.meta_offset(block), &buf)?;
        Ok(())
    }

    fn build_superblock(
        &self,
        blocks_count: u32,
        free_blocks: u32,
        free_inodes: u32,
        now: u32,
    ) -> Ext2Superblock {
        let p = &self.params;

        let mut volume_name = [0u8; 16];
        if let Some(label) = &p.volume_label {
            let bytes = label.as_bytes();
            let len = bytes.len().min(16);
            volume_name[..len].copy_from_slice(&bytes[..len]);
        }

        Ext2Superblock {
            s_inodes_count: p.groups * p.inodes_per_group,
            s_blocks_count: blocks_count,
            s_free_blocks_count: free_blocks,
            s_free_inodes_count: free_inodes,
            s_first_data_block: if p.block_size == EXT2_MIN_BLOCK_SIZE { 1 } else { 0 },
            s_log_block_size: p.block_size.trailing_zeros() - 10,
            s_log_frag_size: (p.block_size.trailing_zeros() - 10) as i32,
            s_blocks_per_group: p.blocks_per_group,
            s_frags_per_group: p.blocks_per_group,
            s_inodes_per_group: p.inodes_per_group,
            s_wtime: now,
            s_lastcheck: now,
            s_uuid: p
                .volume_id
                .unwrap_or_else(|| *uuid::Uuid::new_v4().as_bytes()),
            s_volume_name: volume_name,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        let ok = Ext2FormatParams {
            blocks_per_group: 256,
            inodes_per_group: 32,
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_bs = Ext2FormatParams {
            block_size: 1500,
            ..Default::default()
        };
        assert!(bad_bs.validate().is_err());

        let bitmap_overflow = Ext2FormatParams {
            blocks_per_group: 1024 * 8 + 8,
            ..Default::default()
        };
        assert!(bitmap_overflow.validate().is_err());

        let ragged_table = Ext2FormatParams {
            inodes_per_group: 36,
            ..Default::default()
        };
        assert!(ragged_table.validate().is_err());

        let too_many_groups = Ext2FormatParams {
            groups: 33,
            ..Default::default()
        };
        assert!(too_many_groups.validate().is_err());
    }

    #[test]
    fn test_inode_table_blocks() {
        let p = Ext2FormatParams {
            inodes_per_group: 32,
            ..Default::default()
        };
        assert_eq!(p.inode_table_blocks(), 4);
    }
}
