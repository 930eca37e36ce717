// SPDX-License-Identifier: MIT
//! EXT2 superblock structure

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::*;
use crate::error::{Ext2Error, Ext2Result};

/// EXT2 superblock (1024 bytes, at byte offset 1024 of the image).
///
/// On-disk revision-1 layout. Little-endian throughout.
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct Ext2Superblock {
    // 0x00
    /// Total inode count
    pub s_inodes_count: u32,
    /// Total block count
    pub s_blocks_count: u32,
    /// Reserved block count
    pub s_r_blocks_count: u32,
    /// Free block count
    pub s_free_blocks_count: u32,
    // 0x10
    /// Free inode count
    pub s_free_inodes_count: u32,
    /// First data block (1 for 1 KiB blocks, 0 otherwise)
    pub s_first_data_block: u32,
    /// Block size = 1024 << s_log_block_size
    pub s_log_block_size: u32,
    /// Fragment size (signed log)
    pub s_log_frag_size: i32,
    // 0x20
    /// Blocks per group
    pub s_blocks_per_group: u32,
    /// Fragments per group
    pub s_frags_per_group: u32,
    /// Inodes per group
    pub s_inodes_per_group: u32,
    /// Mount time
    pub s_mtime: u32,
    // 0x30
    /// Write time
    pub s_wtime: u32,
    /// Mount count
    pub s_mnt_count: u16,
    /// Max mount count
    pub s_max_mnt_count: i16,
    /// Magic signature (0xEF53)
    pub s_magic: u16,
    /// Filesystem state
    pub s_state: u16,
    /// Behaviour on errors
    pub s_errors: u16,
    /// Minor revision level
    pub s_minor_rev_level: u16,
    // 0x40
    /// Time of last check
    pub s_lastcheck: u32,
    /// Max time between checks
    pub s_checkinterval: u32,
    /// Creator OS
    pub s_creator_os: u32,
    /// Revision level
    pub s_rev_level: u32,
    // 0x50
    /// Default reserved UID
    pub s_def_resuid: u16,
    /// Default reserved GID
    pub s_def_resgid: u16,

    // Revision-1 (dynamic) fields
    /// First non-reserved inode
    pub s_first_ino: u32,
    /// Inode record size
    pub s_inode_size: u16,
    /// Block group number of this superblock copy
    pub s_block_group_nr: u16,
    /// Compatible feature set
    pub s_feature_compat: u32,
    // 0x60
    /// Incompatible feature set
    pub s_feature_incompat: u32,
    /// Read-only compatible feature set
    pub s_feature_ro_compat: u32,
    /// 128-bit volume UUID
    pub s_uuid: [u8; 16],
    // 0x78
    /// Volume label
    pub s_volume_name: [u8; 16],
    // 0x88
    /// Directory where last mounted
    pub s_last_mounted: [u8; 64],
    // 0xC8
    /// Compression algorithm usage bitmap
    pub s_algorithm_usage_bitmap: u32,
    // 0xCC
    /// Blocks to preallocate for files
    pub s_prealloc_blocks: u8,
    /// Blocks to preallocate for directories
    pub s_prealloc_dir_blocks: u8,
    pub s_padding_1: u16,
    // 0xD0
    /// Padding to 1024 bytes
    pub s_reserved: [u32; 204],
}

impl Default for Ext2Superblock {
    fn default() -> Self {
        Self {
            s_inodes_count: 0,
            s_blocks_count: 0,
            s_r_blocks_count: 0,
            s_free_blocks_count: 0,
            s_free_inodes_count: 0,
            s_first_data_block: 1,
            s_log_block_size: 0, // 1024 bytes
            s_log_frag_size: 0,
            s_blocks_per_group: 0,
            s_frags_per_group: 0,
            s_inodes_per_group: 0,
            s_mtime: 0,
            s_wtime: 0,
            s_mnt_count: 0,
            s_max_mnt_count: -1,
            s_magic: EXT2_SUPER_MAGIC,
            s_state: 1,  // Clean
            s_errors: 1, // Continue on errors
            s_minor_rev_level: 0,
            s_lastcheck: 0,
            s_checkinterval: 0,
            s_creator_os: 0, // Linux
            s_rev_level: EXT2_DYNAMIC_REV,
            s_def_resuid: 0,
            s_def_resgid: 0,
            s_first_ino: EXT2_FIRST_INO,
            s_inode_size: EXT2_GOOD_OLD_INODE_SIZE,
            s_block_group_nr: 0,
            s_feature_compat: 0,
            s_feature_incompat: 0,
            s_feature_ro_compat: 0,
            s_uuid: [0; 16],
            s_volume_name: [0; 16],
            s_last_mounted: [0; 64],
            s_algorithm_usage_bitmap: 0,
            s_prealloc_blocks: 0,
            s_prealloc_dir_blocks: 0,
            s_padding_1: 0,
            s_reserved: [0; 204],
        }
    }
}

impl Ext2Superblock {
    /// Block size in bytes
    pub fn block_size(&self) -> u32 {
        EXT2_MIN_BLOCK_SIZE << self.s_log_block_size
    }

    /// Number of block groups covered by this superblock's geometry
    pub fn block_groups_count(&self) -> u32 {
        1 + (self.s_blocks_count - 1) / self.s_blocks_per_group
    }

    /// Checks the magic and the revision level.
    pub fn validate(&self) -> Ext2Result {
        let magic = self.s_magic;
        if magic != EXT2_SUPER_MAGIC {
            return Err(Ext2Error::NotExt2);
        }
        if self.s_rev_level < EXT2_DYNAMIC_REV {
            return Err(Ext2Error::UnsupportedRevision);
        }
        Ok(())
    }
}

// Ensure the struct is exactly 1024 bytes
const _: () = assert!(core::mem::size_of::<Ext2Superblock>() == EXT2_SUPERBLOCK_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut sb = Ext2Superblock::default();
        assert!(sb.validate().is_ok());

        sb.s_rev_level = EXT2_GOOD_OLD_REV;
        assert!(matches!(
            sb.validate(),
            Err(Ext2Error::UnsupportedRevision)
        ));

        sb.s_magic = 0xEF54;
        assert!(matches!(sb.validate(), Err(Ext2Error::NotExt2)));
    }

    #[test]
    fn test_counter_field_offsets() {
        let mut sb = Ext2Superblock::default();
        sb.s_free_blocks_count = 0x11223344;
        sb.s_free_inodes_count = 0x55667788;

        let bytes = zerocopy::IntoBytes::as_bytes(&sb);
        let off = S_FREE_BLOCKS_COUNT as usize;
        assert_eq!(&bytes[off..off + 4], &0x11223344u32.to_le_bytes());
        let off = S_FREE_INODES_COUNT as usize;
        assert_eq!(&bytes[off..off + 4], &0x55667788u32.to_le_bytes());

        // Magic lives at byte 56
        assert_eq!(&bytes[56..58], &EXT2_SUPER_MAGIC.to_le_bytes());
    }

    #[test]
    fn test_block_groups_count() {
        let mut sb = Ext2Superblock::default();
        sb.s_blocks_per_group = 256;

        sb.s_blocks_count = 256;
        assert_eq!(sb.block_groups_count(), 1);
        sb.s_blocks_count = 512;
        assert_eq!(sb.block_groups_count(), 2);
        sb.s_blocks_count = 513;
        assert_eq!(sb.block_groups_count(), 3);
    }
}
