// SPDX-License-Identifier: MIT
// e2fs/src/constant.rs

// === Superblock ===

// Magic number (in s_magic)
pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;

// Superblock size and fixed location in the image
pub const EXT2_SUPERBLOCK_SIZE: usize = 1024;
pub const EXT2_SUPERBLOCK_OFFSET: u64 = 1024;

// Revision levels
pub const EXT2_GOOD_OLD_REV: u32 = 0;
pub const EXT2_DYNAMIC_REV: u32 = 1;

// Byte offsets of the free counters inside the superblock
pub const S_FREE_BLOCKS_COUNT: u64 = 12;
pub const S_FREE_INODES_COUNT: u64 = S_FREE_BLOCKS_COUNT + 4;

// === Block size ===

pub const EXT2_MIN_BLOCK_SIZE: u32 = 1024;

// === Group descriptors ===

pub const EXT2_GROUP_DESC_SIZE: usize = 32;

// Byte offsets of the counters inside one descriptor
pub const BG_FREE_BLOCKS_COUNT: u64 = 12;
pub const BG_FREE_INODES_COUNT: u64 = BG_FREE_BLOCKS_COUNT + 2;
pub const BG_USED_DIRS_COUNT: u64 = BG_FREE_INODES_COUNT + 2;

// === Inodes ===

pub const EXT2_ROOT_INO: u32 = 2;
pub const EXT2_FIRST_INO: u32 = 11;
pub const EXT2_NULL_INO: u32 = 0;
pub const EXT2_GOOD_OLD_INODE_SIZE: u16 = 128;

// Byte offsets of partially-written inode fields
pub const I_SIZE: u64 = 4;
pub const I_BLOCKS: u64 = 28;
pub const I_BLOCK: u64 = 40;

// Block pointer slots in the inode
pub const EXT2_NDIR_BLOCKS: u32 = 12;
pub const EXT2_IND_BLOCK: u32 = EXT2_NDIR_BLOCKS;
pub const EXT2_DIND_BLOCK: u32 = EXT2_IND_BLOCK + 1;
pub const EXT2_TIND_BLOCK: u32 = EXT2_DIND_BLOCK + 1;
pub const EXT2_N_BLOCKS: usize = (EXT2_TIND_BLOCK + 1) as usize;

pub const EXT2_NULL_BLOCK: u32 = 0;

// === Inode mode bits ===

pub const S_IFMT: u16 = 0o170000;
pub const S_IFSOCK: u16 = 0o140000;
pub const S_IFLNK: u16 = 0o120000;
pub const S_IFREG: u16 = 0o100000;
pub const S_IFBLK: u16 = 0o060000;
pub const S_IFDIR: u16 = 0o040000;
pub const S_IFCHR: u16 = 0o020000;
pub const S_IFIFO: u16 = 0o010000;

// === Directory entries ===

pub const EXT2_NAME_LEN: usize = 255;

// Fixed header before the name: inode(4) + rec_len(2) + name_len(1) + file_type(1)
pub const EXT2_DIRENT_HEADER_SIZE: usize = 8;

// File-type codes stored in directory entries
pub const EXT2_FT_UNKNOWN: u8 = 0;
pub const EXT2_FT_REG_FILE: u8 = 1;
pub const EXT2_FT_DIR: u8 = 2;
