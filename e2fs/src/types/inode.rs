// SPDX-License-Identifier: MIT
//! EXT2 inode structure

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::*;

/// EXT2 inode (128-byte revision-1 core record).
///
/// Revision 1 allows a larger on-disk stride (`s_inode_size`); the extra
/// bytes carry no fields this engine interprets.
#[derive(Debug, Clone, Copy, Default, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct Ext2Inode {
    /// File mode (type + permissions)
    pub i_mode: u16,
    /// Owner UID (lower 16 bits)
    pub i_uid: u16,
    /// File size in bytes
    pub i_size: u32,
    /// Last access time
    pub i_atime: u32,
    /// Inode change time
    pub i_ctime: u32,
    /// Last modification time
    pub i_mtime: u32,
    /// Deletion time (0 if live)
    pub i_dtime: u32,
    /// Group GID (lower 16 bits)
    pub i_gid: u16,
    /// Hard link count
    pub i_links_count: u16,
    /// Allocated size in 512-byte sectors
    pub i_blocks: u32,
    /// Inode flags
    pub i_flags: u32,
    /// OS-dependent value 1
    pub i_osd1: [u8; 4],
    /// Block map: direct 0..11, single indirect 12, double 13, triple 14
    pub i_block: [u32; EXT2_N_BLOCKS],
    /// File version (for NFS)
    pub i_generation: u32,
    /// File ACL block
    pub i_file_acl: u32,
    /// Directory ACL block
    pub i_dir_acl: u32,
    /// Obsolete fragment address
    pub i_faddr: u32,
    /// OS-dependent tail
    pub i_osd2: [u8; 12],
}

/// Linux flavour of the OS-dependent inode tail.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
pub struct InodeOsd2Linux {
    pub l_i_frag: u8,
    pub l_i_fsize: u8,
    pub l_i_pad1: u16,
    /// Owner UID (upper 16 bits)
    pub l_i_uid_high: u16,
    /// Group GID (upper 16 bits)
    pub l_i_gid_high: u16,
    pub l_i_reserved2: u32,
}

impl Ext2Inode {
    /// Builds an in-memory directory inode covering one data block.
    ///
    /// The caller allocates the block, places it in `i_block[0]` and writes
    /// the record to the inode table.
    pub fn new_dir(uid: u16, gid: u16, block_size: u32, first_block: u32) -> Self {
        let now = unix_now();
        Self {
            i_mode: S_IFDIR | 0o755,
            i_uid: uid,
            i_gid: gid,
            i_size: block_size,
            i_atime: now,
            i_ctime: now,
            i_mtime: now,
            i_links_count: 1,
            i_blocks: block_size / 512,
            i_block: with_first_block(first_block),
            ..Default::default()
        }
    }

    /// Builds an in-memory empty regular-file inode.
    ///
    /// One data block is already placed in `i_block[0]` but the size and the
    /// sector count stay zero until data is written.
    pub fn new_file(uid: u16, gid: u16, first_block: u32) -> Self {
        let now = unix_now();
        Self {
            i_mode: S_IFREG | 0o644,
            i_uid: uid,
            i_gid: gid,
            i_size: 0,
            i_atime: now,
            i_ctime: now,
            i_mtime: now,
            i_links_count: 1,
            i_blocks: 0,
            i_block: with_first_block(first_block),
            ..Default::default()
        }
    }

    /// Typed view of `i_osd2` as the Linux tail.
    pub fn osd2_linux(&self) -> InodeOsd2Linux {
        let raw = self.i_osd2;
        InodeOsd2Linux::read_from_bytes(&raw).expect("osd2 is exactly 12 bytes")
    }

    fn file_type(&self) -> u16 {
        self.i_mode & S_IFMT
    }

    pub fn is_reg(&self) -> bool {
        self.file_type() == S_IFREG
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    pub fn is_chr(&self) -> bool {
        self.file_type() == S_IFCHR
    }

    pub fn is_blk(&self) -> bool {
        self.file_type() == S_IFBLK
    }

    pub fn is_fifo(&self) -> bool {
        self.file_type() == S_IFIFO
    }

    pub fn is_lnk(&self) -> bool {
        self.file_type() == S_IFLNK
    }

    pub fn is_sock(&self) -> bool {
        self.file_type() == S_IFSOCK
    }
}

fn with_first_block(block: u32) -> [u32; EXT2_N_BLOCKS] {
    let mut map = [EXT2_NULL_BLOCK; EXT2_N_BLOCKS];
    map[0] = block;
    map
}

fn unix_now() -> u32 {
    time::OffsetDateTime::now_utc().unix_timestamp() as u32
}

// Ensure the core record is exactly 128 bytes
const _: () = assert!(core::mem::size_of::<Ext2Inode>() == EXT2_GOOD_OLD_INODE_SIZE as usize);
const _: () = assert!(core::mem::size_of::<InodeOsd2Linux>() == 12);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_predicates_are_exclusive() {
        let mut inode = Ext2Inode {
            i_mode: S_IFLNK | 0o777,
            ..Default::default()
        };

        // Symlink (0120000) overlaps directory (0040000) bit-wise; the
        // format-mask test must not confuse them.
        assert!(inode.is_lnk());
        assert!(!inode.is_dir());
        assert!(!inode.is_reg());

        inode.i_mode = S_IFDIR | 0o755;
        assert!(inode.is_dir());
        assert!(!inode.is_lnk());

        inode.i_mode = S_IFREG | 0o644;
        assert!(inode.is_reg());
        assert!(!inode.is_chr());
        assert!(!inode.is_sock());
    }

    #[test]
    fn test_field_offsets() {
        let inode = Ext2Inode {
            i_size: 0xAABBCCDD,
            i_blocks: 0x11223344,
            i_block: with_first_block(0x99887766),
            ..Default::default()
        };
        let bytes = zerocopy::IntoBytes::as_bytes(&inode);

        let off = I_SIZE as usize;
        assert_eq!(&bytes[off..off + 4], &0xAABBCCDDu32.to_le_bytes());
        let off = I_BLOCKS as usize;
        assert_eq!(&bytes[off..off + 4], &0x11223344u32.to_le_bytes());
        let off = I_BLOCK as usize;
        assert_eq!(&bytes[off..off + 4], &0x99887766u32.to_le_bytes());
    }

    #[test]
    fn test_new_dir_builder() {
        let inode = Ext2Inode::new_dir(1000, 1000, 1024, 42);
        assert!(inode.is_dir());
        assert_eq!({ inode.i_size }, 1024);
        assert_eq!({ inode.i_links_count }, 1);
        assert_eq!({ inode.i_blocks }, 2);
        assert_eq!({ inode.i_block }[0], 42);
        assert_eq!({ inode.i_block }[1], EXT2_NULL_BLOCK);
    }

    #[test]
    fn test_new_file_builder() {
        let inode = Ext2Inode::new_file(0, 0, 7);
        assert!(inode.is_reg());
        assert_eq!({ inode.i_size }, 0);
        assert_eq!({ inode.i_links_count }, 1);
        assert_eq!({ inode.i_blocks }, 0);
        assert_eq!({ inode.i_block }[0], 7);
    }

    #[test]
    fn test_osd2_linux_view() {
        let mut inode = Ext2Inode::default();
        inode.i_osd2[4] = 0x34;
        inode.i_osd2[5] = 0x12;
        inode.i_osd2[6] = 0x78;
        inode.i_osd2[7] = 0x56;

        let tail = inode.osd2_linux();
        assert_eq!({ tail.l_i_uid_high }, 0x1234);
        assert_eq!({ tail.l_i_gid_high }, 0x5678);
    }
}
