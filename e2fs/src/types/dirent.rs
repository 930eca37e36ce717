// SPDX-License-Identifier: MIT
//! EXT2 directory entry structure

use crate::constant::*;

/// File-type code carried in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ext2FileType {
    Unknown,
    Regular,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Symlink,
}

impl Ext2FileType {
    pub fn from_code(code: u8) -> Self {
        match code {
            EXT2_FT_REG_FILE => Ext2FileType::Regular,
            EXT2_FT_DIR => Ext2FileType::Directory,
            3 => Ext2FileType::CharDevice,
            4 => Ext2FileType::BlockDevice,
            5 => Ext2FileType::Fifo,
            6 => Ext2FileType::Socket,
            7 => Ext2FileType::Symlink,
            _ => Ext2FileType::Unknown,
        }
    }
}

/// EXT2 directory entry.
///
/// Variable length on disk: an 8-byte header followed by the name, padded so
/// `rec_len` is a multiple of 4. The records of one directory block partition
/// it exactly; the final record's `rec_len` extends to the block end.
#[derive(Debug, Clone)]
pub struct Ext2DirEntry {
    /// Inode number (0 marks a tombstone)
    pub inode: u32,
    /// Total record size including padding
    pub rec_len: u16,
    /// Name length in bytes
    pub name_len: u8,
    /// File-type code (EXT2_FT_*)
    pub file_type: u8,
    /// Entry name, `name_len` bytes, no terminator
    pub name: Vec<u8>,
}

impl Ext2DirEntry {
    /// Creates an entry with the minimum 4-byte-aligned record length.
    pub fn new(inode: u32, name: &[u8], file_type: u8) -> Self {
        debug_assert!(name.len() <= EXT2_NAME_LEN);
        let name_len = name.len() as u8;

        Self {
            inode,
            rec_len: min_rec_len(name_len),
            name_len,
            file_type,
            name: name.to_vec(),
        }
    }

    /// Creates the `.` entry of a directory.
    pub fn dot(current_inode: u32) -> Self {
        Self::new(current_inode, b".", EXT2_FT_DIR)
    }

    /// Creates the `..` entry of a directory.
    pub fn dotdot(parent_inode: u32) -> Self {
        Self::new(parent_inode, b"..", EXT2_FT_DIR)
    }

    /// Record length claimed on disk (set by the caller to fill slack).
    pub fn set_rec_len(&mut self, len: u16) {
        self.rec_len = len;
    }

    /// Minimum record length for this entry's name.
    pub fn min_rec_len(&self) -> u16 {
        min_rec_len(self.name_len)
    }

    pub fn kind(&self) -> Ext2FileType {
        Ext2FileType::from_code(self.file_type)
    }

    /// Name as UTF-8, if it is valid UTF-8.
    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.name).ok()
    }

    pub fn is_tombstone(&self) -> bool {
        self.inode == EXT2_NULL_INO
    }

    /// Encodes to `rec_len` bytes for writing to disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.rec_len as usize);

        buf.extend_from_slice(&self.inode.to_le_bytes());
        buf.extend_from_slice(&self.rec_len.to_le_bytes());
        buf.push(self.name_len);
        buf.push(self.file_type);
        buf.extend_from_slice(&self.name);
        buf.resize(self.rec_len as usize, 0);

        buf
    }
}

/// 8-byte header plus name, rounded up to a 4-byte boundary.
pub fn min_rec_len(name_len: u8) -> u16 {
    ((EXT2_DIRENT_HEADER_SIZE + name_len as usize + 3) & !3) as u16
}
