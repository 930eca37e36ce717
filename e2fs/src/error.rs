// SPDX-License-Identifier: MIT

use core::fmt;

pub use e2io::error::{BlockIOError, BlockIOResult};

/// Error type for every ext2 engine operation.
///
/// Errors from the I/O layer bubble up verbatim; there is no in-engine
/// recovery or retry.
#[derive(Debug, Clone)]
pub enum Ext2Error {
    /// Backing-device read/write/flush failure.
    Io(BlockIOError),
    /// The superblock magic is not 0xEF53.
    NotExt2,
    /// Revision 0 filesystems are not supported.
    UnsupportedRevision,
    /// Inode, block or group index outside the declared geometry.
    OutOfRange(&'static str),
    /// Directory operation attempted on a non-directory inode.
    NotADirectory,
    /// The block map resolved to the null block at some level.
    HoleOrOutOfRange,
    /// The global free counter for the requested resource is zero.
    OutOfSpace,
    /// Structurally impossible on-disk state.
    Corrupt(&'static str),
}

impl Ext2Error {
    pub fn msg(&self) -> &'static str {
        match self {
            Ext2Error::Io(e) => e.msg(),
            Ext2Error::NotExt2 => "Not an ext2 filesystem",
            Ext2Error::UnsupportedRevision => "Ext2 filesystem must be revision 1 or higher",
            Ext2Error::OutOfRange(msg) => msg,
            Ext2Error::NotADirectory => "Inode is not a directory",
            Ext2Error::HoleOrOutOfRange => "Block offset unmapped or out of bounds",
            Ext2Error::OutOfSpace => "Disk limit reached",
            Ext2Error::Corrupt(msg) => msg,
        }
    }
}

impl fmt::Display for Ext2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ext2Error::Io(e) => write!(f, "I/O error\n  caused by: {}", e.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for Ext2Error {}

impl From<BlockIOError> for Ext2Error {
    fn from(e: BlockIOError) -> Self {
        Ext2Error::Io(e)
    }
}

pub type Ext2Result<T = ()> = Result<T, Ext2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_chain_display() {
        let err = Ext2Error::from(BlockIOError::OutOfBounds);
        let text = err.to_string();
        assert!(text.contains("caused by"));
        assert!(text.contains("Out of bounds"));
    }
}
