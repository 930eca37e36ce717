// SPDX-License-Identifier: MIT
pub mod dirent;
pub mod group_desc;
pub mod inode;
pub mod superblock;

pub use dirent::{Ext2DirEntry, Ext2FileType};
pub use group_desc::Ext2GroupDesc;
pub use inode::{Ext2Inode, InodeOsd2Linux};
pub use superblock::Ext2Superblock;
