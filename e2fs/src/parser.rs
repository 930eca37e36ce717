// SPDX-License-Identifier: MIT

//! Read side of the engine: validated superblock access, group descriptor
//! and inode record reads, directory parsing and path resolution.

use e2io::prelude::*;

use crate::constant::*;
use crate::data;
use crate::ensure;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::types::{Ext2DirEntry, Ext2GroupDesc, Ext2Inode, Ext2Superblock};

/// Reads the superblock at byte offset 1024 and validates it.
pub fn read_superblock<IO: BlockIO + ?Sized>(io: &mut IO) -> Ext2Result<Ext2Superblock> {
    let sb: Ext2Superblock = io.read_struct(EXT2_SUPERBLOCK_OFFSET)?;
    sb.validate()?;
    Ok(sb)
}

/// Reads group descriptor `index` out of the GDT.
pub fn read_group_descriptor<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    index: u32,
) -> Ext2Result<Ext2GroupDesc> {
    ensure!(
        index < meta.block_groups_count,
        Ext2Error::OutOfRange("Group descriptor index out of bounds")
    );
    Ok(io.read_struct(meta.group_desc_offset(index))?)
}

/// Reads inode record `ino` (1-based) out of its group's inode table.
pub fn read_inode<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
) -> Ext2Result<Ext2Inode> {
    ensure!(
        ino >= 1 && ino <= meta.inodes_count,
        Ext2Error::OutOfRange("Inode number out of bounds")
    );

    let desc = read_group_descriptor(io, meta, meta.inode_group(ino))?;
    let offset = meta.inode_offset(desc.bg_inode_table, meta.inode_index(ino));
    Ok(io.read_struct(offset)?)
}

/// Parses the records of one directory data block into `entries`.
///
/// A zero record length, a record overrunning the block or a name overrunning
/// the block all mark a corrupt tail; parsing of that block stops silently.
/// Tombstones (inode 0) are skipped.
fn parse_dir_block(block: &[u8], entries: &mut Vec<Ext2DirEntry>) {
    let mut pos = 0usize;

    while block.len() - pos > EXT2_DIRENT_HEADER_SIZE {
        let rest = block.len() - pos;
        let inode = u32::from_le_bytes(block[pos..pos + 4].try_into().unwrap());
        let rec_len = u16::from_le_bytes(block[pos + 4..pos + 6].try_into().unwrap());
        let name_len = block[pos + 6];
        let file_type = block[pos + 7];

        if rec_len == 0 || rec_len as usize > rest {
            break;
        }
        if name_len as usize + EXT2_DIRENT_HEADER_SIZE > rest {
            break;
        }

        if inode != EXT2_NULL_INO {
            let name_start = pos + EXT2_DIRENT_HEADER_SIZE;
            entries.push(Ext2DirEntry {
                inode,
                rec_len,
                name_len,
                file_type,
                name: block[name_start..name_start + name_len as usize].to_vec(),
            });
        }

        pos += rec_len as usize;
    }
}

/// Lists the live entries of directory inode `ino` in on-disk order.
pub fn read_dir_entries<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
) -> Ext2Result<Vec<Ext2DirEntry>> {
    let inode = read_inode(io, meta, ino)?;
    ensure!(inode.is_dir(), Ext2Error::NotADirectory);

    let bs = meta.block_size;
    let blocks = inode.i_size / bs;
    let mut entries = Vec::new();
    let mut block = vec![0u8; bs as usize];

    for i in 0..blocks {
        data::read_data(io, meta, &inode, &mut block, (bs * i) as u64)?;
        parse_dir_block(&block, &mut entries);
    }

    Ok(entries)
}

/// First entry whose name equals `name` byte-for-byte, or the null inode.
pub fn scan(entries: &[Ext2DirEntry], name: &[u8]) -> u32 {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.inode)
        .unwrap_or(EXT2_NULL_INO)
}

/// Resolves a slash-separated path from the root directory to an inode
/// number, or the null inode when any component is missing or a
/// non-final component is not a directory.
///
/// The empty path and `/` are the root inode.
pub fn resolve_path<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    path: &str,
) -> Ext2Result<u32> {
    if path.is_empty() {
        return Ok(EXT2_ROOT_INO);
    }

    let mut components: Vec<&str> = path.split('/').collect();
    if path.starts_with('/') {
        components.remove(0);
    }
    if path.ends_with('/') {
        components.pop();
    }

    let Some((name, dirs)) = components.split_last() else {
        return Ok(EXT2_ROOT_INO);
    };

    let mut current = EXT2_ROOT_INO;
    for dir in dirs {
        let entries = read_dir_entries(io, meta, current)?;
        let next = scan(&entries, dir.as_bytes());
        if next == EXT2_NULL_INO {
            return Ok(EXT2_NULL_INO);
        }

        let inode = read_inode(io, meta, next)?;
        if !inode.is_dir() {
            return Ok(EXT2_NULL_INO);
        }
        current = next;
    }

    let entries = read_dir_entries(io, meta, current)?;
    Ok(scan(&entries, name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dir_block_skips_tombstones() {
        let mut block = vec![0u8; 128];
        let mut live = Ext2DirEntry::new(12, b"kept", EXT2_FT_REG_FILE);
        let mut dead = Ext2DirEntry::new(0, b"gone", EXT2_FT_REG_FILE);
        dead.set_rec_len(12);
        live.set_rec_len(128 - 12);

        block[..12].copy_from_slice(&dead.to_bytes());
        block[12..].copy_from_slice(&live.to_bytes());

        let mut entries = Vec::new();
        parse_dir_block(&block, &mut entries);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].inode, 12);
        assert_eq!(entries[0].name, b"kept");
    }

    #[test]
    fn test_parse_dir_block_corrupt_tail() {
        // One good record, then a record claiming more than remains.
        let mut block = vec![0u8; 64];
        let mut good = Ext2DirEntry::new(5, b"ok", EXT2_FT_DIR);
        good.set_rec_len(12);
        block[..12].copy_from_slice(&good.to_bytes());

        let mut bad = Ext2DirEntry::new(6, b"bad", EXT2_FT_DIR);
        bad.set_rec_len(500);
        block[12..24].copy_from_slice(&bad.to_bytes()[..12]);

        let mut entries = Vec::new();
        parse_dir_block(&block, &mut entries);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].inode, 5);

        // Zero-length record also stops the walk.
        let mut entries = Vec::new();
        parse_dir_block(&[0u8; 32], &mut entries);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_scan() {
        let entries = vec![
            Ext2DirEntry::new(2, b".", EXT2_FT_DIR),
            Ext2DirEntry::new(7, b"data", EXT2_FT_REG_FILE),
        ];
        assert_eq!(scan(&entries, b"data"), 7);
        assert_eq!(scan(&entries, b"."), 2);
        assert_eq!(scan(&entries, b"missing"), EXT2_NULL_INO);
        assert_eq!(scan(&entries, b"dat"), EXT2_NULL_INO);
    }
}
