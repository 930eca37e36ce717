// SPDX-License-Identifier: MIT

//! Mutation side of the engine: inode creation, partial inode field
//! updates, directory entry insertion and file content injection.
//!
//! Each public operation issues its writes in source order and ends with a
//! flush. There is no journal; a crash mid-operation leaves the filesystem
//! partially updated.

use e2io::prelude::*;
use zerocopy::{Immutable, IntoBytes};

use crate::block_map;
use crate::constant::*;
use crate::data;
use crate::error::{Ext2Error, Ext2Result};
use crate::meta::Ext2Meta;
use crate::parser;
use crate::types::dirent::min_rec_len;
use crate::types::{Ext2DirEntry, Ext2Inode};
use crate::{allocator, ensure};

/// Real uid/gid of the calling process, stamped into created inodes.
pub fn host_uid_gid() -> (u16, u16) {
    #[cfg(unix)]
    // Safety: getuid/getgid cannot fail and take no arguments.
    unsafe {
        (libc::getuid() as u16, libc::getgid() as u16)
    }
    #[cfg(not(unix))]
    {
        (0, 0)
    }
}

/// Writes `value` at byte offset `field_offset` inside inode record `ino`.
///
/// The `I_SIZE`, `I_BLOCKS` and `I_BLOCK` constants name the offsets this
/// engine updates piecemeal.
pub fn update_inode<IO, T>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
    value: T,
    field_offset: u64,
) -> Ext2Result
where
    IO: BlockIO + ?Sized,
    T: IntoBytes + Immutable,
{
    ensure!(
        ino >= 1 && ino <= meta.inodes_count,
        Ext2Error::OutOfRange("Inode number out of bounds")
    );

    let desc = parser::read_group_descriptor(io, meta, meta.inode_group(ino))?;
    let offset = meta.inode_offset(desc.bg_inode_table, meta.inode_index(ino));
    io.write_struct(offset + field_offset, &value)?;
    Ok(())
}

/// Creates directory inode `ino` under `parent`: allocates one data block
/// from `ino`'s group, writes the inode record, and initialises the block
/// with `.` and `..`.
pub fn create_dir_inode<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    parent: u32,
    ino: u32,
) -> Ext2Result<Ext2Inode> {
    let group = meta.inode_group(ino);
    let desc = parser::read_group_descriptor(io, meta, group)?;

    let block = allocator::allocate_block_strict(io, meta, group)?;
    let (uid, gid) = host_uid_gid();
    let inode = Ext2Inode::new_dir(uid, gid, meta.block_size, block);

    let offset = meta.inode_offset(desc.bg_inode_table, meta.inode_index(ino));
    io.write_struct(offset, &inode)?;

    let dot = Ext2DirEntry::dot(ino);
    io.write_at(meta.block_offset(block), &dot.to_bytes())?;
    io.flush()?;

    let mut dotdot = Ext2DirEntry::dotdot(parent);
    dotdot.set_rec_len((meta.block_size - dot.rec_len as u32) as u16);
    io.write_at(
        meta.block_offset(block) + dot.rec_len as u64,
        &dotdot.to_bytes(),
    )?;
    io.flush()?;

    Ok(inode)
}

/// Creates empty regular-file inode `ino` with one pre-allocated data block.
pub fn create_file_inode<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
) -> Ext2Result<Ext2Inode> {
    let group = meta.inode_group(ino);
    let desc = parser::read_group_descriptor(io, meta, group)?;

    let block = allocator::allocate_block_strict(io, meta, group)?;
    let (uid, gid) = host_uid_gid();
    let inode = Ext2Inode::new_file(uid, gid, block);

    let offset = meta.inode_offset(desc.bg_inode_table, meta.inode_index(ino));
    io.write_struct(offset, &inode)?;
    io.flush()?;

    Ok(inode)
}

/// Byte offset (relative to the directory start) where the next record
/// begins, plus the offset and true payload length of the current final
/// record.
fn tail_position<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    inode: &Ext2Inode,
) -> Ext2Result<(u64, u64, u16)> {
    let bs = meta.block_size;
    let blocks = inode.i_size / bs;
    ensure!(
        blocks >= 1,
        Ext2Error::Corrupt("Directory inode has no data blocks")
    );
    let base = ((blocks - 1) * bs) as u64;

    let mut block = vec![0u8; bs as usize];
    data::read_data(io, meta, inode, &mut block, base)?;

    let mut pos = 0u32;
    loop {
        ensure!(
            pos + EXT2_DIRENT_HEADER_SIZE as u32 <= bs,
            Ext2Error::Corrupt("Bad record length in directory block")
        );
        let rec_len =
            u16::from_le_bytes(block[pos as usize + 4..pos as usize + 6].try_into().unwrap());
        let name_len = block[pos as usize + 6];
        ensure!(
            rec_len as u32 != 0 && pos + rec_len as u32 <= bs,
            Ext2Error::Corrupt("Bad record length in directory block")
        );

        if pos + rec_len as u32 == bs {
            // Final record: its rec_len reserves the rest of the block.
            let payload = min_rec_len(name_len);
            return Ok((base + pos as u64 + payload as u64, base + pos as u64, payload));
        }
        pos += rec_len as u32;
    }
}

/// Appends `entry` to directory inode `ino`.
///
/// The new record is placed in the trailing slack of the last data block,
/// claiming the remainder of the block, and the previous final record's
/// length shrinks to its aligned payload. When the last block is exactly
/// full, the directory grows by one block and the new record claims all of
/// it. The owning group's used-directories counter is incremented either
/// way.
pub fn append_dir_entry<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
    entry: &Ext2DirEntry,
) -> Ext2Result {
    let inode = parser::read_inode(io, meta, ino)?;
    ensure!(inode.is_dir(), Ext2Error::NotADirectory);

    let bs = meta.block_size;
    let (off, last_off, payload) = tail_position(io, meta, &inode)?;

    let mut record = entry.clone();
    if off % bs as u64 == 0 {
        // Last block exactly full: grow the directory by one block. The
        // inode size already points create_logical at the new logical index.
        block_map::create_logical(io, meta, ino)?;
        update_inode(io, meta, ino, inode.i_size + bs, I_SIZE)?;
        update_inode(io, meta, ino, inode.i_blocks + bs / 512, I_BLOCKS)?;
        let inode = parser::read_inode(io, meta, ino)?;

        record.set_rec_len(bs as u16);
        data::write_data(io, meta, &inode, &record.to_bytes(), off)?;
    } else {
        record.set_rec_len((bs as u64 - off % bs as u64) as u16);
        data::write_data(io, meta, &inode, &record.to_bytes(), off)?;

        // The previous final record no longer claims the trailing region.
        data::write_data(io, meta, &inode, &payload.to_le_bytes(), last_off + 4)?;
    }

    let group = meta.inode_group(ino);
    let desc = parser::read_group_descriptor(io, meta, group)?;
    io.write_u16_at(
        meta.group_desc_offset(group) + BG_USED_DIRS_COUNT,
        desc.bg_used_dirs_count + 1,
    )?;
    io.flush()?;

    Ok(())
}

/// Replaces regular-file inode `ino`'s content with `data`.
///
/// Owns the size-update contract: before each missing block is mapped the
/// inode size is raised to that block's logical position, and after the
/// bytes are stored it is set to the final byte length.
pub fn write_file_data<IO: BlockIO + ?Sized>(
    io: &mut IO,
    meta: &Ext2Meta,
    ino: u32,
    buf: &[u8],
) -> Ext2Result<usize> {
    let bs = meta.block_size;
    let mut inode = parser::read_inode(io, meta, ino)?;

    let blocks = buf.len().div_ceil(bs as usize) as u32;
    for logical in 0..blocks {
        match block_map::map_logical(io, meta, &inode, logical) {
            Ok(_) => {}
            Err(Ext2Error::HoleOrOutOfRange) => {
                update_inode(io, meta, ino, logical * bs, I_SIZE)?;
                block_map::create_logical(io, meta, ino)?;
                inode = parser::read_inode(io, meta, ino)?;
            }
            Err(e) => return Err(e),
        }
    }

    let n = data::write_data(io, meta, &inode, buf, 0)?;
    ensure!(n == buf.len(), Ext2Error::HoleOrOutOfRange);

    update_inode(io, meta, ino, buf.len() as u32, I_SIZE)?;
    update_inode(io, meta, ino, blocks * (bs / 512), I_BLOCKS)?;
    io.flush()?;

    Ok(n)
}
