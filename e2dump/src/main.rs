// SPDX-License-Identifier: MIT

mod log;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use e2fs::prelude::*;
use e2io::BlockIO;

use crate::log::LogLevel;

#[derive(Parser)]
#[command(name = "e2dump", version, about = "Dump, inspect and populate ext2 disk images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every file and directory out of an image into a host directory
    Dump {
        /// Source image (regular file or block device, opened read-write)
        image: PathBuf,
        /// Destination directory
        dest: PathBuf,

        /// Log each file and directory as it is written
        #[arg(long, short)]
        verbose: bool,
        /// Treat on-disk names as Latin-1 instead of UTF-8
        #[arg(long)]
        latin1: bool,
        /// Byte offset of the filesystem inside the image
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// List the entries of a directory inside the image
    Ls {
        image: PathBuf,
        /// Slash-separated path; empty or "/" for the root
        #[arg(default_value = "/")]
        path: String,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Copy a host file into a directory inside the image
    Put {
        image: PathBuf,
        /// Host file to copy in
        source: PathBuf,
        /// Full destination path inside the image, e.g. /docs/readme.txt
        dest: String,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Create a directory inside the image
    Mkdir {
        image: PathBuf,
        /// Full path of the new directory
        path: String,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Create a fresh ext2 filesystem in a (possibly new) image file
    Mkfs {
        image: PathBuf,

        #[arg(long, default_value_t = 1024)]
        block_size: u32,
        #[arg(long, default_value_t = 8192)]
        blocks_per_group: u32,
        #[arg(long, default_value_t = 2048)]
        inodes_per_group: u32,
        #[arg(long, default_value_t = 1)]
        groups: u32,
        #[arg(long)]
        label: Option<String>,
    },
    /// Validate allocation counters and directory structure
    Check {
        image: PathBuf,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

/// Running totals of one dump, threaded through the walk.
#[derive(Debug, Default)]
struct DumpStats {
    files: u64,
    dirs: u64,
    bytes: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            image,
            dest,
            verbose,
            latin1,
            offset,
        } => {
            if verbose {
                log::set_log_level(LogLevel::Verbose);
            }
            dump(&image, &dest, latin1, offset)
        }
        Commands::Ls {
            image,
            path,
            offset,
        } => ls(&image, &path, offset),
        Commands::Put {
            image,
            source,
            dest,
            offset,
        } => put(&image, &source, &dest, offset),
        Commands::Mkdir {
            image,
            path,
            offset,
        } => mkdir(&image, &path, offset),
        Commands::Mkfs {
            image,
            block_size,
            blocks_per_group,
            inodes_per_group,
            groups,
            label,
        } => mkfs(
            &image,
            Ext2FormatParams {
                block_size,
                blocks_per_group,
                inodes_per_group,
                groups,
                volume_label: label,
                volume_id: None,
            },
        ),
        Commands::Check { image, offset } => check(&image, offset),
    }
}

fn open_volume(image: &Path, offset: u64) -> anyhow::Result<FileBlockIO> {
    FileBlockIO::open_at(image, offset)
        .with_context(|| format!("Can't open {}", image.display()))
}

fn dump(image: &Path, dest: &Path, latin1: bool, offset: u64) -> anyhow::Result<()> {
    let mut io = open_volume(image, offset)?;
    let mut vol = Ext2Volume::open(&mut io)?;

    let sb = vol.superblock()?;
    let block_size = vol.meta().block_size as u64;
    let size = sb.s_blocks_count as u64 * block_size;
    let free = sb.s_free_blocks_count as u64 * block_size;
    log_verbose!("Size {size}");
    log_verbose!("Used {}", size - free);
    log_verbose!("Free {free}\n");
    log_verbose!("Block Size {block_size}\n");

    fs::create_dir_all(dest)?;
    let mut stats = DumpStats::default();
    dump_dir_inode(&mut vol, dest, EXT2_ROOT_INO, latin1, &mut stats)?;

    log_normal!(
        "Written {} files (total {} bytes) in {} directories",
        stats.files,
        stats.bytes,
        stats.dirs
    );
    Ok(())
}

fn dump_dir_inode<IO: BlockIO + ?Sized>(
    vol: &mut Ext2Volume<'_, IO>,
    target: &Path,
    ino: u32,
    latin1: bool,
    stats: &mut DumpStats,
) -> anyhow::Result<()> {
    let entries = vol.list_entries(ino)?;

    let mut directories = Vec::new();
    for entry in entries {
        match entry.kind() {
            Ext2FileType::Regular => dump_file(vol, target, &entry, latin1, stats)?,
            Ext2FileType::Directory => directories.push(entry),
            _ => log_normal!(
                "WARNING: Unhandled file type {} in file {}",
                entry.file_type,
                entry_name(&entry, latin1)
            ),
        }
    }

    for dir in directories {
        if dir.name == b"." || dir.name == b".." {
            continue;
        }
        let name = entry_name(&dir, latin1);
        log_verbose!("Entering subdirectory {name}");

        let path = target.join(&name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        stats.dirs += 1;
        dump_dir_inode(vol, &path, dir.inode, latin1, stats)?;
    }

    Ok(())
}

fn dump_file<IO: BlockIO + ?Sized>(
    vol: &mut Ext2Volume<'_, IO>,
    dest_dir: &Path,
    entry: &Ext2DirEntry,
    latin1: bool,
    stats: &mut DumpStats,
) -> anyhow::Result<()> {
    let name = entry_name(entry, latin1);
    let inode = vol.inode(entry.inode)?;
    log_verbose!(
        "Dump file {name} to {} ({} bytes)",
        dest_dir.display(),
        { inode.i_size }
    );

    let file = File::create(dest_dir.join(&name))?;
    let mut writer = BufWriter::new(file);
    let mut reader = vol.reader(inode);
    let written = io::copy(&mut reader, &mut writer)?;

    stats.files += 1;
    stats.bytes += written;
    Ok(())
}

/// On-disk entry name as a host string: UTF-8 (lossy), or each Latin-1
/// byte mapped to the same Unicode scalar.
fn entry_name(entry: &Ext2DirEntry, latin1: bool) -> String {
    if latin1 {
        entry.name.iter().map(|&b| b as char).collect()
    } else {
        String::from_utf8_lossy(&entry.name).into_owned()
    }
}

fn ls(image: &Path, path: &str, offset: u64) -> anyhow::Result<()> {
    let mut io = open_volume(image, offset)?;
    let mut vol = Ext2Volume::open(&mut io)?;

    let ino = vol.resolve_path(path)?;
    if ino == EXT2_NULL_INO {
        bail!("No such path: {path}");
    }

    for entry in vol.list_entries(ino)? {
        let tag = match entry.kind() {
            Ext2FileType::Directory => 'd',
            Ext2FileType::Regular => '-',
            _ => '?',
        };
        let size = vol.inode(entry.inode)?.i_size;
        log_normal!("{tag} {:>10} {}", size, entry_name(&entry, false));
    }
    Ok(())
}

/// Splits a full image path into its parent directory and final name.
fn split_parent(path: &str) -> anyhow::Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("Path must name a new entry, not the root");
    }
    let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() || name.len() > EXT2_NAME_LEN {
        bail!("Bad entry name in {path}");
    }
    Ok((parent, name))
}

/// Resolves the parent directory of `path`, failing when it is missing or
/// not a directory, then returns its inode number and the new entry name.
fn resolve_parent<IO: BlockIO + ?Sized>(
    vol: &mut Ext2Volume<'_, IO>,
    path: &str,
) -> anyhow::Result<(u32, String)> {
    let (parent, name) = split_parent(path)?;

    let parent_ino = vol.resolve_path(parent)?;
    if parent_ino == EXT2_NULL_INO {
        bail!("No such directory: /{parent}");
    }
    if !vol.inode(parent_ino)?.is_dir() {
        bail!("Not a directory: /{parent}");
    }
    if vol.resolve_path(path)? != EXT2_NULL_INO {
        bail!("Already exists: {path}");
    }

    Ok((parent_ino, name.to_owned()))
}

fn allocate_near<IO: BlockIO + ?Sized>(
    vol: &mut Ext2Volume<'_, IO>,
    parent_ino: u32,
) -> anyhow::Result<u32> {
    let prefer = vol.meta().inode_group(parent_ino);
    let ino = vol.allocate_inode(prefer)?;
    if ino == EXT2_NULL_INO {
        bail!("No free inode in any group");
    }
    Ok(ino)
}

fn put(image: &Path, source: &Path, dest: &str, offset: u64) -> anyhow::Result<()> {
    let data = fs::read(source).with_context(|| format!("Can't read {}", source.display()))?;

    let mut io = open_volume(image, offset)?;
    let mut vol = Ext2Volume::open(&mut io)?;

    let (parent_ino, name) = resolve_parent(&mut vol, dest)?;
    let ino = allocate_near(&mut vol, parent_ino)?;

    vol.create_file_inode(ino)?;
    vol.append_dir_entry(
        parent_ino,
        &Ext2DirEntry::new(ino, name.as_bytes(), EXT2_FT_REG_FILE),
    )?;
    let written = vol.write_file_data(ino, &data)?;

    log_normal!("Written {written} bytes to {dest} (inode {ino})");
    Ok(())
}

fn mkdir(image: &Path, path: &str, offset: u64) -> anyhow::Result<()> {
    let mut io = open_volume(image, offset)?;
    let mut vol = Ext2Volume::open(&mut io)?;

    let (parent_ino, name) = resolve_parent(&mut vol, path)?;
    let ino = allocate_near(&mut vol, parent_ino)?;

    vol.create_dir_inode(parent_ino, ino)?;
    vol.append_dir_entry(
        parent_ino,
        &Ext2DirEntry::new(ino, name.as_bytes(), EXT2_FT_DIR),
    )?;

    log_normal!("Created {path} (inode {ino})");
    Ok(())
}

fn mkfs(image: &Path, params: Ext2FormatParams) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(image)
        .with_context(|| format!("Can't create {}", image.display()))?;

    let len = params.groups as u64 * params.blocks_per_group as u64 * params.block_size as u64;
    file.set_len(len)?;

    let mut io = FileBlockIO::from_file(file);
    let meta = Ext2Formatter::new(&mut io, params).format()?;

    log_normal!(
        "Created ext2 image {}: {} blocks of {} bytes in {} groups",
        image.display(),
        meta.blocks_count,
        meta.block_size,
        meta.block_groups_count
    );
    Ok(())
}

fn check(image: &Path, offset: u64) -> anyhow::Result<()> {
    let mut io = open_volume(image, offset)?;
    let mut vol = Ext2Volume::open(&mut io)?;

    let report = vol.check()?;
    log_normal!(
        "OK: {} groups, {} directories",
        report.groups,
        report.directories
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parent() {
        assert_eq!(split_parent("/docs/readme.txt").unwrap(), ("/docs", "readme.txt"));
        assert_eq!(split_parent("/top").unwrap(), ("", "top"));
        assert_eq!(split_parent("/a/b/").unwrap(), ("/a", "b"));
        assert!(split_parent("/").is_err());
        assert!(split_parent("").is_err());
    }

    #[test]
    fn test_entry_name_latin1() {
        let entry = Ext2DirEntry::new(5, &[0x63, 0x61, 0x66, 0xE9], EXT2_FT_REG_FILE);
        assert_eq!(entry_name(&entry, true), "café");
        assert_eq!(entry_name(&entry, false), "caf\u{FFFD}");
    }
}
