//! FAT12/16/32 driver.
//!
//! The three FAT variants share everything but the shape of the
//! allocation table and the root directory: FAT12/16 keep a fixed-size
//! root region, FAT32 roots in a cluster chain like any directory.
//! Cluster chains are resolved once at open time so reads are O(1) per
//! block instead of a FAT walk per access.

mod bpb;
mod chain;
mod directory;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::volume::Volume;

use bpb::{FatContext, FatType};
use directory::DirEntry;

const LFN_MAX_ENTRIES: usize = 20;
const LFN_MAX_FILENAME_LENGTH: usize = LFN_MAX_ENTRIES * 13 + 1;

// Loaded directories are capped to keep hostile cluster chains from
// exhausting memory.
const MAX_DIR_SIZE: u64 = 256 * 1024 * 1024;

/// An open FAT file with its precomputed cluster chain.
pub struct FatFile {
    context: FatContext,
    size_bytes: u32,
    chain: Vec<u32>,
}

// Load a whole directory into one buffer: the fixed root region when
// `dir_cluster` is `None` (FAT12/16), a cluster chain otherwise.
fn load_directory(ctx: &FatContext, vol: &Volume, dir_cluster: Option<u32>) -> Option<Vec<u8>> {
    let block_size = ctx.sectors_per_cluster * ctx.bytes_per_sector;

    match dir_cluster {
        Some(cluster) => {
            let dir_chain = chain::cache_cluster_chain(ctx, vol, cluster)?;
            let alloc_size = (dir_chain.len() as u64).checked_mul(block_size)?;
            if alloc_size > MAX_DIR_SIZE {
                return None;
            }

            let mut entries = vec![0u8; alloc_size as usize];
            if !chain::read_cluster_chain(ctx, vol, &dir_chain, &mut entries, 0) {
                return None;
            }
            Some(entries)
        }
        None => {
            let root_bytes = ctx.root_entries * directory::DIR_ENTRY_SIZE as u64;
            let blocks = root_bytes.div_ceil(block_size);
            let alloc_size = blocks.checked_mul(block_size)?;
            if alloc_size > MAX_DIR_SIZE {
                return None;
            }

            let mut entries = vec![0u8; alloc_size as usize];
            vol.read(
                &mut entries[..root_bytes as usize],
                ctx.root_start * ctx.bytes_per_sector,
            )
            .ok()?;
            Some(entries)
        }
    }
}

fn open_in(
    ctx: &FatContext,
    vol: &Volume,
    dir_cluster: Option<u32>,
    name: &[u8],
) -> Option<DirEntry> {
    let entries = load_directory(ctx, vol, dir_cluster)?;
    directory::find_in_dir(&entries, name)
}

/// Open `path` if `vol` carries a FAT filesystem.
pub(super) fn open(vol: &Arc<Volume>, path: &str) -> Option<FatFile> {
    let ctx = bpb::parse(vol)?;

    let mut rest = path.as_bytes();
    while rest.first() == Some(&b'/') {
        rest = &rest[1..];
    }

    let mut dir_cluster: Option<u32> = match ctx.kind {
        FatType::Fat32 => Some(ctx.root_directory_cluster),
        _ => None,
    };

    loop {
        let comp_len = rest.iter().position(|&b| b == b'/').unwrap_or(rest.len());
        if comp_len >= LFN_MAX_FILENAME_LENGTH - 1 {
            return None;
        }
        let component = &rest[..comp_len];

        let entry = open_in(&ctx, vol, dir_cluster, component)?;

        if comp_len < rest.len() {
            rest = &rest[comp_len + 1..];
            dir_cluster = Some(entry.first_cluster(ctx.kind));
        } else {
            let first_cluster = entry.first_cluster(ctx.kind);
            let size_bytes = entry.file_size_bytes;

            let file_chain = match chain::cache_cluster_chain(&ctx, vol, first_cluster) {
                Some(c) => c,
                // An empty file has no chain to cache.
                None if size_bytes == 0 => Vec::new(),
                None => return None,
            };

            return Some(FatFile {
                context: ctx,
                size_bytes,
                chain: file_chain,
            });
        }
    }
}

/// The volume label from the root directory, trailing spaces trimmed.
pub(super) fn label(vol: &Volume) -> Option<String> {
    let ctx = bpb::parse(vol)?;

    let root = match ctx.kind {
        FatType::Fat32 => Some(ctx.root_directory_cluster),
        _ => None,
    };
    let entries = load_directory(&ctx, vol, root)?;
    directory::label_in(&entries)
}

impl FatFile {
    pub(super) fn size(&self) -> u64 {
        self.size_bytes as u64
    }

    // The chain was validated at open time; a failed walk here means
    // the filesystem changed underneath us.
    pub(super) fn read(&self, vol: &Volume, buf: &mut [u8], loc: u64) {
        if !chain::read_cluster_chain(&self.context, vol, &self.chain, buf, loc) {
            panic!("fat: cluster chain read failed (corrupted filesystem?)");
        }
    }
}
