// Cluster map reads and chain caching.

use alloc::vec::Vec;

use crate::volume::Volume;

use super::bpb::{FatContext, FatType};

// Chain length cap (16 Mi clusters); a longer walk means the map is
// circular or hostile.
const MAX_CHAIN_LENGTH: usize = 64 * 1024 * 1024 / core::mem::size_of::<u32>();

// Look `cluster`'s successor up in the first FAT copy. FAT12 packs two
// entries into three bytes; FAT16/32 are natural word reads, with
// FAT32's four reserved top bits masked off.
fn read_cluster_from_map(ctx: &FatContext, vol: &Volume, cluster: u32) -> Option<u32> {
    let fat_base = ctx.fat_start_lba * ctx.bytes_per_sector;
    let fat_size = ctx.sectors_per_fat * ctx.bytes_per_sector;

    match ctx.kind {
        FatType::Fat12 => {
            let offset = cluster as u64 + cluster as u64 / 2;
            if offset + 2 > fat_size {
                return None;
            }
            let mut raw = [0u8; 2];
            vol.read(&mut raw, fat_base + offset).ok()?;
            let pair = u16::from_le_bytes(raw);
            if cluster % 2 == 0 {
                Some((pair & 0xfff) as u32)
            } else {
                Some((pair >> 4) as u32)
            }
        }
        FatType::Fat16 => {
            let offset = cluster as u64 * 2;
            if offset + 2 > fat_size {
                return None;
            }
            let mut raw = [0u8; 2];
            vol.read(&mut raw, fat_base + offset).ok()?;
            Some(u16::from_le_bytes(raw) as u32)
        }
        FatType::Fat32 => {
            let offset = cluster as u64 * 4;
            if offset + 4 > fat_size {
                return None;
            }
            let mut raw = [0u8; 4];
            vol.read(&mut raw, fat_base + offset).ok()?;
            Some(u32::from_le_bytes(raw) & 0x0fff_ffff)
        }
    }
}

/// Follow the chain from `initial_cluster` and return it as a flat
/// array. `None` on a map read failure, an unusable initial cluster, or
/// a chain that never terminates within the cap.
pub(super) fn cache_cluster_chain(
    ctx: &FatContext,
    vol: &Volume,
    initial_cluster: u32,
) -> Option<Vec<u32>> {
    let cluster_limit = ctx.kind.cluster_limit();
    if initial_cluster < 2 || initial_cluster > cluster_limit {
        return None;
    }

    let max_clusters = (cluster_limit as usize - 1).min(MAX_CHAIN_LENGTH);

    let mut cluster_chain = Vec::new();
    let mut cluster = initial_cluster;
    loop {
        cluster_chain.push(cluster);
        if cluster_chain.len() > max_clusters {
            // Circular or corrupted cluster chain.
            return None;
        }

        cluster = read_cluster_from_map(ctx, vol, cluster)?;
        if cluster < 2 || cluster > cluster_limit {
            break;
        }
    }

    Some(cluster_chain)
}

/// Byte-granular read over a cached chain. Returns false when the range
/// leaves the chain or a cluster number is impossible.
pub(super) fn read_cluster_chain(
    ctx: &FatContext,
    vol: &Volume,
    cluster_chain: &[u32],
    buf: &mut [u8],
    loc: u64,
) -> bool {
    let block_size = ctx.sectors_per_cluster * ctx.bytes_per_sector;
    let count = buf.len() as u64;

    let mut progress: u64 = 0;
    while progress < count {
        let Some(pos) = loc.checked_add(progress) else {
            return false;
        };
        let block = pos / block_size;

        if block >= cluster_chain.len() as u64 {
            return false;
        }
        let cluster = cluster_chain[block as usize];
        if cluster < 2 {
            return false;
        }

        let offset = pos % block_size;
        let mut chunk = count - progress;
        if chunk > block_size - offset {
            chunk = block_size - offset;
        }

        let base = (ctx.data_start_lba + (cluster as u64 - 2) * ctx.sectors_per_cluster)
            * ctx.bytes_per_sector;
        if vol
            .read(
                &mut buf[progress as usize..(progress + chunk) as usize],
                base + offset,
            )
            .is_err()
        {
            return false;
        }

        progress += chunk;
    }

    true
}
