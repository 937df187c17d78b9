// MBR parser, including the EBR chain of logical partitions.
//
// MBR has no signature worth the name, so validity is a set of
// plausibility heuristics: the four status bytes must look like status
// bytes, and the sector must not be the superblock of a filesystem
// occupying the whole disk.

use alloc::sync::Arc;

use crate::fs;
use crate::volume::Volume;

use super::PartError;

const PRIMARY_TABLE_OFFSET: u64 = 0x1be;
const EBR_TABLE_OFFSET: u64 = 0x1be;
const EBR_CHAIN_OFFSET: u64 = 0x1ce;
const DISK_ID_OFFSET: u64 = 0x1b8;

const TYPE_EXTENDED_LBA: u8 = 0x0f;
const TYPE_EXTENDED_CHS: u8 = 0x05;

// Cap on the EBR walk; a circular chain must not spin forever.
const MAX_LOGICAL_PARTITIONS: u32 = 256;

struct MbrEntry {
    kind: u8,
    first_sect: u32,
    sect_count: u32,
}

impl MbrEntry {
    const SIZE: usize = 16;

    fn read(volume: &Volume, offset: u64) -> Option<Self> {
        let mut raw = [0u8; Self::SIZE];
        volume.read(&mut raw, offset).ok()?;
        Some(Self {
            kind: raw[4],
            first_sect: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            sect_count: u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]),
        })
    }

    fn is_extended(&self) -> bool {
        self.kind == TYPE_EXTENDED_LBA || self.kind == TYPE_EXTENDED_CHS
    }
}

fn read_bytes<const N: usize>(volume: &Volume, offset: u64) -> Option<[u8; N]> {
    let mut raw = [0u8; N];
    volume.read(&mut raw, offset).ok()?;
    Some(raw)
}

/// Heuristic check that the first sector holds an MBR rather than the
/// superblock of an unpartitioned filesystem.
pub fn is_valid_mbr(volume: &Volume) -> bool {
    // The status byte of each primary entry is 0x00 or 0x80.
    for offset in [446u64, 462, 478, 494] {
        let Some([status]) = read_bytes::<1>(volume, offset) else {
            return false;
        };
        if status != 0x00 && status != 0x80 {
            return false;
        }
    }

    // Filesystem signatures that mean the "MBR" is really a superblock.
    let Some(oem) = read_bytes::<4>(volume, 3) else {
        return false;
    };
    if &oem == b"NTFS" {
        return false;
    }
    let Some(sig) = read_bytes::<3>(volume, 54) else {
        return false;
    };
    if &sig == b"FAT" {
        return false;
    }
    let Some(sig) = read_bytes::<3>(volume, 82) else {
        return false;
    };
    if &sig == b"FAT" {
        return false;
    }
    let Some(sig) = read_bytes::<5>(volume, 3) else {
        return false;
    };
    if &sig == b"FAT32" {
        return false;
    }
    let Some(magic) = read_bytes::<2>(volume, 1080) else {
        return false;
    };
    if u16::from_le_bytes(magic) == 0xef53 {
        return false;
    }

    true
}

/// The 32-bit disk identifier, if the volume looks like an MBR disk.
pub fn disk_id(volume: &Volume) -> Option<u32> {
    if !is_valid_mbr(volume) {
        return None;
    }
    let raw = read_bytes::<4>(volume, DISK_ID_OFFSET)?;
    Some(u32::from_le_bytes(raw))
}

// Walk the EBR chain inside the extended partition down to logical
// partition `partition` (0-based within the chain). The chain must stay
// strictly increasing and inside the extended partition.
fn get_logical_part(
    disk: &Arc<Volume>,
    extended: &Volume,
    partition: u32,
) -> Result<Volume, PartError> {
    if partition >= MAX_LOGICAL_PARTITIONS {
        return Err(PartError::EndOfTable);
    }

    let mut ebr_sector: u64 = 0;

    for i in 0..partition {
        let entry_offset = ebr_sector * 512 + EBR_CHAIN_OFFSET;
        let entry =
            MbrEntry::read(extended, entry_offset).ok_or(PartError::EndOfTable)?;

        if !entry.is_extended() {
            return Err(PartError::EndOfTable);
        }

        let prev_ebr_sector = ebr_sector;
        ebr_sector = entry.first_sect as u64;

        // EBR sectors only ever move forward; zero or backwards means a
        // corrupted or circular chain.
        if ebr_sector == 0 || (i > 0 && ebr_sector <= prev_ebr_sector) {
            return Err(PartError::EndOfTable);
        }

        if extended.sect_count.is_some_and(|count| ebr_sector >= count) {
            return Err(PartError::EndOfTable);
        }
    }

    let entry_offset = ebr_sector * 512 + EBR_TABLE_OFFSET;
    let entry = MbrEntry::read(extended, entry_offset).ok_or(PartError::EndOfTable)?;

    if entry.kind == 0 {
        return Err(PartError::NoPartition);
    }
    if entry.sect_count == 0 {
        return Err(PartError::NoPartition);
    }

    let first_sect = extended
        .first_sect
        .checked_add(ebr_sector)
        .and_then(|s| s.checked_add(entry.first_sect as u64))
        .ok_or(PartError::NoPartition)?;
    first_sect
        .checked_add(entry.sect_count as u64)
        .ok_or(PartError::NoPartition)?;

    // Logical partitions number from 5.
    let mut part = disk.derive(partition + 4 + 1, first_sect, entry.sect_count as u64);
    part.backing_dev = Some(Arc::clone(disk));
    part.guid = fs::guid(&part);
    part.fslabel = fs::label(&part);

    Ok(part)
}

pub(super) fn get_part(parent: &Arc<Volume>, partition: u32) -> Result<Volume, PartError> {
    if !is_valid_mbr(parent) {
        return Err(PartError::InvalidTable);
    }

    if partition > 3 {
        // Logical partition: find the first extended primary and walk
        // its EBR chain.
        for i in 0..4u32 {
            let entry_offset = PRIMARY_TABLE_OFFSET + (MbrEntry::SIZE as u64) * i as u64;
            let Some(entry) = MbrEntry::read(parent, entry_offset) else {
                continue;
            };

            if !entry.is_extended() || entry.sect_count == 0 {
                continue;
            }

            let mut extended =
                parent.derive(i + 1, entry.first_sect as u64, entry.sect_count as u64);
            extended.backing_dev = Some(Arc::clone(parent));

            return get_logical_part(parent, &extended, partition - 4);
        }

        return Err(PartError::EndOfTable);
    }

    let entry_offset = PRIMARY_TABLE_OFFSET + (MbrEntry::SIZE as u64) * partition as u64;
    let entry = MbrEntry::read(parent, entry_offset).ok_or(PartError::EndOfTable)?;

    if entry.kind == 0 {
        return Err(PartError::NoPartition);
    }
    if entry.sect_count == 0 {
        return Err(PartError::NoPartition);
    }

    let mut part = parent.derive(partition + 1, entry.first_sect as u64, entry.sect_count as u64);
    part.backing_dev = Some(Arc::clone(parent));
    part.guid = fs::guid(&part);
    part.fslabel = fs::label(&part);

    Ok(part)
}
