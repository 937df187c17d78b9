// GPT (GUID Partition Table) parser.
//
// Every field here is attacker-controlled: entry offsets use the entry
// size the header claims (not our struct size), and every conversion to
// 512-byte units is overflow-checked.

use alloc::sync::Arc;

use gpt_disk_types::Guid;

use crate::fs;
use crate::volume::Volume;

use super::PartError;

const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";
const GPT_REVISION_1_0: u32 = 0x0001_0000;

// Logical block sizes the header is probed at; the header always sits
// at LBA 1 of the disk's own block size.
const LB_GUESSES: [u64; 2] = [512, 4096];

struct GptHeader {
    signature: [u8; 8],
    revision: u32,
    disk_guid: Guid,
    partition_entry_lba: u64,
    number_of_partition_entries: u32,
    size_of_partition_entry: u32,
}

impl GptHeader {
    const SIZE: usize = 92;

    fn parse(raw: &[u8; Self::SIZE]) -> Self {
        let mut signature = [0u8; 8];
        signature.copy_from_slice(&raw[0..8]);
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&raw[56..72]);
        Self {
            signature,
            revision: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            disk_guid: Guid::from_bytes(guid),
            partition_entry_lba: u64::from_le_bytes(raw[72..80].try_into().unwrap()),
            number_of_partition_entries: u32::from_le_bytes(raw[80..84].try_into().unwrap()),
            size_of_partition_entry: u32::from_le_bytes(raw[84..88].try_into().unwrap()),
        }
    }
}

struct GptEntry {
    unique_partition_guid: [u8; 16],
    starting_lba: u64,
    ending_lba: u64,
}

impl GptEntry {
    const SIZE: usize = 128;

    fn parse(raw: &[u8; Self::SIZE]) -> Self {
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&raw[16..32]);
        Self {
            unique_partition_guid: guid,
            starting_lba: u64::from_le_bytes(raw[32..40].try_into().unwrap()),
            ending_lba: u64::from_le_bytes(raw[40..48].try_into().unwrap()),
        }
    }
}

// Probe both logical block sizes for a header with the right signature.
// Returns the header and the block size it was found at.
fn find_header(volume: &Volume) -> Option<(GptHeader, u64)> {
    for lb_size in LB_GUESSES {
        let mut raw = [0u8; GptHeader::SIZE];
        if volume.read(&mut raw, lb_size).is_err() {
            continue;
        }

        let header = GptHeader::parse(&raw);
        if header.signature != *GPT_SIGNATURE {
            continue;
        }

        return Some((header, lb_size));
    }

    None
}

/// The disk GUID from the GPT header, if the disk carries a valid GPT.
pub fn disk_guid(volume: &Volume) -> Option<Guid> {
    let (header, _) = find_header(volume)?;
    if header.revision != GPT_REVISION_1_0 {
        return None;
    }
    Some(header.disk_guid)
}

pub(super) fn get_part(parent: &Arc<Volume>, partition: u32) -> Result<Volume, PartError> {
    let (header, lb_size) = find_header(parent).ok_or(PartError::InvalidTable)?;

    if header.revision != GPT_REVISION_1_0 {
        return Err(PartError::InvalidTable);
    }

    if partition >= header.number_of_partition_entries {
        return Err(PartError::EndOfTable);
    }

    // Offsets use the entry size the header declares, which must at
    // least hold the standard entry.
    let entry_size = header.size_of_partition_entry as u64;
    if entry_size < GptEntry::SIZE as u64 {
        return Err(PartError::InvalidTable);
    }

    let entry_offset = header
        .partition_entry_lba
        .checked_mul(lb_size)
        .and_then(|base| base.checked_add(partition as u64 * entry_size))
        .ok_or(PartError::InvalidTable)?;

    let mut raw = [0u8; GptEntry::SIZE];
    if parent.read(&mut raw, entry_offset).is_err() {
        return Err(PartError::EndOfTable);
    }
    let entry = GptEntry::parse(&raw);

    // An all-zero unique GUID marks an empty slot.
    if entry.unique_partition_guid == [0u8; 16] {
        return Err(PartError::NoPartition);
    }

    if entry.ending_lba < entry.starting_lba {
        return Err(PartError::NoPartition);
    }

    // Convert to 512-byte units, rejecting anything that overflows.
    let sect_multiplier = lb_size / 512;
    let first_sect = entry
        .starting_lba
        .checked_mul(sect_multiplier)
        .ok_or(PartError::NoPartition)?;
    let partition_blocks = (entry.ending_lba - entry.starting_lba)
        .checked_add(1)
        .ok_or(PartError::NoPartition)?;
    let sect_count = partition_blocks
        .checked_mul(sect_multiplier)
        .ok_or(PartError::NoPartition)?;

    let mut part = parent.derive(partition + 1, first_sect, sect_count);
    part.backing_dev = Some(Arc::clone(parent));
    part.part_guid = Some(Guid::from_bytes(entry.unique_partition_guid));
    part.guid = fs::guid(&part);
    part.fslabel = fs::label(&part);

    Ok(part)
}
