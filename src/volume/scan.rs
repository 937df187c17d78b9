// Disk registration: the whole-disk volume plus its partition sweep.

use alloc::sync::Arc;

use log::debug;

use crate::disk::SharedDisk;
use crate::part::{self, gpt, mbr, PartError};
use crate::{fs, volume};

use super::Volume;

// Defensive cap on the partition sweep; a hostile GPT can claim billions
// of all-zero entries that would otherwise each report NoPartition.
const MAX_PARTITIONS: u32 = 256;

/// Register an opened disk and everything on it.
///
/// Creates the whole-disk volume, probes its identifiers, registers it,
/// then sweeps the partition table and registers every partition found.
/// Returns the whole-disk volume.
pub fn register_disk(
    disk: SharedDisk,
    drive: u32,
    is_optical: bool,
    fastest_xfer_size: u64,
    sect_count: Option<u64>,
) -> Arc<Volume> {
    let mut whole = Volume::new_whole_disk(disk, drive, is_optical, fastest_xfer_size, sect_count);

    whole.guid = gpt::disk_guid(&whole);
    whole.fslabel = fs::label(&whole);
    if whole.guid.is_none() {
        if let Some(id) = mbr::disk_id(&whole) {
            debug!("drive {}: MBR disk id {:08x}", drive, id);
        }
    }

    let whole = Arc::new(whole);
    volume::index::register(Arc::clone(&whole));

    for partition in 0..MAX_PARTITIONS {
        match part::part_get(&whole, partition) {
            Ok(part) => {
                debug!(
                    "drive {}: partition {} at sector {}",
                    drive, part.partition, part.first_sect
                );
                volume::index::register(Arc::new(part));
            }
            Err(PartError::NoPartition) => continue,
            Err(PartError::EndOfTable) | Err(PartError::InvalidTable) => break,
        }
    }

    whole
}
