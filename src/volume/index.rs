// Global registry of discovered volumes.
//
// Append-only: the enumeration sequence fills it before any filesystem
// operation runs, and nothing is ever removed.

use alloc::sync::Arc;
use alloc::vec::Vec;

use gpt_disk_types::Guid;
use spin::Mutex;

use super::Volume;

static VOLUMES: Mutex<Vec<Arc<Volume>>> = Mutex::new(Vec::new());

pub fn register(volume: Arc<Volume>) {
    VOLUMES.lock().push(volume);
}

/// Find a volume by filesystem UUID or GPT unique partition GUID.
pub fn get_by_guid(guid: &Guid) -> Option<Arc<Volume>> {
    let volumes = VOLUMES.lock();
    for volume in volumes.iter() {
        if volume.guid.as_ref() == Some(guid) {
            return Some(Arc::clone(volume));
        }
        if volume.part_guid.as_ref() == Some(guid) {
            return Some(Arc::clone(volume));
        }
    }
    None
}

/// Find a volume by filesystem label. Case-sensitive.
pub fn get_by_fslabel(fslabel: &str) -> Option<Arc<Volume>> {
    let volumes = VOLUMES.lock();
    for volume in volumes.iter() {
        if volume.fslabel.as_deref() == Some(fslabel) {
            return Some(Arc::clone(volume));
        }
    }
    None
}

/// Find a volume by its (optical, drive, partition) coordinate.
pub fn get_by_coord(optical: bool, drive: u32, partition: u32) -> Option<Arc<Volume>> {
    let volumes = VOLUMES.lock();
    for volume in volumes.iter() {
        if volume.index == drive
            && volume.is_optical == optical
            && volume.partition == partition
        {
            return Some(Arc::clone(volume));
        }
    }
    None
}
