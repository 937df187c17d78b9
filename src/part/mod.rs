//! Partition table parsing.
//!
//! [`part_get`] is the only entry point the enumeration sequence needs:
//! it tries GPT first and falls back to MBR, producing a child [`Volume`]
//! for the requested partition index.

pub mod gpt;
pub mod mbr;

use alloc::sync::Arc;
use core::fmt;

use crate::volume::Volume;

/// Why a partition lookup produced no volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartError {
    /// The slot at this index is empty; later slots may not be.
    NoPartition,
    /// No slot at this index or beyond.
    EndOfTable,
    /// The volume carries no recognizable partition table.
    InvalidTable,
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPartition => write!(f, "no partition at this index"),
            Self::EndOfTable => write!(f, "end of partition table"),
            Self::InvalidTable => write!(f, "invalid partition table"),
        }
    }
}

/// Parse partition `partition` (0-based) out of `volume`'s table.
///
/// The returned volume is fully populated: transport fields inherited
/// from the parent, identifiers probed from the partition's filesystem,
/// and `backing_dev` pointing back at `volume`.
pub fn part_get(volume: &Arc<Volume>, partition: u32) -> Result<Volume, PartError> {
    match gpt::get_part(volume, partition) {
        Err(PartError::InvalidTable) => {}
        other => return other,
    }

    match mbr::get_part(volume, partition) {
        Err(PartError::InvalidTable) => {}
        other => return other,
    }

    Err(PartError::InvalidTable)
}
