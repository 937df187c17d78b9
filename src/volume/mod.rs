//! Logical volumes and the byte-granular read path.
//!
//! A [`Volume`] is a byte region on a disk: the whole disk, or one
//! partition of it. Reads are byte-granular; sector translation and a
//! one-block read cache live here. Everything below this layer speaks
//! whole sectors, everything above it speaks bytes.

pub mod index;
pub mod scan;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use gpt_disk_types::Guid;
use spin::Mutex;

use crate::disk::{DiskError, SharedDisk};

/// Errors from [`Volume::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeError {
    /// The requested range lies outside the volume.
    OutOfRange,
    /// The partition does not start on a device sector boundary.
    Misaligned,
    /// The medium disappeared.
    NoMedia,
    /// The device failed the transfer even at a single sector.
    ReadFailed,
    /// Sector arithmetic overflowed; the on-disk geometry is hostile.
    Overflow,
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "read range outside volume"),
            Self::Misaligned => write!(f, "partition not sector aligned"),
            Self::NoMedia => write!(f, "no medium in drive"),
            Self::ReadFailed => write!(f, "disk read failed"),
            Self::Overflow => write!(f, "sector arithmetic overflow"),
        }
    }
}

// One cached aggregate block per volume. `buf` is allocated on first use
// and always `fastest_xfer_size * sector_size` bytes from then on.
struct BlockCache {
    buf: Vec<u8>,
    block: u64,
    ready: bool,
}

/// A logical byte region on a disk.
///
/// Volumes are immutable once created; only the embedded read cache
/// changes behind its lock. The whole-disk volume for a drive has
/// `partition == 0`, its partitions count from 1 and point back at it
/// through `backing_dev`.
pub struct Volume {
    disk: SharedDisk,
    /// Disk number as assigned during enumeration.
    pub index: u32,
    pub is_optical: bool,
    /// 1-based partition number; 0 for the whole disk.
    pub partition: u32,
    /// Device sector size in bytes.
    pub sector_size: u64,
    /// Disk-preferred contiguous transfer, in sectors.
    pub fastest_xfer_size: u64,
    /// First sector of the region, in 512-byte units on the disk.
    pub first_sect: u64,
    /// Length in 512-byte units; `None` when the disk does not report one.
    pub sect_count: Option<u64>,
    /// The whole-disk volume this partition was carved from.
    pub backing_dev: Option<Arc<Volume>>,
    /// Filesystem UUID from the superblock, if the filesystem has one.
    pub guid: Option<Guid>,
    /// GPT unique partition GUID.
    pub part_guid: Option<Guid>,
    /// Filesystem label.
    pub fslabel: Option<String>,
    cache: Mutex<BlockCache>,
}

impl Volume {
    /// Volume covering a whole disk. `sect_count` is in 512-byte units.
    pub fn new_whole_disk(
        disk: SharedDisk,
        index: u32,
        is_optical: bool,
        fastest_xfer_size: u64,
        sect_count: Option<u64>,
    ) -> Self {
        let sector_size = disk.lock().sector_size();
        Self {
            disk,
            index,
            is_optical,
            partition: 0,
            sector_size,
            fastest_xfer_size,
            first_sect: 0,
            sect_count,
            backing_dev: None,
            guid: None,
            part_guid: None,
            fslabel: None,
            cache: Mutex::new(BlockCache {
                buf: Vec::new(),
                block: 0,
                ready: false,
            }),
        }
    }

    /// Carve a sub-volume out of this one, inheriting the transport
    /// fields. Identifiers and `backing_dev` are the caller's to fill in.
    pub(crate) fn derive(&self, partition: u32, first_sect: u64, sect_count: u64) -> Self {
        Self {
            disk: Arc::clone(&self.disk),
            index: self.index,
            is_optical: self.is_optical,
            partition,
            sector_size: self.sector_size,
            fastest_xfer_size: self.fastest_xfer_size,
            first_sect,
            sect_count: Some(sect_count),
            backing_dev: None,
            guid: None,
            part_guid: None,
            fslabel: None,
            cache: Mutex::new(BlockCache {
                buf: Vec::new(),
                block: 0,
                ready: false,
            }),
        }
    }

    /// Read `buf.len()` bytes starting `loc` bytes into the volume.
    ///
    /// Fails without partial effects on the caller's view: either the
    /// whole range is filled or an error comes back.
    pub fn read(&self, buf: &mut [u8], loc: u64) -> Result<(), VolumeError> {
        let count = buf.len() as u64;

        if let Some(sect_count) = self.sect_count {
            let part_size = sect_count
                .checked_mul(self.sector_size)
                .ok_or(VolumeError::Overflow)?;
            if loc >= part_size || count > part_size - loc {
                return Err(VolumeError::OutOfRange);
            }
        }

        let block_size = self
            .fastest_xfer_size
            .checked_mul(self.sector_size)
            .ok_or(VolumeError::Overflow)?;
        if block_size == 0 {
            return Err(VolumeError::Overflow);
        }

        let mut cache = self.cache.lock();
        let mut progress: u64 = 0;
        while progress < count {
            let pos = loc.checked_add(progress).ok_or(VolumeError::Overflow)?;
            let block = pos / block_size;

            self.cache_block(&mut cache, block, block_size)?;

            let offset = (pos % block_size) as usize;
            let mut chunk = count - progress;
            if chunk > block_size - offset as u64 {
                chunk = block_size - offset as u64;
            }
            let chunk = chunk as usize;

            buf[progress as usize..progress as usize + chunk]
                .copy_from_slice(&cache.buf[offset..offset + chunk]);
            progress += chunk as u64;
        }

        Ok(())
    }

    // Make `block` the cached aggregate block, reading it from the disk
    // if it is not already there. On a transient failure the transfer
    // shrinks one sector at a time before giving up.
    fn cache_block(
        &self,
        cache: &mut BlockCache,
        block: u64,
        block_size: u64,
    ) -> Result<(), VolumeError> {
        if cache.ready && cache.block == block {
            return Ok(());
        }

        cache.ready = false;

        if cache.buf.is_empty() {
            cache.buf = vec![0u8; block_size as usize];
        }

        let sects_per_512 = self.sector_size / 512;
        if sects_per_512 == 0 || self.first_sect % sects_per_512 != 0 {
            return Err(VolumeError::Misaligned);
        }
        let first_sect = self.first_sect / sects_per_512;

        let block_offset = block
            .checked_mul(self.fastest_xfer_size)
            .ok_or(VolumeError::Overflow)?;
        let read_sector = first_sect
            .checked_add(block_offset)
            .ok_or(VolumeError::Overflow)?;

        let mut disk = self.disk.lock();
        let mut xfer_size = self.fastest_xfer_size;
        loop {
            let len = (xfer_size * self.sector_size) as usize;
            match disk.read_sectors(read_sector, &mut cache.buf[..len]) {
                Ok(()) => break,
                Err(DiskError::NoMedia) => return Err(VolumeError::NoMedia),
                Err(DiskError::Io) => {
                    xfer_size -= 1;
                    if xfer_size == 0 {
                        return Err(VolumeError::ReadFailed);
                    }
                }
            }
        }

        cache.ready = true;
        cache.block = block;

        Ok(())
    }
}
