//! Common test utilities: in-memory disks and image builders.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

pub mod fat;
pub mod iso;
pub mod tbl;

use std::sync::Arc;

use bootfs::disk::{shared, Disk, DiskError};
use bootfs::volume::Volume;

/// In-memory disk. `logical_sectors` may exceed the materialized data,
/// in which case the tail reads as zeros (sparse images).
pub struct MemoryDisk {
    pub data: Vec<u8>,
    pub sector_size: u64,
    pub logical_sectors: u64,
}

impl MemoryDisk {
    pub fn new(data: Vec<u8>) -> Self {
        let logical_sectors = data.len() as u64 / 512;
        Self {
            data,
            sector_size: 512,
            logical_sectors,
        }
    }

    pub fn with_sector_size(data: Vec<u8>, sector_size: u64) -> Self {
        let logical_sectors = data.len() as u64 / sector_size;
        Self {
            data,
            sector_size,
            logical_sectors,
        }
    }

    pub fn sparse(data: Vec<u8>, logical_sectors: u64) -> Self {
        Self {
            data,
            sector_size: 512,
            logical_sectors,
        }
    }
}

impl Disk for MemoryDisk {
    fn sector_size(&self) -> u64 {
        self.sector_size
    }

    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        let sectors = buf.len() as u64 / self.sector_size;
        if lba + sectors > self.logical_sectors {
            return Err(DiskError::Io);
        }

        let offset = (lba * self.sector_size) as usize;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.data.get(offset + i).copied().unwrap_or(0);
        }
        Ok(())
    }
}

/// Disk that fails any transfer larger than `max_sectors`, for the
/// shrinking-retry path.
pub struct FlakyDisk {
    pub inner: MemoryDisk,
    pub max_sectors: u64,
}

impl Disk for FlakyDisk {
    fn sector_size(&self) -> u64 {
        self.inner.sector_size()
    }

    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        if buf.len() as u64 / self.inner.sector_size > self.max_sectors {
            return Err(DiskError::Io);
        }
        self.inner.read_sectors(lba, buf)
    }
}

/// Disk with no medium.
pub struct NoMediaDisk {
    pub sector_size: u64,
}

impl Disk for NoMediaDisk {
    fn sector_size(&self) -> u64 {
        self.sector_size
    }

    fn read_sectors(&mut self, _lba: u64, _buf: &mut [u8]) -> Result<(), DiskError> {
        Err(DiskError::NoMedia)
    }
}

/// Whole-disk volume over a dense image, 512-byte sectors, 8-sector
/// preferred transfers.
pub fn volume_on(data: Vec<u8>, drive: u32) -> Arc<Volume> {
    let sect_count = data.len() as u64 / 512;
    Arc::new(Volume::new_whole_disk(
        shared(MemoryDisk::new(data)),
        drive,
        false,
        8,
        Some(sect_count),
    ))
}

/// Whole-disk volume over a sparse image.
pub fn volume_sparse(data: Vec<u8>, logical_sectors: u64, drive: u32) -> Arc<Volume> {
    Arc::new(Volume::new_whole_disk(
        shared(MemoryDisk::sparse(data, logical_sectors)),
        drive,
        false,
        8,
        Some(logical_sectors),
    ))
}

/// Deterministic xorshift PRNG for fuzz-style tests.
pub struct XorShift(pub u64);

impl XorShift {
    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let v = self.next().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
    }
}
