//! Physical disk read primitive.
//!
//! The rest of the crate only ever reads whole sectors through [`Disk`];
//! how those sectors are produced (AHCI, virtio, UEFI Block I/O, a memory
//! image in tests) is the driver's business.

use alloc::sync::Arc;
use core::fmt;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use spin::Mutex;

/// Errors the disk primitive can report.
///
/// The distinction matters to the retry loop in the volume reader: a
/// missing medium aborts the read, anything else is retried with a
/// smaller transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// No medium in the drive (or it was removed mid-read).
    NoMedia,
    /// Transfer failed; a smaller transfer may still succeed.
    Io,
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMedia => write!(f, "no medium in drive"),
            Self::Io => write!(f, "disk transfer failed"),
        }
    }
}

/// A sector-addressable read-only device.
pub trait Disk: Send {
    /// Native sector size in bytes (512, 2048 or 4096).
    fn sector_size(&self) -> u64;

    /// Read `buf.len() / sector_size()` consecutive sectors starting at
    /// `lba` (in native sectors) into `buf`.
    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError>;
}

/// Shared handle to an opened disk. Every volume carved out of the same
/// physical device holds a clone of the same handle.
pub type SharedDisk = Arc<Mutex<dyn Disk>>;

/// Wrap a driver into a [`SharedDisk`] handle.
pub fn shared<D: Disk + 'static>(disk: D) -> SharedDisk {
    Arc::new(Mutex::new(disk))
}

/// Adapter giving any [`gpt_disk_io::BlockIo`] device the [`Disk`] shape.
///
/// `BlockIo` errors carry no media information, so every failure is
/// reported as retryable.
pub struct BlockIoDisk<B> {
    device: B,
}

impl<B: BlockIo> BlockIoDisk<B> {
    pub fn new(device: B) -> Self {
        Self { device }
    }

    /// Get back the wrapped device.
    pub fn into_inner(self) -> B {
        self.device
    }
}

impl<B: BlockIo + Send> Disk for BlockIoDisk<B> {
    fn sector_size(&self) -> u64 {
        self.device.block_size().to_u64()
    }

    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        if buf.len() as u64 % self.sector_size() != 0 {
            return Err(DiskError::Io);
        }
        self.device
            .read_blocks(Lba(lba), buf)
            .map_err(|_| DiskError::Io)
    }
}
