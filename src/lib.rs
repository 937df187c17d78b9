//! Read-only volume and filesystem layer for the bootloader.
//!
//! This crate sits between the raw disk drivers and the boot logic. It
//! discovers partitions, reads byte ranges from them through a per-volume
//! cache, and opens files on ISO9660 (Rock Ridge, multi-extent) and
//! FAT12/16/32 (Long File Name) filesystems.
//!
//! # Architecture
//!
//! The implementation is layered:
//! 1. **Disk layer** - the [`disk::Disk`] seam over the firmware driver
//! 2. **Volume layer** - byte-granular cached reads, partition parsing,
//!    and the global volume index
//! 3. **Filesystem layer** - ISO9660 and FAT drivers behind a common
//!    [`fs::open`] / [`fs::FileHandle`] API
//!
//! Everything on disk is untrusted: the parsers reject impossible
//! geometry, overflowing arithmetic, and circular metadata instead of
//! walking into it.
//!
//! # Usage
//!
//! ```ignore
//! use bootfs::{disk::BlockIoDisk, volume, fs};
//!
//! // Register a disk; this probes its partition tables and filesystems.
//! let whole = volume::scan::register_disk(disk, 0, false, 8, Some(num_sects));
//!
//! // Look a volume up by any identifier and open a file on it.
//! let part = volume::index::get_by_coord(false, 0, 1).unwrap();
//! let file = fs::open(&part, "/boot/kernel").unwrap();
//! let mut buf = vec![0u8; file.size() as usize];
//! file.read(&mut buf, 0);
//! ```

#![no_std]

extern crate alloc;

pub mod config;
pub mod disk;
pub mod fs;
pub mod part;
pub mod path;
pub mod volume;

pub use disk::{Disk, DiskError};
pub use fs::{open, FileHandle};
pub use part::{part_get, PartError};
pub use volume::{Volume, VolumeError};
