//! Filesystem dispatch and the common file API.
//!
//! A volume either carries one of the known filesystems or none; `open`,
//! `label` and `guid` simply try each driver in a fixed order. ISO9660
//! goes first so optical media is recognized before the FAT probe reads
//! a blank sector 0.

pub mod fat;
pub mod iso9660;

use alloc::string::String;
use alloc::sync::Arc;

use gpt_disk_types::Guid;

use crate::volume::Volume;

enum FileKind {
    Iso9660(iso9660::IsoFile),
    Fat(fat::FatFile),
}

/// An open read-only file.
///
/// The handle owns the metadata needed for O(1) block lookup (extent
/// list or cluster chain); dropping it releases that memory. There is no
/// separate close operation.
pub struct FileHandle {
    kind: FileKind,
    vol: Arc<Volume>,
    size: u64,
}

impl FileHandle {
    /// File size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The volume this file lives on.
    pub fn volume(&self) -> &Arc<Volume> {
        &self.vol
    }

    /// Read `buf.len()` bytes starting at byte `loc` of the file.
    ///
    /// The range must lie within [`size`](Self::size): the file's
    /// metadata was validated at open time, so a failure mid-read means
    /// the medium changed under us, and that is a panic.
    pub fn read(&self, buf: &mut [u8], loc: u64) {
        match &self.kind {
            FileKind::Iso9660(f) => f.read(&self.vol, buf, loc),
            FileKind::Fat(f) => f.read(&self.vol, buf, loc),
        }
    }
}

/// Open `path` on `volume`, trying each known filesystem.
pub fn open(volume: &Arc<Volume>, path: &str) -> Option<FileHandle> {
    if let Some(file) = iso9660::open(volume, path) {
        let size = file.size();
        return Some(FileHandle {
            kind: FileKind::Iso9660(file),
            vol: Arc::clone(volume),
            size,
        });
    }

    if let Some(file) = fat::open(volume, path) {
        let size = file.size();
        return Some(FileHandle {
            kind: FileKind::Fat(file),
            vol: Arc::clone(volume),
            size,
        });
    }

    None
}

/// The filesystem label of `volume`, if it carries a labeled filesystem.
pub fn label(volume: &Volume) -> Option<String> {
    if let Some(label) = iso9660::label(volume) {
        return Some(label);
    }
    fat::label(volume)
}

/// The filesystem UUID of `volume`.
///
/// Neither supported filesystem records a 16-byte UUID in its superblock
/// (FAT's 32-bit serial is too short), so this is a miss for now and
/// GUID lookups are served by the GPT unique partition GUID.
pub fn guid(volume: &Volume) -> Option<Guid> {
    let _ = volume;
    None
}
