//! ISO9660 driver.
//!
//! Volume descriptors are scanned from LBA 16 for the Primary Volume
//! Descriptor; the root directory it names is read once per volume and
//! shared across opens. Directory records carry Rock Ridge `NM` names in
//! their System Use Area when the image was mastered with them, and
//! large files may be split over several extents flagged multi-extent.

mod directory;
mod rock_ridge;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::volume::Volume;

use directory::DirRecord;

const SECTOR_SIZE: usize = 2048;

const FIRST_VOLUME_DESCRIPTOR: u64 = 16;
// Descriptor scan and directory size limits; past these the metadata is
// considered hostile.
const MAX_VOLUME_DESCRIPTORS: u64 = 256;
const MAX_DIR_SIZE: u32 = 64 * 1024 * 1024;
const MAX_EXTENT_COUNT: usize = 65536;

const ROCK_RIDGE_MAX_FILENAME: usize = 255;

const FLAG_MULTI_EXTENT: u8 = 0x80;

const VDT_PRIMARY: u8 = 1;
const VDT_TERMINATOR: u8 = 255;

// What the Primary Volume Descriptor gives us.
struct PrimaryVolume {
    volume_id: [u8; 32],
    root_lba: u32,
    root_size: u32,
}

enum PvdError {
    ReadFailed,
    NoPrimary,
    SearchExhausted,
}

// Per-volume cached root directory, shared across opens and kept for
// the lifetime of the process.
struct IsoContext {
    vol: Arc<Volume>,
    root: Vec<u8>,
}

static CONTEXTS: Mutex<Vec<Arc<IsoContext>>> = Mutex::new(Vec::new());

/// An open ISO9660 file: its extent list in read order.
pub struct IsoFile {
    total_size: u64,
    extents: Vec<Extent>,
}

#[derive(Clone, Copy)]
struct Extent {
    lba: u32,
    size: u32,
}

fn signature_ok(vol: &Volume) -> bool {
    let mut sig = [0u8; 5];
    let offset = FIRST_VOLUME_DESCRIPTOR * SECTOR_SIZE as u64 + 1;
    if vol.read(&mut sig, offset).is_err() {
        return false;
    }
    &sig == b"CD001"
}

fn find_pvd(vol: &Volume) -> Result<PrimaryVolume, PvdError> {
    let mut lba = FIRST_VOLUME_DESCRIPTOR;
    let max_lba = FIRST_VOLUME_DESCRIPTOR + MAX_VOLUME_DESCRIPTORS;

    let mut desc = [0u8; SECTOR_SIZE];
    while lba < max_lba {
        vol.read(&mut desc, lba * SECTOR_SIZE as u64)
            .map_err(|_| PvdError::ReadFailed)?;

        match desc[0] {
            VDT_PRIMARY => {
                let mut volume_id = [0u8; 32];
                volume_id.copy_from_slice(&desc[40..72]);
                // The root directory record sits at offset 156.
                return Ok(PrimaryVolume {
                    volume_id,
                    root_lba: u32::from_le_bytes(desc[158..162].try_into().unwrap()),
                    root_size: u32::from_le_bytes(desc[166..170].try_into().unwrap()),
                });
            }
            VDT_TERMINATOR => return Err(PvdError::NoPrimary),
            _ => {}
        }

        lba += 1;
    }

    Err(PvdError::SearchExhausted)
}

fn cache_root(vol: &Volume) -> Vec<u8> {
    let pv = match find_pvd(vol) {
        Ok(pv) => pv,
        Err(PvdError::ReadFailed) => panic!("iso9660: failed to read volume descriptor"),
        Err(PvdError::NoPrimary) => panic!("iso9660: no primary volume descriptor"),
        Err(PvdError::SearchExhausted) => {
            panic!("iso9660: exceeded maximum volume descriptor search limit")
        }
    };

    if pv.root_size == 0 || pv.root_size > MAX_DIR_SIZE {
        panic!("iso9660: invalid root directory size");
    }

    let mut root = vec![0u8; pv.root_size as usize];
    if vol
        .read(&mut root, pv.root_lba as u64 * SECTOR_SIZE as u64)
        .is_err()
    {
        panic!("iso9660: failed to read root directory");
    }

    root
}

fn get_context(vol: &Arc<Volume>) -> Arc<IsoContext> {
    let mut contexts = CONTEXTS.lock();

    for ctx in contexts.iter() {
        if Arc::ptr_eq(&ctx.vol, vol) {
            return Arc::clone(ctx);
        }
    }

    let ctx = Arc::new(IsoContext {
        vol: Arc::clone(vol),
        root: cache_root(vol),
    });
    contexts.push(Arc::clone(&ctx));
    ctx
}

/// Open `path` if `vol` carries an ISO9660 filesystem.
pub(super) fn open(vol: &Arc<Volume>, path: &str) -> Option<IsoFile> {
    if !signature_ok(vol) {
        return None;
    }

    let context = get_context(vol);

    let mut path = path.as_bytes();
    // Directory buffers below the root are loaded per walk step and
    // dropped on descent; the root stays with the context.
    let mut owned: Option<Vec<u8>> = None;
    let mut next_sector: u32 = 0;
    let mut next_size: u32 = 0;

    loop {
        while path.first() == Some(&b'/') {
            path = &path[1..];
        }

        if path.is_empty() {
            if owned.is_none() {
                // Bare "/" names the root, which is not a file.
                return None;
            }
            break;
        }

        let comp_len = path
            .iter()
            .position(|&b| b == b'/')
            .unwrap_or(path.len());
        if comp_len >= ROCK_RIDGE_MAX_FILENAME {
            panic!("iso9660: path component exceeds maximum length");
        }
        let component = &path[..comp_len];
        let rest = &path[comp_len..];

        let buf: &[u8] = owned.as_deref().unwrap_or(&context.root);
        let pos = directory::find(buf, component)?;
        let record = DirRecord::parse(buf, pos)?;

        next_sector = record.extent_lba();
        next_size = record.extent_size();

        if rest.is_empty() {
            return Some(collect_extents(buf, pos));
        }

        path = rest;

        if next_size == 0 || next_size > MAX_DIR_SIZE {
            return None;
        }
        let mut dir = vec![0u8; next_size as usize];
        vol.read(&mut dir, next_sector as u64 * SECTOR_SIZE as u64)
            .ok()?;
        owned = Some(dir);
    }

    // Trailing slash: the path named a directory; hand back its single
    // extent as the file body.
    Some(IsoFile {
        total_size: next_size as u64,
        extents: vec![Extent {
            lba: next_sector,
            size: next_size,
        }],
    })
}

// Gather the matched record's extent plus, when it is flagged
// multi-extent, the consecutive continuation records.
fn collect_extents(buf: &[u8], mut pos: usize) -> IsoFile {
    let mut extents = Vec::new();
    let mut total_size: u64 = 0;

    loop {
        let Some(record) = DirRecord::parse(buf, pos) else {
            break;
        };
        extents.push(Extent {
            lba: record.extent_lba(),
            size: record.extent_size(),
        });
        total_size += record.extent_size() as u64;

        // Cap against runaway lists on corrupted directories.
        if extents.len() >= MAX_EXTENT_COUNT {
            break;
        }
        if record.flags() & FLAG_MULTI_EXTENT == 0 {
            break;
        }
        match directory::next_entry(buf, pos) {
            Some(next) => pos = next,
            None => break,
        }
    }

    IsoFile {
        total_size,
        extents,
    }
}

/// The volume identifier from the PVD, trailing spaces trimmed.
pub(super) fn label(vol: &Volume) -> Option<String> {
    if !signature_ok(vol) {
        return None;
    }
    let pv = find_pvd(vol).ok()?;

    let id = &pv.volume_id;
    let end = id.iter().rposition(|&b| b != b' ')? + 1;
    let label = core::str::from_utf8(&id[..end]).ok()?;
    Some(String::from(label))
}

impl IsoFile {
    pub(super) fn size(&self) -> u64 {
        self.total_size
    }

    // Read across the extent list; `loc` and the extents were validated
    // at open time, so an I/O failure here is fatal.
    pub(super) fn read(&self, vol: &Volume, buf: &mut [u8], mut loc: u64) {
        let mut extent_start: u64 = 0;
        let mut progress: usize = 0;

        for extent in &self.extents {
            if progress >= buf.len() {
                break;
            }

            let extent_size = extent.size as u64;
            let extent_end = extent_start + extent_size;

            if loc < extent_end {
                let offset_in_extent = loc.saturating_sub(extent_start);
                let bytes_available = extent_size - offset_in_extent;
                let remaining = (buf.len() - progress) as u64;
                let to_read = remaining.min(bytes_available) as usize;

                let disk_offset = extent.lba as u64 * SECTOR_SIZE as u64 + offset_in_extent;
                if vol
                    .read(&mut buf[progress..progress + to_read], disk_offset)
                    .is_err()
                {
                    panic!("iso9660: failed to read file data");
                }

                progress += to_read;
                loc += to_read as u64;
            }

            extent_start = extent_end;
        }
    }
}
