// Directory record scanning.
//
// Records are variable length and never cross a 2048-byte sector
// boundary; a zero length byte means the rest of the sector is padding.

use crate::config;

use super::rock_ridge;
use super::SECTOR_SIZE;

// Fixed part of a directory record, up to and including the file
// identifier length byte.
pub(super) const RECORD_HEADER_LEN: usize = 33;

/// Borrowed view of one directory record.
pub(super) struct DirRecord<'a> {
    raw: &'a [u8],
}

impl<'a> DirRecord<'a> {
    /// View the record starting at `pos`. Fails when the claimed length
    /// is shorter than a record header or runs past the buffer.
    pub fn parse(buf: &'a [u8], pos: usize) -> Option<Self> {
        let length = *buf.get(pos)? as usize;
        if length < RECORD_HEADER_LEN || pos + length > buf.len() {
            return None;
        }
        Some(Self {
            raw: &buf[pos..pos + length],
        })
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Extent location, in 2048-byte sectors.
    pub fn extent_lba(&self) -> u32 {
        u32::from_le_bytes([self.raw[2], self.raw[3], self.raw[4], self.raw[5]])
    }

    /// Extent length in bytes.
    pub fn extent_size(&self) -> u32 {
        u32::from_le_bytes([self.raw[10], self.raw[11], self.raw[12], self.raw[13]])
    }

    pub fn flags(&self) -> u8 {
        self.raw[25]
    }

    /// Claimed file identifier length; may exceed the record itself on
    /// corrupted media.
    pub fn name_len(&self) -> usize {
        self.raw[32] as usize
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Scan the directory buffer for an entry named `filename`.
///
/// Rock Ridge names compare exactly (unless the global case-insensitive
/// flag is set); plain ISO names always compare case-insensitively.
/// Returns the record's position in the buffer.
pub(super) fn find(buf: &[u8], filename: &[u8]) -> Option<usize> {
    let mut pos: usize = 0;
    let mut size: usize = buf.len();

    while size > 0 {
        let length = buf[pos] as usize;

        if length == 0 {
            // Padding; skip to the next sector boundary.
            if size <= SECTOR_SIZE {
                return None;
            }
            let prev_size = size;
            size &= !(SECTOR_SIZE - 1);
            if prev_size == size {
                if size <= SECTOR_SIZE {
                    return None;
                }
                size -= SECTOR_SIZE;
                pos += SECTOR_SIZE;
            } else {
                pos += prev_size - size;
            }
            continue;
        }

        if length > size || length < RECORD_HEADER_LEN {
            // Corrupted directory entry.
            return None;
        }

        let record = DirRecord {
            raw: &buf[pos..pos + length],
        };
        let (name, rock_ridge) = rock_ridge::load_name(&record);

        let matched = if rock_ridge && !config::case_insensitive_fopen() {
            name == filename
        } else {
            name.eq_ignore_ascii_case(filename)
        };
        if matched {
            return Some(pos);
        }

        size -= length;
        pos += length;
    }

    None
}

/// Position of the directory entry after the one at `pos`, skipping
/// sector padding. `None` at the end of the buffer or on a corrupted
/// record.
pub(super) fn next_entry(buf: &[u8], pos: usize) -> Option<usize> {
    let length = buf[pos] as usize;

    if length == 0 {
        let next = align_up(pos + 1, SECTOR_SIZE);
        if next >= buf.len() || buf[next] == 0 {
            return None;
        }
        return Some(next);
    }

    let mut next = pos + length;
    if next >= buf.len() {
        return None;
    }

    if buf[next] == 0 {
        let aligned = align_up(next + 1, SECTOR_SIZE);
        if aligned >= buf.len() {
            return None;
        }
        next = aligned;
        if buf[next] == 0 {
            return None;
        }
    }

    if (buf[next] as usize) < RECORD_HEADER_LEN {
        return None;
    }

    Some(next)
}
