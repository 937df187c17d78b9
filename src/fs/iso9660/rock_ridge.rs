// Rock Ridge name decoding.
//
// The System Use Area after each record's identifier may carry system
// use entries of the form {sig[2], length, version}; the `NM` entry
// holds the POSIX name. Without one, the ISO identifier is used with
// its `;n` version suffix stripped.

use alloc::vec::Vec;

use super::directory::{DirRecord, RECORD_HEADER_LEN};
use super::ROCK_RIDGE_MAX_FILENAME;

const NM_HEADER_LEN: usize = 5;

/// Decode the record's filename. The flag is true when the name came
/// from a Rock Ridge `NM` entry.
pub(super) fn load_name(record: &DirRecord) -> (Vec<u8>, bool) {
    let raw = record.raw();
    let name_len = record.name_len();

    if RECORD_HEADER_LEN + name_len <= raw.len() {
        let mut sysarea = &raw[RECORD_HEADER_LEN + name_len..];

        // An even identifier length is followed by one pad byte.
        if name_len % 2 == 0 {
            if sysarea.is_empty() {
                return (iso_name(record), false);
            }
            sysarea = &sysarea[1..];
        }

        if let Some(nm) = find_nm(sysarea) {
            if nm.len() >= ROCK_RIDGE_MAX_FILENAME {
                panic!("iso9660: filename size exceeded");
            }
            return (Vec::from(nm), true);
        }
    }

    (iso_name(record), false)
}

// Scan the System Use Area for an NM entry and return its payload.
fn find_nm(mut sysarea: &[u8]) -> Option<&[u8]> {
    while sysarea.len() >= 4 && sysarea[3] == 1 {
        let entry_len = sysarea[2] as usize;
        if entry_len > sysarea.len() {
            break;
        }

        if &sysarea[0..2] == b"NM" {
            if entry_len >= NM_HEADER_LEN {
                return Some(&sysarea[NM_HEADER_LEN..entry_len]);
            }
            break;
        }

        // A zero-length entry would never advance.
        if entry_len == 0 {
            break;
        }
        sysarea = &sysarea[entry_len..];
    }

    None
}

// The plain ISO identifier, stopping at the `;` (or `.;`) version
// suffix. A claimed identifier length past the record end is clamped.
fn iso_name(record: &DirRecord) -> Vec<u8> {
    let raw = record.raw();
    let mut name_len = record.name_len();

    if raw.len() < RECORD_HEADER_LEN + name_len {
        name_len = raw.len() - RECORD_HEADER_LEN;
    }

    let name = &raw[RECORD_HEADER_LEN..RECORD_HEADER_LEN + name_len];
    let mut out = Vec::new();
    for (i, &b) in name.iter().enumerate() {
        if b == b';' {
            break;
        }
        if b == b'.' && name.get(i + 1) == Some(&b';') {
            break;
        }
        out.push(b);
    }
    out
}
