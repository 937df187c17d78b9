//! ISO9660 image builder.
//!
//! Lays out a minimal but standard-shaped image: PVD at LBA 16,
//! terminator at 17, then directories and file content from LBA 18 up.

const SECTOR: usize = 2048;

pub struct IsoBuilder {
    regions: Vec<(u32, Vec<u8>)>,
    next_free_lba: u32,
    volume_id: [u8; 32],
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            next_free_lba: 18, // 16 = PVD, 17 = terminator
            volume_id: *b"TEST VOLUME                     ",
        }
    }

    pub fn volume_id(&mut self, id: &str) {
        self.volume_id = [b' '; 32];
        self.volume_id[..id.len()].copy_from_slice(id.as_bytes());
    }

    /// Place `content` at the next free LBA and return it.
    pub fn store(&mut self, content: &[u8]) -> u32 {
        let lba = self.next_free_lba;
        let sectors = content.len().div_ceil(SECTOR).max(1);
        self.regions.push((lba, content.to_vec()));
        self.next_free_lba += sectors as u32;
        lba
    }

    /// Assemble the image with `root_dir` as the root directory extent.
    pub fn build(mut self, root_dir: &[u8]) -> Vec<u8> {
        let root_lba = self.store(root_dir);
        let root_size = root_dir.len() as u32;
        let total_sectors = self.next_free_lba as usize;

        let mut data = vec![0u8; total_sectors * SECTOR];

        // Primary Volume Descriptor.
        let pvd = 16 * SECTOR;
        data[pvd] = 1;
        data[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
        data[pvd + 6] = 1;
        data[pvd + 40..pvd + 72].copy_from_slice(&self.volume_id);
        write_both_u32(&mut data[pvd + 80..], total_sectors as u32);
        write_both_u16(&mut data[pvd + 128..], SECTOR as u16);

        // Root directory record inside the PVD.
        let root = pvd + 156;
        data[root] = 34;
        write_both_u32(&mut data[root + 2..], root_lba);
        write_both_u32(&mut data[root + 10..], root_size);
        data[root + 25] = 0x02;
        data[root + 32] = 1;
        data[root + 33] = 0;

        // Set terminator.
        let term = 17 * SECTOR;
        data[term] = 255;
        data[term + 1..term + 6].copy_from_slice(b"CD001");
        data[term + 6] = 1;

        for (lba, content) in &self.regions {
            let offset = *lba as usize * SECTOR;
            data[offset..offset + content.len()].copy_from_slice(content);
        }

        data
    }
}

fn write_both_u16(dst: &mut [u8], value: u16) {
    dst[0..2].copy_from_slice(&value.to_le_bytes());
    dst[2..4].copy_from_slice(&value.to_be_bytes());
}

fn write_both_u32(dst: &mut [u8], value: u32) {
    dst[0..4].copy_from_slice(&value.to_le_bytes());
    dst[4..8].copy_from_slice(&value.to_be_bytes());
}

/// One directory record, with an optional Rock Ridge NM entry in the
/// System Use Area.
pub fn dir_record(name: &[u8], lba: u32, size: u32, flags: u8, nm: Option<&[u8]>) -> Vec<u8> {
    let mut sua = Vec::new();
    if let Some(nm_name) = nm {
        sua.push(b'N');
        sua.push(b'M');
        sua.push((5 + nm_name.len()) as u8);
        sua.push(1); // version
        sua.push(0); // flags
        sua.extend_from_slice(nm_name);
    }

    let pad = if name.len() % 2 == 0 { 1 } else { 0 };
    let length = 33 + name.len() + pad + sua.len();
    assert!(length <= 255, "directory record too long");

    let mut record = vec![0u8; length];
    record[0] = length as u8;
    write_both_u32(&mut record[2..], lba);
    write_both_u32(&mut record[10..], size);
    record[25] = flags;
    record[32] = name.len() as u8;
    record[33..33 + name.len()].copy_from_slice(name);
    record[33 + name.len() + pad..].copy_from_slice(&sua);

    record
}

/// A directory extent: `.` and `..` records followed by `records`,
/// zero-padded to a sector multiple.
pub fn directory(self_lba: u32, records: &[Vec<u8>]) -> Vec<u8> {
    let mut dir = Vec::new();
    dir.extend_from_slice(&dir_record(b"\0", self_lba, SECTOR as u32, 0x02, None));
    dir.extend_from_slice(&dir_record(b"\x01", self_lba, SECTOR as u32, 0x02, None));
    for record in records {
        // Records never straddle a sector boundary.
        let next = dir.len() % SECTOR + record.len();
        if next > SECTOR {
            dir.resize(dir.len().div_ceil(SECTOR) * SECTOR, 0);
        }
        dir.extend_from_slice(record);
    }
    dir.resize(dir.len().div_ceil(SECTOR) * SECTOR, 0);
    dir
}
