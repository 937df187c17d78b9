//! GPT and MBR on-disk builders.

pub struct GptPart {
    pub starting_lba: u64,
    pub ending_lba: u64,
    pub unique_guid: [u8; 16],
}

/// A GPT disk image: header at LBA 1, entries at LBA 2, `total_lbs`
/// logical blocks of `lb_size` bytes.
pub fn gpt_disk(lb_size: usize, total_lbs: usize, disk_guid: [u8; 16], parts: &[GptPart]) -> Vec<u8> {
    let mut data = vec![0u8; total_lbs * lb_size];
    write_gpt_header(&mut data, lb_size, disk_guid, parts.len() as u32, 128);

    for (i, part) in parts.iter().enumerate() {
        let offset = 2 * lb_size + i * 128;
        let entry = &mut data[offset..offset + 128];
        entry[0] = 0xee; // any non-zero type GUID
        entry[16..32].copy_from_slice(&part.unique_guid);
        entry[32..40].copy_from_slice(&part.starting_lba.to_le_bytes());
        entry[40..48].copy_from_slice(&part.ending_lba.to_le_bytes());
    }

    data
}

/// Write a GPT header at LBA 1 with explicit entry geometry.
pub fn write_gpt_header(
    data: &mut [u8],
    lb_size: usize,
    disk_guid: [u8; 16],
    num_entries: u32,
    entry_size: u32,
) {
    write_gpt_header_at(data, lb_size, disk_guid, 2, num_entries, entry_size);
}

pub fn write_gpt_header_at(
    data: &mut [u8],
    lb_size: usize,
    disk_guid: [u8; 16],
    entry_lba: u64,
    num_entries: u32,
    entry_size: u32,
) {
    let header = &mut data[lb_size..lb_size + 92];
    header[0..8].copy_from_slice(b"EFI PART");
    header[8..12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
    header[12..16].copy_from_slice(&92u32.to_le_bytes());
    header[56..72].copy_from_slice(&disk_guid);
    header[72..80].copy_from_slice(&entry_lba.to_le_bytes());
    header[80..84].copy_from_slice(&num_entries.to_le_bytes());
    header[84..88].copy_from_slice(&entry_size.to_le_bytes());
}

/// Write one MBR-format entry (status, CHS fields zero) at `offset`.
pub fn write_mbr_entry(data: &mut [u8], offset: usize, kind: u8, first_sect: u32, sect_count: u32) {
    let entry = &mut data[offset..offset + 16];
    entry[0] = 0x00;
    entry[4] = kind;
    entry[8..12].copy_from_slice(&first_sect.to_le_bytes());
    entry[12..16].copy_from_slice(&sect_count.to_le_bytes());
}

/// Write a primary entry into slot 0-3 of the boot sector.
pub fn write_primary(data: &mut [u8], slot: usize, kind: u8, first_sect: u32, sect_count: u32) {
    write_mbr_entry(data, 0x1be + slot * 16, kind, first_sect, sect_count);
}

pub fn write_mbr_disk_id(data: &mut [u8], id: u32) {
    data[0x1b8..0x1bc].copy_from_slice(&id.to_le_bytes());
}
