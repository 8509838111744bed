//! `GptEntry`: codec, entry-table validator, and Chromium OS attribute
//! accessors.

use crate::consts::{SIZE_OF_ENTRY, TOTAL_ENTRIES_SIZE};
use crate::crc32::crc32;
use crate::header::GptHeader;
use crate::parse::{Deserialize, LittleEndianBytes, Serialize};
use crate::uuid::{PartUuid, GPT_ENT_TYPE_CHROMEOS_KERNEL, UUID_SIZE, ZERO_GUID};
use crate::GptError;
use alloc::vec;
use alloc::vec::Vec;

const PART_TYPE_GUID_OFFSET: usize = 0;
const PART_GUID_OFFSET: usize = 16;
const STARTING_LBA_OFFSET: usize = 32;
const ENDING_LBA_OFFSET: usize = 40;
const ATTRIBUTES_OFFSET: usize = 48;
const PART_NAME_OFFSET: usize = 56;
const PART_NAME_SIZE: usize = 72;

/// One 128-byte partition entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptEntry {
    /// GUID of the partition type; `ZERO_GUID` marks the slot unused.
    pub part_type_guid: PartUuid,
    /// GUID unique to this partition.
    pub unique_guid: PartUuid,
    /// First LBA of the partition (inclusive).
    pub starting_lba: u64,
    /// Last LBA of the partition (inclusive).
    pub ending_lba: u64,
    /// Raw 64-bit attribute word; see the `attr_*` accessors below.
    pub attributes: u64,
    /// UTF-16LE partition name, not interpreted by this crate.
    pub name: [u8; PART_NAME_SIZE],
}

impl Default for GptEntry {
    fn default() -> Self {
        Self {
            part_type_guid: PartUuid::default(),
            unique_guid: PartUuid::default(),
            starting_lba: 0,
            ending_lba: 0,
            attributes: 0,
            name: [0; PART_NAME_SIZE],
        }
    }
}

impl Serialize for GptEntry {
    fn serialize(&self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        bytes[PART_TYPE_GUID_OFFSET..PART_TYPE_GUID_OFFSET + UUID_SIZE]
            .copy_from_slice(&self.part_type_guid);
        bytes[PART_GUID_OFFSET..PART_GUID_OFFSET + UUID_SIZE].copy_from_slice(&self.unique_guid);
        bytes[STARTING_LBA_OFFSET..STARTING_LBA_OFFSET + 8]
            .copy_from_slice(&self.starting_lba.to_le_bytes());
        bytes[ENDING_LBA_OFFSET..ENDING_LBA_OFFSET + 8]
            .copy_from_slice(&self.ending_lba.to_le_bytes());
        bytes[ATTRIBUTES_OFFSET..ATTRIBUTES_OFFSET + 8]
            .copy_from_slice(&self.attributes.to_le_bytes());
        bytes[PART_NAME_OFFSET..PART_NAME_OFFSET + PART_NAME_SIZE].copy_from_slice(&self.name);
        bytes
    }
}

impl Deserialize for GptEntry {
    fn deserialize(data: &[u8]) -> Result<Self, GptError> {
        let mut ltbs = LittleEndianBytes::from(data);
        let part_type_guid =
            PartUuid::try_from(&ltbs.copy_from::<UUID_SIZE>(PART_TYPE_GUID_OFFSET)[..])?;
        let unique_guid = PartUuid::try_from(&ltbs.copy_from::<UUID_SIZE>(PART_GUID_OFFSET)[..])?;
        let starting_lba = ltbs.parse_u64().ok_or(GptError::InvalidEntries)?;
        let ending_lba = ltbs.parse_u64().ok_or(GptError::InvalidEntries)?;
        let attributes = ltbs.parse_u64().ok_or(GptError::InvalidEntries)?;
        let name = ltbs.copy_from::<PART_NAME_SIZE>(PART_NAME_OFFSET);
        Ok(Self {
            part_type_guid,
            unique_guid,
            starting_lba,
            ending_lba,
            attributes,
            name,
        })
    }
}

/// An entry whose `type` GUID is the zero GUID is unused.
pub fn is_unused_entry(e: &GptEntry) -> bool {
    e.part_type_guid == ZERO_GUID
}

/// An entry whose `type` GUID equals `GPT_ENT_TYPE_CHROMEOS_KERNEL`.
pub fn is_kernel_entry(e: &GptEntry) -> bool {
    e.part_type_guid == GPT_ENT_TYPE_CHROMEOS_KERNEL
}

// --- Chromium OS attribute word --------------------------------------
//
// Bit 2 of the whole 64-bit word is LEGACY_BOOTABLE. The high 16 bits
// (48..63) are the Chromium OS `gpt_att` sub-field: PRIORITY occupies
// bits 48..51, TRIES bits 52..55, SUCCESSFUL bit 56; bits 57..63 are
// reserved. These offsets are a persisted on-disk format and must not
// move.

const LEGACY_BOOTABLE_BIT: u32 = 2;

const PRIORITY_OFFSET: u32 = 48;
const PRIORITY_BITS: u64 = 0xF;

const TRIES_OFFSET: u32 = 52;
const TRIES_BITS: u64 = 0xF;

const SUCCESSFUL_OFFSET: u32 = 56;
const SUCCESSFUL_BITS: u64 = 0x1;

impl GptEntry {
    pub fn is_unused(&self) -> bool {
        is_unused_entry(self)
    }

    pub fn is_kernel(&self) -> bool {
        is_kernel_entry(self)
    }

    pub fn legacy_bootable(&self) -> bool {
        (self.attributes >> LEGACY_BOOTABLE_BIT) & 1 != 0
    }

    pub fn set_legacy_bootable(&mut self, value: bool) {
        let mask = 1u64 << LEGACY_BOOTABLE_BIT;
        self.attributes = (self.attributes & !mask) | ((value as u64) << LEGACY_BOOTABLE_BIT);
    }

    pub fn priority(&self) -> u8 {
        ((self.attributes >> PRIORITY_OFFSET) & PRIORITY_BITS) as u8
    }

    pub fn set_priority(&mut self, value: u8) {
        let mask = PRIORITY_BITS << PRIORITY_OFFSET;
        self.attributes =
            (self.attributes & !mask) | (((value as u64) & PRIORITY_BITS) << PRIORITY_OFFSET);
    }

    pub fn tries(&self) -> u8 {
        ((self.attributes >> TRIES_OFFSET) & TRIES_BITS) as u8
    }

    pub fn set_tries(&mut self, value: u8) {
        let mask = TRIES_BITS << TRIES_OFFSET;
        self.attributes =
            (self.attributes & !mask) | (((value as u64) & TRIES_BITS) << TRIES_OFFSET);
    }

    pub fn successful(&self) -> bool {
        (self.attributes >> SUCCESSFUL_OFFSET) & SUCCESSFUL_BITS != 0
    }

    pub fn set_successful(&mut self, value: bool) {
        let mask = SUCCESSFUL_BITS << SUCCESSFUL_OFFSET;
        self.attributes =
            (self.attributes & !mask) | (((value as u64) & SUCCESSFUL_BITS) << SUCCESSFUL_OFFSET);
    }
}

/// The entries of one copy of the entry array, parsed out of its
/// 16384-byte sector buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTable {
    pub entries: Vec<GptEntry>,
}

impl EntryTable {
    pub(crate) fn parse(data: &[u8], entry_size: usize) -> Result<Self, GptError> {
        let count = data.len() / entry_size;
        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let start = index * entry_size;
            entries.push(GptEntry::deserialize(&data[start..start + entry_size])?);
        }
        Ok(Self { entries })
    }

    pub(crate) fn serialize_into(&self, entry_size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; self.entries.len() * entry_size];
        for (index, entry) in self.entries.iter().enumerate() {
            let start = index * entry_size;
            bytes[start..start + entry_size].copy_from_slice(&entry.serialize(entry_size));
        }
        bytes
    }
}

/// CRC-checks `entries_bytes` against `header`, then walks every used
/// entry checking region containment, then pairwise overlap and
/// duplicate-GUID, in that exact order — the order is part of the
/// external contract, since it determines which error code a broken
/// table reports.
pub(crate) fn check_entries(entries_bytes: &[u8], header: &GptHeader) -> Result<(), GptError> {
    let span = ((header.number_of_entries as usize) * (header.size_of_entry as usize))
        .min(entries_bytes.len());
    if crc32(&entries_bytes[..span]) != header.entries_crc32 {
        return Err(GptError::CrcCorrupted);
    }

    let table = EntryTable::parse(&entries_bytes[..span], header.size_of_entry as usize)
        .map_err(|_| GptError::CrcCorrupted)?;

    for (i, e) in table.entries.iter().enumerate() {
        if is_unused_entry(e) {
            continue;
        }
        if e.starting_lba < header.first_usable_lba
            || e.ending_lba > header.last_usable_lba
            || e.starting_lba > e.ending_lba
        {
            return Err(GptError::OutOfRegion);
        }
        for (j, other) in table.entries.iter().enumerate() {
            if i == j || is_unused_entry(other) {
                continue;
            }
            let starts_inside = e.starting_lba >= other.starting_lba && e.starting_lba <= other.ending_lba;
            let other_starts_inside =
                other.starting_lba >= e.starting_lba && other.starting_lba <= e.ending_lba;
            if starts_inside || other_starts_inside {
                return Err(GptError::StartLbaOverlap);
            }
            if e.ending_lba >= other.starting_lba && e.ending_lba <= other.ending_lba {
                return Err(GptError::EndLbaOverlap);
            }
            if e.unique_guid == other.unique_guid {
                return Err(GptError::DupGuid);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(type_guid: PartUuid, unique: PartUuid, start: u64, end: u64) -> GptEntry {
        GptEntry {
            part_type_guid: type_guid,
            unique_guid: unique,
            starting_lba: start,
            ending_lba: end,
            attributes: 0,
            name: [0; PART_NAME_SIZE],
        }
    }

    fn nonzero(byte: u8) -> PartUuid {
        PartUuid::from([byte; UUID_SIZE])
    }

    fn bytes_and_header(entries: &[GptEntry]) -> (Vec<u8>, GptHeader) {
        let size_of_entry = SIZE_OF_ENTRY as usize;
        let mut bytes = vec![0u8; TOTAL_ENTRIES_SIZE];
        for (i, e) in entries.iter().enumerate() {
            let start = i * size_of_entry;
            bytes[start..start + size_of_entry].copy_from_slice(&e.serialize(size_of_entry));
        }
        let mut h = crate::header::test_support::golden_primary(10_000, PartUuid::default());
        h.entries_crc32 = crc32(&bytes);
        h.update_crc();
        (bytes, h)
    }

    #[test]
    fn accepts_disjoint_entries() {
        let entries = vec![
            entry(nonzero(1), nonzero(0xA1), 100, 199),
            entry(nonzero(1), nonzero(0xA2), 200, 999),
        ];
        let (bytes, header) = bytes_and_header(&entries);
        assert_eq!(check_entries(&bytes, &header), Ok(()));
    }

    #[test]
    fn detects_start_lba_overlap() {
        let entries = vec![
            entry(nonzero(1), nonzero(0xA1), 100, 200),
            entry(nonzero(1), nonzero(0xA2), 150, 300),
        ];
        let (bytes, header) = bytes_and_header(&entries);
        assert_eq!(check_entries(&bytes, &header), Err(GptError::StartLbaOverlap));
    }

    #[test]
    fn detects_dup_guid() {
        let entries = vec![
            entry(nonzero(1), nonzero(0xA1), 100, 199),
            entry(nonzero(1), nonzero(0xA1), 200, 999),
        ];
        let (bytes, header) = bytes_and_header(&entries);
        assert_eq!(check_entries(&bytes, &header), Err(GptError::DupGuid));
    }

    #[test]
    fn detects_out_of_region() {
        let entries = vec![entry(nonzero(1), nonzero(0xA1), 0, 5)];
        let (bytes, header) = bytes_and_header(&entries);
        assert_eq!(check_entries(&bytes, &header), Err(GptError::OutOfRegion));
    }

    #[test]
    fn detects_crc_mismatch() {
        let entries = vec![entry(nonzero(1), nonzero(0xA1), 100, 199)];
        let (bytes, mut header) = bytes_and_header(&entries);
        header.entries_crc32 ^= 1;
        assert_eq!(check_entries(&bytes, &header), Err(GptError::CrcCorrupted));
    }

    #[test]
    fn attribute_roundtrip() {
        let mut e = GptEntry::default();
        e.set_priority(9);
        e.set_tries(5);
        e.set_successful(true);
        e.set_legacy_bootable(true);
        assert_eq!(e.priority(), 9);
        assert_eq!(e.tries(), 5);
        assert!(e.successful());
        assert!(e.legacy_bootable());

        e.set_priority(0);
        assert_eq!(e.priority(), 0);
        assert_eq!(e.tries(), 5, "unrelated fields must not move");
        assert!(e.successful());
    }

    #[test]
    fn is_kernel_and_unused_predicates() {
        let unused = GptEntry::default();
        assert!(is_unused_entry(&unused));
        assert!(!is_kernel_entry(&unused));

        let kernel = entry(GPT_ENT_TYPE_CHROMEOS_KERNEL, nonzero(1), 0, 0);
        assert!(is_kernel_entry(&kernel));
        assert!(!is_unused_entry(&kernel));
    }
}
