//! `GptHeader`: codec plus the header validator.

use crate::consts::{
    GPT_ENTRIES_SECTORS, MAX_NUMBER_OF_ENTRIES, MAX_SIZE_OF_HEADER, MIN_NUMBER_OF_ENTRIES,
    MIN_SIZE_OF_HEADER, SIZE_OF_ENTRY, TOTAL_ENTRIES_SIZE,
};
use crate::crc32::crc32;
use crate::parse::{Deserialize, LittleEndianBytes, Serialize};
use crate::uuid::{PartUuid, UUID_SIZE};
use crate::GptError;
use alloc::vec;
use alloc::vec::Vec;

pub const SIGNATURE_EFI: [u8; 8] = *b"EFI PART";
/// Legacy Chromium OS signature literal, still accepted on read.
pub const SIGNATURE_CHROMEOS: [u8; 8] = *b"CHROMEOS";

pub const REVISION: u32 = 0x0001_0000;

const SIGNATURE_OFFSET: usize = 0;
const REVISION_OFFSET: usize = 8;
const HDR_SIZE_OFFSET: usize = 12;
const HDR_CRC32_OFFSET: usize = 16;
const HDR_CRC32_SIZE: usize = 4;
const RESERVED_OFFSET: usize = 20;
const MYLBA_OFFSET: usize = 24;
const ALTERNATE_LBA_OFFSET: usize = 32;
const FIRST_USABLE_LBA_OFFSET: usize = 40;
const LAST_USABLE_LBA_OFFSET: usize = 48;
const DISK_GUID_OFFSET: usize = 56;
const PARTITION_ENTRY_LBA_OFFSET: usize = 72;
const NUMBER_OF_PARTITION_ENTRIES_OFFSET: usize = 80;
const SIZE_OF_PARTITION_ENTRY_OFFSET: usize = 84;
const PARTITION_ENTRY_ARRAY_CRC32_OFFSET: usize = 88;

/// A parsed `GptHeader`. 92 bytes of this are meaningful on disk; the
/// rest of the 512-byte sector is zero padding that this type does not
/// model — bytes after `size` are never checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: u32,
    pub size: u32,
    pub header_crc32: u32,
    pub(crate) reserved_zero: u32,
    pub my_lba: u64,
    pub alternate_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_uuid: PartUuid,
    pub entries_lba: u64,
    pub number_of_entries: u32,
    pub size_of_entry: u32,
    pub entries_crc32: u32,
}

impl Serialize for GptHeader {
    fn serialize(&self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        bytes[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 8].copy_from_slice(&self.signature);
        bytes[REVISION_OFFSET..REVISION_OFFSET + 4].copy_from_slice(&self.revision.to_le_bytes());
        bytes[HDR_SIZE_OFFSET..HDR_SIZE_OFFSET + 4].copy_from_slice(&self.size.to_le_bytes());
        bytes[HDR_CRC32_OFFSET..HDR_CRC32_OFFSET + HDR_CRC32_SIZE]
            .copy_from_slice(&self.header_crc32.to_le_bytes());
        bytes[RESERVED_OFFSET..RESERVED_OFFSET + 4].copy_from_slice(&self.reserved_zero.to_le_bytes());
        bytes[MYLBA_OFFSET..MYLBA_OFFSET + 8].copy_from_slice(&self.my_lba.to_le_bytes());
        bytes[ALTERNATE_LBA_OFFSET..ALTERNATE_LBA_OFFSET + 8]
            .copy_from_slice(&self.alternate_lba.to_le_bytes());
        bytes[FIRST_USABLE_LBA_OFFSET..FIRST_USABLE_LBA_OFFSET + 8]
            .copy_from_slice(&self.first_usable_lba.to_le_bytes());
        bytes[LAST_USABLE_LBA_OFFSET..LAST_USABLE_LBA_OFFSET + 8]
            .copy_from_slice(&self.last_usable_lba.to_le_bytes());
        bytes[DISK_GUID_OFFSET..DISK_GUID_OFFSET + UUID_SIZE]
            .copy_from_slice(&self.disk_uuid);
        bytes[PARTITION_ENTRY_LBA_OFFSET..PARTITION_ENTRY_LBA_OFFSET + 8]
            .copy_from_slice(&self.entries_lba.to_le_bytes());
        bytes[NUMBER_OF_PARTITION_ENTRIES_OFFSET..NUMBER_OF_PARTITION_ENTRIES_OFFSET + 4]
            .copy_from_slice(&self.number_of_entries.to_le_bytes());
        bytes[SIZE_OF_PARTITION_ENTRY_OFFSET..SIZE_OF_PARTITION_ENTRY_OFFSET + 4]
            .copy_from_slice(&self.size_of_entry.to_le_bytes());
        bytes[PARTITION_ENTRY_ARRAY_CRC32_OFFSET..PARTITION_ENTRY_ARRAY_CRC32_OFFSET + 4]
            .copy_from_slice(&self.entries_crc32.to_le_bytes());
        bytes
    }
}

impl Deserialize for GptHeader {
    fn deserialize(data: &[u8]) -> Result<Self, GptError> {
        let mut ltbs = LittleEndianBytes::from(data);
        let signature = ltbs.copy_from::<8>(SIGNATURE_OFFSET);
        let revision = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let size = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let header_crc32 = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let reserved_zero = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let my_lba = ltbs.parse_u64().ok_or(GptError::InvalidHeaders)?;
        let alternate_lba = ltbs.parse_u64().ok_or(GptError::InvalidHeaders)?;
        let first_usable_lba = ltbs.parse_u64().ok_or(GptError::InvalidHeaders)?;
        let last_usable_lba = ltbs.parse_u64().ok_or(GptError::InvalidHeaders)?;
        let disk_uuid = PartUuid::try_from(&ltbs.copy_from::<UUID_SIZE>(DISK_GUID_OFFSET)[..])?;
        let entries_lba = ltbs.parse_u64().ok_or(GptError::InvalidHeaders)?;
        let number_of_entries = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let size_of_entry = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        let entries_crc32 = ltbs.parse_u32().ok_or(GptError::InvalidHeaders)?;
        Ok(Self {
            signature,
            revision,
            size,
            header_crc32,
            reserved_zero,
            my_lba,
            alternate_lba,
            first_usable_lba,
            last_usable_lba,
            disk_uuid,
            entries_lba,
            number_of_entries,
            size_of_entry,
            entries_crc32,
        })
    }
}

impl GptHeader {
    /// Recomputes the self-CRC: serialize to a scratch buffer, zero the
    /// `header_crc32` field in the copy, and CRC the first `self.size`
    /// bytes of the copy. The caller's own fields are never mutated.
    pub fn compute_crc(&self) -> u32 {
        let mut bytes = self.serialize(self.size.max(MIN_SIZE_OF_HEADER) as usize);
        bytes[HDR_CRC32_OFFSET..HDR_CRC32_OFFSET + HDR_CRC32_SIZE].fill(0);
        let len = (self.size as usize).min(bytes.len());
        crc32(&bytes[..len])
    }

    /// Recomputes and stores `self.header_crc32`.
    pub fn update_crc(&mut self) {
        self.header_crc32 = self.compute_crc();
    }
}

/// Reasons `check_header` rejects a header, kept only for `log::trace!`
/// detail in the orchestrator — the external contract is the `bool`
/// returned by [`check_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderFault {
    BadSignature,
    BadRevision,
    BadSize,
    BadCrc32,
    ReservedNonZero,
    BadEntrySize,
    BadEntryCount,
    RoleMismatch,
    BadGeometry,
}

/// Validates one header in isolation against `drive_sectors` and a
/// primary/secondary role, in a fixed cascade order where each step
/// assumes the previous ones passed.
pub(crate) fn check_header_detail(
    h: &GptHeader,
    is_secondary: bool,
    drive_sectors: u64,
) -> Result<(), HeaderFault> {
    if h.signature != SIGNATURE_EFI && h.signature != SIGNATURE_CHROMEOS {
        return Err(HeaderFault::BadSignature);
    }
    if h.revision != REVISION {
        return Err(HeaderFault::BadRevision);
    }
    if h.size < MIN_SIZE_OF_HEADER || h.size > MAX_SIZE_OF_HEADER {
        return Err(HeaderFault::BadSize);
    }
    if h.compute_crc() != h.header_crc32 {
        return Err(HeaderFault::BadCrc32);
    }
    if h.reserved_zero != 0 {
        return Err(HeaderFault::ReservedNonZero);
    }
    if h.size_of_entry != SIZE_OF_ENTRY {
        return Err(HeaderFault::BadEntrySize);
    }
    if h.number_of_entries < MIN_NUMBER_OF_ENTRIES
        || h.number_of_entries > MAX_NUMBER_OF_ENTRIES
        || (h.number_of_entries as usize) * (h.size_of_entry as usize) != TOTAL_ENTRIES_SIZE
    {
        return Err(HeaderFault::BadEntryCount);
    }
    if is_secondary {
        if h.my_lba != drive_sectors - 1 || h.entries_lba != h.my_lba - GPT_ENTRIES_SECTORS {
            return Err(HeaderFault::RoleMismatch);
        }
    } else if h.my_lba != 1 || h.entries_lba != h.my_lba + 1 {
        return Err(HeaderFault::RoleMismatch);
    }
    if h.first_usable_lba < 2 + GPT_ENTRIES_SECTORS
        || h.last_usable_lba >= drive_sectors - 1 - GPT_ENTRIES_SECTORS
        || h.first_usable_lba > h.last_usable_lba
    {
        return Err(HeaderFault::BadGeometry);
    }
    Ok(())
}

/// External contract: `check_header(h, is_secondary, drive_sectors) ->
/// bool`.
pub fn check_header(h: &GptHeader, is_secondary: bool, drive_sectors: u64) -> bool {
    check_header_detail(h, is_secondary, drive_sectors).is_ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn golden_primary(drive_sectors: u64, disk_uuid: PartUuid) -> GptHeader {
        let mut h = GptHeader {
            signature: SIGNATURE_EFI,
            revision: REVISION,
            size: 92,
            header_crc32: 0,
            reserved_zero: 0,
            my_lba: 1,
            alternate_lba: drive_sectors - 1,
            first_usable_lba: 2 + GPT_ENTRIES_SECTORS,
            last_usable_lba: drive_sectors - 1 - GPT_ENTRIES_SECTORS - 1,
            disk_uuid,
            entries_lba: 2,
            number_of_entries: MIN_NUMBER_OF_ENTRIES,
            size_of_entry: SIZE_OF_ENTRY,
            entries_crc32: 0,
        };
        h.update_crc();
        h
    }

    pub fn golden_secondary(drive_sectors: u64, disk_uuid: PartUuid) -> GptHeader {
        let mut h = GptHeader {
            signature: SIGNATURE_EFI,
            revision: REVISION,
            size: 92,
            header_crc32: 0,
            reserved_zero: 0,
            my_lba: drive_sectors - 1,
            alternate_lba: 1,
            first_usable_lba: 2 + GPT_ENTRIES_SECTORS,
            last_usable_lba: drive_sectors - 1 - GPT_ENTRIES_SECTORS - 1,
            disk_uuid,
            entries_lba: drive_sectors - 1 - GPT_ENTRIES_SECTORS,
            number_of_entries: MIN_NUMBER_OF_ENTRIES,
            size_of_entry: SIZE_OF_ENTRY,
            entries_crc32: 0,
        };
        h.update_crc();
        h
    }
}

#[cfg(test)]
mod test {
    use super::test_support::*;
    use super::*;

    const DRIVE_SECTORS: u64 = 10_000;

    #[test]
    fn golden_header_validates() {
        let h = golden_primary(DRIVE_SECTORS, PartUuid::default());
        assert!(check_header(&h, false, DRIVE_SECTORS));
    }

    #[test]
    fn rejects_bad_signature() {
        let mut h = golden_primary(DRIVE_SECTORS, PartUuid::default());
        h.signature = *b"NOT GPT!";
        assert!(!check_header(&h, false, DRIVE_SECTORS));
    }

    #[test]
    fn rejects_crc_mismatch() {
        let mut h = golden_primary(DRIVE_SECTORS, PartUuid::default());
        h.header_crc32 ^= 1;
        assert!(!check_header(&h, false, DRIVE_SECTORS));
    }

    #[test]
    fn rejects_boundary_last_usable_lba() {
        // The boundary case is rejected, not accepted.
        let mut h = golden_primary(DRIVE_SECTORS, PartUuid::default());
        h.last_usable_lba = DRIVE_SECTORS - 1 - GPT_ENTRIES_SECTORS;
        h.update_crc();
        assert!(!check_header(&h, false, DRIVE_SECTORS));
    }

    #[test]
    fn rejects_role_mismatch_when_swapped() {
        let primary = golden_primary(DRIVE_SECTORS, PartUuid::default());
        assert!(!check_header(&primary, true, DRIVE_SECTORS));
    }

    #[test]
    fn accepts_legacy_chromeos_signature() {
        let mut h = golden_primary(DRIVE_SECTORS, PartUuid::default());
        h.signature = SIGNATURE_CHROMEOS;
        h.update_crc();
        assert!(check_header(&h, false, DRIVE_SECTORS));
    }
}
