//! `GptData`: the caller-owned working set for one validation/repair
//! call.
//!
//! A C implementation of this would pass raw pointers the caller owns
//! for the duration of the call. Rust has no equivalent without unsafe,
//! so this crate borrows the four buffers as `&mut [u8]` slices sized
//! exactly to the four fixed constants and rejects the wrong size at
//! construction.

use crate::consts::{SECTOR_BYTES, TOTAL_ENTRIES_SIZE};
use crate::mask::{Modified, Validity};
use crate::GptError;

/// Bytes in one header sector.
pub const HEADER_BYTES: usize = 512;
/// Bytes in one copy of the entry array.
pub const ENTRIES_BYTES: usize = TOTAL_ENTRIES_SIZE;

/// The working set for one call: both header sectors, both entry-array
/// buffers, the validity/modified bitmasks, and the caller's selected
/// kernel index.
pub struct GptData<'a> {
    pub sector_bytes: u32,
    pub drive_sectors: u64,
    pub primary_header: &'a mut [u8],
    pub secondary_header: &'a mut [u8],
    pub primary_entries: &'a mut [u8],
    pub secondary_entries: &'a mut [u8],
    pub valid_headers: Validity,
    pub valid_entries: Validity,
    pub modified: Modified,
    /// Index into the entry array the caller has selected for boot.
    /// Only dereferenced by [`get_current_kernel_unique_guid`](crate::get_current_kernel_unique_guid)
    /// — the validator never indexes by it.
    pub current_kernel: usize,
}

impl<'a> GptData<'a> {
    /// Builds a working set over caller-owned buffers, rejecting
    /// buffers that are not exactly the four fixed sizes this crate
    /// supports.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sector_bytes: u32,
        drive_sectors: u64,
        primary_header: &'a mut [u8],
        secondary_header: &'a mut [u8],
        primary_entries: &'a mut [u8],
        secondary_entries: &'a mut [u8],
    ) -> Result<Self, GptError> {
        if primary_header.len() != HEADER_BYTES
            || secondary_header.len() != HEADER_BYTES
            || primary_entries.len() != ENTRIES_BYTES
            || secondary_entries.len() != ENTRIES_BYTES
        {
            return Err(GptError::InvalidSectorSize);
        }
        Ok(Self {
            sector_bytes,
            drive_sectors,
            primary_header,
            secondary_header,
            primary_entries,
            secondary_entries,
            valid_headers: Validity::NONE,
            valid_entries: Validity::NONE,
            modified: Modified::empty(),
            current_kernel: 0,
        })
    }

    pub(crate) fn supported_sector_size(&self) -> bool {
        self.sector_bytes == SECTOR_BYTES
    }
}
