//! Fixed GPT geometry constants. This crate only supports 512-byte
//! sectors and 128-byte entries; the constants below are not
//! configurable at runtime.

/// Sectors occupied by one copy of the partition entry array
/// (128 entries * 128 bytes / 512 bytes per sector).
pub const GPT_ENTRIES_SECTORS: u64 = 32;

/// Bytes occupied by one copy of the partition entry array.
pub const TOTAL_ENTRIES_SIZE: usize = 16_384;

pub const MIN_NUMBER_OF_ENTRIES: u32 = 128;
pub const MAX_NUMBER_OF_ENTRIES: u32 = 128;

pub const SIZE_OF_ENTRY: u32 = 128;

pub const MIN_SIZE_OF_HEADER: u32 = 92;
pub const MAX_SIZE_OF_HEADER: u32 = 512;

pub const SECTOR_BYTES: u32 = 512;

/// Minimum drive size (in sectors) this crate will operate on: a PMBR
/// sector, two headers, and two copies of the entry array.
pub const MIN_DRIVE_SECTORS: u64 = 1 + 2 * (1 + GPT_ENTRIES_SECTORS);
