//! IEEE 802.3 CRC32, the only checksum this crate ever computes.

/// Computes the IEEE 802.3 CRC32 (polynomial 0xEDB88320, reflected,
/// initial 0xFFFFFFFF, final XOR 0xFFFFFFFF) over `bytes`.
///
/// Used in exactly two places: the header self-CRC (over `header.size`
/// bytes with `header_crc32` temporarily zeroed) and the entry-array
/// CRC (over `size_of_entry * number_of_entries` bytes).
pub fn crc32(bytes: &[u8]) -> u32 {
    let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    crc.checksum(bytes)
}
