//! A disk/partition GUID as the raw 16 on-disk bytes.
//!
//! GPT stores `disk_guid` and each entry's `type`/`unique` GUID as
//! "mixed-endian": the first three fields (32-bit, 16-bit, 16-bit) are
//! little-endian, the last two (a 16-bit and a 48-bit field) are
//! big-endian, per RFC 4122 §4.1.2 as adopted by the UEFI spec. This
//! type never reorders bytes on disk; it only reorders them when
//! printing or parsing the canonical `xxxxxxxx-xxxx-...` text form.

use crate::GptError;
use core::{fmt::Display, ops::Deref, str::FromStr};

pub const UUID_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PartUuid([u8; UUID_SIZE]);

/// The zero GUID: `type == ZERO` marks an entry slot as unused (see
/// `is_unused_entry`).
pub const ZERO_GUID: PartUuid = PartUuid([0; UUID_SIZE]);

/// The Chromium OS kernel partition type GUID
/// (`FE3A2A5D-4F32-41A7-B725-ACCC3285A309`), used by `is_kernel_entry`.
pub const GPT_ENT_TYPE_CHROMEOS_KERNEL: PartUuid = PartUuid([
    0x5D, 0x2A, 0x3A, 0xFE, 0x32, 0x4F, 0xA7, 0x41, 0xB7, 0x25, 0xAC, 0xCC, 0x32, 0x85, 0xA3, 0x09,
]);

impl PartUuid {
    pub fn is_zero(&self) -> bool {
        *self == ZERO_GUID
    }

    pub fn as_bytes(&self) -> &[u8; UUID_SIZE] {
        &self.0
    }
}

impl From<[u8; UUID_SIZE]> for PartUuid {
    fn from(value: [u8; UUID_SIZE]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for PartUuid {
    type Error = GptError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; UUID_SIZE] = value.try_into().map_err(|_| GptError::InvalidUpdateType)?;
        Ok(Self(bytes))
    }
}

impl Deref for PartUuid {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for PartUuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-\
             {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15],
        )
    }
}

impl FromStr for PartUuid {
    type Err = GptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut hex = [0u8; 32];
        let mut count = 0;
        for ch in s.chars() {
            if ch == '-' {
                continue;
            }
            if count >= 32 {
                return Err(GptError::InvalidUpdateType);
            }
            hex[count] = hex_val(ch)?;
            count += 1;
        }
        if count != 32 {
            return Err(GptError::InvalidUpdateType);
        }
        let byte_at = |i: usize| -> u8 { (hex[i * 2] << 4) | hex[i * 2 + 1] };
        let mut uuid = [0u8; UUID_SIZE];
        uuid[0] = byte_at(3);
        uuid[1] = byte_at(2);
        uuid[2] = byte_at(1);
        uuid[3] = byte_at(0);
        uuid[4] = byte_at(5);
        uuid[5] = byte_at(4);
        uuid[6] = byte_at(7);
        uuid[7] = byte_at(6);
        for i in 8..UUID_SIZE {
            uuid[i] = byte_at(i);
        }
        Ok(Self(uuid))
    }
}

fn hex_val(ch: char) -> Result<u8, GptError> {
    match ch {
        '0'..='9' => Ok(ch as u8 - b'0'),
        'a'..='f' => Ok(ch as u8 - b'a' + 10),
        'A'..='F' => Ok(ch as u8 - b'A' + 10),
        _ => Err(GptError::InvalidUpdateType),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn roundtrip_through_text() {
        let text = "12345678-1234-5678-9abc-def012345678";
        let uuid: PartUuid = text.parse().unwrap();
        assert_eq!(uuid.to_string(), text);
    }

    #[test]
    fn zero_is_unused_marker() {
        assert!(ZERO_GUID.is_zero());
        assert!(!GPT_ENT_TYPE_CHROMEOS_KERNEL.is_zero());
    }

    #[test]
    fn rejects_bad_length() {
        assert!(PartUuid::try_from(&[0u8; 15][..]).is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!("zzzzzzzz-1234-5678-9abc-def012345678"
            .parse::<PartUuid>()
            .is_err());
    }
}
