//! Typed bitmasks for `GptData::valid_headers`, `valid_entries`, and
//! `modified`. Plain `bitflags!` wrappers rather than hand-rolled
//! `PRIMARY=1`/`SECONDARY=2` integer constants — same bit positions, a
//! typed API.

use bitflags::bitflags;

bitflags! {
    /// Which copy (primary/secondary) passed validation.
    ///
    /// `NONE` is the empty set, `BOTH` is `PRIMARY | SECONDARY`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Validity: u8 {
        const PRIMARY = 0b01;
        const SECONDARY = 0b10;
    }
}

impl Validity {
    pub const NONE: Self = Self::empty();
    pub const BOTH: Self = Self::PRIMARY.union(Self::SECONDARY);
}

bitflags! {
    /// Which on-disk sectors the caller must persist after a call into
    /// this crate. Never cleared by the crate itself — only set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modified: u8 {
        const HEADER1 = 0b0001;
        const ENTRIES1 = 0b0010;
        const HEADER2 = 0b0100;
        const ENTRIES2 = 0b1000;
    }
}
