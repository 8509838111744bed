//! The external error taxonomy: a total, stable set of codes with fixed
//! `Display` text. Validation helpers that need a finer reason for
//! logging (see `header::HeaderFault`) map down into one of these
//! before anything escapes the crate.

/// Stable error codes returned by the validation/repair core.
///
/// `Display` (via `thiserror`) produces exactly the strings this crate's
/// callers expect; `error_text` defers to it so the two can never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GptError {
    #[error("Invalid kernel")]
    NoValidKernel,
    #[error("Invalid headers")]
    InvalidHeaders,
    #[error("Invalid entries")]
    InvalidEntries,
    #[error("Invalid sector size")]
    InvalidSectorSize,
    #[error("Invalid sector number")]
    InvalidSectorNumber,
    #[error("Invalid update type")]
    InvalidUpdateType,
    #[error("Entries' crc corrupted")]
    CrcCorrupted,
    #[error("Entry outside of valid region")]
    OutOfRegion,
    #[error("Starting LBA overlaps")]
    StartLbaOverlap,
    #[error("Ending LBA overlaps")]
    EndLbaOverlap,
    #[error("Duplicated GUID")]
    DupGuid,
    #[error("Invalid flash geometry")]
    InvalidFlashGeometry,
    #[error("No entry found")]
    NoSuchEntry,
}

/// Maps a result to its human-readable text.
///
/// `Ok(())` maps to `"none"` (the `SUCCESS` code); any error maps to its
/// `Display` string; this function is total, so there is no `"Unknown"`
/// case reachable through `GptError` itself — a C enum with room for
/// extra codes would need one, but this sum type is exhaustive.
pub fn error_text(result: &Result<(), GptError>) -> &'static str {
    match result {
        Ok(()) => "none",
        Err(GptError::NoValidKernel) => "Invalid kernel",
        Err(GptError::InvalidHeaders) => "Invalid headers",
        Err(GptError::InvalidEntries) => "Invalid entries",
        Err(GptError::InvalidSectorSize) => "Invalid sector size",
        Err(GptError::InvalidSectorNumber) => "Invalid sector number",
        Err(GptError::InvalidUpdateType) => "Invalid update type",
        Err(GptError::CrcCorrupted) => "Entries' crc corrupted",
        Err(GptError::OutOfRegion) => "Entry outside of valid region",
        Err(GptError::StartLbaOverlap) => "Starting LBA overlaps",
        Err(GptError::EndLbaOverlap) => "Ending LBA overlaps",
        Err(GptError::DupGuid) => "Duplicated GUID",
        Err(GptError::InvalidFlashGeometry) => "Invalid flash geometry",
        Err(GptError::NoSuchEntry) => "No entry found",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn success_text() {
        assert_eq!(error_text(&Ok(())), "none");
    }

    #[test]
    fn error_text_matches_display() {
        let err = GptError::DupGuid;
        assert_eq!(error_text(&Err(err)), "Duplicated GUID");
        assert_eq!(alloc::format!("{err}"), "Duplicated GUID");
    }
}
