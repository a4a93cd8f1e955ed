//! Error types for the MIDI-to-riff importer

use thiserror::Error;

/// Errors that abort an import.
///
/// Byte-level anomalies inside a track body are not errors; they are
/// recovered locally and counted in [`crate::state::ImportDiagnostics`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiffError {
    /// E001: Missing or malformed `MThd` header chunk
    #[error("E001: Invalid header - {0}")]
    InvalidHeader(String),
    /// E002: SMPTE time code division
    #[error("E002: Unsupported time division 0x{0:04X} (SMPTE time code)")]
    UnsupportedTimeDivision(u16),
    /// E003: Missing or malformed `MTrk` chunk
    #[error("E003: Invalid track chunk {index} - found {found}")]
    InvalidTrackChunk { index: usize, found: String },
    /// E004: A fixed-width read ran off the end of the buffer
    #[error("E004: Unexpected end of data at offset {offset} ({needed} more bytes needed)")]
    UnexpectedEndOfData { offset: usize, needed: usize },
    /// E005: Grid precondition violated
    #[error("E005: steps_per_bar ({steps_per_bar}) is not divisible by beats_per_bar ({beats_per_bar})")]
    StepsNotDivisible { steps_per_bar: u32, beats_per_bar: u32 },
    /// E006: Configuration value out of range
    #[error("E006: Invalid configuration parameter - {0}")]
    InvalidConfigParameter(String),
    /// E007: File I/O error
    #[error("E007: I/O error - {0}")]
    Io(String),
    /// E008: Report serialization error
    #[error("E008: Serialization error - {0}")]
    Serialization(String),
    /// E009: Preview MIDI render error
    #[error("E009: MIDI export error - {0}")]
    MidiExport(String),
}

impl RiffError {
    /// True for conditions caused by the file contents rather than the caller
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            RiffError::InvalidHeader(_)
                | RiffError::UnsupportedTimeDivision(_)
                | RiffError::InvalidTrackChunk { .. }
                | RiffError::UnexpectedEndOfData { .. }
        )
    }
}

impl From<std::io::Error> for RiffError {
    fn from(err: std::io::Error) -> Self {
        RiffError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RiffError {
    fn from(err: serde_json::Error) -> Self {
        RiffError::Serialization(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, RiffError>;
