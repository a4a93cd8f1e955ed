//! Import state threaded through the passes

use crate::pattern::{PairedNote, QuantizedNote, RawTimedEvent};
use serde::{Deserialize, Serialize};

/// Fields read from the `MThd` chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmfHeader {
    /// 0, 1 or 2; not interpreted
    pub format: u16,
    /// Number of `MTrk` chunks declared
    pub track_count: u16,
    /// Resolution after substituting the default for a zero division
    pub ticks_per_quarter: u16,
}

/// Per-track parse summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub index: usize,
    /// Chunk length as declared in the file
    pub declared_length: u32,
    /// Paired notes accepted from this track
    pub note_count: usize,
    /// Channels carrying accepted notes, ascending
    pub channels: Vec<u8>,
    /// The last event ran past the declared chunk end
    pub truncated: bool,
}

/// Counts of recovered anomalies and intentional drops.
///
/// None of these affect whether the import succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDiagnostics {
    /// Note-Off with no pending onset for its (channel, pitch)
    pub orphan_releases: usize,
    /// Onsets still pending at the end of their track
    pub dangling_onsets: usize,
    /// Data byte where a status byte was required and none was running
    pub running_status_errors: usize,
    /// Status bytes skipped as unsupported
    pub unsupported_status_bytes: usize,
    /// Tracks whose last event ran past the declared chunk length
    pub truncated_tracks: usize,
    /// Note events ignored by the channel filter
    pub filtered_events: usize,
    /// Onsets dropped for belonging to the next bar
    pub dropped_out_of_window: usize,
    /// Notes shortened to stop at the next onset of their pitch
    pub clamped_durations: usize,
    /// Notes removed by same-step/same-pitch dedupe
    pub merged_duplicates: usize,
}

impl ImportDiagnostics {
    /// Anomalies in the byte stream that were skipped over
    pub fn stream_anomalies(&self) -> usize {
        self.running_status_errors + self.unsupported_status_bytes + self.truncated_tracks
    }

    /// Notes lost to pairing failures
    pub fn unpaired_events(&self) -> usize {
        self.orphan_releases + self.dangling_onsets
    }

    pub fn is_clean(&self) -> bool {
        self.stream_anomalies() == 0 && self.unpaired_events() == 0
    }

    pub fn log_summary(&self) {
        if self.stream_anomalies() > 0 {
            log::warn!(
                "Recovered from {} malformed stream positions ({} running status, {} unsupported status, {} truncated tracks)",
                self.stream_anomalies(),
                self.running_status_errors,
                self.unsupported_status_bytes,
                self.truncated_tracks
            );
        }
        if self.unpaired_events() > 0 {
            log::warn!(
                "Dropped {} unpaired note events ({} orphan releases, {} dangling onsets)",
                self.unpaired_events(),
                self.orphan_releases,
                self.dangling_onsets
            );
        }
        log::debug!(
            "filtered={} out_of_window={} clamped={} merged={}",
            self.filtered_events,
            self.dropped_out_of_window,
            self.clamped_durations,
            self.merged_duplicates
        );
    }
}

/// State for one import run
#[derive(Debug, Clone)]
pub struct ImportState<'a> {
    /// Raw file bytes
    pub data: &'a [u8],

    // Pass 0: structural parse
    pub header: Option<SmfHeader>,
    pub tracks: Vec<TrackSummary>,
    /// Onset and release boundaries of every paired note, by tick
    pub raw_events: Vec<RawTimedEvent>,
    /// Paired notes from all tracks, by onset tick
    pub paired_notes: Vec<PairedNote>,

    // Passes 1-3: quantization and collision resolution
    pub quantized: Vec<QuantizedNote>,

    pub diagnostics: ImportDiagnostics,
}

impl<'a> ImportState<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            header: None,
            tracks: Vec::new(),
            raw_events: Vec::new(),
            paired_notes: Vec::new(),
            quantized: Vec::new(),
            diagnostics: ImportDiagnostics::default(),
        }
    }

    /// Resolution from the header; zero until pass 0 has run
    pub fn ticks_per_quarter(&self) -> u16 {
        self.header.map(|h| h.ticks_per_quarter).unwrap_or(0)
    }
}
