//! Event and pattern types shared by the import passes

use serde::{Deserialize, Serialize};

/// Loop length of a riff, in steps
pub const DEFAULT_STEPS_PER_LOOP: u32 = 16;

/// A note boundary read from a track, in absolute ticks.
///
/// Two of these (onset and release) are recorded per matched note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimedEvent {
    pub tick: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub is_onset: bool,
}

/// A matched onset/release pair in tick space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedNote {
    pub onset_tick: u64,
    /// Always at least 1
    pub duration_ticks: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    /// Index of the track the note was read from
    pub track: usize,
}

/// A note placed on the step grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizedNote {
    /// 0..steps_per_bar
    pub step: u32,
    pub pitch: u8,
    /// 1..=steps_per_bar
    pub duration_steps: u32,
    /// MIDI velocity rescaled to 0.0..=1.0
    pub velocity01: f32,
}

impl QuantizedNote {
    /// Step where the note stops sounding (exclusive)
    pub fn end_step(&self) -> u32 {
        self.step + self.duration_steps
    }
}

/// How overlapping notes of one pitch were treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlapPolicy {
    ClampToNextOnset,
    AllowOverlap,
}

/// The finished, quantized riff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub root_pitch: u8,
    pub steps_per_loop: u32,
    /// Sorted by (step, pitch)
    pub events: Vec<QuantizedNote>,
    pub overlap_policy: OverlapPolicy,
}

impl Pattern {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events starting on the given step
    pub fn events_at(&self, step: u32) -> impl Iterator<Item = &QuantizedNote> {
        self.events.iter().filter(move |e| e.step == step)
    }

    /// Distinct pitches used, ascending
    pub fn pitches(&self) -> Vec<u8> {
        let mut pitches: Vec<u8> = self.events.iter().map(|e| e.pitch).collect();
        pitches.sort_unstable();
        pitches.dedup();
        pitches
    }
}

/// Sort notes by (step, pitch). Stable, so equal keys keep their order.
pub fn sort_by_step_and_pitch(notes: &mut [QuantizedNote]) {
    notes.sort_by_key(|n| (n.step, n.pitch));
}
