//! Note-On / Note-Off pairing per (channel, pitch)

use crate::pattern::PairedNote;

const CHANNELS: usize = 16;
const PITCHES: usize = 128;

#[derive(Debug, Clone, Copy)]
struct PendingOnset {
    tick: u64,
    velocity: u8,
}

/// Outcome of routing a release through the stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Closed the most recent pending onset for its key
    Paired(PairedNote),
    /// No pending onset for its key; discarded
    Orphan,
}

/// Pending onsets for one track, one LIFO stack per (channel, pitch).
///
/// A release always closes the most recently struck instance of its key, so
/// a pitch re-struck before it was released pairs inner-to-outer.
#[derive(Debug, Clone)]
pub struct NoteStacks {
    track: usize,
    /// Indexed by `channel * 128 + pitch`
    stacks: Vec<Vec<PendingOnset>>,
    pending: usize,
}

impl NoteStacks {
    pub fn new(track: usize) -> Self {
        Self {
            track,
            stacks: vec![Vec::new(); CHANNELS * PITCHES],
            pending: 0,
        }
    }

    fn key(channel: u8, pitch: u8) -> usize {
        (channel as usize & 0x0F) * PITCHES + (pitch as usize & 0x7F)
    }

    pub fn note_on(&mut self, channel: u8, pitch: u8, tick: u64, velocity: u8) {
        self.stacks[Self::key(channel, pitch)].push(PendingOnset { tick, velocity });
        self.pending += 1;
    }

    /// Pop the latest onset for the key and pair it with `tick`.
    ///
    /// Durations are floored at one tick.
    pub fn note_off(&mut self, channel: u8, pitch: u8, tick: u64) -> Release {
        match self.stacks[Self::key(channel, pitch)].pop() {
            Some(onset) => {
                self.pending -= 1;
                Release::Paired(PairedNote {
                    onset_tick: onset.tick,
                    duration_ticks: tick.saturating_sub(onset.tick).max(1),
                    pitch: pitch & 0x7F,
                    velocity: onset.velocity,
                    channel: channel & 0x0F,
                    track: self.track,
                })
            }
            None => Release::Orphan,
        }
    }

    /// Onsets still waiting for a release
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Close out the track. Unreleased onsets are dropped; returns how many.
    pub fn finish(self) -> usize {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired(release: Release) -> PairedNote {
        match release {
            Release::Paired(note) => note,
            Release::Orphan => panic!("expected a paired note"),
        }
    }

    #[test]
    fn test_simple_pair() {
        let mut stacks = NoteStacks::new(2);
        stacks.note_on(0, 60, 0, 100);
        let note = paired(stacks.note_off(0, 60, 240));
        assert_eq!(note.onset_tick, 0);
        assert_eq!(note.duration_ticks, 240);
        assert_eq!(note.velocity, 100);
        assert_eq!(note.track, 2);
        assert_eq!(stacks.finish(), 0);
    }

    #[test]
    fn test_overlapping_restrike_is_lifo() {
        let mut stacks = NoteStacks::new(0);
        stacks.note_on(0, 38, 0, 90);
        stacks.note_on(0, 38, 100, 70);
        let first = paired(stacks.note_off(0, 38, 150));
        let second = paired(stacks.note_off(0, 38, 200));
        // The later onset closes first
        assert_eq!((first.onset_tick, first.velocity), (100, 70));
        assert_eq!(first.duration_ticks, 50);
        assert_eq!((second.onset_tick, second.duration_ticks), (0, 200));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut stacks = NoteStacks::new(0);
        stacks.note_on(0, 60, 0, 100);
        stacks.note_on(1, 60, 10, 50);
        stacks.note_on(0, 61, 20, 30);
        assert_eq!(stacks.pending(), 3);

        let ch1 = paired(stacks.note_off(1, 60, 40));
        assert_eq!((ch1.channel, ch1.onset_tick), (1, 10));
        let ch0 = paired(stacks.note_off(0, 60, 40));
        assert_eq!((ch0.channel, ch0.onset_tick), (0, 0));
        assert_eq!(stacks.pending(), 1);
    }

    #[test]
    fn test_orphan_release() {
        let mut stacks = NoteStacks::new(0);
        assert_eq!(stacks.note_off(3, 64, 10), Release::Orphan);
        stacks.note_on(3, 64, 20, 1);
        paired(stacks.note_off(3, 64, 30));
        assert_eq!(stacks.note_off(3, 64, 40), Release::Orphan);
    }

    #[test]
    fn test_simultaneous_on_off_floors_to_one_tick() {
        let mut stacks = NoteStacks::new(0);
        stacks.note_on(0, 60, 480, 100);
        let note = paired(stacks.note_off(0, 60, 480));
        assert_eq!(note.duration_ticks, 1);
    }

    #[test]
    fn test_dangling_onsets_counted_at_finish() {
        let mut stacks = NoteStacks::new(0);
        stacks.note_on(0, 60, 0, 100);
        stacks.note_on(0, 60, 10, 100);
        stacks.note_on(9, 36, 0, 100);
        paired(stacks.note_off(0, 60, 20));
        assert_eq!(stacks.finish(), 2);
    }
}
