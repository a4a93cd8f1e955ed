//! Pass 2: Duration Clamp to Next Onset
//!
//! Per pitch, a note may sound until the next onset of the same pitch or the
//! end of the bar, never less than one step. Other pitches are unaffected.

use crate::config::Config;
use crate::error::Result;
use crate::pattern::{sort_by_step_and_pitch, QuantizedNote};
use crate::state::ImportState;
use std::collections::BTreeMap;

/// Shorten notes that run into the next onset of their pitch.
///
/// Returns how many notes were shortened. The list comes back sorted by
/// (step, pitch); notes sharing both keep their relative order.
pub fn clamp_to_next_onset(notes: &mut Vec<QuantizedNote>, steps_per_bar: u32) -> usize {
    let mut by_pitch: BTreeMap<u8, Vec<QuantizedNote>> = BTreeMap::new();
    for note in notes.drain(..) {
        by_pitch.entry(note.pitch).or_default().push(note);
    }

    let mut shortened = 0;
    for group in by_pitch.values_mut() {
        group.sort_by_key(|n| n.step);

        let next_steps: Vec<u32> = group
            .iter()
            .skip(1)
            .map(|n| n.step)
            .chain(std::iter::once(steps_per_bar))
            .collect();

        for (note, next_step) in group.iter_mut().zip(next_steps) {
            let room = next_step.saturating_sub(note.step).max(1);
            if note.duration_steps > room {
                note.duration_steps = room;
                shortened += 1;
            }
        }
    }

    notes.extend(by_pitch.into_values().flatten());
    sort_by_step_and_pitch(notes);
    shortened
}

pub fn run(state: &mut ImportState, config: &Config) -> Result<()> {
    log::info!("Pass 2: Duration Clamp to Next Onset");

    if !config.resolve.clamp_duration_to_next_onset {
        log::info!("  Disabled, overlaps allowed");
        return Ok(());
    }

    let shortened = clamp_to_next_onset(&mut state.quantized, config.grid.steps_per_bar);
    log::info!("  {} of {} notes shortened", shortened, state.quantized.len());
    state.diagnostics.clamped_durations += shortened;

    log::info!("  ✓ Pass 2 complete");
    Ok(())
}
