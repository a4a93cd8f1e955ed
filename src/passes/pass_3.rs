//! Pass 3: Same-Step Dedupe & Final Ordering

use crate::config::Config;
use crate::error::Result;
use crate::pattern::{sort_by_step_and_pitch, QuantizedNote};
use crate::state::ImportState;
use std::collections::BTreeMap;

/// Collapse notes sharing a (step, pitch) into one.
///
/// The loudest member wins (the first one on ties) and takes the longest
/// duration found in its group. Output is sorted by (step, pitch). Applying
/// this twice gives the same list as applying it once.
pub fn dedupe_same_step_same_pitch(notes: Vec<QuantizedNote>) -> (Vec<QuantizedNote>, usize) {
    let total = notes.len();
    let mut slots: BTreeMap<(u32, u8), QuantizedNote> = BTreeMap::new();

    for note in notes {
        match slots.get_mut(&(note.step, note.pitch)) {
            Some(kept) => {
                let duration_steps = kept.duration_steps.max(note.duration_steps);
                if note.velocity01 > kept.velocity01 {
                    *kept = note;
                }
                kept.duration_steps = duration_steps;
            }
            None => {
                slots.insert((note.step, note.pitch), note);
            }
        }
    }

    let deduped: Vec<QuantizedNote> = slots.into_values().collect();
    let merged = total - deduped.len();
    (deduped, merged)
}

pub fn run(state: &mut ImportState, config: &Config) -> Result<()> {
    log::info!("Pass 3: Same-Step Dedupe & Final Ordering");

    if config.resolve.dedupe_same_step_same_pitch {
        let notes = std::mem::take(&mut state.quantized);
        let (deduped, merged) = dedupe_same_step_same_pitch(notes);
        log::info!("  {} colliding notes merged", merged);
        state.quantized = deduped;
        state.diagnostics.merged_duplicates += merged;
    } else {
        log::info!("  Dedupe disabled");
        sort_by_step_and_pitch(&mut state.quantized);
    }

    log::info!("  ✓ Pass 3 complete ({} events)", state.quantized.len());
    Ok(())
}
