//! Pass 1: Step Quantization
//!
//! Folds tick-space notes onto the bar grid. `ticks_per_step` is
//! `ticks_per_quarter / (steps_per_bar / beats_per_bar)`; the grid
//! precondition is checked by `validate_config` before any bytes are read.

use crate::config::{BoundaryPolicy, Config, GridConfig};
use crate::error::Result;
use crate::pattern::{PairedNote, QuantizedNote};
use crate::state::ImportState;

/// Distance before the bar end past which a clamped onset counts as the next bar's
const NEXT_BAR_MARGIN_STEPS: f64 = 0.5;

const MIDI_VELOCITY_MAX: f32 = 127.0;

/// Maps tick positions onto a fixed bar grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    ticks_per_step: f64,
    steps_per_bar: u32,
    policy: BoundaryPolicy,
}

impl Quantizer {
    pub fn new(ticks_per_quarter: u16, grid: &GridConfig, policy: BoundaryPolicy) -> Self {
        Self {
            ticks_per_step: ticks_per_quarter as f64 / grid.steps_per_beat() as f64,
            steps_per_bar: grid.steps_per_bar,
            policy,
        }
    }

    pub fn ticks_per_step(&self) -> f64 {
        self.ticks_per_step
    }

    pub fn steps_per_bar(&self) -> u32 {
        self.steps_per_bar
    }

    /// Step index of an onset, or `None` if the clamp policy drops it
    pub fn step_for_tick(&self, tick: u64) -> Option<u32> {
        let position = tick as f64 / self.ticks_per_step;
        let last_step = self.steps_per_bar as i64 - 1;
        match self.policy {
            BoundaryPolicy::Clamp => {
                if position >= self.steps_per_bar as f64 - NEXT_BAR_MARGIN_STEPS {
                    return None;
                }
                Some((position.round() as i64).clamp(0, last_step) as u32)
            }
            BoundaryPolicy::Wrap => {
                Some((position.round() as i64).rem_euclid(self.steps_per_bar as i64) as u32)
            }
        }
    }

    /// Duration in whole steps, between 1 and a full bar
    pub fn duration_steps(&self, duration_ticks: u64) -> u32 {
        let steps = (duration_ticks as f64 / self.ticks_per_step).round() as i64;
        steps.clamp(1, self.steps_per_bar as i64) as u32
    }

    pub fn quantize(&self, note: &PairedNote) -> Option<QuantizedNote> {
        let step = self.step_for_tick(note.onset_tick)?;
        Some(QuantizedNote {
            step,
            pitch: note.pitch,
            duration_steps: self.duration_steps(note.duration_ticks),
            velocity01: velocity_to_unit(note.velocity),
        })
    }
}

/// Rescale a 0..127 MIDI velocity to 0.0..=1.0
pub fn velocity_to_unit(velocity: u8) -> f32 {
    (velocity as f32 / MIDI_VELOCITY_MAX).clamp(0.0, 1.0)
}

/// Quantize notes in order. Returns the placed notes and how many were dropped.
pub fn quantize_notes(notes: &[PairedNote], quantizer: &Quantizer) -> (Vec<QuantizedNote>, usize) {
    let mut placed = Vec::with_capacity(notes.len());
    let mut dropped = 0;
    for note in notes {
        match quantizer.quantize(note) {
            Some(q) => placed.push(q),
            None => {
                log::debug!(
                    "  Onset at tick {} (pitch {}) belongs to the next bar, dropped",
                    note.onset_tick,
                    note.pitch
                );
                dropped += 1;
            }
        }
    }
    (placed, dropped)
}

pub fn run(state: &mut ImportState, config: &Config) -> Result<()> {
    log::info!("Pass 1: Step Quantization");

    let quantizer = Quantizer::new(
        state.ticks_per_quarter(),
        &config.grid,
        config.quantize.boundary_policy,
    );
    log::debug!(
        "  {:.3} ticks per step, {} steps per bar, {:?}",
        quantizer.ticks_per_step(),
        quantizer.steps_per_bar(),
        config.quantize.boundary_policy
    );

    let (placed, dropped) = quantize_notes(&state.paired_notes, &quantizer);
    log::info!("  {} notes placed, {} out of window", placed.len(), dropped);

    state.quantized = placed;
    state.diagnostics.dropped_out_of_window += dropped;

    log::info!("  ✓ Pass 1 complete");
    Ok(())
}
