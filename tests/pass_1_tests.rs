//! Tests for Pass 1: Step Quantization

use midi2riff::config::{BoundaryPolicy, Config, GridConfig};
use midi2riff::passes::pass_1::{self, quantize_notes, velocity_to_unit, Quantizer};
use midi2riff::pattern::PairedNote;
use midi2riff::ImportState;

fn create_quantizer(policy: BoundaryPolicy) -> Quantizer {
    Quantizer::new(480, &GridConfig::default(), policy)
}

fn paired(onset_tick: u64, duration_ticks: u64, pitch: u8, velocity: u8) -> PairedNote {
    PairedNote {
        onset_tick,
        duration_ticks,
        pitch,
        velocity,
        channel: 0,
        track: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_per_step() {
        assert!((create_quantizer(BoundaryPolicy::Clamp).ticks_per_step() - 120.0).abs() < 1e-9);

        // 3/4 bar with 12 steps keeps four steps per beat
        let grid = GridConfig {
            steps_per_bar: 12,
            beats_per_bar: 3,
        };
        let q = Quantizer::new(96, &grid, BoundaryPolicy::Clamp);
        assert!((q.ticks_per_step() - 24.0).abs() < 1e-9);
        assert_eq!(q.steps_per_bar(), 12);
    }

    #[test]
    fn test_step_rounding() {
        let q = create_quantizer(BoundaryPolicy::Clamp);
        assert_eq!(q.step_for_tick(0), Some(0));
        assert_eq!(q.step_for_tick(59), Some(0));
        assert_eq!(q.step_for_tick(60), Some(1));
        assert_eq!(q.step_for_tick(120), Some(1));
        assert_eq!(q.step_for_tick(1800), Some(15));
    }

    #[test]
    fn test_clamp_drops_onsets_belonging_to_next_bar() {
        let q = create_quantizer(BoundaryPolicy::Clamp);
        // 15.49 steps still rounds onto the last step
        assert_eq!(q.step_for_tick(1859), Some(15));
        // 15.5 steps and beyond belong to the next bar
        assert_eq!(q.step_for_tick(1860), None);
        assert_eq!(q.step_for_tick(1920), None);
        assert_eq!(q.step_for_tick(100_000), None);
    }

    #[test]
    fn test_wrap_reduces_modulo_bar() {
        let q = create_quantizer(BoundaryPolicy::Wrap);
        assert_eq!(q.step_for_tick(1860), Some(0));
        assert_eq!(q.step_for_tick(1920), Some(0));
        assert_eq!(q.step_for_tick(2040), Some(1));
        assert_eq!(q.step_for_tick(1920 * 3 + 600), Some(5));
    }

    #[test]
    fn test_duration_steps_bounds() {
        let q = create_quantizer(BoundaryPolicy::Clamp);
        assert_eq!(q.duration_steps(240), 2);
        assert_eq!(q.duration_steps(179), 1);
        assert_eq!(q.duration_steps(180), 2);
        assert_eq!(q.duration_steps(1), 1);
        assert_eq!(q.duration_steps(0), 1);
        assert_eq!(q.duration_steps(1920), 16);
        assert_eq!(q.duration_steps(100_000), 16);
    }

    #[test]
    fn test_velocity_rescale() {
        assert!((velocity_to_unit(100) - 0.787).abs() < 1e-3);
        assert_eq!(velocity_to_unit(127), 1.0);
        assert_eq!(velocity_to_unit(0), 0.0);
        // Values outside the MIDI range still clamp
        assert_eq!(velocity_to_unit(255), 1.0);
    }

    #[test]
    fn test_quantize_note() {
        let q = create_quantizer(BoundaryPolicy::Clamp);
        let note = q.quantize(&paired(0, 240, 60, 100)).unwrap();
        assert_eq!(note.step, 0);
        assert_eq!(note.pitch, 60);
        assert_eq!(note.duration_steps, 2);
        assert!((note.velocity01 - 0.787).abs() < 1e-3);
    }

    #[test]
    fn test_quantize_notes_counts_drops() {
        let notes = vec![
            paired(0, 120, 60, 100),
            paired(1920, 120, 62, 100),
            paired(960, 480, 64, 64),
        ];

        let (placed, dropped) = quantize_notes(&notes, &create_quantizer(BoundaryPolicy::Clamp));
        assert_eq!(dropped, 1);
        let steps: Vec<(u32, u8)> = placed.iter().map(|n| (n.step, n.pitch)).collect();
        assert_eq!(steps, vec![(0, 60), (8, 64)]);

        let (placed, dropped) = quantize_notes(&notes, &create_quantizer(BoundaryPolicy::Wrap));
        assert_eq!(dropped, 0);
        assert_eq!(placed[1].step, 0);
    }

    #[test]
    fn test_run_records_dropped_onsets() {
        let data = [0u8; 0];
        let mut state = ImportState::new(&data);
        state.header = Some(midi2riff::state::SmfHeader {
            format: 0,
            track_count: 1,
            ticks_per_quarter: 96,
        });
        state.paired_notes = vec![paired(0, 24, 36, 127), paired(24 * 16, 24, 36, 127)];

        let config = Config::default();
        pass_1::run(&mut state, &config).unwrap();
        assert_eq!(state.quantized.len(), 1);
        assert_eq!(state.quantized[0].duration_steps, 1);
        assert_eq!(state.diagnostics.dropped_out_of_window, 1);
    }
}
